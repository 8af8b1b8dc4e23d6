//! Just enough of a GLSL front end to give the headless driver realistic
//! compile and link behavior: delimiter and statement checking, interface
//! declarations (`uniform`, `in`, `out`), user `struct` types and uniform
//! liveness. Interface blocks and arrays of structs are not understood.

use std::collections::HashSet;

use crate::engine::graphics::driver::ShaderStage;

const TYPES: &[&str] = &[
    "void", "bool", "int", "uint", "float", "double",
    "vec2", "vec3", "vec4", "ivec2", "ivec3", "ivec4", "uvec2", "uvec3", "uvec4",
    "bvec2", "bvec3", "bvec4", "dvec2", "dvec3", "dvec4",
    "mat2", "mat3", "mat4", "mat2x2", "mat2x3", "mat2x4", "mat3x2", "mat3x3", "mat3x4",
    "mat4x2", "mat4x3", "mat4x4",
    "sampler1D", "sampler2D", "sampler3D", "samplerCube", "sampler2DArray", "sampler2DShadow",
    "isampler2D", "usampler2D",
];

const QUALIFIERS: &[&str] = &[
    "uniform", "in", "out", "const", "flat", "smooth", "noperspective", "centroid",
    "highp", "mediump", "lowp", "attribute", "varying", "invariant",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uniform {
    pub name: String,
    pub ty: String,
    /// Referenced from at least one function body. Unreferenced uniforms are
    /// dropped by the linker the way real compilers optimize them away.
    pub active: bool,
}

/// What a successfully compiled stage exposes to the linker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInterface {
    pub uniforms: Vec<Uniform>,
    pub inputs: Vec<Variable>,
    pub outputs: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    line: usize,
}

fn error(line: usize, message: impl AsRef<str>) -> String {
    format!("0:{}(1): error: {}", line, message.as_ref())
}

pub fn is_sampler(ty: &str) -> bool {
    ty.contains("sampler")
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Replaces comments and preprocessor lines with whitespace, keeping line
/// numbers intact.
fn strip(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut line_start = true;
    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            '#' if line_start => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            _ => {
                if c == '\n' {
                    line_start = true;
                } else if !c.is_whitespace() {
                    line_start = false;
                }
                out.push(c);
            }
        }
    }
    out
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line += 1;
            i += 1;
        } else if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token { text: chars[start..i].iter().collect(), line });
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                i += 1;
            }
            tokens.push(Token { text: chars[start..i].iter().collect(), line });
        } else {
            tokens.push(Token { text: c.to_string(), line });
            i += 1;
        }
    }
    tokens
}

struct Parser<'a> {
    stage: ShaderStage,
    tokens: &'a [Token],
    interface: ShaderInterface,
    referenced: HashSet<String>,
    structs: HashSet<String>,
    has_main: bool,
}

/// Compiles one stage, returning its interface or a driver-style info log.
pub fn compile(stage: ShaderStage, source: &str) -> Result<ShaderInterface, String> {
    let tokens = tokenize(&strip(source));
    let mut parser = Parser {
        stage,
        tokens: &tokens,
        interface: ShaderInterface::default(),
        referenced: HashSet::new(),
        structs: HashSet::new(),
        has_main: false,
    };
    parser.translation_unit()?;
    if !parser.has_main {
        return Err(error(0, format!("{} shader lacks `main'", stage)));
    }
    let referenced = parser.referenced;
    let mut interface = parser.interface;
    for uniform in &mut interface.uniforms {
        uniform.active = referenced.contains(&uniform.name);
    }
    Ok(interface)
}

impl<'a> Parser<'a> {
    fn translation_unit(&mut self) -> Result<(), String> {
        let tokens = self.tokens;
        let mut pending: Vec<&Token> = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            match token.text.as_str() {
                ";" => {
                    if !pending.is_empty() {
                        self.declaration(&pending)?;
                    }
                    pending.clear();
                    i += 1;
                }
                "{" if pending.first().is_some_and(|t| t.text == "struct") => {
                    let name = self.struct_header(&pending, token.line)?;
                    pending.clear();
                    i = self.struct_body(i)?;
                    // `struct S { ... } s;` declares a variable of the new type.
                    if tokens.get(i).is_some_and(|t| t.text != ";") {
                        pending.push(name);
                    }
                }
                "{" => {
                    self.function_header(&pending, token.line)?;
                    pending.clear();
                    i = self.function_body(i)?;
                }
                ")" | "]" | "}" => {
                    if !self.balanced(&pending) || token.text == "}" {
                        return Err(error(token.line, format!("syntax error, unexpected `{}'", token.text)));
                    }
                    pending.push(token);
                    i += 1;
                }
                _ => {
                    pending.push(token);
                    i += 1;
                }
            }
        }
        if let Some(last) = pending.last() {
            return Err(error(last.line, "syntax error, unexpected end of file"));
        }
        Ok(())
    }

    fn is_type(&self, text: &str) -> bool {
        TYPES.contains(&text) || self.structs.contains(text)
    }

    fn struct_header<'t>(&mut self, header: &[&'t Token], line: usize) -> Result<&'t Token, String> {
        match header {
            [_, name] if is_identifier(&name.text) && !self.is_type(&name.text) => {
                self.structs.insert(name.text.clone());
                Ok(*name)
            }
            _ => {
                let near = header.last().map_or("struct", |t| t.text.as_str());
                Err(error(line, format!("syntax error, unexpected `{}'", near)))
            }
        }
    }

    /// Checks `type name;` members up to the closing brace and returns the
    /// index just past it.
    fn struct_body(&self, open: usize) -> Result<usize, String> {
        let tokens = self.tokens;
        let mut member: Vec<&str> = Vec::new();
        let mut members = 0usize;
        let mut i = open + 1;
        while i < tokens.len() {
            let token = &tokens[i];
            match token.text.as_str() {
                ";" => {
                    let texts: Vec<&str> =
                        member.iter().copied().skip_while(|t| QUALIFIERS.contains(t)).collect();
                    let well_formed = texts.len() >= 2
                        && self.is_type(texts[0])
                        && texts[1..].iter().all(|t| is_identifier(t) || *t == "," || *t == "[" || *t == "]"
                            || t.chars().all(|c| c.is_ascii_digit()));
                    if !well_formed {
                        let near = member.first().copied().unwrap_or(";");
                        return Err(error(token.line, format!("syntax error, unexpected `{}'", near)));
                    }
                    member.clear();
                    members += 1;
                }
                "}" => {
                    if !member.is_empty() {
                        return Err(error(token.line, "syntax error, unexpected `}', expecting `;'"));
                    }
                    if members == 0 {
                        return Err(error(token.line, "empty struct is not allowed"));
                    }
                    return Ok(i + 1);
                }
                "{" => return Err(error(token.line, "syntax error, unexpected `{'")),
                text => member.push(text),
            }
            i += 1;
        }
        let line = tokens.last().map_or(0, |t| t.line);
        Err(error(line, "syntax error, unexpected end of file"))
    }

    /// True while the closing delimiter just seen has a partner in `pending`.
    fn balanced(&self, pending: &[&Token]) -> bool {
        let opens = pending.iter().filter(|t| t.text == "(" || t.text == "[").count();
        let closes = pending.iter().filter(|t| t.text == ")" || t.text == "]").count();
        opens > closes
    }

    /// Scans a function body starting at its opening brace and returns the
    /// index just past the matching closing brace.
    fn function_body(&mut self, open: usize) -> Result<usize, String> {
        let mut stack: Vec<&str> = vec!["{"];
        let mut statement = 0usize;
        let tokens = self.tokens;
        let mut i = open + 1;
        while i < tokens.len() {
            let token = &tokens[i];
            match token.text.as_str() {
                "{" | "(" | "[" => {
                    stack.push(token.text.as_str());
                    if token.text == "{" {
                        statement = 0;
                    } else {
                        statement += 1;
                    }
                }
                ")" | "]" | "}" => {
                    let expected = match token.text.as_str() {
                        ")" => "(",
                        "]" => "[",
                        _ => "{",
                    };
                    if stack.pop() != Some(expected) {
                        return Err(error(token.line, format!("syntax error, unexpected `{}'", token.text)));
                    }
                    if token.text == "}" {
                        if statement > 0 {
                            return Err(error(token.line, "syntax error, unexpected `}', expecting `;'"));
                        }
                        if stack.is_empty() {
                            return Ok(i + 1);
                        }
                    } else {
                        statement += 1;
                    }
                }
                ";" => statement = 0,
                text => {
                    if is_identifier(text) {
                        self.referenced.insert(text.to_string());
                    }
                    statement += 1;
                }
            }
            i += 1;
        }
        let line = tokens.last().map_or(0, |t| t.line);
        Err(error(line, "syntax error, unexpected end of file"))
    }

    fn function_header(&mut self, header: &[&Token], line: usize) -> Result<(), String> {
        let texts: Vec<&str> = header.iter().map(|t| t.text.as_str()).collect();
        let open = texts.iter().position(|t| *t == "(");
        let well_formed = match open {
            Some(open) => {
                open >= 2
                    && texts.last() == Some(&")")
                    && self.is_type(texts[open - 2])
                    && is_identifier(texts[open - 1])
                    && texts[..open - 2].iter().all(|q| QUALIFIERS.contains(q))
            }
            None => false,
        };
        if !well_formed {
            let near = texts.last().copied().unwrap_or("{");
            return Err(error(line, format!("syntax error, unexpected `{}'", near)));
        }
        let open = open.unwrap_or_default();
        if texts[open - 1] == "main" {
            let params = &texts[open + 1..texts.len() - 1];
            if texts[open - 2] != "void" || !(params.is_empty() || params == ["void"]) {
                return Err(error(line, "main() must be declared `void main()'"));
            }
            self.has_main = true;
        }
        Ok(())
    }

    fn declaration(&mut self, statement: &[&Token]) -> Result<(), String> {
        let line = statement[0].line;
        let mut texts: Vec<&str> = statement.iter().map(|t| t.text.as_str()).collect();

        if texts[0] == "precision" {
            return Ok(());
        }
        if texts[0] == "layout" {
            let close = texts
                .iter()
                .position(|t| *t == ")")
                .ok_or_else(|| error(line, "syntax error, unexpected end of layout qualifier"))?;
            if texts.get(1) != Some(&"(") {
                return Err(error(line, "syntax error, expected `(' after layout"));
            }
            texts.drain(..=close);
        }

        let qualifiers: Vec<&str> = texts.iter().take_while(|t| QUALIFIERS.contains(t)).copied().collect();
        let rest = &texts[qualifiers.len()..];
        let Some((&ty, declarators)) = rest.split_first() else {
            return Err(error(line, "syntax error, unexpected `;'"));
        };
        if !self.is_type(ty) {
            return Err(error(line, format!("syntax error, unexpected IDENTIFIER `{}'", ty)));
        }

        // Prototype: `float helper(vec2 uv);`
        if declarators.get(1) == Some(&"(") {
            if is_identifier(declarators[0]) && declarators.last() == Some(&")") {
                return Ok(());
            }
            return Err(error(line, "syntax error in function prototype"));
        }

        for declarator in declarators.split(|t| *t == ",") {
            let name = match declarator.first() {
                Some(name) if is_identifier(name) && !self.is_type(name) => *name,
                Some(other) => return Err(error(line, format!("syntax error, unexpected `{}'", other))),
                None => return Err(error(line, "syntax error, unexpected `,'")),
            };
            self.variable(&qualifiers, ty, name);
        }
        Ok(())
    }

    fn variable(&mut self, qualifiers: &[&str], ty: &str, name: &str) {
        let var = Variable { name: name.to_string(), ty: ty.to_string() };
        let is_input = qualifiers.contains(&"in")
            || qualifiers.contains(&"attribute")
            || (qualifiers.contains(&"varying") && self.stage == ShaderStage::Fragment);
        let is_output = qualifiers.contains(&"out")
            || (qualifiers.contains(&"varying") && self.stage == ShaderStage::Vertex);

        if qualifiers.contains(&"uniform") {
            self.interface.uniforms.push(Uniform { name: var.name, ty: var.ty, active: false });
        } else if is_input {
            self.interface.inputs.push(var);
        } else if is_output {
            self.interface.outputs.push(var);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"#version 330 core
layout (location = 0) in vec3 aPosition;
layout (location = 1) in vec2 aTexCoords;

uniform mat4 uTransform;
uniform float uUnused;

out vec2 frag_texCoords;

void main()
{
    gl_Position = uTransform * vec4(aPosition, 1.0);
    frag_texCoords = aTexCoords;
}
"#;

    #[test]
    fn test_collects_interface() {
        let interface = compile(ShaderStage::Vertex, VERTEX).unwrap();
        let inputs: Vec<&str> = interface.inputs.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(inputs, ["aPosition", "aTexCoords"]);
        assert_eq!(interface.outputs, vec![Variable { name: "frag_texCoords".into(), ty: "vec2".into() }]);
        assert_eq!(interface.uniforms.len(), 2);
        assert!(interface.uniforms[0].active);
        assert!(!interface.uniforms[1].active, "unreferenced uniform should be inactive");
    }

    #[test]
    fn test_missing_semicolon_in_body() {
        let source = "#version 330 core\nout vec4 color;\nvoid main()\n{\n    color = vec4(1.0)\n}\n";
        let log = compile(ShaderStage::Fragment, source).unwrap_err();
        assert!(log.contains("expecting `;'"), "{log}");
        assert!(log.starts_with("0:6(1)"), "{log}");
    }

    #[test]
    fn test_unknown_type_and_unbalanced_braces() {
        let bad_type = "uniform texture2 uTexture;\nvoid main() {}\n";
        assert!(compile(ShaderStage::Fragment, bad_type).unwrap_err().contains("texture2"));

        let unbalanced = "void main() {\n if (true) {\n}\n";
        assert!(compile(ShaderStage::Fragment, unbalanced).unwrap_err().contains("end of file"));
    }

    #[test]
    fn test_requires_main() {
        let log = compile(ShaderStage::Vertex, "in vec3 aPosition;\n").unwrap_err();
        assert!(log.contains("lacks `main'"), "{log}");
    }

    #[test]
    fn test_comments_and_helpers() {
        let source = r#"
#version 330 core
/* block
   comment */
uniform sampler2D uTexture; // trailing
in vec2 frag_texCoords;
out vec4 out_color;
vec4 sample_it(vec2 uv);
vec4 sample_it(vec2 uv) { return texture(uTexture, uv); }
void main() { out_color = sample_it(frag_texCoords); }
"#;
        let interface = compile(ShaderStage::Fragment, source).unwrap();
        assert!(interface.uniforms[0].active);
        assert!(is_sampler(&interface.uniforms[0].ty));
    }

    #[test]
    fn test_struct_declarations() {
        let source = r#"
#version 330 core
struct Light {
    vec3 color;
    highp float strength;
};
struct Pair { float a, b; } uPairUnused;
uniform Light uLight;
out vec4 out_color;
Light dim(Light light) { return light; }
void main() { out_color = vec4(dim(uLight).color, 1.0); }
"#;
        let interface = compile(ShaderStage::Fragment, source).unwrap();
        assert_eq!(interface.uniforms.len(), 1);
        assert_eq!(interface.uniforms[0].ty, "Light");
        assert!(interface.uniforms[0].active);

        let minimal = "struct S { float x; };\nvoid main() {}\n";
        assert!(compile(ShaderStage::Fragment, minimal).is_ok());
    }

    #[test]
    fn test_malformed_structs_rejected() {
        let unknown_member = "struct S { texture2 t; };\nvoid main() {}\n";
        assert!(compile(ShaderStage::Fragment, unknown_member).unwrap_err().contains("texture2"));

        let missing_semicolon = "struct S { float x };\nvoid main() {}\n";
        assert!(compile(ShaderStage::Fragment, missing_semicolon).unwrap_err().contains("expecting `;'"));

        let redeclared = "struct vec3 { float x; };\nvoid main() {}\n";
        assert!(compile(ShaderStage::Fragment, redeclared).is_err());
    }
}
