use std::fs;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use gl_tutorials::engine::graphics::headless::{DriverCall, GlErrorCode, HeadlessDriver, UniformData};
use gl_tutorials::engine::graphics::{
    AttribType, BufferKind, BufferObject, GraphicsContext, GraphicsError, PixelBuffer, Primitive,
    ShaderProgram, ShaderStage, Texture, TextureOptions, VertexArrayObject,
};
use tempfile::TempDir;

const QUAD_VERTEX: &str = r#"#version 330 core
layout (location = 0) in vec3 aPosition;
layout (location = 1) in vec2 aTexCoords;
out vec2 frag_texCoords;
void main()
{
    gl_Position = vec4(aPosition, 1.0);
    frag_texCoords = aTexCoords;
}
"#;

const QUAD_FRAGMENT: &str = r#"#version 330 core
in vec2 frag_texCoords;
uniform sampler2D uTexture;
uniform float uUnused;
out vec4 out_color;
void main()
{
    out_color = texture(uTexture, frag_texCoords);
}
"#;

fn context() -> Rc<GraphicsContext<HeadlessDriver>> {
    Rc::new(GraphicsContext::new(HeadlessDriver::new()))
}

fn write(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn write_png(dir: &TempDir, name: &str, width: u32, height: u32, pixels: Vec<u8>) -> PathBuf {
    let path = dir.path().join(name);
    image::RgbaImage::from_raw(width, height, pixels).unwrap().save(&path).unwrap();
    path
}

fn shader_files(dir: &TempDir, vertex: &str, fragment: &str) -> (PathBuf, PathBuf) {
    (write(dir, "shader.vert", vertex.as_bytes()), write(dir, "shader.frag", fragment.as_bytes()))
}

fn assert_no_live_objects(ctx: &GraphicsContext<HeadlessDriver>) {
    let driver = ctx.driver();
    assert_eq!(driver.live_programs(), 0, "programs leaked");
    assert_eq!(driver.live_shaders(), 0, "shaders leaked");
    assert_eq!(driver.live_textures(), 0, "textures leaked");
    assert_eq!(driver.live_buffers(), 0, "buffers leaked");
    assert_eq!(driver.live_vertex_arrays(), 0, "vertex arrays leaked");
}

#[test]
fn test_program_from_files_accepts_sampler_unit() {
    let dir = TempDir::new().unwrap();
    let (vertex, fragment) = shader_files(&dir, QUAD_VERTEX, QUAD_FRAGMENT);
    let ctx = context();

    let program = ShaderProgram::create(&ctx, &vertex, &fragment).unwrap();
    program.use_program();
    assert!(program.has_uniform("uTexture"));
    program.set_uniform("uTexture", 0).unwrap();

    assert_eq!(ctx.driver().uniform_value(program.handle(), "uTexture"), Some(UniformData::Int(0)));
    assert!(ctx.driver().take_errors().is_empty());
    assert_eq!(ctx.driver().live_shaders(), 0);
}

#[test]
fn test_fragment_compile_error_is_tagged_and_leaks_nothing() {
    let dir = TempDir::new().unwrap();
    let broken = "#version 330 core\nout vec4 out_color;\nvoid main()\n{\n    out_color = vec4(1.0)\n}\n";
    let (vertex, fragment) = shader_files(&dir, QUAD_VERTEX, broken);
    let ctx = context();

    let err = ShaderProgram::create(&ctx, &vertex, &fragment).err().unwrap();
    match err {
        GraphicsError::Compile { stage, log } => {
            assert_eq!(stage, ShaderStage::Fragment);
            assert!(log.contains("expecting `;'"), "{log}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_no_live_objects(&ctx);
    assert!(ctx.driver().take_errors().is_empty());
}

#[test]
fn test_vertex_compile_error_stops_before_fragment() {
    let ctx = context();
    let err = ShaderProgram::from_sources(&ctx, "void main() {", QUAD_FRAGMENT).err().unwrap();
    assert!(matches!(err, GraphicsError::Compile { stage: ShaderStage::Vertex, .. }), "{err}");

    let created_fragment = ctx
        .driver()
        .calls()
        .iter()
        .any(|call| matches!(call, DriverCall::CreateShader(ShaderStage::Fragment, _)));
    assert!(!created_fragment);
    assert_no_live_objects(&ctx);
}

#[test]
fn test_link_error_releases_program_and_stages() {
    let ctx = context();
    let fragment = "#version 330 core\nin vec3 vertex_color;\nout vec4 out_color;\nvoid main() { out_color = vec4(vertex_color, 1.0); }\n";
    let err = ShaderProgram::from_sources(&ctx, QUAD_VERTEX, fragment).err().unwrap();

    match err {
        GraphicsError::Link { log } => assert!(log.contains("vertex_color"), "{log}"),
        other => panic!("unexpected error: {other}"),
    }
    assert_no_live_objects(&ctx);
}

#[test]
fn test_missing_source_fails_before_any_driver_call() {
    let dir = TempDir::new().unwrap();
    let vertex = write(&dir, "shader.vert", QUAD_VERTEX.as_bytes());
    let ctx = context();

    let err = ShaderProgram::create(&ctx, &vertex, dir.path().join("missing.frag")).err().unwrap();
    match err {
        GraphicsError::Io { path, source } => {
            assert!(path.ends_with("missing.frag"));
            assert_eq!(source.kind(), io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(ctx.driver().calls().is_empty());
}

#[test]
fn test_missing_uniform_writes_nothing() {
    let ctx = context();
    let program = ShaderProgram::from_sources(&ctx, QUAD_VERTEX, QUAD_FRAGMENT).unwrap();
    program.use_program();
    ctx.driver().clear_calls();

    for name in ["uMissing", "uUnused"] {
        let err = program.set_uniform(name, 1.0f32).unwrap_err();
        assert!(matches!(&err, GraphicsError::UniformNotFound { name: n } if n == name), "{err}");
        assert_eq!(err.to_string(), format!("uniform `{name}` not found on shader"));
    }
    assert!(ctx.driver().calls().is_empty());
}

#[test]
fn test_sampler_rejects_float_at_driver() {
    let ctx = context();
    let program = ShaderProgram::from_sources(&ctx, QUAD_VERTEX, QUAD_FRAGMENT).unwrap();
    program.set_uniform("uTexture", 0.0f32).unwrap();

    let errors = ctx.driver().take_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, GlErrorCode::InvalidOperation);
    assert_eq!(ctx.driver().uniform_value(program.handle(), "uTexture"), None);
}

#[test]
fn test_texture_uploads_decoded_pixels() {
    let dir = TempDir::new().unwrap();
    let pixels = vec![255, 0, 0, 255, 0, 0, 255, 128];
    let path = write_png(&dir, "pair.png", 1, 2, pixels.clone());
    let ctx = context();

    let texture = Texture::create(&ctx, &path, TextureOptions::repeating()).unwrap();
    let snapshot = ctx.driver().texture(texture.handle()).unwrap();
    let base = snapshot.base().unwrap();
    assert_eq!((base.width, base.height), (1, 2));
    assert_eq!(base.pixels, pixels);
    assert_eq!(snapshot.levels.len(), 2);

    let flipped = TextureOptions { flip_vertically: true, ..TextureOptions::repeating() };
    let texture = Texture::create(&ctx, &path, flipped).unwrap();
    let base = ctx.driver().texture(texture.handle()).unwrap().levels[0].pixels.clone();
    assert_eq!(base, [0, 0, 255, 128, 255, 0, 0, 255]);
}

#[test]
fn test_texture_errors() {
    let dir = TempDir::new().unwrap();
    let ctx = context();

    let missing = Texture::create(&ctx, dir.path().join("nope.png"), TextureOptions::default()).err().unwrap();
    assert!(matches!(missing, GraphicsError::Io { .. }), "{missing}");

    let garbage = write(&dir, "garbage.png", b"not an image at all");
    let undecodable = Texture::create(&ctx, &garbage, TextureOptions::default()).err().unwrap();
    assert!(matches!(undecodable, GraphicsError::Decode { .. }), "{undecodable}");

    assert_no_live_objects(&ctx);
}

#[test]
fn test_buffer_recreate_is_content_preserving() {
    let ctx = context();
    let data: Vec<f32> = (0..12).map(|i| i as f32 * 0.25).collect();

    let first = BufferObject::create(&ctx, &data, BufferKind::VertexData).unwrap();
    let before = ctx.driver().buffer_contents(first.handle()).unwrap();
    first.dispose();
    assert_eq!(ctx.driver().live_buffers(), 0);

    let second = BufferObject::create(&ctx, &data, BufferKind::VertexData).unwrap();
    let after = ctx.driver().buffer_contents(second.handle()).unwrap();
    assert_eq!(before, after);
    assert_eq!(after.len(), data.len() * 4);
}

#[test]
fn test_attributes_last_write_wins_and_order_independent() {
    let ctx = context();
    let vbo = BufferObject::create(&ctx, &[0.0f32; 20], BufferKind::VertexData).unwrap();
    let ebo = BufferObject::create(&ctx, &[0u32, 1, 2], BufferKind::IndexData).unwrap();

    let mut forward = VertexArrayObject::create(&ctx, &vbo, &ebo).unwrap();
    forward.set_attribute(0, 3, AttribType::Float, 5, 0).unwrap();
    forward.set_attribute(1, 2, AttribType::Float, 5, 3).unwrap();

    let mut backward = VertexArrayObject::create(&ctx, &vbo, &ebo).unwrap();
    backward.set_attribute(1, 4, AttribType::Float, 4, 1).unwrap();
    backward.set_attribute(1, 2, AttribType::Float, 5, 3).unwrap();
    backward.set_attribute(0, 3, AttribType::Float, 5, 0).unwrap();

    let a = ctx.driver().vertex_array(forward.handle()).unwrap();
    let b = ctx.driver().vertex_array(backward.handle()).unwrap();
    assert_eq!(a.attributes, b.attributes);
    assert_eq!(backward.attributes().len(), 2);
    let slot_one = backward.attributes().iter().find(|a| a.index == 1).unwrap();
    assert_eq!((slot_one.components, slot_one.stride, slot_one.offset), (2, 5, 3));
}

#[test]
fn test_quad_scenario_draws_exact_indices() {
    let ctx = context();
    let vertices = [0.5f32, 0.5, 0.0, 0.5, -0.5, 0.0, -0.5, -0.5, 0.0, -0.5, 0.5, 0.0];
    let indices = [0u32, 1, 3, 1, 2, 3];
    let vertex = "#version 330 core\nlayout (location = 0) in vec3 aPosition;\nvoid main() { gl_Position = vec4(aPosition, 1.0); }\n";
    let fragment = "#version 330 core\nout vec4 out_color;\nvoid main() { out_color = vec4(1.0); }\n";

    let vbo = BufferObject::create(&ctx, &vertices, BufferKind::VertexData).unwrap();
    let ebo = BufferObject::create(&ctx, &indices, BufferKind::IndexData).unwrap();
    let mut vao = VertexArrayObject::create(&ctx, &vbo, &ebo).unwrap();
    vao.set_attribute(0, 3, AttribType::Float, 3, 0).unwrap();
    let program = ShaderProgram::from_sources(&ctx, vertex, fragment).unwrap();

    vao.bind();
    program.use_program();
    vao.draw_count(Primitive::Triangles, 6);

    let draws = ctx.driver().draws();
    assert_eq!(draws.len(), 1);
    let draw = &draws[0];
    assert_eq!(draw.primitive, Primitive::Triangles);
    assert_eq!(draw.indices, indices);
    assert_eq!(draw.vertex_count, 4);
    assert!(draw.indices.iter().all(|&i| (i as usize) < draw.vertex_count));
    assert_eq!(vao.vertex_count(), 4);
}

#[test]
fn test_bound_texture_is_what_the_draw_samples() {
    let ctx = context();
    let vbo = BufferObject::create(&ctx, &[0.0f32; 20], BufferKind::VertexData).unwrap();
    let ebo = BufferObject::create(&ctx, &[0u32, 1, 3, 1, 2, 3], BufferKind::IndexData).unwrap();
    let mut vao = VertexArrayObject::create(&ctx, &vbo, &ebo).unwrap();
    vao.set_attribute(0, 3, AttribType::Float, 5, 0).unwrap();
    vao.set_attribute(1, 2, AttribType::Float, 5, 3).unwrap();
    let program = ShaderProgram::from_sources(&ctx, QUAD_VERTEX, QUAD_FRAGMENT).unwrap();

    let first = Texture::from_pixels(&ctx, &PixelBuffer::checkerboard(), TextureOptions::clamped()).unwrap();
    let second = Texture::from_pixels(&ctx, &PixelBuffer::checkerboard(), TextureOptions::clamped()).unwrap();

    program.set_uniform("uTexture", 0).unwrap();
    first.bind(0);
    second.bind(0);
    vao.draw(Primitive::Triangles);

    let draws = ctx.driver().draws();
    assert_eq!(draws[0].textures.get(&0), Some(&second.handle()));
    assert_eq!(draws[0].uniforms.get("uTexture"), Some(&UniformData::Int(0)));
    assert_eq!(ctx.bound_texture(0), Some(second.handle()));
}

#[test]
fn test_teardown_releases_everything() {
    let dir = TempDir::new().unwrap();
    let image = write_png(&dir, "tile.png", 4, 4, vec![200; 64]);
    let ctx = context();

    let vbo = BufferObject::create(&ctx, &[0.0f32; 20], BufferKind::VertexData).unwrap();
    let ebo = BufferObject::create(&ctx, &[0u32, 1, 2], BufferKind::IndexData).unwrap();
    let vao = VertexArrayObject::create(&ctx, &vbo, &ebo).unwrap();
    let program = ShaderProgram::from_sources(&ctx, QUAD_VERTEX, QUAD_FRAGMENT).unwrap();
    let texture = Texture::create(&ctx, &image, TextureOptions::default()).unwrap();
    assert_eq!(texture.mip_levels(), 3);

    texture.dispose();
    program.dispose();
    vao.dispose();
    assert_eq!(ctx.driver().live_buffers(), 2);
    ebo.dispose();
    vbo.dispose();

    assert_no_live_objects(&ctx);
    assert!(ctx.driver().take_errors().is_empty());
}

