use std::fs;
use std::path::Path;
use std::rc::Rc;

use log::{debug, error};

use crate::engine::graphics::context::GraphicsContext;
use crate::engine::graphics::driver::{GraphicsDriver, ShaderStage};
use crate::engine::graphics::error::{GraphicsError, GraphicsResult};
use crate::engine::graphics::uniform::UniformValue;

/// A linked vertex + fragment program.
///
/// Construction either yields a linked program or fails having released
/// every handle it created. The program handle is released on drop.
pub struct ShaderProgram<D: GraphicsDriver> {
    context: Rc<GraphicsContext<D>>,
    handle: D::Program,
}

/// A compiled stage attached to a program under construction. Dropping it
/// detaches and deletes the stage, which is all a linked program needs.
struct AttachedStage<'a, D: GraphicsDriver> {
    context: &'a GraphicsContext<D>,
    program: D::Program,
    shader: D::Shader,
}

impl<D: GraphicsDriver> Drop for AttachedStage<'_, D> {
    fn drop(&mut self) {
        let driver = self.context.driver();
        driver.detach_shader(self.program, self.shader);
        driver.delete_shader(self.shader);
    }
}

fn read_source(path: &Path) -> GraphicsResult<String> {
    if !path.exists() {
        error!("Failed to find shader source path {}", path.display());
        return Err(GraphicsError::missing(path));
    }
    fs::read_to_string(path).map_err(|source| GraphicsError::Io { path: path.to_path_buf(), source })
}

impl<D: GraphicsDriver> ShaderProgram<D> {
    /// Reads, compiles and links the two stage files.
    pub fn create(
        context: &Rc<GraphicsContext<D>>,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> GraphicsResult<Self> {
        let vertex_source = read_source(vertex_path.as_ref())?;
        let fragment_source = read_source(fragment_path.as_ref())?;
        let program = Self::from_sources(context, &vertex_source, &fragment_source)?;
        debug!(
            "[shader] Linked program {:?} from {} and {}",
            program.handle,
            vertex_path.as_ref().display(),
            fragment_path.as_ref().display()
        );
        Ok(program)
    }

    pub fn from_sources(
        context: &Rc<GraphicsContext<D>>,
        vertex_source: &str,
        fragment_source: &str,
    ) -> GraphicsResult<Self> {
        let handle = context
            .driver()
            .create_program()
            .map_err(GraphicsError::allocation("program"))?;
        // Owned from here on, so every early return below deletes the program.
        let program = Self { context: Rc::clone(context), handle };

        let vertex = program.compile_stage(ShaderStage::Vertex, vertex_source)?;
        let fragment = program.compile_stage(ShaderStage::Fragment, fragment_source)?;
        let linked = program.link();
        drop(fragment);
        drop(vertex);
        linked?;

        Ok(program)
    }

    fn compile_stage(&self, stage: ShaderStage, source: &str) -> GraphicsResult<AttachedStage<'_, D>> {
        let driver = self.context.driver();
        let shader = driver
            .create_shader(stage)
            .map_err(GraphicsError::allocation("shader"))?;
        driver.shader_source(shader, source);
        driver.compile_shader(shader);
        driver.attach_shader(self.handle, shader);
        let attached = AttachedStage { context: &self.context, program: self.handle, shader };

        if !driver.shader_compile_status(shader) {
            let log = driver.shader_info_log(shader);
            error!("Error compiling {} shader: {}", stage, log);
            return Err(GraphicsError::Compile { stage, log });
        }
        Ok(attached)
    }

    fn link(&self) -> GraphicsResult<()> {
        let driver = self.context.driver();
        driver.link_program(self.handle);
        if !driver.program_link_status(self.handle) {
            let log = driver.program_info_log(self.handle);
            error!("Error linking shader program: {}", log);
            return Err(GraphicsError::Link { log });
        }
        Ok(())
    }

    /// Makes this the program used by subsequent draw calls, replacing
    /// whichever program was in use.
    pub fn use_program(&self) {
        self.context.use_program(Some(self.handle));
    }

    /// Writes `value` into the active uniform `name`.
    ///
    /// Uniform writes land on the program in use, so this program is made
    /// current first if it is not already. A name the linker does not report
    /// as active (undeclared, or optimized away) is an error and nothing is
    /// written.
    pub fn set_uniform<V: UniformValue>(&self, name: &str, value: V) -> GraphicsResult<()> {
        let driver = self.context.driver();
        let location = driver.uniform_location(self.handle, name).ok_or_else(|| {
            error!("{} uniform not found on shader", name);
            GraphicsError::UniformNotFound { name: name.to_string() }
        })?;
        if self.context.current_program() != Some(self.handle) {
            self.use_program();
        }
        value.upload(driver, &location);
        Ok(())
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.context.driver().uniform_location(self.handle, name).is_some()
    }

    pub fn handle(&self) -> D::Program {
        self.handle
    }

    /// Releases the program now instead of at end of scope.
    pub fn dispose(self) {}
}

impl<D: GraphicsDriver> Drop for ShaderProgram<D> {
    fn drop(&mut self) {
        debug!("[shader] Deleting program {:?}", self.handle);
        self.context.delete_program(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graphics::headless::{DriverCall, HeadlessDriver};

    const VERTEX: &str = "#version 330 core\nlayout (location = 0) in vec3 aPosition;\nvoid main() { gl_Position = vec4(aPosition, 1.0); }\n";
    const FRAGMENT: &str = "#version 330 core\nuniform float uAlpha;\nout vec4 out_color;\nvoid main() { out_color = vec4(1.0, 1.0, 1.0, uAlpha); }\n";

    #[test]
    fn test_stages_released_after_link() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::new()));
        let program = ShaderProgram::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();

        assert_eq!(ctx.driver().live_shaders(), 0);
        assert_eq!(ctx.driver().live_programs(), 1);

        let calls = ctx.driver().calls().to_vec();
        let link = calls.iter().position(|c| *c == DriverCall::LinkProgram(program.handle())).unwrap();
        let detaches = calls.iter().filter(|c| matches!(c, DriverCall::DetachShader { .. })).count();
        let first_detach = calls.iter().position(|c| matches!(c, DriverCall::DetachShader { .. })).unwrap();
        assert_eq!(detaches, 2);
        assert!(first_detach > link);

        program.dispose();
        assert_eq!(ctx.driver().live_programs(), 0);
    }

    #[test]
    fn test_set_uniform_makes_program_current() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::new()));
        let program = ShaderProgram::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();
        assert_eq!(ctx.current_program(), None);

        program.set_uniform("uAlpha", 0.5f32).unwrap();
        assert_eq!(ctx.current_program(), Some(program.handle()));
        assert!(ctx.driver().take_errors().is_empty());
    }

    #[test]
    fn test_dropping_current_program_clears_binding() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::new()));
        let program = ShaderProgram::from_sources(&ctx, VERTEX, FRAGMENT).unwrap();
        program.use_program();
        drop(program);
        assert_eq!(ctx.current_program(), None);
        assert_eq!(ctx.driver().state().current_program, None);
    }

    #[test]
    fn test_allocation_failure_surfaces() {
        let ctx = Rc::new(GraphicsContext::new(HeadlessDriver::with_object_limit(2)));
        let err = ShaderProgram::from_sources(&ctx, VERTEX, FRAGMENT).err().unwrap();
        assert!(matches!(err, GraphicsError::Allocation { kind: "shader", .. }), "{err}");
        assert_eq!(ctx.driver().live_programs(), 0);
        assert_eq!(ctx.driver().live_shaders(), 0);
    }
}
