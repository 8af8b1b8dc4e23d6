use std::path::PathBuf;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use log::info;

use crate::engine::graphics::{
    AttribType, BufferKind, BufferObject, GraphicsContext, GraphicsDriver, GraphicsResult, Primitive,
    ShaderProgram, VertexArrayObject,
};
use crate::engine::window::Tutorial;
use crate::tutorials::{CORNFLOWER_BLUE, QUAD_INDICES};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Position {
    pub position: [f32; 3],
}

pub const QUAD_POSITIONS: [Position; 4] = [
    Position { position: [0.5, 0.5, 0.0] },
    Position { position: [0.5, -0.5, 0.0] },
    Position { position: [-0.5, -0.5, 0.0] },
    Position { position: [-0.5, 0.5, 0.0] },
];

// Declared in teardown order.
struct Scene<D: GraphicsDriver> {
    program: ShaderProgram<D>,
    vao: VertexArrayObject<D, Position, u32>,
    ebo: BufferObject<D, u32>,
    vbo: BufferObject<D, Position>,
}

/// A flat-colored quad: one vertex buffer, one index buffer, one program.
pub struct HelloQuad<D: GraphicsDriver> {
    vertex_shader: PathBuf,
    fragment_shader: PathBuf,
    scene: Option<Scene<D>>,
}

impl<D: GraphicsDriver> HelloQuad<D> {
    pub fn new(vertex_shader: impl Into<PathBuf>, fragment_shader: impl Into<PathBuf>) -> Self {
        Self {
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            scene: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.scene.is_some()
    }
}

impl<D: GraphicsDriver> Tutorial<D> for HelloQuad<D> {
    fn load(&mut self, context: &Rc<GraphicsContext<D>>) -> GraphicsResult<()> {
        let [r, g, b, a] = CORNFLOWER_BLUE;
        context.driver().clear_color(r, g, b, a);

        let vbo = BufferObject::create(context, &QUAD_POSITIONS, BufferKind::VertexData)?;
        let ebo = BufferObject::create(context, &QUAD_INDICES, BufferKind::IndexData)?;
        let mut vao = VertexArrayObject::create(context, &vbo, &ebo)?;
        vao.set_attribute(0, 3, AttribType::Float, 1, 0)?;

        let program = ShaderProgram::create(context, &self.vertex_shader, &self.fragment_shader)?;

        context.bind_vertex_array(None);
        info!("[hello-quad] Loaded {} vertices, {} indices", vao.vertex_count(), vao.index_count());
        self.scene = Some(Scene { program, vao, ebo, vbo });
        Ok(())
    }

    fn render(&mut self, context: &GraphicsContext<D>) -> GraphicsResult<()> {
        let Some(scene) = &self.scene else { return Ok(()) };
        context.driver().clear_color_buffer();
        scene.vao.bind();
        scene.program.use_program();
        scene.vao.draw(Primitive::Triangles);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(scene) = self.scene.take() {
            let Scene { program, vao, ebo, vbo } = scene;
            program.dispose();
            vao.dispose();
            ebo.dispose();
            vbo.dispose();
        }
    }
}
