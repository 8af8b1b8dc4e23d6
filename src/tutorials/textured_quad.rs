use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use glam::Mat4;
use log::{info, warn};
use winit::keyboard::KeyCode;

use crate::engine::graphics::{
    AttribType, BufferKind, BufferObject, GraphicsContext, GraphicsDriver, GraphicsResult, PixelBuffer,
    Primitive, ShaderProgram, Texture, TextureOptions, VertexArrayObject,
};
use crate::engine::window::Tutorial;
use crate::tutorials::{CORNFLOWER_BLUE, QUAD_INDICES};

/// X, Y, Z, S, T per vertex, with T = 1 along the top edge.
pub const HELLO_TEXTURE_QUAD: [f32; 20] = [
    0.5, 0.5, 0.0, 1.0, 1.0,
    0.5, -0.5, 0.0, 1.0, 0.0,
    -0.5, -0.5, 0.0, 0.0, 0.0,
    -0.5, 0.5, 0.0, 0.0, 1.0,
];

/// Same quad with T = 0 along the top edge, so image row 0 lands on top.
pub const TRANSFORMED_QUAD: [f32; 20] = [
    0.5, 0.5, 0.0, 1.0, 0.0,
    0.5, -0.5, 0.0, 1.0, 1.0,
    -0.5, -0.5, 0.0, 0.0, 1.0,
    -0.5, 0.5, 0.0, 0.0, 0.0,
];

const FLOATS_PER_VERTEX: usize = 5;

/// Radians per second the transformations tutorial spins at.
const SPIN_SPEED: f32 = std::f32::consts::FRAC_PI_2;

// Declared in teardown order.
struct Scene<D: GraphicsDriver> {
    texture: Texture<D>,
    program: ShaderProgram<D>,
    vao: VertexArrayObject<D, f32, u32>,
    ebo: BufferObject<D, u32>,
    vbo: BufferObject<D, f32>,
}

/// A quad sampling one texture on unit 0, optionally spun by `uTransform`.
pub struct TexturedQuad<D: GraphicsDriver> {
    name: &'static str,
    vertex_shader: PathBuf,
    fragment_shader: PathBuf,
    image: PathBuf,
    vertices: &'static [f32; 20],
    options: TextureOptions,
    blending: bool,
    spinning: bool,
    paused: bool,
    angle: f32,
    scene: Option<Scene<D>>,
}

impl<D: GraphicsDriver> TexturedQuad<D> {
    /// Tiled, nearest-filtered texture drawn with alpha blending.
    pub fn hello_texture(
        vertex_shader: impl Into<PathBuf>,
        fragment_shader: impl Into<PathBuf>,
        image: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: "hello-texture",
            vertex_shader: vertex_shader.into(),
            fragment_shader: fragment_shader.into(),
            image: image.into(),
            vertices: &HELLO_TEXTURE_QUAD,
            options: TextureOptions::repeating(),
            blending: true,
            spinning: false,
            paused: false,
            angle: 0.0,
            scene: None,
        }
    }

    /// Edge-clamped texture rotated about Z every frame. Space pauses.
    pub fn transformations(
        vertex_shader: impl Into<PathBuf>,
        fragment_shader: impl Into<PathBuf>,
        image: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: "transformations",
            vertices: &TRANSFORMED_QUAD,
            options: TextureOptions::clamped(),
            blending: false,
            spinning: true,
            ..Self::hello_texture(vertex_shader, fragment_shader, image)
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.scene.is_some()
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    fn load_texture(&self, context: &Rc<GraphicsContext<D>>) -> GraphicsResult<Texture<D>> {
        Texture::create(context, &self.image, self.options).or_else(|e| {
            warn!("Failed to load texture: {}, using checkerboard", e);
            Texture::from_pixels(context, &PixelBuffer::checkerboard(), self.options)
        })
    }
}

impl<D: GraphicsDriver> Tutorial<D> for TexturedQuad<D> {
    fn load(&mut self, context: &Rc<GraphicsContext<D>>) -> GraphicsResult<()> {
        let [r, g, b, a] = CORNFLOWER_BLUE;
        context.driver().clear_color(r, g, b, a);

        let vbo = BufferObject::create(context, self.vertices, BufferKind::VertexData)?;
        let ebo = BufferObject::create(context, &QUAD_INDICES, BufferKind::IndexData)?;
        let mut vao = VertexArrayObject::create(context, &vbo, &ebo)?;
        vao.set_attribute(0, 3, AttribType::Float, FLOATS_PER_VERTEX, 0)?;
        vao.set_attribute(1, 2, AttribType::Float, FLOATS_PER_VERTEX, 3)?;
        context.bind_vertex_array(None);

        let program = ShaderProgram::create(context, &self.vertex_shader, &self.fragment_shader)?;
        let texture = self.load_texture(context)?;

        if self.blending {
            context.driver().set_alpha_blending(true);
        }
        info!(
            "[{}] Loaded quad with {}x{} texture ({} mip levels)",
            self.name,
            texture.width(),
            texture.height(),
            texture.mip_levels()
        );
        self.scene = Some(Scene { texture, program, vao, ebo, vbo });
        Ok(())
    }

    fn update(&mut self, delta: Duration) {
        if self.spinning && !self.paused {
            self.angle = (self.angle + SPIN_SPEED * delta.as_secs_f32()) % std::f32::consts::TAU;
        }
    }

    fn render(&mut self, context: &GraphicsContext<D>) -> GraphicsResult<()> {
        let Some(scene) = &self.scene else { return Ok(()) };
        context.driver().clear_color_buffer();
        scene.vao.bind();
        scene.program.use_program();
        scene.program.set_uniform("uTexture", 0)?;
        if self.spinning {
            scene.program.set_uniform("uTransform", Mat4::from_rotation_z(self.angle))?;
        }
        scene.texture.bind(0);
        scene.vao.draw(Primitive::Triangles);
        Ok(())
    }

    fn key_down(&mut self, key: KeyCode) {
        if key == KeyCode::Space && self.spinning {
            self.paused = !self.paused;
        }
    }

    fn close(&mut self) {
        if let Some(scene) = self.scene.take() {
            let Scene { texture, program, vao, ebo, vbo } = scene;
            texture.dispose();
            program.dispose();
            vao.dispose();
            ebo.dispose();
            vbo.dispose();
        }
    }
}
