//! The graphics-context contract consumed by the resource wrappers.
//!
//! A [`GraphicsDriver`] is a thin, typed view of an OpenGL-style API: it hands
//! out opaque handles, mutates driver-global binding state and uploads data.
//! Nothing here validates arguments; that is the job of the wrappers built on
//! top of it.

use std::fmt;
use std::hash::Hash;

/// Which programmable stage a shader object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Binding target of a buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Per-vertex attribute data (`ARRAY_BUFFER`).
    VertexData,
    /// Element indices (`ELEMENT_ARRAY_BUFFER`).
    IndexData,
}

/// Scalar type of one vertex attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttribType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
}

impl AttribType {
    pub fn size_in_bytes(self) -> usize {
        match self {
            AttribType::Byte | AttribType::UnsignedByte => 1,
            AttribType::Short | AttribType::UnsignedShort => 2,
            AttribType::Int | AttribType::UnsignedInt | AttribType::Float => 4,
        }
    }
}

/// Element type of an index buffer as seen by a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
}

impl IndexType {
    pub fn size_in_bytes(self) -> usize {
        match self {
            IndexType::UnsignedByte => 1,
            IndexType::UnsignedShort => 2,
            IndexType::UnsignedInt => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagFilter {
    Nearest,
    Linear,
}

/// One sampling parameter of the texture bound to the 2D target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureParameter {
    WrapS(WrapMode),
    WrapT(WrapMode),
    MinFilter(MinFilter),
    MagFilter(MagFilter),
    BaseLevel(i32),
    MaxLevel(i32),
}

/// Handle types must be plain copyable identifiers the driver can compare.
pub trait Handle: Copy + Eq + Hash + fmt::Debug {}

impl<T: Copy + Eq + Hash + fmt::Debug> Handle for T {}

/// Driver-side operations for the four resource kinds plus the few frame
/// calls the tutorials need.
///
/// All calls are synchronous and act on the single current context. Methods
/// take `&self` because the state they touch lives in the driver, not in the
/// Rust value.
pub trait GraphicsDriver {
    type Program: Handle;
    type Shader: Handle;
    type Texture: Handle;
    type Buffer: Handle;
    type VertexArray: Handle;
    type UniformLocation: fmt::Debug;

    // Programs and shader stages
    fn create_program(&self) -> Result<Self::Program, String>;
    fn delete_program(&self, program: Self::Program);
    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn delete_shader(&self, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn use_program(&self, program: Option<Self::Program>);

    // Uniforms, written to the program currently in use
    fn uniform_location(&self, program: Self::Program, name: &str) -> Option<Self::UniformLocation>;
    fn uniform_1_i32(&self, location: &Self::UniformLocation, value: i32);
    fn uniform_1_f32(&self, location: &Self::UniformLocation, value: f32);
    fn uniform_2_f32(&self, location: &Self::UniformLocation, x: f32, y: f32);
    fn uniform_3_f32(&self, location: &Self::UniformLocation, x: f32, y: f32, z: f32);
    fn uniform_4_f32(&self, location: &Self::UniformLocation, x: f32, y: f32, z: f32, w: f32);
    fn uniform_matrix_4_f32(&self, location: &Self::UniformLocation, columns: &[f32; 16]);

    // Textures
    fn create_texture(&self) -> Result<Self::Texture, String>;
    fn delete_texture(&self, texture: Self::Texture);
    fn active_texture(&self, unit: u32);
    fn bind_texture_2d(&self, texture: Option<Self::Texture>);
    fn tex_image_2d_rgba8(&self, level: i32, width: u32, height: u32, pixels: &[u8]);
    fn tex_parameter_2d(&self, parameter: TextureParameter);
    fn generate_mipmap_2d(&self);

    // Buffers
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn delete_buffer(&self, buffer: Self::Buffer);
    fn bind_buffer(&self, kind: BufferKind, buffer: Option<Self::Buffer>);
    fn buffer_data_static(&self, kind: BufferKind, data: &[u8]);

    // Vertex arrays
    fn create_vertex_array(&self) -> Result<Self::VertexArray, String>;
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);
    fn bind_vertex_array(&self, vertex_array: Option<Self::VertexArray>);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        components: i32,
        ty: AttribType,
        normalized: bool,
        stride: i32,
        offset: i32,
    );

    // Frame
    fn draw_elements(&self, primitive: Primitive, count: i32, index_type: IndexType, offset: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear_color_buffer(&self);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn set_alpha_blending(&self, enabled: bool);
}
