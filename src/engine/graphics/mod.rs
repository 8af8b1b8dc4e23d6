pub mod buffer;
pub mod context;
pub mod driver;
pub mod error;
pub mod glow_backend;
#[cfg(any(test, feature = "headless"))]
pub mod headless;
pub mod pixels;
pub mod shader;
pub mod texture;
pub mod uniform;
pub mod vertex_array;

pub use buffer::{BufferObject, IndexElement};
pub use context::GraphicsContext;
pub use driver::{AttribType, BufferKind, GraphicsDriver, Primitive, ShaderStage};
pub use error::{GraphicsError, GraphicsResult};
#[cfg(any(test, feature = "headless"))]
pub use headless::HeadlessDriver;
pub use pixels::PixelBuffer;
pub use shader::ShaderProgram;
pub use texture::{Texture, TextureOptions};
pub use uniform::UniformValue;
pub use vertex_array::{VertexArrayObject, VertexAttribute};
