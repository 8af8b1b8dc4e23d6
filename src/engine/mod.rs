//! Engine module containing graphics, input, logging and window management.

pub mod graphics;
pub mod input;
pub mod logging;
pub mod window;

// Re-export commonly used types
pub use graphics::{BufferObject, GraphicsContext, GraphicsError, ShaderProgram, Texture, VertexArrayObject};
