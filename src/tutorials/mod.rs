//! The tutorial programs, each a [`Tutorial`](crate::engine::window::Tutorial)
//! the window host can run.

pub mod hello_quad;
pub mod hello_window;
pub mod textured_quad;

pub use hello_quad::HelloQuad;
pub use hello_window::HelloWindow;
pub use textured_quad::TexturedQuad;

/// Clear color shared by every tutorial.
pub const CORNFLOWER_BLUE: [f32; 4] = [100.0 / 255.0, 149.0 / 255.0, 237.0 / 255.0, 1.0];

/// Two triangles covering a centered quad.
pub const QUAD_INDICES: [u32; 6] = [
    0, 1, 3,
    1, 2, 3,
];
