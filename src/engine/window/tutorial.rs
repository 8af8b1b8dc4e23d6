use std::rc::Rc;
use std::time::Duration;

use winit::keyboard::KeyCode;

use crate::engine::graphics::{GraphicsContext, GraphicsDriver, GraphicsResult};

/// Callbacks a tutorial program receives from the host, in the order
/// load → (resize | update → render | key_down)* → close.
pub trait Tutorial<D: GraphicsDriver> {
    /// Creates every GPU resource. Called once the context is current.
    fn load(&mut self, context: &Rc<GraphicsContext<D>>) -> GraphicsResult<()>;

    fn update(&mut self, _delta: Duration) {}

    fn render(&mut self, context: &GraphicsContext<D>) -> GraphicsResult<()>;

    /// Framebuffer size changed; the default resets the viewport.
    fn resize(&mut self, context: &GraphicsContext<D>, width: u32, height: u32) {
        context.driver().viewport(0, 0, width as i32, height as i32);
    }

    fn key_down(&mut self, _key: KeyCode) {}

    /// Releases the tutorial's resources. Must run while the context is
    /// still current.
    fn close(&mut self);
}
