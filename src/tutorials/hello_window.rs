use std::rc::Rc;
use std::time::Duration;

use log::{debug, info};

use crate::engine::graphics::{GraphicsContext, GraphicsDriver, GraphicsResult};
use crate::engine::window::Tutorial;

/// An empty window that only reports its frame callbacks.
#[derive(Debug, Default)]
pub struct HelloWindow {
    updates: u64,
    renders: u64,
}

impl HelloWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }
}

impl<D: GraphicsDriver> Tutorial<D> for HelloWindow {
    fn load(&mut self, _context: &Rc<GraphicsContext<D>>) -> GraphicsResult<()> {
        info!("[hello-window] Window loaded");
        Ok(())
    }

    fn update(&mut self, delta: Duration) {
        self.updates += 1;
        debug!("[hello-window] Frame update: {:.4}s since last update", delta.as_secs_f64());
    }

    fn render(&mut self, _context: &GraphicsContext<D>) -> GraphicsResult<()> {
        self.renders += 1;
        debug!("[hello-window] Frame render {}", self.renders);
        Ok(())
    }

    fn close(&mut self) {
        info!("[hello-window] Closed after {} frames", self.renders);
    }
}
