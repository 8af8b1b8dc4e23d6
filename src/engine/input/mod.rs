//! Keyboard state for the tutorial host.

pub mod handler;

pub use handler::InputHandler;
