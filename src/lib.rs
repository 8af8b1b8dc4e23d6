//! OpenGL tutorial programs built on a small set of RAII wrappers around
//! shader programs, textures, buffers and vertex arrays.

pub mod config;
pub mod engine;
pub mod tutorials;

pub use config::{AppConfig, TutorialKind};
