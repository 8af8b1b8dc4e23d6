//! Window, GL context and the per-tutorial callback contract.

pub mod app;
pub mod tutorial;

pub use app::{run, TutorialApp};
pub use tutorial::Tutorial;
