//! Command-line configuration for the tutorial binary.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use crate::engine::logging::LoggingConfig;

/// Which tutorial program to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TutorialKind {
    /// Blank window that logs its frame callbacks
    HelloWindow,
    /// Untextured quad drawn from a vertex and an index buffer
    HelloQuad,
    /// Tiled texture with alpha blending
    HelloTexture,
    /// Edge-clamped texture spun by a transform matrix
    Transformations,
}

/// OpenGL tutorial programs
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Tutorial to run
    #[arg(long, value_enum, default_value_t = TutorialKind::Transformations)]
    pub tutorial: TutorialKind,

    /// Window width
    #[arg(long, default_value = "1600")]
    pub width: u32,

    /// Window height
    #[arg(long, default_value = "1200")]
    pub height: u32,

    /// Window title
    #[arg(long, default_value = "LearnOpenGL with Rust")]
    pub title: String,

    /// Directory holding `shaders/` and `images/`
    #[arg(long, default_value = "resources")]
    pub resources: PathBuf,

    /// Wait for vertical sync when presenting
    #[arg(long)]
    pub vsync: bool,

    /// Log filter, overrides RUST_LOG
    #[arg(long)]
    pub log: Option<String>,
}

impl AppConfig {
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            filter: self.log.clone(),
            ..LoggingConfig::default()
        }
    }

    pub fn window(&self) -> WindowConfig {
        WindowConfig {
            title: self.title.clone(),
            width: self.width,
            height: self.height,
            vsync: self.vsync,
        }
    }

    pub fn shader(&self, name: &str) -> PathBuf {
        resource(&self.resources, "shaders", name)
    }

    pub fn image(&self, name: &str) -> PathBuf {
        resource(&self.resources, "images", name)
    }
}

fn resource(root: &Path, kind: &str, name: &str) -> PathBuf {
    root.join(kind).join(name)
}

/// What the window host needs from the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_tutorial_window() {
        let config = AppConfig::parse_from(["gl-tutorials"]);
        assert_eq!(config.tutorial, TutorialKind::Transformations);
        assert_eq!((config.width, config.height), (1600, 1200));
        assert!(!config.vsync);
        assert_eq!(config.shader("textured.vert"), PathBuf::from("resources/shaders/textured.vert"));
    }

    #[test]
    fn test_parses_overrides() {
        let config = AppConfig::parse_from([
            "gl-tutorials",
            "--tutorial",
            "hello-quad",
            "--width",
            "800",
            "--resources",
            "/tmp/assets",
            "--log",
            "debug",
        ]);
        assert_eq!(config.tutorial, TutorialKind::HelloQuad);
        assert_eq!(config.window().width, 800);
        assert_eq!(config.image("silk.png"), PathBuf::from("/tmp/assets/images/silk.png"));
        assert_eq!(config.logging().filter.as_deref(), Some("debug"));
    }

    #[test]
    fn test_parses_hello_window() {
        let config = AppConfig::parse_from(["gl-tutorials", "--tutorial", "hello-window"]);
        assert_eq!(config.tutorial, TutorialKind::HelloWindow);
    }

    #[test]
    fn test_rejects_unknown_tutorial() {
        assert!(AppConfig::try_parse_from(["gl-tutorials", "--tutorial", "hello-cube"]).is_err());
    }
}
