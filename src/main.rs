//! Application entry point.

use clap::Parser;
use log::info;

use gl_tutorials::engine::logging::init_logging;
use gl_tutorials::engine::window;
use gl_tutorials::tutorials::{HelloQuad, HelloWindow, TexturedQuad};
use gl_tutorials::{AppConfig, TutorialKind};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::parse();
    init_logging(config.logging());
    info!("Running {:?} from {}", config.tutorial, config.resources.display());

    let window = config.window();
    match config.tutorial {
        TutorialKind::HelloWindow => window::run(window, HelloWindow::new()),
        TutorialKind::HelloQuad => window::run(
            window,
            HelloQuad::new(config.shader("hello_quad.vert"), config.shader("hello_quad.frag")),
        ),
        TutorialKind::HelloTexture => window::run(
            window,
            TexturedQuad::hello_texture(
                config.shader("textured.vert"),
                config.shader("textured.frag"),
                config.image("silk.png"),
            ),
        ),
        TutorialKind::Transformations => window::run(
            window,
            TexturedQuad::transformations(
                config.shader("transform.vert"),
                config.shader("textured.frag"),
                config.image("silk.png"),
            ),
        ),
    }
}
