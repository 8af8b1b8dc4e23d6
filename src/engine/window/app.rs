//! winit application that owns the window, the GL context and one tutorial.

use std::error::Error;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Instant;

use glutin::config::{Config, ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, PossiblyCurrentContext, Version,
};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow as _};
use log::{error, info, warn};
use raw_window_handle::HasWindowHandle;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::config::WindowConfig;
use crate::engine::graphics::GraphicsContext;
use crate::engine::input::InputHandler;
use crate::engine::window::tutorial::Tutorial;

/// Everything that lives exactly as long as the window. Field order is drop
/// order: the graphics context goes before the GL context it calls into.
struct GlWindow {
    graphics: Rc<GraphicsContext<glow::Context>>,
    surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    window: Window,
}

pub struct TutorialApp<T: Tutorial<glow::Context>> {
    config: WindowConfig,
    tutorial: T,
    input: InputHandler,
    gl: Option<GlWindow>,
    last_frame: Instant,
    failure: Option<Box<dyn Error>>,
}

impl<T: Tutorial<glow::Context>> TutorialApp<T> {
    pub fn new(config: WindowConfig, tutorial: T) -> Self {
        Self {
            config,
            tutorial,
            input: InputHandler::new(),
            gl: None,
            last_frame: Instant::now(),
            failure: None,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn take_failure(&mut self) -> Option<Box<dyn Error>> {
        self.failure.take()
    }

    fn create_gl_window(&self, event_loop: &ActiveEventLoop) -> Result<GlWindow, Box<dyn Error>> {
        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));
        let template = ConfigTemplateBuilder::new().with_alpha_size(8);
        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(attributes))
            .build(event_loop, template, pick_config)?;
        let window = window.ok_or("display builder did not create a window")?;

        let raw_window_handle = window.window_handle().ok().map(|handle| handle.as_raw());
        let gl_display = gl_config.display();
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .with_profile(GlProfile::Core)
            .build(raw_window_handle);
        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes)? };

        let surface_attributes = window.build_surface_attributes(Default::default())?;
        let surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes)? };
        let gl_context = not_current.make_current(&surface)?;

        let interval = if self.config.vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(e) = surface.set_swap_interval(&gl_context, interval) {
            warn!("Failed to set swap interval: {:?}", e);
        }

        let gl = unsafe { glow::Context::from_loader_function_cstr(|name| gl_display.get_proc_address(name)) };
        info!("[window] OpenGL context ready: {}x{}", self.config.width, self.config.height);

        Ok(GlWindow {
            graphics: Rc::new(GraphicsContext::new(gl)),
            surface,
            gl_context,
            window,
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let Some(gl) = &self.gl else { return };
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) else {
            return;
        };
        gl.surface.resize(&gl.gl_context, width, height);
        self.tutorial.resize(&gl.graphics, size.width, size.height);
    }

    fn redraw(&mut self) -> Result<(), Box<dyn Error>> {
        let Some(gl) = &self.gl else { return Ok(()) };
        let now = Instant::now();
        self.tutorial.update(now - self.last_frame);
        self.last_frame = now;

        self.tutorial.render(&gl.graphics)?;
        gl.surface.swap_buffers(&gl.gl_context)?;
        gl.window.request_redraw();
        Ok(())
    }

    /// Releases the tutorial's resources while the context is current, then
    /// tears the window down and leaves the event loop.
    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if self.gl.is_some() {
            self.tutorial.close();
            self.gl = None;
        }
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: Box<dyn Error>) {
        error!("Application error: {}", e);
        self.failure = Some(e);
        self.shutdown(event_loop);
    }
}

/// Prefers the config with the most multisample samples.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .reduce(|best, config| if config.num_samples() > best.num_samples() { config } else { best })
        .expect("glutin offers at least one matching config")
}

impl<T: Tutorial<glow::Context>> ApplicationHandler for TutorialApp<T> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gl.is_some() {
            return;
        }
        let gl = match self.create_gl_window(event_loop) {
            Ok(gl) => gl,
            Err(e) => return self.fail(event_loop, e),
        };
        if let Err(e) = self.tutorial.load(&gl.graphics) {
            // Resources created before the failure are released here, while
            // the context is still current.
            self.tutorial.close();
            return self.fail(event_loop, e.into());
        }
        let size = gl.window.inner_size();
        gl.window.request_redraw();
        self.gl = Some(gl);
        self.resize(size);
        self.last_frame = Instant::now();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(size) => {
                self.resize(size);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    let pressed = event.state == ElementState::Pressed;
                    if self.input.handle_keyboard_input_event(keycode, pressed) {
                        self.tutorial.key_down(keycode);
                    }
                    if self.input.close_requested() {
                        self.shutdown(event_loop);
                    }
                }
            }
            _ => (),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if self.gl.is_some() {
            self.tutorial.close();
            self.gl = None;
        }
    }
}

/// Opens a window for `tutorial` and runs it until the window closes.
pub fn run<T: Tutorial<glow::Context>>(config: WindowConfig, tutorial: T) -> Result<(), Box<dyn Error>> {
    let event_loop = EventLoop::new().map_err(|e| {
        error!("Failed to create event loop: {:?}", e);
        e
    })?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = TutorialApp::new(config, tutorial);
    event_loop.run_app(&mut app)?;

    match app.take_failure() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
