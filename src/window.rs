//! Window and OpenGL context management using winit and glutin

use std::cell::RefCell;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Instant;

use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version,
};
use glutin::display::GetGlDisplay;
use glutin::prelude::*;
use glutin::surface::{Surface, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window as WinitWindow, WindowBuilder},
};

use crate::app::Application;
use crate::backend::{BackendError, BackendResult, GlowBackend};
use crate::AppConfig;

fn init_failed(what: &str, err: impl std::fmt::Display) -> BackendError {
    BackendError::InitializationFailed(format!("{}: {}", what, err))
}

/// A winit window with a current OpenGL context
pub struct Window {
    // Field order is drop order: surface, then context, then window
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: WinitWindow,
    width: u32,
    height: u32,
    resized: bool,
    close_requested: bool,
}

impl Window {
    /// Create a window with an OpenGL 3.3 core context made current on this thread
    pub fn new(
        event_loop: &EventLoop<()>,
        config: &AppConfig,
    ) -> BackendResult<(Self, glow::Context)> {
        let window_builder = WindowBuilder::new()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width, config.height));
        let template = ConfigTemplateBuilder::new().with_depth_size(24);

        let (window, gl_config) = DisplayBuilder::new()
            .with_window_builder(Some(window_builder))
            .build(event_loop, template, pick_config)
            .map_err(|e| init_failed("no suitable GL config", e))?;
        let window = window.ok_or_else(|| {
            BackendError::InitializationFailed("window was not created".to_string())
        })?;

        let gl_display = gl_config.display();
        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(None);
        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
            .map_err(|e| init_failed("context creation", e))?;

        let surface_attributes = window.build_surface_attributes(Default::default());
        let surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes) }
            .map_err(|e| init_failed("surface creation", e))?;
        let context = not_current
            .make_current(&surface)
            .map_err(|e| init_failed("make current", e))?;

        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name| gl_display.get_proc_address(name))
        };

        let size = window.inner_size();
        let window = Self {
            surface,
            context,
            window,
            width: size.width,
            height: size.height,
            resized: false,
            close_requested: false,
        };
        window.set_vsync(config.vsync);
        log::info!(
            "Created {}x{} window with {} samples",
            size.width,
            size.height,
            gl_config.num_samples()
        );
        Ok((window, gl))
    }

    /// Get the raw window
    pub fn window(&self) -> &WinitWindow {
        &self.window
    }

    /// Get current framebuffer dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Check if window was resized since last frame
    pub fn was_resized(&self) -> bool {
        self.resized
    }

    pub fn clear_resize_flag(&mut self) {
        self.resized = false;
    }

    /// Check if close was requested, by the window manager or with Escape
    pub fn should_close(&self) -> bool {
        self.close_requested
    }

    pub fn set_vsync(&self, vsync: bool) {
        let interval = if vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(err) = self.surface.set_swap_interval(&self.context, interval) {
            log::warn!("Failed to set swap interval {:?}: {}", interval, err);
        }
    }

    /// Handle window events
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => {
                // A minimized window reports zero size, the surface keeps its last one
                if let (Some(width), Some(height)) =
                    (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
                {
                    self.surface.resize(&self.context, width, height);
                    self.width = size.width;
                    self.height = size.height;
                    self.resized = true;
                }
            }
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.close_requested = true;
            }
            _ => {}
        }
    }

    /// Present the back buffer
    pub fn swap_buffers(&self) -> BackendResult<()> {
        self.surface
            .swap_buffers(&self.context)
            .map_err(|e| BackendError::Surface(e.to_string()))
    }
}

/// Prefer the config with the most samples.
///
/// # Panics
///
/// Panics when glutin offers no config at all. The picker has to return a `Config`.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .reduce(|best, config| {
            if config.num_samples() > best.num_samples() {
                config
            } else {
                best
            }
        })
        .expect("No OpenGL config matches the template")
}

/// Whether `frames` rendered frames exhaust the optional limit
fn frame_limit_reached(frames: u64, max_frames: Option<u64>) -> bool {
    max_frames.is_some_and(|max| frames >= max)
}

/// Application state owned by the event loop
struct Runner<A> {
    // The application releases its GL objects before the context goes away
    app: A,
    window: Window,
    start: Instant,
    frames: u64,
    max_frames: Option<u64>,
}

impl<A: Application> Runner<A> {
    fn handle_event(&mut self, event: &WindowEvent) {
        self.window.handle_event(event);
        if self.window.was_resized() {
            let (width, height) = self.window.dimensions();
            self.app.resize(width, height);
            self.window.clear_resize_flag();
        }
    }

    fn frame(&mut self) -> BackendResult<()> {
        self.app.update(self.start.elapsed().as_secs_f32())?;
        self.app.render_frame()?;
        self.window.swap_buffers()?;
        self.frames += 1;
        Ok(())
    }

    fn should_exit(&self) -> bool {
        self.window.should_close() || frame_limit_reached(self.frames, self.max_frames)
    }
}

/// Open a window and drive `build`'s application until the window closes.
///
/// Each loop iteration calls [`Application::update`] with the seconds elapsed
/// since start, then [`Application::render_frame`], then swaps buffers. The
/// first error ends the loop and is returned.
pub fn run<A, F>(config: AppConfig, build: F) -> BackendResult<()>
where
    A: Application + 'static,
    F: FnOnce(Rc<GlowBackend>, &AppConfig) -> BackendResult<A>,
{
    let event_loop = EventLoop::new().map_err(|e| init_failed("event loop", e))?;
    let (window, gl) = Window::new(&event_loop, &config)?;
    let backend = Rc::new(GlowBackend::new(gl));

    let mut app = build(backend, &config)?;
    let (width, height) = window.dimensions();
    app.resize(width, height);

    let mut runner = Runner {
        app,
        window,
        start: Instant::now(),
        frames: 0,
        max_frames: config.max_frames,
    };

    let failure = Rc::new(RefCell::new(None));
    let loop_failure = failure.clone();
    event_loop
        .run(move |event, elwt: &EventLoopWindowTarget<()>| {
            elwt.set_control_flow(ControlFlow::Poll);

            let result = match event {
                Event::WindowEvent { event, .. } => {
                    runner.handle_event(&event);
                    Ok(())
                }
                Event::AboutToWait if !runner.should_exit() => runner.frame(),
                _ => Ok(()),
            };

            match result {
                Err(err) => {
                    log::error!("Frame {} failed: {}", runner.frames, err);
                    *loop_failure.borrow_mut() = Some(err);
                    elwt.exit();
                }
                Ok(()) if runner.should_exit() => {
                    log::info!("Exiting after {} frames", runner.frames);
                    elwt.exit();
                }
                Ok(()) => {}
            }
        })
        .map_err(|e| init_failed("event loop", e))?;

    match failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
