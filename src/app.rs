//! Windowed viewer.
//!
//! Opens a window, builds the scene once, and drives one
//! [`Scene::tick`] + [`Scene::submit`] + render per redraw.
//!
//! | Key | Action |
//! |-----|--------|
//! | Space | flip the morph target |
//! | P | pause / resume the clock |
//! | Up / Down | double / halve the time scale |
//! | Escape | exit |

use crate::config::SceneConfig;
use crate::error::RunError;
use crate::gpu::GpuState;
use crate::morph::MorphSwitch;
use crate::scene::Scene;
use crate::time::Time;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

const FPS_LOG_INTERVAL: Duration = Duration::from_secs(2);
const MIN_TIME_SCALE: f32 = 0.125;
const MAX_TIME_SCALE: f32 = 4.0;

/// Load the config at `path`, or the defaults when there is none.
pub fn load_config(path: Option<&Path>) -> Result<SceneConfig, RunError> {
    match path {
        Some(path) => Ok(SceneConfig::load(path)?),
        None => Ok(SceneConfig::default()),
    }
}

/// [`load_config`] then [`run`].
pub fn run_from_path(path: Option<&Path>) -> Result<(), RunError> {
    run(load_config(path)?)
}

/// Run the viewer until the window closes.
pub fn run(config: SceneConfig) -> Result<(), RunError> {
    let switch = MorphSwitch::new(config.initial_state);
    let scene = Scene::seeded(config);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(scene, switch);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    scene: Scene,
    switch: MorphSwitch,
    time: Time,
    last_fps_log: Instant,
    /// First fatal error; reported by [`run`] after the loop exits.
    error: Option<RunError>,
}

impl App {
    fn new(scene: Scene, switch: MorphSwitch) -> Self {
        Self {
            window: None,
            gpu_state: None,
            scene,
            switch,
            time: Time::new(),
            last_fps_log: Instant::now(),
            error: None,
        }
    }

    /// Apply a pressed key. Returns `true` when the viewer should exit.
    fn handle_key(&mut self, key: &Key) -> bool {
        match key {
            Key::Named(NamedKey::Space) => {
                self.switch.toggle();
            }
            Key::Named(NamedKey::Escape) => return true,
            Key::Named(NamedKey::ArrowUp) => self.scale_time(2.0),
            Key::Named(NamedKey::ArrowDown) => self.scale_time(0.5),
            Key::Character(c) if c.eq_ignore_ascii_case("p") => {
                self.time.toggle_pause();
                log::info!("clock {}", if self.time.is_paused() { "paused" } else { "resumed" });
            }
            _ => {}
        }
        false
    }

    fn scale_time(&mut self, factor: f32) {
        let scale = (self.time.time_scale() * factor).clamp(MIN_TIME_SCALE, MAX_TIME_SCALE);
        self.time.set_time_scale(scale);
        log::info!("time scale {scale}");
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RunError> {
        let window_attrs = Window::default_attributes()
            .with_title("morph-tree")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu_state = pollster::block_on(GpuState::new(window.clone(), &self.scene))?;

        self.window = Some(window);
        self.gpu_state = Some(gpu_state);
        // Window and device creation time must not count as a frame.
        self.time.reset();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: RunError) {
        log::error!("{error}");
        if self.error.is_none() {
            self.error = Some(error);
        }
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu_state) = &mut self.gpu_state else {
            return;
        };

        let (elapsed, delta) = self.time.update();
        self.scene.tick(delta, elapsed, &self.switch);
        self.scene.submit(gpu_state);

        match gpu_state.render() {
            Ok(()) => {}
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("surface {e:?}, reconfiguring");
                gpu_state.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory, exiting");
                event_loop.exit();
            }
            Err(e) => log::warn!("render error: {e:?}"),
        }

        if self.last_fps_log.elapsed() >= FPS_LOG_INTERVAL {
            let frame = self.scene.frame();
            log::info!(
                "{:.1} fps, target {:?}, blend foliage {:.3} spheres {:.3} boxes {:.3}",
                self.time.fps(),
                frame.state,
                frame.foliage_blend,
                frame.sphere_blend,
                frame.box_blend,
            );
            self.last_fps_log = Instant::now();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if self.handle_key(&logical_key) {
                    event_loop.exit();
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
