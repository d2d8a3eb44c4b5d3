//! ringframe demo: a grid of instanced triangles, squares and stars.
//!
//! Configuration comes from `RINGFRAME_*` environment variables; see
//! [`EngineConfig::from_env`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Result;
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use ringframe_core::{DriveMode, EngineConfig, FrameRateCounter, Timer};
use ringframe_platform::{InputState, KeyCode, Window};
use ringframe_renderer::{Engine, FrameOutcome};
use ringframe_scene::{Camera, CameraController, Scene};

const TITLE: &str = "ringframe";

struct App {
    config: EngineConfig,
    // Workers hold clones of the engine; they are joined before it drops.
    workers: Vec<JoinHandle<u64>>,
    engine: Option<Arc<Engine>>,
    window: Option<Window>,
    scene: Arc<Scene>,
    camera: Camera,
    controller: CameraController,
    input: InputState,
    timer: Timer,
    fps: FrameRateCounter,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(config: EngineConfig) -> Self {
        let camera = Camera::default();
        Self {
            config,
            workers: Vec::new(),
            engine: None,
            window: None,
            scene: Arc::new(Scene::demo()),
            controller: CameraController::new(&camera),
            camera,
            input: InputState::new(),
            timer: Timer::new(),
            fps: FrameRateCounter::new(0),
            failure: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = Window::new(event_loop, self.config.width, self.config.height, TITLE)?;
        let engine = Arc::new(Engine::initialize(&window, &self.config)?);
        engine.set_camera(self.camera.clone());

        if self.config.drive == DriveMode::Concurrent {
            self.spawn_workers(&engine)?;
        }

        info!(
            "Initialization complete ({:?}, {} frames in flight), entering main loop",
            self.config.drive,
            engine.frames_in_flight()
        );
        self.window = Some(window);
        self.engine = Some(engine);
        Ok(())
    }

    fn spawn_workers(&mut self, engine: &Arc<Engine>) -> Result<()> {
        let in_flight = engine.frames_in_flight();
        let limit = (in_flight / 2).max(1);
        let requested = self.config.worker_count(in_flight);
        if requested > limit {
            warn!(
                "{} workers requested but only {} fit {} frame slots",
                requested, limit, in_flight
            );
        }

        for index in 0..requested.min(limit) {
            let engine = engine.clone();
            let scene = self.scene.clone();
            let handle = thread::Builder::new()
                .name(format!("render-{index}"))
                .spawn(move || engine.render_thread_func(&scene, index))?;
            self.workers.push(handle);
        }
        info!("Spawned {} render workers", self.workers.len());
        Ok(())
    }

    fn stop_workers(&mut self) {
        if let Some(engine) = &self.engine {
            engine.request_stop();
        }
        for handle in self.workers.drain(..) {
            match handle.join() {
                Ok(frames) => debug!("Render worker finished after {} frames", frames),
                Err(_) => error!("Render worker panicked"),
            }
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{:#}", e);
        self.failure = Some(e);
        event_loop.exit();
    }

    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(engine), Some(window)) = (self.engine.clone(), self.window.as_ref()) else {
            return;
        };

        if self.input.is_key_just_pressed(KeyCode::Escape) {
            info!("Escape pressed, shutting down");
            event_loop.exit();
            return;
        }

        let dt = self.timer.delta_secs();
        if self.controller.update(&mut self.camera, &self.input, dt) {
            engine.set_camera(self.camera.clone());
        }
        self.input.begin_frame();

        if let Some(fps) = self.fps.update(engine.total_completed_frames()) {
            window.set_title(&format!("Running at {fps} fps."));
        }

        if self.config.drive == DriveMode::Concurrent || window.is_minimized() {
            return;
        }

        if engine.render(&self.scene) == FrameOutcome::Stopped {
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if self.input.handle_window_event(&event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(window) = &self.window {
                    window.resize(size.width, size.height);
                }
                if let Some(engine) = &self.engine {
                    engine.on_resize(size.width, size.height);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.tick(event_loop);
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.stop_workers();
        // Engine before window: the surface must go before the window it
        // was created for.
        self.engine = None;
        self.window = None;
    }
}

fn main() -> Result<()> {
    let config = EngineConfig::from_env();
    ringframe_core::init_logging(config.as_ref().is_ok_and(|c| c.debug));
    let config = config?;
    info!("Starting ringframe ({}x{})", config.width, config.height);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
