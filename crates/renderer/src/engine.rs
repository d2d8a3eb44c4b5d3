//! The renderer facade handed to the main loop.

use ringframe_core::EngineConfig;
use ringframe_platform::{DrawableSize, Window};
use ringframe_resources::MeshMenagerie;
use ringframe_scene::{Camera, Scene};
use tracing::{error, info};

use crate::backend::GpuBackend;
use crate::error::RenderResult;
use crate::fatal;
use crate::scheduler::{FrameOutcome, FrameScheduler};
use crate::vulkan::VulkanBackend;

/// Owns the backend and the frame scheduler.
///
/// Dropping the engine waits for the device to go idle, then releases slots
/// and the swapchain, then the backend's pipeline, meshes, materials, device,
/// surface and instance, in that order.
pub struct Engine<B: GpuBackend = VulkanBackend> {
    scheduler: FrameScheduler<B>,
}

impl Engine<VulkanBackend> {
    /// Brings up Vulkan for `window` and builds the frame ring.
    pub fn initialize(window: &Window, config: &EngineConfig) -> RenderResult<Self> {
        config.validate()?;
        info!(
            "Initializing engine ({}x{}, debug: {})",
            config.width, config.height, config.debug
        );

        let meshes = MeshMenagerie::builtin()?;
        let backend = VulkanBackend::new(window, config.debug, &meshes, &config.texture_dir)?;
        Self::with_backend(backend, window.drawable(), &meshes, config.transform_capacity)
    }
}

impl<B: GpuBackend> Engine<B> {
    pub fn with_backend(
        backend: B,
        drawable: DrawableSize,
        meshes: &MeshMenagerie,
        transform_capacity: usize,
    ) -> RenderResult<Self> {
        Ok(Self {
            scheduler: FrameScheduler::new(backend, drawable, meshes, transform_capacity)?,
        })
    }

    /// Renders one frame from the calling thread.
    ///
    /// Stale surfaces and failed submissions are handled internally and
    /// reported through [`FrameOutcome`]. Aborts the process on device loss
    /// or any other unrecoverable error.
    pub fn render(&self, scene: &Scene) -> FrameOutcome {
        match self.scheduler.render_frame(scene) {
            Ok(outcome) => outcome,
            Err(e) => fatal::abort(None, &e.to_string()),
        }
    }

    /// Body of one concurrent render thread. Runs until [`Engine::request_stop`].
    ///
    /// Aborts the process on any unrecoverable error.
    pub fn render_thread_func(&self, scene: &Scene, start_slot: usize) -> u64 {
        match self.scheduler.run_worker(scene, start_slot) {
            Ok(frames) => frames,
            Err(e) => fatal::abort(None, &e.to_string()),
        }
    }

    pub fn request_stop(&self) {
        self.scheduler.request_stop();
    }

    pub fn current_frame_index(&self) -> usize {
        self.scheduler.current_frame_index()
    }

    pub fn total_completed_frames(&self) -> u64 {
        self.scheduler.total_completed_frames()
    }

    pub fn recreation_count(&self) -> u64 {
        self.scheduler.recreation_count()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.scheduler.frames_in_flight()
    }

    pub fn on_resize(&self, width: u32, height: u32) {
        self.scheduler.on_resize(width, height);
    }

    pub fn set_camera(&self, camera: Camera) {
        self.scheduler.set_camera(camera);
    }

    pub fn camera(&self) -> Camera {
        self.scheduler.camera()
    }

    pub fn backend(&self) -> &B {
        self.scheduler.backend()
    }
}

impl<B: GpuBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        if let Err(e) = self.scheduler.wait_idle() {
            error!("Failed to wait for device idle during shutdown: {}", e);
        }
        info!(
            "Engine shut down after {} frames, {} surface recreations",
            self.scheduler.total_completed_frames(),
            self.scheduler.recreation_count()
        );
    }
}
