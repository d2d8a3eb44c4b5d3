//! The frame protocol and its two drive modes.
//!
//! One frame on slot `s`:
//!
//! ```text
//! wait(fence[s]) -> acquire(imageAcquired[s]) -> reset(fence[s], cmd[s])
//!   -> write camera + transforms -> record -> submit -> present
//! ```
//!
//! A stale acquire abandons the frame before anything is reset. A stale
//! present happens after submission, so the frame still counts as completed.
//! Either way the surface is recreated before the next frame.
//!
//! The presentation surface sits behind an `RwLock`: frames run under the
//! read lock, recreation takes the write lock. Concurrent workers pick slots
//! through [`SlotRing`]; the single-threaded driver walks `next_slot`.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};

use parking_lot::{MutexGuard, RwLock};
use ringframe_platform::DrawableSize;
use ringframe_resources::MeshMenagerie;
use ringframe_scene::{Camera, Scene};
use tracing::{debug, info, trace, warn};

use crate::backend::{AcquireOutcome, FrameResources, GpuBackend, PresentOutcome};
use crate::draw::{DrawRecorder, InstanceLayout};
use crate::error::{RenderError, RenderResult};
use crate::presentation::PresentationSurface;
use crate::slots::SlotRing;
use crate::ubo::CameraUbo;

/// What happened to one `render_frame` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// The surface was stale and has been rebuilt. Nothing was presented.
    Recreated,
    /// Submission or presentation failed; the frame was discarded.
    Dropped,
    /// The drawable is zero-sized; recreation will be retried next call.
    Deferred,
    /// Shutdown was requested.
    Stopped,
}

enum Step {
    Presented,
    Stale { submitted: bool },
    Dropped { submitted: bool },
}

/// How recreation behaves while the window has no drawable area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitMode {
    /// Block until the size is non-zero or a stop is requested.
    Block,
    /// Return [`FrameOutcome::Deferred`] and retry on the next call.
    Defer,
}

/// Owns the slot ring and presentation surface and drives frames through them.
pub struct FrameScheduler<B: GpuBackend> {
    // Dropped before `backend`.
    presentation: RwLock<PresentationSurface<B>>,
    ring: SlotRing,
    next_slot: AtomicUsize,
    completed_frames: AtomicU64,
    recreations: AtomicU64,
    should_stop: AtomicBool,
    resize_requested: AtomicBool,
    clamp_warned: AtomicU8,
    drawable: DrawableSize,
    camera: RwLock<Camera>,
    recorder: DrawRecorder,
    transform_capacity: usize,
    backend: B,
}

impl<B: GpuBackend> FrameScheduler<B> {
    pub fn new(
        backend: B,
        drawable: DrawableSize,
        meshes: &MeshMenagerie,
        transform_capacity: usize,
    ) -> RenderResult<Self> {
        let recorder = DrawRecorder::new(meshes)?;
        let (width, height) = drawable.get();
        let presentation =
            PresentationSurface::create(&backend, width.max(1), height.max(1), transform_capacity)?;

        info!(
            "Frame scheduler ready: {} slots, {} transforms per slot",
            presentation.ring_size(),
            transform_capacity
        );

        Ok(Self {
            presentation: RwLock::new(presentation),
            ring: SlotRing::new(),
            next_slot: AtomicUsize::new(0),
            completed_frames: AtomicU64::new(0),
            recreations: AtomicU64::new(0),
            should_stop: AtomicBool::new(false),
            resize_requested: AtomicBool::new(false),
            clamp_warned: AtomicU8::new(0),
            drawable,
            camera: RwLock::new(Camera::default()),
            recorder,
            transform_capacity,
            backend,
        })
    }

    /// Renders one frame on `next_slot` from the calling thread.
    ///
    /// Never blocks on a zero-sized window: recreation is deferred instead,
    /// since the caller is usually the thread that would deliver the resize.
    pub fn render_frame(&self, scene: &Scene) -> RenderResult<FrameOutcome> {
        if self.should_stop() {
            return Ok(FrameOutcome::Stopped);
        }
        if let Some(outcome) = self.apply_pending_resize(WaitMode::Defer)? {
            return Ok(outcome);
        }

        let presentation = self.presentation.read();
        let ring_size = presentation.ring_size();
        let index = self.next_slot.load(Ordering::Acquire) % ring_size;
        let mut slot = presentation.slot(index).lock();

        match self.drive(&presentation, index, &mut slot, scene)? {
            Step::Presented => {
                self.next_slot.store((index + 1) % ring_size, Ordering::Release);
                Ok(FrameOutcome::Presented)
            }
            Step::Dropped { submitted } => {
                if submitted {
                    self.next_slot.store((index + 1) % ring_size, Ordering::Release);
                }
                Ok(FrameOutcome::Dropped)
            }
            Step::Stale { .. } => {
                let generation = presentation.generation();
                drop(slot);
                drop(presentation);
                self.recreate(generation, WaitMode::Defer)
            }
        }
    }

    /// Worker loop for the concurrent drive. Returns the number of frames this
    /// worker submitted once a stop is requested.
    ///
    /// Any error returned here is unrecoverable.
    pub fn run_worker(&self, scene: &Scene, start_slot: usize) -> RenderResult<u64> {
        let mut preferred = start_slot;
        let mut submitted = 0;

        while !self.should_stop() {
            let (outcome, next, did_submit) = self.render_claimed(scene, preferred)?;
            preferred = next;
            if did_submit {
                submitted += 1;
            }
            if outcome == FrameOutcome::Stopped {
                break;
            }
        }

        debug!(start_slot, submitted, "Render worker stopped");
        Ok(submitted)
    }

    fn render_claimed(
        &self,
        scene: &Scene,
        preferred: usize,
    ) -> RenderResult<(FrameOutcome, usize, bool)> {
        if let Some(outcome) = self.apply_pending_resize(WaitMode::Block)? {
            return Ok((outcome, preferred, false));
        }

        let presentation = self.presentation.read();
        if self.should_stop() {
            return Ok((FrameOutcome::Stopped, preferred, false));
        }

        let ring_size = presentation.ring_size();
        let claim = self.ring.claim(preferred, ring_size)?;
        let index = claim.index();
        let mut slot = presentation
            .slot(index)
            .try_lock()
            .ok_or(RenderError::SlotConflict { slot: index })?;
        trace!(slot = index, "Claimed slot");

        let step = self.drive(&presentation, index, &mut slot, scene)?;
        drop(slot);
        drop(claim);

        let next = (index + 1) % ring_size;
        match step {
            Step::Presented => Ok((FrameOutcome::Presented, next, true)),
            Step::Dropped { submitted } => Ok((FrameOutcome::Dropped, next, submitted)),
            Step::Stale { submitted } => {
                let generation = presentation.generation();
                drop(presentation);
                let outcome = self.recreate(generation, WaitMode::Block)?;
                Ok((outcome, 0, submitted))
            }
        }
    }

    /// Runs the frame protocol on one slot the caller exclusively holds.
    fn drive(
        &self,
        presentation: &PresentationSurface<B>,
        index: usize,
        slot: &mut MutexGuard<'_, B::Slot>,
        scene: &Scene,
    ) -> RenderResult<Step> {
        let backend = &self.backend;
        let surface = presentation.surface();

        backend.wait_for_slot(slot)?;

        let image_index = match backend.acquire(surface, slot)? {
            AcquireOutcome::Acquired { image_index } => image_index,
            AcquireOutcome::Stale => {
                debug!(slot = index, "Surface stale on acquire");
                return Ok(Step::Stale { submitted: false });
            }
        };

        backend.reset_slot(slot)?;

        let layout = InstanceLayout::build(scene, slot.transform_capacity());
        self.warn_clamped(&layout, scene);

        let (width, height) = backend.extent(surface);
        let aspect = width as f32 / height.max(1) as f32;
        let camera = CameraUbo::from_camera(&self.camera.read(), aspect);
        slot.write_camera(&camera)?;
        slot.write_transforms(layout.transforms())?;

        let target = backend.target(surface, image_index);
        self.recorder.record(&mut **slot, &target, &layout)?;

        if let Err(e) = backend.submit(slot) {
            if e.is_device_lost() {
                return Err(e);
            }
            debug!(slot = index, "Dropping frame: {}", e);
            backend.restore_slot(slot)?;
            // The acquired image was never presented; rebuild to get it back.
            self.resize_requested.store(true, Ordering::Release);
            return Ok(Step::Dropped { submitted: false });
        }
        self.completed_frames.fetch_add(1, Ordering::AcqRel);

        match backend.present(surface, slot, image_index) {
            Ok(PresentOutcome::Presented) => Ok(Step::Presented),
            Ok(PresentOutcome::Stale) => {
                debug!(slot = index, "Surface stale on present");
                Ok(Step::Stale { submitted: true })
            }
            Err(e) if e.is_device_lost() => Err(e),
            Err(e) => {
                debug!(slot = index, "Present failed: {}", e);
                // The present never waited on render_finished and the image
                // is still acquired.
                backend.restore_slot(slot)?;
                self.resize_requested.store(true, Ordering::Release);
                Ok(Step::Dropped { submitted: true })
            }
        }
    }

    fn apply_pending_resize(&self, mode: WaitMode) -> RenderResult<Option<FrameOutcome>> {
        if !self.resize_requested.swap(false, Ordering::AcqRel) {
            return Ok(None);
        }
        let generation = self.presentation.read().generation();
        match self.recreate(generation, mode)? {
            FrameOutcome::Recreated => Ok(None),
            other => Ok(Some(other)),
        }
    }

    /// Rebuilds the surface and all slots unless another thread already did
    /// so since `observed_generation`.
    fn recreate(&self, observed_generation: u64, mode: WaitMode) -> RenderResult<FrameOutcome> {
        let mut presentation = self.presentation.write();
        if presentation.generation() != observed_generation {
            return Ok(FrameOutcome::Recreated);
        }

        let (width, height) = match mode {
            WaitMode::Block => match self.drawable.wait_nonzero(&self.should_stop) {
                Some(size) => size,
                None => return Ok(FrameOutcome::Stopped),
            },
            WaitMode::Defer => {
                if self.drawable.is_zero() {
                    self.resize_requested.store(true, Ordering::Release);
                    return Ok(FrameOutcome::Deferred);
                }
                self.drawable.get()
            }
        };

        self.backend.wait_idle()?;
        debug_assert!(self.ring.all_available());

        presentation.recreate(&self.backend, width, height, self.transform_capacity)?;
        self.next_slot.store(0, Ordering::Release);
        let count = self.recreations.fetch_add(1, Ordering::AcqRel) + 1;

        info!(
            "Surface recreated at {}x{} with {} slots (recreation #{})",
            width,
            height,
            presentation.ring_size(),
            count
        );
        Ok(FrameOutcome::Recreated)
    }

    fn warn_clamped(&self, layout: &InstanceLayout, scene: &Scene) {
        for &category in layout.clamped() {
            let bit = 1u8 << category.index();
            if self.clamp_warned.fetch_or(bit, Ordering::AcqRel) & bit == 0 {
                warn!(
                    "Scene has {} {} instances but only {} transforms fit in a frame slot; extra instances are not drawn",
                    scene.positions(category).len(),
                    category.name(),
                    self.transform_capacity
                );
            }
        }
    }

    /// Records a new drawable size. A non-zero size schedules recreation
    /// before the next frame.
    pub fn on_resize(&self, width: u32, height: u32) {
        self.drawable.set(width, height);
        if width > 0 && height > 0 {
            self.resize_requested.store(true, Ordering::Release);
        }
    }

    pub fn request_stop(&self) {
        self.should_stop.store(true, Ordering::Release);
    }

    #[inline]
    pub fn should_stop(&self) -> bool {
        self.should_stop.load(Ordering::Acquire)
    }

    /// Slot the single-threaded driver will use next.
    pub fn current_frame_index(&self) -> usize {
        self.next_slot.load(Ordering::Acquire)
    }

    /// Submissions issued so far, across every thread.
    pub fn total_completed_frames(&self) -> u64 {
        self.completed_frames.load(Ordering::Acquire)
    }

    pub fn recreation_count(&self) -> u64 {
        self.recreations.load(Ordering::Acquire)
    }

    pub fn frames_in_flight(&self) -> usize {
        self.presentation.read().ring_size()
    }

    pub fn set_camera(&self, camera: Camera) {
        *self.camera.write() = camera;
    }

    pub fn camera(&self) -> Camera {
        self.camera.read().clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn wait_idle(&self) -> RenderResult<()> {
        self.backend.wait_idle()
    }
}
