//! An instrumented in-memory backend.
//!
//! Every call is appended to a shared event log. Protocol violations (writing
//! a slot before its fence was observed, two frames on one slot at once,
//! waiting on a fence that can never signal, signalling a semaphore nobody
//! waited on) are collected instead of
//! panicking so tests can assert on them from the main thread.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use ringframe_platform::DrawableSize;
use ringframe_renderer::{
    AcquireOutcome, CameraUbo, CommandRecorder, FrameResources, FrameScheduler, GpuBackend,
    InstanceTransform, K_RING_CAPACITY, PresentOutcome, RenderError, RenderResult,
};
use ringframe_resources::{MeshMenagerie, MeshRange};
use ringframe_scene::ObjectCategory;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CreateSlot { slot: usize },
    FenceWait { slot: usize },
    Acquire { slot: usize, stale: bool },
    Reset { slot: usize },
    WriteCamera { slot: usize },
    WriteTransforms { slot: usize, count: usize },
    Record { slot: usize, image: u32, draws: Vec<Draw> },
    Submit { slot: usize, ok: bool },
    Present { slot: usize, image: u32, outcome: PresentResult },
    Restore { slot: usize },
    Recreate { width: u32, height: u32 },
    WaitIdle,
}

impl Event {
    pub fn slot(&self) -> Option<usize> {
        match self {
            Event::CreateSlot { slot }
            | Event::FenceWait { slot }
            | Event::Acquire { slot, .. }
            | Event::Reset { slot }
            | Event::WriteCamera { slot }
            | Event::WriteTransforms { slot, .. }
            | Event::Record { slot, .. }
            | Event::Submit { slot, .. }
            | Event::Present { slot, .. }
            | Event::Restore { slot } => Some(*slot),
            Event::Recreate { .. } | Event::WaitIdle => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentResult {
    Ok,
    Stale,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub category: ObjectCategory,
    pub index_count: u32,
    pub instances: u32,
    pub first_instance: u32,
}

/// Which calls misbehave. Counts are 1-based and global across slots.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub stale_acquires: HashSet<u64>,
    pub stale_presents: HashSet<u64>,
    pub failed_submits: HashSet<u64>,
    pub failed_presents: HashSet<u64>,
}

#[derive(Default)]
struct Shared {
    log: Mutex<Vec<Event>>,
    violations: Mutex<Vec<String>>,
    busy: [AtomicBool; K_RING_CAPACITY],
}

impl Shared {
    fn push(&self, event: Event) {
        self.log.lock().push(event);
    }

    fn violation(&self, message: String) {
        self.violations.lock().push(message);
    }

    fn enter(&self, slot: usize) {
        if self.busy[slot]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            self.violation(format!("slot {slot} entered while already in use"));
        }
    }

    fn leave(&self, slot: usize) {
        if !self.busy[slot].swap(false, Ordering::AcqRel) {
            self.violation(format!("slot {slot} left while not in use"));
        }
    }
}

pub struct FakeSurface {
    pub width: u32,
    pub height: u32,
    pub image_count: usize,
    pub generation: u64,
}

pub struct FakeSlot {
    index: usize,
    generation: u64,
    capacity: usize,
    fence_signaled: AtomicBool,
    fence_observed: AtomicBool,
    // Set by a successful submit, consumed by a present that waits on it.
    render_finished: AtomicBool,
    draws: Vec<Draw>,
    category: Option<ObjectCategory>,
    image: Option<u32>,
    shared: Arc<Shared>,
}

impl FakeSlot {
    fn check_observed(&self, what: &str) {
        if !self.fence_observed.load(Ordering::Acquire) {
            self.shared
                .violation(format!("slot {} {what} before its fence wait", self.index));
        }
    }
}

impl FrameResources for FakeSlot {
    fn transform_capacity(&self) -> usize {
        self.capacity
    }

    fn write_camera(&mut self, _camera: &CameraUbo) -> RenderResult<()> {
        self.check_observed("camera written");
        self.shared.push(Event::WriteCamera { slot: self.index });
        Ok(())
    }

    fn write_transforms(&mut self, transforms: &[InstanceTransform]) -> RenderResult<()> {
        self.check_observed("transforms written");
        if transforms.len() > self.capacity {
            return Err(RenderError::Capacity {
                what: "instance transforms",
                requested: transforms.len(),
                capacity: self.capacity,
            });
        }
        self.shared.push(Event::WriteTransforms {
            slot: self.index,
            count: transforms.len(),
        });
        Ok(())
    }
}

impl CommandRecorder for FakeSlot {
    type Target = u32;

    fn begin_pass(&mut self, image: &u32) -> RenderResult<()> {
        self.check_observed("recorded");
        self.draws.clear();
        self.category = None;
        self.image = Some(*image);
        Ok(())
    }

    fn bind_pipeline(&mut self) {}

    fn bind_frame_data(&mut self) {}

    fn bind_geometry(&mut self) {}

    fn bind_category(&mut self, category: ObjectCategory) {
        self.category = Some(category);
    }

    fn draw_instanced(&mut self, mesh: MeshRange, instances: u32, first_instance: u32) {
        let Some(category) = self.category else {
            self.shared
                .violation(format!("slot {} drew before binding a category", self.index));
            return;
        };
        self.draws.push(Draw {
            category,
            index_count: mesh.index_count,
            instances,
            first_instance,
        });
    }

    fn end_pass(&mut self) -> RenderResult<()> {
        self.shared.push(Event::Record {
            slot: self.index,
            image: self.image.unwrap_or(u32::MAX),
            draws: self.draws.clone(),
        });
        Ok(())
    }
}

pub struct FakeBackend {
    image_count: AtomicUsize,
    faults: Faults,
    acquires: AtomicU64,
    presents: AtomicU64,
    submits: AtomicU64,
    shared: Arc<Shared>,
}

impl FakeBackend {
    pub fn new(image_count: usize) -> Self {
        Self::with_faults(image_count, Faults::default())
    }

    pub fn with_faults(image_count: usize, faults: Faults) -> Self {
        Self {
            image_count: AtomicUsize::new(image_count),
            faults,
            acquires: AtomicU64::new(0),
            presents: AtomicU64::new(0),
            submits: AtomicU64::new(0),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Image count reported by the next surface (re)creation.
    pub fn set_image_count(&self, count: usize) {
        self.image_count.store(count, Ordering::Release);
    }

    pub fn events(&self) -> Vec<Event> {
        self.shared.log.lock().clone()
    }

    pub fn violations(&self) -> Vec<String> {
        self.shared.violations.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.shared.log.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn submitted_slots(&self) -> Vec<usize> {
        self.shared
            .log
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Submit { slot, ok: true } => Some(*slot),
                _ => None,
            })
            .collect()
    }
}

impl GpuBackend for FakeBackend {
    type Surface = FakeSurface;
    type Target = u32;
    type Slot = FakeSlot;

    fn create_surface(&self, width: u32, height: u32) -> RenderResult<FakeSurface> {
        Ok(FakeSurface {
            width,
            height,
            image_count: self.image_count.load(Ordering::Acquire),
            generation: 0,
        })
    }

    fn recreate_surface(
        &self,
        surface: &mut FakeSurface,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        if self.shared.busy.iter().any(|b| b.load(Ordering::Acquire)) {
            self.shared
                .violation("surface recreated while a frame was in flight".to_string());
        }
        surface.width = width;
        surface.height = height;
        surface.image_count = self.image_count.load(Ordering::Acquire);
        surface.generation += 1;
        self.shared.push(Event::Recreate { width, height });
        Ok(())
    }

    fn image_count(&self, surface: &FakeSurface) -> usize {
        surface.image_count
    }

    fn extent(&self, surface: &FakeSurface) -> (u32, u32) {
        (surface.width, surface.height)
    }

    fn create_slot(
        &self,
        surface: &FakeSurface,
        index: usize,
        transform_capacity: usize,
    ) -> RenderResult<FakeSlot> {
        self.shared.push(Event::CreateSlot { slot: index });
        if index >= surface.image_count {
            self.shared
                .violation(format!("slot {index} built for {} images", surface.image_count));
        }
        Ok(FakeSlot {
            index,
            generation: surface.generation,
            capacity: transform_capacity,
            fence_signaled: AtomicBool::new(true),
            fence_observed: AtomicBool::new(false),
            render_finished: AtomicBool::new(false),
            draws: Vec::new(),
            category: None,
            image: None,
            shared: self.shared.clone(),
        })
    }

    fn wait_for_slot(&self, slot: &FakeSlot) -> RenderResult<()> {
        self.shared.enter(slot.index);
        if !slot.fence_signaled.load(Ordering::Acquire) {
            self.shared
                .violation(format!("slot {} waited on a fence that never signals", slot.index));
        }
        slot.fence_observed.store(true, Ordering::Release);
        self.shared.push(Event::FenceWait { slot: slot.index });
        Ok(())
    }

    fn acquire(&self, surface: &FakeSurface, slot: &FakeSlot) -> RenderResult<AcquireOutcome> {
        if slot.generation != surface.generation {
            self.shared.violation(format!(
                "slot {} from generation {} used with surface generation {}",
                slot.index, slot.generation, surface.generation
            ));
        }
        let n = self.acquires.fetch_add(1, Ordering::AcqRel) + 1;
        let stale = self.faults.stale_acquires.contains(&n);
        self.shared.push(Event::Acquire {
            slot: slot.index,
            stale,
        });
        if stale {
            slot.fence_observed.store(false, Ordering::Release);
            self.shared.leave(slot.index);
            return Ok(AcquireOutcome::Stale);
        }
        Ok(AcquireOutcome::Acquired {
            image_index: ((n - 1) % surface.image_count as u64) as u32,
        })
    }

    fn reset_slot(&self, slot: &mut FakeSlot) -> RenderResult<()> {
        slot.check_observed("reset");
        slot.fence_signaled.store(false, Ordering::Release);
        self.shared.push(Event::Reset { slot: slot.index });
        Ok(())
    }

    fn target(&self, _surface: &FakeSurface, image_index: u32) -> u32 {
        image_index
    }

    fn submit(&self, slot: &mut FakeSlot) -> RenderResult<()> {
        let n = self.submits.fetch_add(1, Ordering::AcqRel) + 1;
        let ok = !self.faults.failed_submits.contains(&n);
        self.shared.push(Event::Submit {
            slot: slot.index,
            ok,
        });
        slot.fence_observed.store(false, Ordering::Release);
        if !ok {
            return Err(RenderError::Submission(format!("injected failure #{n}")));
        }
        if slot.render_finished.swap(true, Ordering::AcqRel) {
            self.shared.violation(format!(
                "slot {} signalled render_finished while it was still signalled",
                slot.index
            ));
        }
        // Completes immediately.
        slot.fence_signaled.store(true, Ordering::Release);
        Ok(())
    }

    fn present(
        &self,
        _surface: &FakeSurface,
        slot: &FakeSlot,
        image_index: u32,
    ) -> RenderResult<PresentOutcome> {
        let n = self.presents.fetch_add(1, Ordering::AcqRel) + 1;
        let outcome = if self.faults.failed_presents.contains(&n) {
            PresentResult::Failed
        } else if self.faults.stale_presents.contains(&n) {
            PresentResult::Stale
        } else {
            PresentResult::Ok
        };
        self.shared.push(Event::Present {
            slot: slot.index,
            image: image_index,
            outcome,
        });
        if outcome == PresentResult::Failed {
            // Nothing waited on the semaphore; the slot stays in use until
            // it is restored.
            return Err(RenderError::Submission(format!("injected present failure #{n}")));
        }
        slot.render_finished.store(false, Ordering::Release);
        self.shared.leave(slot.index);
        Ok(match outcome {
            PresentResult::Stale => PresentOutcome::Stale,
            _ => PresentOutcome::Presented,
        })
    }

    fn restore_slot(&self, slot: &mut FakeSlot) -> RenderResult<()> {
        slot.fence_signaled.store(true, Ordering::Release);
        slot.render_finished.store(false, Ordering::Release);
        self.shared.push(Event::Restore { slot: slot.index });
        self.shared.leave(slot.index);
        Ok(())
    }

    fn wait_idle(&self) -> RenderResult<()> {
        self.shared.push(Event::WaitIdle);
        Ok(())
    }
}

pub fn scheduler(
    backend: FakeBackend,
    size: (u32, u32),
    transform_capacity: usize,
) -> FrameScheduler<FakeBackend> {
    let drawable = DrawableSize::new(size.0, size.1);
    let meshes = MeshMenagerie::builtin().unwrap();
    FrameScheduler::new(backend, drawable, &meshes, transform_capacity).unwrap()
}

pub fn faults_at(stale_acquires: &[u64], stale_presents: &[u64], failed_submits: &[u64]) -> Faults {
    Faults {
        stale_acquires: stale_acquires.iter().copied().collect(),
        stale_presents: stale_presents.iter().copied().collect(),
        failed_submits: failed_submits.iter().copied().collect(),
        failed_presents: HashSet::new(),
    }
}
