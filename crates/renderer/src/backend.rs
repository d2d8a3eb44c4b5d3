//! The seam between the frame scheduler and the GPU.
//!
//! [`FrameScheduler`](crate::FrameScheduler) drives the per-frame protocol
//! purely through these traits. The Vulkan implementation lives in
//! [`crate::vulkan`]; tests plug in an instrumented fake.

use ringframe_resources::MeshRange;
use ringframe_scene::ObjectCategory;

use crate::error::RenderResult;
use crate::ubo::{CameraUbo, InstanceTransform};

/// Result of asking the surface for a presentable image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired { image_index: u32 },
    /// The surface no longer matches the window and must be recreated.
    Stale,
}

/// Result of queueing an image for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Out of date or suboptimal. The image may or may not have been shown.
    Stale,
}

/// Per-slot buffers written once the slot's fence has been observed.
pub trait FrameResources {
    /// Number of [`InstanceTransform`]s the slot can hold. Fixed at creation.
    fn transform_capacity(&self) -> usize;

    fn write_camera(&mut self, camera: &CameraUbo) -> RenderResult<()>;

    /// Overwrites the slot's transform storage from index 0.
    fn write_transforms(&mut self, transforms: &[InstanceTransform]) -> RenderResult<()>;
}

/// Per-slot command recording, in the order [`crate::DrawRecorder`] issues it.
pub trait CommandRecorder {
    /// Whatever identifies the image being rendered to.
    type Target;

    fn begin_pass(&mut self, target: &Self::Target) -> RenderResult<()>;
    fn bind_pipeline(&mut self);
    /// Binds the slot's camera and transform buffers.
    fn bind_frame_data(&mut self);
    /// Binds the shared vertex and index buffers.
    fn bind_geometry(&mut self);
    fn bind_category(&mut self, category: ObjectCategory);
    fn draw_instanced(&mut self, mesh: MeshRange, instance_count: u32, first_instance: u32);
    fn end_pass(&mut self) -> RenderResult<()>;
}

/// Everything the scheduler needs from a GPU.
///
/// Surface and slot objects are owned by the scheduler and always dropped
/// before the backend.
pub trait GpuBackend: Send + Sync {
    type Surface: Send + Sync;
    type Target;
    type Slot: FrameResources + CommandRecorder<Target = Self::Target> + Send;

    fn create_surface(&self, width: u32, height: u32) -> RenderResult<Self::Surface>;

    /// Rebuilds `surface` for a new size. The device is idle and every slot
    /// created against the old surface has been dropped.
    fn recreate_surface(&self, surface: &mut Self::Surface, width: u32, height: u32)
    -> RenderResult<()>;

    fn image_count(&self, surface: &Self::Surface) -> usize;

    fn extent(&self, surface: &Self::Surface) -> (u32, u32);

    fn create_slot(
        &self,
        surface: &Self::Surface,
        index: usize,
        transform_capacity: usize,
    ) -> RenderResult<Self::Slot>;

    /// Blocks until the slot's last submission has completed on the GPU.
    fn wait_for_slot(&self, slot: &Self::Slot) -> RenderResult<()>;

    fn acquire(&self, surface: &Self::Surface, slot: &Self::Slot) -> RenderResult<AcquireOutcome>;

    /// Re-arms the completion fence and resets the command recorder.
    fn reset_slot(&self, slot: &mut Self::Slot) -> RenderResult<()>;

    fn target(&self, surface: &Self::Surface, image_index: u32) -> Self::Target;

    /// Submits the recorded commands: waits on image-acquired, signals
    /// render-finished and the completion fence.
    fn submit(&self, slot: &mut Self::Slot) -> RenderResult<()>;

    fn present(
        &self,
        surface: &Self::Surface,
        slot: &Self::Slot,
        image_index: u32,
    ) -> RenderResult<PresentOutcome>;

    /// Puts a slot whose submission or present failed back into a usable
    /// state. Its fence must read signaled afterwards and its semaphores must
    /// be unsignaled.
    fn restore_slot(&self, slot: &mut Self::Slot) -> RenderResult<()>;

    fn wait_idle(&self) -> RenderResult<()>;
}
