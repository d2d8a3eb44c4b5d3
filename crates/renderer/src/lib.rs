//! Frame-resource scheduling and presentation for the instanced renderer.
//!
//! - [`FrameScheduler`] runs the per-frame protocol over a ring of slots,
//!   either from one thread or from several workers at once.
//! - [`GpuBackend`] is the seam to the GPU; [`vulkan::VulkanBackend`] is the
//!   real one.
//! - [`Engine`] is the facade the application drives.

mod error;
mod fatal;

pub mod backend;
pub mod draw;
pub mod engine;
pub mod presentation;
pub mod scheduler;
pub mod slots;
pub mod ubo;
pub mod vulkan;

pub use backend::{AcquireOutcome, CommandRecorder, FrameResources, GpuBackend, PresentOutcome};
pub use draw::{CategoryInstances, DrawRecorder, InstanceLayout};
pub use engine::Engine;
pub use error::{RenderError, RenderResult};
pub use presentation::PresentationSurface;
pub use scheduler::{FrameOutcome, FrameScheduler};
pub use slots::{SlotClaim, SlotRing};
pub use ubo::{CameraUbo, InstanceTransform};

/// Upper bound on frame slots, and so on frames in flight.
pub const K_RING_CAPACITY: usize = 10;
