//! Vulkan wrappers used by the ringframe renderer.
//!
//! Each type owns exactly one Vulkan object (or a small group that is always
//! created together) and destroys it on `Drop`. Everything that needs the
//! logical device holds an `Arc<Device>`, so device teardown always happens
//! last.

mod error;

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod vertex;

pub use error::{RhiError, RhiResult};

pub use ash::vk;
