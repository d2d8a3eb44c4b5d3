//! Error type shared by every RHI wrapper.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RhiError {
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] ash::vk::Result),

    /// The Vulkan loader could not be found or opened.
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    #[error("Allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    #[error("No suitable GPU found")]
    NoSuitableGpu,

    #[error("Shader error: {0}")]
    ShaderError(String),

    #[error("Surface error: {0}")]
    SurfaceError(String),

    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// A wrapper was asked to operate on something it does not own or that
    /// is out of range (buffer overflow, zero-sized image, ...).
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RhiError {
    /// Returns the raw Vulkan result code, if this error carries one.
    pub fn vk_result(&self) -> Option<ash::vk::Result> {
        match self {
            RhiError::VulkanError(result) => Some(*result),
            _ => None,
        }
    }

    /// True when the error means the presentation surface no longer matches
    /// the window and must be rebuilt.
    pub fn is_out_of_date(&self) -> bool {
        matches!(
            self.vk_result(),
            Some(ash::vk::Result::ERROR_OUT_OF_DATE_KHR)
        )
    }
}

pub type RhiResult<T> = std::result::Result<T, RhiError>;
