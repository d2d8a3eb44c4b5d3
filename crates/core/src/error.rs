//! Error type for engine setup and configuration.

use thiserror::Error;

/// Errors raised while bringing the engine up.
///
/// Steady-state frame rendering never produces one of these; recoverable
/// conditions are resolved inside the scheduler.
#[derive(Error, Debug)]
pub enum Error {
    /// Vulkan setup failed (instance, device, surface, swapchain).
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Window creation or handle lookup failed.
    #[error("Window error: {0}")]
    Window(String),

    /// Mesh or buffer resources could not be prepared.
    #[error("Resource error: {0}")]
    Resource(String),

    /// Shader module loading failed.
    #[error("Shader error: {0}")]
    Shader(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed configuration value.
    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using the engine's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
