use ringframe_resources::ResourceError;
use ringframe_rhi::{RhiError, vk};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Rhi(#[from] RhiError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Setup(#[from] ringframe_core::Error),

    /// The queue rejected a submission or present for a reason other than a
    /// stale surface.
    #[error("submission failed: {0}")]
    Submission(String),

    #[error("no frame slot became free after {rounds} rounds over {ring_size} slots")]
    Starvation { rounds: usize, ring_size: usize },

    #[error("frame slot {slot} is owned by more than one worker")]
    SlotConflict { slot: usize },

    #[error("{what} exceeds capacity: {requested} > {capacity}")]
    Capacity {
        what: &'static str,
        requested: usize,
        capacity: usize,
    },
}

impl RenderError {
    /// Device loss cannot be recovered from by dropping a frame.
    pub fn is_device_lost(&self) -> bool {
        match self {
            RenderError::Rhi(e) => e.vk_result() == Some(vk::Result::ERROR_DEVICE_LOST),
            _ => false,
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
