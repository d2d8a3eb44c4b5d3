use std::path::PathBuf;

use ringframe_rhi::RhiError;
use ringframe_scene::ObjectCategory;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("{category:?} vertex data has {len} floats, not a multiple of {stride}")]
    RaggedVertices {
        category: ObjectCategory,
        len: usize,
        stride: usize,
    },

    #[error("{category:?} index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        category: ObjectCategory,
        index: u32,
        vertex_count: usize,
    },

    #[error("{0:?} mesh is empty")]
    EmptyMesh(ObjectCategory),

    #[error("{0:?} mesh was already added")]
    DuplicateMesh(ObjectCategory),

    #[error("no mesh for {0:?}")]
    MissingMesh(ObjectCategory),

    #[error("failed to decode {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("GPU upload failed: {0}")]
    Upload(#[from] RhiError),
}

pub type ResourceResult<T> = Result<T, ResourceError>;
