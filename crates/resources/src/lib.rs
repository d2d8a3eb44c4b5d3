//! Geometry and per-category materials for ringframe.

mod error;
pub mod material;
pub mod mesh;

pub use error::{ResourceError, ResourceResult};
pub use material::{MATERIAL_SET, MaterialSet};
pub use mesh::{MeshBuffers, MeshMenagerie, MeshRange};
