//! Built-in 2D meshes packed into one vertex and one index list.

use std::sync::Arc;

use ringframe_rhi::buffer::{Buffer, BufferUsage};
use ringframe_rhi::device::Device;
use ringframe_rhi::vertex::Vertex;
use ringframe_scene::ObjectCategory;
use tracing::debug;

use crate::error::{ResourceError, ResourceResult};

/// Where one category's geometry lives in the shared buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshRange {
    pub index_count: u32,
    pub first_index: u32,
    /// Added to every index of this range (base vertex).
    pub vertex_offset: i32,
}

#[derive(Debug, Default)]
pub struct MeshMenagerie {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    ranges: [Option<MeshRange>; 3],
}

impl MeshMenagerie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triangle, square and star.
    pub fn builtin() -> ResourceResult<Self> {
        let mut meshes = Self::new();
        meshes.consume(ObjectCategory::Triangle, &TRIANGLE_VERTICES, &TRIANGLE_INDICES)?;
        meshes.consume(ObjectCategory::Square, &SQUARE_VERTICES, &SQUARE_INDICES)?;
        meshes.consume(ObjectCategory::Star, &STAR_VERTICES, &STAR_INDICES)?;
        Ok(meshes)
    }

    /// Appends a mesh given as flat `[x, y, r, g, b, u, v]` vertices and
    /// indices local to that mesh.
    pub fn consume(
        &mut self,
        category: ObjectCategory,
        floats: &[f32],
        indices: &[u32],
    ) -> ResourceResult<()> {
        if self.ranges[category.index()].is_some() {
            return Err(ResourceError::DuplicateMesh(category));
        }
        if floats.len() % Vertex::FLOATS != 0 {
            return Err(ResourceError::RaggedVertices {
                category,
                len: floats.len(),
                stride: Vertex::FLOATS,
            });
        }
        if floats.is_empty() || indices.is_empty() {
            return Err(ResourceError::EmptyMesh(category));
        }

        let vertex_count = floats.len() / Vertex::FLOATS;
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(ResourceError::IndexOutOfRange {
                category,
                index,
                vertex_count,
            });
        }

        let range = MeshRange {
            index_count: indices.len() as u32,
            first_index: self.indices.len() as u32,
            vertex_offset: self.vertices.len() as i32,
        };

        self.vertices.extend(floats.chunks_exact(Vertex::FLOATS).map(|chunk| {
            let mut f = [0.0; Vertex::FLOATS];
            f.copy_from_slice(chunk);
            Vertex::from_floats(&f)
        }));
        self.indices.extend_from_slice(indices);
        self.ranges[category.index()] = Some(range);

        debug!(
            "Mesh {}: {} vertices, {} indices at {}",
            category.name(),
            vertex_count,
            range.index_count,
            range.first_index
        );
        Ok(())
    }

    pub fn range(&self, category: ObjectCategory) -> ResourceResult<MeshRange> {
        self.ranges[category.index()].ok_or(ResourceError::MissingMesh(category))
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Ensures every category has a mesh.
    pub fn validate(&self) -> ResourceResult<()> {
        for category in ObjectCategory::ALL {
            self.range(category)?;
        }
        Ok(())
    }
}

/// Vertex and index buffers holding a [`MeshMenagerie`].
pub struct MeshBuffers {
    pub vertex: Buffer,
    pub index: Buffer,
}

impl MeshBuffers {
    pub fn upload(device: Arc<Device>, meshes: &MeshMenagerie) -> ResourceResult<Self> {
        meshes.validate()?;
        let vertex = Buffer::with_data(device.clone(), BufferUsage::Vertex, meshes.vertices())?;
        let index = Buffer::with_data(device, BufferUsage::Index, meshes.indices())?;
        Ok(Self { vertex, index })
    }
}

#[rustfmt::skip]
const TRIANGLE_VERTICES: [f32; 21] = [
     0.0, -0.1,   0.0, 1.0, 0.0,   0.5, 0.0,
     0.1,  0.1,   0.0, 1.0, 0.0,   1.0, 1.0,
    -0.1,  0.1,   0.0, 1.0, 0.0,   0.0, 1.0,
];
const TRIANGLE_INDICES: [u32; 3] = [0, 1, 2];

#[rustfmt::skip]
const SQUARE_VERTICES: [f32; 28] = [
    -0.1,  0.1,   1.0, 0.0, 0.0,   0.0, 1.0,
    -0.1, -0.1,   1.0, 0.0, 0.0,   0.0, 0.0,
     0.1, -0.1,   1.0, 0.0, 0.0,   1.0, 0.0,
     0.1,  0.1,   1.0, 0.0, 0.0,   1.0, 1.0,
];
const SQUARE_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

#[rustfmt::skip]
const STAR_VERTICES: [f32; 70] = [
    -0.1,  -0.05,  1.0, 1.0, 1.0,  0.0, 0.25,
    -0.04, -0.05,  1.0, 1.0, 1.0,  0.3, 0.25,
    -0.06,  0.0,   1.0, 1.0, 1.0,  0.2, 0.5,
     0.0,  -0.1,   1.0, 1.0, 1.0,  0.5, 0.0,
     0.04, -0.05,  1.0, 1.0, 1.0,  0.7, 0.25,
     0.1,  -0.05,  1.0, 1.0, 1.0,  1.0, 0.25,
     0.06,  0.0,   1.0, 1.0, 1.0,  0.8, 0.5,
     0.08,  0.1,   1.0, 1.0, 1.0,  0.9, 1.0,
     0.0,   0.02,  1.0, 1.0, 1.0,  0.5, 0.6,
    -0.08,  0.1,   1.0, 1.0, 1.0,  0.1, 1.0,
];
#[rustfmt::skip]
const STAR_INDICES: [u32; 24] = [
    0, 1, 2,
    1, 3, 4,
    2, 1, 4,
    4, 5, 6,
    2, 4, 6,
    6, 7, 8,
    2, 6, 8,
    2, 8, 9,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ranges_are_contiguous() {
        let meshes = MeshMenagerie::builtin().unwrap();

        let triangle = meshes.range(ObjectCategory::Triangle).unwrap();
        let square = meshes.range(ObjectCategory::Square).unwrap();
        let star = meshes.range(ObjectCategory::Star).unwrap();

        assert_eq!(triangle, MeshRange { index_count: 3, first_index: 0, vertex_offset: 0 });
        assert_eq!(square, MeshRange { index_count: 6, first_index: 3, vertex_offset: 3 });
        assert_eq!(star, MeshRange { index_count: 24, first_index: 9, vertex_offset: 7 });

        assert_eq!(meshes.vertices().len(), 17);
        assert_eq!(meshes.indices().len(), 33);
        meshes.validate().unwrap();
    }

    #[test]
    fn test_builtin_vertex_colors() {
        let meshes = MeshMenagerie::builtin().unwrap();
        let v = meshes.vertices();
        assert_eq!(v[0].color, glam::Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(v[3].color, glam::Vec3::new(1.0, 0.0, 0.0));
        assert!(v[7..].iter().all(|v| v.color == glam::Vec3::ONE));
    }

    #[test]
    fn test_consume_rejects_ragged_vertices() {
        let mut meshes = MeshMenagerie::new();
        let err = meshes
            .consume(ObjectCategory::Triangle, &[0.0; 8], &[0])
            .unwrap_err();
        assert!(matches!(err, ResourceError::RaggedVertices { len: 8, .. }));
    }

    #[test]
    fn test_consume_rejects_out_of_range_index() {
        let mut meshes = MeshMenagerie::new();
        let err = meshes
            .consume(ObjectCategory::Square, &[0.0; 14], &[0, 1, 2])
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::IndexOutOfRange { index: 2, vertex_count: 2, .. }
        ));
    }

    #[test]
    fn test_consume_rejects_duplicate_and_reports_missing() {
        let mut meshes = MeshMenagerie::new();
        meshes
            .consume(ObjectCategory::Star, &TRIANGLE_VERTICES, &TRIANGLE_INDICES)
            .unwrap();
        assert!(matches!(
            meshes.consume(ObjectCategory::Star, &TRIANGLE_VERTICES, &TRIANGLE_INDICES),
            Err(ResourceError::DuplicateMesh(ObjectCategory::Star))
        ));
        assert!(matches!(
            meshes.validate(),
            Err(ResourceError::MissingMesh(ObjectCategory::Triangle))
        ));
    }
}
