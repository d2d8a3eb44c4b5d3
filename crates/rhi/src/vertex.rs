//! Vertex format shared by every built-in mesh.
//!
//! | location | field       | format            | offset |
//! |----------|-------------|-------------------|--------|
//! | 0        | `position`  | `R32G32_SFLOAT`   | 0      |
//! | 1        | `color`     | `R32G32B32_SFLOAT`| 8      |
//! | 2        | `tex_coord` | `R32G32_SFLOAT`   | 20     |

use std::mem::{offset_of, size_of};

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec2,
    pub color: Vec3,
    pub tex_coord: Vec2,
}

impl Vertex {
    /// Number of floats per vertex in the flat mesh tables.
    pub const FLOATS: usize = 7;

    #[inline]
    pub const fn new(position: Vec2, color: Vec3, tex_coord: Vec2) -> Self {
        Self {
            position,
            color,
            tex_coord,
        }
    }

    /// Builds a vertex from `[x, y, r, g, b, u, v]`.
    pub fn from_floats(f: &[f32; Self::FLOATS]) -> Self {
        Self::new(
            Vec2::new(f[0], f[1]),
            Vec3::new(f[2], f[3], f[4]),
            Vec2::new(f[5], f[6]),
        )
    }

    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Vertex, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, color) as u32,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Vertex, tex_coord) as u32,
            },
        ]
    }
}
