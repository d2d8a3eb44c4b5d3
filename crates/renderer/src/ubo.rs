//! GPU-visible per-frame data.
//!
//! Both structs are `#[repr(C)]` and `Pod` so they can be copied straight
//! into mapped buffers. Layouts match `shaders/instanced.vert`.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use ringframe_scene::Camera;

/// Camera uniform block (set 0, binding 0).
///
/// | Offset | Size | Field             |
/// |--------|------|-------------------|
/// | 0      | 64   | `view`            |
/// | 64     | 64   | `projection`      |
/// | 128    | 64   | `view_projection` |
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CameraUbo {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
}

impl CameraUbo {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self {
            view,
            projection,
            view_projection: projection * view,
        }
    }

    pub fn from_camera(camera: &Camera, aspect: f32) -> Self {
        Self::new(camera.view(), camera.projection(aspect))
    }
}

/// One entry of the transform storage buffer (set 0, binding 1), indexed by
/// `gl_InstanceIndex`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub model: Mat4,
}

impl InstanceTransform {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn at(position: Vec3) -> Self {
        Self {
            model: Mat4::from_translation(position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_match_shader_layout() {
        assert_eq!(CameraUbo::SIZE, 192);
        assert_eq!(InstanceTransform::SIZE, 64);
        assert!(std::mem::align_of::<CameraUbo>() >= 4);
    }

    #[test]
    fn test_camera_ubo_premultiplies() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh(1.0, 1.5, 0.1, 10.0);
        let ubo = CameraUbo::new(view, projection);
        assert_eq!(ubo.view_projection, projection * view);
    }

    #[test]
    fn test_instance_transform_translates() {
        let t = InstanceTransform::at(Vec3::new(0.3, -1.0, 0.0));
        let p = t.model.transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(0.3, -1.0, 0.0));
    }

    #[test]
    fn test_bytemuck_cast() {
        let transforms = [InstanceTransform::default(); 3];
        let bytes: &[u8] = bytemuck::cast_slice(&transforms);
        assert_eq!(bytes.len(), 3 * InstanceTransform::SIZE);
    }
}
