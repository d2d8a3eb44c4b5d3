//! Fly camera and the input mapping that drives it.

use glam::{Mat4, Vec3};
use ringframe_platform::{InputState, KeyCode, MouseButton};

/// Look-at camera with a perspective lens.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    /// Unit view direction.
    pub front: Vec3,
    pub up: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        let eye = Vec3::new(1.0, 0.0, -1.0);
        Self {
            eye,
            front: (-eye).normalize(),
            up: Vec3::new(0.0, 0.0, -1.0),
            fov_degrees: 45.0,
            near: 0.1,
            far: 10.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.eye + self.front, self.up)
    }

    /// Perspective projection for Vulkan clip space (depth 0..1, Y down).
    pub fn projection(&self, aspect: f32) -> Mat4 {
        let mut proj =
            Mat4::perspective_rh(self.fov_degrees.to_radians(), aspect, self.near, self.far);
        proj.y_axis.y *= -1.0;
        proj
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    pub fn right(&self) -> Vec3 {
        self.front.cross(self.up).normalize()
    }
}

/// Maps mouse and keyboard state onto a [`Camera`].
///
/// - left drag: yaw/pitch
/// - middle drag: pan along up/right
/// - wheel: zoom (field of view)
/// - WASD: move along front/right
#[derive(Clone, Debug)]
pub struct CameraController {
    pub sensitivity: f32,
    pub move_speed: f32,
    pub pan_speed: f32,
    yaw: f32,
    pitch: f32,
}

impl CameraController {
    pub const MIN_FOV: f32 = 1.0;
    pub const MAX_FOV: f32 = 45.0;
    pub const PITCH_LIMIT: f32 = 89.0;

    /// Seeds yaw and pitch from the camera's current direction so the first
    /// drag does not snap.
    pub fn new(camera: &Camera) -> Self {
        let front = camera.front.normalize();
        Self {
            sensitivity: 0.1,
            move_speed: 100.0,
            pan_speed: 1.0,
            yaw: front.z.atan2(front.x).to_degrees(),
            pitch: front.y.clamp(-1.0, 1.0).asin().to_degrees(),
        }
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Applies one tick of input. Returns `true` if the camera changed.
    pub fn update(&mut self, camera: &mut Camera, input: &InputState, dt: f32) -> bool {
        let mut changed = false;
        let delta = input.cursor_delta();

        if input.is_mouse_pressed(MouseButton::Left) {
            if delta != glam::Vec2::ZERO {
                self.rotate(camera, delta.x * self.sensitivity, -delta.y * self.sensitivity);
                changed = true;
            }
        } else if input.is_mouse_pressed(MouseButton::Middle) && delta != glam::Vec2::ZERO {
            let speed = self.pan_speed * dt;
            camera.eye += camera.up * (speed * delta.y);
            camera.eye -= camera.right() * (speed * delta.x);
            changed = true;
        }

        let scroll = input.scroll_delta();
        if scroll != 0.0 {
            camera.fov_degrees = (camera.fov_degrees - scroll * self.move_speed * dt)
                .clamp(Self::MIN_FOV, Self::MAX_FOV);
            changed = true;
        }

        let step = self.move_speed * dt;
        let mut movement = Vec3::ZERO;
        if input.is_key_pressed(KeyCode::KeyW) {
            movement += camera.front;
        }
        if input.is_key_pressed(KeyCode::KeyS) {
            movement -= camera.front;
        }
        if input.is_key_pressed(KeyCode::KeyA) {
            movement -= camera.right();
        }
        if input.is_key_pressed(KeyCode::KeyD) {
            movement += camera.right();
        }
        if movement != Vec3::ZERO {
            camera.eye += movement * step;
            changed = true;
        }

        changed
    }

    fn rotate(&mut self, camera: &mut Camera, yaw_offset: f32, pitch_offset: f32) {
        self.yaw += yaw_offset;
        self.pitch = (self.pitch + pitch_offset).clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);

        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        camera.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
    }
}
