//! Scene data and camera for ringframe.
//!
//! - [`Scene`]: per-category object positions, read once per frame
//! - [`Camera`] / [`CameraController`]: view and projection, driven by input

pub mod camera;
pub mod scene;

pub use camera::{Camera, CameraController};
pub use scene::{ObjectCategory, Scene};
