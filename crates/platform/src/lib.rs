//! Windowing, surface creation and input for ringframe.

mod drawable;
mod input;
mod window;

pub use drawable::DrawableSize;
pub use input::{InputState, KeyCode, MouseButton};
pub use window::{Surface, Window, required_extensions};

pub use winit::event::WindowEvent;
pub use winit::event_loop::{ActiveEventLoop, EventLoop};
