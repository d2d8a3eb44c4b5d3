//! Keyboard and mouse state gathered from window events.
//!
//! One `InputState` is owned by the main loop and handed by reference to
//! whatever consumes input (the camera controller). Nothing here is global.

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::PhysicalKey;

pub use winit::keyboard::KeyCode;

/// Pixels per scroll "line" when converting pixel deltas.
const PIXELS_PER_LINE: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

impl From<winit::event::MouseButton> for MouseButton {
    fn from(button: winit::event::MouseButton) -> Self {
        match button {
            winit::event::MouseButton::Left => MouseButton::Left,
            winit::event::MouseButton::Right => MouseButton::Right,
            winit::event::MouseButton::Middle => MouseButton::Middle,
            _ => MouseButton::Other,
        }
    }
}

#[derive(Debug, Default)]
pub struct InputState {
    pressed_keys: HashSet<KeyCode>,
    just_pressed_keys: HashSet<KeyCode>,
    pressed_buttons: HashSet<MouseButton>,
    just_pressed_buttons: HashSet<MouseButton>,
    /// `None` until the first cursor event, so the first move never
    /// produces a jump.
    cursor: Option<Vec2>,
    cursor_delta: Vec2,
    scroll_delta: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears per-frame state. Call once per main-loop tick after input has
    /// been consumed.
    pub fn begin_frame(&mut self) {
        self.just_pressed_keys.clear();
        self.just_pressed_buttons.clear();
        self.cursor_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }

    /// Feeds a winit window event. Returns `true` if it was an input event.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.on_key_pressed(code),
                        ElementState::Released => self.on_key_released(code),
                    }
                }
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                match state {
                    ElementState::Pressed => self.on_mouse_pressed((*button).into()),
                    ElementState::Released => self.on_mouse_released((*button).into()),
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.on_cursor_moved(Vec2::new(position.x as f32, position.y as f32));
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
                };
                self.on_scroll(lines);
                true
            }
            _ => false,
        }
    }

    pub fn on_key_pressed(&mut self, key: KeyCode) {
        if self.pressed_keys.insert(key) {
            self.just_pressed_keys.insert(key);
        }
    }

    pub fn on_key_released(&mut self, key: KeyCode) {
        self.pressed_keys.remove(&key);
    }

    pub fn on_mouse_pressed(&mut self, button: MouseButton) {
        if self.pressed_buttons.insert(button) {
            self.just_pressed_buttons.insert(button);
        }
    }

    pub fn on_mouse_released(&mut self, button: MouseButton) {
        self.pressed_buttons.remove(&button);
    }

    /// Records a cursor position; deltas accumulate until `begin_frame`.
    pub fn on_cursor_moved(&mut self, position: Vec2) {
        if let Some(previous) = self.cursor {
            self.cursor_delta += position - previous;
        }
        self.cursor = Some(position);
    }

    /// Accumulates vertical scroll, in lines (positive is away from the user).
    pub fn on_scroll(&mut self, lines: f32) {
        self.scroll_delta += lines;
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.just_pressed_keys.contains(&key)
    }

    pub fn is_mouse_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    pub fn is_mouse_just_pressed(&self, button: MouseButton) -> bool {
        self.just_pressed_buttons.contains(&button)
    }

    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor
    }

    /// Cursor movement since the last `begin_frame`, in pixels, y down.
    pub fn cursor_delta(&self) -> Vec2 {
        self.cursor_delta
    }

    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_cursor_event_has_no_delta() {
        let mut input = InputState::new();
        input.on_cursor_moved(Vec2::new(100.0, 100.0));
        assert_eq!(input.cursor_delta(), Vec2::ZERO);

        input.on_cursor_moved(Vec2::new(110.0, 95.0));
        input.on_cursor_moved(Vec2::new(112.0, 90.0));
        assert_eq!(input.cursor_delta(), Vec2::new(12.0, -10.0));
    }

    #[test]
    fn test_begin_frame_clears_per_frame_state() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyW);
        input.on_mouse_pressed(MouseButton::Left);
        input.on_scroll(2.0);
        input.on_cursor_moved(Vec2::ZERO);
        input.on_cursor_moved(Vec2::new(5.0, 5.0));

        assert!(input.is_key_just_pressed(KeyCode::KeyW));
        assert!(input.is_mouse_just_pressed(MouseButton::Left));

        input.begin_frame();
        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(!input.is_key_just_pressed(KeyCode::KeyW));
        assert!(input.is_mouse_pressed(MouseButton::Left));
        assert!(!input.is_mouse_just_pressed(MouseButton::Left));
        assert_eq!(input.scroll_delta(), 0.0);
        assert_eq!(input.cursor_delta(), Vec2::ZERO);
        assert_eq!(input.cursor_position(), Some(Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn test_repeat_press_is_not_just_pressed() {
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyA);
        input.begin_frame();
        input.on_key_pressed(KeyCode::KeyA);
        assert!(!input.is_key_just_pressed(KeyCode::KeyA));

        input.on_key_released(KeyCode::KeyA);
        assert!(!input.is_key_pressed(KeyCode::KeyA));
    }

    #[test]
    fn test_scroll_accumulates() {
        let mut input = InputState::new();
        input.on_scroll(1.0);
        input.on_scroll(0.5);
        assert_eq!(input.scroll_delta(), 1.5);
    }
}
