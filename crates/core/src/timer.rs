//! Frame timing helpers.

use std::time::{Duration, Instant};

/// Monotonic timer used for per-tick delta time.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_tick: Instant,
}

impl Timer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
        }
    }

    /// Total time since creation or the last [`Timer::reset`].
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time since the previous call to `tick()`.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        delta
    }

    pub fn delta_secs(&mut self) -> f32 {
        self.tick().as_secs_f32()
    }

    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last_tick = now;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a monotonically increasing completed-frame total into a
/// frames-per-second reading, once per reporting window.
///
/// The counter never resets the source total; it remembers the total seen at
/// the start of the current window instead.
#[derive(Debug)]
pub struct FrameRateCounter {
    window: Duration,
    window_start: Instant,
    frames_at_window_start: u64,
    last_fps: u32,
}

impl FrameRateCounter {
    /// Creates a counter reporting once per second.
    pub fn new(completed_frames: u64) -> Self {
        Self::with_window(Duration::from_secs(1), Instant::now(), completed_frames)
    }

    pub fn with_window(window: Duration, now: Instant, completed_frames: u64) -> Self {
        Self {
            window,
            window_start: now,
            frames_at_window_start: completed_frames,
            last_fps: 0,
        }
    }

    /// Feeds the current completed-frame total.
    ///
    /// Returns `Some(fps)` when a reporting window has closed.
    pub fn update(&mut self, completed_frames: u64) -> Option<u32> {
        self.update_at(Instant::now(), completed_frames)
    }

    pub fn update_at(&mut self, now: Instant, completed_frames: u64) -> Option<u32> {
        let delta = now.saturating_duration_since(self.window_start);
        if delta < self.window {
            return None;
        }

        let frames = completed_frames.saturating_sub(self.frames_at_window_start);
        let fps = ((frames as f64 / delta.as_secs_f64()) as u32).max(1);

        self.window_start = now;
        self.frames_at_window_start = completed_frames;
        self.last_fps = fps;
        Some(fps)
    }

    /// Most recent reading, `0` before the first window closes.
    pub fn last_fps(&self) -> u32 {
        self.last_fps
    }

    /// Average frame time in milliseconds for the last reading.
    pub fn frame_time_ms(&self) -> f32 {
        if self.last_fps == 0 {
            0.0
        } else {
            1000.0 / self.last_fps as f32
        }
    }
}
