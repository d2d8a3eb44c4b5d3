//! Framebuffer size shared between the event loop and render threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Cloneable handle to the window's current drawable size.
///
/// A zero width or height means the window is minimized; swapchain
/// recreation blocks in [`DrawableSize::wait_nonzero`] until that changes.
#[derive(Clone)]
pub struct DrawableSize {
    inner: Arc<(Mutex<(u32, u32)>, Condvar)>,
}

impl DrawableSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new((Mutex::new((width, height)), Condvar::new())),
        }
    }

    pub fn set(&self, width: u32, height: u32) {
        let (lock, cvar) = &*self.inner;
        *lock.lock() = (width, height);
        cvar.notify_all();
    }

    pub fn get(&self) -> (u32, u32) {
        *self.inner.0.lock()
    }

    pub fn is_zero(&self) -> bool {
        let (w, h) = self.get();
        w == 0 || h == 0
    }

    /// Blocks until both dimensions are non-zero.
    ///
    /// Returns `None` if `stop` becomes set while waiting. The flag is polled,
    /// so callers setting it do not need to notify.
    pub fn wait_nonzero(&self, stop: &AtomicBool) -> Option<(u32, u32)> {
        let (lock, cvar) = &*self.inner;
        let mut size = lock.lock();
        loop {
            if size.0 != 0 && size.1 != 0 {
                return Some(*size);
            }
            if stop.load(Ordering::Acquire) {
                return None;
            }
            cvar.wait_for(&mut size, POLL_INTERVAL);
        }
    }
}

impl std::fmt::Debug for DrawableSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (w, h) = self.get();
        f.debug_struct("DrawableSize")
            .field("width", &w)
            .field("height", &h)
            .finish()
    }
}
