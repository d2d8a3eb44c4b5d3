//! Fences and binary semaphores.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Binary GPU-side semaphore.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };
        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
    }
}

/// CPU-observable completion fence.
pub struct Fence {
    device: Arc<Device>,
    fence: vk::Fence,
}

impl Fence {
    pub fn new(device: Arc<Device>, signaled: bool) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe { device.handle().create_fence(&create_info, None)? };
        Ok(Self { device, fence })
    }

    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Waits up to `timeout` nanoseconds for the fence to signal.
    ///
    /// Returns `Ok(false)` on timeout.
    pub fn wait(&self, timeout: u64) -> RhiResult<bool> {
        let fences = [self.fence];
        match unsafe {
            self.device
                .handle()
                .wait_for_fences(&fences, true, timeout)
        } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Blocks until the fence signals, with no timeout.
    pub fn wait_forever(&self) -> RhiResult<()> {
        self.wait(u64::MAX).map(|_| ())
    }

    /// Returns the fence to the unsignaled state.
    pub fn reset(&self) -> RhiResult<()> {
        let fences = [self.fence];
        unsafe { self.device.handle().reset_fences(&fences)? };
        Ok(())
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
    }
}

/// The synchronisation objects owned by one frame slot.
///
/// The fence starts signaled so the first wait on a fresh slot returns at
/// once.
pub struct SlotSync {
    completion: Fence,
    image_acquired: Semaphore,
    render_finished: Semaphore,
}

impl SlotSync {
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        Ok(Self {
            completion: Fence::new(device.clone(), true)?,
            image_acquired: Semaphore::new(device.clone())?,
            render_finished: Semaphore::new(device)?,
        })
    }

    /// Replaces every primitive with a fresh one.
    ///
    /// Used after a failed submission: the acquire semaphore may be left
    /// signaled with no pending wait and the fence was already reset, so
    /// neither can be reused as-is. The caller must ensure the device is
    /// idle or that none of the old objects are referenced by pending work.
    pub fn rearm(&mut self, device: Arc<Device>) -> RhiResult<()> {
        *self = Self::new(device)?;
        debug!("Slot synchronisation primitives recreated");
        Ok(())
    }

    #[inline]
    pub fn completion(&self) -> &Fence {
        &self.completion
    }

    #[inline]
    pub fn image_acquired(&self) -> vk::Semaphore {
        self.image_acquired.handle()
    }

    #[inline]
    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished.handle()
    }
}
