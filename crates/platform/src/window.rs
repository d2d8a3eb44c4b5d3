//! Window and Vulkan surface creation.

use std::ffi::{CStr, c_char};
use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use ringframe_core::{Error, Result};

use crate::drawable::DrawableSize;

/// Owned `VkSurfaceKHR`. Must be dropped before the instance it came from.
pub struct Surface {
    handle: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl Surface {
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Loader used for capability, format and present-mode queries.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: handle was created by ash_window against the loader's instance
        // and is destroyed only here.
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
        tracing::debug!("Vulkan surface destroyed");
    }
}

/// The application window plus a shared view of its drawable size.
///
/// The drawable size is the only piece of window state render threads look
/// at; everything else stays on the event-loop thread.
pub struct Window {
    window: Arc<WinitWindow>,
    drawable: DrawableSize,
}

impl Window {
    pub fn new(event_loop: &ActiveEventLoop, width: u32, height: u32, title: &str) -> Result<Self> {
        let attrs = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| Error::Window(e.to_string()))?;

        let size = window.inner_size();
        tracing::info!("Window created: {}x{}", size.width, size.height);

        Ok(Self {
            window: Arc::new(window),
            drawable: DrawableSize::new(size.width, size.height),
        })
    }

    pub fn inner(&self) -> &WinitWindow {
        &self.window
    }

    /// Cloneable handle to the current drawable size.
    pub fn drawable(&self) -> DrawableSize {
        self.drawable.clone()
    }

    pub fn size(&self) -> (u32, u32) {
        self.drawable.get()
    }

    /// Records a new framebuffer size. Call from `WindowEvent::Resized`.
    pub fn resize(&self, width: u32, height: u32) {
        self.drawable.set(width, height);
        tracing::debug!("Window resized: {}x{}", width, height);
    }

    pub fn is_minimized(&self) -> bool {
        self.drawable.is_zero()
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    pub fn raw_display_handle(&self) -> Result<RawDisplayHandle> {
        self.window
            .display_handle()
            .map(|h| h.as_raw())
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))
    }

    /// Creates a surface for this window. The instance must outlive it.
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let display_handle = self.raw_display_handle()?;
        let window_handle = self
            .window
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?
            .as_raw();

        // SAFETY: handles come from a live winit window; the surface is
        // destroyed in Surface::drop.
        let handle = unsafe {
            ash_window::create_surface(entry, instance, display_handle, window_handle, None)
                .map_err(|e| Error::Vulkan(format!("Failed to create Vulkan surface: {}", e)))?
        };

        tracing::info!("Vulkan surface created");

        Ok(Surface {
            handle,
            loader: ash::khr::surface::Instance::new(entry, instance),
        })
    }
}

/// Instance extensions needed to present to `display`.
///
/// The returned pointers reference static strings owned by ash-window.
pub fn required_extensions(display: RawDisplayHandle) -> Result<Vec<*const c_char>> {
    let extensions = ash_window::enumerate_required_extensions(display)
        .map_err(|e| Error::Vulkan(format!("Failed to enumerate surface extensions: {}", e)))?;

    tracing::debug!(
        "Surface extensions: {:?}",
        extensions
            .iter()
            // SAFETY: ash-window returns valid NUL-terminated static strings.
            .map(|&ext| unsafe { CStr::from_ptr(ext) })
            .collect::<Vec<_>>()
    );

    Ok(extensions.to_vec())
}
