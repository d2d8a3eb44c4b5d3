//! Swapchain creation, recreation, acquire and present.
//!
//! The swapchain itself never decides when to rebuild: acquire and present
//! report out-of-date / suboptimal conditions back to the caller, and
//! [`Swapchain::recreate`] is invoked only once the device is idle.

use std::sync::Arc;
use std::thread;

use ash::vk;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::RhiError;
use crate::instance::Instance;

/// Surface capabilities, formats and present modes for one GPU.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> Result<Self, RhiError> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };
        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };
        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Longest a single acquire may block while holding the swapchain lock.
/// A worker waiting for an image must let the present that frees one in.
const ACQUIRE_TIMEOUT_NS: u64 = 1_000_000;

/// Swapchain plus one colour view per image.
///
/// Acquire and present both go through `access`: Vulkan requires host access
/// to a swapchain to be externally synchronised, and several workers may
/// acquire and present on it at once.
pub struct Swapchain {
    device: Arc<Device>,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    max_images: u32,
    access: Mutex<()>,
}

impl Swapchain {
    /// Creates a swapchain for `surface` sized to `extent`.
    ///
    /// At most `max_images` images are requested. Drivers may still return
    /// more, so [`Swapchain::image_count`] is not bounded by it.
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        extent: vk::Extent2D,
        max_images: u32,
    ) -> Result<Self, RhiError> {
        let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), device.handle());

        let mut swapchain = Self {
            device,
            surface_loader,
            swapchain_loader,
            surface,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            format: vk::Format::UNDEFINED,
            extent,
            present_mode: vk::PresentModeKHR::FIFO,
            max_images: max_images.max(1),
            access: Mutex::new(()),
        };
        swapchain.build(extent)?;
        Ok(swapchain)
    }

    /// Rebuilds the swapchain against a new drawable size.
    ///
    /// The caller must have waited for the device to go idle; the old image
    /// views are destroyed immediately.
    pub fn recreate(&mut self, extent: vk::Extent2D) -> Result<(), RhiError> {
        info!(
            "Recreating swapchain: {}x{} -> {}x{}",
            self.extent.width, self.extent.height, extent.width, extent.height
        );
        self.build(extent)
    }

    fn build(&mut self, requested: vk::Extent2D) -> Result<(), RhiError> {
        let support = SwapchainSupportDetails::query(
            self.device.physical_device(),
            self.surface,
            &self.surface_loader,
        )?;
        if !support.is_adequate() {
            return Err(RhiError::SwapchainError(
                "surface reports no formats or present modes".to_string(),
            ));
        }

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, requested);
        let image_count = determine_image_count(&support.capabilities, self.max_images);

        let queue_families = self.device.queue_families();
        let (Some(graphics_family), Some(present_family)) =
            (queue_families.graphics_family, queue_families.present_family)
        else {
            return Err(RhiError::NoSuitableGpu);
        };
        let family_indices = [graphics_family, present_family];
        let (sharing_mode, family_slice) = if graphics_family != present_family {
            (vk::SharingMode::CONCURRENT, family_indices.as_slice())
        } else {
            (vk::SharingMode::EXCLUSIVE, &[][..])
        };

        let old_swapchain = self.swapchain;
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(family_slice)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { self.swapchain_loader.create_swapchain(&create_info, None)? };

        self.destroy_image_views();
        if old_swapchain != vk::SwapchainKHR::null() {
            unsafe { self.swapchain_loader.destroy_swapchain(old_swapchain, None) };
        }
        self.swapchain = swapchain;

        let images = unsafe { self.swapchain_loader.get_swapchain_images(swapchain)? };
        if images.len() > self.max_images as usize {
            warn!(
                "Driver returned {} images for a request of at most {}",
                images.len(),
                self.max_images
            );
        }
        self.image_views = create_image_views(&self.device, &images, surface_format.format)?;
        self.images = images;
        self.format = surface_format.format;
        self.extent = extent;
        self.present_mode = present_mode;

        info!(
            "Swapchain ready: {}x{}, {:?}, {:?}, {} images",
            extent.width,
            extent.height,
            self.format,
            present_mode,
            self.images.len()
        );
        Ok(())
    }

    /// Acquires the next presentable image, signalling `semaphore`.
    ///
    /// Returns `(image_index, suboptimal)`. Out-of-date surfaces come back as
    /// `Err(vk::Result::ERROR_OUT_OF_DATE_KHR)`.
    ///
    /// Each attempt waits at most a millisecond under the lock; on a
    /// timeout the lock is released and the acquire is retried.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<(u32, bool), vk::Result> {
        retry_while_not_ready(|| {
            let _guard = self.access.lock();
            unsafe {
                self.swapchain_loader.acquire_next_image(
                    self.swapchain,
                    ACQUIRE_TIMEOUT_NS,
                    semaphore,
                    vk::Fence::null(),
                )
            }
        })
    }

    /// Presents `image_index` once `wait_semaphore` is signalled.
    ///
    /// Returns `Ok(true)` when the swapchain is suboptimal.
    pub fn present(&self, image_index: u32, wait_semaphore: vk::Semaphore) -> Result<bool, vk::Result> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let _guard = self.access.lock();
        unsafe { self.device.present(&self.swapchain_loader, &present_info) }
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn image(&self, index: usize) -> vk::Image {
        self.images[index]
    }

    #[inline]
    pub fn image_view(&self, index: usize) -> vk::ImageView {
        self.image_views[index]
    }

    fn destroy_image_views(&mut self) {
        for view in self.image_views.drain(..) {
            unsafe { self.device.handle().destroy_image_view(view, None) };
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.destroy_image_views();
        if self.swapchain != vk::SwapchainKHR::null() {
            unsafe { self.swapchain_loader.destroy_swapchain(self.swapchain, None) };
            debug!(
                "Swapchain destroyed ({}x{}, {} images)",
                self.extent.width,
                self.extent.height,
                self.images.len()
            );
        }
    }
}

/// Repeats `attempt` until it stops reporting that no image is ready yet.
fn retry_while_not_ready<T>(
    mut attempt: impl FnMut() -> Result<T, vk::Result>,
) -> Result<T, vk::Result> {
    loop {
        match attempt() {
            Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => thread::yield_now(),
            other => return other,
        }
    }
}

/// Prefers 8-bit BGRA in the sRGB colour space. `formats` must not be empty.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    const PREFERRED: [vk::Format; 2] = [vk::Format::B8G8R8A8_SRGB, vk::Format::B8G8R8A8_UNORM];

    PREFERRED
        .iter()
        .find_map(|&wanted| {
            formats.iter().copied().find(|f| {
                f.format == wanted && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
            })
        })
        .unwrap_or_else(|| {
            warn!("Using first available surface format: {:?}", formats[0].format);
            formats[0]
        })
}

fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, requested: vk::Extent2D) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    vk::Extent2D {
        width: requested.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: requested.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One more than the minimum, bounded by the surface maximum and by
/// `max_images`, but never below the surface minimum.
fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR, max_images: u32) -> u32 {
    let mut count = (capabilities.min_image_count + 1).min(max_images);
    if capabilities.max_image_count > 0 {
        count = count.min(capabilities.max_image_count);
    }
    count.max(capabilities.min_image_count)
}

fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<vk::ImageView>, RhiError> {
    let mut views = Vec::with_capacity(images.len());

    for &image in images {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .level_count(1)
                    .layer_count(1),
            );

        match unsafe { device.handle().create_image_view(&create_info, None) } {
            Ok(view) => views.push(view),
            Err(e) => {
                for view in views {
                    unsafe { device.handle().destroy_image_view(view, None) };
                }
                return Err(RhiError::SwapchainError(format!(
                    "failed to create image view: {e:?}"
                )));
            }
        }
    }

    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(min: u32, max: u32, current: vk::Extent2D) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: current,
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_acquire_retries_after_timeout() {
        let mut attempts = 0;
        let result = retry_while_not_ready(|| {
            attempts += 1;
            match attempts {
                1 => Err(vk::Result::TIMEOUT),
                2 => Err(vk::Result::NOT_READY),
                _ => Ok((2u32, false)),
            }
        });
        assert_eq!(result, Ok((2, false)));
        assert_eq!(attempts, 3);
    }

    #[test]
    fn test_acquire_retry_passes_errors_through() {
        let mut attempts = 0;
        let result: Result<(u32, bool), _> = retry_while_not_ready(|| {
            attempts += 1;
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR)
        });
        assert_eq!(result, Err(vk::Result::ERROR_OUT_OF_DATE_KHR));
        assert_eq!(attempts, 1);
    }

    const UNDEFINED_EXTENT: vk::Extent2D = vk::Extent2D {
        width: u32::MAX,
        height: u32::MAX,
    };

    #[test]
    fn test_surface_format_prefers_srgb() {
        let formats = [
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];
        assert_eq!(choose_surface_format(&formats).format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn test_surface_format_falls_back_to_first() {
        let formats = [vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];
        assert_eq!(choose_surface_format(&formats).format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn test_present_mode_choice() {
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX]),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::IMMEDIATE]),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_extent_uses_current_when_defined() {
        let current = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let extent = choose_extent(
            &caps(2, 3, current),
            vk::Extent2D {
                width: 10,
                height: 10,
            },
        );
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn test_extent_clamped_when_undefined() {
        let extent = choose_extent(
            &caps(2, 3, UNDEFINED_EXTENT),
            vk::Extent2D {
                width: 9000,
                height: 300,
            },
        );
        assert_eq!((extent.width, extent.height), (4096, 300));
    }

    #[test]
    fn test_image_count_bounds() {
        assert_eq!(determine_image_count(&caps(2, 0, UNDEFINED_EXTENT), 10), 3);
        assert_eq!(determine_image_count(&caps(2, 2, UNDEFINED_EXTENT), 10), 2);
        assert_eq!(determine_image_count(&caps(3, 8, UNDEFINED_EXTENT), 2), 3);
        assert_eq!(determine_image_count(&caps(1, 0, UNDEFINED_EXTENT), 10), 2);
    }

    #[test]
    fn test_support_adequacy() {
        let mut details = SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR::default(),
            formats: vec![],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(!details.is_adequate());
        details.formats.push(vk::SurfaceFormatKHR::default());
        assert!(details.is_adequate());
    }
}
