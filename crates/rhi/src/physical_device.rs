//! GPU selection.
//!
//! A device qualifies when it exposes a graphics queue family, a family that
//! can present to the target surface, the swapchain extension, and Vulkan 1.3
//! (dynamic rendering). Among qualifying devices the highest score wins.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::RhiError;

/// Queue family indices the renderer needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Distinct family indices, graphics first.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);
        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }
        families
    }

    /// Picks families from per-family queue flags and a present-support
    /// query. A family that does both graphics and present is preferred so
    /// submission and presentation share one queue.
    pub fn pick(
        families: &[vk::QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> bool,
    ) -> Self {
        let mut indices = Self::default();

        for (i, family) in families.iter().enumerate() {
            let i = i as u32;
            if family.queue_count == 0 {
                continue;
            }

            let graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
            let present = supports_present(i);

            if graphics && present {
                return Self {
                    graphics_family: Some(i),
                    present_family: Some(i),
                };
            }
            if graphics && indices.graphics_family.is_none() {
                indices.graphics_family = Some(i);
            }
            if present && indices.present_family.is_none() {
                indices.present_family = Some(i);
            }
        }

        indices
    }
}

#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    pub device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub queue_families: QueueFamilyIndices,
}

impl PhysicalDeviceInfo {
    pub fn device_name(&self) -> &str {
        unsafe {
            CStr::from_ptr(self.properties.device_name.as_ptr())
                .to_str()
                .unwrap_or("Unknown Device")
        }
    }

    pub fn device_local_memory(&self) -> u64 {
        self.memory_properties
            .memory_heaps
            .iter()
            .take(self.memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size)
            .sum()
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.properties.device_type)
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

/// Enumerates GPUs and returns the best one able to render to `surface`.
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableGpu`] when nothing qualifies.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<PhysicalDeviceInfo, RhiError> {
    let devices = unsafe { instance.enumerate_physical_devices()? };
    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableGpu);
    }

    let best = devices
        .into_iter()
        .filter_map(|device| check_device(instance, device, surface, surface_loader))
        .max_by_key(|info| {
            score_device(
                info.properties.device_type,
                info.device_local_memory(),
            )
        })
        .ok_or(RhiError::NoSuitableGpu)?;

    info!(
        "Selected GPU '{}' ({:?}), graphics family {:?}, present family {:?}",
        best.device_name(),
        best.properties.device_type,
        best.queue_families.graphics_family,
        best.queue_families.present_family
    );

    Ok(best)
}

fn check_device(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Option<PhysicalDeviceInfo> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };
    let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy();

    if !supports_api_1_3(properties.api_version) {
        debug!("GPU '{}' skipped: Vulkan 1.3 not supported", name);
        return None;
    }

    let has_swapchain = unsafe { instance.enumerate_device_extension_properties(device) }
        .map(|extensions| {
            extensions.iter().any(|ext| {
                let ext_name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
                ext_name == ash::khr::swapchain::NAME
            })
        })
        .unwrap_or(false);
    if !has_swapchain {
        debug!("GPU '{}' skipped: no swapchain extension", name);
        return None;
    }

    let families = unsafe { instance.get_physical_device_queue_family_properties(device) };
    let queue_families = QueueFamilyIndices::pick(&families, |i| unsafe {
        surface_loader
            .get_physical_device_surface_support(device, i, surface)
            .unwrap_or(false)
    });
    if !queue_families.is_complete() {
        debug!("GPU '{}' skipped: missing graphics or present queue", name);
        return None;
    }

    Some(PhysicalDeviceInfo {
        device,
        properties,
        memory_properties,
        queue_families,
    })
}

fn supports_api_1_3(api_version: u32) -> bool {
    let major = vk::api_version_major(api_version);
    let minor = vk::api_version_minor(api_version);
    major > 1 || (major == 1 && minor >= 3)
}

fn score_device(device_type: vk::PhysicalDeviceType, device_local_bytes: u64) -> u64 {
    let type_score = match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 100_000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 10_000,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 1_000,
        vk::PhysicalDeviceType::CPU => 100,
        _ => 1,
    };
    // VRAM in MiB, capped so it only breaks ties within a type.
    type_score + (device_local_bytes / (1024 * 1024)).min(16_000) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_pick_prefers_shared_family() {
        let families = [
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        ];
        let indices = QueueFamilyIndices::pick(&families, |i| i != 0);
        assert_eq!(indices.graphics_family, Some(2));
        assert_eq!(indices.present_family, Some(2));
        assert_eq!(indices.unique_families(), vec![2]);
    }

    #[test]
    fn test_pick_split_families() {
        let families = [
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::TRANSFER),
        ];
        let indices = QueueFamilyIndices::pick(&families, |i| i == 1);
        assert!(indices.is_complete());
        assert_eq!(indices.unique_families(), vec![0, 1]);
    }

    #[test]
    fn test_pick_incomplete_without_present() {
        let families = [family(vk::QueueFlags::GRAPHICS)];
        let indices = QueueFamilyIndices::pick(&families, |_| false);
        assert!(!indices.is_complete());
    }

    #[test]
    fn test_api_version_gate() {
        assert!(supports_api_1_3(vk::API_VERSION_1_3));
        assert!(!supports_api_1_3(vk::API_VERSION_1_2));
    }

    #[test]
    fn test_discrete_outranks_integrated() {
        let discrete = score_device(vk::PhysicalDeviceType::DISCRETE_GPU, 0);
        let integrated = score_device(vk::PhysicalDeviceType::INTEGRATED_GPU, 64 << 30);
        assert!(discrete > integrated);
    }
}
