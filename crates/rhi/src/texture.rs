//! Sampled RGBA textures and samplers.

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::buffer::{Buffer, BufferUsage};
use crate::command::{CommandBuffer, CommandPool};
use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::sync::Fence;

pub const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;

/// Bytes an 8-bit RGBA image of `extent` occupies when tightly packed.
pub fn rgba_len(extent: vk::Extent2D) -> usize {
    extent.width as usize * extent.height as usize * 4
}

fn color_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange::default()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .level_count(1)
        .layer_count(1)
}

/// Device-local texture in `SHADER_READ_ONLY_OPTIMAL`.
pub struct Texture {
    device: Arc<Device>,
    image: vk::Image,
    image_view: vk::ImageView,
    allocation: Option<Allocation>,
    extent: vk::Extent2D,
}

impl Texture {
    /// Uploads tightly packed RGBA8 `pixels` and blocks until the copy has
    /// finished on the graphics queue.
    pub fn upload(
        device: Arc<Device>,
        name: &str,
        extent: vk::Extent2D,
        pixels: &[u8],
    ) -> RhiResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::InvalidHandle(format!(
                "texture '{name}' extent must be non-zero"
            )));
        }
        if pixels.len() != rgba_len(extent) {
            return Err(RhiError::InvalidHandle(format!(
                "texture '{name}' has {} bytes, expected {} for {}x{}",
                pixels.len(),
                rgba_len(extent),
                extent.width,
                extent.height
            )));
        }

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(TEXTURE_FORMAT)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.handle().create_image(&image_info, None)? };
        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

        let allocation = device.allocator().lock().allocate(&AllocationCreateDesc {
            name,
            requirements,
            location: MemoryLocation::GpuOnly,
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.handle().destroy_image(image, None) };
                return Err(e.into());
            }
        };

        let mut texture = Self {
            device,
            image,
            image_view: vk::ImageView::null(),
            allocation: Some(allocation),
            extent,
        };

        if let Some(allocation) = texture.allocation.as_ref() {
            unsafe {
                texture.device.handle().bind_image_memory(
                    image,
                    allocation.memory(),
                    allocation.offset(),
                )?;
            }
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(TEXTURE_FORMAT)
            .subresource_range(color_range());
        texture.image_view = unsafe { texture.device.handle().create_image_view(&view_info, None)? };

        texture.copy_from(pixels)?;

        debug!("Uploaded texture '{}' ({}x{})", name, extent.width, extent.height);
        Ok(texture)
    }

    fn copy_from(&self, pixels: &[u8]) -> RhiResult<()> {
        let device = &self.device;
        let graphics_family = device
            .queue_families()
            .graphics_family
            .ok_or(RhiError::NoSuitableGpu)?;

        let staging = Buffer::with_data(device.clone(), BufferUsage::Staging, pixels)?;
        let pool = CommandPool::new(device.clone(), graphics_family)?;
        let cmd = CommandBuffer::new(device.clone(), &pool)?;

        cmd.begin()?;
        cmd.image_barriers(&[vk::ImageMemoryBarrier2::default()
            .src_stage_mask(vk::PipelineStageFlags2::NONE)
            .src_access_mask(vk::AccessFlags2::NONE)
            .dst_stage_mask(vk::PipelineStageFlags2::COPY)
            .dst_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .image(self.image)
            .subresource_range(color_range())]);
        cmd.copy_buffer_to_image(staging.handle(), self.image, self.extent);
        cmd.image_barriers(&[vk::ImageMemoryBarrier2::default()
            .src_stage_mask(vk::PipelineStageFlags2::COPY)
            .src_access_mask(vk::AccessFlags2::TRANSFER_WRITE)
            .dst_stage_mask(vk::PipelineStageFlags2::FRAGMENT_SHADER)
            .dst_access_mask(vk::AccessFlags2::SHADER_SAMPLED_READ)
            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .image(self.image)
            .subresource_range(color_range())]);
        cmd.end()?;

        let fence = Fence::new(device.clone(), false)?;
        let command_buffers = [cmd.handle()];
        let submit = vk::SubmitInfo::default().command_buffers(&command_buffers);
        unsafe { device.submit_graphics(&[submit], fence.handle())? };
        // Staging and the pool must outlive the copy.
        fence.wait_forever()
    }

    pub fn descriptor_info(&self, sampler: &Sampler) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo::default()
            .sampler(sampler.handle())
            .image_view(self.image_view)
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            if self.image_view != vk::ImageView::null() {
                self.device
                    .handle()
                    .destroy_image_view(self.image_view, None);
            }
            self.device.handle().destroy_image(self.image, None);
        }

        if let Some(allocation) = self.allocation.take()
            && let Err(e) = self.device.allocator().lock().free(allocation)
        {
            tracing::error!("Failed to free texture allocation: {:?}", e);
        }
    }
}

/// Linear, repeating sampler shared by every material.
pub struct Sampler {
    device: Arc<Device>,
    sampler: vk::Sampler,
}

impl Sampler {
    pub fn linear_repeat(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .max_lod(0.0);
        let sampler = unsafe { device.handle().create_sampler(&create_info, None)? };
        Ok(Self { device, sampler })
    }

    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_sampler(self.sampler, None);
        }
    }
}
