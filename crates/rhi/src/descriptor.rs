//! Descriptor set layouts, pools, and buffer and image writes.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

pub struct DescriptorSetLayout {
    device: Arc<Device>,
    layout: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    pub fn new(
        device: Arc<Device>,
        bindings: &[vk::DescriptorSetLayoutBinding],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);
        let layout = unsafe {
            device
                .handle()
                .create_descriptor_set_layout(&create_info, None)?
        };
        debug!("Created descriptor set layout with {} binding(s)", bindings.len());
        Ok(Self { device, layout })
    }

    /// Layout for per-frame data: a uniform buffer at binding 0 and a
    /// storage buffer at binding 1, both read by the vertex stage.
    pub fn per_frame(device: Arc<Device>) -> RhiResult<Self> {
        let bindings = [
            buffer_binding(0, vk::DescriptorType::UNIFORM_BUFFER, vk::ShaderStageFlags::VERTEX),
            buffer_binding(1, vk::DescriptorType::STORAGE_BUFFER, vk::ShaderStageFlags::VERTEX),
        ];
        Self::new(device, &bindings)
    }

    /// Layout for one material: a combined image sampler at binding 0, read
    /// by the fragment stage.
    pub fn per_material(device: Arc<Device>) -> RhiResult<Self> {
        let bindings = [buffer_binding(
            0,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            vk::ShaderStageFlags::FRAGMENT,
        )];
        Self::new(device, &bindings)
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Pool sized for a fixed number of sets. Sets are released with the pool.
pub struct DescriptorPool {
    device: Arc<Device>,
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    pub fn new(
        device: Arc<Device>,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes);
        let pool = unsafe { device.handle().create_descriptor_pool(&create_info, None)? };
        Ok(Self { device, pool })
    }

    /// Pool holding exactly one per-frame set.
    pub fn per_frame(device: Arc<Device>) -> RhiResult<Self> {
        let sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(1),
        ];
        Self::new(device, 1, &sizes)
    }

    /// Pool holding `count` material sets.
    pub fn materials(device: Arc<Device>, count: u32) -> RhiResult<Self> {
        let sizes = [vk::DescriptorPoolSize::default()
            .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(count)];
        Self::new(device, count, &sizes)
    }

    pub fn allocate(&self, layout: vk::DescriptorSetLayout) -> RhiResult<vk::DescriptorSet> {
        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);
        let sets = unsafe { self.device.handle().allocate_descriptor_sets(&alloc_info)? };
        Ok(sets[0])
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_pool(self.pool, None);
        }
    }
}

pub fn buffer_binding(
    binding: u32,
    ty: vk::DescriptorType,
    stages: vk::ShaderStageFlags,
) -> vk::DescriptorSetLayoutBinding<'static> {
    vk::DescriptorSetLayoutBinding::default()
        .binding(binding)
        .descriptor_type(ty)
        .descriptor_count(1)
        .stage_flags(stages)
}

/// Points each `(binding, type, info)` of `set` at a buffer.
pub fn write_buffers(
    device: &Device,
    set: vk::DescriptorSet,
    buffers: &[(u32, vk::DescriptorType, vk::DescriptorBufferInfo)],
) {
    let infos: Vec<[vk::DescriptorBufferInfo; 1]> =
        buffers.iter().map(|(_, _, info)| [*info]).collect();

    let writes: Vec<vk::WriteDescriptorSet> = buffers
        .iter()
        .zip(infos.iter())
        .map(|((binding, ty, _), info)| {
            vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(*binding)
                .descriptor_type(*ty)
                .buffer_info(info)
        })
        .collect();

    if writes.is_empty() {
        return;
    }
    unsafe { device.handle().update_descriptor_sets(&writes, &[]) };
}

/// Points `binding` of `set` at a sampled image.
pub fn write_image(
    device: &Device,
    set: vk::DescriptorSet,
    binding: u32,
    info: vk::DescriptorImageInfo,
) {
    let infos = [info];
    let write = vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(binding)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .image_info(&infos);
    unsafe { device.handle().update_descriptor_sets(&[write], &[]) };
}
