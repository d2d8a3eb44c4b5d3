//! One frame slot: everything a frame needs that must not be touched while
//! the GPU may still be using it.

use std::sync::Arc;

use ash::vk;

use ringframe_resources::{MATERIAL_SET, MeshRange};
use ringframe_rhi::buffer::{Buffer, BufferUsage};
use ringframe_rhi::command::{CommandBuffer, CommandPool};
use ringframe_rhi::descriptor::{DescriptorPool, DescriptorSetLayout, write_buffers};
use ringframe_rhi::device::Device;
use ringframe_rhi::sync::SlotSync;
use ringframe_rhi::{RhiError, RhiResult};
use ringframe_scene::ObjectCategory;

use super::RenderTarget;
use super::depth::DepthBuffer;
use crate::backend::{CommandRecorder, FrameResources};
use crate::error::{RenderError, RenderResult};
use crate::ubo::{CameraUbo, InstanceTransform};

const CLEAR_COLOR: [f32; 4] = [1.0, 0.5, 0.25, 1.0];

/// Raw handles the slot records against. Their owners outlive every slot.
#[derive(Clone, Copy)]
pub(crate) struct SharedHandles {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: vk::Buffer,
    /// Indexed by [`ObjectCategory::index`].
    pub materials: [vk::DescriptorSet; ObjectCategory::ALL.len()],
}

pub struct VulkanFrameSlot {
    index: usize,
    // Descriptor set is freed with the pool; buffers go after it.
    descriptor_set: vk::DescriptorSet,
    _descriptor_pool: DescriptorPool,
    camera: Buffer,
    transforms: Buffer,
    transform_capacity: usize,
    depth: DepthBuffer,
    pending_present: Option<vk::Image>,
    // Command buffer is freed with the pool.
    command_buffer: CommandBuffer,
    _command_pool: CommandPool,
    sync: SlotSync,
    shared: SharedHandles,
    device: Arc<Device>,
}

impl VulkanFrameSlot {
    pub(crate) fn new(
        device: Arc<Device>,
        index: usize,
        extent: vk::Extent2D,
        frame_layout: &DescriptorSetLayout,
        shared: SharedHandles,
        transform_capacity: usize,
    ) -> RhiResult<Self> {
        let graphics_family = device
            .queue_families()
            .graphics_family
            .ok_or(RhiError::NoSuitableGpu)?;

        let sync = SlotSync::new(device.clone())?;
        let command_pool = CommandPool::new(device.clone(), graphics_family)?;
        let command_buffer = CommandBuffer::new(device.clone(), &command_pool)?;
        let depth = DepthBuffer::new(device.clone(), extent)?;

        let camera = Buffer::new(
            device.clone(),
            BufferUsage::Uniform,
            CameraUbo::SIZE as vk::DeviceSize,
        )?;
        // Zero-capacity storage buffers are invalid; keep room for one.
        let transform_bytes = (transform_capacity.max(1) * InstanceTransform::SIZE) as vk::DeviceSize;
        let transforms = Buffer::new(device.clone(), BufferUsage::Storage, transform_bytes)?;

        let descriptor_pool = DescriptorPool::per_frame(device.clone())?;
        let descriptor_set = descriptor_pool.allocate(frame_layout.handle())?;
        write_buffers(
            &device,
            descriptor_set,
            &[
                (
                    0,
                    vk::DescriptorType::UNIFORM_BUFFER,
                    camera.descriptor_info(),
                ),
                (
                    1,
                    vk::DescriptorType::STORAGE_BUFFER,
                    transforms.descriptor_info(),
                ),
            ],
        );

        Ok(Self {
            index,
            descriptor_set,
            _descriptor_pool: descriptor_pool,
            camera,
            transforms,
            transform_capacity,
            depth,
            pending_present: None,
            command_buffer,
            _command_pool: command_pool,
            sync,
            shared,
            device,
        })
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub(crate) fn sync(&self) -> &SlotSync {
        &self.sync
    }

    #[inline]
    pub(crate) fn command_buffer(&self) -> &CommandBuffer {
        &self.command_buffer
    }

    /// Waits for the slot's last submission.
    pub(crate) fn wait(&self) -> RhiResult<()> {
        self.sync.completion().wait_forever()
    }

    /// Unsignals the fence and clears the command buffer for re-recording.
    pub(crate) fn reset(&mut self) -> RhiResult<()> {
        self.sync.completion().reset()?;
        self.command_buffer.reset()
    }

    /// Replaces the synchronisation primitives. The device must be idle.
    pub(crate) fn rearm(&mut self) -> RhiResult<()> {
        self.sync.rearm(self.device.clone())
    }
}

impl FrameResources for VulkanFrameSlot {
    fn transform_capacity(&self) -> usize {
        self.transform_capacity
    }

    fn write_camera(&mut self, camera: &CameraUbo) -> RenderResult<()> {
        self.camera.write(0, std::slice::from_ref(camera))?;
        Ok(())
    }

    fn write_transforms(&mut self, transforms: &[InstanceTransform]) -> RenderResult<()> {
        if transforms.len() > self.transform_capacity {
            return Err(RenderError::Capacity {
                what: "instance transforms",
                requested: transforms.len(),
                capacity: self.transform_capacity,
            });
        }
        if transforms.is_empty() {
            return Ok(());
        }
        self.transforms.write(0, transforms)?;
        Ok(())
    }
}

impl CommandRecorder for VulkanFrameSlot {
    type Target = RenderTarget;

    fn begin_pass(&mut self, target: &RenderTarget) -> RenderResult<()> {
        let cmd = &self.command_buffer;
        cmd.begin()?;

        let color_range = vk::ImageSubresourceRange::default()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .level_count(1)
            .layer_count(1);
        cmd.image_barriers(&[
            vk::ImageMemoryBarrier2::default()
                .src_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
                .src_access_mask(vk::AccessFlags2::NONE)
                .dst_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
                .dst_access_mask(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .image(target.image)
                .subresource_range(color_range),
            vk::ImageMemoryBarrier2::default()
                .src_stage_mask(vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS)
                .src_access_mask(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE)
                .dst_stage_mask(vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS)
                .dst_access_mask(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE)
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL)
                .image(self.depth.image())
                .subresource_range(DepthBuffer::subresource_range()),
        ]);

        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(target.view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: CLEAR_COLOR,
                },
            });
        let depth_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(self.depth.image_view())
            .image_layout(vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .clear_value(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            });
        let rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: target.extent,
            })
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment))
            .depth_attachment(&depth_attachment);

        cmd.begin_rendering(&rendering_info);
        cmd.set_viewport_and_scissor(target.extent);

        self.pending_present = Some(target.image);
        Ok(())
    }

    fn bind_pipeline(&mut self) {
        self.command_buffer
            .bind_graphics_pipeline(self.shared.pipeline);
    }

    fn bind_frame_data(&mut self) {
        self.command_buffer
            .bind_descriptor_set(self.shared.layout, 0, self.descriptor_set);
    }

    fn bind_geometry(&mut self) {
        self.command_buffer
            .bind_vertex_buffer(self.shared.vertex_buffer);
        self.command_buffer
            .bind_index_buffer(self.shared.index_buffer);
    }

    fn bind_category(&mut self, category: ObjectCategory) {
        self.command_buffer.bind_descriptor_set(
            self.shared.layout,
            MATERIAL_SET,
            self.shared.materials[category.index()],
        );
    }

    fn draw_instanced(&mut self, mesh: MeshRange, instance_count: u32, first_instance: u32) {
        if instance_count == 0 {
            return;
        }
        self.command_buffer.draw_indexed(
            mesh.index_count,
            instance_count,
            mesh.first_index,
            mesh.vertex_offset,
            first_instance,
        );
    }

    fn end_pass(&mut self) -> RenderResult<()> {
        let cmd = &self.command_buffer;
        cmd.end_rendering();

        if let Some(image) = self.pending_present.take() {
            cmd.image_barriers(&[vk::ImageMemoryBarrier2::default()
                .src_stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
                .src_access_mask(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
                .dst_stage_mask(vk::PipelineStageFlags2::BOTTOM_OF_PIPE)
                .dst_access_mask(vk::AccessFlags2::NONE)
                .old_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                .image(image)
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .level_count(1)
                        .layer_count(1),
                )]);
        }

        cmd.end()?;
        Ok(())
    }
}
