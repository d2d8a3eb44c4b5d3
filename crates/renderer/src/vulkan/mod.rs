//! The Vulkan implementation of [`GpuBackend`].

mod depth;
mod pipeline;
mod slot;

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use ringframe_platform::{Surface, Window, required_extensions};
use ringframe_resources::{MaterialSet, MeshBuffers, MeshMenagerie};
use ringframe_rhi::RhiError;
use ringframe_rhi::descriptor::DescriptorSetLayout;
use ringframe_rhi::device::Device;
use ringframe_rhi::instance::Instance;
use ringframe_rhi::physical_device::select_physical_device;
use ringframe_rhi::swapchain::{Swapchain, SwapchainSupportDetails, choose_surface_format};

use crate::K_RING_CAPACITY;
use crate::backend::{AcquireOutcome, GpuBackend, PresentOutcome};
use crate::error::{RenderError, RenderResult};

pub use depth::{DEPTH_FORMAT, DepthBuffer};
pub use pipeline::{InstancedPipeline, SHADER_DIR};
pub use slot::VulkanFrameSlot;

use slot::SharedHandles;

/// The swapchain the scheduler presents to.
pub struct VulkanSurface {
    swapchain: Swapchain,
}

impl VulkanSurface {
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }
}

/// The swapchain image a frame renders into.
#[derive(Debug, Clone, Copy)]
pub struct RenderTarget {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub extent: vk::Extent2D,
}

/// Instance, device and every long-lived object shared by all slots.
pub struct VulkanBackend {
    // Field order is drop order.
    pipeline: InstancedPipeline,
    meshes: MeshBuffers,
    materials: MaterialSet,
    frame_layout: DescriptorSetLayout,
    device: Arc<Device>,
    surface: Surface,
    instance: Instance,
}

impl VulkanBackend {
    pub fn new(
        window: &Window,
        debug: bool,
        meshes: &MeshMenagerie,
        texture_dir: &Path,
    ) -> RenderResult<Self> {
        let extensions = required_extensions(window.raw_display_handle()?)?;
        let instance = Instance::new(debug, &extensions)?;
        let surface = window.create_surface(instance.entry(), instance.handle())?;

        let physical = select_physical_device(instance.handle(), surface.handle(), surface.loader())?;
        let device = Device::new(&instance, &physical)?;

        let support =
            SwapchainSupportDetails::query(physical.device, surface.handle(), surface.loader())?;
        if !support.is_adequate() {
            return Err(RhiError::SwapchainError(
                "surface reports no formats or present modes".to_string(),
            )
            .into());
        }
        let color_format = choose_surface_format(&support.formats).format;

        let frame_layout = DescriptorSetLayout::per_frame(device.clone())?;
        let materials = MaterialSet::upload(device.clone(), texture_dir)?;
        let pipeline = InstancedPipeline::new(
            device.clone(),
            &frame_layout,
            materials.layout(),
            color_format,
        )?;
        let meshes = MeshBuffers::upload(device.clone(), meshes)?;

        info!("Vulkan backend ready on '{}'", physical.device_name());

        Ok(Self {
            pipeline,
            meshes,
            materials,
            frame_layout,
            device,
            surface,
            instance,
        })
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    fn shared_handles(&self) -> SharedHandles {
        SharedHandles {
            pipeline: self.pipeline.handle(),
            layout: self.pipeline.layout(),
            vertex_buffer: self.meshes.vertex.handle(),
            index_buffer: self.meshes.index.handle(),
            materials: self.materials.sets(),
        }
    }
}

impl GpuBackend for VulkanBackend {
    type Surface = VulkanSurface;
    type Target = RenderTarget;
    type Slot = VulkanFrameSlot;

    fn create_surface(&self, width: u32, height: u32) -> RenderResult<VulkanSurface> {
        let swapchain = Swapchain::new(
            &self.instance,
            self.device.clone(),
            self.surface.handle(),
            vk::Extent2D { width, height },
            K_RING_CAPACITY as u32,
        )?;
        Ok(VulkanSurface { swapchain })
    }

    fn recreate_surface(
        &self,
        surface: &mut VulkanSurface,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        surface.swapchain.recreate(vk::Extent2D { width, height })?;
        Ok(())
    }

    fn image_count(&self, surface: &VulkanSurface) -> usize {
        surface.swapchain.image_count()
    }

    fn extent(&self, surface: &VulkanSurface) -> (u32, u32) {
        let extent = surface.swapchain.extent();
        (extent.width, extent.height)
    }

    fn create_slot(
        &self,
        surface: &VulkanSurface,
        index: usize,
        transform_capacity: usize,
    ) -> RenderResult<VulkanFrameSlot> {
        let slot = VulkanFrameSlot::new(
            self.device.clone(),
            index,
            surface.swapchain.extent(),
            &self.frame_layout,
            self.shared_handles(),
            transform_capacity,
        )?;
        debug!(slot = index, "Created frame slot");
        Ok(slot)
    }

    fn wait_for_slot(&self, slot: &VulkanFrameSlot) -> RenderResult<()> {
        slot.wait()?;
        Ok(())
    }

    fn acquire(
        &self,
        surface: &VulkanSurface,
        slot: &VulkanFrameSlot,
    ) -> RenderResult<AcquireOutcome> {
        // A suboptimal acquire still signals the semaphore, so the image is used.
        match surface
            .swapchain
            .acquire_next_image(slot.sync().image_acquired())
        {
            Ok((image_index, _suboptimal)) => Ok(AcquireOutcome::Acquired { image_index }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::Stale),
            Err(e) => Err(RhiError::from(e).into()),
        }
    }

    fn reset_slot(&self, slot: &mut VulkanFrameSlot) -> RenderResult<()> {
        slot.reset()?;
        Ok(())
    }

    fn target(&self, surface: &VulkanSurface, image_index: u32) -> RenderTarget {
        let index = image_index as usize;
        RenderTarget {
            image: surface.swapchain.image(index),
            view: surface.swapchain.image_view(index),
            extent: surface.swapchain.extent(),
        }
    }

    fn submit(&self, slot: &mut VulkanFrameSlot) -> RenderResult<()> {
        let wait_semaphores = [slot.sync().image_acquired()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [slot.command_buffer().handle()];
        let signal_semaphores = [slot.sync().render_finished()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let result = unsafe {
            self.device
                .submit_graphics(&[submit_info], slot.sync().completion().handle())
        };
        result.map_err(|e| match e.vk_result() {
            Some(vk::Result::ERROR_DEVICE_LOST) => RenderError::Rhi(e),
            _ => RenderError::Submission(format!("slot {}: {}", slot.index(), e)),
        })
    }

    fn present(
        &self,
        surface: &VulkanSurface,
        slot: &VulkanFrameSlot,
        image_index: u32,
    ) -> RenderResult<PresentOutcome> {
        match surface
            .swapchain
            .present(image_index, slot.sync().render_finished())
        {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Stale),
            Err(e) => Err(RhiError::from(e).into()),
        }
    }

    fn restore_slot(&self, slot: &mut VulkanFrameSlot) -> RenderResult<()> {
        self.device.wait_idle()?;
        slot.rearm()?;
        Ok(())
    }

    fn wait_idle(&self) -> RenderResult<()> {
        self.device.wait_idle()?;
        Ok(())
    }
}
