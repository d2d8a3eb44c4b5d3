//! The one graphics pipeline every category is drawn with.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ash::vk;
use tracing::info;

use ringframe_rhi::RhiResult;
use ringframe_rhi::descriptor::DescriptorSetLayout;
use ringframe_rhi::device::Device;
use ringframe_rhi::pipeline::{CullMode, GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use ringframe_rhi::shader::{Shader, ShaderStage};
use ringframe_rhi::vertex::Vertex;

use super::depth::DEPTH_FORMAT;

/// Directory the compiled SPIR-V is loaded from, relative to the working
/// directory.
pub const SHADER_DIR: &str = "shaders/spirv";

pub fn shader_path(name: &str) -> PathBuf {
    Path::new(SHADER_DIR).join(format!("{name}.spv"))
}

/// Instanced pipeline plus its layout: set 0 holds the camera and transforms,
/// set 1 the category's texture.
pub struct InstancedPipeline {
    // Pipeline before layout.
    pipeline: Pipeline,
    layout: PipelineLayout,
}

impl InstancedPipeline {
    pub fn new(
        device: Arc<Device>,
        frame_layout: &DescriptorSetLayout,
        material_layout: &DescriptorSetLayout,
        color_format: vk::Format,
    ) -> RhiResult<Self> {
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            &shader_path("instanced.vert"),
            ShaderStage::Vertex,
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            &shader_path("instanced.frag"),
            ShaderStage::Fragment,
        )?;

        let layout = PipelineLayout::new(
            device.clone(),
            &[frame_layout.handle(), material_layout.handle()],
            &[],
        )?;

        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex_shader)
            .fragment_shader(&fragment_shader)
            .vertex_input(
                &[Vertex::binding_description()],
                &Vertex::attribute_descriptions(),
            )
            .cull_mode(CullMode::None)
            .color_format(color_format)
            .depth_format(DEPTH_FORMAT)
            .build(device, &layout)?;

        info!("Instanced pipeline created for {:?}", color_format);
        Ok(Self { pipeline, layout })
    }

    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline.handle()
    }

    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout.handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_paths() {
        assert_eq!(
            shader_path("instanced.vert"),
            Path::new("shaders/spirv/instanced.vert.spv")
        );
    }
}
