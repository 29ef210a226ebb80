// SPDX-License-Identifier: CEPL-1.0
use std::ffi::CStr;
use std::io::Cursor;

use ash::util::read_spv;
use ash::vk;
use strata_render::records::Vertex;
use strata_render::shader::COMPUTE_PROGRAM;
use strata_render::{ContextConfig, ShaderSet, ShaderStage};
use tracing::info;

use crate::error::{FrameError, VkResultExt};

pub(crate) const LAYER_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;
const ENTRY: &CStr = c"main";

/// Specialization constants shared by every stage:
/// 0 = layer_max, 1 = user_image_max, 2 = index of the layer being drawn.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct SpecData {
    layer_max: u32,
    user_image_max: u32,
    layer_index: u32,
}

const SPEC_ENTRIES: [vk::SpecializationMapEntry; 3] = [
    vk::SpecializationMapEntry {
        constant_id: 0,
        offset: 0,
        size: 4,
    },
    vk::SpecializationMapEntry {
        constant_id: 1,
        offset: 4,
        size: 4,
    },
    vk::SpecializationMapEntry {
        constant_id: 2,
        offset: 8,
        size: 4,
    },
];

pub struct PipelineSet {
    pub render_pass: vk::RenderPass,
    pub compute: vk::Pipeline,
    /// One per layer, in layer order.
    pub graphics: Vec<vk::Pipeline>,
}

/// Single color attachment, kept in GENERAL so it can be sampled and blitted
/// without leaving the pass layout.
unsafe fn create_render_pass(device: &ash::Device) -> Result<vk::RenderPass, FrameError> {
    let color = vk::AttachmentDescription {
        format: LAYER_FORMAT,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::LOAD,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::GENERAL,
        final_layout: vk::ImageLayout::GENERAL,
        ..Default::default()
    };
    let color_ref = vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::GENERAL,
    };
    let subpass = vk::SubpassDescription {
        pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
        color_attachment_count: 1,
        p_color_attachments: &color_ref,
        ..Default::default()
    };
    let rp_info = vk::RenderPassCreateInfo {
        s_type: vk::StructureType::RENDER_PASS_CREATE_INFO,
        attachment_count: 1,
        p_attachments: &color,
        subpass_count: 1,
        p_subpasses: &subpass,
        ..Default::default()
    };
    device
        .create_render_pass(&rp_info, None)
        .vk("create_render_pass")
}

unsafe fn create_shader_module(
    device: &ash::Device,
    program: &str,
    stage: ShaderStage,
    bytes: &[u8],
) -> Result<vk::ShaderModule, FrameError> {
    let code = read_spv(&mut Cursor::new(bytes)).map_err(|e| FrameError::PipelineCompile {
        program: program.to_owned(),
        stage,
        reason: e.to_string(),
    })?;
    let ci = vk::ShaderModuleCreateInfo {
        s_type: vk::StructureType::SHADER_MODULE_CREATE_INFO,
        p_code: code.as_ptr(),
        code_size: code.len() * 4,
        ..Default::default()
    };
    device
        .create_shader_module(&ci, None)
        .map_err(|r| FrameError::PipelineCompile {
            program: program.to_owned(),
            stage,
            reason: format!("create_shader_module: {r:?}"),
        })
}

unsafe fn create_compute_pipeline(
    device: &ash::Device,
    layout: vk::PipelineLayout,
    bytes: &[u8],
    spec: &vk::SpecializationInfo,
) -> Result<vk::Pipeline, FrameError> {
    let module = create_shader_module(device, COMPUTE_PROGRAM, ShaderStage::Compute, bytes)?;
    let info = vk::ComputePipelineCreateInfo {
        s_type: vk::StructureType::COMPUTE_PIPELINE_CREATE_INFO,
        stage: vk::PipelineShaderStageCreateInfo {
            s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
            stage: vk::ShaderStageFlags::COMPUTE,
            module,
            p_name: ENTRY.as_ptr(),
            p_specialization_info: spec,
            ..Default::default()
        },
        layout,
        ..Default::default()
    };
    let result =
        device.create_compute_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&info), None);
    device.destroy_shader_module(module, None);
    match result {
        Ok(p) => Ok(p[0]),
        Err((_, err)) => Err(FrameError::PipelineCompile {
            program: COMPUTE_PROGRAM.to_owned(),
            stage: ShaderStage::Compute,
            reason: format!("create_compute_pipelines: {err:?}"),
        }),
    }
}

unsafe fn create_layer_pipeline(
    device: &ash::Device,
    layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
    program: &str,
    vs_bytes: &[u8],
    fs_bytes: &[u8],
    spec: &vk::SpecializationInfo,
) -> Result<vk::Pipeline, FrameError> {
    let vs = create_shader_module(device, program, ShaderStage::Vertex, vs_bytes)?;
    let fs = match create_shader_module(device, program, ShaderStage::Fragment, fs_bytes) {
        Ok(fs) => fs,
        Err(e) => {
            device.destroy_shader_module(vs, None);
            return Err(e);
        }
    };

    let stages = [
        vk::PipelineShaderStageCreateInfo {
            s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
            stage: vk::ShaderStageFlags::VERTEX,
            module: vs,
            p_name: ENTRY.as_ptr(),
            p_specialization_info: spec,
            ..Default::default()
        },
        vk::PipelineShaderStageCreateInfo {
            s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
            stage: vk::ShaderStageFlags::FRAGMENT,
            module: fs,
            p_name: ENTRY.as_ptr(),
            p_specialization_info: spec,
            ..Default::default()
        },
    ];

    // Vertex input: binding 0 = compute output { pos, uv, color, matid }
    let vb = vk::VertexInputBindingDescription {
        binding: 0,
        stride: std::mem::size_of::<Vertex>() as u32,
        input_rate: vk::VertexInputRate::VERTEX,
    };
    let va = vertex_attributes();
    let vertex_input = vk::PipelineVertexInputStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_VERTEX_INPUT_STATE_CREATE_INFO,
        vertex_binding_description_count: 1,
        p_vertex_binding_descriptions: &vb,
        vertex_attribute_description_count: va.len() as u32,
        p_vertex_attribute_descriptions: va.as_ptr(),
        ..Default::default()
    };
    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_INPUT_ASSEMBLY_STATE_CREATE_INFO,
        topology: vk::PrimitiveTopology::TRIANGLE_LIST,
        ..Default::default()
    };
    let dyn_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_DYNAMIC_STATE_CREATE_INFO,
        dynamic_state_count: dyn_states.len() as u32,
        p_dynamic_states: dyn_states.as_ptr(),
        ..Default::default()
    };
    let viewport_state = vk::PipelineViewportStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_VIEWPORT_STATE_CREATE_INFO,
        viewport_count: 1,
        scissor_count: 1,
        ..Default::default()
    };
    // Sprites are rotated freely, so both windings are visible.
    let raster = vk::PipelineRasterizationStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_RASTERIZATION_STATE_CREATE_INFO,
        polygon_mode: vk::PolygonMode::FILL,
        cull_mode: vk::CullModeFlags::NONE,
        front_face: vk::FrontFace::COUNTER_CLOCKWISE,
        line_width: 1.0,
        ..Default::default()
    };
    let multisample = vk::PipelineMultisampleStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_MULTISAMPLE_STATE_CREATE_INFO,
        rasterization_samples: vk::SampleCountFlags::TYPE_1,
        ..Default::default()
    };
    let color_blend_att = vk::PipelineColorBlendAttachmentState {
        blend_enable: vk::TRUE,
        src_color_blend_factor: vk::BlendFactor::SRC_ALPHA,
        dst_color_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        color_blend_op: vk::BlendOp::ADD,
        src_alpha_blend_factor: vk::BlendFactor::ONE,
        dst_alpha_blend_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        alpha_blend_op: vk::BlendOp::ADD,
        color_write_mask: vk::ColorComponentFlags::R
            | vk::ColorComponentFlags::G
            | vk::ColorComponentFlags::B
            | vk::ColorComponentFlags::A,
    };
    let color_blend = vk::PipelineColorBlendStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_COLOR_BLEND_STATE_CREATE_INFO,
        attachment_count: 1,
        p_attachments: &color_blend_att,
        ..Default::default()
    };

    let pipeline_info = vk::GraphicsPipelineCreateInfo {
        s_type: vk::StructureType::GRAPHICS_PIPELINE_CREATE_INFO,
        stage_count: stages.len() as u32,
        p_stages: stages.as_ptr(),
        p_vertex_input_state: &vertex_input,
        p_input_assembly_state: &input_assembly,
        p_viewport_state: &viewport_state,
        p_rasterization_state: &raster,
        p_multisample_state: &multisample,
        p_color_blend_state: &color_blend,
        p_dynamic_state: &dynamic_state,
        layout,
        render_pass,
        subpass: 0,
        ..Default::default()
    };

    let result = device.create_graphics_pipelines(
        vk::PipelineCache::null(),
        std::slice::from_ref(&pipeline_info),
        None,
    );
    device.destroy_shader_module(vs, None);
    device.destroy_shader_module(fs, None);
    match result {
        Ok(p) => Ok(p[0]),
        Err((_, err)) => Err(FrameError::PipelineCompile {
            program: program.to_owned(),
            stage: ShaderStage::Fragment,
            reason: format!("create_graphics_pipelines: {err:?}"),
        }),
    }
}

pub(crate) fn vertex_attributes() -> [vk::VertexInputAttributeDescription; 4] {
    let vec4 = std::mem::size_of::<[f32; 4]>() as u32;
    [
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32B32A32_SFLOAT,
            offset: 0,
        },
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 0,
            format: vk::Format::R32G32B32A32_SFLOAT,
            offset: vec4,
        },
        vk::VertexInputAttributeDescription {
            location: 2,
            binding: 0,
            format: vk::Format::R32G32B32A32_SFLOAT,
            offset: 2 * vec4,
        },
        vk::VertexInputAttributeDescription {
            location: 3,
            binding: 0,
            format: vk::Format::R32_UINT,
            offset: 3 * vec4,
        },
    ]
}

impl PipelineSet {
    /// Builds the render pass, the shared compute pipeline and one graphics
    /// pipeline per layer. Anything built before a failure is destroyed.
    pub(crate) unsafe fn build(
        device: &ash::Device,
        layout: vk::PipelineLayout,
        shaders: &ShaderSet,
        cfg: &ContextConfig,
    ) -> Result<PipelineSet, FrameError> {
        let render_pass = create_render_pass(device)?;
        let mut set = PipelineSet {
            render_pass,
            compute: vk::Pipeline::null(),
            graphics: Vec::with_capacity(shaders.layers.len()),
        };

        let spec_for = |layer_index: u32| SpecData {
            layer_max: cfg.layer_max,
            user_image_max: cfg.user_image_max,
            layer_index,
        };
        let spec_info = |data: &SpecData| vk::SpecializationInfo {
            map_entry_count: SPEC_ENTRIES.len() as u32,
            p_map_entries: SPEC_ENTRIES.as_ptr(),
            data_size: std::mem::size_of::<SpecData>(),
            p_data: (data as *const SpecData).cast(),
            ..Default::default()
        };

        let compute_data = spec_for(0);
        match create_compute_pipeline(device, layout, &shaders.compute, &spec_info(&compute_data)) {
            Ok(p) => set.compute = p,
            Err(e) => {
                set.destroy(device);
                return Err(e);
            }
        }

        for (i, layer) in shaders.layers.iter().enumerate() {
            let data = spec_for(i as u32);
            match create_layer_pipeline(
                device,
                layout,
                render_pass,
                &layer.program,
                &layer.vertex,
                &layer.fragment,
                &spec_info(&data),
            ) {
                Ok(p) => set.graphics.push(p),
                Err(e) => {
                    set.destroy(device);
                    return Err(e);
                }
            }
        }

        info!(
            "pipelines: 1 compute + {} graphics ({})",
            set.graphics.len(),
            shaders
                .layers
                .iter()
                .map(|l| l.program.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(set)
    }

    pub(crate) unsafe fn destroy(&self, device: &ash::Device) {
        for &p in &self.graphics {
            device.destroy_pipeline(p, None);
        }
        if self.compute != vk::Pipeline::null() {
            device.destroy_pipeline(self.compute, None);
        }
        device.destroy_render_pass(self.render_pass, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_attributes_cover_vertex_layout() {
        let va = vertex_attributes();
        let last = va[3];
        assert_eq!(last.offset, 48);
        assert_eq!(last.format, vk::Format::R32_UINT);
        assert!(last.offset + 4 <= std::mem::size_of::<Vertex>() as u32);
        let locations: Vec<_> = va.iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_spec_entries_match_spec_data() {
        assert_eq!(std::mem::size_of::<SpecData>(), 12);
        for (i, e) in SPEC_ENTRIES.iter().enumerate() {
            assert_eq!(e.constant_id, i as u32);
            assert_eq!(e.offset as usize, i * 4);
        }
    }
}
