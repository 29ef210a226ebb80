// SPDX-License-Identifier: CEPL-1.0
//! The fixed three-set binding model shared by every pipeline.
//!
//! set 0: sampled images (current layers, previous-slot layers, user images)
//! set 1: uniform table, element 0 = per-frame uniforms
//! set 2: per-layer storage (objects in, vertices out)
use ash::vk;
use strata_render::ContextConfig;

use crate::error::{FrameError, VkResultExt};

pub const SET_SAMPLED: u32 = 0;
pub const SET_UNIFORM: u32 = 1;
pub const SET_STORAGE: u32 = 2;

pub const BINDING_LAYERS: u32 = 0;
pub const BINDING_PREV_LAYERS: u32 = 1;
pub const BINDING_USER_IMAGES: u32 = 2;
pub const BINDING_UNIFORMS: u32 = 0;
pub const BINDING_OBJECTS: u32 = 0;
pub const BINDING_VERTICES: u32 = 1;

const STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::ALL_GRAPHICS.as_raw() | vk::ShaderStageFlags::COMPUTE.as_raw(),
);

/// Exact pool demand for a configuration: (type, descriptor count), max sets.
pub(crate) fn pool_demand(cfg: &ContextConfig) -> ([(vk::DescriptorType, u32); 3], u32) {
    let fifo = cfg.frame_fifo_max;
    let layers = cfg.layer_max;
    let sizes = [
        (
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            fifo * (2 * layers + cfg.user_image_max),
        ),
        (
            vk::DescriptorType::UNIFORM_BUFFER,
            fifo * cfg.descriptor_array_max,
        ),
        (vk::DescriptorType::STORAGE_BUFFER, fifo * layers * 2),
    ];
    (sizes, fifo * 2 + fifo * layers)
}

pub struct DescriptorRegistry {
    pub sampled_layout: vk::DescriptorSetLayout,
    pub uniform_layout: vk::DescriptorSetLayout,
    pub storage_layout: vk::DescriptorSetLayout,
    pub pipeline_layout: vk::PipelineLayout,
    pub pool: vk::DescriptorPool,
    pub sampler: vk::Sampler,
}

unsafe fn create_set_layout(
    device: &ash::Device,
    bindings: &[(u32, vk::DescriptorType, u32)],
) -> Result<vk::DescriptorSetLayout, FrameError> {
    let bindings: Vec<_> = bindings
        .iter()
        .map(|&(binding, descriptor_type, descriptor_count)| vk::DescriptorSetLayoutBinding {
            binding,
            descriptor_type,
            descriptor_count,
            stage_flags: STAGES,
            ..Default::default()
        })
        .collect();
    let ci = vk::DescriptorSetLayoutCreateInfo {
        s_type: vk::StructureType::DESCRIPTOR_SET_LAYOUT_CREATE_INFO,
        binding_count: bindings.len() as u32,
        p_bindings: bindings.as_ptr(),
        ..Default::default()
    };
    device
        .create_descriptor_set_layout(&ci, None)
        .vk("create_descriptor_set_layout")
}

unsafe fn create_sampler(device: &ash::Device) -> Result<vk::Sampler, FrameError> {
    let info = vk::SamplerCreateInfo {
        s_type: vk::StructureType::SAMPLER_CREATE_INFO,
        mag_filter: vk::Filter::LINEAR,
        min_filter: vk::Filter::LINEAR,
        mipmap_mode: vk::SamplerMipmapMode::LINEAR,
        address_mode_u: vk::SamplerAddressMode::REPEAT,
        address_mode_v: vk::SamplerAddressMode::REPEAT,
        address_mode_w: vk::SamplerAddressMode::REPEAT,
        compare_op: vk::CompareOp::NEVER,
        max_lod: vk::LOD_CLAMP_NONE,
        border_color: vk::BorderColor::FLOAT_OPAQUE_WHITE,
        ..Default::default()
    };
    device.create_sampler(&info, None).vk("create_sampler")
}

impl DescriptorRegistry {
    pub(crate) unsafe fn new(device: &ash::Device, cfg: &ContextConfig) -> Result<Self, FrameError> {
        let sampled_layout = create_set_layout(
            device,
            &[
                (BINDING_LAYERS, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, cfg.layer_max),
                (BINDING_PREV_LAYERS, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, cfg.layer_max),
                (
                    BINDING_USER_IMAGES,
                    vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    cfg.user_image_max,
                ),
            ],
        )?;
        let uniform_layout = create_set_layout(
            device,
            &[(
                BINDING_UNIFORMS,
                vk::DescriptorType::UNIFORM_BUFFER,
                cfg.descriptor_array_max,
            )],
        )?;
        let storage_layout = create_set_layout(
            device,
            &[
                (BINDING_OBJECTS, vk::DescriptorType::STORAGE_BUFFER, 1),
                (BINDING_VERTICES, vk::DescriptorType::STORAGE_BUFFER, 1),
            ],
        )?;

        // Index order must match SET_SAMPLED / SET_UNIFORM / SET_STORAGE.
        let set_layouts = [sampled_layout, uniform_layout, storage_layout];
        let layout_info = vk::PipelineLayoutCreateInfo {
            s_type: vk::StructureType::PIPELINE_LAYOUT_CREATE_INFO,
            set_layout_count: set_layouts.len() as u32,
            p_set_layouts: set_layouts.as_ptr(),
            ..Default::default()
        };
        let pipeline_layout = device
            .create_pipeline_layout(&layout_info, None)
            .vk("create_pipeline_layout")?;

        let (demand, max_sets) = pool_demand(cfg);
        let pool_sizes: Vec<_> = demand
            .iter()
            .map(|&(ty, descriptor_count)| vk::DescriptorPoolSize {
                ty,
                descriptor_count,
            })
            .collect();
        let pool_info = vk::DescriptorPoolCreateInfo {
            s_type: vk::StructureType::DESCRIPTOR_POOL_CREATE_INFO,
            max_sets,
            pool_size_count: pool_sizes.len() as u32,
            p_pool_sizes: pool_sizes.as_ptr(),
            ..Default::default()
        };
        let pool = device
            .create_descriptor_pool(&pool_info, None)
            .vk("create_descriptor_pool")?;

        let sampler = create_sampler(device)?;

        Ok(DescriptorRegistry {
            sampled_layout,
            uniform_layout,
            storage_layout,
            pipeline_layout,
            pool,
            sampler,
        })
    }

    pub(crate) unsafe fn allocate(
        &self,
        device: &ash::Device,
        layout: vk::DescriptorSetLayout,
        count: usize,
    ) -> Result<Vec<vk::DescriptorSet>, FrameError> {
        let layouts = vec![layout; count];
        let ai = vk::DescriptorSetAllocateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_ALLOCATE_INFO,
            descriptor_pool: self.pool,
            descriptor_set_count: layouts.len() as u32,
            p_set_layouts: layouts.as_ptr(),
            ..Default::default()
        };
        device
            .allocate_descriptor_sets(&ai)
            .vk("allocate_descriptor_sets")
    }

    /// Writes consecutive array elements of a combined-image-sampler binding.
    pub(crate) unsafe fn write_images(
        &self,
        device: &ash::Device,
        set: vk::DescriptorSet,
        binding: u32,
        first_element: u32,
        views: &[vk::ImageView],
        layout: vk::ImageLayout,
    ) {
        if views.is_empty() {
            return;
        }
        let infos: Vec<_> = views
            .iter()
            .map(|&image_view| vk::DescriptorImageInfo {
                sampler: self.sampler,
                image_view,
                image_layout: layout,
            })
            .collect();
        let write = vk::WriteDescriptorSet {
            s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
            dst_set: set,
            dst_binding: binding,
            dst_array_element: first_element,
            descriptor_count: infos.len() as u32,
            descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            p_image_info: infos.as_ptr(),
            ..Default::default()
        };
        device.update_descriptor_sets(std::slice::from_ref(&write), &[]);
    }

    pub(crate) unsafe fn write_buffer(
        &self,
        device: &ash::Device,
        set: vk::DescriptorSet,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
    ) {
        let info = vk::DescriptorBufferInfo {
            buffer,
            offset: 0,
            range,
        };
        let write = vk::WriteDescriptorSet {
            s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
            dst_set: set,
            dst_binding: binding,
            dst_array_element: 0,
            descriptor_count: 1,
            descriptor_type,
            p_buffer_info: &info,
            ..Default::default()
        };
        device.update_descriptor_sets(std::slice::from_ref(&write), &[]);
    }

    /// Fills every element of a uniform table binding with `buffer`.
    pub(crate) unsafe fn write_uniform_table(
        &self,
        device: &ash::Device,
        set: vk::DescriptorSet,
        count: u32,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
    ) {
        let infos = vec![
            vk::DescriptorBufferInfo {
                buffer,
                offset: 0,
                range,
            };
            count as usize
        ];
        let write = vk::WriteDescriptorSet {
            s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
            dst_set: set,
            dst_binding: BINDING_UNIFORMS,
            dst_array_element: 0,
            descriptor_count: infos.len() as u32,
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            p_buffer_info: infos.as_ptr(),
            ..Default::default()
        };
        device.update_descriptor_sets(std::slice::from_ref(&write), &[]);
    }

    pub(crate) unsafe fn destroy(&self, device: &ash::Device) {
        device.destroy_sampler(self.sampler, None);
        // Destroying the pool frees every set allocated from it.
        device.destroy_descriptor_pool(self.pool, None);
        device.destroy_pipeline_layout(self.pipeline_layout, None);
        device.destroy_descriptor_set_layout(self.storage_layout, None);
        device.destroy_descriptor_set_layout(self.uniform_layout, None);
        device.destroy_descriptor_set_layout(self.sampled_layout, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_demand_is_exact() {
        let cfg = ContextConfig::default();
        let (sizes, max_sets) = pool_demand(&cfg);
        // 2 slots * (4 current + 4 previous + 16 user)
        assert_eq!(sizes[0], (vk::DescriptorType::COMBINED_IMAGE_SAMPLER, 48));
        assert_eq!(sizes[1], (vk::DescriptorType::UNIFORM_BUFFER, 32));
        // 2 slots * 4 layers * (objects + vertices)
        assert_eq!(sizes[2], (vk::DescriptorType::STORAGE_BUFFER, 16));
        assert_eq!(max_sets, 2 * 2 + 2 * 4);
    }

    #[test]
    fn test_stage_mask_covers_graphics_and_compute() {
        assert!(STAGES.contains(vk::ShaderStageFlags::VERTEX));
        assert!(STAGES.contains(vk::ShaderStageFlags::FRAGMENT));
        assert!(STAGES.contains(vk::ShaderStageFlags::COMPUTE));
    }
}
