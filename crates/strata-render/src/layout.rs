// SPDX-License-Identifier: CEPL-1.0
//! Block sizing for the frame resource pool.
//!
//! Given the real memory requirements of one object buffer, one vertex
//! buffer, the control buffers and one layer image, this plans every block
//! and every region exactly as the backend will bump-allocate them, so an
//! oversize configuration fails before any device memory is touched.
use crate::arena::{packed_size, BumpArena, Region, Requirement};
use crate::config::{ContextConfig, DeviceLimits};
use crate::error::AllocError;

pub const HOST_BLOCK: &str = "host objects";
pub const VERTEX_BLOCK: &str = "vertices";
pub const CONTROL_BLOCK: &str = "control";
pub const IMAGE_BLOCK: &str = "layer images";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRequirements {
    pub object_buffer: Requirement,
    pub vertex_buffer: Requirement,
    pub indirect_buffer: Requirement,
    pub uniform_buffer: Requirement,
    pub layer_image: Requirement,
}

impl ResourceRequirements {
    /// Estimate from the configuration alone: tightly packed RGBA8 images and
    /// buffer alignment taken from the device limits.
    pub fn estimate(cfg: &ContextConfig, limits: &DeviceLimits) -> Self {
        let storage = limits.min_storage_buffer_offset_alignment;
        ResourceRequirements {
            object_buffer: Requirement {
                size: cfg.object_buffer_bytes(),
                alignment: storage,
            },
            vertex_buffer: Requirement {
                size: cfg.vertex_buffer_bytes(),
                alignment: storage,
            },
            indirect_buffer: Requirement {
                size: cfg.indirect_buffer_bytes(),
                alignment: 4,
            },
            uniform_buffer: Requirement {
                size: cfg.uniform_buffer_bytes(),
                alignment: limits.min_uniform_buffer_offset_alignment,
            },
            layer_image: Requirement {
                size: cfg.sprite_width as u64 * cfg.sprite_height as u64 * 4,
                alignment: 4096,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRegions {
    /// In the slot's host block.
    pub object: Region,
    /// In the slot's vertex block.
    pub vertex: Region,
    /// In the shared image block.
    pub image: Region,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotLayout {
    pub host_capacity: u64,
    pub vertex_capacity: u64,
    pub control_capacity: u64,
    pub indirect: Region,
    pub uniforms: Region,
    pub layers: Vec<LayerRegions>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    pub slots: Vec<SlotLayout>,
    pub image_capacity: u64,
    pub image_used: u64,
}

impl FrameLayout {
    pub fn plan(cfg: &ContextConfig, reqs: &ResourceRequirements) -> Result<FrameLayout, AllocError> {
        let fifo = cfg.frame_fifo_max as usize;
        let layers = cfg.layer_max as usize;

        let image_needed = packed_size(std::iter::repeat(reqs.layer_image).take(fifo * layers))?;
        if image_needed > cfg.gpu_memory_max {
            return Err(AllocError::ImageBudget {
                required: image_needed,
                budget: cfg.gpu_memory_max,
            });
        }
        let mut images = BumpArena::new(IMAGE_BLOCK, cfg.gpu_memory_max);

        let host_capacity = packed_size(std::iter::repeat(reqs.object_buffer).take(layers))?;
        let vertex_capacity = packed_size(std::iter::repeat(reqs.vertex_buffer).take(layers))?;
        let control_capacity = packed_size([reqs.indirect_buffer, reqs.uniform_buffer])?;

        let mut slots = Vec::with_capacity(fifo);
        for _ in 0..fifo {
            let mut host = BumpArena::new(HOST_BLOCK, host_capacity);
            let mut vertex = BumpArena::new(VERTEX_BLOCK, vertex_capacity);
            let mut control = BumpArena::new(CONTROL_BLOCK, control_capacity);

            let mut layer_regions = Vec::with_capacity(layers);
            for _ in 0..layers {
                layer_regions.push(LayerRegions {
                    object: host.allocate(reqs.object_buffer)?,
                    vertex: vertex.allocate(reqs.vertex_buffer)?,
                    image: images.allocate(reqs.layer_image)?,
                });
            }
            slots.push(SlotLayout {
                host_capacity,
                vertex_capacity,
                control_capacity,
                indirect: control.allocate(reqs.indirect_buffer)?,
                uniforms: control.allocate(reqs.uniform_buffer)?,
                layers: layer_regions,
            });
        }

        Ok(FrameLayout {
            slots,
            image_capacity: cfg.gpu_memory_max,
            image_used: images.used(),
        })
    }

    pub fn layer_count(&self) -> usize {
        self.slots.iter().map(|s| s.layers.len()).sum()
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
