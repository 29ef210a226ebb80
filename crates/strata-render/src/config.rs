// SPDX-License-Identifier: CEPL-1.0
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::records::{DrawCommand, FrameUniforms, ObjectRecord, Vertex, VERTICES_PER_OBJECT};

/// Upper bound on frames in flight.
pub const MAX_FRAME_FIFO: u32 = 8;

/// Program used for every layer but the last when `layer_programs` is unset.
pub const DEFAULT_LAYER_PROGRAM: &str = "rect";
/// Program used for the last (composited) layer when `layer_programs` is unset.
pub const DEFAULT_PRESENT_PROGRAM: &str = "present";

/// Sizing and behaviour of a render context. Fixed for the context lifetime.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContextConfig {
    pub frame_fifo_max: u32,
    pub sprite_width: u32,
    pub sprite_height: u32,
    pub object_max: u32,
    pub layer_max: u32,
    pub user_image_max: u32,
    pub descriptor_array_max: u32,
    pub gpu_memory_max: u64,
    pub fence_timeout_ms: u64,
    pub vsync: bool,
    pub clear_color: [f32; 4],
    pub layer_programs: Option<Vec<String>>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            frame_fifo_max: 2,
            sprite_width: 640,
            sprite_height: 480,
            object_max: 4096,
            layer_max: 4,
            user_image_max: 16,
            descriptor_array_max: 16,
            gpu_memory_max: 256 * 1024 * 1024,
            fence_timeout_ms: 1000,
            vsync: true,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            layer_programs: None,
        }
    }
}

/// Device limits the configuration is checked against once a device is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_compute_work_group_count_x: u32,
    pub max_image_dimension_2d: u32,
    pub min_storage_buffer_offset_alignment: u64,
    pub min_uniform_buffer_offset_alignment: u64,
    pub linear_blit: bool,
}

impl ContextConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("frame_fifo_max", self.frame_fifo_max),
            ("sprite_width", self.sprite_width),
            ("sprite_height", self.sprite_height),
            ("object_max", self.object_max),
            ("layer_max", self.layer_max),
            ("user_image_max", self.user_image_max),
            ("descriptor_array_max", self.descriptor_array_max),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero(name));
        }
        if self.gpu_memory_max == 0 {
            return Err(ConfigError::Zero("gpu_memory_max"));
        }
        if self.fence_timeout_ms == 0 {
            return Err(ConfigError::Zero("fence_timeout_ms"));
        }
        if self.frame_fifo_max > MAX_FRAME_FIFO {
            return Err(ConfigError::TooManySlots {
                requested: self.frame_fifo_max,
                max: MAX_FRAME_FIFO,
            });
        }
        if let Some(programs) = &self.layer_programs {
            if programs.len() != self.layer_max as usize {
                return Err(ConfigError::LayerPrograms {
                    expected: self.layer_max,
                    got: programs.len(),
                });
            }
        }
        Ok(())
    }

    /// Checks that only make sense once the physical device is known.
    pub fn validate_for_device(&self, limits: &DeviceLimits) -> Result<(), ConfigError> {
        if self.object_max > limits.max_compute_work_group_count_x {
            return Err(ConfigError::ObjectMaxExceedsDispatch {
                object_max: self.object_max,
                limit: limits.max_compute_work_group_count_x,
            });
        }
        if self.sprite_width > limits.max_image_dimension_2d
            || self.sprite_height > limits.max_image_dimension_2d
        {
            return Err(ConfigError::SpriteTooLarge {
                width: self.sprite_width,
                height: self.sprite_height,
                limit: limits.max_image_dimension_2d,
            });
        }
        Ok(())
    }

    /// Program name per layer, in layer order.
    pub fn programs(&self) -> Vec<String> {
        if let Some(p) = &self.layer_programs {
            return p.clone();
        }
        let n = self.layer_max as usize;
        (0..n)
            .map(|i| {
                if i + 1 == n {
                    DEFAULT_PRESENT_PROGRAM.to_owned()
                } else {
                    DEFAULT_LAYER_PROGRAM.to_owned()
                }
            })
            .collect()
    }

    pub fn object_buffer_bytes(&self) -> u64 {
        self.object_max as u64 * std::mem::size_of::<ObjectRecord>() as u64
    }

    pub fn vertex_buffer_bytes(&self) -> u64 {
        self.object_max as u64 * VERTICES_PER_OBJECT as u64 * std::mem::size_of::<Vertex>() as u64
    }

    pub fn indirect_buffer_bytes(&self) -> u64 {
        self.layer_max as u64 * std::mem::size_of::<DrawCommand>() as u64
    }

    pub fn uniform_buffer_bytes(&self) -> u64 {
        std::mem::size_of::<FrameUniforms>() as u64
    }

    /// Largest vertex count one layer can draw.
    pub fn vertex_capacity(&self) -> u32 {
        self.object_max.saturating_mul(VERTICES_PER_OBJECT)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
