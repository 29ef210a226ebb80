// SPDX-License-Identifier: CEPL-1.0
//! GPU-visible record layouts. Every struct here is `#[repr(C)]` and shared
//! byte-for-byte with the built-in shaders.
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};

use crate::error::ScheduleError;

/// The compute stage expands one object into two triangles.
pub const VERTICES_PER_OBJECT: u32 = 6;

/// `metadata[0]` values selecting what an object samples.
pub mod texture_kind {
    pub const NONE: u32 = 0;
    /// Current slot layer image, index in `metadata[1]`.
    pub const LAYER: u32 = 1;
    /// Previous slot layer image (feedback), index in `metadata[1]`.
    pub const PREV_LAYER: u32 = 2;
    /// User image slot, index in `metadata[1]`.
    pub const USER: u32 = 3;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSource {
    None,
    Layer(u32),
    PrevLayer(u32),
    User(u32),
}

impl TextureSource {
    fn encode(self) -> [u32; 2] {
        match self {
            TextureSource::None => [texture_kind::NONE, 0],
            TextureSource::Layer(i) => [texture_kind::LAYER, i],
            TextureSource::PrevLayer(i) => [texture_kind::PREV_LAYER, i],
            TextureSource::User(i) => [texture_kind::USER, i],
        }
    }
}

/// One sprite as written by the CPU each frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectRecord {
    /// Centre in normalized device coordinates.
    pub pos: [f32; 4],
    /// Full extents in normalized device coordinates, before the x axis is
    /// scaled by the sprite aspect.
    pub scale: [f32; 4],
    /// Radians in `rotate[0]`.
    pub rotate: [f32; 4],
    pub color: [f32; 4],
    /// `(u0, v0, width, height)`.
    pub uvinfo: [f32; 4],
    pub metadata: [u32; 4],
}

impl Default for ObjectRecord {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl ObjectRecord {
    pub fn sprite(pos: Vec2, scale: Vec2, rotate: f32, color: Vec4) -> Self {
        ObjectRecord {
            pos: [pos.x, pos.y, 0.0, 1.0],
            scale: [scale.x, scale.y, 1.0, 1.0],
            rotate: [rotate, 0.0, 0.0, 0.0],
            color: color.to_array(),
            uvinfo: [0.0, 0.0, 1.0, 1.0],
            metadata: [texture_kind::NONE, 0, 0, 0],
        }
    }

    pub fn with_texture(mut self, source: TextureSource, uv: Vec4) -> Self {
        let [kind, index] = source.encode();
        self.metadata[0] = kind;
        self.metadata[1] = index;
        self.uvinfo = uv.to_array();
        self
    }
}

/// Compute output, consumed as vertex input. Never written by the CPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 4],
    pub uv: [f32; 4],
    pub color: [f32; 4],
    pub matid: u32,
    pub reserved: [u32; 3],
}

/// Same layout as `VkDrawIndirectCommand`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DrawCommand {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl DrawCommand {
    pub fn triangles(vertex_count: u32) -> Self {
        DrawCommand {
            vertex_count,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    }

    /// Byte offset of `layer`'s entry in a slot's indirect buffer.
    pub fn offset_of(layer: usize) -> u64 {
        (layer * std::mem::size_of::<DrawCommand>()) as u64
    }
}

/// Writes `layer`'s indirect draw arguments, leaving every other entry alone.
pub fn write_draw(
    table: &mut [DrawCommand],
    layer: usize,
    vertex_count: u32,
    capacity: u32,
) -> Result<(), ScheduleError> {
    let layer_max = table.len();
    let entry = table
        .get_mut(layer)
        .ok_or(ScheduleError::LayerOutOfRange { layer, layer_max })?;
    if vertex_count > capacity {
        return Err(ScheduleError::VertexCountExceeded {
            vertex_count,
            capacity,
        });
    }
    *entry = DrawCommand::triangles(vertex_count);
    Ok(())
}

/// Per-frame values in element 0 of the uniform table (std140).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct FrameUniforms {
    pub surface_size: [f32; 2],
    pub sprite_size: [f32; 2],
    pub frame: u32,
    pub slot: u32,
    pub layer_count: u32,
    pub object_max: u32,
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
