// SPDX-License-Identifier: CEPL-1.0
use thiserror::Error;

use crate::arena::MemoryKind;
use crate::shader::ShaderStage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
    #[error("frame_fifo_max = {requested} exceeds the supported maximum of {max}")]
    TooManySlots { requested: u32, max: u32 },
    #[error("layer_programs lists {got} programs but layer_max is {expected}")]
    LayerPrograms { expected: u32, got: usize },
    #[error("object_max = {object_max} exceeds the device compute dispatch limit {limit}")]
    ObjectMaxExceedsDispatch { object_max: u32, limit: u32 },
    #[error("sprite space {width}x{height} exceeds the device image limit {limit}")]
    SpriteTooLarge { width: u32, height: u32, limit: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("alignment {0} is not a power of two")]
    BadAlignment(u64),
    #[error(
        "block `{block}` exhausted: {requested} bytes at offset {offset} exceeds capacity {capacity}"
    )]
    CapacityExceeded {
        block: &'static str,
        requested: u64,
        offset: u64,
        capacity: u64,
    },
    #[error("no {kind:?} memory type in mask {type_bits:#b}")]
    NoMemoryType { kind: MemoryKind, type_bits: u32 },
    #[error("block `{block}` memory type {memory_type} is not allowed by mask {type_bits:#b}")]
    IncompatibleMemoryType {
        block: &'static str,
        memory_type: u32,
        type_bits: u32,
    },
    #[error("layer images need {required} bytes but gpu_memory_max is {budget}")]
    ImageBudget { required: u64, budget: u64 },
    #[error("out of device memory")]
    OutOfDeviceMemory,
    #[error("out of host memory")]
    OutOfHostMemory,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("slot {slot} is still in flight; wait for its fence before writing")]
    SlotInFlight { slot: usize },
    #[error("layer {layer} out of range (layer_max = {layer_max})")]
    LayerOutOfRange { layer: usize, layer_max: usize },
    #[error("vertex count {vertex_count} exceeds capacity {capacity}")]
    VertexCountExceeded { vertex_count: u32, capacity: u32 },
    #[error("frame phase {from:?} cannot move to {to:?}")]
    Phase {
        from: crate::schedule::FramePhase,
        to: crate::schedule::FramePhase,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("user image slot {slot} out of range (user_image_max = {max})")]
    SlotOutOfRange { slot: u32, max: u32 },
    #[error("user image {width}x{height} is empty or larger than {limit}")]
    BadExtent { width: u32, height: u32, limit: u32 },
    #[error("user image {width}x{height} needs {expected} bytes of RGBA8, got {got}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShaderError {
    #[error("{stage:?} bytecode for `{program}` is empty")]
    Empty { program: String, stage: ShaderStage },
    #[error("{stage:?} bytecode for `{program}` is not SPIR-V: {reason}")]
    Malformed {
        program: String,
        stage: ShaderStage,
        reason: &'static str,
    },
}
