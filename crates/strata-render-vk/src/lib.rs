// SPDX-License-Identifier: CEPL-1.0
//! Vulkan backend: a multi-frame layered sprite renderer built on ash.
//!
//! [`VkContext`] owns the instance, device, swapchain and a fixed ring of
//! frame slots. Each slot carries its own object staging memory, layer
//! images and prerecorded command buffers; the CPU fills the next slot
//! while the GPU consumes earlier ones.
mod context;
mod descriptors;
mod device;
mod error;
mod frame;
mod memory;
mod pipeline;
mod record;
mod shaders;
mod swapchain;
mod user_image;

pub use context::VkContext;
pub use device::DeviceInfo;
pub use error::{classify, classify_present, FrameError, Severity};
pub use shaders::BuiltinShaders;
