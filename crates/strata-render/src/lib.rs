// SPDX-License-Identifier: CEPL-1.0
//! Backend-agnostic half of the layered sprite renderer: configuration,
//! record layouts, memory planning and the frame scheduling state machine.
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

pub mod arena;
pub mod blit;
pub mod config;
pub mod error;
pub mod layout;
pub mod records;
pub mod schedule;
pub mod shader;
pub mod upload;

pub use arena::{BumpArena, MemoryKind, Region, Requirement};
pub use config::{ContextConfig, DeviceLimits};
pub use error::{AllocError, ConfigError, ScheduleError, ShaderError, UploadError};
pub use layout::{FrameLayout, ResourceRequirements};
pub use records::{DrawCommand, FrameUniforms, ObjectRecord, TextureSource, Vertex};
pub use schedule::{feedback_slot, FramePhase, FrameRing, FrameStatus, SlotState};
pub use shader::{ShaderProvider, ShaderSet, ShaderStage, SpirvDir};
pub use upload::{UploadId, UploadQueue, UploadState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// What the application drives each frame: fill a layer's objects, set its
/// draw count, submit.
pub trait Renderer {
    type Error: std::error::Error + Send + Sync + 'static;

    fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        size: RenderSize,
        config: &ContextConfig,
        shaders: &dyn ShaderProvider,
    ) -> Result<Self, Self::Error>
    where
        Self: Sized;

    fn resize(&mut self, size: RenderSize) -> Result<(), Self::Error>;

    /// Object records of `layer` in the current slot. Waits for the slot to
    /// leave the GPU first.
    fn objects_mut(&mut self, layer: usize) -> Result<&mut [ObjectRecord], Self::Error>;

    /// Sets how many vertices `layer` draws this frame (6 per object).
    fn draw(&mut self, layer: usize, vertex_count: u32) -> Result<(), Self::Error>;

    fn submit(&mut self) -> Result<FrameStatus, Self::Error>;

    fn upload_user_image(
        &mut self,
        slot: u32,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), Self::Error>;

    fn set_clear_color(&mut self, rgba: [f32; 4]) -> Result<(), Self::Error>;
}
