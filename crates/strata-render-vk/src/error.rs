// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use strata_render::{AllocError, ConfigError, ScheduleError, ShaderError, ShaderStage, UploadError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("allocation failed: {0}")]
    Allocation(#[from] AllocError),
    #[error("pipeline `{program}` ({stage:?}) failed to build: {reason}")]
    PipelineCompile {
        program: String,
        stage: ShaderStage,
        reason: String,
    },
    #[error("surface invalidated ({0:?})")]
    SurfaceInvalidated(vk::Result),
    #[error("surface lost")]
    SurfaceLost,
    #[error("device lost")]
    DeviceLost,
    #[error("present failed ({0:?})")]
    PresentFailure(vk::Result),
    #[error("slot {slot} fence not signaled within {timeout_ms} ms")]
    FrameTimeout { slot: usize, timeout_ms: u64 },
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("{call}: {result:?}")]
    Vulkan {
        call: &'static str,
        result: vk::Result,
    },
    #[error("window handle: {0}")]
    Window(String),
    #[error("no physical device with a graphics+compute queue that can present")]
    NoDevice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Context stays usable after the caller reacts (rebuild, recreate surface).
    Recoverable,
    /// The frame was dropped, keep going.
    SkipFrame,
    /// The request was refused, nothing changed.
    Rejected,
    /// Drop the context.
    Fatal,
}

impl FrameError {
    pub fn severity(&self) -> Severity {
        match self {
            FrameError::SurfaceInvalidated(_) | FrameError::SurfaceLost => Severity::Recoverable,
            FrameError::PresentFailure(_) => Severity::SkipFrame,
            FrameError::Schedule(_) | FrameError::Upload(_) => Severity::Rejected,
            FrameError::Allocation(_)
            | FrameError::PipelineCompile { .. }
            | FrameError::DeviceLost
            | FrameError::FrameTimeout { .. }
            | FrameError::Config(_)
            | FrameError::Vulkan { .. }
            | FrameError::Window(_)
            | FrameError::NoDevice => Severity::Fatal,
        }
    }
}

impl From<ShaderError> for FrameError {
    fn from(e: ShaderError) -> Self {
        match e {
            ShaderError::Empty { program, stage } => FrameError::PipelineCompile {
                program,
                stage,
                reason: "empty bytecode".into(),
            },
            ShaderError::Malformed {
                program,
                stage,
                reason,
            } => FrameError::PipelineCompile {
                program,
                stage,
                reason: reason.into(),
            },
        }
    }
}

/// Maps a raw result from `call` to the error kind callers act on.
pub fn classify(call: &'static str, result: vk::Result) -> FrameError {
    match result {
        vk::Result::ERROR_OUT_OF_DATE_KHR | vk::Result::SUBOPTIMAL_KHR => {
            FrameError::SurfaceInvalidated(result)
        }
        vk::Result::ERROR_SURFACE_LOST_KHR => FrameError::SurfaceLost,
        vk::Result::ERROR_DEVICE_LOST => FrameError::DeviceLost,
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            FrameError::Allocation(AllocError::OutOfDeviceMemory)
        }
        vk::Result::ERROR_OUT_OF_HOST_MEMORY => FrameError::Allocation(AllocError::OutOfHostMemory),
        _ => FrameError::Vulkan { call, result },
    }
}

/// Like [`classify`], but anything unexpected from present only drops the frame.
pub fn classify_present(result: vk::Result) -> FrameError {
    match classify("queue_present", result) {
        FrameError::Vulkan { result, .. } => FrameError::PresentFailure(result),
        other => other,
    }
}

pub(crate) trait VkResultExt<T> {
    fn vk(self, call: &'static str) -> Result<T, FrameError>;
}

impl<T> VkResultExt<T> for Result<T, vk::Result> {
    fn vk(self, call: &'static str) -> Result<T, FrameError> {
        self.map_err(|r| classify(call, r))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
