//! Unit tests for Vulkan result classification
//!
//! Pure mapping tests, no device required.

use super::*;

// ============================================================================
// CLASSIFY
// ============================================================================

#[test]
fn test_surface_results() {
    assert!(matches!(
        classify("acquire_next_image", vk::Result::ERROR_OUT_OF_DATE_KHR),
        FrameError::SurfaceInvalidated(vk::Result::ERROR_OUT_OF_DATE_KHR)
    ));
    assert!(matches!(
        classify("acquire_next_image", vk::Result::SUBOPTIMAL_KHR),
        FrameError::SurfaceInvalidated(_)
    ));
    assert!(matches!(
        classify("acquire_next_image", vk::Result::ERROR_SURFACE_LOST_KHR),
        FrameError::SurfaceLost
    ));
}

#[test]
fn test_device_and_memory_results() {
    assert!(matches!(
        classify("queue_submit", vk::Result::ERROR_DEVICE_LOST),
        FrameError::DeviceLost
    ));
    assert!(matches!(
        classify("allocate_memory", vk::Result::ERROR_OUT_OF_DEVICE_MEMORY),
        FrameError::Allocation(AllocError::OutOfDeviceMemory)
    ));
    assert!(matches!(
        classify("allocate_memory", vk::Result::ERROR_OUT_OF_HOST_MEMORY),
        FrameError::Allocation(AllocError::OutOfHostMemory)
    ));
}

#[test]
fn test_unknown_result_keeps_call_name() {
    match classify("create_sampler", vk::Result::ERROR_INITIALIZATION_FAILED) {
        FrameError::Vulkan { call, result } => {
            assert_eq!(call, "create_sampler");
            assert_eq!(result, vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_present_unknown_is_present_failure() {
    assert!(matches!(
        classify_present(vk::Result::ERROR_UNKNOWN),
        FrameError::PresentFailure(vk::Result::ERROR_UNKNOWN)
    ));
    assert!(matches!(
        classify_present(vk::Result::ERROR_OUT_OF_DATE_KHR),
        FrameError::SurfaceInvalidated(_)
    ));
}

#[test]
fn test_result_ext() {
    let r: Result<u32, vk::Result> = Err(vk::Result::ERROR_DEVICE_LOST);
    assert!(matches!(r.vk("wait_for_fences"), Err(FrameError::DeviceLost)));
    let ok: Result<u32, vk::Result> = Ok(7);
    assert_eq!(ok.vk("noop").unwrap(), 7);
}

// ============================================================================
// SEVERITY
// ============================================================================

#[test]
fn test_severity_table() {
    assert_eq!(
        FrameError::SurfaceInvalidated(vk::Result::ERROR_OUT_OF_DATE_KHR).severity(),
        Severity::Recoverable
    );
    assert_eq!(FrameError::SurfaceLost.severity(), Severity::Recoverable);
    assert_eq!(
        FrameError::PresentFailure(vk::Result::ERROR_UNKNOWN).severity(),
        Severity::SkipFrame
    );
    assert_eq!(FrameError::DeviceLost.severity(), Severity::Fatal);
    assert_eq!(
        FrameError::FrameTimeout {
            slot: 0,
            timeout_ms: 1000
        }
        .severity(),
        Severity::Fatal
    );
    assert_eq!(
        FrameError::Allocation(AllocError::OutOfDeviceMemory).severity(),
        Severity::Fatal
    );
    assert_eq!(
        FrameError::Schedule(ScheduleError::SlotInFlight { slot: 1 }).severity(),
        Severity::Rejected
    );
}

#[test]
fn test_shader_error_becomes_pipeline_compile() {
    let e: FrameError = ShaderError::Empty {
        program: "rect".into(),
        stage: ShaderStage::Vertex,
    }
    .into();
    match e {
        FrameError::PipelineCompile {
            program, stage, ..
        } => {
            assert_eq!(program, "rect");
            assert_eq!(stage, ShaderStage::Vertex);
        }
        other => panic!("unexpected {other:?}"),
    }
}
