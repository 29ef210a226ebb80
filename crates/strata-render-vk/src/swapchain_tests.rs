//! Unit tests for swapchain parameter selection
//!
//! Pure functions over surface capabilities, no device required.

use super::*;

fn caps(min: u32, max: u32, current: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: min,
        max_image_count: max,
        current_extent: vk::Extent2D {
            width: current.0,
            height: current.1,
        },
        min_image_extent: vk::Extent2D {
            width: 1,
            height: 1,
        },
        max_image_extent: vk::Extent2D {
            width: 4096,
            height: 4096,
        },
        ..Default::default()
    }
}

// ============================================================================
// IMAGE COUNT
// ============================================================================

#[test]
fn test_image_count_at_least_fifo() {
    assert_eq!(image_count(&caps(2, 8, (0, 0)), 3), 3);
    assert_eq!(image_count(&caps(3, 8, (0, 0)), 2), 3);
    assert_eq!(image_count(&caps(2, 0, (0, 0)), 6), 6);
    assert_eq!(image_count(&caps(2, 3, (0, 0)), 6), 3);
}

// ============================================================================
// EXTENT
// ============================================================================

#[test]
fn test_extent_uses_current_when_fixed() {
    let e = extent_from_caps(
        &caps(2, 3, (1024, 768)),
        RenderSize {
            width: 10,
            height: 10,
        },
    );
    assert_eq!((e.width, e.height), (1024, 768));
}

#[test]
fn test_extent_clamps_hint_when_free() {
    let e = extent_from_caps(
        &caps(2, 3, (u32::MAX, u32::MAX)),
        RenderSize {
            width: 9000,
            height: 600,
        },
    );
    assert_eq!((e.width, e.height), (4096, 600));
}

// ============================================================================
// TRANSFORM
// ============================================================================

#[test]
fn test_transform_follows_current_even_when_identity_supported() {
    let mut c = caps(2, 3, (1024, 768));
    c.supported_transforms =
        vk::SurfaceTransformFlagsKHR::IDENTITY | vk::SurfaceTransformFlagsKHR::ROTATE_90;
    c.current_transform = vk::SurfaceTransformFlagsKHR::ROTATE_90;
    assert_eq!(surface_transform(&c), vk::SurfaceTransformFlagsKHR::ROTATE_90);

    c.current_transform = vk::SurfaceTransformFlagsKHR::IDENTITY;
    assert_eq!(surface_transform(&c), vk::SurfaceTransformFlagsKHR::IDENTITY);
}

// ============================================================================
// FORMAT / PRESENT MODE
// ============================================================================

#[test]
fn test_surface_format_prefers_bgra_unorm() {
    let formats = [
        vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
        vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
    ];
    assert_eq!(
        pick_surface_format(&formats).map(|f| f.format),
        Some(vk::Format::B8G8R8A8_UNORM)
    );
    assert_eq!(
        pick_surface_format(&formats[..1]).map(|f| f.format),
        Some(vk::Format::B8G8R8A8_SRGB)
    );
    assert!(pick_surface_format(&[]).is_none());
}

#[test]
fn test_present_mode() {
    let all = [
        vk::PresentModeKHR::FIFO,
        vk::PresentModeKHR::MAILBOX,
        vk::PresentModeKHR::IMMEDIATE,
    ];
    assert_eq!(choose_present_mode(&all, true), vk::PresentModeKHR::FIFO);
    assert_eq!(choose_present_mode(&all, false), vk::PresentModeKHR::MAILBOX);
    assert_eq!(
        choose_present_mode(&[vk::PresentModeKHR::FIFO], false),
        vk::PresentModeKHR::FIFO
    );
}
