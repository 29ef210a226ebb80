//! Unit tests for frame resource block planning

use super::*;

fn limits() -> DeviceLimits {
    DeviceLimits {
        max_compute_work_group_count_x: 65535,
        max_image_dimension_2d: 16384,
        min_storage_buffer_offset_alignment: 64,
        min_uniform_buffer_offset_alignment: 256,
        linear_blit: true,
    }
}

fn plan(cfg: &ContextConfig) -> Result<FrameLayout, AllocError> {
    FrameLayout::plan(cfg, &ResourceRequirements::estimate(cfg, &limits()))
}

// ============================================================================
// SHAPE
// ============================================================================

#[test]
fn test_two_slots_four_layers_gives_eight_resources() {
    let cfg = ContextConfig::default();
    let layout = plan(&cfg).unwrap();
    assert_eq!(layout.slots.len(), 2);
    assert_eq!(layout.layer_count(), 8);
}

#[test]
fn test_layer_regions_do_not_alias() {
    let cfg = ContextConfig::default();
    let layout = plan(&cfg).unwrap();

    for slot in &layout.slots {
        for (i, a) in slot.layers.iter().enumerate() {
            assert!(a.object.end() <= slot.host_capacity);
            assert!(a.vertex.end() <= slot.vertex_capacity);
            assert!(a.object.size >= cfg.object_buffer_bytes());
            assert!(a.vertex.size >= cfg.vertex_buffer_bytes());
            for b in &slot.layers[i + 1..] {
                assert!(!a.object.overlaps(&b.object));
                assert!(!a.vertex.overlaps(&b.vertex));
            }
        }
    }

    // Images share one block across every slot.
    let images: Vec<_> = layout
        .slots
        .iter()
        .flat_map(|s| s.layers.iter().map(|l| l.image))
        .collect();
    assert_eq!(images.len(), 8);
    for (i, a) in images.iter().enumerate() {
        assert!(a.end() <= layout.image_used);
        for b in &images[i + 1..] {
            assert!(!a.overlaps(b));
        }
    }
    assert!(layout.image_used <= layout.image_capacity);
}

#[test]
fn test_control_block_holds_indirect_and_uniforms() {
    let cfg = ContextConfig::default();
    let layout = plan(&cfg).unwrap();
    let s = &layout.slots[0];
    assert_eq!(s.indirect.offset, 0);
    assert_eq!(s.indirect.size, 4 * 16);
    assert_eq!(s.uniforms.offset % 256, 0);
    assert!(!s.indirect.overlaps(&s.uniforms));
    assert_eq!(s.uniforms.end(), s.control_capacity);
}

#[test]
fn test_storage_alignment_respected() {
    let cfg = ContextConfig {
        object_max: 3,
        ..Default::default()
    };
    let layout = plan(&cfg).unwrap();
    for l in &layout.slots[1].layers {
        assert_eq!(l.object.offset % 64, 0);
        assert_eq!(l.vertex.offset % 64, 0);
    }
}

// ============================================================================
// BUDGET
// ============================================================================

#[test]
fn test_image_budget_exceeded_fails_before_allocation() {
    let cfg = ContextConfig {
        gpu_memory_max: 1024 * 1024,
        ..Default::default()
    };
    let err = plan(&cfg).unwrap_err();
    match err {
        AllocError::ImageBudget { required, budget } => {
            assert_eq!(budget, 1024 * 1024);
            assert!(required >= 8 * 640 * 480 * 4);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_budget_exactly_fits() {
    let mut cfg = ContextConfig {
        sprite_width: 64,
        sprite_height: 64,
        ..Default::default()
    };
    // 64*64*4 = 16 KiB per image, already 4 KiB aligned.
    cfg.gpu_memory_max = 8 * 16 * 1024;
    let layout = plan(&cfg).unwrap();
    assert_eq!(layout.image_used, cfg.gpu_memory_max);
}
