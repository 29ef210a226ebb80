//! Unit tests for context configuration
//!
//! Covers defaults, TOML parsing with partial tables, and validation.

use super::*;

fn limits() -> DeviceLimits {
    DeviceLimits {
        max_compute_work_group_count_x: 65535,
        max_image_dimension_2d: 16384,
        min_storage_buffer_offset_alignment: 16,
        min_uniform_buffer_offset_alignment: 256,
        linear_blit: true,
    }
}

// ============================================================================
// DEFAULTS
// ============================================================================

#[test]
fn test_defaults_validate() {
    let cfg = ContextConfig::default();
    assert_eq!(cfg.frame_fifo_max, 2);
    assert_eq!((cfg.sprite_width, cfg.sprite_height), (640, 480));
    assert_eq!(cfg.layer_max, 4);
    assert!(cfg.validate().is_ok());
    assert!(cfg.validate_for_device(&limits()).is_ok());
}

#[test]
fn test_default_programs_end_with_present() {
    let cfg = ContextConfig::default();
    assert_eq!(cfg.programs(), vec!["rect", "rect", "rect", "present"]);

    let single = ContextConfig {
        layer_max: 1,
        ..Default::default()
    };
    assert_eq!(single.programs(), vec!["present"]);
}

#[test]
fn test_derived_sizes() {
    let cfg = ContextConfig {
        object_max: 10,
        layer_max: 3,
        ..Default::default()
    };
    assert_eq!(cfg.object_buffer_bytes(), 10 * 96);
    assert_eq!(cfg.vertex_buffer_bytes(), 10 * 6 * 64);
    assert_eq!(cfg.indirect_buffer_bytes(), 3 * 16);
    assert_eq!(cfg.vertex_capacity(), 60);
}

// ============================================================================
// TOML
// ============================================================================

#[test]
fn test_partial_toml_keeps_defaults() {
    let cfg: ContextConfig = toml::from_str(
        r#"
        frame_fifo_max = 3
        layer_max = 2
        clear_color = [0.1, 0.2, 0.3, 1.0]
        "#,
    )
    .unwrap();
    assert_eq!(cfg.frame_fifo_max, 3);
    assert_eq!(cfg.layer_max, 2);
    assert_eq!(cfg.object_max, 4096);
    assert_eq!(cfg.clear_color, [0.1, 0.2, 0.3, 1.0]);
    assert!(cfg.layer_programs.is_none());
}

#[test]
fn test_toml_layer_programs() {
    let cfg: ContextConfig = toml::from_str(
        r#"
        layer_max = 2
        layer_programs = ["rect", "present"]
        "#,
    )
    .unwrap();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.programs(), vec!["rect", "present"]);
}

// ============================================================================
// VALIDATION
// ============================================================================

#[test]
fn test_zero_counts_rejected() {
    let cfg = ContextConfig {
        layer_max: 0,
        ..Default::default()
    };
    assert_eq!(cfg.validate(), Err(ConfigError::Zero("layer_max")));

    let cfg = ContextConfig {
        fence_timeout_ms: 0,
        ..Default::default()
    };
    assert_eq!(cfg.validate(), Err(ConfigError::Zero("fence_timeout_ms")));
}

#[test]
fn test_too_many_slots_rejected() {
    let cfg = ContextConfig {
        frame_fifo_max: 9,
        ..Default::default()
    };
    assert_eq!(
        cfg.validate(),
        Err(ConfigError::TooManySlots {
            requested: 9,
            max: MAX_FRAME_FIFO
        })
    );
}

#[test]
fn test_program_count_mismatch_rejected() {
    let cfg = ContextConfig {
        layer_programs: Some(vec!["rect".into()]),
        ..Default::default()
    };
    assert_eq!(
        cfg.validate(),
        Err(ConfigError::LayerPrograms {
            expected: 4,
            got: 1
        })
    );
}

#[test]
fn test_device_limits() {
    let cfg = ContextConfig {
        object_max: 70000,
        ..Default::default()
    };
    assert!(matches!(
        cfg.validate_for_device(&limits()),
        Err(ConfigError::ObjectMaxExceedsDispatch { .. })
    ));

    let cfg = ContextConfig {
        sprite_width: 20000,
        ..Default::default()
    };
    assert!(matches!(
        cfg.validate_for_device(&limits()),
        Err(ConfigError::SpriteTooLarge { limit: 16384, .. })
    ));
}
