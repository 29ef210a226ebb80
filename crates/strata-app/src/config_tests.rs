//! Unit tests for the demo configuration file
//!
//! Parsing only; no window or device involved.

use super::*;

// ============================================================================
// DEFAULTS
// ============================================================================

#[test]
fn test_empty_file_is_default() {
    let cfg = parse_cfg("").unwrap();
    assert_eq!(cfg, AppCfg::default());
    assert_eq!(cfg.window.width, 1024);
    assert_eq!(cfg.window.height, 768);
}

#[test]
fn test_missing_file_is_default() {
    let cfg = load_cfg(Path::new("/nonexistent/strata.toml"));
    assert_eq!(cfg, AppCfg::default());
}

// ============================================================================
// SECTIONS
// ============================================================================

#[test]
fn test_partial_sections_keep_other_defaults() {
    let cfg = parse_cfg(
        r#"
[window]
title = "layers"

[context]
frame_fifo_max = 3
layer_max = 2
vsync = false

[demo]
seed = 7
"#,
    )
    .unwrap();
    assert_eq!(cfg.window.title, "layers");
    assert_eq!(cfg.window.width, 1024);
    assert_eq!(cfg.context.frame_fifo_max, 3);
    assert_eq!(cfg.context.layer_max, 2);
    assert!(!cfg.context.vsync);
    assert_eq!(
        cfg.context.object_max,
        ContextConfig::default().object_max
    );
    assert_eq!(cfg.demo.seed, 7);
    assert_eq!(
        cfg.demo.objects_per_layer,
        DemoCfg::default().objects_per_layer
    );
}

#[test]
fn test_layer_programs_list() {
    let cfg = parse_cfg(
        r#"
[context]
layer_max = 2
layer_programs = ["rect", "present"]
"#,
    )
    .unwrap();
    assert_eq!(
        cfg.context.layer_programs,
        Some(vec!["rect".to_string(), "present".to_string()])
    );
}

#[test]
fn test_malformed_is_error() {
    assert!(parse_cfg("[window]\nwidth = \"wide\"").is_err());
    assert!(parse_cfg("[context").is_err());
}
