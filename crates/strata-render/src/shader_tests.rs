//! Unit tests for shader lookup and bytecode checks

use super::*;
use std::collections::HashMap;

fn fake_spirv(words: usize) -> Vec<u8> {
    let mut v = SPIRV_MAGIC.to_le_bytes().to_vec();
    v.resize(words.max(5) * 4, 0);
    v
}

struct MapProvider(HashMap<(String, ShaderStage), Vec<u8>>);

impl MapProvider {
    fn with(entries: &[(&str, ShaderStage)]) -> Self {
        MapProvider(
            entries
                .iter()
                .map(|(p, s)| ((p.to_string(), *s), fake_spirv(8)))
                .collect(),
        )
    }
}

impl ShaderProvider for MapProvider {
    fn load(&self, program: &str, stage: ShaderStage) -> Vec<u8> {
        self.0
            .get(&(program.to_owned(), stage))
            .cloned()
            .unwrap_or_default()
    }
}

// ============================================================================
// BYTECODE CHECKS
// ============================================================================

#[test]
fn test_check_spirv_accepts_header() {
    assert!(check_spirv("rect", ShaderStage::Vertex, &fake_spirv(5)).is_ok());
}

#[test]
fn test_check_spirv_rejects_empty() {
    assert_eq!(
        check_spirv("rect", ShaderStage::Fragment, &[]),
        Err(ShaderError::Empty {
            program: "rect".into(),
            stage: ShaderStage::Fragment
        })
    );
}

#[test]
fn test_check_spirv_rejects_garbage() {
    assert!(matches!(
        check_spirv("rect", ShaderStage::Vertex, &[1, 2, 3]),
        Err(ShaderError::Malformed { .. })
    ));
    assert!(matches!(
        check_spirv("rect", ShaderStage::Vertex, &[0u8; 20]),
        Err(ShaderError::Malformed {
            reason: "bad magic number",
            ..
        })
    ));
}

// ============================================================================
// RESOLUTION
// ============================================================================

#[test]
fn test_resolve_collects_one_pair_per_layer() {
    let provider = MapProvider::with(&[
        ("update", ShaderStage::Compute),
        ("rect", ShaderStage::Vertex),
        ("rect", ShaderStage::Fragment),
        ("present", ShaderStage::Vertex),
        ("present", ShaderStage::Fragment),
    ]);
    let programs: Vec<String> = ["rect", "rect", "present"].map(String::from).to_vec();
    let set = ShaderSet::resolve(&provider, &programs).unwrap();
    assert_eq!(set.layers.len(), 3);
    assert_eq!(set.layers[2].program, "present");
    assert!(!set.compute.is_empty());
}

#[test]
fn test_resolve_names_missing_blob() {
    let provider = MapProvider::with(&[
        ("update", ShaderStage::Compute),
        ("rect", ShaderStage::Vertex),
    ]);
    let err = ShaderSet::resolve(&provider, &["rect".to_string()]).unwrap_err();
    assert_eq!(
        err,
        ShaderError::Empty {
            program: "rect".into(),
            stage: ShaderStage::Fragment
        }
    );
}

#[test]
fn test_spirv_dir_paths_and_missing_file() {
    let dir = SpirvDir::new("/nonexistent/strata");
    assert_eq!(
        dir.path_for("rect", ShaderStage::Vertex),
        PathBuf::from("/nonexistent/strata/rect.vert.spv")
    );
    assert!(dir.load("rect", ShaderStage::Vertex).is_empty());
}
