// SPDX-License-Identifier: CEPL-1.0
//! SPIR-V compiled from `shaders/` by the build script.
use strata_render::shader::COMPUTE_PROGRAM;
use strata_render::{ShaderProvider, ShaderStage};
use tracing::warn;

macro_rules! spv {
    ($name:literal) => {
        include_bytes!(concat!(env!("OUT_DIR"), "/", $name, ".spv"))
    };
}

const BUILTIN: &[(&str, ShaderStage, &[u8])] = &[
    (COMPUTE_PROGRAM, ShaderStage::Compute, spv!("update.comp")),
    ("rect", ShaderStage::Vertex, spv!("rect.vert")),
    ("rect", ShaderStage::Fragment, spv!("rect.frag")),
    ("present", ShaderStage::Vertex, spv!("present.vert")),
    ("present", ShaderStage::Fragment, spv!("present.frag")),
];

/// The `update`, `rect` and `present` programs baked into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinShaders;

impl BuiltinShaders {
    pub fn programs() -> impl Iterator<Item = &'static str> {
        let mut names: Vec<_> = BUILTIN.iter().map(|(p, _, _)| *p).collect();
        names.dedup();
        names.into_iter()
    }
}

impl ShaderProvider for BuiltinShaders {
    fn load(&self, program: &str, stage: ShaderStage) -> Vec<u8> {
        match BUILTIN
            .iter()
            .find(|(p, s, _)| *p == program && *s == stage)
        {
            Some((_, _, bytes)) => bytes.to_vec(),
            None => {
                warn!("no built-in shader `{program}` for {stage:?}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_render::shader::check_spirv;

    #[test]
    fn test_builtin_blobs_are_spirv() {
        for &(program, stage, _) in BUILTIN {
            let bytes = BuiltinShaders.load(program, stage);
            assert!(check_spirv(program, stage, &bytes).is_ok(), "{program} {stage:?}");
        }
    }

    #[test]
    fn test_unknown_program_is_empty() {
        assert!(BuiltinShaders.load("missing", ShaderStage::Vertex).is_empty());
        assert!(BuiltinShaders.load("rect", ShaderStage::Compute).is_empty());
    }

    #[test]
    fn test_program_names() {
        let names: Vec<_> = BuiltinShaders::programs().collect();
        assert_eq!(names, vec![COMPUTE_PROGRAM, "rect", "present"]);
    }
}
