// SPDX-License-Identifier: CEPL-1.0
//! Shader bytecode supply. Compilation happens outside the render loop:
//! either at build time or ahead of launch into a directory of `.spv` files.
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::ShaderError;

/// Name of the compute program shared by every layer.
pub const COMPUTE_PROGRAM: &str = "update";

const SPIRV_MAGIC: u32 = 0x0723_0203;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Compute,
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn extension(self) -> &'static str {
        match self {
            ShaderStage::Compute => "comp",
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
        }
    }
}

/// Returns SPIR-V for `program` at `stage`, or an empty vector on failure.
pub trait ShaderProvider {
    fn load(&self, program: &str, stage: ShaderStage) -> Vec<u8>;
}

/// Reads `<dir>/<program>.<stage>.spv`.
#[derive(Debug, Clone)]
pub struct SpirvDir {
    dir: PathBuf,
}

impl SpirvDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SpirvDir { dir: dir.into() }
    }

    pub fn path_for(&self, program: &str, stage: ShaderStage) -> PathBuf {
        self.dir
            .join(format!("{program}.{}.spv", stage.extension()))
    }
}

impl ShaderProvider for SpirvDir {
    fn load(&self, program: &str, stage: ShaderStage) -> Vec<u8> {
        let path = self.path_for(program, stage);
        match std::fs::read(&path) {
            Ok(bytes) => {
                debug!("shader {} ({} bytes)", path.display(), bytes.len());
                bytes
            }
            Err(e) => {
                warn!("shader {}: {e}", path.display());
                Vec::new()
            }
        }
    }
}

/// Rejects anything that is obviously not a SPIR-V module.
pub fn check_spirv(program: &str, stage: ShaderStage, bytes: &[u8]) -> Result<(), ShaderError> {
    let malformed = |reason| ShaderError::Malformed {
        program: program.to_owned(),
        stage,
        reason,
    };
    if bytes.is_empty() {
        return Err(ShaderError::Empty {
            program: program.to_owned(),
            stage,
        });
    }
    if bytes.len() % 4 != 0 {
        return Err(malformed("length is not a multiple of 4"));
    }
    if bytes.len() < 20 {
        return Err(malformed("shorter than a SPIR-V header"));
    }
    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != SPIRV_MAGIC {
        return Err(malformed("bad magic number"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct LayerShaders {
    pub program: String,
    pub vertex: Vec<u8>,
    pub fragment: Vec<u8>,
}

/// Every blob the pipeline builder needs, checked up front.
#[derive(Debug, Clone)]
pub struct ShaderSet {
    pub compute: Vec<u8>,
    pub layers: Vec<LayerShaders>,
}

impl ShaderSet {
    pub fn resolve(
        provider: &dyn ShaderProvider,
        programs: &[String],
    ) -> Result<ShaderSet, ShaderError> {
        let load = |program: &str, stage| {
            let bytes = provider.load(program, stage);
            check_spirv(program, stage, &bytes).map(|_| bytes)
        };

        let compute = load(COMPUTE_PROGRAM, ShaderStage::Compute)?;
        let layers = programs
            .iter()
            .map(|program| -> Result<LayerShaders, ShaderError> {
                Ok(LayerShaders {
                    program: program.clone(),
                    vertex: load(program, ShaderStage::Vertex)?,
                    fragment: load(program, ShaderStage::Fragment)?,
                })
            })
            .collect::<Result<Vec<_>, ShaderError>>()?;

        Ok(ShaderSet { compute, layers })
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
