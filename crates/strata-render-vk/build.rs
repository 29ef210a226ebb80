// SPDX-License-Identifier: CEPL-1.0
use std::{env, fs, path::PathBuf};

/// (source file, stage) for every built-in program. Output lands in
/// OUT_DIR as `<source>.spv`, e.g. `rect.vert.spv`.
const SHADERS: &[(&str, shaderc::ShaderKind)] = &[
    ("update.comp", shaderc::ShaderKind::Compute),
    ("rect.vert", shaderc::ShaderKind::Vertex),
    ("rect.frag", shaderc::ShaderKind::Fragment),
    ("present.vert", shaderc::ShaderKind::Vertex),
    ("present.frag", shaderc::ShaderKind::Fragment),
];

const INCLUDES: &[&str] = &["common.glsl", "sampling.glsl"];

fn main() {
    let out = PathBuf::from(env::var("OUT_DIR").unwrap());
    let src_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap()).join("shaders");

    let comp = shaderc::Compiler::new().unwrap();
    let mut opts = shaderc::CompileOptions::new().unwrap();

    // Context is created against Vulkan 1.1.
    opts.set_target_env(
        shaderc::TargetEnv::Vulkan,
        shaderc::EnvVersion::Vulkan1_1 as u32,
    );
    opts.set_optimization_level(shaderc::OptimizationLevel::Performance);

    let include_dir = src_dir.clone();
    opts.set_include_callback(move |name, _ty, _from, _depth| {
        let path = include_dir.join(name);
        fs::read_to_string(&path)
            .map(|content| shaderc::ResolvedInclude {
                resolved_name: path.display().to_string(),
                content,
            })
            .map_err(|e| format!("{}: {e}", path.display()))
    });

    for &(file, kind) in SHADERS {
        let path = src_dir.join(file);
        let source = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("{}: {e}", path.display()));
        let spv = comp
            .compile_into_spirv(&source, kind, file, "main", Some(&opts))
            .unwrap_or_else(|e| panic!("{file}: {e}"));
        if spv.get_num_warnings() > 0 {
            println!("cargo:warning={file}: {}", spv.get_warning_messages());
        }
        fs::write(out.join(format!("{file}.spv")), spv.as_binary_u8()).unwrap();
        println!("cargo:rerun-if-changed=shaders/{file}");
    }
    for file in INCLUDES {
        println!("cargo:rerun-if-changed=shaders/{file}");
    }
    println!("cargo:rerun-if-changed=build.rs");
}
