// SPDX-License-Identifier: CEPL-1.0
use serde::Deserialize;
use std::fs;
use std::path::Path;
use strata_render::ContextConfig;
use tracing::{error, info};

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WindowCfg {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowCfg {
    fn default() -> Self {
        WindowCfg {
            width: 1024,
            height: 768,
            title: "strata".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DemoCfg {
    pub objects_per_layer: u32,
    pub seed: u64,
}

impl Default for DemoCfg {
    fn default() -> Self {
        DemoCfg {
            objects_per_layer: 256,
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct AppCfg {
    pub window: WindowCfg,
    pub context: ContextConfig,
    pub demo: DemoCfg,
}

pub fn parse_cfg(text: &str) -> Result<AppCfg, toml::de::Error> {
    toml::from_str::<AppCfg>(text)
}

/// Missing file gives defaults; a malformed one is logged and also gives defaults.
pub fn load_cfg(path: &Path) -> AppCfg {
    match fs::read_to_string(path) {
        Ok(s) => match parse_cfg(&s) {
            Ok(cfg) => {
                info!("config loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                error!("{}: {e}; using defaults", path.display());
                AppCfg::default()
            }
        },
        Err(_) => {
            info!("{} not found, using defaults", path.display());
            AppCfg::default()
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
