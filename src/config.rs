use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::effects::ParamInput;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub effect: Option<String>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub params: BTreeMap<String, ParamInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match parse_config(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

/// `./shaderlab.toml`, then `<config dir>/shaderlab/config.toml`.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("shaderlab.toml");
    if local.exists() {
        return Some(local);
    }
    let platform = dirs::config_dir()?.join("shaderlab").join("config.toml");
    platform.exists().then_some(platform)
}
