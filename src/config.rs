//! Engine configuration.
//!
//! Settings live in `config.json` under the platform config directory. A missing file
//! means defaults; unknown or absent keys fall back to their default values.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunables for running pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows kept by [`Pipeline::preview_default`](crate::pipeline::Pipeline::preview_default)
    pub preview_row_limit: usize,
    /// Row warnings kept per step; the rest are only counted
    pub max_warnings_per_step: usize,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    pub log_to_file: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preview_row_limit: 5,
            max_warnings_per_step: 100,
            log_level: "info".to_owned(),
            log_to_file: true,
        }
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join("sheetflow").join("config.json"))
}

pub fn load_config() -> Result<EngineConfig> {
    load_config_from(&get_config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn save_config(config: &EngineConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
