//! Multi-source configuration loading.
//!
//! Priority, lowest to highest:
//! 1. built-in defaults
//! 2. user config (`<config dir>/cpg-explorer/config.yaml`)
//! 3. project config (`<project root>/.cpg-explorer.yaml`)
//! 4. an explicit `--config` file
//! 5. environment (`CPG_EXPLORER_DB`, `CPG_EXPLORER_ADDR`)
//!
//! CLI flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde_yaml::Value;

use crate::error::{CpgError, Result};

use super::schema::ExplorerConfig;

pub const PROJECT_CONFIG_FILE: &str = ".cpg-explorer.yaml";
pub const ENV_DB_PATH: &str = "CPG_EXPLORER_DB";
pub const ENV_ADDR: &str = "CPG_EXPLORER_ADDR";

/// Load configuration from every source, merged by priority.
///
/// A missing explicit file is an error; missing user or project files are
/// silently skipped.
pub fn load_config(explicit: Option<&Path>, project_root: Option<&Path>) -> Result<ExplorerConfig> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(CpgError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
    }

    let mut layers: Vec<PathBuf> = Vec::new();
    if let Some(user) = user_config_path() {
        layers.push(user);
    }
    if let Some(root) = project_root {
        layers.push(root.join(PROJECT_CONFIG_FILE));
    }
    if let Some(path) = explicit {
        layers.push(path.to_path_buf());
    }

    let mut config = load_layers(&layers)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Merge the YAML files that exist among `paths` (later wins) over the defaults.
pub fn load_layers(paths: &[PathBuf]) -> Result<ExplorerConfig> {
    let mut merged = serde_yaml::to_value(ExplorerConfig::default())?;
    for path in paths.iter().filter(|p| p.is_file()) {
        let text = std::fs::read_to_string(path)?;
        let layer: Value = serde_yaml::from_str(&text)?;
        tracing::debug!(path = %path.display(), "applying config layer");
        merge_values(&mut merged, layer);
    }
    Ok(serde_yaml::from_value(merged)?)
}

/// Apply environment overrides using `lookup` (injected for testability).
pub fn apply_env_overrides(config: &mut ExplorerConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(path) = lookup(ENV_DB_PATH).filter(|v| !v.is_empty()) {
        config.database.path = path;
    }
    if let Some(addr) = lookup(ENV_ADDR).filter(|v| !v.is_empty()) {
        config.server.addr = addr;
    }
}

fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cpg-explorer").map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Recursively merge `overlay` into `base`. Mappings merge key by key;
/// everything else (scalars, sequences) is replaced. A null overlay is ignored.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (slot, value) => *slot = value,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
