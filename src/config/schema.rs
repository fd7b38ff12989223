//! Configuration data structures for the CPG explorer.
//!
//! Defines the YAML config format: where the graph database lives, how many
//! read-only connections to keep, and where the HTTP server listens.
//! Traversal caps and depth ranges are deliberately absent; they are fixed
//! per call site in [`crate::graph::profile`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
///
/// Loaded from YAML files, environment variables, and CLI flags.
/// Multiple sources are merged with well-defined priority (see
/// [`crate::config::loader`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP API binds to.
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

/// Read-only SQLite connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the precomputed CPG database.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Number of pooled read-only connections. Values below 1 are treated as 1.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// `PRAGMA mmap_size` in bytes.
    #[serde(default = "default_mmap_size")]
    pub mmap_size: i64,

    /// Page cache size in KiB (applied as a negative `PRAGMA cache_size`).
    #[serde(default = "default_cache_size_kib")]
    pub cache_size_kib: i64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            mmap_size: default_mmap_size(),
            cache_size_kib: default_cache_size_kib(),
        }
    }
}

impl DatabaseConfig {
    /// Pool size with the lower bound applied.
    pub fn pool_size(&self) -> usize {
        self.max_connections.max(1)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_db_path() -> String {
    "cpg.db".to_string()
}

fn default_max_connections() -> usize {
    8
}

fn default_mmap_size() -> i64 {
    512 * 1024 * 1024
}

fn default_cache_size_kib() -> i64 {
    128_000
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ExplorerConfig::default();
        assert_eq!(config.server.addr, "127.0.0.1:8080");
        assert_eq!(config.database.path, "cpg.db");
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.database.mmap_size, 536_870_912);
        assert_eq!(config.database.cache_size_kib, 128_000);
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        let config: ExplorerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ExplorerConfig::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = "database:\n  path: /data/cpg.db\n";
        let config: ExplorerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.database.path, "/data/cpg.db");
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.server.addr, "127.0.0.1:8080");
    }

    #[test]
    fn pool_size_never_drops_below_one() {
        let db = DatabaseConfig {
            max_connections: 0,
            ..DatabaseConfig::default()
        };
        assert_eq!(db.pool_size(), 1);
    }

    #[test]
    fn config_serializes_to_yaml_and_back() {
        let mut config = ExplorerConfig::default();
        config.server.addr = "0.0.0.0:9000".to_string();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: ExplorerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
    }
}
