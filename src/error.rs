//! Crate-wide error type.

use thiserror::Error;

/// Errors surfaced by the store, the traversal engine and configuration loading.
///
/// Neighbor-fetch failures during expansion never show up here: the engine
/// logs them and carries on with a smaller subgraph.
#[derive(Debug, Error)]
pub enum CpgError {
    /// Missing or malformed request input, rejected before touching the store.
    #[error("{0}")]
    InvalidInput(String),

    /// The requested entity does not exist. Carries the subject noun
    /// (`"function"`, `"node"`, `"file"`).
    #[error("{0} not found")]
    NotFound(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CpgError>;
