//! CPG Explorer: a read-only query surface over a precomputed code property
//! graph stored in SQLite.
//!
//! The core is a bounded breadth-first traversal ([`graph::traversal`]) used
//! for call-graph and data-flow neighborhoods ([`graph::profile`]). Around it
//! sit the SQLite store, an axum HTTP API and layered YAML configuration.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod observability;
pub mod types;
