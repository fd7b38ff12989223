//! Graph layer: SQLite-backed store, bounded traversal, and catalog queries.

pub mod catalog;
pub mod pool;
pub mod profile;
pub mod store;
pub mod traversal;
