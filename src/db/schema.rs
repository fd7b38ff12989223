//! SQLite schema and connection setup for the CPG database.
//!
//! The explorer never writes to a production database: graphs are produced
//! by an external CPG builder. The DDL here describes the tables the
//! explorer reads, and [`initialize_database`] creates them so fixture
//! databases (tests, benches, demos) have the same shape.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::config::DatabaseConfig;
use crate::error::{CpgError, Result};

// ---------------------------------------------------------------------------
// Base relations
// ---------------------------------------------------------------------------

const CREATE_NODES: &str = "\
CREATE TABLE IF NOT EXISTS nodes (
  id TEXT PRIMARY KEY,
  kind TEXT NOT NULL,
  name TEXT NOT NULL,
  package TEXT,
  file TEXT,
  line INTEGER,
  end_line INTEGER
)";

// No uniqueness: parallel edges of the same kind are legal.
const CREATE_EDGES: &str = "\
CREATE TABLE IF NOT EXISTS edges (
  source TEXT NOT NULL,
  target TEXT NOT NULL,
  kind TEXT NOT NULL
)";

const CREATE_METRICS: &str = "\
CREATE TABLE IF NOT EXISTS metrics (
  function_id TEXT PRIMARY KEY,
  cyclomatic_complexity INTEGER,
  fan_in INTEGER,
  fan_out INTEGER,
  loc INTEGER,
  num_params INTEGER
)";

const CREATE_SOURCES: &str = "\
CREATE TABLE IF NOT EXISTS sources (
  file TEXT PRIMARY KEY,
  content TEXT NOT NULL,
  package TEXT
)";

// ---------------------------------------------------------------------------
// Precomputed views (materialized as tables by the CPG builder)
// ---------------------------------------------------------------------------

const CREATE_FILE_OUTLINE: &str = "\
CREATE TABLE IF NOT EXISTS file_outline (
  id TEXT NOT NULL,
  file TEXT NOT NULL,
  name TEXT NOT NULL,
  kind TEXT NOT NULL,
  line INTEGER,
  end_line INTEGER
)";

const CREATE_OVERVIEW: &str = "\
CREATE TABLE IF NOT EXISTS dashboard_overview (
  key TEXT PRIMARY KEY,
  value TEXT
)";

const CREATE_PACKAGE_TREEMAP: &str = "\
CREATE TABLE IF NOT EXISTS dashboard_package_treemap (
  package TEXT PRIMARY KEY,
  file_count INTEGER NOT NULL DEFAULT 0,
  function_count INTEGER NOT NULL DEFAULT 0,
  total_loc INTEGER NOT NULL DEFAULT 0,
  total_complexity INTEGER NOT NULL DEFAULT 0,
  avg_complexity REAL NOT NULL DEFAULT 0,
  max_complexity INTEGER NOT NULL DEFAULT 0,
  type_count INTEGER NOT NULL DEFAULT 0,
  interface_count INTEGER NOT NULL DEFAULT 0
)";

// Weighted package → package dependencies.
const CREATE_PACKAGE_GRAPH: &str = "\
CREATE TABLE IF NOT EXISTS dashboard_package_graph (
  source TEXT NOT NULL,
  target TEXT NOT NULL,
  weight INTEGER NOT NULL DEFAULT 0
)";

const CREATE_NODE_DISTRIBUTION: &str = "\
CREATE TABLE IF NOT EXISTS dashboard_node_distribution (
  node_kind TEXT PRIMARY KEY,
  count INTEGER NOT NULL DEFAULT 0,
  percentage REAL
)";

const CREATE_EDGE_DISTRIBUTION: &str = "\
CREATE TABLE IF NOT EXISTS dashboard_edge_distribution (
  edge_kind TEXT PRIMARY KEY,
  count INTEGER NOT NULL DEFAULT 0,
  percentage REAL
)";

const CREATE_COMPLEXITY_DISTRIBUTION: &str = "\
CREATE TABLE IF NOT EXISTS dashboard_complexity_distribution (
  bucket TEXT PRIMARY KEY,
  bucket_min INTEGER NOT NULL DEFAULT 0,
  function_count INTEGER NOT NULL DEFAULT 0
)";

const CREATE_FUNCTION_DETAIL: &str = "\
CREATE TABLE IF NOT EXISTS dashboard_function_detail (
  function_id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  package TEXT,
  file TEXT,
  line INTEGER,
  end_line INTEGER,
  signature TEXT,
  complexity INTEGER NOT NULL DEFAULT 0,
  loc INTEGER NOT NULL DEFAULT 0,
  fan_in INTEGER NOT NULL DEFAULT 0,
  fan_out INTEGER NOT NULL DEFAULT 0,
  num_params INTEGER NOT NULL DEFAULT 0,
  num_locals INTEGER NOT NULL DEFAULT 0,
  num_calls INTEGER NOT NULL DEFAULT 0,
  num_branches INTEGER NOT NULL DEFAULT 0,
  num_returns INTEGER NOT NULL DEFAULT 0,
  finding_count INTEGER NOT NULL DEFAULT 0,
  callers TEXT,
  callees TEXT
)";

const CREATE_HOTSPOTS: &str = "\
CREATE TABLE IF NOT EXISTS dashboard_hotspots (
  function_id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  package TEXT,
  file TEXT,
  complexity INTEGER NOT NULL DEFAULT 0,
  loc INTEGER NOT NULL DEFAULT 0,
  fan_in INTEGER NOT NULL DEFAULT 0,
  fan_out INTEGER NOT NULL DEFAULT 0,
  finding_count INTEGER NOT NULL DEFAULT 0,
  hotspot_score REAL NOT NULL DEFAULT 0
)";

const CREATE_SYMBOL_INDEX: &str = "\
CREATE TABLE IF NOT EXISTS symbol_index (
  id TEXT NOT NULL,
  name TEXT NOT NULL,
  kind TEXT NOT NULL,
  package TEXT,
  file TEXT,
  line INTEGER
)";

// Indexes ----------------------------------------------------------------

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_edges_source_kind ON edges(source, kind)",
    "CREATE INDEX IF NOT EXISTS idx_edges_target_kind ON edges(target, kind)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_kind ON nodes(kind)",
    "CREATE INDEX IF NOT EXISTS idx_nodes_package ON nodes(package)",
    "CREATE INDEX IF NOT EXISTS idx_file_outline_file ON file_outline(file)",
    "CREATE INDEX IF NOT EXISTS idx_symbol_index_name ON symbol_index(name)",
];

const ALL_TABLES: &[&str] = &[
    CREATE_NODES,
    CREATE_EDGES,
    CREATE_METRICS,
    CREATE_SOURCES,
    CREATE_FILE_OUTLINE,
    CREATE_OVERVIEW,
    CREATE_PACKAGE_TREEMAP,
    CREATE_PACKAGE_GRAPH,
    CREATE_NODE_DISTRIBUTION,
    CREATE_EDGE_DISTRIBUTION,
    CREATE_COMPLEXITY_DISTRIBUTION,
    CREATE_FUNCTION_DETAIL,
    CREATE_HOTSPOTS,
    CREATE_SYMBOL_INDEX,
];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Open (or create) a writable database at `db_path` and apply the schema.
///
/// Pass `":memory:"` for an in-memory database.
pub fn initialize_database(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    for ddl in ALL_TABLES.iter().chain(CREATE_INDEXES) {
        conn.execute_batch(ddl)?;
    }
    Ok(conn)
}

/// Open an existing CPG database read-only and apply read-tuning pragmas.
///
/// Pragma failures are logged and ignored; a missing file is a config error.
pub fn open_read_only(db_path: &str, config: &DatabaseConfig) -> Result<Connection> {
    if !Path::new(db_path).is_file() {
        return Err(CpgError::Config(format!("database not found: {db_path}")));
    }

    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let pragmas: [(&str, i64); 2] = [
        ("mmap_size", config.mmap_size),
        ("cache_size", -config.cache_size_kib),
    ];
    for (name, value) in pragmas {
        if let Err(e) = conn.pragma_update(None, name, value) {
            tracing::warn!(pragma = name, error = %e, "pragma failed");
        }
    }
    for (name, value) in [("temp_store", "MEMORY"), ("query_only", "ON")] {
        if let Err(e) = conn.pragma_update(None, name, value) {
            tracing::warn!(pragma = name, error = %e, "pragma failed");
        }
    }

    tracing::info!(path = db_path, "database opened");
    Ok(conn)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
