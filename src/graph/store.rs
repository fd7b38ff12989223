//! Read-only SQLite access to the code property graph.
//!
//! Every query goes through [`Connection::prepare_cached`], so the first
//! call compiles the statement and later calls reuse it from the
//! connection's statement cache. A `GraphStore` owns one connection and is
//! not shared across threads; see [`crate::graph::pool::StorePool`].

use rusqlite::{params, Connection, Row};

use crate::config::DatabaseConfig;
use crate::db::converters::{row_to_function_node, row_to_graph_node};
use crate::db::schema::open_read_only;
use crate::error::Result;
use crate::graph::traversal::{NeighborQuery, NodeStore};
use crate::types::{GraphNode, Step};

/// Typed read wrapper around one CPG database connection.
pub struct GraphStore {
    pub conn: Connection,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SQL constants
// ---------------------------------------------------------------------------

const NODE_COLUMNS: &str = "n.id AS id, n.kind AS kind, n.name AS name, \
    COALESCE(n.package, '') AS package, COALESCE(n.file, '') AS file, \
    COALESCE(n.line, 0) AS line, \
    COALESCE(m.cyclomatic_complexity, 0) AS complexity, \
    COALESCE(m.fan_in, 0) AS fan_in, COALESCE(m.fan_out, 0) AS fan_out";

fn get_node_sql() -> String {
    format!(
        "SELECT {NODE_COLUMNS} FROM nodes n \
         LEFT JOIN metrics m ON m.function_id = n.id \
         WHERE n.id = ?1"
    )
}

// ?3 is the optional node-kind filter, ?4 the neighbor cap.
fn neighbors_sql(step: Step) -> String {
    let (join_col, match_col) = match step {
        Step::Outgoing => ("e.target", "e.source"),
        Step::Incoming => ("e.source", "e.target"),
    };
    format!(
        "SELECT {NODE_COLUMNS} FROM edges e \
         JOIN nodes n ON n.id = {join_col} \
         LEFT JOIN metrics m ON m.function_id = n.id \
         WHERE {match_col} = ?1 AND e.kind = ?2 AND (?3 IS NULL OR n.kind = ?3) \
         LIMIT ?4"
    )
}

fn converter(with_metrics: bool) -> fn(&Row<'_>) -> rusqlite::Result<GraphNode> {
    if with_metrics {
        row_to_function_node
    } else {
        row_to_graph_node
    }
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

impl GraphStore {
    /// Open an existing CPG database read-only.
    pub fn open(db_path: &str, config: &DatabaseConfig) -> Result<Self> {
        Ok(Self {
            conn: open_read_only(db_path, config)?,
        })
    }

    /// Wrap an already-open connection. Useful in tests where the caller
    /// has already called `initialize_database(":memory:")`.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl NodeStore for GraphStore {
    fn get_node(&self, id: &str, with_metrics: bool) -> Result<Option<GraphNode>> {
        let mut stmt = self.conn.prepare_cached(&get_node_sql())?;
        let mut rows = stmt.query_and_then(params![id], converter(with_metrics))?;
        match rows.next() {
            Some(Ok(node)) => Ok(Some(node)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    fn get_neighbors(&self, id: &str, query: &NeighborQuery<'_>) -> Result<Vec<GraphNode>> {
        let mut stmt = self.conn.prepare_cached(&neighbors_sql(query.step))?;
        let cap = i64::try_from(query.cap).unwrap_or(i64::MAX);
        let rows = stmt.query_and_then(
            params![
                id,
                query.edge_kind.as_str(),
                query.node_kind.map(|k| k.as_str()),
                cap
            ],
            converter(query.with_metrics),
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
