//! Writers for building small graph databases.
//!
//! Production graphs come from an external CPG builder; these helpers
//! exist so tests, benches and local demos can assemble a database with the
//! same schema. Call [`crate::db::schema::initialize_database`] first.

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::types::{EdgeKind, GraphNode};

const INSERT_NODE_SQL: &str = "\
INSERT OR REPLACE INTO nodes (id, kind, name, package, file, line)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const INSERT_METRICS_SQL: &str = "\
INSERT OR REPLACE INTO metrics (function_id, cyclomatic_complexity, fan_in, fan_out)
VALUES (?1, ?2, ?3, ?4)";

const INSERT_EDGE_SQL: &str = "\
INSERT INTO edges (source, target, kind) VALUES (?1, ?2, ?3)";

/// Insert a node, plus its `metrics` row when the node carries metrics.
pub fn insert_node(conn: &Connection, node: &GraphNode) -> Result<()> {
    conn.prepare_cached(INSERT_NODE_SQL)?.execute(params![
        node.id,
        node.kind.as_str(),
        node.label,
        node.package,
        node.file,
        node.line,
    ])?;
    if let Some(m) = node.metrics {
        conn.prepare_cached(INSERT_METRICS_SQL)?
            .execute(params![node.id, m.complexity, m.fan_in, m.fan_out])?;
    }
    Ok(())
}

/// Insert many nodes in one transaction.
pub fn insert_nodes(conn: &mut Connection, nodes: &[GraphNode]) -> Result<()> {
    let tx = conn.transaction()?;
    for node in nodes {
        insert_node(&tx, node)?;
    }
    tx.commit()?;
    Ok(())
}

/// Append one directed edge. Duplicates are kept.
pub fn insert_edge(conn: &Connection, source: &str, target: &str, kind: EdgeKind) -> Result<()> {
    conn.prepare_cached(INSERT_EDGE_SQL)?
        .execute(params![source, target, kind.as_str()])?;
    Ok(())
}

/// Insert many edges in one transaction.
pub fn insert_edges(conn: &mut Connection, edges: &[(&str, &str, EdgeKind)]) -> Result<()> {
    let tx = conn.transaction()?;
    for (source, target, kind) in edges {
        insert_edge(&tx, source, target, *kind)?;
    }
    tx.commit()?;
    Ok(())
}
