//! Row → domain type conversion.
//!
//! Queries feeding these converters alias their columns to the names read
//! here and `COALESCE` nullable columns, so a NULL package or line comes back
//! as `""` / `0` rather than an error.

use rusqlite::Row;

use crate::types::{FunctionMetrics, GraphNode, NodeKind};

/// Read an integer column as `u32`, mapping negatives and overflow to 0.
pub fn get_u32(row: &Row<'_>, column: &str) -> rusqlite::Result<u32> {
    let value: i64 = row.get(column)?;
    Ok(u32::try_from(value).unwrap_or(0))
}

/// Convert a row with `id, kind, name, package, file, line` into a node
/// without metrics.
pub fn row_to_graph_node(row: &Row<'_>) -> rusqlite::Result<GraphNode> {
    let kind: String = row.get("kind")?;
    Ok(GraphNode {
        id: row.get("id")?,
        kind: NodeKind::from_db(&kind),
        label: row.get("name")?,
        package: row.get("package")?,
        file: row.get("file")?,
        line: get_u32(row, "line")?,
        metrics: None,
    })
}

/// Like [`row_to_graph_node`] but also reads `complexity, fan_in, fan_out`.
pub fn row_to_function_node(row: &Row<'_>) -> rusqlite::Result<GraphNode> {
    let mut node = row_to_graph_node(row)?;
    node.metrics = Some(FunctionMetrics {
        complexity: get_u32(row, "complexity")?,
        fan_in: get_u32(row, "fan_in")?,
        fan_out: get_u32(row, "fan_out")?,
    });
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    const NODE_SQL: &str = "SELECT 'f1' AS id, 'function' AS kind, 'main' AS name, \
        '' AS package, 'main.go' AS file, ?1 AS line, 7 AS complexity, 0 AS fan_in, 3 AS fan_out";

    #[test]
    fn converts_node_without_metrics() {
        let conn = Connection::open_in_memory().unwrap();
        let node = conn
            .query_row(NODE_SQL, [12], |row| row_to_graph_node(row))
            .unwrap();
        assert_eq!(node.id, "f1");
        assert_eq!(node.kind, NodeKind::Function);
        assert_eq!(node.label, "main");
        assert_eq!(node.line, 12);
        assert!(node.metrics.is_none());
    }

    #[test]
    fn converts_node_with_metrics() {
        let conn = Connection::open_in_memory().unwrap();
        let node = conn
            .query_row(NODE_SQL, [1], |row| row_to_function_node(row))
            .unwrap();
        assert_eq!(
            node.metrics,
            Some(FunctionMetrics {
                complexity: 7,
                fan_in: 0,
                fan_out: 3
            })
        );
    }

    #[test]
    fn negative_line_maps_to_zero() {
        let conn = Connection::open_in_memory().unwrap();
        let node = conn
            .query_row(NODE_SQL, [-4], |row| row_to_graph_node(row))
            .unwrap();
        assert_eq!(node.line, 0);
    }
}
