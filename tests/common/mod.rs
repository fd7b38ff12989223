//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use cpg_explorer::db::fixture::{insert_edges, insert_nodes};
use cpg_explorer::db::schema::initialize_database;
use cpg_explorer::error::{CpgError, Result};
use cpg_explorer::graph::store::GraphStore;
use cpg_explorer::graph::traversal::{NeighborQuery, NodeStore};
use cpg_explorer::types::{EdgeKind, FunctionMetrics, GraphNode, NodeKind, Step};

// ---------------------------------------------------------------------------
// Node builders
// ---------------------------------------------------------------------------

pub fn function(id: &str) -> GraphNode {
    GraphNode {
        id: id.to_string(),
        kind: NodeKind::Function,
        label: id.to_string(),
        package: "pkg".to_string(),
        file: "pkg/a.go".to_string(),
        line: 1,
        metrics: Some(FunctionMetrics {
            complexity: 1,
            fan_in: 0,
            fan_out: 0,
        }),
    }
}

pub fn variable(id: &str) -> GraphNode {
    GraphNode {
        id: id.to_string(),
        kind: NodeKind::Variable,
        label: id.to_string(),
        package: "pkg".to_string(),
        file: "pkg/a.go".to_string(),
        line: 1,
        metrics: None,
    }
}

/// Build an in-memory SQLite store holding `nodes` and `edges`.
pub fn sqlite_store(nodes: &[GraphNode], edges: &[(&str, &str, EdgeKind)]) -> GraphStore {
    let mut conn = initialize_database(":memory:").unwrap();
    insert_nodes(&mut conn, nodes).unwrap();
    insert_edges(&mut conn, edges).unwrap();
    GraphStore::from_connection(conn)
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Hash-map backed [`NodeStore`] with per-node failure injection.
///
/// Neighbors come back in edge insertion order, so permuting the edge list
/// permutes every neighbor list.
#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: HashMap<String, GraphNode>,
    edges: Vec<(String, String, EdgeKind)>,
    /// Neighbor fetches for these ids fail.
    failing: HashSet<String>,
    pub neighbor_calls: Cell<usize>,
}

impl MemoryStore {
    pub fn new(nodes: Vec<GraphNode>, edges: &[(&str, &str, EdgeKind)]) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
            edges: edges
                .iter()
                .map(|(s, t, k)| (s.to_string(), t.to_string(), *k))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    fn project(node: &GraphNode, with_metrics: bool) -> GraphNode {
        let mut node = node.clone();
        node.metrics = if with_metrics {
            Some(node.metrics.unwrap_or_default())
        } else {
            None
        };
        node
    }
}

impl NodeStore for MemoryStore {
    fn get_node(&self, id: &str, with_metrics: bool) -> Result<Option<GraphNode>> {
        Ok(self.nodes.get(id).map(|n| Self::project(n, with_metrics)))
    }

    fn get_neighbors(&self, id: &str, query: &NeighborQuery<'_>) -> Result<Vec<GraphNode>> {
        self.neighbor_calls.set(self.neighbor_calls.get() + 1);
        if self.failing.contains(id) {
            return Err(CpgError::Io(std::io::Error::other("injected failure")));
        }

        let mut found: Vec<GraphNode> = self
            .edges
            .iter()
            .filter(|(_, _, kind)| *kind == query.edge_kind)
            .filter_map(|(source, target, _)| match query.step {
                Step::Outgoing if source == id => Some(target),
                Step::Incoming if target == id => Some(source),
                _ => None,
            })
            .filter_map(|other| self.nodes.get(other))
            .filter(|n| query.node_kind.map_or(true, |k| &n.kind == k))
            .map(|n| Self::project(n, query.with_metrics))
            .collect();

        found.truncate(query.cap);
        Ok(found)
    }
}
