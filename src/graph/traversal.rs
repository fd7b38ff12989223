//! Bounded breadth-first traversal over the code property graph.
//!
//! The engine expands a root node level by level along one edge kind,
//! recording every traversed edge and registering each node once, at the
//! level where it was first discovered. Work is bounded by the depth limit
//! and by a per-node neighbor cap enforced inside the store query.
//!
//! `Both` is two single-direction passes (outgoing, then incoming) over one
//! shared [`Subgraph`]. Nodes the outgoing pass already registered are not
//! re-expanded by the incoming pass, so the result depends on pass order.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::Serialize;

use crate::error::{CpgError, Result};
use crate::graph::profile::TraversalProfile;
use crate::types::{Direction, EdgeKind, GraphNode, NodeKind, Step};

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Parameters for one neighbor fetch.
#[derive(Debug, Clone, Copy)]
pub struct NeighborQuery<'a> {
    pub edge_kind: EdgeKind,
    pub step: Step,
    /// When set, neighbors of any other kind are invisible.
    pub node_kind: Option<&'a NodeKind>,
    /// Attach function metrics to returned nodes.
    pub with_metrics: bool,
    /// Hard limit on returned rows. Excess neighbors are dropped.
    pub cap: usize,
}

/// Read access to nodes and their neighbors, as needed by [`traverse`].
pub trait NodeStore {
    /// Fetch one node, or `None` when the id does not exist.
    fn get_node(&self, id: &str, with_metrics: bool) -> Result<Option<GraphNode>>;

    /// Fetch up to `query.cap` neighbors of `id` in one round-trip, each
    /// with its attributes. One entry per matching edge; order is
    /// unspecified.
    fn get_neighbors(&self, id: &str, query: &NeighborQuery<'_>) -> Result<Vec<GraphNode>>;
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A node annotated with its discovery depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraversedNode {
    #[serde(flatten)]
    pub node: GraphNode,
    pub is_root: bool,
    pub depth: u32,
}

/// One traversed edge, oriented as stored (source → target).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TraversedEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

/// Serializable traversal output: nodes as a set, edges in recorded order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TraversalGraph {
    pub nodes: Vec<TraversedNode>,
    pub edges: Vec<TraversedEdge>,
}

/// Accumulator shared by every pass of one traversal run.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    nodes: HashMap<String, TraversedNode>,
    edges: Vec<TraversedEdge>,
}

impl Subgraph {
    /// Start a subgraph containing only `root` at depth 0.
    pub fn seeded(root: GraphNode) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            root.id.clone(),
            TraversedNode {
                node: root,
                is_root: true,
                depth: 0,
            },
        );
        Self {
            nodes,
            edges: Vec::new(),
        }
    }

    /// Register `node` at `depth` unless its id is already known.
    /// Returns `true` on first discovery.
    pub fn discover(&mut self, node: GraphNode, depth: u32) -> bool {
        match self.nodes.entry(node.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(TraversedNode {
                    node,
                    is_root: false,
                    depth,
                });
                true
            }
        }
    }

    pub fn record_edge(&mut self, source: &str, target: &str, kind: EdgeKind) {
        self.edges.push(TraversedEdge {
            source: source.to_string(),
            target: target.to_string(),
            kind,
        });
    }

    pub fn get(&self, id: &str) -> Option<&TraversedNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TraversedNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[TraversedEdge] {
        &self.edges
    }

    /// Flatten into the serializable shape. Node order is arbitrary.
    pub fn into_graph(self) -> TraversalGraph {
        TraversalGraph {
            nodes: self.nodes.into_values().collect(),
            edges: self.edges,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Run a bounded traversal from `root`.
///
/// `direction == None` seeds the root and stops. Fails with
/// [`CpgError::NotFound`] when the root does not exist; neighbor-fetch
/// failures only shrink the result.
pub fn traverse<S>(
    store: &S,
    profile: &TraversalProfile,
    root: &str,
    max_depth: u32,
    direction: Option<Direction>,
) -> Result<Subgraph>
where
    S: NodeStore + ?Sized,
{
    let span = tracing::debug_span!("traverse", profile = profile.name, root, max_depth);
    let _guard = span.enter();

    let root_node = store
        .get_node(root, profile.with_metrics)?
        .ok_or_else(|| CpgError::NotFound(profile.subject.to_string()))?;
    let mut subgraph = Subgraph::seeded(root_node);

    if let Some(direction) = direction {
        for &step in direction.steps() {
            expand(store, profile, root, max_depth, step, &mut subgraph);
        }
    }

    tracing::debug!(
        nodes = subgraph.node_count(),
        edges = subgraph.edges().len(),
        "traversal finished"
    );
    Ok(subgraph)
}

/// One single-direction BFS pass from `root` into `subgraph`.
///
/// Every returned neighbor produces an edge; only first-time discoveries
/// join the next frontier.
pub fn expand<S>(
    store: &S,
    profile: &TraversalProfile,
    root: &str,
    max_depth: u32,
    step: Step,
    subgraph: &mut Subgraph,
) where
    S: NodeStore + ?Sized,
{
    let query = profile.neighbor_query(step);
    let mut frontier = vec![root.to_string()];
    let mut depth = 1;

    while depth <= max_depth && !frontier.is_empty() {
        let mut next = Vec::new();
        for id in &frontier {
            let neighbors = match store.get_neighbors(id, &query) {
                Ok(neighbors) => neighbors,
                Err(e) => {
                    tracing::warn!(node = %id, ?step, error = %e, "neighbor fetch failed; treating node as a leaf");
                    continue;
                }
            };

            for neighbor in neighbors {
                let (source, target) = step.orient(id, &neighbor.id);
                subgraph.record_edge(source, target, query.edge_kind);

                let neighbor_id = neighbor.id.clone();
                if subgraph.discover(neighbor, depth) {
                    next.push(neighbor_id);
                }
            }
        }
        frontier = next;
        depth += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixture::{insert_edges, insert_nodes};
    use crate::db::schema::initialize_database;
    use crate::graph::profile::{CALL_GRAPH, DATA_FLOW};
    use crate::graph::store::GraphStore;
    use crate::types::FunctionMetrics;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    /// Spin up an in-memory store with the full schema applied.
    fn setup() -> GraphStore {
        let conn = initialize_database(":memory:").expect("schema init should succeed on :memory:");
        GraphStore::from_connection(conn)
    }

    fn function(id: &str, complexity: u32) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            kind: NodeKind::Function,
            label: id.to_string(),
            package: "pkg".to_string(),
            file: format!("{id}.go"),
            line: 1,
            metrics: Some(FunctionMetrics {
                complexity,
                fan_in: 0,
                fan_out: 0,
            }),
        }
    }

    fn variable(id: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            kind: NodeKind::Variable,
            label: id.to_string(),
            package: "pkg".to_string(),
            file: "vars.go".to_string(),
            line: 1,
            metrics: None,
        }
    }

    /// f1 → f2 → f3 over call edges.
    fn seed_chain(store: &mut GraphStore) {
        insert_nodes(
            &mut store.conn,
            &[function("f1", 5), function("f2", 2), function("f3", 9)],
        )
        .unwrap();
        insert_edges(
            &mut store.conn,
            &[("f1", "f2", EdgeKind::Call), ("f2", "f3", EdgeKind::Call)],
        )
        .unwrap();
    }

    fn depths(subgraph: &Subgraph) -> Vec<(String, u32, bool)> {
        let mut out: Vec<_> = subgraph
            .nodes()
            .map(|n| (n.node.id.clone(), n.depth, n.is_root))
            .collect();
        out.sort();
        out
    }

    fn edge_pairs(subgraph: &Subgraph) -> Vec<(&str, &str)> {
        subgraph
            .edges()
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect()
    }

    #[test]
    fn seed_only_contains_root() {
        let mut store = setup();
        seed_chain(&mut store);
        let sub = traverse(&store, &CALL_GRAPH, "f1", 3, None).unwrap();
        assert_eq!(depths(&sub), vec![("f1".to_string(), 0, true)]);
        assert!(sub.edges().is_empty());
    }

    #[test]
    fn outgoing_chain_records_depths_and_edges() {
        let mut store = setup();
        seed_chain(&mut store);
        let sub = traverse(&store, &CALL_GRAPH, "f1", 2, Some(Direction::Outgoing)).unwrap();
        assert_eq!(
            depths(&sub),
            vec![
                ("f1".to_string(), 0, true),
                ("f2".to_string(), 1, false),
                ("f3".to_string(), 2, false),
            ]
        );
        assert_eq!(edge_pairs(&sub), vec![("f1", "f2"), ("f2", "f3")]);
        assert_eq!(sub.get("f3").unwrap().node.metrics.unwrap().complexity, 9);
    }

    #[test]
    fn incoming_chain_orients_edges_as_stored() {
        let mut store = setup();
        seed_chain(&mut store);
        let sub = traverse(&store, &CALL_GRAPH, "f3", 5, Some(Direction::Incoming)).unwrap();
        assert_eq!(
            depths(&sub),
            vec![
                ("f1".to_string(), 2, false),
                ("f2".to_string(), 1, false),
                ("f3".to_string(), 0, true),
            ]
        );
        assert_eq!(edge_pairs(&sub), vec![("f2", "f3"), ("f1", "f2")]);
    }

    #[test]
    fn depth_limit_stops_expansion() {
        let mut store = setup();
        seed_chain(&mut store);
        let sub = traverse(&store, &CALL_GRAPH, "f1", 1, Some(Direction::Outgoing)).unwrap();
        assert_eq!(sub.node_count(), 2);
        assert!(!sub.contains("f3"));
    }

    #[test]
    fn missing_root_is_not_found() {
        let store = setup();
        let err = traverse(&store, &CALL_GRAPH, "nope", 2, Some(Direction::Both)).unwrap_err();
        assert!(matches!(err, CpgError::NotFound(ref s) if s == "function"));
    }

    #[test]
    fn revisits_record_edges_but_keep_first_depth() {
        // a → b, a → c, b → c: c is found at depth 1, the b → c edge is
        // still recorded at depth 2.
        let mut store = setup();
        insert_nodes(
            &mut store.conn,
            &[function("a", 1), function("b", 1), function("c", 1)],
        )
        .unwrap();
        insert_edges(
            &mut store.conn,
            &[
                ("a", "b", EdgeKind::Call),
                ("a", "c", EdgeKind::Call),
                ("b", "c", EdgeKind::Call),
            ],
        )
        .unwrap();

        let sub = traverse(&store, &CALL_GRAPH, "a", 3, Some(Direction::Outgoing)).unwrap();
        assert_eq!(sub.get("c").unwrap().depth, 1);
        assert_eq!(sub.edges().len(), 3);
    }

    #[test]
    fn cycles_terminate_and_record_back_edges() {
        let mut store = setup();
        insert_nodes(&mut store.conn, &[function("a", 1), function("b", 1)]).unwrap();
        insert_edges(
            &mut store.conn,
            &[("a", "b", EdgeKind::Call), ("b", "a", EdgeKind::Call)],
        )
        .unwrap();

        let sub = traverse(&store, &CALL_GRAPH, "a", 5, Some(Direction::Outgoing)).unwrap();
        assert_eq!(sub.node_count(), 2);
        assert_eq!(sub.get("a").unwrap().depth, 0);
        assert!(sub.get("a").unwrap().is_root);
        assert_eq!(edge_pairs(&sub), vec![("a", "b"), ("b", "a")]);
    }

    #[test]
    fn call_graph_ignores_non_function_neighbors() {
        let mut store = setup();
        insert_nodes(&mut store.conn, &[function("f", 1), variable("v")]).unwrap();
        insert_edges(&mut store.conn, &[("f", "v", EdgeKind::Call)]).unwrap();

        let sub = traverse(&store, &CALL_GRAPH, "f", 2, Some(Direction::Both)).unwrap();
        assert_eq!(sub.node_count(), 1);
        assert!(sub.edges().is_empty());
    }

    #[test]
    fn data_flow_follows_any_node_kind_without_metrics() {
        let mut store = setup();
        insert_nodes(&mut store.conn, &[variable("x"), variable("y"), function("f", 4)]).unwrap();
        insert_edges(
            &mut store.conn,
            &[
                ("x", "y", EdgeKind::Dfg),
                ("y", "f", EdgeKind::Dfg),
                ("x", "f", EdgeKind::Call),
            ],
        )
        .unwrap();

        let sub = traverse(&store, &DATA_FLOW, "x", 3, Some(Direction::Outgoing)).unwrap();
        assert_eq!(sub.node_count(), 3);
        assert_eq!(sub.get("f").unwrap().depth, 2);
        assert!(sub.nodes().all(|n| n.node.metrics.is_none()));
        assert!(sub.edges().iter().all(|e| e.kind == EdgeKind::Dfg));
    }

    #[test]
    fn both_does_not_reexpand_nodes_found_outgoing() {
        // Diamond a → b → d, a → c → d, traversed from b.
        let mut store = setup();
        insert_nodes(
            &mut store.conn,
            &[function("a", 1), function("b", 1), function("c", 1), function("d", 1)],
        )
        .unwrap();
        insert_edges(
            &mut store.conn,
            &[
                ("a", "b", EdgeKind::Call),
                ("b", "d", EdgeKind::Call),
                ("a", "c", EdgeKind::Call),
                ("c", "d", EdgeKind::Call),
            ],
        )
        .unwrap();

        let sub = traverse(&store, &CALL_GRAPH, "b", 2, Some(Direction::Both)).unwrap();
        let ids: HashSet<&str> = sub.nodes().map(|n| n.node.id.as_str()).collect();
        assert_eq!(ids, HashSet::from(["a", "b", "d"]));
        assert_eq!(sub.get("a").unwrap().depth, 1);
        assert_eq!(sub.get("d").unwrap().depth, 1);
    }

    /// Fails every neighbor fetch for one id.
    struct Flaky<'a> {
        inner: &'a GraphStore,
        broken: &'a str,
    }

    impl NodeStore for Flaky<'_> {
        fn get_node(&self, id: &str, with_metrics: bool) -> Result<Option<GraphNode>> {
            self.inner.get_node(id, with_metrics)
        }

        fn get_neighbors(&self, id: &str, query: &NeighborQuery<'_>) -> Result<Vec<GraphNode>> {
            if id == self.broken {
                return Err(CpgError::Sqlite(rusqlite::Error::QueryReturnedNoRows));
            }
            self.inner.get_neighbors(id, query)
        }
    }

    #[test]
    fn failing_neighbor_fetch_degrades_to_leaf() {
        // r → a → x, r → b → y; fetching a's neighbors fails.
        let mut store = setup();
        insert_nodes(
            &mut store.conn,
            &[
                function("r", 1),
                function("a", 1),
                function("b", 1),
                function("x", 1),
                function("y", 1),
            ],
        )
        .unwrap();
        insert_edges(
            &mut store.conn,
            &[
                ("r", "a", EdgeKind::Call),
                ("r", "b", EdgeKind::Call),
                ("a", "x", EdgeKind::Call),
                ("b", "y", EdgeKind::Call),
            ],
        )
        .unwrap();

        let flaky = Flaky {
            inner: &store,
            broken: "a",
        };
        let sub = traverse(&flaky, &CALL_GRAPH, "r", 3, Some(Direction::Outgoing)).unwrap();
        assert!(sub.contains("a"));
        assert!(sub.contains("y"));
        assert!(!sub.contains("x"));
    }

    #[test]
    fn into_graph_keeps_every_node_and_edge() {
        let mut store = setup();
        seed_chain(&mut store);
        let sub = traverse(&store, &CALL_GRAPH, "f2", 2, Some(Direction::Both)).unwrap();
        let graph = sub.into_graph();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.nodes.iter().filter(|n| n.is_root).count(), 1);
    }

    #[test]
    fn traversal_graph_serializes_flat_node_records() {
        let mut store = setup();
        seed_chain(&mut store);
        let graph = traverse(&store, &CALL_GRAPH, "f1", 1, Some(Direction::Outgoing))
            .unwrap()
            .into_graph();
        let json = serde_json::to_value(&graph).unwrap();
        let root = json["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["id"] == "f1")
            .unwrap();
        assert_eq!(root["is_root"], true);
        assert_eq!(root["depth"], 0);
        assert_eq!(root["complexity"], 5);
        assert_eq!(root["label"], "f1");
        assert_eq!(json["edges"][0]["kind"], "call");
    }
}
