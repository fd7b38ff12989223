//! Call-site configurations of the traversal engine.
//!
//! The call graph and the data-flow graph share one BFS; they differ in edge
//! kind, node-kind filter, neighbor cap, depth range and how they read the
//! `direction` parameter. An unrecognized direction expands both ways for
//! the call graph but not at all for data flow. That asymmetry is kept as-is.

use crate::error::{CpgError, Result};
use crate::graph::traversal::{traverse, NeighborQuery, NodeStore, TraversalGraph};
use crate::types::{Direction, EdgeKind, NodeKind, Step};

/// Fixed parameters for one traversal call site.
#[derive(Debug)]
pub struct TraversalProfile {
    /// Short name used in logs.
    pub name: &'static str,
    /// Noun used in "X is required" / "X not found" messages.
    pub subject: &'static str,
    pub edge_kind: EdgeKind,
    pub node_kind: Option<NodeKind>,
    pub neighbor_cap: usize,
    pub min_depth: u32,
    pub max_depth: u32,
    pub default_depth: u32,
    /// Used when the direction parameter is missing or empty.
    pub default_direction: Direction,
    /// Used when the direction parameter is present but not in `vocabulary`.
    /// `None` means "seed only".
    pub unrecognized_direction: Option<Direction>,
    pub with_metrics: bool,
    vocabulary: &'static [(&'static str, Direction)],
}

/// Call graph: function → function over `call` edges.
pub static CALL_GRAPH: TraversalProfile = TraversalProfile {
    name: "callgraph",
    subject: "function",
    edge_kind: EdgeKind::Call,
    node_kind: Some(NodeKind::Function),
    neighbor_cap: 30,
    min_depth: 1,
    max_depth: 5,
    default_depth: 2,
    default_direction: Direction::Both,
    unrecognized_direction: Some(Direction::Both),
    with_metrics: true,
    vocabulary: &[
        ("outgoing", Direction::Outgoing),
        ("callees", Direction::Outgoing),
        ("incoming", Direction::Incoming),
        ("callers", Direction::Incoming),
        ("both", Direction::Both),
    ],
};

/// Data flow: any node kind over `dfg` edges.
pub static DATA_FLOW: TraversalProfile = TraversalProfile {
    name: "dataflow",
    subject: "node",
    edge_kind: EdgeKind::Dfg,
    node_kind: None,
    neighbor_cap: 25,
    min_depth: 1,
    max_depth: 6,
    default_depth: 3,
    default_direction: Direction::Outgoing,
    unrecognized_direction: None,
    with_metrics: false,
    vocabulary: &[
        ("forward", Direction::Outgoing),
        ("backward", Direction::Incoming),
        ("both", Direction::Both),
    ],
};

/// A validated, normalized traversal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalRequest {
    pub root: String,
    pub depth: u32,
    /// `None` means seed only.
    pub direction: Option<Direction>,
}

/// Parse an integer query parameter; missing or malformed input yields `default`.
pub fn query_int(raw: Option<&str>, default: i64) -> i64 {
    match raw {
        None | Some("") => default,
        Some(s) => s.parse().unwrap_or(default),
    }
}

impl TraversalProfile {
    /// Default depth, then clamp to `[min_depth, max_depth]`.
    pub fn clamp_depth(&self, raw: Option<&str>) -> u32 {
        let depth = query_int(raw, i64::from(self.default_depth));
        // Bounds are small positive constants, so the cast back is lossless.
        depth.clamp(i64::from(self.min_depth), i64::from(self.max_depth)) as u32
    }

    /// Map the raw `direction` parameter to passes to run.
    pub fn resolve_direction(&self, raw: Option<&str>) -> Option<Direction> {
        match raw {
            None | Some("") => Some(self.default_direction),
            Some(s) => self
                .vocabulary
                .iter()
                .find(|(word, _)| *word == s)
                .map(|(_, dir)| *dir)
                .or(self.unrecognized_direction),
        }
    }

    /// Validate and normalize raw request parameters.
    pub fn resolve(
        &self,
        root: Option<&str>,
        depth: Option<&str>,
        direction: Option<&str>,
    ) -> Result<TraversalRequest> {
        let root = root
            .filter(|r| !r.is_empty())
            .ok_or_else(|| CpgError::InvalidInput(format!("{} id is required", self.subject)))?;
        Ok(TraversalRequest {
            root: root.to_string(),
            depth: self.clamp_depth(depth),
            direction: self.resolve_direction(direction),
        })
    }

    /// The store query issued for every frontier node in a `step` pass.
    pub fn neighbor_query(&self, step: Step) -> NeighborQuery<'_> {
        NeighborQuery {
            edge_kind: self.edge_kind,
            step,
            node_kind: self.node_kind.as_ref(),
            with_metrics: self.with_metrics,
            cap: self.neighbor_cap,
        }
    }

    /// Execute a normalized request and materialize the result.
    pub fn run<S>(&self, store: &S, request: &TraversalRequest) -> Result<TraversalGraph>
    where
        S: NodeStore + ?Sized,
    {
        let subgraph = traverse(
            store,
            self,
            &request.root,
            request.depth,
            request.direction,
        )?;
        Ok(subgraph.into_graph())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
