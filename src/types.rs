//! Core domain types for the CPG explorer.
//!
//! Nodes and edges here are read-only snapshots of rows in the graph
//! database. Traversal-local annotations (depth, root flag) live in
//! [`crate::graph::traversal`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

/// Kinds of program entities stored in the `nodes` relation.
///
/// The set is open: kinds this crate has no variant for round-trip through
/// [`NodeKind::Other`] so they still display correctly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Function,
    Type,
    Interface,
    File,
    Package,
    Variable,
    Parameter,
    Local,
    Field,
    Call,
    Other(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Function => "function",
            Self::Type => "type",
            Self::Interface => "interface",
            Self::File => "file",
            Self::Package => "package",
            Self::Variable => "variable",
            Self::Parameter => "parameter",
            Self::Local => "local",
            Self::Field => "field",
            Self::Call => "call",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Map a stored kind string to a variant. Never fails.
    pub fn from_db(s: &str) -> Self {
        match s {
            "function" => Self::Function,
            "type" => Self::Type,
            "interface" => Self::Interface,
            "file" => Self::File,
            "package" => Self::Package,
            "variable" => Self::Variable,
            "parameter" | "param" => Self::Parameter,
            "local" => Self::Local,
            "field" => Self::Field,
            "call" => Self::Call,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(s: String) -> Self {
        Self::from_db(&s)
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EdgeKind
// ---------------------------------------------------------------------------

/// Kinds of relations stored in the `edges` relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Caller → callee.
    Call,
    /// Definition → use (data-flow graph).
    Dfg,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Dfg => "dfg",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Direction / Step
// ---------------------------------------------------------------------------

/// One hop direction relative to the node being expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Follow edges where the expanded node is the source.
    Outgoing,
    /// Follow edges where the expanded node is the target.
    Incoming,
}

impl Step {
    /// Orient a hop from `from` to `neighbor` as a stored `(source, target)` pair.
    pub fn orient<'a>(&self, from: &'a str, neighbor: &'a str) -> (&'a str, &'a str) {
        match self {
            Self::Outgoing => (from, neighbor),
            Self::Incoming => (neighbor, from),
        }
    }
}

/// Requested traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    /// Outgoing pass first, then incoming, sharing one result set.
    Both,
}

impl Direction {
    /// The single-direction passes to run, in order.
    pub fn steps(&self) -> &'static [Step] {
        match self {
            Self::Outgoing => &[Step::Outgoing],
            Self::Incoming => &[Step::Incoming],
            Self::Both => &[Step::Outgoing, Step::Incoming],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outgoing => "outgoing",
            Self::Incoming => "incoming",
            Self::Both => "both",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// GraphNode
// ---------------------------------------------------------------------------

/// Per-function metrics from the `metrics` relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMetrics {
    pub complexity: u32,
    pub fan_in: u32,
    pub fan_out: u32,
}

/// A program entity as stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub package: String,
    pub file: String,
    pub line: u32,
    /// Only populated when the caller asked for function metrics.
    #[serde(flatten)]
    pub metrics: Option<FunctionMetrics>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("function", NodeKind::Function ; "function")]
    #[test_case("type", NodeKind::Type ; "type_kind")]
    #[test_case("file", NodeKind::File ; "file")]
    #[test_case("variable", NodeKind::Variable ; "variable")]
    #[test_case("param", NodeKind::Parameter ; "param_alias")]
    fn node_kind_from_db(input: &str, expected: NodeKind) {
        assert_eq!(NodeKind::from_db(input), expected);
    }

    #[test]
    fn unknown_node_kind_is_preserved() {
        let kind = NodeKind::from_db("goroutine_launch");
        assert_eq!(kind, NodeKind::Other("goroutine_launch".to_string()));
        assert_eq!(kind.as_str(), "goroutine_launch");
        assert_eq!(String::from(kind), "goroutine_launch");
    }

    #[test]
    fn node_kind_serializes_as_plain_string() {
        let json = serde_json::to_string(&NodeKind::Function).unwrap();
        assert_eq!(json, "\"function\"");
        let back: NodeKind = serde_json::from_str("\"defer\"").unwrap();
        assert_eq!(back, NodeKind::Other("defer".to_string()));
    }

    #[test_case(EdgeKind::Call, "call" ; "call")]
    #[test_case(EdgeKind::Dfg, "dfg" ; "dfg")]
    fn edge_kind_matches_stored_label(kind: EdgeKind, expected: &str) {
        assert_eq!(kind.as_str(), expected);
        assert_eq!(kind.to_string(), expected);
        assert_eq!(serde_json::to_string(&kind).unwrap(), format!("\"{expected}\""));
    }

    #[test]
    fn both_runs_outgoing_before_incoming() {
        assert_eq!(Direction::Both.steps(), &[Step::Outgoing, Step::Incoming]);
        assert_eq!(Direction::Outgoing.steps(), &[Step::Outgoing]);
        assert_eq!(Direction::Incoming.steps(), &[Step::Incoming]);
    }

    #[test]
    fn step_orients_edges_by_stored_direction() {
        assert_eq!(Step::Outgoing.orient("u", "v"), ("u", "v"));
        assert_eq!(Step::Incoming.orient("u", "v"), ("v", "u"));
    }

    #[test]
    fn metrics_flatten_into_node_json() {
        let node = GraphNode {
            id: "f1".to_string(),
            kind: NodeKind::Function,
            label: "main".to_string(),
            package: "cmd".to_string(),
            file: "cmd/main.go".to_string(),
            line: 10,
            metrics: Some(FunctionMetrics {
                complexity: 5,
                fan_in: 1,
                fan_out: 2,
            }),
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["complexity"], 5);
        assert_eq!(json["fan_in"], 1);
        assert_eq!(json["fan_out"], 2);
        assert_eq!(json["kind"], "function");
    }

    #[test]
    fn nodes_without_metrics_omit_metric_fields() {
        let node = GraphNode {
            id: "v1".to_string(),
            kind: NodeKind::Local,
            label: "err".to_string(),
            package: String::new(),
            file: "a.go".to_string(),
            line: 3,
            metrics: None,
        };
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("complexity").is_none());
        assert!(json.get("fan_in").is_none());
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn node_kind_from_db_roundtrips_any_string(s in "\\PC{0,30}") {
            let kind = NodeKind::from_db(&s);
            // Aliases collapse to their canonical form; everything else is verbatim.
            if s != "param" {
                prop_assert_eq!(kind.as_str(), s.as_str());
            }
        }
    }
}
