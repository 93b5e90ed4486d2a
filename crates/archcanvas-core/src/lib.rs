pub mod error;
pub mod grouping;
pub mod integrity;
pub mod settings;
pub mod storage;

pub use error::{Error, Result};
pub use settings::{Direction, EngineSettings};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// --- Types ---

/// What a node represents on the canvas. Every variant except `Group` is a
/// leaf type that the generator can emit directly.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
    schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Database,
    Cache,
    Server,
    Api,
    Loadbalancer,
    Queue,
    Cdn,
    Gateway,
    Storage,
    Service,
    Group,
}

impl NodeType {
    pub const LEAVES: [NodeType; 10] = [
        NodeType::Database,
        NodeType::Cache,
        NodeType::Server,
        NodeType::Api,
        NodeType::Loadbalancer,
        NodeType::Queue,
        NodeType::Cdn,
        NodeType::Gateway,
        NodeType::Storage,
        NodeType::Service,
    ];

    pub fn is_leaf(self) -> bool {
        self != NodeType::Group
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Database => "database",
            NodeType::Cache => "cache",
            NodeType::Server => "server",
            NodeType::Api => "api",
            NodeType::Loadbalancer => "loadbalancer",
            NodeType::Queue => "queue",
            NodeType::Cdn => "cdn",
            NodeType::Gateway => "gateway",
            NodeType::Storage => "storage",
            NodeType::Service => "service",
            NodeType::Group => "group",
        }
    }

    pub fn parse(s: &str) -> Option<NodeType> {
        NodeType::LEAVES
            .into_iter()
            .chain([NodeType::Group])
            .find(|t| t.as_str() == s)
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    #[default]
    Normal,
    Animated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Distinct leaf types of a group's children. Empty on leaves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_types: Vec<NodeType>,
    /// Anything else the generator attached.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Option<String>>,
}

/// A node in the canonical diagram.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub metadata: NodeMetadata,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub is_collapsed: bool,
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub child_ids: IndexSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Node {
    pub fn leaf(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: label.into(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            metadata: NodeMetadata::default(),
            position: Position::default(),
            is_group: false,
            is_collapsed: false,
            child_ids: IndexSet::new(),
            parent_id: None,
        }
    }

    /// A group node with no children yet. Callers must add children before
    /// the diagram is valid again.
    pub fn group(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            is_group: true,
            ..Self::leaf(id, NodeType::Group, label)
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// True for a group currently shown as a single box.
    pub fn is_collapsed_group(&self) -> bool {
        self.is_group && self.is_collapsed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: None,
            kind: EdgeKind::Normal,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn animated(mut self) -> Self {
        self.kind = EdgeKind::Animated;
        self
    }
}

/// The persisted source-of-truth graph.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Diagram {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Diagram {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Id-keyed view of the node arena.
    pub fn index(&self) -> HashMap<&str, &Node> {
        self.nodes.iter().map(|n| (n.id.as_str(), n)).collect()
    }

    /// The group that owns `id`, if that group exists.
    pub fn parent_of(&self, id: &str) -> Option<&Node> {
        let pid = self.node(id)?.parent_id.as_deref()?;
        self.node(pid)
    }
}

// --- Ids ---

fn max_suffix<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> u64 {
    ids.filter_map(|id| id.strip_prefix(prefix).and_then(|s| s.parse::<u64>().ok()))
        .max()
        .unwrap_or(0)
}

/// Generate the next node ID by scanning existing nodes: "node-{N}".
pub fn next_node_id(diagram: &Diagram) -> String {
    let max = max_suffix(diagram.nodes.iter().map(|n| n.id.as_str()), "node-");
    format!("node-{}", max + 1)
}

/// Generate the next group ID by scanning existing nodes: "group-{N}".
pub fn next_group_id(diagram: &Diagram) -> String {
    let max = max_suffix(diagram.nodes.iter().map(|n| n.id.as_str()), "group-");
    format!("group-{}", max + 1)
}

/// Generate an edge ID from source and target node IDs. Parallel edges get a
/// numeric suffix so each keeps its own label.
pub fn make_edge_id(diagram: &Diagram, source: &str, target: &str) -> String {
    let base = format!("edge-{}-{}", source, target);
    if !diagram.edges.iter().any(|e| e.id == base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|id| !diagram.edges.iter().any(|e| e.id == *id))
        .unwrap_or(base)
}
