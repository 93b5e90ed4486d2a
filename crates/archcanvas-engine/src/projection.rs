//! Canonical diagram → visible node set.
//!
//! Collapse state lives on the nodes themselves, so projecting is a pure
//! function of the diagram. Ancestor lookup is a single level: a node is
//! hidden only when its direct parent is a collapsed group.

use std::collections::{HashMap, HashSet};

use archcanvas_core::{Diagram, Edge, Node};
use serde::Serialize;

use crate::color::group_color;
use crate::edges::redirect;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleNode {
    #[serde(flatten)]
    pub node: Node,
    /// Set on collapsed groups only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blended_color: Option<String>,
    /// Transient highlight while another node is dragged over this one.
    pub drop_target: bool,
}

impl VisibleNode {
    pub fn id(&self) -> &str {
        &self.node.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Projection {
    pub nodes: Vec<VisibleNode>,
    pub edges: Vec<Edge>,
}

impl Projection {
    pub fn node(&self, id: &str) -> Option<&VisibleNode> {
        self.nodes.iter().find(|n| n.node.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Mark exactly `target` (or nothing) as the drop target. Returns true if
    /// any flag changed.
    pub fn set_drop_target(&mut self, target: Option<&str>) -> bool {
        let mut changed = false;
        for n in &mut self.nodes {
            let flag = target == Some(n.node.id.as_str());
            if n.drop_target != flag {
                n.drop_target = flag;
                changed = true;
            }
        }
        changed
    }

    pub fn drop_target(&self) -> Option<&str> {
        self.nodes.iter().find(|n| n.drop_target).map(|n| n.id())
    }
}

/// The collapsed group directly above `node`, if any. A `parent_id` that
/// points nowhere is treated as absent.
pub(crate) fn collapsed_parent<'a>(index: &HashMap<&str, &'a Node>, node: &Node) -> Option<&'a Node> {
    let pid = node.parent_id.as_deref()?;
    match index.get(pid) {
        Some(parent) if parent.is_collapsed_group() => Some(*parent),
        Some(_) => None,
        None => {
            tracing::warn!(node = %node.id, parent = %pid, "ignoring reference to missing parent");
            None
        }
    }
}

/// Nodes that render on the canvas.
///
/// Expanded groups are omitted (their children render in their place) and so
/// is every child of a collapsed group. Collapsed groups get a color blended
/// from their children's leaf types.
pub fn visible_nodes(diagram: &Diagram, min_luma: f64) -> Vec<VisibleNode> {
    let index = diagram.index();
    diagram
        .nodes
        .iter()
        .filter(|n| !(n.is_group && !n.is_collapsed))
        .filter(|n| collapsed_parent(&index, n).is_none())
        .map(|n| VisibleNode {
            node: n.clone(),
            blended_color: if n.is_collapsed_group() {
                group_color(&n.metadata.child_types, min_luma)
            } else {
                None
            },
            drop_target: false,
        })
        .collect()
}

/// Full projection: visible nodes plus redirected, deduplicated edges.
/// Edges that still end on a hidden node (an expanded group, say) are dropped.
pub fn project(diagram: &Diagram, min_luma: f64) -> Projection {
    let nodes = visible_nodes(diagram, min_luma);
    let visible: HashSet<&str> = nodes.iter().map(|n| n.id()).collect();
    let edges = redirect(&diagram.edges, &diagram.nodes)
        .into_iter()
        .filter(|e| {
            let keep = visible.contains(e.source.as_str()) && visible.contains(e.target.as_str());
            if !keep {
                tracing::debug!(edge = %e.id, "edge ends on a hidden node");
            }
            keep
        })
        .collect();
    Projection { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{blend, type_color, DEFAULT_MIN_LUMA};
    use archcanvas_core::NodeType;
    use pretty_assertions::assert_eq;

    fn group(id: &str, children: &[&str], collapsed: bool) -> Node {
        let mut g = Node::group(id, id.to_uppercase());
        g.is_collapsed = collapsed;
        g.child_ids.extend(children.iter().map(|c| c.to_string()));
        g
    }

    fn ids(p: &[VisibleNode]) -> Vec<&str> {
        p.iter().map(|n| n.id()).collect()
    }

    fn diagram(collapsed: bool) -> Diagram {
        let mut g = group("g", &["a", "b"], collapsed);
        g.metadata.child_types = vec![NodeType::Database, NodeType::Cache];
        Diagram::new(
            vec![
                g,
                Node::leaf("a", NodeType::Database, "A").with_parent("g"),
                Node::leaf("b", NodeType::Cache, "B").with_parent("g"),
                Node::leaf("c", NodeType::Api, "C"),
            ],
            vec![
                Edge::new("e1", "c", "a").with_label("reads"),
                Edge::new("e2", "c", "b").with_label("warms"),
                Edge::new("e3", "a", "b"),
            ],
        )
    }

    #[test]
    fn collapsed_group_hides_children() {
        let p = project(&diagram(true), DEFAULT_MIN_LUMA);
        assert_eq!(ids(&p.nodes), vec!["g", "c"]);
        let expected = blend(&[type_color(NodeType::Database), type_color(NodeType::Cache)]).unwrap();
        assert_eq!(p.node("g").unwrap().blended_color, Some(expected));
        assert_eq!(p.node("c").unwrap().blended_color, None);

        assert_eq!(p.edges.len(), 1);
        assert_eq!(p.edges[0].id, "e1");
        assert_eq!((p.edges[0].source.as_str(), p.edges[0].target.as_str()), ("c", "g"));
        assert_eq!(p.edges[0].label.as_deref(), Some("reads, warms"));
    }

    #[test]
    fn expanded_group_is_replaced_by_its_children() {
        let p = project(&diagram(false), DEFAULT_MIN_LUMA);
        assert_eq!(ids(&p.nodes), vec!["a", "b", "c"]);
        assert_eq!(p.edges.len(), 3);
    }

    #[test]
    fn projecting_twice_is_identical() {
        let d = diagram(true);
        assert_eq!(project(&d, DEFAULT_MIN_LUMA), project(&d, DEFAULT_MIN_LUMA));
    }

    #[test]
    fn missing_parent_is_ignored_not_fatal() {
        let d = Diagram::new(
            vec![
                Node::leaf("a", NodeType::Queue, "A").with_parent("ghost"),
                Node::leaf("b", NodeType::Queue, "B"),
            ],
            vec![Edge::new("e", "a", "b"), Edge::new("bad", "a", "nowhere")],
        );
        let p = project(&d, DEFAULT_MIN_LUMA);
        assert_eq!(ids(&p.nodes), vec!["a", "b"]);
        assert_eq!(p.edges.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["e"]);
    }

    #[test]
    fn only_the_direct_parent_is_consulted() {
        // outer (collapsed) > inner (expanded) > leaf: the leaf's direct parent
        // is expanded, so the leaf stays visible.
        let outer = group("outer", &["inner"], true);
        let inner = group("inner", &["leaf"], false).with_parent("outer");
        let leaf = Node::leaf("leaf", NodeType::Cdn, "L").with_parent("inner");
        let p = project(&Diagram::new(vec![outer, inner, leaf], vec![]), DEFAULT_MIN_LUMA);
        assert_eq!(ids(&p.nodes), vec!["outer", "leaf"]);
    }

    #[test]
    fn drop_target_flag_is_exclusive() {
        let mut p = project(&diagram(false), DEFAULT_MIN_LUMA);
        assert!(p.set_drop_target(Some("b")));
        assert!(!p.set_drop_target(Some("b")));
        assert_eq!(p.drop_target(), Some("b"));
        assert!(p.set_drop_target(Some("c")));
        assert!(!p.node("b").unwrap().drop_target);
        assert!(p.set_drop_target(None));
        assert_eq!(p.drop_target(), None);
    }
}
