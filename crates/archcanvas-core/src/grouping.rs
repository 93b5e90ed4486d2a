//! Canonical mutations: merging nodes into groups, edge and node edits, and
//! collapse toggling. Every function validates before it touches the
//! diagram, so an `Err` always leaves the input unchanged.

use std::collections::HashSet;

use crate::integrity::{check_acyclic, depth, height, MAX_DEPTH};
use crate::{make_edge_id, next_group_id, Diagram, Edge, EdgeKind, Error, Node, NodeType, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The group the dragged node now belongs to.
    pub group_id: String,
    /// Whether `group_id` was created by this merge.
    pub created: bool,
    /// Groups removed because the merge left them without children.
    pub dissolved: Vec<String>,
}

/// Move `dragged` into a group together with `target`.
///
/// - target is a top-level group: `dragged` joins it.
/// - target is a leaf inside a group: `dragged` joins the target's group.
/// - target is a top-level leaf: a new collapsed group holding both is created
///   at the target's position.
///
/// A group that is itself nested is never a valid target.
pub fn merge_nodes(diagram: &mut Diagram, dragged: &str, target: &str) -> Result<MergeOutcome> {
    if dragged == target {
        return Err(Error::SelfMerge(dragged.to_string()));
    }
    let dragged_node = diagram
        .node(dragged)
        .ok_or_else(|| Error::NodeNotFound(dragged.to_string()))?;
    let target_node = diagram
        .node(target)
        .ok_or_else(|| Error::NodeNotFound(target.to_string()))?;

    let existing_group = if target_node.is_group {
        if target_node.parent_id.is_some() {
            return Err(Error::NestedTarget(target.to_string()));
        }
        Some(target_node.id.clone())
    } else {
        target_node
            .parent_id
            .as_deref()
            .and_then(|pid| diagram.node(pid))
            .filter(|p| p.is_group)
            .map(|p| p.id.clone())
    };

    let old_parent = dragged_node.parent_id.clone();

    if let Some(group_id) = existing_group {
        if old_parent.as_deref() == Some(group_id.as_str()) {
            tracing::debug!(dragged, group = %group_id, "node already in target group");
            return Ok(MergeOutcome {
                group_id,
                created: false,
                dissolved: Vec::new(),
            });
        }
        check_acyclic(diagram, dragged, &group_id)?;
        check_depth(diagram, dragged, target, depth(diagram, &group_id) + 1)?;

        let dissolved = detach(diagram, dragged, Some(&group_id));
        attach(diagram, dragged, &group_id);
        refresh_child_types(diagram);
        tracing::debug!(dragged, group = %group_id, "merged into existing group");
        return Ok(MergeOutcome {
            group_id,
            created: false,
            dissolved,
        });
    }

    // Top-level leaf target: wrap both in a fresh group.
    check_depth(diagram, dragged, target, 1)?;
    let group_id = next_group_id(diagram);
    let label = format!("{} + {}", target_node.label, dragged_node.label);
    let position = target_node.position;

    let dissolved = detach(diagram, dragged, None);
    let mut group = Node::group(group_id.clone(), label);
    group.position = position;
    group.is_collapsed = true;
    diagram.nodes.push(group);
    attach(diagram, target, &group_id);
    attach(diagram, dragged, &group_id);
    refresh_child_types(diagram);
    tracing::debug!(dragged, target, group = %group_id, "created group from merge");

    Ok(MergeOutcome {
        group_id,
        created: true,
        dissolved,
    })
}

/// Add an edge between two existing nodes. An empty label is stored as none.
pub fn add_edge(
    diagram: &mut Diagram,
    source: &str,
    target: &str,
    label: Option<String>,
    kind: EdgeKind,
) -> Result<String> {
    for end in [source, target] {
        if !diagram.contains_node(end) {
            return Err(Error::NodeNotFound(end.to_string()));
        }
    }
    let id = make_edge_id(diagram, source, target);
    diagram.edges.push(Edge {
        id: id.clone(),
        source: source.to_string(),
        target: target.to_string(),
        label: label.filter(|l| !l.trim().is_empty()),
        kind,
    });
    Ok(id)
}

pub fn delete_edge(diagram: &mut Diagram, edge_id: &str) -> Result<Edge> {
    let idx = diagram
        .edges
        .iter()
        .position(|e| e.id == edge_id)
        .ok_or_else(|| Error::EdgeNotFound(edge_id.to_string()))?;
    Ok(diagram.edges.remove(idx))
}

/// Delete a node, its descendants, and every edge touching them. Returns the
/// ids of all removed nodes, including groups dissolved along the way.
pub fn delete_node(diagram: &mut Diagram, node_id: &str) -> Result<Vec<String>> {
    if !diagram.contains_node(node_id) {
        return Err(Error::NodeNotFound(node_id.to_string()));
    }

    let mut to_delete = HashSet::new();
    to_delete.insert(node_id.to_string());
    let mut changed = true;
    while changed {
        changed = false;
        for n in &diagram.nodes {
            if let Some(pid) = &n.parent_id {
                if to_delete.contains(pid) && !to_delete.contains(&n.id) {
                    to_delete.insert(n.id.clone());
                    changed = true;
                }
            }
        }
    }

    let mut removed: Vec<String> = diagram
        .nodes
        .iter()
        .filter(|n| to_delete.contains(&n.id))
        .map(|n| n.id.clone())
        .collect();

    removed.extend(detach(diagram, node_id, None));
    diagram.nodes.retain(|n| !to_delete.contains(&n.id));
    diagram
        .edges
        .retain(|e| !to_delete.contains(&e.source) && !to_delete.contains(&e.target));
    refresh_child_types(diagram);
    Ok(removed)
}

/// Flip a group between collapsed and expanded. Returns the new state.
pub fn toggle_collapse(diagram: &mut Diagram, node_id: &str) -> Result<bool> {
    let node = diagram
        .node_mut(node_id)
        .ok_or_else(|| Error::NodeNotFound(node_id.to_string()))?;
    if !node.is_group {
        return Err(Error::NotAGroup(node_id.to_string()));
    }
    node.is_collapsed = !node.is_collapsed;
    Ok(node.is_collapsed)
}

/// Recompute `metadata.child_types` on every group from its current children.
pub fn refresh_child_types(diagram: &mut Diagram) {
    let computed: Vec<(String, Vec<NodeType>)> = diagram
        .nodes
        .iter()
        .filter(|n| n.is_group)
        .map(|g| {
            let mut visited = HashSet::new();
            (g.id.clone(), leaf_types_under(diagram, &g.id, &mut visited))
        })
        .collect();
    for (id, types) in computed {
        if let Some(group) = diagram.node_mut(&id) {
            group.metadata.child_types = types;
        }
    }
}

fn leaf_types_under(diagram: &Diagram, group_id: &str, visited: &mut HashSet<String>) -> Vec<NodeType> {
    let mut types = Vec::new();
    if !visited.insert(group_id.to_string()) {
        return types;
    }
    let Some(group) = diagram.node(group_id) else {
        return types;
    };
    for cid in &group.child_ids {
        let Some(child) = diagram.node(cid) else {
            continue;
        };
        let found = if child.is_group {
            leaf_types_under(diagram, &child.id, visited)
        } else {
            vec![child.node_type]
        };
        for t in found {
            if t.is_leaf() && !types.contains(&t) {
                types.push(t);
            }
        }
    }
    types
}

fn attach(diagram: &mut Diagram, child: &str, group_id: &str) {
    if let Some(node) = diagram.node_mut(child) {
        node.parent_id = Some(group_id.to_string());
    }
    if let Some(group) = diagram.node_mut(group_id) {
        group.child_ids.insert(child.to_string());
    }
}

/// Refuse a merge that would put `dragged` at `new_depth` with its subtree
/// reaching past [`MAX_DEPTH`].
fn check_depth(diagram: &Diagram, dragged: &str, target: &str, new_depth: usize) -> Result<()> {
    if new_depth + height(diagram, dragged) > MAX_DEPTH {
        return Err(Error::TooDeep {
            node: dragged.to_string(),
            target: target.to_string(),
        });
    }
    Ok(())
}

/// Remove `child` from its parent's children. A parent left empty is removed
/// along with its edges, and the same check runs one level further up.
/// The walk stops at `keep`, which is never dissolved.
fn detach(diagram: &mut Diagram, child: &str, keep: Option<&str>) -> Vec<String> {
    let mut dissolved = Vec::new();
    let mut current = child.to_string();
    while let Some(pid) = diagram.node_mut(&current).and_then(|n| n.parent_id.take()) {
        let emptied = match diagram.node_mut(&pid) {
            Some(parent) => {
                parent.child_ids.shift_remove(&current);
                parent.child_ids.is_empty()
            }
            None => false,
        };
        if !emptied || keep == Some(pid.as_str()) {
            break;
        }
        dissolved.push(pid.clone());
        current = pid;
    }
    for gid in &dissolved {
        tracing::debug!(group = %gid, "dissolving empty group");
        diagram.nodes.retain(|n| n.id != *gid);
        diagram.edges.retain(|e| e.source != *gid && e.target != *gid);
    }
    dissolved
}
