//! Structural checks for the canonical diagram.
//!
//! The projection side never relies on these passing; it drops whatever it
//! cannot resolve. They exist so mutations and imports can refuse to persist
//! a broken hierarchy in the first place.

use std::collections::HashSet;

use crate::{Diagram, Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityIssue {
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),
    #[error("duplicate edge id '{0}'")]
    DuplicateEdge(String),
    #[error("node '{child}' references missing parent '{parent}'")]
    MissingParent { child: String, parent: String },
    #[error("node '{child}' has parent '{parent}' which is not a group")]
    ParentNotGroup { child: String, parent: String },
    #[error("group '{parent}' does not list child '{child}'")]
    ChildNotListed { child: String, parent: String },
    #[error("group '{parent}' lists '{child}' which does not point back")]
    ChildNotBacklinked { child: String, parent: String },
    #[error("group '{0}' has no children")]
    EmptyGroup(String),
    #[error("node '{0}' has children but is not a group")]
    ChildrenOnLeaf(String),
    #[error("edge '{edge}' references missing node '{node}'")]
    DanglingEdge { edge: String, node: String },
    #[error("node '{0}' is part of a parent cycle")]
    ParentCycle(String),
}

/// Run every structural check. Returns all issues found, not just the first.
pub fn validate(diagram: &Diagram) -> std::result::Result<(), Vec<IntegrityIssue>> {
    let mut issues = Vec::new();
    let index = diagram.index();

    let mut seen = HashSet::new();
    for node in &diagram.nodes {
        if !seen.insert(node.id.as_str()) {
            issues.push(IntegrityIssue::DuplicateNode(node.id.clone()));
        }
    }
    let mut seen = HashSet::new();
    for edge in &diagram.edges {
        if !seen.insert(edge.id.as_str()) {
            issues.push(IntegrityIssue::DuplicateEdge(edge.id.clone()));
        }
    }

    for node in &diagram.nodes {
        if let Some(pid) = &node.parent_id {
            match index.get(pid.as_str()) {
                None => issues.push(IntegrityIssue::MissingParent {
                    child: node.id.clone(),
                    parent: pid.clone(),
                }),
                Some(parent) if !parent.is_group => issues.push(IntegrityIssue::ParentNotGroup {
                    child: node.id.clone(),
                    parent: pid.clone(),
                }),
                Some(parent) if !parent.child_ids.contains(&node.id) => {
                    issues.push(IntegrityIssue::ChildNotListed {
                        child: node.id.clone(),
                        parent: pid.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        if node.is_group && node.child_ids.is_empty() {
            issues.push(IntegrityIssue::EmptyGroup(node.id.clone()));
        }
        if !node.is_group && !node.child_ids.is_empty() {
            issues.push(IntegrityIssue::ChildrenOnLeaf(node.id.clone()));
        }
        for cid in &node.child_ids {
            let backlinked = index
                .get(cid.as_str())
                .is_some_and(|c| c.parent_id.as_deref() == Some(node.id.as_str()));
            if !backlinked {
                issues.push(IntegrityIssue::ChildNotBacklinked {
                    child: cid.clone(),
                    parent: node.id.clone(),
                });
            }
        }
    }

    for node in &diagram.nodes {
        if in_cycle(diagram, &node.id) {
            issues.push(IntegrityIssue::ParentCycle(node.id.clone()));
        }
    }

    for edge in &diagram.edges {
        for end in [&edge.source, &edge.target] {
            if !index.contains_key(end.as_str()) {
                issues.push(IntegrityIssue::DanglingEdge {
                    edge: edge.id.clone(),
                    node: end.clone(),
                });
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Like [`validate`] but folded into the crate error.
pub fn ensure_valid(diagram: &Diagram) -> Result<()> {
    validate(diagram).map_err(Error::Integrity)
}

fn in_cycle(diagram: &Diagram, start: &str) -> bool {
    let mut visited = HashSet::new();
    let mut cursor = diagram.node(start).and_then(|n| n.parent_id.as_deref());
    while let Some(id) = cursor {
        if id == start {
            return true;
        }
        if !visited.insert(id) {
            // A cycle further up that does not include `start`.
            return false;
        }
        cursor = diagram.node(id).and_then(|n| n.parent_id.as_deref());
    }
    false
}

/// Refuse to set `child.parent_id = new_parent` if `new_parent` already sits
/// somewhere below `child` (or is `child` itself).
pub fn check_acyclic(diagram: &Diagram, child: &str, new_parent: &str) -> Result<()> {
    let cycle = || Error::ParentCycle {
        child: child.to_string(),
        parent: new_parent.to_string(),
    };
    let mut visited = HashSet::new();
    let mut cursor = Some(new_parent);
    while let Some(id) = cursor {
        if id == child || !visited.insert(id) {
            return Err(cycle());
        }
        cursor = diagram.node(id).and_then(|n| n.parent_id.as_deref());
    }
    Ok(())
}

/// Deepest nesting the grouping operations will produce: a leaf inside a
/// group inside a top-level group.
pub const MAX_DEPTH: usize = 2;

/// Levels of nodes below `id`: zero for a leaf, one for a group holding only
/// leaves.
pub fn height(diagram: &Diagram, id: &str) -> usize {
    fn walk<'a>(diagram: &'a Diagram, id: &'a str, visited: &mut HashSet<&'a str>) -> usize {
        if !visited.insert(id) {
            return 0;
        }
        let Some(node) = diagram.node(id) else {
            return 0;
        };
        node.child_ids
            .iter()
            .map(|c| 1 + walk(diagram, c, visited))
            .max()
            .unwrap_or(0)
    }
    walk(diagram, id, &mut HashSet::new())
}

/// Number of groups above `id`.
pub fn depth(diagram: &Diagram, id: &str) -> usize {
    let mut visited = HashSet::new();
    let mut cursor = diagram.node(id).and_then(|n| n.parent_id.as_deref());
    let mut depth = 0;
    while let Some(pid) = cursor {
        if !visited.insert(pid) {
            break;
        }
        depth += 1;
        cursor = diagram.node(pid).and_then(|n| n.parent_id.as_deref());
    }
    depth
}
