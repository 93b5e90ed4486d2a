//! Edge redirection for collapsed groups.
//!
//! An edge into a collapsed group's child is re-pointed at the group. Edges
//! that become self-loops are dropped, and parallel edges between the same
//! ordered pair collapse into one carrying every distinct label.

use std::collections::HashMap;

use archcanvas_core::{Edge, EdgeKind, Node};
use indexmap::IndexMap;

use crate::projection::collapsed_parent;

struct MergedEdge {
    edge: Edge,
    labels: Vec<String>,
}

/// Redirect, drop self-loops, and deduplicate. Output order follows the
/// first edge seen for each `(source, target)` pair, and each merged edge
/// keeps that first edge's id.
pub fn redirect(edges: &[Edge], nodes: &[Node]) -> Vec<Edge> {
    let index: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let resolve = |node: &Node| -> String {
        collapsed_parent(&index, node)
            .map(|p| p.id.clone())
            .unwrap_or_else(|| node.id.clone())
    };

    let mut merged: IndexMap<(String, String), MergedEdge> = IndexMap::new();
    for edge in edges {
        let (Some(src), Some(dst)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) else {
            tracing::warn!(edge = %edge.id, "dropping edge with missing endpoint");
            continue;
        };
        let source = resolve(src);
        let target = resolve(dst);
        if source == target {
            tracing::debug!(edge = %edge.id, node = %source, "dropping collapsed self-loop");
            continue;
        }

        let entry = merged
            .entry((source.clone(), target.clone()))
            .or_insert_with(|| MergedEdge {
                edge: Edge {
                    id: edge.id.clone(),
                    source,
                    target,
                    label: None,
                    kind: EdgeKind::Normal,
                },
                labels: Vec::new(),
            });
        if let Some(label) = edge.label.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            if !entry.labels.iter().any(|l| l == label) {
                entry.labels.push(label.to_string());
            }
        }
        if edge.kind == EdgeKind::Animated {
            entry.edge.kind = EdgeKind::Animated;
        }
    }

    merged
        .into_values()
        .map(|m| {
            let mut edge = m.edge;
            if !m.labels.is_empty() {
                edge.label = Some(m.labels.join(", "));
            }
            edge
        })
        .collect()
}
