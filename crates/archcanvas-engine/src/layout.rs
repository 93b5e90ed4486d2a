//! The layout seam. Positioning itself is somebody else's problem: the
//! engine hands over the projected graph and copies back whatever positions
//! come out.

use std::collections::HashMap;

use archcanvas_core::{Diagram, Direction, Edge, EngineSettings, Position};

use crate::projection::{project, Projection, VisibleNode};

#[derive(Debug, Clone, PartialEq)]
pub struct PositionedNode {
    pub id: String,
    pub position: Position,
}

/// A pure layout function. Implementations may be called repeatedly with the
/// same input and must return the same positions each time.
pub trait LayoutEngine {
    fn layout(&self, nodes: &[VisibleNode], edges: &[Edge], direction: Direction) -> Vec<PositionedNode>;
}

/// Leaves every node where the canonical diagram put it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughLayout;

impl LayoutEngine for PassthroughLayout {
    fn layout(&self, nodes: &[VisibleNode], _edges: &[Edge], _direction: Direction) -> Vec<PositionedNode> {
        nodes
            .iter()
            .map(|n| PositionedNode {
                id: n.node.id.clone(),
                position: n.node.position,
            })
            .collect()
    }
}

impl<T: LayoutEngine + ?Sized> LayoutEngine for &T {
    fn layout(&self, nodes: &[VisibleNode], edges: &[Edge], direction: Direction) -> Vec<PositionedNode> {
        (**self).layout(nodes, edges, direction)
    }
}

impl<T: LayoutEngine + ?Sized> LayoutEngine for Box<T> {
    fn layout(&self, nodes: &[VisibleNode], edges: &[Edge], direction: Direction) -> Vec<PositionedNode> {
        (**self).layout(nodes, edges, direction)
    }
}

/// Project the diagram and run it through `layout`. Nodes the layout does
/// not mention keep their canonical position.
pub fn render<L: LayoutEngine + ?Sized>(diagram: &Diagram, layout: &L, settings: &EngineSettings) -> Projection {
    let mut projection = project(diagram, settings.min_luma);
    let placed: HashMap<String, Position> = layout
        .layout(&projection.nodes, &projection.edges, settings.direction)
        .into_iter()
        .map(|p| (p.id, p.position))
        .collect();
    for node in &mut projection.nodes {
        if let Some(pos) = placed.get(&node.node.id) {
            node.node.position = *pos;
        }
    }
    projection
}
