use std::cell::Cell;
use std::collections::HashMap;

use archcanvas_core::storage::DiagramDir;
use archcanvas_core::{Diagram, Direction, Edge, EdgeKind, EngineSettings, Node, NodeType};
use archcanvas_engine::store::StoreResult;
use archcanvas_engine::{
    Coordinator, DiagramStore, DragOutcome, DragState, FileStore, InteractionError, LayoutEngine,
    MemoryStore, MergeRequest, PositionedNode, Rect, StoreError, VirtualClock, VisibleNode,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;

/// Passthrough layout that counts how often it runs.
#[derive(Default)]
struct CountingLayout {
    calls: Cell<usize>,
}

impl LayoutEngine for CountingLayout {
    fn layout(&self, nodes: &[VisibleNode], _edges: &[Edge], _direction: Direction) -> Vec<PositionedNode> {
        self.calls.set(self.calls.get() + 1);
        nodes
            .iter()
            .map(|n| PositionedNode {
                id: n.node.id.clone(),
                position: n.node.position,
            })
            .collect()
    }
}

/// A grouping service that is always down.
struct OfflineStore;

#[async_trait]
impl DiagramStore for OfflineStore {
    async fn diagram(&self) -> StoreResult<Diagram> {
        Err(StoreError::Unavailable("offline".into()))
    }
    async fn merge_nodes(&self, _dragged: &str, _target: &str) -> StoreResult<Diagram> {
        Err(StoreError::Unavailable("offline".into()))
    }
    async fn add_edge(&self, _: &str, _: &str, _: Option<String>, _: EdgeKind) -> StoreResult<Diagram> {
        Err(StoreError::Unavailable("offline".into()))
    }
    async fn delete_edge(&self, _: &str) -> StoreResult<Diagram> {
        Err(StoreError::Unavailable("offline".into()))
    }
    async fn delete_node(&self, _: &str) -> StoreResult<Diagram> {
        Err(StoreError::Unavailable("offline".into()))
    }
    async fn toggle_collapse(&self, _: &str) -> StoreResult<Diagram> {
        Err(StoreError::Unavailable("offline".into()))
    }
}

fn diagram() -> Diagram {
    Diagram::new(
        vec![
            Node::leaf("node-1", NodeType::Api, "API"),
            Node::leaf("node-2", NodeType::Database, "Orders DB"),
            Node::leaf("node-3", NodeType::Cache, "Redis"),
        ],
        vec![
            Edge::new("edge-node-1-node-2", "node-1", "node-2").with_label("writes"),
            Edge::new("edge-node-1-node-3", "node-1", "node-3").with_label("reads"),
        ],
    )
}

/// node-3 dragged mostly on top of node-2.
fn hovering() -> HashMap<String, Rect> {
    [
        ("node-1".to_string(), Rect::new(0.0, 0.0, 120.0, 60.0)),
        ("node-2".to_string(), Rect::new(0.0, 200.0, 120.0, 60.0)),
        ("node-3".to_string(), Rect::new(20.0, 210.0, 120.0, 60.0)),
    ]
    .into_iter()
    .collect()
}

fn drag_onto_target<L: LayoutEngine>(c: &mut Coordinator<L, VirtualClock>, clock: &VirtualClock) {
    c.drag_start("node-3").unwrap();
    assert_eq!(c.drag_tick(&hovering()).unwrap(), None);
    clock.advance_ms(20);
    assert_eq!(c.drag_tick(&hovering()).unwrap(), None);
    clock.advance_ms(40);
    assert_eq!(c.drag_tick(&hovering()).unwrap().as_deref(), Some("node-2"));
    assert!(c.projection().node("node-2").unwrap().drop_target);
}

#[tokio::test]
async fn dropping_onto_a_node_merges_and_reprojects() {
    let store = MemoryStore::new(diagram());
    let clock = VirtualClock::new();
    let mut c = Coordinator::new(EngineSettings::default(), CountingLayout::default(), clock.clone());
    c.refresh(&store.diagram().await.unwrap());

    drag_onto_target(&mut c, &clock);
    let outcome = c.finish_drag(&store).await.unwrap();
    assert_eq!(
        outcome,
        DragOutcome::Merge(MergeRequest {
            dragged: "node-3".into(),
            target: "node-2".into(),
        })
    );
    assert_eq!(c.state(), &DragState::Idle);

    let ids: Vec<&str> = c.projection().nodes.iter().map(|n| n.id()).collect();
    assert_eq!(ids, vec!["node-1", "group-1"]);
    let group = c.projection().node("group-1").unwrap();
    assert!(group.blended_color.is_some());
    assert!(!group.drop_target);

    assert_eq!(c.projection().edges.len(), 1);
    let edge = &c.projection().edges[0];
    assert_eq!(edge.id, "edge-node-1-node-2");
    assert_eq!(edge.target, "group-1");
    assert_eq!(edge.label.as_deref(), Some("writes, reads"));
}

#[tokio::test]
async fn failed_merge_keeps_prior_state_and_clears_highlight() {
    let clock = VirtualClock::new();
    let mut c = Coordinator::new(EngineSettings::default(), CountingLayout::default(), clock.clone());
    c.refresh(&diagram());
    let before: Vec<String> = c.projection().nodes.iter().map(|n| n.id().to_string()).collect();

    drag_onto_target(&mut c, &clock);
    let err = c.finish_drag(&OfflineStore).await.unwrap_err();
    assert!(matches!(err, InteractionError::MergeFailed(StoreError::Unavailable(_))));

    assert_eq!(c.state(), &DragState::Idle);
    assert!(c.can_drag());
    assert_eq!(c.projection().drop_target(), None);
    let after: Vec<String> = c.projection().nodes.iter().map(|n| n.id().to_string()).collect();
    assert_eq!(after, before);
}

#[tokio::test]
async fn rejected_merge_surfaces_the_store_error() {
    // A refused merge leaves the stored diagram untouched.
    let mut d = diagram();
    archcanvas_core::grouping::merge_nodes(&mut d, "node-1", "node-2").unwrap();
    let store = MemoryStore::new(d.clone());
    let err = store.merge_nodes("node-3", "node-3").await.unwrap_err();
    assert!(matches!(err, StoreError::Rejected(archcanvas_core::Error::SelfMerge(_))));
    assert_eq!(store.diagram().await.unwrap(), d);
}

#[test]
fn no_new_drag_while_a_merge_is_in_flight() {
    let clock = VirtualClock::new();
    let mut c = Coordinator::new(EngineSettings::default(), CountingLayout::default(), clock.clone());
    c.refresh(&diagram());
    drag_onto_target(&mut c, &clock);

    let DragOutcome::Merge(req) = c.drag_stop().unwrap() else {
        panic!("expected a merge request");
    };
    assert!(!c.is_projection_suppressed());
    assert!(matches!(c.drag_start("node-1"), Err(InteractionError::MergeInFlight(r)) if r == req));

    let mut merged = diagram();
    archcanvas_core::grouping::merge_nodes(&mut merged, &req.dragged, &req.target).unwrap();
    c.merge_resolved(Ok(merged)).unwrap();
    c.drag_start("node-1").unwrap();
}

#[test]
fn projection_and_layout_are_frozen_while_dragging() {
    let clock = VirtualClock::new();
    let layout = CountingLayout::default();
    let mut c = Coordinator::new(EngineSettings::default(), &layout, clock.clone());
    c.refresh(&diagram());
    assert_eq!(layout.calls.get(), 1);

    c.drag_start("node-3").unwrap();
    let mut changed = diagram();
    changed.nodes.push(Node::leaf("node-4", NodeType::Queue, "Jobs"));
    assert!(!c.refresh(&changed));
    for _ in 0..5 {
        clock.advance_ms(16);
        c.drag_tick(&hovering()).unwrap();
    }
    assert_eq!(layout.calls.get(), 1);
    assert!(c.projection().node("node-4").is_none());

    // Released far from anything: the parked diagram is applied once.
    let apart: HashMap<String, Rect> = [("node-3".to_string(), Rect::new(900.0, 900.0, 10.0, 10.0))]
        .into_iter()
        .collect();
    clock.advance_ms(16);
    c.drag_tick(&apart).unwrap();
    assert_eq!(c.drag_stop().unwrap(), DragOutcome::Dropped { node_id: "node-3".into() });
    assert_eq!(layout.calls.get(), 2);
    assert!(c.projection().node("node-4").is_some());
}

#[test]
fn dragging_a_node_without_geometry_is_a_no_op() {
    let clock = VirtualClock::new();
    let mut c = Coordinator::new(EngineSettings::default(), CountingLayout::default(), clock.clone());
    c.refresh(&diagram());
    c.drag_start("node-1").unwrap();
    let empty: HashMap<String, Rect> = HashMap::new();
    for _ in 0..10 {
        clock.advance_ms(20);
        assert_eq!(c.drag_tick(&empty).unwrap(), None);
    }
    assert!(matches!(c.drag_stop().unwrap(), DragOutcome::Dropped { .. }));
}

#[tokio::test]
async fn file_store_persists_merges() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = DiagramDir::new(tmp.path());
    dir.write("shop", &diagram()).unwrap();
    let store = FileStore::new(dir.clone(), "shop");

    store.merge_nodes("node-3", "node-2").await.unwrap();
    let toggled = store.toggle_collapse("group-1").await.unwrap();
    assert!(!toggled.node("group-1").unwrap().is_collapsed);

    let on_disk = dir.read("shop").unwrap();
    assert_eq!(on_disk, toggled);
    assert!(matches!(
        store.toggle_collapse("node-1").await,
        Err(StoreError::Rejected(archcanvas_core::Error::NotAGroup(_)))
    ));
    assert_eq!(dir.read("shop").unwrap(), toggled);
}
