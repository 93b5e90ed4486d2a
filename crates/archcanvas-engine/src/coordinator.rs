//! Drag lifecycle: Idle → Dragging → (Merging →) Idle.
//!
//! While a node is being dragged the renderer owns its position, so the
//! projection is frozen: `refresh` calls are parked and replayed on release.
//! Only the drop-target highlight is updated during a drag.

use archcanvas_core::{Diagram, EngineSettings};

use crate::detector::MergeDetector;
use crate::geometry::GeometrySource;
use crate::layout::{render, LayoutEngine};
use crate::projection::Projection;
use crate::rate::{Clock, SystemClock};
use crate::store::{DiagramStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub dragged: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { node_id: String },
    /// Waiting on the store. No new drag may start.
    Merging(MergeRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Released with no target; the node stays where it was dropped.
    Dropped { node_id: String },
    Merge(MergeRequest),
}

#[derive(Debug, thiserror::Error)]
pub enum InteractionError {
    #[error("a merge of '{}' into '{}' is still in flight", .0.dragged, .0.target)]
    MergeInFlight(MergeRequest),
    #[error("node '{0}' is already being dragged")]
    AlreadyDragging(String),
    #[error("node '{0}' is not on the canvas")]
    NotVisible(String),
    #[error("no drag in progress")]
    NotDragging,
    #[error("no merge is pending")]
    NoMergePending,
    #[error("merge failed: {0}")]
    MergeFailed(#[from] StoreError),
}

pub struct Coordinator<L, C = SystemClock> {
    settings: EngineSettings,
    layout: L,
    clock: C,
    state: DragState,
    detector: MergeDetector,
    projection: Projection,
    suppress_projection: bool,
    deferred: Option<Diagram>,
}

impl<L: LayoutEngine, C: Clock> Coordinator<L, C> {
    pub fn new(settings: EngineSettings, layout: L, clock: C) -> Self {
        Self {
            detector: MergeDetector::new(&settings),
            settings,
            layout,
            clock,
            state: DragState::Idle,
            projection: Projection::default(),
            suppress_projection: false,
            deferred: None,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn is_projection_suppressed(&self) -> bool {
        self.suppress_projection
    }

    pub fn can_drag(&self) -> bool {
        self.state == DragState::Idle
    }

    /// The canonical diagram changed. Re-projects unless a drag is in
    /// progress, in which case the diagram is kept and applied on release.
    /// Returns whether the projection was recomputed.
    pub fn refresh(&mut self, diagram: &Diagram) -> bool {
        if self.suppress_projection {
            tracing::debug!("projection suppressed during drag; deferring");
            self.deferred = Some(diagram.clone());
            return false;
        }
        self.deferred = None;
        let highlight = self.projection.drop_target().map(str::to_string);
        self.projection = render(diagram, &self.layout, &self.settings);
        self.projection.set_drop_target(highlight.as_deref());
        true
    }

    pub fn drag_start(&mut self, node_id: &str) -> Result<(), InteractionError> {
        match &self.state {
            DragState::Idle => {}
            DragState::Dragging { node_id } => {
                return Err(InteractionError::AlreadyDragging(node_id.clone()))
            }
            DragState::Merging(req) => return Err(InteractionError::MergeInFlight(req.clone())),
        }
        if !self.projection.contains(node_id) {
            return Err(InteractionError::NotVisible(node_id.to_string()));
        }
        self.detector.reset();
        self.suppress_projection = true;
        self.state = DragState::Dragging {
            node_id: node_id.to_string(),
        };
        tracing::debug!(node = node_id, "drag started");
        Ok(())
    }

    /// Pointer moved. Samples geometry (throttled) and updates the highlight.
    /// Returns the settled drop target.
    pub fn drag_tick(&mut self, geometry: &dyn GeometrySource) -> Result<Option<String>, InteractionError> {
        let DragState::Dragging { node_id } = &self.state else {
            return Err(InteractionError::NotDragging);
        };
        let now = self.clock.now();
        let target = self
            .detector
            .tick(node_id, &self.projection.nodes, geometry, now)
            .map(str::to_string);
        self.projection.set_drop_target(target.as_deref());
        Ok(target)
    }

    /// Frame callback with no pointer movement: lets a pending target settle.
    pub fn poll(&mut self) -> Option<String> {
        if !matches!(self.state, DragState::Dragging { .. }) {
            return None;
        }
        let now = self.clock.now();
        let target = self.detector.poll(now).map(str::to_string);
        self.projection.set_drop_target(target.as_deref());
        target
    }

    /// Pointer released. Either finishes the drag or hands back a merge that
    /// the caller must send to the store and report via [`Self::merge_resolved`].
    pub fn drag_stop(&mut self) -> Result<DragOutcome, InteractionError> {
        let DragState::Dragging { node_id } = &self.state else {
            return Err(InteractionError::NotDragging);
        };
        let node_id = node_id.clone();
        let now = self.clock.now();
        let target = self
            .detector
            .poll(now)
            .filter(|t| *t != node_id)
            .map(str::to_string);
        self.detector.reset();

        self.suppress_projection = false;
        if let Some(diagram) = self.deferred.take() {
            self.refresh(&diagram);
        }

        match target {
            Some(target) => {
                let req = MergeRequest {
                    dragged: node_id,
                    target,
                };
                self.projection.set_drop_target(Some(&req.target));
                self.state = DragState::Merging(req.clone());
                tracing::debug!(dragged = %req.dragged, target = %req.target, "requesting merge");
                Ok(DragOutcome::Merge(req))
            }
            None => {
                self.projection.set_drop_target(None);
                self.state = DragState::Idle;
                Ok(DragOutcome::Dropped { node_id })
            }
        }
    }

    /// Report the store's answer to the pending merge. On success the new
    /// diagram is projected; on failure the old projection stays and the
    /// error is handed back for display.
    pub fn merge_resolved(&mut self, result: Result<Diagram, StoreError>) -> Result<(), InteractionError> {
        let DragState::Merging(req) = &self.state else {
            return Err(InteractionError::NoMergePending);
        };
        let req = req.clone();
        self.state = DragState::Idle;
        self.projection.set_drop_target(None);
        match result {
            Ok(diagram) => {
                tracing::info!(dragged = %req.dragged, target = %req.target, "merge applied");
                self.refresh(&diagram);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(dragged = %req.dragged, target = %req.target, error = %e, "merge failed");
                Err(InteractionError::MergeFailed(e))
            }
        }
    }

    /// [`Self::drag_stop`] followed by the merge round-trip, if any. The
    /// coordinator stays borrowed until the store answers.
    pub async fn finish_drag<S>(&mut self, store: &S) -> Result<DragOutcome, InteractionError>
    where
        S: DiagramStore + ?Sized,
    {
        let outcome = self.drag_stop()?;
        if let DragOutcome::Merge(req) = &outcome {
            let result = store.merge_nodes(&req.dragged, &req.target).await;
            self.merge_resolved(result)?;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::layout::PassthroughLayout;
    use crate::rate::VirtualClock;
    use archcanvas_core::{Node, NodeType};
    use std::collections::HashMap;

    fn coordinator() -> (Coordinator<PassthroughLayout, VirtualClock>, VirtualClock) {
        let clock = VirtualClock::new();
        let mut c = Coordinator::new(EngineSettings::default(), PassthroughLayout, clock.clone());
        c.refresh(&Diagram::new(
            vec![
                Node::leaf("a", NodeType::Api, "A"),
                Node::leaf("b", NodeType::Database, "B"),
            ],
            vec![],
        ));
        (c, clock)
    }

    fn overlapping() -> HashMap<String, Rect> {
        [
            ("a".to_string(), Rect::new(0.0, 0.0, 100.0, 100.0)),
            ("b".to_string(), Rect::new(40.0, 0.0, 100.0, 100.0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn release_without_target_returns_to_idle() {
        let (mut c, clock) = coordinator();
        c.drag_start("a").unwrap();
        assert!(c.is_projection_suppressed());
        let apart: HashMap<String, Rect> = [
            ("a".to_string(), Rect::new(0.0, 0.0, 10.0, 10.0)),
            ("b".to_string(), Rect::new(500.0, 0.0, 10.0, 10.0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(c.drag_tick(&apart).unwrap(), None);
        clock.advance_ms(100);
        assert_eq!(c.drag_tick(&apart).unwrap(), None);
        assert_eq!(
            c.drag_stop().unwrap(),
            DragOutcome::Dropped {
                node_id: "a".into()
            }
        );
        assert_eq!(c.state(), &DragState::Idle);
        assert!(!c.is_projection_suppressed());
    }

    #[test]
    fn poll_settles_target_without_movement() {
        let (mut c, clock) = coordinator();
        c.drag_start("a").unwrap();
        assert_eq!(c.drag_tick(&overlapping()).unwrap(), None);
        clock.advance_ms(50);
        assert_eq!(c.poll().as_deref(), Some("b"));
        assert!(c.projection().node("b").unwrap().drop_target);
    }

    #[test]
    fn unknown_or_hidden_nodes_cannot_be_dragged() {
        let (mut c, _) = coordinator();
        assert!(matches!(c.drag_start("zzz"), Err(InteractionError::NotVisible(_))));
        assert!(matches!(c.drag_stop(), Err(InteractionError::NotDragging)));
        assert!(matches!(c.merge_resolved(Ok(Diagram::default())), Err(InteractionError::NoMergePending)));
    }
}
