//! Drop-target detection while a node is being dragged.

use std::time::Duration;

use archcanvas_core::EngineSettings;

use crate::geometry::{GeometrySource, Rect};
use crate::projection::VisibleNode;
use crate::rate::{Debouncer, FrameThrottle};

#[derive(Debug, Clone, PartialEq)]
pub struct DropCandidate {
    pub id: String,
    pub area: f64,
    /// Intersection area over the smaller of the two rectangles.
    pub overlap: f64,
}

/// Nodes the dragged node may be merged into: everything visible except the
/// dragged node itself and groups that already sit inside another group.
pub fn eligible_targets<'a>(
    dragged: &'a str,
    visible: &'a [VisibleNode],
) -> impl Iterator<Item = &'a VisibleNode> + 'a {
    visible
        .iter()
        .filter(move |n| n.id() != dragged)
        .filter(|n| !(n.node.is_group && n.node.parent_id.is_some()))
}

/// Pick the candidate with the largest intersection among those covering
/// more than `threshold` of the smaller rectangle.
pub fn find_drop_target<'a, I>(dragged: &Rect, candidates: I, threshold: f64) -> Option<DropCandidate>
where
    I: IntoIterator<Item = (&'a str, Rect)>,
{
    let dragged_area = dragged.area();
    let mut best: Option<DropCandidate> = None;
    for (id, rect) in candidates {
        let Some(overlap_rect) = dragged.intersection(&rect) else {
            continue;
        };
        let smaller = dragged_area.min(rect.area());
        if smaller <= 0.0 {
            continue;
        }
        let area = overlap_rect.area();
        let overlap = area / smaller;
        if overlap <= threshold {
            continue;
        }
        if best.as_ref().map_or(true, |b| area > b.area) {
            best = Some(DropCandidate {
                id: id.to_string(),
                area,
                overlap,
            });
        }
    }
    best
}

/// Samples geometry at most once per frame and only reports a target after
/// it has stayed the same for the debounce window.
#[derive(Debug, Clone)]
pub struct MergeDetector {
    threshold: f64,
    throttle: FrameThrottle,
    debouncer: Debouncer<String>,
}

impl MergeDetector {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            threshold: settings.overlap_threshold,
            throttle: FrameThrottle::new(Duration::from_millis(settings.frame_interval_ms)),
            debouncer: Debouncer::new(Duration::from_millis(settings.debounce_ms)),
        }
    }

    /// One drag tick. Returns the settled drop target.
    pub fn tick(
        &mut self,
        dragged: &str,
        visible: &[VisibleNode],
        geometry: &dyn GeometrySource,
        now: Duration,
    ) -> Option<&str> {
        if !self.throttle.ready(now) {
            return self.poll(now);
        }
        let Some(dragged_rect) = geometry.rect(dragged) else {
            tracing::debug!(dragged, "no geometry for dragged node");
            return self.poll(now);
        };

        let candidates = eligible_targets(dragged, visible)
            .filter_map(|n| geometry.rect(n.id()).map(|r| (n.id(), r)));
        let raw = find_drop_target(&dragged_rect, candidates, self.threshold);
        if let Some(c) = &raw {
            tracing::debug!(dragged, target = %c.id, overlap = c.overlap, "drop candidate");
        }
        self.debouncer
            .update(raw.map(|c| c.id), now)
            .map(String::as_str)
    }

    /// Let a pending target settle without a new geometry sample.
    pub fn poll(&mut self, now: Duration) -> Option<&str> {
        self.debouncer.poll(now).map(String::as_str)
    }

    pub fn current(&self) -> Option<&str> {
        self.debouncer.settled().map(String::as_str)
    }

    pub fn reset(&mut self) {
        self.throttle.reset();
        self.debouncer.reset();
    }
}
