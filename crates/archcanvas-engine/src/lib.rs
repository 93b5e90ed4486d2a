//! Projection and interaction engine for archcanvas diagrams.
//!
//! The canonical [`Diagram`](archcanvas_core::Diagram) is turned into a
//! renderable [`Projection`] (collapsed groups stand in for their children,
//! edges are redirected and deduplicated), and pointer drags are interpreted
//! as merge requests by the [`Coordinator`].

pub mod color;
pub mod coordinator;
pub mod detector;
pub mod edges;
pub mod geometry;
pub mod layout;
pub mod projection;
pub mod rate;
pub mod store;

pub use color::{blend, group_color, type_color};
pub use coordinator::{Coordinator, DragOutcome, DragState, InteractionError, MergeRequest};
pub use detector::{find_drop_target, MergeDetector};
pub use edges::redirect;
pub use geometry::{GeometrySource, Rect};
pub use layout::{render, LayoutEngine, PassthroughLayout, PositionedNode};
pub use projection::{project, Projection, VisibleNode};
pub use rate::{Clock, SystemClock, VirtualClock};
pub use store::{DiagramStore, FileStore, MemoryStore, StoreError};
