//! Async access to the canonical diagram.
//!
//! The coordinator only ever talks to a [`DiagramStore`]; whether the diagram
//! lives in memory, on disk, or behind a remote service is up to the
//! implementation. Every mutation resolves to the full updated diagram.

use async_trait::async_trait;
use tokio::sync::Mutex;

use archcanvas_core::grouping;
use archcanvas_core::storage::DiagramDir;
use archcanvas_core::{Diagram, EdgeKind};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Rejected(#[from] archcanvas_core::Error),
    #[error("diagram store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait DiagramStore: Send + Sync {
    async fn diagram(&self) -> StoreResult<Diagram>;

    /// Put `dragged` into a group with `target`.
    async fn merge_nodes(&self, dragged: &str, target: &str) -> StoreResult<Diagram>;

    async fn add_edge(
        &self,
        source: &str,
        target: &str,
        label: Option<String>,
        kind: EdgeKind,
    ) -> StoreResult<Diagram>;

    async fn delete_edge(&self, edge_id: &str) -> StoreResult<Diagram>;

    async fn delete_node(&self, node_id: &str) -> StoreResult<Diagram>;

    async fn toggle_collapse(&self, node_id: &str) -> StoreResult<Diagram>;
}

/// Apply `f` to a copy and keep the copy only if `f` succeeds.
fn apply<T>(
    diagram: &mut Diagram,
    f: impl FnOnce(&mut Diagram) -> archcanvas_core::Result<T>,
) -> StoreResult<Diagram> {
    let mut next = diagram.clone();
    f(&mut next)?;
    *diagram = next;
    Ok(diagram.clone())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    diagram: Mutex<Diagram>,
}

impl MemoryStore {
    pub fn new(diagram: Diagram) -> Self {
        Self {
            diagram: Mutex::new(diagram),
        }
    }

    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Diagram) -> archcanvas_core::Result<T> + Send,
    ) -> StoreResult<Diagram> {
        let mut guard = self.diagram.lock().await;
        apply(&mut guard, f)
    }
}

#[async_trait]
impl DiagramStore for MemoryStore {
    async fn diagram(&self) -> StoreResult<Diagram> {
        Ok(self.diagram.lock().await.clone())
    }

    async fn merge_nodes(&self, dragged: &str, target: &str) -> StoreResult<Diagram> {
        self.mutate(|d| grouping::merge_nodes(d, dragged, target)).await
    }

    async fn add_edge(
        &self,
        source: &str,
        target: &str,
        label: Option<String>,
        kind: EdgeKind,
    ) -> StoreResult<Diagram> {
        self.mutate(|d| grouping::add_edge(d, source, target, label, kind)).await
    }

    async fn delete_edge(&self, edge_id: &str) -> StoreResult<Diagram> {
        self.mutate(|d| grouping::delete_edge(d, edge_id)).await
    }

    async fn delete_node(&self, node_id: &str) -> StoreResult<Diagram> {
        self.mutate(|d| grouping::delete_node(d, node_id)).await
    }

    async fn toggle_collapse(&self, node_id: &str) -> StoreResult<Diagram> {
        self.mutate(|d| grouping::toggle_collapse(d, node_id)).await
    }
}

/// A named diagram inside a [`DiagramDir`]. Each mutation is a full
/// read-modify-write of the file.
#[derive(Debug)]
pub struct FileStore {
    dir: DiagramDir,
    name: String,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: DiagramDir, name: impl Into<String>) -> Self {
        Self {
            dir,
            name: name.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Diagram) -> archcanvas_core::Result<T> + Send,
    ) -> StoreResult<Diagram> {
        let _guard = self.lock.lock().await;
        let mut diagram = self.dir.read(&self.name)?;
        let updated = apply(&mut diagram, f)?;
        self.dir.write(&self.name, &updated)?;
        Ok(updated)
    }
}

#[async_trait]
impl DiagramStore for FileStore {
    async fn diagram(&self) -> StoreResult<Diagram> {
        Ok(self.dir.read(&self.name)?)
    }

    async fn merge_nodes(&self, dragged: &str, target: &str) -> StoreResult<Diagram> {
        self.mutate(|d| grouping::merge_nodes(d, dragged, target)).await
    }

    async fn add_edge(
        &self,
        source: &str,
        target: &str,
        label: Option<String>,
        kind: EdgeKind,
    ) -> StoreResult<Diagram> {
        self.mutate(|d| grouping::add_edge(d, source, target, label, kind)).await
    }

    async fn delete_edge(&self, edge_id: &str) -> StoreResult<Diagram> {
        self.mutate(|d| grouping::delete_edge(d, edge_id)).await
    }

    async fn delete_node(&self, node_id: &str) -> StoreResult<Diagram> {
        self.mutate(|d| grouping::delete_node(d, node_id)).await
    }

    async fn toggle_collapse(&self, node_id: &str) -> StoreResult<Diagram> {
        self.mutate(|d| grouping::toggle_collapse(d, node_id)).await
    }
}
