use archcanvas_core::storage::DiagramDir;
use archcanvas_core::{grouping, integrity, Diagram, EdgeKind};
use archcanvas_engine::project;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct DiagramNameRequest {
    /// Name of the diagram
    name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SetDiagramRequest {
    /// Name of the diagram to create or overwrite
    name: String,
    /// The complete diagram as a JSON string: {nodes: [...], edges: [...]}. See get_diagram output for the exact schema. Nodes without a position (or at 0,0) are placed on a grid.
    data: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct MergeNodesRequest {
    /// Name of the diagram
    diagram: String,
    /// ID of the node being moved into a group
    dragged_id: String,
    /// ID of the node it was dropped on. A top-level group absorbs the dragged node; a leaf forms a new group with it (or shares its existing group). Groups nested inside other groups are rejected.
    target_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AddEdgeRequest {
    /// Name of the diagram
    diagram: String,
    /// Source node ID
    source: String,
    /// Target node ID
    target: String,
    /// Optional relationship label, e.g. "reads", "publishes"
    label: Option<String>,
    /// "normal" (default) or "animated"
    kind: Option<EdgeKind>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct EdgeIdRequest {
    /// Name of the diagram
    diagram: String,
    /// ID of the edge
    edge_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct NodeIdRequest {
    /// Name of the diagram
    diagram: String,
    /// ID of the node
    node_id: String,
}

// --- Server ---

#[derive(Clone)]
pub struct CanvasServer {
    dir: DiagramDir,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CanvasServer {
    pub fn new(dir: DiagramDir) -> Self {
        Self {
            dir,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List all available diagrams")]
    fn list_diagrams(&self) -> Result<CallToolResult, McpError> {
        match self.dir.list() {
            Ok(names) => {
                let text = if names.is_empty() {
                    "No diagrams found. Use set_diagram to create one.".to_string()
                } else {
                    names.join("\n")
                };
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }

    #[tool(
        description = "Get the canonical JSON of a diagram: {nodes: [{id, type, label, description, inputs?, outputs?, metadata, position, isGroup, isCollapsed, childIds?, parentId?}], edges: [{id, source, target, label?, kind}]}. For what the canvas actually shows, use get_view."
    )]
    fn get_diagram(
        &self,
        Parameters(req): Parameters<DiagramNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.dir.read_raw(&req.name) {
            Ok(raw) => Ok(CallToolResult::success(vec![Content::text(raw)])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Failed to read diagram '{}': {}",
                req.name, e
            ))])),
        }
    }

    #[tool(
        description = "Create or replace a diagram from JSON. The hierarchy is checked before saving: every parentId must name a group that lists the child, groups must have children, and edges must connect existing nodes."
    )]
    fn set_diagram(
        &self,
        Parameters(req): Parameters<SetDiagramRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut diagram: Diagram = match serde_json::from_str(&req.data) {
            Ok(d) => d,
            Err(e) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Invalid diagram JSON: {}",
                    e
                ))]));
            }
        };

        if let Err(issues) = integrity::validate(&diagram) {
            let text = issues
                .iter()
                .map(|i| format!("- {}", i))
                .collect::<Vec<_>>()
                .join("\n");
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "Diagram failed integrity checks:\n{}",
                text
            ))]));
        }

        grouping::refresh_child_types(&mut diagram);
        place_unpositioned(&mut diagram);

        let node_count = diagram.nodes.len();
        let edge_count = diagram.edges.len();
        match self.dir.write(&req.name, &diagram) {
            Ok(()) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Set diagram '{}' ({} nodes, {} edges)",
                req.name, node_count, edge_count
            ))])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }

    #[tool(
        description = "Get what the canvas renders: expanded groups are replaced by their children, collapsed groups hide theirs and carry a blendedColor, and edges into hidden children are redirected to the group, with self-loops removed and parallel edges merged (labels joined with \", \")."
    )]
    fn get_view(
        &self,
        Parameters(req): Parameters<DiagramNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        let diagram = match self.dir.read(&req.name) {
            Ok(d) => d,
            Err(e) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Failed to read diagram '{}': {}",
                    req.name, e
                ))]));
            }
        };
        let settings = self.dir.read_settings();
        let view = project(&diagram, settings.min_luma);
        let json = serde_json::to_string_pretty(&view)
            .unwrap_or_else(|e| format!("Serialization error: {}", e));
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Merge one node into a group with another, as if dragged onto it on the canvas")]
    fn merge_nodes(
        &self,
        Parameters(req): Parameters<MergeNodesRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(diagram = %req.diagram, dragged = %req.dragged_id, target = %req.target_id, "merge_nodes");
        self.mutate(
            &req.diagram,
            |d| grouping::merge_nodes(d, &req.dragged_id, &req.target_id),
            |outcome| {
                let mut text = if outcome.created {
                    format!("Created group '{}'", outcome.group_id)
                } else {
                    format!("Moved '{}' into group '{}'", req.dragged_id, outcome.group_id)
                };
                if !outcome.dissolved.is_empty() {
                    text.push_str(&format!(
                        "; dissolved empty group(s): {}",
                        outcome.dissolved.join(", ")
                    ));
                }
                text
            },
        )
    }

    #[tool(description = "Add a relationship edge between two nodes")]
    fn add_edge(
        &self,
        Parameters(req): Parameters<AddEdgeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let kind = req.kind.unwrap_or_default();
        self.mutate(
            &req.diagram,
            |d| grouping::add_edge(d, &req.source, &req.target, req.label.clone(), kind),
            |id| format!("Added edge '{}'", id),
        )
    }

    #[tool(description = "Delete an edge by ID")]
    fn delete_edge(
        &self,
        Parameters(req): Parameters<EdgeIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.mutate(
            &req.diagram,
            |d| grouping::delete_edge(d, &req.edge_id),
            |edge| format!("Deleted edge '{}'", edge.id),
        )
    }

    #[tool(
        description = "Delete a node. A group's children go with it, as do all connected edges. A group left empty by the deletion is removed too."
    )]
    fn delete_node(
        &self,
        Parameters(req): Parameters<NodeIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.mutate(
            &req.diagram,
            |d| grouping::delete_node(d, &req.node_id),
            |removed| format!("Deleted {} node(s): {}", removed.len(), removed.join(", ")),
        )
    }

    #[tool(description = "Collapse an expanded group or expand a collapsed one")]
    fn toggle_collapse(
        &self,
        Parameters(req): Parameters<NodeIdRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.mutate(
            &req.diagram,
            |d| grouping::toggle_collapse(d, &req.node_id),
            |collapsed| {
                let state = if *collapsed { "collapsed" } else { "expanded" };
                format!("Group '{}' is now {}", req.node_id, state)
            },
        )
    }

    #[tool(description = "Check a stored diagram's hierarchy and edges without changing it")]
    fn validate_diagram(
        &self,
        Parameters(req): Parameters<DiagramNameRequest>,
    ) -> Result<CallToolResult, McpError> {
        let diagram = match self.dir.read(&req.name) {
            Ok(d) => d,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        };
        let text = match integrity::validate(&diagram) {
            Ok(()) => "No issues found.".to_string(),
            Err(issues) => issues
                .iter()
                .map(|i| format!("- {}", i))
                .collect::<Vec<_>>()
                .join("\n"),
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Show the engine settings in effect (overlap threshold, debounce, luma floor, layout direction)")]
    fn get_settings(&self) -> Result<CallToolResult, McpError> {
        let settings = self.dir.read_settings();
        let json = serde_json::to_string_pretty(&settings)
            .unwrap_or_else(|e| format!("Serialization error: {}", e));
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

#[tool_handler]
impl ServerHandler for CanvasServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// --- Helpers ---

impl CanvasServer {
    /// Read, mutate, write. `describe` turns the mutation's value into the
    /// success message.
    fn mutate<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Diagram) -> archcanvas_core::Result<T>,
        describe: impl FnOnce(&T) -> String,
    ) -> Result<CallToolResult, McpError> {
        let mut diagram = match self.dir.read(name) {
            Ok(d) => d,
            Err(e) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Failed to read diagram '{}': {}",
                    name, e
                ))]));
            }
        };
        let value = match f(&mut diagram) {
            Ok(v) => v,
            Err(e) => return Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        };
        match self.dir.write(name, &diagram) {
            Ok(()) => Ok(CallToolResult::success(vec![Content::text(describe(&value))])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }
}

/// Grid-place top-level-sibling groups of nodes that arrived at (0,0).
fn place_unpositioned(diagram: &mut Diagram) {
    for i in 0..diagram.nodes.len() {
        let pos = diagram.nodes[i].position;
        if pos.x == 0.0 && pos.y == 0.0 {
            let parent = diagram.nodes[i].parent_id.clone();
            let siblings = diagram.nodes[..i]
                .iter()
                .filter(|n| n.parent_id == parent)
                .count();
            diagram.nodes[i].position.x = (siblings % 4) as f64 * 250.0 + 100.0;
            diagram.nodes[i].position.y = (siblings / 4) as f64 * 220.0 + 100.0;
        }
    }
}

const INSTRUCTIONS: &str = r#"archcanvas stores architecture diagrams as nodes (database, cache, server, api, loadbalancer, queue, cdn, gateway, storage, service, or group) and directed edges.

Groups own their children through parentId/childIds. A collapsed group is drawn as one box in place of its children; an expanded group is not drawn at all and its children appear instead.

## Workflow
1. `list_diagrams` to see what exists.
2. `get_view` to see the diagram the way the canvas shows it; `get_diagram` for the full canonical data.
3. Use `merge_nodes` to group nodes, `toggle_collapse` to open or close a group, and `add_edge` / `delete_edge` / `delete_node` for everything else.
4. `validate_diagram` after hand-editing JSON with `set_diagram`."#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dir = DiagramDir::open_default();
    tracing::info!(root = %dir.root().display(), "serving diagrams");

    let service = CanvasServer::new(dir)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "MCP server error"))?;
    service.waiting().await?;
    Ok(())
}
