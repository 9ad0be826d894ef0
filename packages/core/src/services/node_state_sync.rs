//! Node State Sync
//!
//! Owns the canonical node list of the loaded canvas and routes every
//! mutation to the right persistence path.
//!
//! # Architecture
//!
//! ```text
//! view change / user edit
//!         │
//!         ▼
//!   NodeStateSync ── apply locally first
//!         │
//!         ├── field edits ──────► DebouncedFieldWriter ──┐
//!         ├── drag completions ─► PositionBatchWriter ───┤
//!         └── title, size, flags,                       ├──► RemoteStore
//!             create, delete ─── immediate write ───────┘
//! ```
//!
//! Edits are optimistic: local state changes before the network call. Field
//! and position writes never roll back; immediate writes revert the one
//! attribute they changed when the server refuses.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dealcanvas_core::config::SyncConfig;
//! use dealcanvas_core::db::InMemoryStore;
//! use dealcanvas_core::models::CanvasId;
//! use dealcanvas_core::services::NodeStateSync;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryStore::new());
//! let mut sync = NodeStateSync::new(store, SyncConfig::default());
//! sync.load(CanvasId(1)).await?;
//! for node in sync.nodes() {
//!     println!("{} {}", node.node_type, node.title);
//! }
//! sync.close().await;
//! # Ok(())
//! # }
//! ```

use crate::config::SyncConfig;
use crate::db::RemoteStore;
use crate::graph_view::{self, NodeChange, ViewNode};
use crate::models::{
    Canvas, CanvasId, CanvasUpdate, NewNode, Node, NodeFields, NodeId, NodeType, NodeUpdate,
    Position, Size, Viewport,
};
use crate::services::debounced_field_writer::DebouncedFieldWriter;
use crate::services::error::SyncError;
use crate::services::events::{SyncEvent, EVENT_CHANNEL_CAPACITY};
use crate::services::position_batch_writer::PositionBatchWriter;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Longest title the server accepts
pub const MAX_TITLE_LEN: usize = 255;

/// Trim and validate a node title
pub fn validate_title(title: &str) -> Result<&str, SyncError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(SyncError::validation("Title cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(SyncError::validation(format!(
            "Title cannot be longer than {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title)
}

/// Result of routing one batch of view changes
#[derive(Debug, Default)]
pub struct GraphChangeOutcome {
    /// Ids the view asked to delete; the caller confirms, then calls `delete_node`
    pub removal_requests: Vec<NodeId>,
    /// Positions written by the batch flush
    pub persisted_positions: usize,
    /// Failures encountered while applying the batch
    pub errors: Vec<SyncError>,
}

/// Canonical node state for one canvas plus its persistence routing
pub struct NodeStateSync {
    store: Arc<dyn RemoteStore>,
    config: SyncConfig,
    canvas: Option<Canvas>,
    nodes: Vec<Node>,
    field_writer: DebouncedFieldWriter,
    position_writer: PositionBatchWriter,
    events: broadcast::Sender<SyncEvent>,
}

impl NodeStateSync {
    pub fn new(store: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let field_writer =
            DebouncedFieldWriter::new(store.clone(), config.field_debounce(), events.clone());
        let position_writer = PositionBatchWriter::new(store.clone(), events.clone());

        Self {
            store,
            config,
            canvas: None,
            nodes: Vec::new(),
            field_writer,
            position_writer,
            events,
        }
    }

    /// Receive background write outcomes and lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Current nodes in the view's shape
    pub fn view_nodes(&self) -> Vec<ViewNode> {
        graph_view::to_view_nodes(&self.nodes)
    }

    pub fn field_writer(&self) -> &DebouncedFieldWriter {
        &self.field_writer
    }

    pub fn position_writer(&self) -> &PositionBatchWriter {
        &self.position_writer
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SyncError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| SyncError::node_not_found(id))
    }

    //
    // LOADING
    //

    /// Fetch a canvas and its nodes, replacing local state on success
    ///
    /// On failure the previously loaded canvas and nodes are left untouched.
    pub async fn load(&mut self, canvas_id: CanvasId) -> Result<(), SyncError> {
        tracing::debug!("Loading canvas {}", canvas_id);

        let canvas = self
            .store
            .get_canvas(canvas_id)
            .await
            .map_err(|e| SyncError::load(format!("canvas {}", canvas_id), e))?;
        let records = self
            .store
            .list_canvas_nodes(canvas_id)
            .await
            .map_err(|e| SyncError::load(format!("nodes of canvas {}", canvas_id), e))?;

        let mut nodes: Vec<Node> = records.into_iter().map(Node::from_record).collect();

        // Queued local edits are newer than what the server just returned
        for node in &mut nodes {
            if let Some(snapshot) = self.field_writer.pending_snapshot(node.id) {
                node.fields = NodeFields::from_data(node.node_type, &snapshot);
            }
            if let Some(position) = self.position_writer.pending_position(node.id) {
                node.position = position;
            }
        }

        tracing::info!(
            "Loaded canvas {} ('{}') with {} node(s)",
            canvas.id,
            canvas.name,
            nodes.len()
        );
        let _ = self.events.send(SyncEvent::CanvasLoaded {
            canvas_id,
            node_count: nodes.len(),
        });

        self.canvas = Some(canvas);
        self.nodes = nodes;
        Ok(())
    }

    //
    // EDITS
    //

    /// Set one field in memory and schedule a debounced write of the node's data
    pub fn apply_field_edit(
        &mut self,
        node_id: NodeId,
        field: &str,
        value: &str,
    ) -> Result<(), SyncError> {
        let snapshot = {
            let node = self.node_mut(node_id)?;
            let before = node.fields.get(field);
            node.fields.set(field, value)?;
            if node.fields.get(field) == before {
                return Ok(());
            }
            node.data()
        };

        tracing::trace!("Field '{}' of node {} edited", field, node_id);
        self.field_writer.schedule(node_id, snapshot);
        Ok(())
    }

    /// Rename a node with an immediate write
    ///
    /// Returns `Ok(false)` when the trimmed title equals the current one and
    /// nothing was sent.
    pub async fn apply_title_edit(
        &mut self,
        node_id: NodeId,
        title: &str,
    ) -> Result<bool, SyncError> {
        let title = validate_title(title)?.to_string();

        let previous = {
            let node = self.node_mut(node_id)?;
            if node.title == title {
                return Ok(false);
            }
            std::mem::replace(&mut node.title, title.clone())
        };

        match self
            .store
            .update_node(node_id, NodeUpdate::new().with_title(title))
            .await
        {
            Ok(record) => {
                if let Ok(node) = self.node_mut(node_id) {
                    node.merge_server_record(&record);
                }
                Ok(true)
            }
            Err(e) => {
                tracing::warn!("Title write for node {} failed, reverting: {}", node_id, e);
                if let Ok(node) = self.node_mut(node_id) {
                    node.title = previous;
                }
                Err(SyncError::update(node_id, e))
            }
        }
    }

    /// Move a node in memory; queue the position once the gesture is complete
    pub fn apply_move(
        &mut self,
        node_id: NodeId,
        position: Position,
        dragging: bool,
    ) -> Result<(), SyncError> {
        self.node_mut(node_id)?.position = position;
        if !dragging {
            self.position_writer.enqueue(node_id, position);
        }
        Ok(())
    }

    /// Send every queued position in one bulk call
    pub async fn flush_positions(&mut self) -> Result<usize, SyncError> {
        self.position_writer.flush().await
    }

    /// Set an explicit node size with an immediate write
    pub async fn apply_resize(&mut self, node_id: NodeId, size: Size) -> Result<(), SyncError> {
        let previous = {
            let node = self.node_mut(node_id)?;
            if node.size == Some(size) {
                return Ok(());
            }
            node.size.replace(size)
        };

        match self
            .store
            .update_node(node_id, NodeUpdate::new().with_size(size))
            .await
        {
            Ok(record) => {
                if let Ok(node) = self.node_mut(node_id) {
                    node.merge_server_record(&record);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Resize of node {} failed, reverting: {}", node_id, e);
                if let Ok(node) = self.node_mut(node_id) {
                    node.size = previous;
                }
                Err(SyncError::update(node_id, e))
            }
        }
    }

    /// Toggle whether the assistant sees this node, with an immediate write
    pub async fn set_exclude_from_context(
        &mut self,
        node_id: NodeId,
        exclude: bool,
    ) -> Result<(), SyncError> {
        let previous = {
            let node = self.node_mut(node_id)?;
            std::mem::replace(&mut node.exclude_from_context, exclude)
        };
        if previous == exclude {
            return Ok(());
        }

        match self
            .store
            .update_node(node_id, NodeUpdate::new().with_exclude_from_context(exclude))
            .await
        {
            Ok(record) => {
                if let Ok(node) = self.node_mut(node_id) {
                    node.merge_server_record(&record);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    "Context flag write for node {} failed, reverting: {}",
                    node_id,
                    e
                );
                if let Ok(node) = self.node_mut(node_id) {
                    node.exclude_from_context = previous;
                }
                Err(SyncError::update(node_id, e))
            }
        }
    }

    /// Persist the canvas viewport
    pub async fn save_viewport(&mut self, viewport: Viewport) -> Result<(), SyncError> {
        let canvas_id = self.canvas.as_ref().ok_or(SyncError::NoCanvasLoaded)?.id;
        let update = CanvasUpdate {
            viewport: Some(viewport),
            ..Default::default()
        };

        let canvas = self
            .store
            .update_canvas(canvas_id, update)
            .await
            .map_err(|e| SyncError::canvas_update(canvas_id, e))?;

        // A load of another canvas may have finished meanwhile
        if self.canvas.as_ref().map(|c| c.id) == Some(canvas_id) {
            self.canvas = Some(canvas);
        }
        Ok(())
    }

    //
    // CREATE / DELETE
    //

    /// Create a node on the loaded canvas; it appears locally only once confirmed
    ///
    /// Without a position the node is placed at the centre of the visible area.
    pub async fn create_node(
        &mut self,
        node_type: NodeType,
        title: &str,
        position: Option<Position>,
    ) -> Result<Node, SyncError> {
        let canvas = self.canvas.as_ref().ok_or(SyncError::NoCanvasLoaded)?;
        let title = validate_title(title)?;
        let position = position.unwrap_or_else(|| {
            canvas
                .viewport
                .unwrap_or_default()
                .center(self.config.view_width, self.config.view_height)
        });

        let record = self
            .store
            .create_node(NewNode::new(canvas.id, node_type, title, position))
            .await
            .map_err(SyncError::create)?;

        let node = Node::from_record(record);
        tracing::info!("Created {} node {} '{}'", node.node_type, node.id, node.title);
        let _ = self.events.send(SyncEvent::NodeCreated { node_id: node.id });
        self.nodes.push(node.clone());
        Ok(node)
    }

    /// Delete a node the user already confirmed
    ///
    /// Pending field and position writes are withdrawn before the request so
    /// nothing can write to the id afterwards. If the delete fails they are
    /// put back and the node stays.
    pub async fn delete_node(&mut self, node_id: NodeId) -> Result<(), SyncError> {
        if self.node(node_id).is_none() {
            return Err(SyncError::node_not_found(node_id));
        }

        let withdrawn_fields = self.field_writer.take(node_id);
        let withdrawn_position = self.position_writer.remove(node_id);

        match self.store.delete_node(node_id).await {
            Ok(()) => {
                self.nodes.retain(|n| n.id != node_id);
                tracing::info!("Deleted node {}", node_id);
                let _ = self.events.send(SyncEvent::NodeDeleted { node_id });
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Delete of node {} failed: {}", node_id, e);
                if let Some(snapshot) = withdrawn_fields {
                    self.field_writer.schedule(node_id, snapshot);
                }
                if let Some(position) = withdrawn_position {
                    self.position_writer.restore(node_id, position);
                }
                Err(SyncError::delete(node_id, e))
            }
        }
    }

    //
    // VIEW CHANGES
    //

    /// Route one notification's worth of view changes
    ///
    /// Drag completions are flushed together in a single bulk call. Remove
    /// requests are returned, not executed. Changes for unknown ids are
    /// skipped.
    pub async fn apply_graph_changes(&mut self, changes: Vec<NodeChange>) -> GraphChangeOutcome {
        let mut outcome = GraphChangeOutcome::default();
        let mut drag_ended = false;

        for change in changes {
            let Some(node_id) = change.node_id() else {
                tracing::debug!("Ignoring unhandled view change kind");
                continue;
            };
            if self.node(node_id).is_none() {
                tracing::debug!("Ignoring view change for unknown node {}", node_id);
                continue;
            }

            match change {
                NodeChange::Position {
                    position, dragging, ..
                } => {
                    let Some(position) =
                        position.or_else(|| self.node(node_id).map(|n| n.position))
                    else {
                        continue;
                    };
                    if let Err(e) = self.apply_move(node_id, position, dragging) {
                        outcome.errors.push(e);
                    }
                    drag_ended |= !dragging;
                }
                NodeChange::Dimensions {
                    dimensions: Some(dimensions),
                    resizing: Some(false),
                    ..
                } => {
                    if let Err(e) = self.apply_resize(node_id, dimensions.to_size()).await {
                        outcome.errors.push(e);
                    }
                }
                NodeChange::Dimensions { .. } | NodeChange::Select { .. } | NodeChange::Other => {}
                NodeChange::Remove { .. } => outcome.removal_requests.push(node_id),
            }
        }

        if drag_ended {
            match self.flush_positions().await {
                Ok(count) => outcome.persisted_positions = count,
                Err(e) => outcome.errors.push(e),
            }
        }
        outcome
    }

    //
    // TEARDOWN
    //

    /// Persist everything still queued; the instance stays usable
    ///
    /// Returns the number of field writes that reached the server. A failed
    /// position flush is reported through the event channel.
    pub async fn close(&mut self) -> usize {
        let persisted = self.field_writer.flush_all().await;
        if let Err(e) = self.position_writer.flush().await {
            tracing::warn!("Final position flush failed: {}", e);
        }
        tracing::debug!("Sync closed, {} field write(s) flushed", persisted);
        persisted
    }
}
