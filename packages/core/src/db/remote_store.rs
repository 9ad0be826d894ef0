//! RemoteStore Trait - REST Abstraction Layer
//!
//! This module defines the `RemoteStore` trait that abstracts the DealCanvas
//! REST API. Services (`NodeStateSync`, `ChatService`, the background writers)
//! depend only on this trait, which allows:
//!
//! - **HttpStore**: the real JSON-over-HTTP client
//! - **InMemoryStore**: an in-process store that records every call, used by
//!   tests and the CLI's offline demo
//!
//! # Design Decisions
//!
//! 1. **Async-First**: every method is async; callers never block the event loop
//! 2. **Ownership Semantics**: request bodies are taken by value
//! 3. **Wire Types**: methods speak in wire records (`NodeRecord`, `NodeUpdate`);
//!    conversion to canonical types happens in the services
//!
//! # Examples
//!
//! ```rust,no_run
//! use dealcanvas_core::db::{HttpStore, RemoteStore};
//! use dealcanvas_core::models::CanvasId;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store: Arc<dyn RemoteStore> =
//!     Arc::new(HttpStore::new("http://127.0.0.1:8000/api", "token", None)?);
//! let nodes = store.list_canvas_nodes(CanvasId(1)).await?;
//! println!("{} nodes", nodes.len());
//! # Ok(())
//! # }
//! ```

use crate::db::StoreResult;
use crate::models::{
    Canvas, CanvasId, CanvasUpdate, Chat, ChatId, CreateChatRequest, Message, NewNode, NodeId,
    NodeRecord, NodeUpdate, PositionUpdate, SendMessageRequest,
};
use async_trait::async_trait;

/// Abstraction over the DealCanvas REST surface
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so the store can be shared with
/// spawned debounce tasks.
///
/// # Authentication
///
/// 401/403 responses must surface as `StoreError::Unauthorized`; the store
/// never refreshes credentials itself.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    //
    // CANVASES
    //

    /// `GET /canvases/{id}`
    async fn get_canvas(&self, id: CanvasId) -> StoreResult<Canvas>;

    /// `PUT /canvases/{id}`
    async fn update_canvas(&self, id: CanvasId, update: CanvasUpdate) -> StoreResult<Canvas>;

    //
    // NODES
    //

    /// `GET /nodes/canvas/{canvas_id}`
    async fn list_canvas_nodes(&self, canvas_id: CanvasId) -> StoreResult<Vec<NodeRecord>>;

    /// `POST /nodes/`; the returned record carries the server-assigned id
    async fn create_node(&self, node: NewNode) -> StoreResult<NodeRecord>;

    /// `PUT /nodes/{id}`; sparse update, returns the full record
    async fn update_node(&self, id: NodeId, update: NodeUpdate) -> StoreResult<NodeRecord>;

    /// `DELETE /nodes/{id}`
    async fn delete_node(&self, id: NodeId) -> StoreResult<()>;

    /// `POST /nodes/bulk-update-positions`
    async fn bulk_update_positions(&self, updates: Vec<PositionUpdate>) -> StoreResult<()>;

    //
    // CHATS
    //

    /// `GET /chats/canvas/{canvas_id}`
    async fn list_canvas_chats(&self, canvas_id: CanvasId) -> StoreResult<Vec<Chat>>;

    /// `GET /chats/node/{node_id}`
    async fn list_node_chats(&self, node_id: NodeId) -> StoreResult<Vec<Chat>>;

    /// `POST /chats/`
    async fn create_chat(&self, request: CreateChatRequest) -> StoreResult<Chat>;

    /// `PUT /chats/{id}/rename?name=...`
    async fn rename_chat(&self, id: ChatId, name: String) -> StoreResult<()>;

    /// `DELETE /chats/{id}`
    async fn delete_chat(&self, id: ChatId) -> StoreResult<()>;

    /// `GET /chats/{id}/messages`, oldest first
    async fn get_messages(&self, chat_id: ChatId) -> StoreResult<Vec<Message>>;

    /// `POST /chats/{id}/messages`; returns the assistant's reply
    async fn send_message(&self, chat_id: ChatId, request: SendMessageRequest)
        -> StoreResult<Message>;
}
