//! In-memory implementation of [`RemoteStore`]
//!
//! Behaves like the REST API closely enough for the services (server-assigned
//! ids, sparse updates, cascading node deletes) and records every call it
//! receives, successful or not. Tests use the call log to assert on exactly
//! which writes were issued; failure injection and artificial latency cover
//! the error and timing paths.

use crate::db::{RemoteStore, StoreError, StoreResult};
use crate::models::{
    Canvas, CanvasId, CanvasUpdate, Chat, ChatId, CreateChatRequest, Message, MessageRole,
    NewNode, NodeId, NodeRecord, NodeUpdate, PositionUpdate, SendMessageRequest,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Identifies a `RemoteStore` method, for failure injection and call filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    GetCanvas,
    UpdateCanvas,
    ListCanvasNodes,
    CreateNode,
    UpdateNode,
    DeleteNode,
    BulkUpdatePositions,
    ListCanvasChats,
    ListNodeChats,
    CreateChat,
    RenameChat,
    DeleteChat,
    GetMessages,
    SendMessage,
}

impl std::fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A call received by the in-memory store, with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    GetCanvas(CanvasId),
    UpdateCanvas(CanvasId, CanvasUpdate),
    ListCanvasNodes(CanvasId),
    CreateNode(NewNode),
    UpdateNode(NodeId, NodeUpdate),
    DeleteNode(NodeId),
    BulkUpdatePositions(Vec<PositionUpdate>),
    ListCanvasChats(CanvasId),
    ListNodeChats(NodeId),
    CreateChat(CreateChatRequest),
    RenameChat(ChatId, String),
    DeleteChat(ChatId),
    GetMessages(ChatId),
    SendMessage(ChatId, SendMessageRequest),
}

impl StoreCall {
    pub fn operation(&self) -> StoreOperation {
        match self {
            Self::GetCanvas(_) => StoreOperation::GetCanvas,
            Self::UpdateCanvas(..) => StoreOperation::UpdateCanvas,
            Self::ListCanvasNodes(_) => StoreOperation::ListCanvasNodes,
            Self::CreateNode(_) => StoreOperation::CreateNode,
            Self::UpdateNode(..) => StoreOperation::UpdateNode,
            Self::DeleteNode(_) => StoreOperation::DeleteNode,
            Self::BulkUpdatePositions(_) => StoreOperation::BulkUpdatePositions,
            Self::ListCanvasChats(_) => StoreOperation::ListCanvasChats,
            Self::ListNodeChats(_) => StoreOperation::ListNodeChats,
            Self::CreateChat(_) => StoreOperation::CreateChat,
            Self::RenameChat(..) => StoreOperation::RenameChat,
            Self::DeleteChat(_) => StoreOperation::DeleteChat,
            Self::GetMessages(_) => StoreOperation::GetMessages,
            Self::SendMessage(..) => StoreOperation::SendMessage,
        }
    }

    /// Whether this call writes to the given node
    pub fn writes_node(&self, id: NodeId) -> bool {
        match self {
            Self::UpdateNode(target, _) => *target == id,
            Self::BulkUpdatePositions(updates) => updates.iter().any(|u| u.id == id),
            _ => false,
        }
    }
}

#[derive(Default)]
struct State {
    canvases: HashMap<CanvasId, Canvas>,
    nodes: BTreeMap<NodeId, NodeRecord>,
    chats: BTreeMap<ChatId, Chat>,
    messages: HashMap<ChatId, Vec<Message>>,
    next_node_id: i64,
    next_chat_id: i64,
    calls: Vec<StoreCall>,
    failing: HashSet<StoreOperation>,
    unauthorized: bool,
    latency: Option<Duration>,
}

/// In-process REST stand-in with a call log
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    //
    // SEEDING
    //

    /// Add a canvas with default viewport and write access
    pub fn seed_canvas(&self, id: CanvasId, name: impl Into<String>) -> Canvas {
        let canvas = Canvas {
            id,
            name: name.into(),
            description: None,
            viewport: None,
            is_archived: false,
            can_write: true,
            is_owner: true,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        self.state().canvases.insert(id, canvas.clone());
        canvas
    }

    /// Insert a node directly, bypassing the call log
    pub fn seed_node(&self, node: NewNode) -> NodeRecord {
        self.state().insert_node(node)
    }

    /// Insert a chat directly, bypassing the call log
    pub fn seed_chat(&self, request: CreateChatRequest) -> Chat {
        self.state().insert_chat(request)
    }

    //
    // BEHAVIOUR CONTROL
    //

    /// Make every future call of `operation` fail until cleared
    pub fn fail(&self, operation: StoreOperation) {
        self.state().failing.insert(operation);
    }

    pub fn recover(&self, operation: StoreOperation) {
        self.state().failing.remove(&operation);
    }

    /// Answer every call with 401 while set
    pub fn set_unauthorized(&self, unauthorized: bool) {
        self.state().unauthorized = unauthorized;
    }

    /// Delay every call by `latency` (uses tokio time, so paused clocks apply)
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    //
    // INSPECTION
    //

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    pub fn calls_of(&self, operation: StoreOperation) -> Vec<StoreCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRecord> {
        self.state().nodes.get(&id).cloned()
    }

    pub fn chat(&self, id: ChatId) -> Option<Chat> {
        self.state().chats.get(&id).cloned()
    }

    pub fn stored_messages(&self, chat_id: ChatId) -> Vec<Message> {
        self.state()
            .messages
            .get(&chat_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Log the call, apply latency, then apply injected failures
    async fn enter(&self, call: StoreCall) -> StoreResult<()> {
        let operation = call.operation();
        let latency = {
            let mut state = self.state();
            state.calls.push(call);
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.state();
        if state.unauthorized {
            return Err(StoreError::Unauthorized { status: 401 });
        }
        if state.failing.contains(&operation) {
            return Err(StoreError::Injected {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }
}

impl State {
    fn insert_node(&mut self, node: NewNode) -> NodeRecord {
        self.next_node_id += 1;
        let now = Utc::now();
        let record = NodeRecord {
            id: NodeId(self.next_node_id),
            canvas_id: node.canvas_id,
            node_type: node.node_type,
            title: node.title,
            position_x: node.position_x,
            position_y: node.position_y,
            width: node.width,
            height: node.height,
            data: node.data,
            exclude_from_context: false,
            content_size: None,
            status: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.nodes.insert(record.id, record.clone());
        record
    }

    fn insert_chat(&mut self, request: CreateChatRequest) -> Chat {
        self.next_chat_id += 1;
        let chat = Chat {
            id: ChatId(self.next_chat_id),
            name: request.name,
            canvas_id: request.canvas_id,
            chat_type: request.chat_type,
            node_id: request.node_id,
            message_count: 0,
            created_at: Some(Utc::now()),
        };
        self.chats.insert(chat.id, chat.clone());
        chat
    }

    fn node_mut(&mut self, id: NodeId) -> StoreResult<&mut NodeRecord> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("node {}", id)))
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn get_canvas(&self, id: CanvasId) -> StoreResult<Canvas> {
        self.enter(StoreCall::GetCanvas(id)).await?;
        self.state()
            .canvases
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("canvas {}", id)))
    }

    async fn update_canvas(&self, id: CanvasId, update: CanvasUpdate) -> StoreResult<Canvas> {
        self.enter(StoreCall::UpdateCanvas(id, update.clone()))
            .await?;
        let mut state = self.state();
        let canvas = state
            .canvases
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("canvas {}", id)))?;
        if let Some(name) = update.name {
            canvas.name = name;
        }
        if let Some(description) = update.description {
            canvas.description = Some(description);
        }
        if let Some(viewport) = update.viewport {
            canvas.viewport = Some(viewport);
        }
        canvas.updated_at = Some(Utc::now());
        Ok(canvas.clone())
    }

    async fn list_canvas_nodes(&self, canvas_id: CanvasId) -> StoreResult<Vec<NodeRecord>> {
        self.enter(StoreCall::ListCanvasNodes(canvas_id)).await?;
        let state = self.state();
        if !state.canvases.contains_key(&canvas_id) {
            return Err(StoreError::not_found(format!("canvas {}", canvas_id)));
        }
        Ok(state
            .nodes
            .values()
            .filter(|node| node.canvas_id == canvas_id)
            .cloned()
            .collect())
    }

    async fn create_node(&self, node: NewNode) -> StoreResult<NodeRecord> {
        self.enter(StoreCall::CreateNode(node.clone())).await?;
        let title_len = node.title.chars().count();
        if title_len == 0 || title_len > 255 {
            return Err(StoreError::status(422, "title must be 1-255 characters"));
        }
        let mut state = self.state();
        if !state.canvases.contains_key(&node.canvas_id) {
            return Err(StoreError::not_found(format!("canvas {}", node.canvas_id)));
        }
        Ok(state.insert_node(node))
    }

    async fn update_node(&self, id: NodeId, update: NodeUpdate) -> StoreResult<NodeRecord> {
        self.enter(StoreCall::UpdateNode(id, update.clone())).await?;
        let mut state = self.state();
        let record = state.node_mut(id)?;
        if let Some(title) = update.title {
            record.title = title;
        }
        if let Some(x) = update.position_x {
            record.position_x = x;
        }
        if let Some(y) = update.position_y {
            record.position_y = y;
        }
        if update.width.is_some() {
            record.width = update.width;
        }
        if update.height.is_some() {
            record.height = update.height;
        }
        if let Some(data) = update.data {
            record.data = data;
        }
        if let Some(exclude) = update.exclude_from_context {
            record.exclude_from_context = exclude;
        }
        if update.status.is_some() {
            record.status = update.status;
        }
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }

    async fn delete_node(&self, id: NodeId) -> StoreResult<()> {
        self.enter(StoreCall::DeleteNode(id)).await?;
        let mut state = self.state();
        if state.nodes.remove(&id).is_none() {
            return Err(StoreError::not_found(format!("node {}", id)));
        }
        let orphaned: Vec<ChatId> = state
            .chats
            .values()
            .filter(|chat| chat.node_id == Some(id))
            .map(|chat| chat.id)
            .collect();
        for chat_id in orphaned {
            state.chats.remove(&chat_id);
            state.messages.remove(&chat_id);
        }
        Ok(())
    }

    async fn bulk_update_positions(&self, updates: Vec<PositionUpdate>) -> StoreResult<()> {
        self.enter(StoreCall::BulkUpdatePositions(updates.clone()))
            .await?;
        let mut state = self.state();
        if let Some(missing) = updates.iter().find(|u| !state.nodes.contains_key(&u.id)) {
            return Err(StoreError::not_found(format!("node {}", missing.id)));
        }
        for update in updates {
            let record = state.node_mut(update.id)?;
            record.position_x = update.position_x;
            record.position_y = update.position_y;
        }
        Ok(())
    }

    async fn list_canvas_chats(&self, canvas_id: CanvasId) -> StoreResult<Vec<Chat>> {
        self.enter(StoreCall::ListCanvasChats(canvas_id)).await?;
        Ok(self
            .state()
            .chats
            .values()
            .filter(|chat| chat.canvas_id == canvas_id)
            .cloned()
            .collect())
    }

    async fn list_node_chats(&self, node_id: NodeId) -> StoreResult<Vec<Chat>> {
        self.enter(StoreCall::ListNodeChats(node_id)).await?;
        Ok(self
            .state()
            .chats
            .values()
            .filter(|chat| chat.node_id == Some(node_id))
            .cloned()
            .collect())
    }

    async fn create_chat(&self, request: CreateChatRequest) -> StoreResult<Chat> {
        self.enter(StoreCall::CreateChat(request.clone())).await?;
        Ok(self.state().insert_chat(request))
    }

    async fn rename_chat(&self, id: ChatId, name: String) -> StoreResult<()> {
        self.enter(StoreCall::RenameChat(id, name.clone())).await?;
        let mut state = self.state();
        let chat = state
            .chats
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("chat {}", id)))?;
        chat.name = name;
        Ok(())
    }

    async fn delete_chat(&self, id: ChatId) -> StoreResult<()> {
        self.enter(StoreCall::DeleteChat(id)).await?;
        let mut state = self.state();
        state
            .chats
            .remove(&id)
            .ok_or_else(|| StoreError::not_found(format!("chat {}", id)))?;
        state.messages.remove(&id);
        Ok(())
    }

    async fn get_messages(&self, chat_id: ChatId) -> StoreResult<Vec<Message>> {
        self.enter(StoreCall::GetMessages(chat_id)).await?;
        let state = self.state();
        if !state.chats.contains_key(&chat_id) {
            return Err(StoreError::not_found(format!("chat {}", chat_id)));
        }
        Ok(state.messages.get(&chat_id).cloned().unwrap_or_default())
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        request: SendMessageRequest,
    ) -> StoreResult<Message> {
        self.enter(StoreCall::SendMessage(chat_id, request.clone()))
            .await?;
        let mut state = self.state();
        let chat = state
            .chats
            .get_mut(&chat_id)
            .ok_or_else(|| StoreError::not_found(format!("chat {}", chat_id)))?;
        chat.message_count += 2;

        let user = Message {
            role: MessageRole::User,
            content: request.content.clone(),
            created_at: Utc::now(),
            token_count: None,
            local_id: None,
        };
        let reply = Message {
            role: MessageRole::Assistant,
            content: format!("Noted: {}", request.content),
            created_at: Utc::now(),
            token_count: Some(request.content.split_whitespace().count() as u32 + 1),
            local_id: None,
        };
        let transcript = state.messages.entry(chat_id).or_default();
        transcript.push(user);
        transcript.push(reply.clone());
        Ok(reply)
    }
}
