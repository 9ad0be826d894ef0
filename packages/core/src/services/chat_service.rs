//! Chat Service
//!
//! Chat directory operations (list, create, rename, delete) and opening
//! sessions, including the node-chat policy: a node has at most one
//! assistant conversation, created lazily the first time it is opened.
//!
//! Concurrent `open_node_chat` calls for the same node within this process
//! are serialized, so the list-then-create sequence cannot create two chats.
//! Another client doing the same at the same moment still can; the server
//! offers no conditional create.

use crate::db::RemoteStore;
use crate::models::{CanvasId, Chat, ChatId, ChatType, CreateChatRequest, NodeId};
use crate::services::chat_session::ChatSession;
use crate::services::error::SyncError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Name given to a node's lazily created chat
pub fn node_chat_name(node_title: &str) -> String {
    format!("{} Discussion", node_title.trim())
}

pub struct ChatService {
    store: Arc<dyn RemoteStore>,
    node_gates: Mutex<HashMap<NodeId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ChatService {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            node_gates: Mutex::new(HashMap::new()),
        }
    }

    fn node_gate(&self, node_id: NodeId) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self
            .node_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Drop gates nobody is waiting on
        gates.retain(|_, gate| Arc::strong_count(gate) > 1);
        gates.entry(node_id).or_default().clone()
    }

    pub async fn list_canvas_chats(&self, canvas_id: CanvasId) -> Result<Vec<Chat>, SyncError> {
        self.store
            .list_canvas_chats(canvas_id)
            .await
            .map_err(|e| SyncError::load(format!("chats of canvas {}", canvas_id), e))
    }

    pub async fn list_node_chats(&self, node_id: NodeId) -> Result<Vec<Chat>, SyncError> {
        self.store
            .list_node_chats(node_id)
            .await
            .map_err(|e| SyncError::load(format!("chats of node {}", node_id), e))
    }

    /// Create a canvas-level chat
    pub async fn create_chat(
        &self,
        canvas_id: CanvasId,
        name: &str,
        chat_type: ChatType,
    ) -> Result<Chat, SyncError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SyncError::validation("Chat name cannot be empty"));
        }

        let chat = self
            .store
            .create_chat(CreateChatRequest {
                canvas_id,
                name: name.to_string(),
                chat_type,
                node_id: None,
            })
            .await
            .map_err(|e| SyncError::chat("create chat", e))?;

        tracing::info!(
            "Created {} chat {} '{}'",
            chat.chat_type.label(),
            chat.id,
            chat.name
        );
        Ok(chat)
    }

    pub async fn rename_chat(&self, chat_id: ChatId, name: &str) -> Result<(), SyncError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SyncError::validation("Chat name cannot be empty"));
        }

        self.store
            .rename_chat(chat_id, name.to_string())
            .await
            .map_err(|e| SyncError::chat_op(chat_id, "rename chat", e))
    }

    pub async fn delete_chat(&self, chat_id: ChatId) -> Result<(), SyncError> {
        self.store
            .delete_chat(chat_id)
            .await
            .map_err(|e| SyncError::chat_op(chat_id, "delete chat", e))?;
        tracing::info!("Deleted chat {}", chat_id);
        Ok(())
    }

    /// Open a session over an existing chat with its history loaded
    pub async fn open_chat(&self, chat: Chat) -> Result<ChatSession, SyncError> {
        let mut session = ChatSession::new(self.store.clone(), chat);
        session.load_history().await?;
        Ok(session)
    }

    /// Open the node's chat, creating it on first use
    ///
    /// Reuses the first chat bound to the node. Otherwise creates one
    /// `sales_assistant` chat named `"{node title} Discussion"`.
    pub async fn open_node_chat(
        &self,
        canvas_id: CanvasId,
        node_id: NodeId,
        node_title: &str,
    ) -> Result<ChatSession, SyncError> {
        let gate = self.node_gate(node_id);
        let _guard = gate.lock().await;

        let existing = self.list_node_chats(node_id).await?.into_iter().next();
        if let Some(chat) = existing {
            tracing::debug!("Reusing chat {} for node {}", chat.id, node_id);
            return self.open_chat(chat).await;
        }

        let chat = self
            .store
            .create_chat(CreateChatRequest {
                canvas_id,
                name: node_chat_name(node_title),
                chat_type: ChatType::SalesAssistant,
                node_id: Some(node_id),
            })
            .await
            .map_err(|e| SyncError::chat(format!("create chat for node {}", node_id), e))?;

        tracing::info!("Created chat {} for node {}", chat.id, node_id);
        Ok(ChatSession::new(self.store.clone(), chat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, StoreOperation};
    use crate::models::{NewNode, NodeType, Position};
    use std::time::Duration;

    fn setup() -> (Arc<InMemoryStore>, ChatService, NodeId) {
        let store = Arc::new(InMemoryStore::new());
        store.seed_canvas(CanvasId(1), "Deal");
        let node = store.seed_node(NewNode::new(
            CanvasId(1),
            NodeType::Risk,
            "Budget freeze",
            Position::default(),
        ));
        (store.clone(), ChatService::new(store), node.id)
    }

    #[tokio::test]
    async fn test_create_chat_requires_name() {
        let (store, service, _) = setup();
        let err = service
            .create_chat(CanvasId(1), "  ", ChatType::WhatsNext)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rename_missing_chat_is_chat_not_found() {
        let (_store, service, _) = setup();
        let err = service.rename_chat(ChatId(404), "New").await.unwrap_err();
        assert!(matches!(err, SyncError::ChatNotFound { id: ChatId(404) }));
    }

    #[tokio::test]
    async fn test_open_node_chat_reuses_existing() {
        let (store, service, node_id) = setup();

        let first = service
            .open_node_chat(CanvasId(1), node_id, "Budget freeze")
            .await
            .unwrap();
        assert_eq!(first.chat().name, "Budget freeze Discussion");
        assert_eq!(first.chat().node_id, Some(node_id));
        assert_eq!(first.chat().chat_type, ChatType::SalesAssistant);

        let second = service
            .open_node_chat(CanvasId(1), node_id, "Budget freeze")
            .await
            .unwrap();
        assert_eq!(second.chat_id(), first.chat_id());
        assert_eq!(store.calls_of(StoreOperation::CreateChat).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_openers_create_one_chat() {
        let (store, service, node_id) = setup();
        store.set_latency(Some(Duration::from_millis(50)));

        let (a, b) = tokio::join!(
            service.open_node_chat(CanvasId(1), node_id, "Budget freeze"),
            service.open_node_chat(CanvasId(1), node_id, "Budget freeze"),
        );

        assert_eq!(a.unwrap().chat_id(), b.unwrap().chat_id());
        assert_eq!(store.calls_of(StoreOperation::CreateChat).len(), 1);
    }
}
