//! Service Layer Error Types
//!
//! This module defines the error taxonomy surfaced to callers of the sync
//! services. Every variant that wraps a store failure keeps it as `source`,
//! and every 401-class store failure becomes `SyncError::Auth` regardless of
//! which operation hit it.

use crate::db::StoreError;
use crate::models::{CanvasId, ChatId, FieldError, NodeId};
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote store rejected the credential
    #[error("Authentication rejected by the remote store: {0}")]
    Auth(#[source] StoreError),

    /// Initial fetch failed; prior state is untouched
    #[error("Failed to load {what}: {source}")]
    Load { what: String, source: StoreError },

    /// Node creation failed; nothing was inserted locally
    #[error("Failed to create node: {source}")]
    Create { source: StoreError },

    /// Single-node write failed; local state was reverted
    #[error("Failed to update node {node_id}: {source}")]
    Update { node_id: NodeId, source: StoreError },

    /// Canvas write failed
    #[error("Failed to update canvas {canvas_id}: {source}")]
    CanvasUpdate {
        canvas_id: CanvasId,
        source: StoreError,
    },

    /// Node deletion failed; the node is still present locally
    #[error("Failed to delete node {node_id}: {source}")]
    Delete { node_id: NodeId, source: StoreError },

    /// Bulk position write failed; local positions are kept
    #[error("Failed to persist {count} node position(s): {source}")]
    BatchWrite { count: usize, source: StoreError },

    /// Chat turn failed; the optimistic message was rolled back
    #[error("Failed to send message to chat {chat_id}: {source}")]
    Send { chat_id: ChatId, source: StoreError },

    /// Chat directory operation (create, rename, delete) failed
    #[error("Chat operation failed ({context}): {source}")]
    Chat { context: String, source: StoreError },

    /// Caller input rejected before any network call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Field edit outside the node type's schema
    #[error("Invalid field edit: {0}")]
    Field(#[from] FieldError),

    #[error("Node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// A send is already pending in this conversation
    #[error("A message is already being sent in chat {chat_id}")]
    SendInProgress { chat_id: ChatId },

    /// The result belongs to a send that was abandoned or already finished
    #[error("Stale send result for chat {chat_id}")]
    StaleSend { chat_id: ChatId },

    #[error("No canvas is loaded")]
    NoCanvasLoaded,

    #[error("Chat not found: {id}")]
    ChatNotFound { id: ChatId },
}

impl SyncError {
    fn or_auth(source: StoreError, wrap: impl FnOnce(StoreError) -> Self) -> Self {
        if source.is_auth() {
            Self::Auth(source)
        } else {
            wrap(source)
        }
    }

    /// Create a load error
    pub fn load(what: impl Into<String>, source: StoreError) -> Self {
        Self::or_auth(source, |source| Self::Load {
            what: what.into(),
            source,
        })
    }

    /// Create a create error
    pub fn create(source: StoreError) -> Self {
        Self::or_auth(source, |source| Self::Create { source })
    }

    /// Create an update error
    pub fn update(node_id: NodeId, source: StoreError) -> Self {
        Self::or_auth(source, |source| Self::Update { node_id, source })
    }

    /// Create a canvas update error
    pub fn canvas_update(canvas_id: CanvasId, source: StoreError) -> Self {
        Self::or_auth(source, |source| Self::CanvasUpdate { canvas_id, source })
    }

    /// Create a delete error
    pub fn delete(node_id: NodeId, source: StoreError) -> Self {
        Self::or_auth(source, |source| Self::Delete { node_id, source })
    }

    /// Create a batch write error
    pub fn batch_write(count: usize, source: StoreError) -> Self {
        Self::or_auth(source, |source| Self::BatchWrite { count, source })
    }

    /// Create a send error
    pub fn send(chat_id: ChatId, source: StoreError) -> Self {
        Self::or_auth(source, |source| Self::Send { chat_id, source })
    }

    /// Create a chat directory error
    pub fn chat(context: impl Into<String>, source: StoreError) -> Self {
        Self::or_auth(source, |source| Self::Chat {
            context: context.into(),
            source,
        })
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a node not found error
    pub fn node_not_found(id: NodeId) -> Self {
        Self::NodeNotFound { id }
    }

    /// Create a chat directory error, reporting a missing chat as `ChatNotFound`
    pub fn chat_op(id: ChatId, context: impl Into<String>, source: StoreError) -> Self {
        match source {
            StoreError::NotFound { .. } => Self::ChatNotFound { id },
            source => Self::chat(context, source),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// The underlying store failure, if any
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Auth(source)
            | Self::Load { source, .. }
            | Self::Create { source }
            | Self::Update { source, .. }
            | Self::CanvasUpdate { source, .. }
            | Self::Delete { source, .. }
            | Self::BatchWrite { source, .. }
            | Self::Send { source, .. }
            | Self::Chat { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_store_errors_become_auth() {
        let err = SyncError::load("canvas 1", StoreError::Unauthorized { status: 401 });
        assert!(err.is_auth());

        let err = SyncError::delete(NodeId(3), StoreError::Unauthorized { status: 403 });
        assert!(err.is_auth());
    }

    #[test]
    fn test_other_store_errors_keep_their_operation() {
        let err = SyncError::batch_write(2, StoreError::transport("connection reset"));
        assert!(matches!(err, SyncError::BatchWrite { count: 2, .. }));
        assert_eq!(
            err.store_error(),
            Some(&StoreError::Transport("connection reset".to_string()))
        );
        assert!(err.to_string().contains("2 node position(s)"));
    }
}
