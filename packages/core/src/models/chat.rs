//! Chat and Message Structures
//!
//! A chat is scoped either to a whole canvas or to one node (`node_id`).
//! Messages are append-only; the client never edits or deletes a single
//! message.

use crate::models::{CanvasId, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-assigned chat identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChatId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Assistant persona, fixed when the chat is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    /// Ongoing conversation and advice
    #[default]
    SalesAssistant,
    /// Quick deal analysis
    WhatsNext,
}

impl ChatType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SalesAssistant => "Sales Assistant",
            Self::WhatsNext => "What's Next",
        }
    }
}

/// Chat summary as listed by the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    pub canvas_id: CanvasId,
    pub chat_type: ChatType,
    #[serde(default)]
    pub node_id: Option<NodeId>,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Chat {
    pub fn is_node_scoped(&self) -> bool {
        self.node_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Informational, assistant messages only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<u32>,
    /// Set only on optimistic echoes that the server has not confirmed yet
    #[serde(skip)]
    pub local_id: Option<Uuid>,
}

impl Message {
    /// Locally constructed user message shown before the server answers
    pub fn optimistic_user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            created_at: Utc::now(),
            token_count: None,
            local_id: Some(Uuid::new_v4()),
        }
    }

    pub fn is_optimistic(&self) -> bool {
        self.local_id.is_some()
    }

    /// The same message marked as confirmed
    pub fn confirmed(mut self) -> Self {
        self.local_id = None;
        self
    }
}

/// Body of `POST /chats/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateChatRequest {
    pub canvas_id: CanvasId,
    pub name: String,
    pub chat_type: ChatType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

/// Body of `POST /chats/{id}/messages`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_canvas_context: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_include_canvas_context_false_is_serialized() {
        let request = SendMessageRequest {
            content: "What's next?".to_string(),
            include_canvas_context: Some(false),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"content": "What's next?", "include_canvas_context": false})
        );
    }

    #[test]
    fn test_canvas_chat_request_omits_context_flag() {
        let request = SendMessageRequest {
            content: "hi".to_string(),
            include_canvas_context: None,
        };
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({"content": "hi"}));
    }

    #[test]
    fn test_local_id_never_leaves_the_client() {
        let message = Message::optimistic_user("draft");
        assert!(message.is_optimistic());

        let wire = serde_json::to_value(&message).unwrap();
        assert!(wire.get("local_id").is_none());
        assert_eq!(wire["role"], "user");

        let back: Message = serde_json::from_value(wire).unwrap();
        assert!(!back.is_optimistic());
    }

    #[test]
    fn test_chat_type_wire_names() {
        assert_eq!(serde_json::to_value(ChatType::WhatsNext).unwrap(), json!("whats_next"));
        assert_eq!(
            serde_json::to_value(ChatType::SalesAssistant).unwrap(),
            json!("sales_assistant")
        );
    }
}
