//! Chat Session
//!
//! One open conversation: its transcript, the draft input and the single
//! in-flight send.
//!
//! ## Send Lifecycle
//!
//! ```text
//! Idle ──begin_send──► Pending ──finish_send(Ok)──► Idle  (+ user, + assistant)
//!                         └─────finish_send(Err)──► Idle  (optimistic removed,
//!                                                          draft restored)
//! ```
//!
//! The optimistic user message is tagged with a client-local id so it can be
//! found exactly, even if the transcript holds identical texts. `send` runs
//! both halves around the store call; event-loop callers can drive
//! `begin_send`/`finish_send` themselves and keep rendering while Pending.

use crate::db::{RemoteStore, StoreResult};
use crate::models::{Chat, ChatId, Message, SendMessageRequest};
use crate::services::error::SyncError;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    Pending,
}

/// A send that has been started and awaits its store result
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    pub chat_id: ChatId,
    pub request: SendMessageRequest,
    local_id: Uuid,
}

struct InFlight {
    local_id: Uuid,
    submitted: String,
}

pub struct ChatSession {
    store: Arc<dyn RemoteStore>,
    chat: Chat,
    messages: Vec<Message>,
    draft: String,
    include_canvas_context: bool,
    in_flight: Option<InFlight>,
}

impl ChatSession {
    /// A session over `chat` with an empty transcript; call `load_history` to fill it
    pub fn new(store: Arc<dyn RemoteStore>, chat: Chat) -> Self {
        Self {
            store,
            chat,
            messages: Vec::new(),
            draft: String::new(),
            include_canvas_context: true,
            in_flight: None,
        }
    }

    pub fn chat(&self) -> &Chat {
        &self.chat
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> ChatState {
        if self.in_flight.is_some() {
            ChatState::Pending
        } else {
            ChatState::Idle
        }
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Only sent for node-scoped chats
    pub fn include_canvas_context(&self) -> bool {
        self.include_canvas_context
    }

    pub fn set_include_canvas_context(&mut self, include: bool) {
        self.include_canvas_context = include;
    }

    /// Replace the transcript with the server's copy
    ///
    /// On failure the current transcript is kept.
    pub async fn load_history(&mut self) -> Result<usize, SyncError> {
        if self.is_pending() {
            return Err(SyncError::SendInProgress {
                chat_id: self.chat.id,
            });
        }

        let messages = self
            .store
            .get_messages(self.chat.id)
            .await
            .map_err(|e| SyncError::load(format!("messages of chat {}", self.chat.id), e))?;

        tracing::debug!(
            "Loaded {} message(s) for chat {}",
            messages.len(),
            self.chat.id
        );
        self.messages = messages;
        Ok(self.messages.len())
    }

    /// Validate, append the optimistic user message and enter Pending
    pub fn begin_send(&mut self, text: &str) -> Result<PendingSend, SyncError> {
        if self.is_pending() {
            return Err(SyncError::SendInProgress {
                chat_id: self.chat.id,
            });
        }
        if text.trim().is_empty() {
            return Err(SyncError::validation("Message cannot be empty"));
        }

        let local_id = Uuid::new_v4();
        self.messages.push(Message {
            local_id: Some(local_id),
            ..Message::optimistic_user(text)
        });
        self.in_flight = Some(InFlight {
            local_id,
            submitted: text.to_string(),
        });
        self.draft.clear();

        let include_canvas_context = self
            .chat
            .is_node_scoped()
            .then_some(self.include_canvas_context);

        Ok(PendingSend {
            chat_id: self.chat.id,
            request: SendMessageRequest {
                content: text.to_string(),
                include_canvas_context,
            },
            local_id,
        })
    }

    /// Apply the store's answer to a started send and return to Idle
    ///
    /// A result for a send that is no longer tracked (abandoned, or finished
    /// twice) is rejected with `StaleSend` and leaves the session untouched.
    pub fn finish_send(
        &mut self,
        pending: PendingSend,
        result: StoreResult<Message>,
    ) -> Result<&Message, SyncError> {
        let is_current = self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.local_id == pending.local_id);
        let in_transcript = self
            .messages
            .iter()
            .any(|m| m.local_id == Some(pending.local_id));
        if !is_current && !in_transcript {
            tracing::debug!("Discarding stale send result for chat {}", pending.chat_id);
            return Err(SyncError::StaleSend {
                chat_id: pending.chat_id,
            });
        }

        let optimistic = self.take_optimistic(pending.local_id);
        if is_current {
            self.in_flight = None;
        }

        match result {
            Ok(reply) => {
                let user = optimistic
                    .map(Message::confirmed)
                    .unwrap_or_else(|| Message::optimistic_user(pending.request.content).confirmed());
                self.messages.push(user);
                self.messages.push(reply);
                self.chat.message_count += 2;
                tracing::debug!("Chat {} received assistant reply", pending.chat_id);
                Ok(&self.messages[self.messages.len() - 1])
            }
            Err(e) => {
                tracing::warn!("Send to chat {} failed: {}", pending.chat_id, e);
                self.draft = pending.request.content;
                Err(SyncError::send(pending.chat_id, e))
            }
        }
    }

    /// Send one message and wait for the assistant's reply
    pub async fn send(&mut self, text: &str) -> Result<&Message, SyncError> {
        let pending = self.begin_send(text)?;
        let result = self
            .store
            .send_message(pending.chat_id, pending.request.clone())
            .await;
        self.finish_send(pending, result)
    }

    /// Send the current draft
    pub async fn submit(&mut self) -> Result<&Message, SyncError> {
        let text = self.draft.clone();
        self.send(&text).await
    }

    /// Roll back a send whose result will never arrive
    ///
    /// Used when the future driving `send` was dropped mid-flight.
    pub fn abandon_pending(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.take() else {
            return false;
        };
        self.take_optimistic(in_flight.local_id);
        self.draft = in_flight.submitted;
        true
    }

    fn take_optimistic(&mut self, local_id: Uuid) -> Option<Message> {
        let index = self
            .messages
            .iter()
            .position(|m| m.local_id == Some(local_id))?;
        Some(self.messages.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, StoreError};
    use crate::models::{CanvasId, ChatType, CreateChatRequest, MessageRole};

    fn session(store: &Arc<InMemoryStore>) -> ChatSession {
        store.seed_canvas(CanvasId(1), "Deal");
        let chat = store.seed_chat(CreateChatRequest {
            canvas_id: CanvasId(1),
            name: "Strategy".to_string(),
            chat_type: ChatType::SalesAssistant,
            node_id: None,
        });
        ChatSession::new(store.clone(), chat)
    }

    #[test]
    fn test_begin_send_rejects_blank_and_concurrent() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session(&store);

        assert!(matches!(
            session.begin_send("   "),
            Err(SyncError::Validation(_))
        ));

        let pending = session.begin_send("First").unwrap();
        assert_eq!(session.state(), ChatState::Pending);
        assert_eq!(session.messages().len(), 1);
        assert!(session.messages()[0].is_optimistic());

        assert!(matches!(
            session.begin_send("Second"),
            Err(SyncError::SendInProgress { .. })
        ));

        // Canvas-level chats never carry the context flag
        assert_eq!(pending.request.include_canvas_context, None);
    }

    #[test]
    fn test_finish_send_removes_exactly_the_optimistic_message() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session(&store);

        let first = session.begin_send("same text").unwrap();
        session
            .finish_send(first, Err(StoreError::transport("offline")))
            .unwrap_err();
        session.messages.push(Message::optimistic_user("same text").confirmed());

        let second = session.begin_send("same text").unwrap();
        let reply = Message {
            role: MessageRole::Assistant,
            content: "ok".to_string(),
            created_at: chrono::Utc::now(),
            token_count: None,
            local_id: None,
        };
        session.finish_send(second, Ok(reply)).unwrap();

        let roles: Vec<MessageRole> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::User, MessageRole::User, MessageRole::Assistant]
        );
        assert!(session.messages().iter().all(|m| !m.is_optimistic()));
    }

    #[test]
    fn test_abandon_pending_restores_draft() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session(&store);
        session.set_draft("What is the next step?");

        let text = session.draft().to_string();
        session.begin_send(&text).unwrap();
        assert_eq!(session.draft(), "");

        assert!(session.abandon_pending());
        assert_eq!(session.draft(), "What is the next step?");
        assert!(session.messages().is_empty());
        assert_eq!(session.state(), ChatState::Idle);
        assert!(!session.abandon_pending());
    }

    #[test]
    fn test_result_of_abandoned_send_leaves_current_send_alone() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = session(&store);

        let abandoned = session.begin_send("first").unwrap();
        assert!(session.abandon_pending());
        session.set_draft("");
        let current = session.begin_send("second").unwrap();

        let err = session
            .finish_send(abandoned.clone(), Err(StoreError::transport("offline")))
            .unwrap_err();
        assert!(matches!(err, SyncError::StaleSend { .. }));

        let reply = Message {
            role: MessageRole::Assistant,
            content: "late".to_string(),
            created_at: chrono::Utc::now(),
            token_count: None,
            local_id: None,
        };
        assert!(matches!(
            session.finish_send(abandoned, Ok(reply)),
            Err(SyncError::StaleSend { .. })
        ));

        assert_eq!(session.state(), ChatState::Pending);
        assert_eq!(session.draft(), "");
        let contents: Vec<&str> = session.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["second"]);
        assert_eq!(session.chat().message_count, 0);

        // The live send still completes normally
        let result = Ok(Message {
            role: MessageRole::Assistant,
            content: "ok".to_string(),
            created_at: chrono::Utc::now(),
            token_count: None,
            local_id: None,
        });
        session.finish_send(current, result).unwrap();
        assert_eq!(session.state(), ChatState::Idle);
        assert_eq!(session.messages().len(), 2);
    }
}
