//! Chat Session Integration Tests
//!
//! Exercises `ChatService` and `ChatSession` against `InMemoryStore`, which
//! answers every message with a canned assistant reply.
//!
//! ## Test Coverage
//! - Successful send appends confirmed user message then assistant reply
//! - Failed send rolls back the optimistic message and restores the draft
//! - `include_canvas_context` only travels with node-scoped chats
//! - History loading and its failure behaviour
//! - Node chat creation policy

#[cfg(test)]
mod chat_session_tests {
    use anyhow::Result;
    use dealcanvas_core::db::{InMemoryStore, RemoteStore, StoreCall, StoreOperation};
    use dealcanvas_core::models::{
        CanvasId, ChatType, MessageRole, NewNode, NodeId, NodeType, Position, SendMessageRequest,
    };
    use dealcanvas_core::services::{ChatService, ChatSession, ChatState, SyncError};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    const CANVAS: CanvasId = CanvasId(1);

    fn setup() -> (Arc<InMemoryStore>, ChatService, NodeId) {
        let store = Arc::new(InMemoryStore::new());
        store.seed_canvas(CANVAS, "Acme renewal");
        let node = store.seed_node(NewNode::new(
            CANVAS,
            NodeType::Person,
            "Dana Whitfield",
            Position::default(),
        ));
        (store.clone(), ChatService::new(store), node.id)
    }

    async fn canvas_session(store: &Arc<InMemoryStore>, service: &ChatService) -> Result<ChatSession> {
        let chat = service
            .create_chat(CANVAS, "Deal strategy", ChatType::SalesAssistant)
            .await?;
        store.clear_calls();
        Ok(service.open_chat(chat).await?)
    }

    // =========================================================================
    // Sending
    // =========================================================================

    #[tokio::test]
    async fn test_successful_send_appends_user_then_assistant() -> Result<()> {
        let (store, service, _) = setup();
        let mut session = canvas_session(&store, &service).await?;
        let before = session.messages().len();

        let reply = session.send("What are the open risks?").await?;
        assert_eq!(reply.role, MessageRole::Assistant);
        assert_eq!(reply.content, "Noted: What are the open risks?");

        let messages = session.messages();
        assert_eq!(messages.len(), before + 2);
        assert_eq!(messages[before].role, MessageRole::User);
        assert_eq!(messages[before].content, "What are the open risks?");
        assert!(!messages[before].is_optimistic());
        assert_eq!(messages[before + 1].role, MessageRole::Assistant);
        assert_eq!(session.state(), ChatState::Idle);
        assert_eq!(session.chat().message_count, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_send_rolls_back_and_restores_draft() -> Result<()> {
        let (store, service, _) = setup();
        let mut session = canvas_session(&store, &service).await?;
        session.send("Earlier question").await?;
        let before = session.messages().to_vec();

        store.fail(StoreOperation::SendMessage);
        session.set_draft("  Who signs the contract?");
        let err = assert_err!(session.submit().await);

        assert!(matches!(err, SyncError::Send { .. }));
        assert_eq!(session.messages(), before.as_slice());
        assert_eq!(session.draft(), "  Who signs the contract?");
        assert_eq!(session.state(), ChatState::Idle);

        // Back to Idle, so a retry goes through
        store.recover(StoreOperation::SendMessage);
        assert_ok!(session.submit().await);
        assert_eq!(session.messages().len(), before.len() + 2);
        assert_eq!(session.draft(), "");
        Ok(())
    }

    #[tokio::test]
    async fn test_unauthorized_send_is_auth_error() -> Result<()> {
        let (store, service, _) = setup();
        let mut session = canvas_session(&store, &service).await?;
        store.set_unauthorized(true);

        let err = assert_err!(session.send("hello").await);
        assert!(err.is_auth());
        assert!(session.messages().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_message_is_not_sent() -> Result<()> {
        let (store, service, _) = setup();
        let mut session = canvas_session(&store, &service).await?;

        let err = assert_err!(session.send(" \n\t ").await);
        assert!(matches!(err, SyncError::Validation(_)));
        assert!(store.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_send_is_rejected_while_pending() -> Result<()> {
        let (store, service, _) = setup();
        let mut session = canvas_session(&store, &service).await?;

        let pending = session.begin_send("first")?;
        let err = assert_err!(session.send("second").await);
        assert!(matches!(err, SyncError::SendInProgress { .. }));

        let result = store
            .send_message(pending.chat_id, pending.request.clone())
            .await;
        session.finish_send(pending, result)?;
        assert_eq!(session.messages().len(), 2);
        Ok(())
    }

    // =========================================================================
    // Canvas context flag
    // =========================================================================

    #[tokio::test]
    async fn test_node_chat_sends_include_canvas_context_false() -> Result<()> {
        let (store, service, node_id) = setup();
        let mut session = service
            .open_node_chat(CANVAS, node_id, "Dana Whitfield")
            .await?;
        let chat_id = session.chat_id();

        session.set_include_canvas_context(false);
        session.send("Summarise Dana's concerns").await?;

        assert_eq!(
            store.calls_of(StoreOperation::SendMessage),
            vec![StoreCall::SendMessage(
                chat_id,
                SendMessageRequest {
                    content: "Summarise Dana's concerns".to_string(),
                    include_canvas_context: Some(false),
                }
            )]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_canvas_chat_omits_include_canvas_context() -> Result<()> {
        let (store, service, _) = setup();
        let mut session = canvas_session(&store, &service).await?;

        session.set_include_canvas_context(false);
        session.send("Next steps?").await?;

        match &store.calls_of(StoreOperation::SendMessage)[..] {
            [StoreCall::SendMessage(_, request)] => {
                assert_eq!(request.include_canvas_context, None)
            }
            other => panic!("unexpected calls: {:?}", other),
        }
        Ok(())
    }

    // =========================================================================
    // History
    // =========================================================================

    #[tokio::test]
    async fn test_history_round_trip_and_failed_reload() -> Result<()> {
        let (store, service, _) = setup();
        let mut session = canvas_session(&store, &service).await?;
        session.send("one").await?;
        session.send("two").await?;

        let reopened = service.open_chat(session.chat().clone()).await?;
        let contents: Vec<&str> = reopened
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["one", "Noted: one", "two", "Noted: two"]);

        store.fail(StoreOperation::GetMessages);
        let err = assert_err!(session.load_history().await);
        assert!(matches!(err, SyncError::Load { .. }));
        assert_eq!(session.messages().len(), 4);
        Ok(())
    }

    // =========================================================================
    // Node chat policy
    // =========================================================================

    #[tokio::test]
    async fn test_first_open_creates_named_node_chat() -> Result<()> {
        let (store, service, node_id) = setup();

        let session = service
            .open_node_chat(CANVAS, node_id, "Dana Whitfield")
            .await?;
        assert_eq!(session.chat().name, "Dana Whitfield Discussion");
        assert_eq!(session.chat().chat_type, ChatType::SalesAssistant);
        assert_eq!(session.chat().node_id, Some(node_id));
        assert!(session.messages().is_empty());

        let chats = service.list_node_chats(node_id).await?;
        assert_eq!(chats.len(), 1);
        assert_eq!(store.calls_of(StoreOperation::CreateChat).len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_node_chat_is_reused_with_history() -> Result<()> {
        let (store, service, node_id) = setup();

        let mut first = service
            .open_node_chat(CANVAS, node_id, "Dana Whitfield")
            .await?;
        first.send("Remember: prefers email").await?;

        let second = service
            .open_node_chat(CANVAS, node_id, "Dana Whitfield")
            .await?;
        assert_eq!(second.chat_id(), first.chat_id());
        assert_eq!(second.messages().len(), 2);
        assert_eq!(store.calls_of(StoreOperation::CreateChat).len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_chat_directory_operations() -> Result<()> {
        let (_store, service, _) = setup();

        let chat = service
            .create_chat(CANVAS, "  Pricing  ", ChatType::WhatsNext)
            .await?;
        assert_eq!(chat.name, "Pricing");

        service.rename_chat(chat.id, "Pricing review").await?;
        let listed = service.list_canvas_chats(CANVAS).await?;
        assert_eq!(listed[0].name, "Pricing review");

        service.delete_chat(chat.id).await?;
        assert!(service.list_canvas_chats(CANVAS).await?.is_empty());

        let err = assert_err!(service.delete_chat(chat.id).await);
        assert!(matches!(err, SyncError::ChatNotFound { .. }));
        Ok(())
    }
}
