//! HTTP implementation of [`RemoteStore`]
//!
//! JSON over HTTP with a bearer credential supplied by the caller. Status
//! codes are mapped once, in `check_status`:
//!
//! - 401/403 → `StoreError::Unauthorized`
//! - 404 → `StoreError::NotFound`
//! - other non-2xx → `StoreError::Status` carrying the server's `detail`
//!   message when the body is a FastAPI-style error object

use crate::config::SyncConfig;
use crate::db::{RemoteStore, StoreError, StoreResult};
use crate::models::{
    Canvas, CanvasId, CanvasUpdate, Chat, ChatId, CreateChatRequest, Message, NewNode, NodeId,
    NodeRecord, NodeUpdate, PositionUpdate, SendMessageRequest,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// REST client for the DealCanvas API
#[derive(Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for HttpStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct BulkPositionBody {
    updates: Vec<PositionUpdate>,
}

impl HttpStore {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:8000/api`)
    ///
    /// `timeout` bounds each whole request; `None` leaves requests unbounded.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Option<Duration>,
    ) -> StoreResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Create a client from sync configuration
    pub fn from_config(config: &SyncConfig, token: impl Into<String>) -> StoreResult<Self> {
        Self::new(config.api_base_url.clone(), token, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(&self.token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(&self.token)
    }

    fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(&self.token)
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(&self.token)
    }

    /// Send a request and decode a JSON response body
    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> StoreResult<T> {
        let response = Self::dispatch(request, what).await?;
        response.json::<T>().await.map_err(|e| {
            StoreError::decode(format!("Failed to parse {} response: {}", what, e))
        })
    }

    /// Send a request whose response body is ignored
    async fn execute(&self, request: RequestBuilder, what: &str) -> StoreResult<()> {
        Self::dispatch(request, what).await.map(|_| ())
    }

    async fn dispatch(request: RequestBuilder, what: &str) -> StoreResult<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::transport(format!("{} timed out: {}", what, e))
            } else {
                StoreError::transport(format!("{} failed: {}", what, e))
            }
        })?;
        Self::check_status(response, what).await
    }

    async fn check_status(response: Response, what: &str) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::warn!("{} rejected as unauthorized ({})", what, status);
                Err(StoreError::Unauthorized {
                    status: status.as_u16(),
                })
            }
            StatusCode::NOT_FOUND => Err(StoreError::not_found(what)),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::status(status.as_u16(), error_detail(&body)))
            }
        }
    }
}

/// Extract `detail` from `{"detail": "..."}`, otherwise return the raw body
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").map(|d| match d {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn get_canvas(&self, id: CanvasId) -> StoreResult<Canvas> {
        self.fetch(self.get(&format!("/canvases/{}", id)), &format!("canvas {}", id))
            .await
    }

    async fn update_canvas(&self, id: CanvasId, update: CanvasUpdate) -> StoreResult<Canvas> {
        self.fetch(
            self.put(&format!("/canvases/{}", id)).json(&update),
            &format!("canvas {}", id),
        )
        .await
    }

    async fn list_canvas_nodes(&self, canvas_id: CanvasId) -> StoreResult<Vec<NodeRecord>> {
        self.fetch(
            self.get(&format!("/nodes/canvas/{}", canvas_id)),
            &format!("nodes of canvas {}", canvas_id),
        )
        .await
    }

    async fn create_node(&self, node: NewNode) -> StoreResult<NodeRecord> {
        self.fetch(self.post("/nodes/").json(&node), "create node").await
    }

    async fn update_node(&self, id: NodeId, update: NodeUpdate) -> StoreResult<NodeRecord> {
        self.fetch(
            self.put(&format!("/nodes/{}", id)).json(&update),
            &format!("node {}", id),
        )
        .await
    }

    async fn delete_node(&self, id: NodeId) -> StoreResult<()> {
        self.execute(self.delete(&format!("/nodes/{}", id)), &format!("node {}", id))
            .await
    }

    async fn bulk_update_positions(&self, updates: Vec<PositionUpdate>) -> StoreResult<()> {
        let body = BulkPositionBody { updates };
        self.execute(
            self.post("/nodes/bulk-update-positions").json(&body),
            "bulk position update",
        )
        .await
    }

    async fn list_canvas_chats(&self, canvas_id: CanvasId) -> StoreResult<Vec<Chat>> {
        self.fetch(
            self.get(&format!("/chats/canvas/{}", canvas_id)),
            &format!("chats of canvas {}", canvas_id),
        )
        .await
    }

    async fn list_node_chats(&self, node_id: NodeId) -> StoreResult<Vec<Chat>> {
        self.fetch(
            self.get(&format!("/chats/node/{}", node_id)),
            &format!("chats of node {}", node_id),
        )
        .await
    }

    async fn create_chat(&self, request: CreateChatRequest) -> StoreResult<Chat> {
        self.fetch(self.post("/chats/").json(&request), "create chat")
            .await
    }

    async fn rename_chat(&self, id: ChatId, name: String) -> StoreResult<()> {
        self.execute(
            self.put(&format!("/chats/{}/rename", id))
                .query(&[("name", name)]),
            &format!("chat {}", id),
        )
        .await
    }

    async fn delete_chat(&self, id: ChatId) -> StoreResult<()> {
        self.execute(self.delete(&format!("/chats/{}", id)), &format!("chat {}", id))
            .await
    }

    async fn get_messages(&self, chat_id: ChatId) -> StoreResult<Vec<Message>> {
        self.fetch(
            self.get(&format!("/chats/{}/messages", chat_id)),
            &format!("messages of chat {}", chat_id),
        )
        .await
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        request: SendMessageRequest,
    ) -> StoreResult<Message> {
        self.fetch(
            self.post(&format!("/chats/{}/messages", chat_id)).json(&request),
            &format!("send to chat {}", chat_id),
        )
        .await
    }
}
