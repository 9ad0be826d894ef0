//! DealCanvas Sync Core
//!
//! This crate keeps a client's view of a deal canvas consistent with the
//! DealCanvas REST API: typed nodes with per-kind field schemas, debounced
//! and batched persistence, and node-scoped assistant chats.
//!
//! # Architecture
//!
//! - **Optimistic edits**: every mutation lands in local state first
//! - **Field edits**: debounced per node, one write per quiet period
//! - **Drag completions**: batched into one bulk position write per gesture
//! - **Title, size, flags, create, delete**: immediate writes
//! - **Chats**: one in-flight send per conversation, rolled back on failure
//!
//! # Modules
//!
//! - [`models`] - Nodes, field schemas, canvases, chats and wire records
//! - [`db`] - `RemoteStore` trait with HTTP and in-memory implementations
//! - [`services`] - NodeStateSync, writers, ChatSession, ChatService
//! - [`graph_view`] - Projection to and from the graph view's shapes
//! - [`config`] - Runtime configuration

pub mod config;
pub mod db;
pub mod graph_view;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::SyncConfig;
pub use db::{HttpStore, InMemoryStore, RemoteStore, StoreError};
pub use models::*;
pub use services::*;
