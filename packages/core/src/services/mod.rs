//! Sync Services
//!
//! This module contains the client-side sync logic:
//!
//! - `NodeStateSync` - canonical node list and mutation routing
//! - `DebouncedFieldWriter` - per-node debounced `data` writes
//! - `PositionBatchWriter` - bulk writes of final drag positions
//! - `ChatSession` - one conversation with optimistic sends
//! - `ChatService` - chat directory and the node-chat policy
//!
//! Services sit between the remote store and the UI. They apply changes
//! locally first and report outcomes through `SyncError` or `SyncEvent`.

pub mod chat_service;
pub mod chat_session;
pub mod debounced_field_writer;
pub mod error;
pub mod events;
pub mod node_state_sync;
pub mod position_batch_writer;

pub use chat_service::{node_chat_name, ChatService};
pub use chat_session::{ChatSession, ChatState, PendingSend};
pub use debounced_field_writer::DebouncedFieldWriter;
pub use error::SyncError;
pub use events::{SyncEvent, EVENT_CHANNEL_CAPACITY};
pub use node_state_sync::{validate_title, GraphChangeOutcome, NodeStateSync, MAX_TITLE_LEN};
pub use position_batch_writer::PositionBatchWriter;
