//! Data Models
//!
//! This module contains the core data structures used throughout DealCanvas:
//!
//! - `Node` - Canonical canvas node with typed fields
//! - `NodeFields` - Tagged union of per-type field sets, validated by the schema table
//! - `Canvas` / `Viewport` - Canvas metadata and saved pan/zoom
//! - `Chat` / `Message` - Conversations with the AI assistant
//!
//! Wire records (`NodeRecord`, `NodeUpdate`, ...) mirror the REST payloads and
//! are converted to the canonical types at the service boundary.

mod canvas;
mod chat;
mod fields;
mod node;
pub mod schema;

#[cfg(test)]
mod fields_test;

pub use canvas::{Canvas, CanvasUpdate, Viewport};
pub use chat::{
    Chat, ChatId, ChatType, CreateChatRequest, Message, MessageRole, SendMessageRequest,
};
pub use fields::{
    ActionFields, CompetitorFields, DocumentFields, FieldError, MeetingDate, MeetingFields,
    NodeFields, NoteFields, PersonFields, RiskFields,
};
pub use node::{CanvasId, NewNode, Node, NodeId, NodeRecord, NodeUpdate, Position, PositionUpdate, Size};
pub use schema::{
    ActionStatus, DocumentType, FieldKind, FieldSpec, NodeType, RiskProbability, RiskSeverity,
};
