//! Sync Events
//!
//! Background writers have no caller to return an error to, so their outcomes
//! are published on a tokio broadcast channel. `NodeStateSync::subscribe`
//! hands out receivers; a UI typically shows a toast on `FieldWriteFailed`
//! and keeps the user's text as is.

use crate::models::{CanvasId, NodeId};

/// Capacity of the sync event channel; slow subscribers see `Lagged`
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Outcome notifications emitted by the sync services
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    CanvasLoaded {
        canvas_id: CanvasId,
        node_count: usize,
    },

    NodeCreated { node_id: NodeId },

    NodeDeleted { node_id: NodeId },

    /// A debounced field write reached the server
    FieldsPersisted { node_id: NodeId },

    /// A debounced field write failed; the local edit stays in place
    FieldWriteFailed { node_id: NodeId, error: String },

    PositionsPersisted { count: usize },

    /// A bulk position write failed; local positions stay in place
    PositionWriteFailed { count: usize, error: String },
}

impl SyncEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            SyncEvent::CanvasLoaded { .. } => "canvas:loaded",
            SyncEvent::NodeCreated { .. } => "node:created",
            SyncEvent::NodeDeleted { .. } => "node:deleted",
            SyncEvent::FieldsPersisted { .. } => "fields:persisted",
            SyncEvent::FieldWriteFailed { .. } => "fields:failed",
            SyncEvent::PositionsPersisted { .. } => "positions:persisted",
            SyncEvent::PositionWriteFailed { .. } => "positions:failed",
        }
    }

    /// Whether this event reports a failed background write
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SyncEvent::FieldWriteFailed { .. } | SyncEvent::PositionWriteFailed { .. }
        )
    }
}
