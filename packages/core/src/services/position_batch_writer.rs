//! Position Batch Writer
//!
//! Accumulates final node positions (one per node, last write wins) and sends
//! them as a single `POST /nodes/bulk-update-positions` on flush. A failed
//! flush is reported and not re-queued; the local positions stay where the
//! user dropped the nodes.

use crate::db::RemoteStore;
use crate::models::{NodeId, Position, PositionUpdate};
use crate::services::error::SyncError;
use crate::services::events::SyncEvent;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct PositionBatchWriter {
    store: Arc<dyn RemoteStore>,
    pending: BTreeMap<NodeId, Position>,
    events: broadcast::Sender<SyncEvent>,
}

impl PositionBatchWriter {
    pub fn new(store: Arc<dyn RemoteStore>, events: broadcast::Sender<SyncEvent>) -> Self {
        Self {
            store,
            pending: BTreeMap::new(),
            events,
        }
    }

    /// Record a node's final position, replacing any earlier entry
    pub fn enqueue(&mut self, node_id: NodeId, position: Position) {
        self.pending.insert(node_id, position);
    }

    /// Withdraw a node's queued position
    pub fn remove(&mut self, node_id: NodeId) -> Option<Position> {
        self.pending.remove(&node_id)
    }

    /// Put back a withdrawn position unless a newer one was queued meanwhile
    pub fn restore(&mut self, node_id: NodeId, position: Position) {
        self.pending.entry(node_id).or_insert(position);
    }

    pub fn pending_position(&self, node_id: NodeId) -> Option<Position> {
        self.pending.get(&node_id).copied()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Send every queued position in one bulk call
    ///
    /// An empty queue makes no network call and returns `Ok(0)`.
    pub async fn flush(&mut self) -> Result<usize, SyncError> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let updates: Vec<PositionUpdate> = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(node_id, position)| PositionUpdate::new(node_id, position))
            .collect();
        let count = updates.len();

        match self.store.bulk_update_positions(updates).await {
            Ok(()) => {
                tracing::debug!("Persisted {} node position(s)", count);
                let _ = self.events.send(SyncEvent::PositionsPersisted { count });
                Ok(count)
            }
            Err(e) => {
                tracing::warn!("Bulk position write of {} node(s) failed: {}", count, e);
                let _ = self.events.send(SyncEvent::PositionWriteFailed {
                    count,
                    error: e.to_string(),
                });
                Err(SyncError::batch_write(count, e))
            }
        }
    }
}
