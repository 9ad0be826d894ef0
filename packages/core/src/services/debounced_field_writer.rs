//! Debounced Field Writer
//!
//! Coalesces rapid field edits into one `PUT /nodes/{id}` per node once the
//! edits go quiet.
//!
//! ## Per-Node Timers
//!
//! Every `schedule` call replaces the node's pending snapshot and restarts its
//! quiet timer. Timers are independent per node, so typing in node A never
//! delays or absorbs the write for node B.
//!
//! Each scheduled write is a spawned tokio task tagged with a generation
//! number. When its timer fires the task re-reads the pending entry and only
//! writes if its generation is still the latest; a superseded or cancelled
//! task never reaches the store. The entry stays registered while the request
//! is in flight, so `cancel` also aborts a write that already started.
//!
//! ## Teardown
//!
//! Dropping the writer aborts every pending timer. Callers that want pending
//! edits persisted instead call [`DebouncedFieldWriter::flush_all`] first.

use crate::db::RemoteStore;
use crate::models::{NodeId, NodeUpdate};
use crate::services::events::SyncEvent;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

struct PendingWrite {
    generation: u64,
    snapshot: Value,
    handle: JoinHandle<()>,
}

type PendingMap = Arc<Mutex<HashMap<NodeId, PendingWrite>>>;

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<NodeId, PendingWrite>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-node debounced writer of node `data` snapshots
pub struct DebouncedFieldWriter {
    store: Arc<dyn RemoteStore>,
    quiet: Duration,
    pending: PendingMap,
    next_generation: AtomicU64,
    events: broadcast::Sender<SyncEvent>,
}

impl DebouncedFieldWriter {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        quiet: Duration,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        Self {
            store,
            quiet,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            events,
        }
    }

    pub fn quiet_interval(&self) -> Duration {
        self.quiet
    }

    /// Replace the node's pending snapshot and restart its quiet timer
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, node_id: NodeId, snapshot: Value) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        // Held across spawn + insert so the task cannot observe the map first
        let mut pending = lock(&self.pending);
        if let Some(previous) = pending.remove(&node_id) {
            previous.handle.abort();
            tracing::trace!("Superseded pending field write for node {}", node_id);
        }

        let handle = tokio::spawn(Self::write_after_quiet(
            self.store.clone(),
            self.pending.clone(),
            self.events.clone(),
            self.quiet,
            node_id,
            generation,
        ));

        pending.insert(
            node_id,
            PendingWrite {
                generation,
                snapshot,
                handle,
            },
        );
    }

    async fn write_after_quiet(
        store: Arc<dyn RemoteStore>,
        pending: PendingMap,
        events: broadcast::Sender<SyncEvent>,
        quiet: Duration,
        node_id: NodeId,
        generation: u64,
    ) {
        tokio::time::sleep(quiet).await;

        let snapshot = match lock(&pending).get(&node_id) {
            Some(entry) if entry.generation == generation => entry.snapshot.clone(),
            _ => return,
        };

        tracing::debug!("Persisting debounced fields for node {}", node_id);
        let result = store
            .update_node(node_id, NodeUpdate::new().with_data(snapshot))
            .await;

        {
            let mut map = lock(&pending);
            if map
                .get(&node_id)
                .is_some_and(|entry| entry.generation == generation)
            {
                map.remove(&node_id);
            }
        }

        let event = match result {
            Ok(_) => SyncEvent::FieldsPersisted { node_id },
            Err(e) => {
                tracing::warn!("Field write for node {} failed: {}", node_id, e);
                SyncEvent::FieldWriteFailed {
                    node_id,
                    error: e.to_string(),
                }
            }
        };
        // No subscribers is fine
        let _ = events.send(event);
    }

    /// Withdraw the node's pending write, returning its snapshot
    pub fn take(&self, node_id: NodeId) -> Option<Value> {
        let entry = lock(&self.pending).remove(&node_id)?;
        entry.handle.abort();
        Some(entry.snapshot)
    }

    /// Drop the node's pending write without sending it
    pub fn cancel(&self, node_id: NodeId) -> bool {
        let cancelled = self.take(node_id).is_some();
        if cancelled {
            tracing::debug!("Cancelled pending field write for node {}", node_id);
        }
        cancelled
    }

    /// The snapshot that will be written for this node, if any
    pub fn pending_snapshot(&self, node_id: NodeId) -> Option<Value> {
        lock(&self.pending)
            .get(&node_id)
            .map(|entry| entry.snapshot.clone())
    }

    pub fn is_pending(&self, node_id: NodeId) -> bool {
        lock(&self.pending).contains_key(&node_id)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Abort every pending write; returns how many were dropped
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<PendingWrite> = lock(&self.pending).drain().map(|(_, e)| e).collect();
        for entry in &drained {
            entry.handle.abort();
        }
        drained.len()
    }

    /// Send every pending snapshot now instead of waiting for its timer
    ///
    /// Returns the number of writes that succeeded. Failures are logged and
    /// published as `FieldWriteFailed`, the same as timer-driven writes.
    pub async fn flush_all(&self) -> usize {
        let drained: Vec<(NodeId, Value)> = {
            let mut pending = lock(&self.pending);
            pending
                .drain()
                .map(|(node_id, entry)| {
                    entry.handle.abort();
                    (node_id, entry.snapshot)
                })
                .collect()
        };

        let mut persisted = 0;
        for (node_id, snapshot) in drained {
            match self
                .store
                .update_node(node_id, NodeUpdate::new().with_data(snapshot))
                .await
            {
                Ok(_) => {
                    persisted += 1;
                    let _ = self.events.send(SyncEvent::FieldsPersisted { node_id });
                }
                Err(e) => {
                    tracing::warn!("Flushing fields for node {} failed: {}", node_id, e);
                    let _ = self.events.send(SyncEvent::FieldWriteFailed {
                        node_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        persisted
    }
}

impl Drop for DebouncedFieldWriter {
    fn drop(&mut self) {
        let dropped = self.cancel_all();
        if dropped > 0 {
            tracing::debug!("Dropped {} pending field write(s) on teardown", dropped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, StoreCall, StoreOperation};
    use crate::models::{CanvasId, NewNode, NodeType, Position};
    use serde_json::json;

    const QUIET: Duration = Duration::from_millis(500);

    fn setup() -> (Arc<InMemoryStore>, DebouncedFieldWriter, NodeId, NodeId) {
        let store = Arc::new(InMemoryStore::new());
        store.seed_canvas(CanvasId(1), "Deal");
        let a = store
            .seed_node(NewNode::new(CanvasId(1), NodeType::Note, "A", Position::default()))
            .id;
        let b = store
            .seed_node(NewNode::new(CanvasId(1), NodeType::Note, "B", Position::default()))
            .id;
        let (events, _) = broadcast::channel(16);
        let writer = DebouncedFieldWriter::new(store.clone(), QUIET, events);
        (store, writer, a, b)
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_schedules_coalesce_into_last_snapshot() {
        let (store, writer, a, _) = setup();

        for text in ["H", "He", "Hel", "Hell", "Hello"] {
            writer.schedule(a, json!({"content": text}));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(store.calls_of(StoreOperation::UpdateNode).is_empty());

        tokio::time::sleep(QUIET).await;
        settle().await;

        assert_eq!(
            store.calls_of(StoreOperation::UpdateNode),
            vec![StoreCall::UpdateNode(
                a,
                NodeUpdate::new().with_data(json!({"content": "Hello"}))
            )]
        );
        assert!(!writer.is_pending(a));
    }

    #[tokio::test(start_paused = true)]
    async fn test_nodes_have_independent_timers() {
        let (store, writer, a, b) = setup();

        writer.schedule(a, json!({"content": "a"}));
        tokio::time::sleep(Duration::from_millis(300)).await;
        writer.schedule(b, json!({"content": "b"}));

        tokio::time::sleep(Duration::from_millis(250)).await;
        settle().await;
        let writes = store.calls_of(StoreOperation::UpdateNode);
        assert_eq!(writes.len(), 1);
        assert!(writes[0].writes_node(a));

        tokio::time::sleep(Duration::from_millis(300)).await;
        settle().await;
        assert_eq!(store.calls_of(StoreOperation::UpdateNode).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_write() {
        let (store, writer, a, _) = setup();

        writer.schedule(a, json!({"content": "gone"}));
        assert!(writer.cancel(a));
        assert!(!writer.cancel(a));

        tokio::time::sleep(QUIET * 2).await;
        settle().await;
        assert!(store.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_is_published() {
        let (store, writer, a, _) = setup();
        let mut rx = writer.events.subscribe();
        store.fail(StoreOperation::UpdateNode);

        writer.schedule(a, json!({"content": "x"}));
        tokio::time::sleep(QUIET).await;
        settle().await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "fields:failed");
        assert!(!writer.is_pending(a));
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_all_writes_immediately() {
        let (store, writer, a, b) = setup();

        writer.schedule(a, json!({"content": "a"}));
        writer.schedule(b, json!({"content": "b"}));
        assert_eq!(writer.flush_all().await, 2);
        assert_eq!(writer.pending_count(), 0);

        tokio::time::sleep(QUIET * 2).await;
        settle().await;
        assert_eq!(store.calls_of(StoreOperation::UpdateNode).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending_writes() {
        let (store, writer, a, _) = setup();

        writer.schedule(a, json!({"content": "unsaved"}));
        drop(writer);

        tokio::time::sleep(QUIET * 2).await;
        settle().await;
        assert!(store.calls().is_empty());
    }
}
