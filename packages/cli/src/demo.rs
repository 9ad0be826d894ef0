//! Offline walkthrough
//!
//! Seeds an `InMemoryStore` with a small deal canvas and drives the sync core
//! the way the canvas UI would: typing into a field, dragging two nodes at
//! once, creating and deleting a node, and one assistant exchange. The store's
//! call log is printed at the end so the debounce and batching are visible.

use crate::print_nodes;
use anyhow::Result;
use dealcanvas_core::db::{InMemoryStore, StoreCall};
use dealcanvas_core::graph_view::NodeChange;
use dealcanvas_core::models::{CanvasId, NewNode, NodeFields, NodeType, Position};
use dealcanvas_core::services::{ChatService, NodeStateSync, SyncEvent};
use dealcanvas_core::SyncConfig;
use std::sync::Arc;
use std::time::Duration;

const CANVAS: CanvasId = CanvasId(1);

fn seed(store: &InMemoryStore) -> Result<()> {
    store.seed_canvas(CANVAS, "Acme Corp renewal");

    let mut dana = NodeFields::empty(NodeType::Person);
    dana.set("name", "Dana Whitfield")?;
    dana.set("role", "CFO")?;
    store.seed_node(
        NewNode::new(CANVAS, NodeType::Person, "Dana Whitfield", Position::new(0.0, 0.0))
            .with_fields(&dana),
    );

    let mut risk = NodeFields::empty(NodeType::Risk);
    risk.set("severity", "high")?;
    risk.set("description", "Budget freeze in Q3")?;
    store.seed_node(
        NewNode::new(CANVAS, NodeType::Risk, "Budget freeze", Position::new(320.0, 0.0))
            .with_fields(&risk),
    );

    store.seed_node(NewNode::new(
        CANVAS,
        NodeType::Competitor,
        "Globex",
        Position::new(160.0, 240.0),
    ));
    Ok(())
}

fn describe(call: &StoreCall) -> String {
    match call {
        StoreCall::UpdateNode(id, update) => format!(
            "PUT /nodes/{} {}",
            id,
            serde_json::to_string(update).unwrap_or_default()
        ),
        StoreCall::BulkUpdatePositions(updates) => format!(
            "POST /nodes/bulk-update-positions ({} node(s))",
            updates.len()
        ),
        other => format!("{:?}", other.operation()),
    }
}

pub async fn run() -> Result<()> {
    println!("🧪 DealCanvas offline demo\n");

    let store = Arc::new(InMemoryStore::new());
    seed(&store)?;

    let config = SyncConfig {
        field_debounce_ms: 300,
        ..SyncConfig::default()
    };
    let quiet = config.field_debounce();
    let mut sync = NodeStateSync::new(store.clone(), config);
    let mut events = sync.subscribe();

    sync.load(CANVAS).await?;
    println!("📂 Loaded '{}'", sync.canvas().map_or("", |c| c.name.as_str()));
    print_nodes(sync.nodes());

    let ids: Vec<_> = sync.nodes().iter().map(|n| n.id).collect();
    let (dana, risk, globex) = (ids[0], ids[1], ids[2]);

    println!("\n⌨️  Typing notes on Dana, one keystroke every 60ms...");
    let text = "Prefers email";
    for end in 1..=text.len() {
        sync.apply_field_edit(dana, "notes", &text[..end])?;
        tokio::time::sleep(Duration::from_millis(60)).await;
    }
    tokio::time::sleep(quiet + Duration::from_millis(100)).await;

    println!("🖱️  Dragging Dana and the risk together...");
    let outcome = sync
        .apply_graph_changes(vec![
            NodeChange::Position {
                id: dana,
                position: Some(Position::new(40.0, 60.0)),
                dragging: true,
            },
            NodeChange::Position {
                id: dana,
                position: Some(Position::new(100.0, 200.0)),
                dragging: false,
            },
            NodeChange::Position {
                id: risk,
                position: Some(Position::new(50.0, 50.0)),
                dragging: false,
            },
        ])
        .await;
    println!("   {} position(s) persisted in one request", outcome.persisted_positions);

    println!("➕ Creating an action at the visible centre...");
    let action = sync
        .create_node(NodeType::Action, "Send revised proposal", None)
        .await?;
    sync.apply_field_edit(action.id, "status", "todo")?;
    sync.apply_field_edit(action.id, "dueDate", "2025-07-01")?;

    println!("🗑️  Deleting Globex while it has an unsaved edit...");
    sync.apply_field_edit(globex, "strengths", "Lower list price")?;
    sync.delete_node(globex).await?;

    println!("💬 Asking Dana's assistant...");
    let chats = ChatService::new(store.clone());
    let dana_title = sync.node(dana).map(|n| n.title.clone()).unwrap_or_default();
    let mut session = chats.open_node_chat(CANVAS, dana, &dana_title).await?;
    session.set_include_canvas_context(false);
    let reply = session.send("How should we open the pricing talk?").await?;
    println!("   assistant: {}", reply.content);

    let flushed = sync.close().await;
    println!("💾 Flushed {} pending field write(s) on close\n", flushed);

    print_nodes(sync.nodes());

    println!("\n📜 Requests received by the store:");
    for call in store.calls() {
        println!("   {}", describe(&call));
    }

    let mut failures = 0;
    while let Ok(event) = events.try_recv() {
        if let SyncEvent::FieldWriteFailed { node_id, error } = &event {
            println!("⚠️  Field write for node {} failed: {}", node_id, error);
            failures += 1;
        }
    }
    if failures == 0 {
        println!("\n✅ Demo finished without write failures");
    }
    Ok(())
}
