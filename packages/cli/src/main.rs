//! DealCanvas command-line client
//!
//! Talks to the DealCanvas REST API through `dealcanvas-core`:
//!
//!   dealcanvas nodes <canvas>                       list nodes
//!   dealcanvas move <canvas> <node> <x> <y>         move and persist
//!   dealcanvas edit <canvas> <node> <field> <value> edit a field (or `title`)
//!   dealcanvas chat <canvas> <node> <message...>    ask the node's assistant
//!   dealcanvas demo                                 offline walkthrough
//!
//! # Environment
//!
//! - `DEALCANVAS_TOKEN` - bearer token (required except for `demo`)
//! - `DEALCANVAS_API_URL`, `DEALCANVAS_FIELD_DEBOUNCE_MS`,
//!   `DEALCANVAS_REQUEST_TIMEOUT_SECS` - see `SyncConfig::from_env`
//! - `RUST_LOG` - log filter, default `dealcanvas_cli=info,dealcanvas_core=info`

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dealcanvas_core::db::{HttpStore, RemoteStore};
use dealcanvas_core::models::{CanvasId, Node, NodeId, Position};
use dealcanvas_core::services::{ChatService, NodeStateSync};
use dealcanvas_core::SyncConfig;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod demo;

const DEFAULT_LOG_FILTER: &str = "dealcanvas_cli=info,dealcanvas_core=info";

#[derive(Parser)]
#[command(name = "dealcanvas")]
#[command(about = "DealCanvas - inspect and edit deal canvases from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the nodes of a canvas
    Nodes {
        canvas_id: CanvasId,

        /// Print the nodes in the graph view's JSON shape
        #[arg(long)]
        json: bool,
    },

    /// Move a node and persist its position
    Move {
        canvas_id: CanvasId,
        node_id: NodeId,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },

    /// Edit one field of a node; `title` renames the node
    Edit {
        canvas_id: CanvasId,
        node_id: NodeId,
        field: String,
        /// Empty string clears the field
        value: String,
    },

    /// Send a message in the node's assistant chat, creating it on first use
    Chat {
        canvas_id: CanvasId,
        node_id: NodeId,
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,

        /// Do not let the assistant see the rest of the canvas
        #[arg(long)]
        no_canvas_context: bool,
    },

    /// Run an offline walkthrough against an in-memory store
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    if let Commands::Demo = cli.command {
        return demo::run().await;
    }

    let config = SyncConfig::from_env().map_err(anyhow::Error::msg)?;
    let token = std::env::var("DEALCANVAS_TOKEN").context("DEALCANVAS_TOKEN is not set")?;
    let store: Arc<dyn RemoteStore> = Arc::new(
        HttpStore::from_config(&config, token).context("Failed to create HTTP client")?,
    );
    tracing::debug!("Using API at {}", config.api_base_url);

    let mut sync = NodeStateSync::new(store.clone(), config);

    match cli.command {
        Commands::Nodes { canvas_id, json } => {
            load(&mut sync, canvas_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sync.view_nodes())?);
            } else {
                print_nodes(sync.nodes());
            }
        }
        Commands::Move {
            canvas_id,
            node_id,
            x,
            y,
        } => {
            load(&mut sync, canvas_id).await?;
            sync.apply_move(node_id, Position::new(x, y), false)?;
            sync.flush_positions().await?;
            println!("✅ Moved node {} to ({}, {})", node_id, x, y);
        }
        Commands::Edit {
            canvas_id,
            node_id,
            field,
            value,
        } => {
            load(&mut sync, canvas_id).await?;
            if field == "title" {
                if sync.apply_title_edit(node_id, &value).await? {
                    println!("✅ Renamed node {}", node_id);
                } else {
                    println!("ℹ️  Title unchanged");
                }
            } else {
                sync.apply_field_edit(node_id, &field, &value)?;
                if !sync.field_writer().is_pending(node_id) {
                    println!("ℹ️  '{}' unchanged", field);
                } else if sync.close().await == 0 {
                    bail!("Saving '{}' on node {} failed", field, node_id);
                } else {
                    println!("✅ Saved '{}' on node {}", field, node_id);
                }
            }
        }
        Commands::Chat {
            canvas_id,
            node_id,
            message,
            no_canvas_context,
        } => {
            load(&mut sync, canvas_id).await?;
            let title = sync
                .node(node_id)
                .map(|n| n.title.clone())
                .with_context(|| format!("Node {} is not on canvas {}", node_id, canvas_id))?;

            let chats = ChatService::new(store);
            let mut session = chats.open_node_chat(canvas_id, node_id, &title).await?;
            session.set_include_canvas_context(!no_canvas_context);
            println!("💬 {} ({} earlier message(s))", session.chat().name, session.messages().len());

            let reply = session.send(&message.join(" ")).await?;
            println!("\n{}", reply.content);
        }
        Commands::Demo => {}
    }

    sync.close().await;
    Ok(())
}

async fn load(sync: &mut NodeStateSync, canvas_id: CanvasId) -> Result<()> {
    sync.load(canvas_id)
        .await
        .with_context(|| format!("Could not open canvas {}", canvas_id))?;
    if let Some(canvas) = sync.canvas() {
        if !canvas.can_write {
            tracing::warn!("Canvas {} is read-only for this account", canvas.id);
        }
    }
    Ok(())
}

pub(crate) fn print_nodes(nodes: &[Node]) {
    if nodes.is_empty() {
        println!("(no nodes)");
        return;
    }
    for node in nodes {
        println!(
            "{:>6}  {:<11} {}  @ ({:.0}, {:.0})",
            node.id.0,
            node.node_type.label(),
            node.title,
            node.position.x,
            node.position.y
        );
        for spec in node.node_type.schema() {
            if let Some(value) = node.fields.get(spec.name) {
                println!("          {}: {}", spec.name, value);
            }
        }
    }
}
