//! Graph View Adapter
//!
//! Thin projection between canonical [`Node`]s and the node/change shapes a
//! node-graph view library works with. Nothing here touches the network:
//! [`to_view_nodes`] renders, and [`NodeChange`] parses the view's change
//! notifications so `NodeStateSync::apply_graph_changes` can route them.
//!
//! # Examples
//!
//! ```rust
//! use dealcanvas_core::graph_view::NodeChange;
//! use dealcanvas_core::models::{NodeId, Position};
//!
//! let change: NodeChange = serde_json::from_str(
//!     r#"{"type":"position","id":"12","position":{"x":100.0,"y":200.0},"dragging":false}"#,
//! ).unwrap();
//! assert_eq!(
//!     change,
//!     NodeChange::Position { id: NodeId(12), position: Some(Position::new(100.0, 200.0)), dragging: false },
//! );
//! ```

use crate::models::{Node, NodeId, NodeType, Position, Size};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Node as handed to the view; ids are strings on the view side
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewNode {
    #[serde(serialize_with = "id_as_string")]
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeType,
    pub position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    pub data: ViewNodeData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewNodeData {
    pub label: String,
    pub node_type: NodeType,
    pub type_label: &'static str,
    pub fields: Value,
    pub exclude_from_context: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
}

impl From<&Node> for ViewNode {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id,
            kind: node.node_type,
            position: node.position,
            width: node.size.map(|s| s.width),
            height: node.size.map(|s| s.height),
            data: ViewNodeData {
                label: node.title.clone(),
                node_type: node.node_type,
                type_label: node.node_type.label(),
                fields: node.data(),
                exclude_from_context: node.exclude_from_context,
                status: node.status.clone(),
            },
        }
    }
}

/// Project the canonical node list into view nodes
pub fn to_view_nodes(nodes: &[Node]) -> Vec<ViewNode> {
    nodes.iter().map(ViewNode::from).collect()
}

/// Measured or user-resized dimensions reported by the view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewDimensions {
    pub width: f64,
    pub height: f64,
}

impl ViewDimensions {
    pub fn to_size(self) -> Size {
        Size {
            width: self.width.round() as i64,
            height: self.height.round() as i64,
        }
    }
}

/// A change notification emitted by the view
///
/// Several changes arrive together in one notification; a drag of a
/// multi-selection ends with one `Position { dragging: false }` per node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeChange {
    /// Drag progress (`dragging == true`) or drag completion
    Position {
        #[serde(deserialize_with = "id_from_string")]
        id: NodeId,
        #[serde(default)]
        position: Option<Position>,
        #[serde(default)]
        dragging: bool,
    },

    /// `resizing == Some(false)` marks the end of a user resize; `None` is a
    /// layout measurement
    Dimensions {
        #[serde(deserialize_with = "id_from_string")]
        id: NodeId,
        #[serde(default)]
        dimensions: Option<ViewDimensions>,
        #[serde(default)]
        resizing: Option<bool>,
    },

    Select {
        #[serde(deserialize_with = "id_from_string")]
        id: NodeId,
        selected: bool,
    },

    /// The view asks to delete; never executed without confirmation
    Remove {
        #[serde(deserialize_with = "id_from_string")]
        id: NodeId,
    },

    /// `add`, `replace`, `reset` and any later kinds; the view owns these
    #[serde(other)]
    Other,
}

impl NodeChange {
    /// Target node; `None` for kinds this adapter does not handle
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            NodeChange::Position { id, .. }
            | NodeChange::Dimensions { id, .. }
            | NodeChange::Select { id, .. }
            | NodeChange::Remove { id } => Some(*id),
            NodeChange::Other => None,
        }
    }

    /// Whether this change ends a drag gesture
    pub fn is_drag_end(&self) -> bool {
        matches!(self, NodeChange::Position { dragging: false, .. })
    }
}

fn id_as_string<S: Serializer>(id: &NodeId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

fn id_from_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NodeId, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(NodeId(n)),
        RawId::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
