//! Node Data Structures
//!
//! This module defines the canonical client-side [`Node`] and the wire records
//! exchanged with the remote store.
//!
//! # Architecture
//!
//! - **Canonical Node**: typed fields ([`NodeFields`]), typed ids, typed geometry
//! - **Wire Records**: [`NodeRecord`], [`NewNode`], [`NodeUpdate`] and
//!   [`PositionUpdate`] mirror the REST payloads exactly (snake_case keys,
//!   flat `position_x`/`position_y`, open `data` object)
//! - **Conversion**: `Node::from_record` validates `data` against the node
//!   type's schema; `Node::data` produces the `data` object for writes
//!
//! # Examples
//!
//! ```rust
//! use dealcanvas_core::models::{CanvasId, NewNode, NodeType, Position};
//!
//! let request = NewNode::new(CanvasId(7), NodeType::Person, "Dana Whitfield", Position::new(120.0, 80.0));
//! let body = serde_json::to_value(&request).unwrap();
//! assert_eq!(body["node_type"], "person");
//! assert_eq!(body["position_x"], 120.0);
//! ```

use crate::models::{NodeFields, NodeType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-assigned node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Server-assigned canvas identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanvasId(pub i64);

impl std::fmt::Display for CanvasId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CanvasId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Position on the canvas in flow coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Explicit node size in pixels; absent means auto-sized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i64,
    pub height: i64,
}

/// A positioned, typed unit of deal information
///
/// # Fields
///
/// - `id`: server-assigned id; a `Node` only exists once the server confirmed it
/// - `canvas_id`: owning canvas, never changes
/// - `node_type`: selects the field schema, never changes
/// - `fields`: typed content, always within the node type's schema
/// - `status`: opaque server-computed indicators (`{warnings, indicators}`)
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub canvas_id: CanvasId,
    pub node_type: NodeType,
    pub title: String,
    pub position: Position,
    pub size: Option<Size>,
    pub fields: NodeFields,
    pub exclude_from_context: bool,
    pub status: Option<Value>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Node {
    /// Build the canonical node from a server record
    pub fn from_record(record: NodeRecord) -> Self {
        let fields = NodeFields::from_data(record.node_type, &record.data);
        let size = match (record.width, record.height) {
            (Some(width), Some(height)) => Some(Size { width, height }),
            _ => None,
        };
        Self {
            id: record.id,
            canvas_id: record.canvas_id,
            node_type: record.node_type,
            title: record.title,
            position: Position::new(record.position_x, record.position_y),
            size,
            fields,
            exclude_from_context: record.exclude_from_context,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    /// The `data` object sent to the server for this node's fields
    pub fn data(&self) -> Value {
        self.fields.to_data()
    }

    /// Adopt server-owned attributes from a write response
    ///
    /// Fields are left alone because the local copy may already hold newer
    /// keystrokes than the record the server answered with.
    pub fn merge_server_record(&mut self, record: &NodeRecord) {
        self.title = record.title.clone();
        self.exclude_from_context = record.exclude_from_context;
        self.status = record.status.clone();
        self.updated_at = record.updated_at;
    }
}

/// Node as returned by the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub canvas_id: CanvasId,
    pub node_type: NodeType,
    pub title: String,
    pub position_x: f64,
    pub position_y: f64,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub exclude_from_context: bool,
    #[serde(default)]
    pub content_size: Option<i64>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of `POST /nodes/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNode {
    pub canvas_id: CanvasId,
    pub node_type: NodeType,
    pub title: String,
    pub position_x: f64,
    pub position_y: f64,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
}

impl NewNode {
    pub fn new(
        canvas_id: CanvasId,
        node_type: NodeType,
        title: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            canvas_id,
            node_type,
            title: title.into(),
            position_x: position.x,
            position_y: position.y,
            data: NodeFields::empty(node_type).to_data(),
            width: None,
            height: None,
        }
    }

    pub fn with_fields(mut self, fields: &NodeFields) -> Self {
        self.data = fields.to_data();
        self
    }
}

/// Body of `PUT /nodes/{id}`; only provided fields are changed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_x: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_y: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,

    /// Full replacement of the node's `data` object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_from_context: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
}

impl NodeUpdate {
    /// Create a new empty NodeUpdate
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position_x = Some(position.x);
        self.position_y = Some(position.y);
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.width = Some(size.width);
        self.height = Some(size.height);
        self
    }

    pub fn with_exclude_from_context(mut self, exclude: bool) -> Self {
        self.exclude_from_context = Some(exclude);
        self
    }

    /// Check if update contains any changes
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.position_x.is_none()
            && self.position_y.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.data.is_none()
            && self.exclude_from_context.is_none()
            && self.status.is_none()
    }
}

/// One entry of `POST /nodes/bulk-update-positions`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: NodeId,
    pub position_x: f64,
    pub position_y: f64,
}

impl PositionUpdate {
    pub fn new(id: NodeId, position: Position) -> Self {
        Self {
            id,
            position_x: position.x,
            position_y: position.y,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.position_x, self.position_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person_record() -> NodeRecord {
        serde_json::from_value(json!({
            "id": 42,
            "canvas_id": 7,
            "node_type": "person",
            "title": "Dana Whitfield",
            "position_x": 120.5,
            "position_y": -40.0,
            "width": 280,
            "height": null,
            "data": {"name": "Dana", "role": "CFO", "budget": "unknown"},
            "exclude_from_context": false,
            "content_size": 12,
            "status": null,
            "created_at": "2025-03-01T09:00:00Z",
            "updated_at": "2025-03-02T10:30:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_from_record_drops_keys_outside_schema() {
        let node = Node::from_record(person_record());

        assert_eq!(node.id, NodeId(42));
        assert_eq!(node.node_type, NodeType::Person);
        assert_eq!(node.position, Position::new(120.5, -40.0));
        assert_eq!(node.fields.get("name").as_deref(), Some("Dana"));
        assert_eq!(node.fields.get("role").as_deref(), Some("CFO"));
        assert_eq!(node.data(), json!({"name": "Dana", "role": "CFO"}));
    }

    #[test]
    fn test_partial_size_is_treated_as_auto() {
        let node = Node::from_record(person_record());
        assert_eq!(node.size, None);
    }

    #[test]
    fn test_node_update_serializes_only_provided_fields() {
        let update = NodeUpdate::new().with_title("Renamed");
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"title": "Renamed"}));
        assert!(!update.is_empty());
        assert!(NodeUpdate::new().is_empty());
    }

    #[test]
    fn test_merge_server_record_keeps_local_fields() {
        let mut node = Node::from_record(person_record());
        node.fields.set("notes", "typed locally").unwrap();

        let mut record = person_record();
        record.title = "Dana W.".to_string();
        record.data = json!({});
        node.merge_server_record(&record);

        assert_eq!(node.title, "Dana W.");
        assert_eq!(node.fields.get("notes").as_deref(), Some("typed locally"));
    }
}
