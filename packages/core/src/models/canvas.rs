//! Canvas metadata and viewport

use crate::models::{CanvasId, Position};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Saved pan/zoom of a canvas
///
/// `x`/`y` are the screen-space translation of the flow origin, as stored by
/// the graph view library.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Flow coordinates of the centre of a view of the given pixel size
    pub fn center(&self, view_width: f64, view_height: f64) -> Position {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        Position::new(
            (view_width / 2.0 - self.x) / zoom,
            (view_height / 2.0 - self.y) / zoom,
        )
    }
}

/// Canvas as returned by `GET /canvases/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub id: CanvasId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub viewport: Option<Viewport>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default = "default_true")]
    pub can_write: bool,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// Body of `PUT /canvases/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport_center_is_half_the_view() {
        let center = Viewport::default().center(1200.0, 800.0);
        assert_eq!(center, Position::new(600.0, 400.0));
    }

    #[test]
    fn test_center_accounts_for_pan_and_zoom() {
        let viewport = Viewport {
            x: -200.0,
            y: 100.0,
            zoom: 2.0,
        };
        assert_eq!(viewport.center(1200.0, 800.0), Position::new(400.0, 150.0));
    }

    #[test]
    fn test_canvas_defaults_missing_optional_fields() {
        let canvas: Canvas =
            serde_json::from_value(serde_json::json!({"id": 3, "name": "Acme renewal"})).unwrap();
        assert_eq!(canvas.viewport, None);
        assert!(canvas.can_write);
    }
}
