//! Type-Safe Node Fields
//!
//! The server stores a node's type-specific content as an open JSON object
//! (`data`). On the client that object is held as [`NodeFields`], a tagged
//! union with one variant per node kind, so every read and write goes through
//! the schema table in [`crate::models::schema`].
//!
//! # Examples
//!
//! ```rust
//! use dealcanvas_core::models::{NodeFields, NodeType};
//!
//! let mut fields = NodeFields::empty(NodeType::Risk);
//! fields.set("severity", "high")?;
//! fields.set("mitigation", "Escalate to sponsor")?;
//!
//! assert_eq!(fields.get("severity").as_deref(), Some("high"));
//! assert!(fields.set("assignee", "Dana").is_err());
//! # Ok::<(), dealcanvas_core::models::FieldError>(())
//! ```

use crate::models::schema::{
    ActionStatus, DocumentType, FieldKind, NodeType, RiskProbability, RiskSeverity,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Schema violations for field edits
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Field '{field}' is not part of the {node_type} schema")]
    UnknownField { node_type: NodeType, field: String },

    #[error("Invalid value '{value}' for field '{field}', expected one of: {allowed}")]
    InvalidChoice {
        field: String,
        value: String,
        allowed: String,
    },

    #[error("Invalid {expected} '{value}' for field '{field}'")]
    InvalidDate {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("Field '{field}' must be a string or null")]
    NotText { field: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Meeting start time, kept in the text form it was given
///
/// The value is checked to parse as a datetime but is written back unchanged,
/// so an offset such as `+02:00` survives every round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MeetingDate(String);

impl MeetingDate {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        parse_datetime(value).map(|_| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The instant as UTC; values without an offset are taken as UTC
    pub fn to_naive_utc(&self) -> NaiveDateTime {
        // Construction guarantees the text parses
        parse_datetime(&self.0).unwrap_or_default()
    }
}

impl TryFrom<String> for MeetingDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid datetime '{}'", value))
    }
}

impl From<MeetingDate> for String {
    fn from(date: MeetingDate) -> Self {
        date.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeetingFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<MeetingDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agenda: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActionFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ActionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RiskFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<RiskSeverity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<RiskProbability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompetitorFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strengths: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weaknesses: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of note and generic nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoteFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Type-specific node content, one variant per node kind
///
/// The variant always matches the owning node's `node_type`; there is no
/// operation that switches a node to a different variant after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeFields {
    Person(PersonFields),
    Document(DocumentFields),
    Meeting(MeetingFields),
    Action(ActionFields),
    Risk(RiskFields),
    Competitor(CompetitorFields),
    Note(NoteFields),
    Generic(NoteFields),
}

impl NodeFields {
    /// Empty field set for a node type
    pub fn empty(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Person => Self::Person(PersonFields::default()),
            NodeType::Document => Self::Document(DocumentFields::default()),
            NodeType::Meeting => Self::Meeting(MeetingFields::default()),
            NodeType::Action => Self::Action(ActionFields::default()),
            NodeType::Risk => Self::Risk(RiskFields::default()),
            NodeType::Competitor => Self::Competitor(CompetitorFields::default()),
            NodeType::Note => Self::Note(NoteFields::default()),
            NodeType::Generic => Self::Generic(NoteFields::default()),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Person(_) => NodeType::Person,
            Self::Document(_) => NodeType::Document,
            Self::Meeting(_) => NodeType::Meeting,
            Self::Action(_) => NodeType::Action,
            Self::Risk(_) => NodeType::Risk,
            Self::Competitor(_) => NodeType::Competitor,
            Self::Note(_) => NodeType::Note,
            Self::Generic(_) => NodeType::Generic,
        }
    }

    /// Build fields from a server `data` object
    ///
    /// Keys outside the node type's schema and values that fail validation
    /// are dropped with a warning, so the result always satisfies the schema.
    pub fn from_data(node_type: NodeType, data: &Value) -> Self {
        let mut fields = Self::empty(node_type);
        let Some(object) = data.as_object() else {
            if !data.is_null() {
                tracing::warn!("Ignoring non-object data for {} node", node_type);
            }
            return fields;
        };

        for (key, value) in object {
            let result = match value {
                Value::Null => fields.clear(key),
                Value::String(s) => fields.set(key, s),
                _ => Err(FieldError::NotText { field: key.clone() }),
            };
            if let Err(e) = result {
                tracing::warn!("Dropping data key '{}' on {} node: {}", key, node_type, e);
            }
        }
        fields
    }

    /// Serialize to the server's `data` object (camelCase keys, unset fields omitted)
    pub fn to_data(&self) -> Value {
        let value = match self {
            Self::Person(f) => serde_json::to_value(f),
            Self::Document(f) => serde_json::to_value(f),
            Self::Meeting(f) => serde_json::to_value(f),
            Self::Action(f) => serde_json::to_value(f),
            Self::Risk(f) => serde_json::to_value(f),
            Self::Competitor(f) => serde_json::to_value(f),
            Self::Note(f) | Self::Generic(f) => serde_json::to_value(f),
        };
        // Plain structs of strings, dates and unit enums always serialize
        value.unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Set a field from its text form; an empty or whitespace-only value clears it
    pub fn set(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        let node_type = self.node_type();
        let spec = node_type
            .field(field)
            .ok_or_else(|| FieldError::UnknownField {
                node_type,
                field: field.to_string(),
            })?;

        if value.trim().is_empty() {
            return self.clear(field);
        }

        match spec.kind {
            FieldKind::Text => {
                self.assign_text(field, value.to_string());
                Ok(())
            }
            FieldKind::Date => {
                let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
                    FieldError::InvalidDate {
                        field: field.to_string(),
                        value: value.to_string(),
                        expected: "date",
                    }
                })?;
                if let Self::Action(f) = self {
                    f.due_date = Some(date);
                }
                Ok(())
            }
            FieldKind::DateTime => {
                let datetime = MeetingDate::parse(value).ok_or_else(|| FieldError::InvalidDate {
                    field: field.to_string(),
                    value: value.to_string(),
                    expected: "datetime",
                })?;
                if let Self::Meeting(f) = self {
                    f.date = Some(datetime);
                }
                Ok(())
            }
            FieldKind::Choice(allowed) => {
                let invalid = || FieldError::InvalidChoice {
                    field: field.to_string(),
                    value: value.to_string(),
                    allowed: allowed.join(", "),
                };
                let value = value.trim();
                match (self, field) {
                    (Self::Document(f), "documentType") => {
                        f.document_type = Some(value.parse().map_err(|_| invalid())?)
                    }
                    (Self::Action(f), "status") => {
                        f.status = Some(value.parse().map_err(|_| invalid())?)
                    }
                    (Self::Risk(f), "severity") => {
                        f.severity = Some(value.parse().map_err(|_| invalid())?)
                    }
                    (Self::Risk(f), "probability") => {
                        f.probability = Some(value.parse().map_err(|_| invalid())?)
                    }
                    _ => return Err(invalid()),
                }
                Ok(())
            }
        }
    }

    /// Unset a field
    pub fn clear(&mut self, field: &str) -> Result<(), FieldError> {
        let node_type = self.node_type();
        if node_type.field(field).is_none() {
            return Err(FieldError::UnknownField {
                node_type,
                field: field.to_string(),
            });
        }
        if let Some(slot) = self.text_slot(field) {
            *slot = None;
            return Ok(());
        }
        match (self, field) {
            (Self::Document(f), "documentType") => f.document_type = None,
            (Self::Meeting(f), "date") => f.date = None,
            (Self::Action(f), "dueDate") => f.due_date = None,
            (Self::Action(f), "status") => f.status = None,
            (Self::Risk(f), "severity") => f.severity = None,
            (Self::Risk(f), "probability") => f.probability = None,
            _ => {}
        }
        Ok(())
    }

    /// Text form of a field, `None` when unset or not in the schema
    pub fn get(&self, field: &str) -> Option<String> {
        match self.to_data().get(field)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Number of fields currently set
    pub fn len(&self) -> usize {
        self.to_data().as_object().map_or(0, Map::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn assign_text(&mut self, field: &str, value: String) {
        if let Some(slot) = self.text_slot(field) {
            *slot = Some(value);
        }
    }

    fn text_slot(&mut self, field: &str) -> Option<&mut Option<String>> {
        let slot = match (self, field) {
            (Self::Person(f), "name") => &mut f.name,
            (Self::Person(f), "role") => &mut f.role,
            (Self::Person(f), "email") => &mut f.email,
            (Self::Person(f), "phone") => &mut f.phone,
            (Self::Person(f), "notes") => &mut f.notes,
            (Self::Document(f), "documentName") => &mut f.document_name,
            (Self::Document(f), "url") => &mut f.url,
            (Self::Document(f), "summary") => &mut f.summary,
            (Self::Meeting(f), "attendees") => &mut f.attendees,
            (Self::Meeting(f), "agenda") => &mut f.agenda,
            (Self::Meeting(f), "notes") => &mut f.notes,
            (Self::Action(f), "assignee") => &mut f.assignee,
            (Self::Action(f), "description") => &mut f.description,
            (Self::Risk(f), "description") => &mut f.description,
            (Self::Risk(f), "mitigation") => &mut f.mitigation,
            (Self::Competitor(f), "companyName") => &mut f.company_name,
            (Self::Competitor(f), "strengths") => &mut f.strengths,
            (Self::Competitor(f), "weaknesses") => &mut f.weaknesses,
            (Self::Competitor(f), "notes") => &mut f.notes,
            (Self::Note(f), "content") | (Self::Generic(f), "content") => &mut f.content,
            _ => return None,
        };
        Some(slot)
    }
}

/// Accepts RFC 3339 timestamps (converted to UTC) and HTML `datetime-local` values
fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}
