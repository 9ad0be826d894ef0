//! Node Type Schema Table
//!
//! Every node on a canvas carries a `node_type` tag that selects a fixed field
//! schema. This module holds the tag itself, the choice enums used by some
//! fields, and the static table describing which fields each type accepts.
//!
//! ## Schema Table
//!
//! | type | fields |
//! |------|--------|
//! | person | name, role, email, phone, notes |
//! | document | documentName, documentType, url, summary |
//! | meeting | date, attendees, agenda, notes |
//! | action | assignee, dueDate, status, description |
//! | risk | severity, probability, description, mitigation |
//! | competitor | companyName, strengths, weaknesses, notes |
//! | note / generic | content |

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Node type tag selecting the field schema
///
/// Unknown tags coming from the server parse as `Generic`, so a canvas
/// containing a node type this client does not know still loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Person,
    Document,
    Meeting,
    Note,
    Action,
    Risk,
    Competitor,
    Generic,
}

impl NodeType {
    /// All node types in display order
    pub const ALL: [NodeType; 8] = [
        NodeType::Person,
        NodeType::Document,
        NodeType::Meeting,
        NodeType::Note,
        NodeType::Action,
        NodeType::Risk,
        NodeType::Competitor,
        NodeType::Generic,
    ];

    /// Wire tag for this node type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Document => "document",
            Self::Meeting => "meeting",
            Self::Note => "note",
            Self::Action => "action",
            Self::Risk => "risk",
            Self::Competitor => "competitor",
            Self::Generic => "generic",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Document => "Document",
            Self::Meeting => "Meeting",
            Self::Note => "Note",
            Self::Action => "Action",
            Self::Risk => "Risk",
            Self::Competitor => "Competitor",
            Self::Generic => "Generic",
        }
    }

    /// Parse a wire tag, falling back to `Generic` for unknown tags
    pub fn from_tag(tag: &str) -> Self {
        tag.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown node type '{}', using generic schema", tag);
            Self::Generic
        })
    }

    /// Field schema for this node type
    pub fn schema(&self) -> &'static [FieldSpec] {
        match self {
            Self::Person => PERSON_SCHEMA,
            Self::Document => DOCUMENT_SCHEMA,
            Self::Meeting => MEETING_SCHEMA,
            Self::Action => ACTION_SCHEMA,
            Self::Risk => RISK_SCHEMA,
            Self::Competitor => COMPETITOR_SCHEMA,
            Self::Note | Self::Generic => CONTENT_SCHEMA,
        }
    }

    /// Look up a field by wire name
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.schema().iter().find(|spec| spec.name == name)
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "person" => Ok(Self::Person),
            "document" => Ok(Self::Document),
            "meeting" => Ok(Self::Meeting),
            "note" => Ok(Self::Note),
            "action" => Ok(Self::Action),
            "risk" => Ok(Self::Risk),
            "competitor" => Ok(Self::Competitor),
            "generic" => Ok(Self::Generic),
            _ => Err(format!("Invalid node type: {}", s)),
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

/// Value kind of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text
    Text,
    /// Calendar date (`YYYY-MM-DD`)
    Date,
    /// Date and time (`YYYY-MM-DDTHH:MM[:SS]` or RFC 3339)
    DateTime,
    /// One of a closed set of wire values
    Choice(&'static [&'static str]),
}

/// A single entry in a node type's schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Wire name of the field inside the node's `data` object
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Text,
    }
}

const PERSON_SCHEMA: &[FieldSpec] = &[
    text("name"),
    text("role"),
    text("email"),
    text("phone"),
    text("notes"),
];

const DOCUMENT_SCHEMA: &[FieldSpec] = &[
    text("documentName"),
    FieldSpec {
        name: "documentType",
        kind: FieldKind::Choice(DocumentType::VALUES),
    },
    text("url"),
    text("summary"),
];

const MEETING_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "date",
        kind: FieldKind::DateTime,
    },
    text("attendees"),
    text("agenda"),
    text("notes"),
];

const ACTION_SCHEMA: &[FieldSpec] = &[
    text("assignee"),
    FieldSpec {
        name: "dueDate",
        kind: FieldKind::Date,
    },
    FieldSpec {
        name: "status",
        kind: FieldKind::Choice(ActionStatus::VALUES),
    },
    text("description"),
];

const RISK_SCHEMA: &[FieldSpec] = &[
    FieldSpec {
        name: "severity",
        kind: FieldKind::Choice(RiskSeverity::VALUES),
    },
    FieldSpec {
        name: "probability",
        kind: FieldKind::Choice(RiskProbability::VALUES),
    },
    text("description"),
    text("mitigation"),
];

const COMPETITOR_SCHEMA: &[FieldSpec] = &[
    text("companyName"),
    text("strengths"),
    text("weaknesses"),
    text("notes"),
];

const CONTENT_SCHEMA: &[FieldSpec] = &[text("content")];

/// Declares a closed-choice field enum with its wire values
macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Accepted wire values
            pub const VALUES: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(format!(
                        "Invalid {}: {}",
                        stringify!($name),
                        s
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choice_enum! {
    /// Kind of a document node
    DocumentType {
        Proposal => "proposal",
        Contract => "contract",
        Requirements => "requirements",
        Presentation => "presentation",
        Reference => "reference",
        Other => "other",
    }
}

choice_enum! {
    /// Progress of an action item
    ActionStatus {
        Todo => "todo",
        InProgress => "in_progress",
        Blocked => "blocked",
        Done => "done",
    }
}

choice_enum! {
    /// Impact of a risk
    RiskSeverity {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

choice_enum! {
    RiskProbability {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_node_type_falls_back_to_generic() {
        assert_eq!(NodeType::from_tag("opportunity"), NodeType::Generic);
        assert_eq!(NodeType::from_tag("risk"), NodeType::Risk);
    }

    #[test]
    fn test_node_type_serde_uses_wire_tag() {
        let json = serde_json::to_string(&NodeType::Competitor).unwrap();
        assert_eq!(json, "\"competitor\"");

        let parsed: NodeType = serde_json::from_str("\"mystery\"").unwrap();
        assert_eq!(parsed, NodeType::Generic);
    }

    #[test]
    fn test_note_and_generic_share_content_schema() {
        assert_eq!(NodeType::Note.schema(), NodeType::Generic.schema());
        assert_eq!(NodeType::Note.schema().len(), 1);
        assert_eq!(NodeType::Note.schema()[0].name, "content");
    }

    #[test]
    fn test_schema_lookup() {
        let spec = NodeType::Action.field("status").unwrap();
        assert_eq!(spec.kind, FieldKind::Choice(ActionStatus::VALUES));
        assert!(NodeType::Action.field("severity").is_none());
        assert_eq!(
            NodeType::Meeting.field("date").map(|s| s.kind),
            Some(FieldKind::DateTime)
        );
    }

    #[test]
    fn test_choice_enums_round_trip_wire_values() {
        for value in ActionStatus::VALUES {
            let status: ActionStatus = value.parse().unwrap();
            assert_eq!(status.as_str(), *value);
        }
        assert!("urgent".parse::<RiskSeverity>().is_err());
        assert_eq!(DocumentType::VALUES.len(), 6);
    }
}
