//! Tests for NodeFields
//!
//! Covers schema enforcement, lenient loading of server data and the
//! `data` object produced for writes.

#[cfg(test)]
mod tests {
    use crate::models::{
        ActionStatus, FieldError, MeetingDate, NodeFields, NodeType, RiskSeverity,
    };
    use chrono::NaiveDate;
    use serde_json::json;

    // ========================================================================
    // set() Schema Enforcement
    // ========================================================================

    #[test]
    fn test_set_rejects_field_outside_schema() {
        let mut fields = NodeFields::empty(NodeType::Person);
        let err = fields.set("severity", "high").unwrap_err();
        assert_eq!(
            err,
            FieldError::UnknownField {
                node_type: NodeType::Person,
                field: "severity".to_string(),
            }
        );
        assert!(fields.is_empty());
    }

    #[test]
    fn test_set_rejects_invalid_choice() {
        let mut fields = NodeFields::empty(NodeType::Action);
        let err = fields.set("status", "waiting").unwrap_err();
        assert!(matches!(err, FieldError::InvalidChoice { .. }));
        assert!(err.to_string().contains("todo, in_progress, blocked, done"));
    }

    #[test]
    fn test_set_parses_choice_and_date() {
        let mut fields = NodeFields::empty(NodeType::Action);
        fields.set("status", "in_progress").unwrap();
        fields.set("dueDate", "2025-04-30").unwrap();

        match &fields {
            NodeFields::Action(action) => {
                assert_eq!(action.status, Some(ActionStatus::InProgress));
                assert_eq!(action.due_date, NaiveDate::from_ymd_opt(2025, 4, 30));
            }
            other => panic!("Expected action fields, got {:?}", other),
        }
        assert_eq!(
            fields.to_data(),
            json!({"status": "in_progress", "dueDate": "2025-04-30"})
        );
    }

    #[test]
    fn test_set_rejects_malformed_date() {
        let mut fields = NodeFields::empty(NodeType::Action);
        assert!(matches!(
            fields.set("dueDate", "30/04/2025"),
            Err(FieldError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_meeting_date_accepts_datetime_local_and_rfc3339() {
        let mut fields = NodeFields::empty(NodeType::Meeting);
        fields.set("date", "2025-05-02T14:30").unwrap();
        assert_eq!(fields.get("date").as_deref(), Some("2025-05-02T14:30"));

        fields.set("date", " 2025-05-02T14:30:00+02:00 ").unwrap();
        assert_eq!(fields.get("date").as_deref(), Some("2025-05-02T14:30:00+02:00"));

        match &fields {
            NodeFields::Meeting(meeting) => {
                let date = meeting.date.as_ref().unwrap();
                assert_eq!(
                    date.to_naive_utc(),
                    NaiveDate::from_ymd_opt(2025, 5, 2)
                        .unwrap()
                        .and_hms_opt(12, 30, 0)
                        .unwrap()
                );
            }
            other => panic!("Expected meeting fields, got {:?}", other),
        }
    }

    #[test]
    fn test_meeting_date_with_offset_survives_round_trip() {
        let data = json!({"date": "2025-05-02T14:30:00+02:00", "agenda": "a"});
        let mut fields = NodeFields::from_data(NodeType::Meeting, &data);
        fields.set("notes", "n").unwrap();

        assert_eq!(
            fields.to_data(),
            json!({"date": "2025-05-02T14:30:00+02:00", "agenda": "a", "notes": "n"})
        );
    }

    #[test]
    fn test_meeting_date_rejects_invalid_text_on_deserialize() {
        let parsed: Result<MeetingDate, _> = serde_json::from_value(json!("next tuesday"));
        assert!(parsed.is_err());
        assert!(MeetingDate::parse("2025-05-02T14:30").is_some());
    }

    #[test]
    fn test_empty_value_clears_field() {
        let mut fields = NodeFields::empty(NodeType::Note);
        fields.set("content", "Kickoff recap").unwrap();
        assert_eq!(fields.len(), 1);

        fields.set("content", "   ").unwrap();
        assert!(fields.is_empty());
        assert_eq!(fields.to_data(), json!({}));
    }

    #[test]
    fn test_text_is_stored_verbatim() {
        let mut fields = NodeFields::empty(NodeType::Competitor);
        fields.set("strengths", "  Price, incumbent ").unwrap();
        assert_eq!(fields.get("strengths").as_deref(), Some("  Price, incumbent "));
    }

    // ========================================================================
    // from_data() Lenient Loading
    // ========================================================================

    #[test]
    fn test_from_data_keeps_valid_keys_and_drops_the_rest() {
        let data = json!({
            "severity": "critical",
            "probability": "sometimes",
            "mitigation": "Weekly exec sync",
            "owner": "Pat",
            "description": 12
        });
        let fields = NodeFields::from_data(NodeType::Risk, &data);

        match &fields {
            NodeFields::Risk(risk) => {
                assert_eq!(risk.severity, Some(RiskSeverity::Critical));
                assert_eq!(risk.probability, None);
                assert_eq!(risk.mitigation.as_deref(), Some("Weekly exec sync"));
                assert_eq!(risk.description, None);
            }
            other => panic!("Expected risk fields, got {:?}", other),
        }
    }

    #[test]
    fn test_from_data_tolerates_null_and_non_object() {
        let fields = NodeFields::from_data(NodeType::Generic, &json!(null));
        assert!(fields.is_empty());

        let fields = NodeFields::from_data(NodeType::Generic, &json!(["content"]));
        assert!(fields.is_empty());

        let fields = NodeFields::from_data(NodeType::Document, &json!({"url": null}));
        assert!(fields.is_empty());
    }

    #[test]
    fn test_variant_matches_node_type() {
        for node_type in NodeType::ALL {
            assert_eq!(NodeFields::empty(node_type).node_type(), node_type);
        }
    }

    #[test]
    fn test_every_schema_field_is_settable() {
        let sample = |kind: crate::models::FieldKind| match kind {
            crate::models::FieldKind::Text => "text",
            crate::models::FieldKind::Date => "2025-01-01",
            crate::models::FieldKind::DateTime => "2025-01-01T09:00",
            crate::models::FieldKind::Choice(values) => values[0],
        };

        for node_type in NodeType::ALL {
            let mut fields = NodeFields::empty(node_type);
            for spec in node_type.schema() {
                fields.set(spec.name, sample(spec.kind)).unwrap();
                assert!(
                    fields.get(spec.name).is_some(),
                    "{}.{} should be readable after set",
                    node_type,
                    spec.name
                );
            }
            assert_eq!(fields.len(), node_type.schema().len());
        }
    }
}
