use avro_probe::report::render_text;
use avro_probe::{
    decode, default_variants, parse_schema, try_encode, validate_variants, EncodingError,
    ReasonCode, Representation, Schema, Transform, ValidationOutcome, Variant,
};
use serde_json::{json, Value};

const EMAIL_SCHEMA: &str = include_str!("../../../demos/email_message.avsc");
const EMAIL_RECORD: &str = include_str!("../../../demos/email_message.json");

fn email_schema() -> Schema {
    parse_schema(EMAIL_SCHEMA).unwrap()
}

fn email_record() -> Value {
    serde_json::from_str(EMAIL_RECORD).unwrap()
}

fn probe_variants() -> Vec<Variant> {
    vec![
        Variant::new("Original JSON", Transform::Identity),
        Variant::new("Without null fields", Transform::StripNulls { deep: false }),
        Variant::new(
            "With empty sender object",
            Transform::SetField {
                path: "sender".to_string(),
                value: json!({}),
            },
        ),
        Variant::new(
            "With attachments as empty array",
            Transform::SetField {
                path: "attachments".to_string(),
                value: json!([]),
            },
        ),
    ]
}

#[test]
fn email_schema_parses_named_types() {
    let schema = email_schema();
    for name in ["EmailMessage", "Recipient", "Sender", "Metadata", "Attachment"] {
        assert!(schema.named(name).is_some(), "{name} not registered");
    }
}

#[test]
fn email_probe_variant_matrix() {
    let schema = email_schema();
    let outcomes = validate_variants(&schema, &email_record(), &probe_variants());

    let summary: Vec<(&str, bool)> = outcomes
        .iter()
        .map(|o| (o.variant(), o.accepted()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Original JSON", true),
            ("Without null fields", true),
            ("With empty sender object", false),
            ("With attachments as empty array", true),
        ]
    );

    let error = outcomes[2].error().unwrap();
    assert_eq!(error.reason(), ReasonCode::UnionBranchMismatch);
    assert_eq!(error.path().to_string(), "sender");
    match error {
        EncodingError::UnionBranchMismatch {
            branches, found, ..
        } => {
            assert_eq!(branches, &vec!["null".to_string(), "Sender".to_string()]);
            assert_eq!(found, "object");
        }
        other => panic!("unexpected error {other:?}"),
    }

    // Dropping nulls only fills in the same defaults.
    assert_eq!(outcomes[0].encoded_len(), outcomes[1].encoded_len());
    // One extra byte for the empty array terminator.
    assert_eq!(
        outcomes[3].encoded_len(),
        outcomes[0].encoded_len().map(|n| n + 1)
    );
}

#[test]
fn email_default_variants_edit_each_null_field() {
    let schema = email_schema();
    let record = email_record();
    let outcomes = validate_variants(&schema, &record, &default_variants(&record));
    let summary: Vec<(&str, bool)> = outcomes
        .iter()
        .map(|o| (o.variant(), o.accepted()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("identity", true),
            ("strip-nulls", true),
            ("sender-as-empty-object", false),
            ("sender-as-empty-array", false),
            ("attachments-as-empty-object", false),
            ("attachments-as-empty-array", true),
        ]
    );
    for outcome in outcomes.iter().filter(|o| !o.accepted()) {
        let error = outcome.error().unwrap();
        let field = outcome.variant().split("-as-").next().unwrap();
        assert_eq!(error.reason(), ReasonCode::UnionBranchMismatch);
        assert_eq!(error.path().to_string(), field);
    }
}

#[test]
fn email_probe_text_report() {
    let schema = email_schema();
    let outcomes = validate_variants(&schema, &email_record(), &probe_variants());
    let text = render_text(&outcomes);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("accepted  Original JSON ("));
    assert_eq!(
        lines[2],
        "rejected  With empty sender object: UnionBranchMismatch at sender: \
         sender: object does not match any union branch of [null, Sender]"
    );
}

#[test]
fn email_record_round_trips() {
    let schema = email_schema();
    let record = email_record();
    let bytes = try_encode(&schema, &record).unwrap();
    assert_eq!(decode(&schema, &bytes).unwrap(), record);

    // Omitted nullable keys come back as their null defaults.
    let stripped = Transform::StripNulls { deep: false }.apply(&record);
    assert!(stripped.get("sender").is_none());
    let bytes = try_encode(&schema, &stripped).unwrap();
    assert_eq!(decode(&schema, &bytes).unwrap(), record);
}

#[test]
fn email_nested_failures_carry_paths() {
    let schema = email_schema();
    let record = email_record();

    let cases: Vec<(Transform, ReasonCode, &str, &str)> = vec![
        (
            Transform::RemoveField {
                path: "recipient.email".to_string(),
            },
            ReasonCode::MissingRequiredField,
            "recipient",
            "recipient.email",
        ),
        (
            Transform::SetField {
                path: "recipient.displayName".to_string(),
                value: json!(42),
            },
            ReasonCode::UnionBranchMismatch,
            "recipient",
            "recipient.displayName",
        ),
        (
            Transform::SetField {
                path: "templateData.token".to_string(),
                value: Value::Null,
            },
            ReasonCode::TypeMismatch,
            "templateData",
            "templateData[\"token\"]",
        ),
        (
            Transform::SetField {
                path: "metadata.retryCount".to_string(),
                value: json!("0"),
            },
            ReasonCode::TypeMismatch,
            "metadata",
            "metadata.retryCount",
        ),
        (
            Transform::SetField {
                path: "attachments".to_string(),
                value: json!([{"filename": "a.txt", "contentType": "text/plain"}]),
            },
            ReasonCode::UnionBranchMismatch,
            "attachments",
            "attachments",
        ),
        (
            Transform::RemoveField {
                path: "messageId".to_string(),
            },
            ReasonCode::MissingRequiredField,
            "messageId",
            "messageId",
        ),
    ];

    for (transform, reason, outer, leaf) in cases {
        let candidate = transform.apply(&record);
        let error = try_encode(&schema, &candidate).unwrap_err();
        assert_eq!(error.path().to_string(), outer, "{transform:?}");
        let cause = error.root_cause();
        assert_eq!(cause.reason(), reason, "{transform:?}");
        assert_eq!(cause.path().to_string(), leaf, "{transform:?}");
        if outer != leaf {
            assert_eq!(error.reason(), ReasonCode::NestedFailure);
        }
    }
}

#[test]
fn email_contract_table() {
    let schema = email_schema();
    let contracts = schema.contracts();

    let sender = contracts.get("sender").unwrap();
    assert_eq!(
        sender.accepted(),
        &[Representation::AbsenceMarker, Representation::OmittedKey]
    );
    assert!(!sender.accepts(Representation::EmptyMapping));

    let attachments = contracts.get("attachments").unwrap();
    assert_eq!(
        attachments.accepted(),
        &[
            Representation::AbsenceMarker,
            Representation::OmittedKey,
            Representation::EmptySequence
        ]
    );

    assert!(contracts.get("templateData").is_none());
    assert!(contracts.get("messageId").is_none());
    assert!(contracts.get("attachments[].filename").is_none());

    assert_eq!(
        contracts.get("metadata.retryCount").unwrap().accepted(),
        &[Representation::OmittedKey]
    );
    assert_eq!(
        contracts.get("sender.name").unwrap().accepted(),
        &[Representation::AbsenceMarker, Representation::OmittedKey]
    );

    let paths: Vec<&str> = contracts.iter().map(|c| c.path()).collect();
    assert_eq!(
        paths,
        vec![
            "recipient.displayName",
            "sender",
            "sender.name",
            "metadata.userId",
            "metadata.retryCount",
            "metadata.priority",
            "attachments",
        ]
    );
}

#[test]
fn email_outcomes_serialize_with_cause() {
    let schema = email_schema();
    let mut record = email_record();
    record["recipient"] = json!({});
    let outcomes: Vec<ValidationOutcome> = validate_variants(&schema, &record, &[]);
    let json = serde_json::to_value(&outcomes).unwrap();
    assert_eq!(json[0]["accepted"], false);
    assert!(json[0].get("encoded_len").is_none());
    assert_eq!(json[0]["error"]["reason"], "NestedFailure");
    assert_eq!(json[0]["error"]["path"], "recipient");
    assert_eq!(json[0]["error"]["cause"]["reason"], "MissingRequiredField");
    assert_eq!(json[0]["error"]["cause"]["path"], "recipient.email");
}
