//! Encoding a record, and a set of its variants, against a schema.

pub mod variant;

use serde::Serialize;
use serde_json::Value;

use crate::avro::{AvroDecodeError, AvroSchemaDecoder, AvroSchemaEncoder};
use crate::datum::{self, Resolver};
use crate::error::{EncodingError, FieldPath};
use crate::schema::Schema;

pub use variant::{default_variants, CustomTransform, Transform, Variant};

/// Encodes `record` as Avro binary according to `schema`.
pub fn try_encode(schema: &Schema, record: &Value) -> Result<Vec<u8>, EncodingError> {
    let datum = Resolver::new(schema.named_types()).resolve(
        record,
        schema.root(),
        &FieldPath::root(),
    )?;
    AvroSchemaEncoder::new().encode(&datum, schema.root())
}

/// Decodes Avro binary written for `schema` back into JSON.
pub fn decode(schema: &Schema, bytes: &[u8]) -> Result<Value, AvroDecodeError> {
    let value = AvroSchemaDecoder::new().decode(bytes, schema.root())?;
    Ok(datum::to_json(&value))
}

/// Result of encoding one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    variant: String,
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoded_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<EncodingError>,
}

impl ValidationOutcome {
    fn new(variant: &str, result: Result<Vec<u8>, EncodingError>) -> Self {
        match result {
            Ok(bytes) => Self {
                variant: variant.to_string(),
                accepted: true,
                encoded_len: Some(bytes.len()),
                error: None,
            },
            Err(error) => Self {
                variant: variant.to_string(),
                accepted: false,
                encoded_len: None,
                error: Some(error),
            },
        }
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn accepted(&self) -> bool {
        self.accepted
    }

    /// Size of the encoded record, when accepted.
    pub fn encoded_len(&self) -> Option<usize> {
        self.encoded_len
    }

    pub fn error(&self) -> Option<&EncodingError> {
        self.error.as_ref()
    }
}

/// Encodes every variant of `base`, in order, collecting one outcome each.
///
/// An `identity` variant is tried first unless one of `variants` already uses
/// [`Transform::Identity`].
pub fn validate_variants(
    schema: &Schema,
    base: &Value,
    variants: &[Variant],
) -> Vec<ValidationOutcome> {
    let has_identity = variants.iter().any(|v| v.transform().is_identity());
    let identity = (!has_identity).then(Variant::identity);

    identity
        .iter()
        .chain(variants)
        .map(|variant| {
            let record = variant.apply(base);
            let outcome = ValidationOutcome::new(variant.name(), try_encode(schema, &record));
            match outcome.error() {
                None => log::debug!(
                    "variant {:?} accepted ({} bytes)",
                    variant.name(),
                    outcome.encoded_len().unwrap_or_default()
                ),
                Some(e) => log::debug!("variant {:?} rejected: {e}", variant.name()),
            }
            outcome
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReasonCode;
    use crate::schema::parse_schema;
    use serde_json::json;

    fn user_schema() -> Schema {
        parse_schema(
            r#"{"type": "record", "name": "User", "fields": [
                {"name": "id", "type": "int"},
                {"name": "nick", "type": ["null", "string"], "default": null}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn encodes_in_field_order_with_union_tags() {
        let schema = user_schema();
        let bytes = try_encode(&schema, &json!({"nick": "al", "id": 1})).unwrap();
        assert_eq!(bytes, vec![2, 2, 4, b'a', b'l']);
        let bytes = try_encode(&schema, &json!({"id": 1, "nick": null})).unwrap();
        assert_eq!(bytes, vec![2, 0]);
        // Omitted key takes the default.
        assert_eq!(try_encode(&schema, &json!({"id": 1})).unwrap(), vec![2, 0]);
    }

    #[test]
    fn identity_is_prepended_once() {
        let schema = user_schema();
        let base = json!({"id": 1});
        let outcomes = validate_variants(
            &schema,
            &base,
            &[Variant::new("drop-id", Transform::RemoveField { path: "id".to_string() })],
        );
        let names: Vec<_> = outcomes.iter().map(ValidationOutcome::variant).collect();
        assert_eq!(names, vec!["identity", "drop-id"]);
        assert!(outcomes[0].accepted());
        assert_eq!(
            outcomes[1].error().map(EncodingError::reason),
            Some(ReasonCode::MissingRequiredField)
        );

        let outcomes = validate_variants(
            &schema,
            &base,
            &[
                Variant::new("baseline", Transform::Identity),
                Variant::new("strip", Transform::StripNulls { deep: false }),
            ],
        );
        let names: Vec<_> = outcomes.iter().map(ValidationOutcome::variant).collect();
        assert_eq!(names, vec!["baseline", "strip"]);
    }

    #[test]
    fn outcome_serializes_without_empty_fields() {
        let schema = user_schema();
        let outcomes = validate_variants(&schema, &json!({"id": 1}), &[]);
        assert_eq!(
            serde_json::to_value(&outcomes).unwrap(),
            json!([{"variant": "identity", "accepted": true, "encoded_len": 2}])
        );
    }
}
