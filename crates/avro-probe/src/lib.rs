//! Probe which shapes of optional and nullable fields an Avro schema accepts.
//!
//! A [`Schema`] is parsed once from its JSON definition. A candidate record
//! (plain JSON) is then encoded with [`try_encode`], or run through a list of
//! named [`Variant`]s with [`validate_variants`], which reports one
//! [`ValidationOutcome`] per variant instead of stopping at the first
//! rejection.
//!
//! ```
//! use avro_probe::{parse_schema, validate_variants, Transform, Variant};
//! use serde_json::json;
//!
//! let schema = parse_schema(r#"{
//!     "type": "record", "name": "Msg",
//!     "fields": [{"name": "sender", "type": ["null", "string"], "default": null}]
//! }"#).unwrap();
//!
//! let outcomes = validate_variants(
//!     &schema,
//!     &json!({"sender": null}),
//!     &[Variant::new("empty-object", Transform::SetField {
//!         path: "sender".into(),
//!         value: json!({}),
//!     })],
//! );
//! assert!(outcomes[0].accepted());
//! assert!(!outcomes[1].accepted());
//! ```

pub mod avro;
pub mod config;
mod datum;
pub mod error;
pub mod probe;
pub mod report;
pub mod schema;

pub use datum::to_json;
pub use error::{EncodingError, FieldPath, ReasonCode, SchemaParseError};
pub use probe::{
    decode, default_variants, try_encode, validate_variants, Transform, ValidationOutcome,
    Variant,
};
pub use schema::{parse_schema, ContractTable, FieldContract, Representation, Schema};
