//! Accepted representations of optional and nullable record fields.
//!
//! The table is computed once when a schema is parsed, by resolving each
//! candidate representation against the field type.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Value};

use super::Schema;
use crate::avro::types::{AvroField, AvroSchema};
use crate::datum::Resolver;
use crate::error::FieldPath;

/// A way of expressing "no value" for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Representation {
    /// JSON `null`.
    AbsenceMarker,
    /// The key is left out and the field default applies.
    OmittedKey,
    /// `{}`.
    EmptyMapping,
    /// `[]`.
    EmptySequence,
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Representation::AbsenceMarker => "null",
            Representation::OmittedKey => "omitted",
            Representation::EmptyMapping => "{}",
            Representation::EmptySequence => "[]",
        })
    }
}

/// Accepted representations of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldContract {
    path: String,
    accepted: Vec<Representation>,
}

impl FieldContract {
    /// Dotted path; `[]` marks array items and `{}` map values.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn accepted(&self) -> &[Representation] {
        &self.accepted
    }

    pub fn accepts(&self, representation: Representation) -> bool {
        self.accepted.contains(&representation)
    }
}

/// Contracts for every nullable or defaulted field, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContractTable {
    entries: Vec<FieldContract>,
}

impl ContractTable {
    pub(crate) fn build(schema: &Schema) -> Self {
        let mut builder = Builder {
            schema,
            resolver: Resolver::new(schema.named_types()),
            active: Vec::new(),
            entries: Vec::new(),
        };
        builder.walk(schema.root(), "");
        Self {
            entries: builder.entries,
        }
    }

    pub fn get(&self, path: &str) -> Option<&FieldContract> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldContract> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct Builder<'a> {
    schema: &'a Schema,
    resolver: Resolver<'a>,
    /// Named records on the current walk, to stop at recursion.
    active: Vec<String>,
    entries: Vec<FieldContract>,
}

impl Builder<'_> {
    fn walk(&mut self, schema: &AvroSchema, prefix: &str) {
        let definitions = self.schema;
        let schema = definitions.resolve(schema);
        match schema {
            AvroSchema::Record { fields, .. } => {
                let name = schema.type_name();
                if self.active.contains(&name) {
                    return;
                }
                self.active.push(name);
                for field in fields {
                    let path = if prefix.is_empty() {
                        field.name.clone()
                    } else {
                        format!("{prefix}.{}", field.name)
                    };
                    if field.default.is_some() || self.resolver.is_nullable(&field.type_) {
                        let contract = self.contract(field, path.clone());
                        self.entries.push(contract);
                    }
                    self.walk(&field.type_, &path);
                }
                self.active.pop();
            }
            AvroSchema::Union(branches) => {
                for branch in branches {
                    self.walk(branch, prefix);
                }
            }
            AvroSchema::Array { items } => self.walk(items, &format!("{prefix}[]")),
            AvroSchema::Map { values } => self.walk(values, &format!("{prefix}{{}}")),
            _ => {}
        }
    }

    fn contract(&self, field: &AvroField, path: String) -> FieldContract {
        let resolves = |candidate: &Value| {
            self.resolver
                .resolve(candidate, &field.type_, &FieldPath::root())
                .is_ok()
        };
        let mut accepted = Vec::new();
        if resolves(&Value::Null) {
            accepted.push(Representation::AbsenceMarker);
        }
        if field.default.is_some() {
            accepted.push(Representation::OmittedKey);
        }
        if resolves(&json!({})) {
            accepted.push(Representation::EmptyMapping);
        }
        if resolves(&json!([])) {
            accepted.push(Representation::EmptySequence);
        }
        FieldContract { path, accepted }
    }
}
