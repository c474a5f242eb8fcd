//! Conversion between JSON records and Avro runtime values.
//!
//! [`Resolver`] decides whether a JSON value conforms to a schema and builds
//! the matching [`AvroValue`]; every rejection carries the path of the
//! offending value. [`to_json`] is the inverse used after decoding.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};

use crate::avro::types::{AvroField, AvroSchema, AvroValue};
use crate::error::{EncodingError, FieldPath};

/// JSON kind name used in error messages.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolves JSON values against schemas, looking up named types in `named`.
pub(crate) struct Resolver<'a> {
    named: &'a HashMap<String, AvroSchema>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(named: &'a HashMap<String, AvroSchema>) -> Self {
        Self { named }
    }

    pub(crate) fn resolve(
        &self,
        value: &Value,
        schema: &AvroSchema,
        path: &FieldPath,
    ) -> Result<AvroValue, EncodingError> {
        let mismatch = |expected: String| EncodingError::TypeMismatch {
            path: path.clone(),
            expected,
            found: kind(value).to_string(),
        };
        match schema {
            AvroSchema::Ref(name) => match self.named.get(name) {
                Some(named) => self.resolve(value, named, path),
                None => Err(mismatch(name.clone())),
            },
            AvroSchema::Union(branches) => self.resolve_union(value, branches, path),
            AvroSchema::Null => match value {
                Value::Null => Ok(AvroValue::Null),
                _ => Err(mismatch("null".to_string())),
            },
            AvroSchema::Boolean => value
                .as_bool()
                .map(AvroValue::Bool)
                .ok_or_else(|| mismatch("boolean".to_string())),
            AvroSchema::Int => value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(AvroValue::Int)
                .ok_or_else(|| mismatch("int".to_string())),
            AvroSchema::Long => value
                .as_i64()
                .map(AvroValue::Long)
                .ok_or_else(|| mismatch("long".to_string())),
            AvroSchema::Float => value
                .as_f64()
                .map(|f| AvroValue::Float(f as f32))
                .ok_or_else(|| mismatch("float".to_string())),
            AvroSchema::Double => value
                .as_f64()
                .map(AvroValue::Double)
                .ok_or_else(|| mismatch("double".to_string())),
            AvroSchema::String => value
                .as_str()
                .map(|s| AvroValue::Str(s.to_string()))
                .ok_or_else(|| mismatch("string".to_string())),
            AvroSchema::Bytes => value
                .as_str()
                .and_then(latin1_bytes)
                .map(AvroValue::Bytes)
                .ok_or_else(|| mismatch("bytes".to_string())),
            AvroSchema::Fixed { size, .. } => value
                .as_str()
                .and_then(latin1_bytes)
                .filter(|bytes| bytes.len() == *size)
                .map(AvroValue::Fixed)
                .ok_or_else(|| mismatch(format!("fixed {} ({size} bytes)", schema.type_name()))),
            AvroSchema::Enum { symbols, .. } => value
                .as_str()
                .filter(|symbol| symbols.iter().any(|s| s == symbol))
                .map(|symbol| AvroValue::Enum(symbol.to_string()))
                .ok_or_else(|| mismatch(format!("one of [{}]", symbols.join(", ")))),
            AvroSchema::Record { fields, .. } => match value {
                Value::Object(map) => self.resolve_record(map, fields, path),
                _ => Err(mismatch(format!("record {}", schema.type_name()))),
            },
            AvroSchema::Array { items } => {
                let Value::Array(array) = value else {
                    return Err(mismatch("array".to_string()));
                };
                array
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let item_path = path.index(i);
                        self.resolve(item, items, &item_path)
                            .map_err(|e| e.nest_under(&item_path))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(AvroValue::Array)
            }
            AvroSchema::Map { values } => {
                let Value::Object(map) = value else {
                    return Err(mismatch("map".to_string()));
                };
                map.iter()
                    .map(|(key, entry)| {
                        let entry_path = path.key(key);
                        self.resolve(entry, values, &entry_path)
                            .map(|value| (key.clone(), value))
                            .map_err(|e| e.nest_under(&entry_path))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(AvroValue::Map)
            }
        }
    }

    fn resolve_union(
        &self,
        value: &Value,
        branches: &[AvroSchema],
        path: &FieldPath,
    ) -> Result<AvroValue, EncodingError> {
        let matched = if value.is_null() {
            branches
                .iter()
                .position(|branch| self.is_null(branch))
                .map(|index| (index, AvroValue::Null))
        } else {
            branches.iter().enumerate().find_map(|(index, branch)| {
                self.resolve(value, branch, path)
                    .ok()
                    .map(|resolved| (index, resolved))
            })
        };
        match matched {
            Some((index, value)) => Ok(AvroValue::Union {
                index,
                value: Box::new(value),
            }),
            None => Err(EncodingError::UnionBranchMismatch {
                path: path.clone(),
                branches: branches.iter().map(AvroSchema::type_name).collect(),
                found: kind(value).to_string(),
            }),
        }
    }

    fn resolve_record(
        &self,
        map: &Map<String, Value>,
        fields: &[AvroField],
        path: &FieldPath,
    ) -> Result<AvroValue, EncodingError> {
        let mut pairs = Vec::with_capacity(fields.len());
        for field in fields {
            let field_path = path.field(&field.name);
            let value = match (map.get(&field.name), &field.default) {
                (Some(value), _) => self
                    .resolve(value, &field.type_, &field_path)
                    .map_err(|e| e.nest_under(&field_path))?,
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(EncodingError::MissingRequiredField { path: field_path })
                }
            };
            pairs.push((field.name.clone(), value));
        }
        Ok(AvroValue::Record(pairs))
    }

    /// Whether `schema` is the null type, following references.
    pub(crate) fn is_null(&self, schema: &AvroSchema) -> bool {
        match schema {
            AvroSchema::Null => true,
            AvroSchema::Ref(name) => self
                .named
                .get(name)
                .is_some_and(|named| self.is_null(named)),
            _ => false,
        }
    }

    /// Whether `schema` accepts JSON null.
    pub(crate) fn is_nullable(&self, schema: &AvroSchema) -> bool {
        match schema {
            AvroSchema::Union(branches) => branches.iter().any(|branch| self.is_null(branch)),
            other => self.is_null(other),
        }
    }
}

/// Avro JSON convention: bytes are strings of code points U+0000..=U+00FF.
fn latin1_bytes(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Converts a decoded value back to JSON; unions are unwrapped.
pub fn to_json(value: &AvroValue) -> Value {
    match value {
        AvroValue::Null => Value::Null,
        AvroValue::Bool(b) => Value::Bool(*b),
        AvroValue::Int(n) => Value::from(*n),
        AvroValue::Long(n) => Value::from(*n),
        AvroValue::Float(f) => float_to_json(f64::from(*f)),
        AvroValue::Double(f) => float_to_json(*f),
        AvroValue::Bytes(bytes) | AvroValue::Fixed(bytes) => Value::String(latin1_string(bytes)),
        AvroValue::Str(s) | AvroValue::Enum(s) => Value::String(s.clone()),
        AvroValue::Record(pairs) | AvroValue::Map(pairs) => Value::Object(
            pairs
                .iter()
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect(),
        ),
        AvroValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        AvroValue::Union { value, .. } => to_json(value),
    }
}

fn float_to_json(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}
