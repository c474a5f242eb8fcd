//! Apache Avro schema-aware encoder.

use std::collections::HashMap;

use super::encoder::AvroEncoder;
use super::types::{AvroSchema, AvroValue};
use crate::error::{EncodingError, FieldPath};

/// Recursively registers named types declared inside `schema`.
pub(crate) fn collect_named(schema: &AvroSchema, named: &mut HashMap<String, AvroSchema>) {
    match schema {
        AvroSchema::Record { fields, .. } => {
            if let Some(name) = schema.full_name() {
                named.insert(name, schema.clone());
            }
            for f in fields {
                collect_named(&f.type_, named);
            }
        }
        AvroSchema::Enum { .. } | AvroSchema::Fixed { .. } => {
            if let Some(name) = schema.full_name() {
                named.insert(name, schema.clone());
            }
        }
        AvroSchema::Array { items } => collect_named(items, named),
        AvroSchema::Map { values } => collect_named(values, named),
        AvroSchema::Union(schemas) => {
            for s in schemas {
                collect_named(s, named);
            }
        }
        _ => {}
    }
}

fn value_kind(value: &AvroValue) -> &'static str {
    match value {
        AvroValue::Null => "null",
        AvroValue::Bool(_) => "boolean",
        AvroValue::Int(_) => "int",
        AvroValue::Long(_) => "long",
        AvroValue::Float(_) => "float",
        AvroValue::Double(_) => "double",
        AvroValue::Bytes(_) => "bytes",
        AvroValue::Str(_) => "string",
        AvroValue::Record(_) => "record",
        AvroValue::Enum(_) => "enum",
        AvroValue::Array(_) => "array",
        AvroValue::Map(_) => "map",
        AvroValue::Fixed(_) => "fixed",
        AvroValue::Union { .. } => "union",
    }
}

/// Apache Avro schema-aware encoder.
#[derive(Default)]
pub struct AvroSchemaEncoder {
    encoder: AvroEncoder,
    named: HashMap<String, AvroSchema>,
}

impl AvroSchemaEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(
        &mut self,
        value: &AvroValue,
        schema: &AvroSchema,
    ) -> Result<Vec<u8>, EncodingError> {
        self.named.clear();
        collect_named(schema, &mut self.named);
        let written = write_value(
            &mut self.encoder,
            &self.named,
            value,
            schema,
            &FieldPath::root(),
        );
        let bytes = self.encoder.flush();
        written.map(|()| bytes)
    }
}

/// Follows a reference into `named`.
fn resolve<'a>(
    named: &'a HashMap<String, AvroSchema>,
    schema: &'a AvroSchema,
) -> &'a AvroSchema {
    match schema {
        AvroSchema::Ref(name) => named.get(name).unwrap_or(schema),
        _ => schema,
    }
}

fn write_value(
    enc: &mut AvroEncoder,
    named: &HashMap<String, AvroSchema>,
    value: &AvroValue,
    schema: &AvroSchema,
    path: &FieldPath,
) -> Result<(), EncodingError> {
    match (resolve(named, schema), value) {
        (AvroSchema::Null, AvroValue::Null) => enc.write_null(),
        (AvroSchema::Boolean, AvroValue::Bool(b)) => enc.write_boolean(*b),
        (AvroSchema::Int, AvroValue::Int(n)) => enc.write_int(*n),
        (AvroSchema::Long, AvroValue::Long(n)) => enc.write_long(*n),
        (AvroSchema::Long, AvroValue::Int(n)) => enc.write_long(i64::from(*n)),
        (AvroSchema::Float, AvroValue::Float(f)) => enc.write_float(*f),
        (AvroSchema::Double, AvroValue::Double(f)) => enc.write_double(*f),
        (AvroSchema::Double, AvroValue::Float(f)) => enc.write_double(f64::from(*f)),
        (AvroSchema::Bytes, AvroValue::Bytes(b)) => enc.write_bytes(b),
        (AvroSchema::String, AvroValue::Str(s)) => enc.write_str(s),
        (AvroSchema::Record { fields, .. }, AvroValue::Record(pairs)) => {
            for field in fields {
                let field_path = path.field(&field.name);
                let val = pairs
                    .iter()
                    .find(|(k, _)| k == &field.name)
                    .map(|(_, v)| v)
                    .or(field.default.as_ref())
                    .ok_or_else(|| EncodingError::MissingRequiredField {
                        path: field_path.clone(),
                    })?;
                write_value(enc, named, val, &field.type_, &field_path)
                    .map_err(|e| e.nest_under(&field_path))?;
            }
        }
        (AvroSchema::Enum { symbols, .. }, AvroValue::Enum(s)) => {
            let idx = symbols.iter().position(|sym| sym == s).ok_or_else(|| {
                EncodingError::TypeMismatch {
                    path: path.clone(),
                    expected: format!("one of [{}]", symbols.join(", ")),
                    found: s.clone(),
                }
            })?;
            enc.write_int(idx as i32);
        }
        (AvroSchema::Array { items }, AvroValue::Array(arr)) => {
            enc.write_block_start(arr.len());
            for (i, item) in arr.iter().enumerate() {
                let item_path = path.index(i);
                write_value(enc, named, item, items, &item_path)
                    .map_err(|e| e.nest_under(&item_path))?;
            }
            enc.write_block_end();
        }
        (AvroSchema::Map { values }, AvroValue::Map(map)) => {
            enc.write_block_start(map.len());
            for (key, val) in map {
                let entry_path = path.key(key);
                enc.write_str(key);
                write_value(enc, named, val, values, &entry_path)
                    .map_err(|e| e.nest_under(&entry_path))?;
            }
            enc.write_block_end();
        }
        (AvroSchema::Fixed { size, .. }, AvroValue::Fixed(b)) => {
            if b.len() != *size {
                return Err(EncodingError::TypeMismatch {
                    path: path.clone(),
                    expected: format!("{size} bytes"),
                    found: format!("{} bytes", b.len()),
                });
            }
            enc.write_fixed(b);
        }
        (AvroSchema::Union(schemas), AvroValue::Union { index, value }) => {
            let branch = schemas.get(*index).ok_or_else(|| {
                EncodingError::UnionBranchMismatch {
                    path: path.clone(),
                    branches: schemas.iter().map(AvroSchema::type_name).collect(),
                    found: format!("branch #{index}"),
                }
            })?;
            enc.write_union_index(*index);
            write_value(enc, named, value, branch, path)?;
        }
        (AvroSchema::Union(schemas), other) => {
            return Err(EncodingError::UnionBranchMismatch {
                path: path.clone(),
                branches: schemas.iter().map(AvroSchema::type_name).collect(),
                found: value_kind(other).to_string(),
            })
        }
        (expected, other) => {
            return Err(EncodingError::TypeMismatch {
                path: path.clone(),
                expected: expected.type_name(),
                found: value_kind(other).to_string(),
            })
        }
    }
    Ok(())
}
