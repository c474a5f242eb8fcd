//! Apache Avro schema-aware decoder.

use std::collections::HashMap;

use super::decoder::{AvroDecodeError, AvroDecoder};

/// Limit on schema nodes entered while decoding one value.
pub const MAX_DEPTH: usize = 512;
use super::schema_encoder::collect_named;
use super::types::{AvroSchema, AvroValue};

/// Apache Avro schema-aware decoder.
#[derive(Default)]
pub struct AvroSchemaDecoder {
    named: HashMap<String, AvroSchema>,
}

impl AvroSchemaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes exactly one value; leftover bytes are an error.
    pub fn decode(
        &mut self,
        data: &[u8],
        schema: &AvroSchema,
    ) -> Result<AvroValue, AvroDecodeError> {
        self.named.clear();
        collect_named(schema, &mut self.named);
        let mut decoder = AvroDecoder::new(data);
        let value = read_value(&mut decoder, schema, &self.named, 0)?;
        match decoder.remaining() {
            0 => Ok(value),
            n => Err(AvroDecodeError::TrailingBytes(n)),
        }
    }
}

fn read_value(
    dec: &mut AvroDecoder<'_>,
    schema: &AvroSchema,
    named: &HashMap<String, AvroSchema>,
    depth: usize,
) -> Result<AvroValue, AvroDecodeError> {
    if depth > MAX_DEPTH {
        return Err(AvroDecodeError::TooDeep(MAX_DEPTH));
    }
    let depth = depth + 1;
    match schema {
        AvroSchema::Ref(name) => match named.get(name) {
            Some(schema) => read_value(dec, schema, named, depth),
            None => Err(AvroDecodeError::UnresolvedRef(name.clone())),
        },
        AvroSchema::Null => Ok(AvroValue::Null),
        AvroSchema::Boolean => Ok(AvroValue::Bool(dec.read_boolean()?)),
        AvroSchema::Int => Ok(AvroValue::Int(dec.read_int()?)),
        AvroSchema::Long => Ok(AvroValue::Long(dec.read_long()?)),
        AvroSchema::Float => Ok(AvroValue::Float(dec.read_float()?)),
        AvroSchema::Double => Ok(AvroValue::Double(dec.read_double()?)),
        AvroSchema::Bytes => Ok(AvroValue::Bytes(dec.read_bytes()?)),
        AvroSchema::String => Ok(AvroValue::Str(dec.read_str()?)),
        AvroSchema::Record { fields, .. } => {
            let mut pairs = Vec::with_capacity(fields.len());
            for field in fields {
                let val = read_value(dec, &field.type_, named, depth)?;
                pairs.push((field.name.clone(), val));
            }
            Ok(AvroValue::Record(pairs))
        }
        AvroSchema::Enum { symbols, .. } => {
            let idx = dec.read_enum_index(symbols.len())?;
            Ok(AvroValue::Enum(symbols[idx].clone()))
        }
        AvroSchema::Array { items } => Ok(AvroValue::Array(
            dec.read_array(|dec| read_value(dec, items, named, depth))?,
        )),
        AvroSchema::Map { values } => Ok(AvroValue::Map(
            dec.read_map(|dec| read_value(dec, values, named, depth))?,
        )),
        AvroSchema::Fixed { size, .. } => Ok(AvroValue::Fixed(dec.read_fixed(*size)?)),
        AvroSchema::Union(schemas) => {
            let index = dec.read_union_index(schemas.len())?;
            let value = read_value(dec, &schemas[index], named, depth)?;
            Ok(AvroValue::Union {
                index,
                value: Box::new(value),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_bytes_are_rejected() {
        let err = AvroSchemaDecoder::new()
            .decode(&[2, 0], &AvroSchema::Int)
            .unwrap_err();
        assert_eq!(err, AvroDecodeError::TrailingBytes(1));
    }

    #[test]
    fn deep_recursive_input_is_refused() {
        // record Node { next: union { null, Node } } with 2000 links.
        let node = AvroSchema::Record {
            name: "Node".to_string(),
            namespace: None,
            fields: vec![crate::avro::AvroField {
                name: "next".to_string(),
                type_: AvroSchema::Union(vec![
                    AvroSchema::Null,
                    AvroSchema::Ref("Node".to_string()),
                ]),
                default: None,
                doc: None,
                aliases: Vec::new(),
            }],
            aliases: Vec::new(),
            doc: None,
        };
        let mut bytes = vec![2; 2000];
        bytes.push(0);
        assert_eq!(
            AvroSchemaDecoder::new().decode(&bytes, &node).unwrap_err(),
            AvroDecodeError::TooDeep(MAX_DEPTH)
        );

        let mut short = vec![2; 10];
        short.push(0);
        assert!(AvroSchemaDecoder::new().decode(&short, &node).is_ok());
    }

    #[test]
    fn array_of_nulls_with_huge_count() {
        let schema = AvroSchema::Array {
            items: Box::new(AvroSchema::Null),
        };
        // zigzag(2^40) as a varint.
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x40];
        assert_eq!(
            AvroSchemaDecoder::new().decode(&bytes, &schema).unwrap_err(),
            AvroDecodeError::TooManyEmptyItems(crate::avro::decoder::MAX_EMPTY_ITEMS)
        );
    }

    #[test]
    fn array_of_maps() {
        let schema = AvroSchema::Array {
            items: Box::new(AvroSchema::Map {
                values: Box::new(AvroSchema::Boolean),
            }),
        };
        // [{"k": true}]
        let bytes = [2, 2, 2, b'k', 1, 0, 0];
        assert_eq!(
            AvroSchemaDecoder::new().decode(&bytes, &schema).unwrap(),
            AvroValue::Array(vec![AvroValue::Map(vec![(
                "k".to_string(),
                AvroValue::Bool(true)
            )])])
        );
    }
}
