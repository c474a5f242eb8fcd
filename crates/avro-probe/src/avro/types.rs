//! Apache Avro type definitions.
//!
//! Reference: Apache Avro 1.12.0 specification

/// Avro schema.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record {
        name: String,
        namespace: Option<String>,
        fields: Vec<AvroField>,
        aliases: Vec<String>,
        doc: Option<String>,
    },
    Enum {
        name: String,
        namespace: Option<String>,
        symbols: Vec<String>,
        default: Option<String>,
        aliases: Vec<String>,
        doc: Option<String>,
    },
    Array {
        items: Box<AvroSchema>,
    },
    Map {
        values: Box<AvroSchema>,
    },
    Fixed {
        name: String,
        namespace: Option<String>,
        size: usize,
        aliases: Vec<String>,
    },
    Union(Vec<AvroSchema>),
    /// Reference to a named type, by full name.
    Ref(String),
}

impl AvroSchema {
    /// Returns the full name (namespace.name if both present).
    pub fn full_name(&self) -> Option<String> {
        match self {
            AvroSchema::Record {
                name, namespace, ..
            }
            | AvroSchema::Enum {
                name, namespace, ..
            }
            | AvroSchema::Fixed {
                name, namespace, ..
            } => Some(qualify(name, namespace.as_deref())),
            AvroSchema::Ref(name) => Some(name.clone()),
            _ => None,
        }
    }

    /// Name used to identify this schema as a union branch.
    ///
    /// Named types report their full name, everything else its type keyword.
    pub fn type_name(&self) -> String {
        match self {
            AvroSchema::Null => "null".to_string(),
            AvroSchema::Boolean => "boolean".to_string(),
            AvroSchema::Int => "int".to_string(),
            AvroSchema::Long => "long".to_string(),
            AvroSchema::Float => "float".to_string(),
            AvroSchema::Double => "double".to_string(),
            AvroSchema::Bytes => "bytes".to_string(),
            AvroSchema::String => "string".to_string(),
            AvroSchema::Array { .. } => "array".to_string(),
            AvroSchema::Map { .. } => "map".to_string(),
            AvroSchema::Union(_) => "union".to_string(),
            named => named.full_name().unwrap_or_default(),
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self, AvroSchema::Union(_))
    }
}

pub(crate) fn qualify(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

/// A field in an Avro record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct AvroField {
    pub name: String,
    pub type_: AvroSchema,
    /// Default, already resolved against `type_`.
    pub default: Option<AvroValue>,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
}

/// Avro runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    Str(String),
    Record(Vec<(String, AvroValue)>),
    Enum(String),
    Array(Vec<AvroValue>),
    Map(Vec<(String, AvroValue)>),
    Fixed(Vec<u8>),
    Union { index: usize, value: Box<AvroValue> },
}
