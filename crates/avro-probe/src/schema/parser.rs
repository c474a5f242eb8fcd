//! Avro schema JSON → [`AvroSchema`].
//!
//! Named types are declared before their body is parsed so records can refer
//! to themselves. Later references to a named type become [`AvroSchema::Ref`].

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::avro::types::{qualify, AvroField, AvroSchema, AvroValue};
use crate::datum::Resolver;
use crate::error::{FieldPath, SchemaParseError};

const PRIMITIVES: [&str; 8] = [
    "null", "boolean", "int", "long", "float", "double", "bytes", "string",
];

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid name regex"))
}

fn here(at: &str) -> String {
    if at.is_empty() {
        "/".to_string()
    } else {
        at.to_string()
    }
}

fn primitive(name: &str) -> Option<AvroSchema> {
    Some(match name {
        "null" => AvroSchema::Null,
        "boolean" => AvroSchema::Boolean,
        "int" => AvroSchema::Int,
        "long" => AvroSchema::Long,
        "float" => AvroSchema::Float,
        "double" => AvroSchema::Double,
        "bytes" => AvroSchema::Bytes,
        "string" => AvroSchema::String,
        _ => return None,
    })
}

pub(crate) struct SchemaParser {
    named: HashMap<String, AvroSchema>,
    declared: HashSet<String>,
    /// Records in declaration order, with their locations.
    records: Vec<(String, String)>,
}

impl SchemaParser {
    /// Parses a schema document, returning the root and every named type.
    pub(crate) fn parse(
        json: &Value,
    ) -> Result<(AvroSchema, HashMap<String, AvroSchema>), SchemaParseError> {
        let mut parser = Self {
            named: HashMap::new(),
            declared: HashSet::new(),
            records: Vec::new(),
        };
        let root = parser.parse_type(json, None, "")?;
        parser.check_recursion()?;
        Ok((root, parser.named))
    }

    /// Rejects records whose every value would have to contain another value
    /// of the same record.
    fn check_recursion(&self) -> Result<(), SchemaParseError> {
        for (name, at) in &self.records {
            let Some(AvroSchema::Record { fields, .. }) = self.named.get(name) else {
                continue;
            };
            let mut visited = HashSet::new();
            if fields
                .iter()
                .any(|field| self.always_contains(&field.type_, name, &mut visited))
            {
                return Err(SchemaParseError::UnboundedRecursion {
                    name: name.clone(),
                    at: here(at),
                });
            }
        }
        Ok(())
    }

    /// Whether every value of `schema` holds a value of the record `target`.
    /// Arrays and maps may be empty, and a union escapes through any branch
    /// that does not.
    fn always_contains(
        &self,
        schema: &AvroSchema,
        target: &str,
        visited: &mut HashSet<String>,
    ) -> bool {
        match schema {
            AvroSchema::Ref(name) if name == target => true,
            AvroSchema::Ref(name) => {
                visited.insert(name.clone())
                    && self
                        .named
                        .get(name)
                        .is_some_and(|named| self.always_contains(named, target, visited))
            }
            AvroSchema::Record { fields, .. } => fields
                .iter()
                .any(|field| self.always_contains(&field.type_, target, visited)),
            AvroSchema::Union(branches) => branches
                .iter()
                .all(|branch| self.always_contains(branch, target, visited)),
            _ => false,
        }
    }

    fn parse_type(
        &mut self,
        json: &Value,
        namespace: Option<&str>,
        at: &str,
    ) -> Result<AvroSchema, SchemaParseError> {
        match json {
            Value::String(name) => self.parse_type_name(name, namespace, at),
            Value::Array(branches) => self.parse_union(branches, namespace, at),
            Value::Object(map) => self.parse_object(map, namespace, at),
            _ => Err(SchemaParseError::InvalidAttribute {
                attribute: "type",
                at: here(at),
                reason: "expected a type name, union or object".to_string(),
            }),
        }
    }

    fn parse_type_name(
        &self,
        name: &str,
        namespace: Option<&str>,
        at: &str,
    ) -> Result<AvroSchema, SchemaParseError> {
        if let Some(schema) = primitive(name) {
            return Ok(schema);
        }
        let full_name = if name.contains('.') {
            name.to_string()
        } else {
            qualify(name, namespace)
        };
        if self.declared.contains(&full_name) {
            Ok(AvroSchema::Ref(full_name))
        } else if self.declared.contains(name) {
            Ok(AvroSchema::Ref(name.to_string()))
        } else {
            Err(SchemaParseError::UndefinedType {
                name: name.to_string(),
                at: here(at),
            })
        }
    }

    fn parse_union(
        &mut self,
        branches: &[Value],
        namespace: Option<&str>,
        at: &str,
    ) -> Result<AvroSchema, SchemaParseError> {
        if branches.is_empty() {
            return Err(SchemaParseError::InvalidUnion {
                at: here(at),
                reason: "union has no branches".to_string(),
            });
        }
        let mut seen = HashSet::with_capacity(branches.len());
        let mut schemas = Vec::with_capacity(branches.len());
        for (i, branch) in branches.iter().enumerate() {
            let branch_at = format!("{at}/{i}");
            let schema = self.parse_type(branch, namespace, &branch_at)?;
            if schema.is_union() {
                return Err(SchemaParseError::InvalidUnion {
                    at: branch_at,
                    reason: "unions may not immediately contain other unions".to_string(),
                });
            }
            let type_name = schema.type_name();
            if !seen.insert(type_name.clone()) {
                return Err(SchemaParseError::InvalidUnion {
                    at: branch_at,
                    reason: format!("duplicate branch type `{type_name}`"),
                });
            }
            schemas.push(schema);
        }
        Ok(AvroSchema::Union(schemas))
    }

    fn parse_object(
        &mut self,
        map: &Map<String, Value>,
        namespace: Option<&str>,
        at: &str,
    ) -> Result<AvroSchema, SchemaParseError> {
        let type_ = map
            .get("type")
            .ok_or_else(|| SchemaParseError::MissingAttribute {
                attribute: "type",
                at: here(at),
            })?;
        let type_at = format!("{at}/type");
        let type_name = match type_ {
            Value::String(type_name) => type_name.as_str(),
            nested => return self.parse_type(nested, namespace, &type_at),
        };
        match type_name {
            "record" | "error" => self.parse_record(map, namespace, at),
            "enum" => self.parse_enum(map, namespace, at),
            "fixed" => self.parse_fixed(map, namespace, at),
            "array" => {
                let items = map
                    .get("items")
                    .ok_or_else(|| SchemaParseError::MissingAttribute {
                        attribute: "items",
                        at: here(at),
                    })?;
                let items = self.parse_type(items, namespace, &format!("{at}/items"))?;
                Ok(AvroSchema::Array {
                    items: Box::new(items),
                })
            }
            "map" => {
                let values = map
                    .get("values")
                    .ok_or_else(|| SchemaParseError::MissingAttribute {
                        attribute: "values",
                        at: here(at),
                    })?;
                let values = self.parse_type(values, namespace, &format!("{at}/values"))?;
                Ok(AvroSchema::Map {
                    values: Box::new(values),
                })
            }
            // Primitives with extra attributes such as `logicalType`, and
            // references to named types.
            other => self.parse_type_name(other, namespace, &type_at),
        }
    }

    /// Reads `name`/`namespace`, validates them and declares the full name.
    fn declare_name(
        &mut self,
        map: &Map<String, Value>,
        enclosing: Option<&str>,
        at: &str,
    ) -> Result<(String, Option<String>), SchemaParseError> {
        let raw = match map.get("name") {
            Some(Value::String(name)) => name.as_str(),
            Some(_) => {
                return Err(SchemaParseError::InvalidAttribute {
                    attribute: "name",
                    at: here(at),
                    reason: "expected a string".to_string(),
                })
            }
            None => {
                return Err(SchemaParseError::MissingAttribute {
                    attribute: "name",
                    at: here(at),
                })
            }
        };
        let (name, namespace) = match raw.rsplit_once('.') {
            Some((ns, name)) => (name.to_string(), Some(ns.to_string())),
            None => {
                let namespace = match map.get("namespace") {
                    Some(Value::String(ns)) => Some(ns.clone()),
                    Some(Value::Null) | None => enclosing.map(str::to_string),
                    Some(_) => {
                        return Err(SchemaParseError::InvalidAttribute {
                            attribute: "namespace",
                            at: here(at),
                            reason: "expected a string".to_string(),
                        })
                    }
                };
                (raw.to_string(), namespace)
            }
        };

        let namespace_parts = namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .map(|ns| ns.split('.').collect::<Vec<_>>())
            .unwrap_or_default();
        let valid = name_pattern().is_match(&name)
            && namespace_parts
                .iter()
                .all(|part| name_pattern().is_match(part))
            && !PRIMITIVES.contains(&name.as_str());
        if !valid {
            return Err(SchemaParseError::InvalidName {
                name: raw.to_string(),
                at: here(at),
            });
        }

        let full_name = qualify(&name, namespace.as_deref());
        if !self.declared.insert(full_name.clone()) {
            return Err(SchemaParseError::DuplicateName {
                name: full_name,
                at: here(at),
            });
        }
        Ok((name, namespace))
    }

    fn parse_record(
        &mut self,
        map: &Map<String, Value>,
        enclosing: Option<&str>,
        at: &str,
    ) -> Result<AvroSchema, SchemaParseError> {
        let (name, namespace) = self.declare_name(map, enclosing, at)?;
        self.records
            .push((qualify(&name, namespace.as_deref()), at.to_string()));
        let fields_json = match map.get("fields") {
            Some(Value::Array(fields)) => fields,
            Some(_) => {
                return Err(SchemaParseError::InvalidAttribute {
                    attribute: "fields",
                    at: here(at),
                    reason: "expected an array".to_string(),
                })
            }
            None => {
                return Err(SchemaParseError::MissingAttribute {
                    attribute: "fields",
                    at: here(at),
                })
            }
        };

        let mut fields = Vec::with_capacity(fields_json.len());
        let mut field_names = HashSet::with_capacity(fields_json.len());
        for (i, field_json) in fields_json.iter().enumerate() {
            let field_at = format!("{at}/fields/{i}");
            let field = self.parse_field(field_json, namespace.as_deref(), &field_at)?;
            if !field_names.insert(field.name.clone()) {
                return Err(SchemaParseError::DuplicateField {
                    name: field.name,
                    at: field_at,
                });
            }
            fields.push(field);
        }

        let record = AvroSchema::Record {
            name,
            namespace,
            fields,
            aliases: aliases(map),
            doc: doc(map),
        };
        if let Some(full_name) = record.full_name() {
            self.named.insert(full_name, record.clone());
        }
        Ok(record)
    }

    fn parse_field(
        &mut self,
        json: &Value,
        namespace: Option<&str>,
        at: &str,
    ) -> Result<AvroField, SchemaParseError> {
        let map = json
            .as_object()
            .ok_or_else(|| SchemaParseError::InvalidAttribute {
                attribute: "fields",
                at: here(at),
                reason: "expected a field object".to_string(),
            })?;
        let name = match map.get("name") {
            Some(Value::String(name)) if name_pattern().is_match(name) => name.clone(),
            Some(Value::String(name)) => {
                return Err(SchemaParseError::InvalidName {
                    name: name.clone(),
                    at: here(at),
                })
            }
            Some(_) => {
                return Err(SchemaParseError::InvalidAttribute {
                    attribute: "name",
                    at: here(at),
                    reason: "expected a string".to_string(),
                })
            }
            None => {
                return Err(SchemaParseError::MissingAttribute {
                    attribute: "name",
                    at: here(at),
                })
            }
        };
        let type_json = map
            .get("type")
            .ok_or_else(|| SchemaParseError::MissingAttribute {
                attribute: "type",
                at: here(at),
            })?;
        let type_ = self.parse_type(type_json, namespace, &format!("{at}/type"))?;
        let default = match map.get("default") {
            Some(default) => Some(self.parse_default(default, &type_, &name, at)?),
            None => None,
        };
        Ok(AvroField {
            name,
            type_,
            default,
            doc: doc(map),
            aliases: aliases(map),
        })
    }

    /// Resolves a field default; a union default must match its first branch.
    fn parse_default(
        &self,
        json: &Value,
        type_: &AvroSchema,
        field: &str,
        at: &str,
    ) -> Result<AvroValue, SchemaParseError> {
        let resolver = Resolver::new(&self.named);
        let path = FieldPath::root().field(field);
        let resolved = match type_ {
            AvroSchema::Union(branches) => resolver
                .resolve(json, &branches[0], &path)
                .map(|value| AvroValue::Union {
                    index: 0,
                    value: Box::new(value),
                }),
            other => resolver.resolve(json, other, &path),
        };
        resolved.map_err(|e| SchemaParseError::InvalidDefault {
            field: field.to_string(),
            at: format!("{at}/default"),
            reason: e.to_string(),
        })
    }

    fn parse_enum(
        &mut self,
        map: &Map<String, Value>,
        enclosing: Option<&str>,
        at: &str,
    ) -> Result<AvroSchema, SchemaParseError> {
        let (name, namespace) = self.declare_name(map, enclosing, at)?;
        let symbols_json = map
            .get("symbols")
            .ok_or_else(|| SchemaParseError::MissingAttribute {
                attribute: "symbols",
                at: here(at),
            })?;
        let invalid = |reason: &str| SchemaParseError::InvalidAttribute {
            attribute: "symbols",
            at: here(at),
            reason: reason.to_string(),
        };
        let symbols_json = symbols_json
            .as_array()
            .ok_or_else(|| invalid("expected an array"))?;
        if symbols_json.is_empty() {
            return Err(invalid("enum has no symbols"));
        }
        let mut symbols = Vec::with_capacity(symbols_json.len());
        for symbol in symbols_json {
            let symbol = symbol
                .as_str()
                .filter(|s| name_pattern().is_match(s))
                .ok_or_else(|| invalid(&format!("invalid symbol {symbol}")))?;
            if symbols.iter().any(|s| s == symbol) {
                return Err(invalid(&format!("duplicate symbol `{symbol}`")));
            }
            symbols.push(symbol.to_string());
        }
        let default = match map.get("default") {
            Some(Value::String(default)) if symbols.contains(default) => Some(default.clone()),
            Some(other) => {
                return Err(SchemaParseError::InvalidAttribute {
                    attribute: "default",
                    at: here(at),
                    reason: format!("{other} is not one of the symbols"),
                })
            }
            None => None,
        };

        let schema = AvroSchema::Enum {
            name,
            namespace,
            symbols,
            default,
            aliases: aliases(map),
            doc: doc(map),
        };
        if let Some(full_name) = schema.full_name() {
            self.named.insert(full_name, schema.clone());
        }
        Ok(schema)
    }

    fn parse_fixed(
        &mut self,
        map: &Map<String, Value>,
        enclosing: Option<&str>,
        at: &str,
    ) -> Result<AvroSchema, SchemaParseError> {
        let (name, namespace) = self.declare_name(map, enclosing, at)?;
        let size = match map.get("size") {
            Some(size) => size
                .as_u64()
                .and_then(|size| usize::try_from(size).ok())
                .ok_or_else(|| SchemaParseError::InvalidAttribute {
                    attribute: "size",
                    at: here(at),
                    reason: "expected a non-negative integer".to_string(),
                })?,
            None => {
                return Err(SchemaParseError::MissingAttribute {
                    attribute: "size",
                    at: here(at),
                })
            }
        };
        let schema = AvroSchema::Fixed {
            name,
            namespace,
            size,
            aliases: aliases(map),
        };
        if let Some(full_name) = schema.full_name() {
            self.named.insert(full_name, schema.clone());
        }
        Ok(schema)
    }
}

fn doc(map: &Map<String, Value>) -> Option<String> {
    map.get("doc").and_then(Value::as_str).map(str::to_string)
}

fn aliases(map: &Map<String, Value>) -> Vec<String> {
    map.get("aliases")
        .and_then(Value::as_array)
        .map(|aliases| {
            aliases
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
