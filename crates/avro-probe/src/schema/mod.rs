//! Parsed, immutable Avro schemas.

pub mod contract;
mod parser;

use std::collections::HashMap;

use serde_json::Value;

use crate::avro::types::AvroSchema;
use crate::error::SchemaParseError;

pub use contract::{ContractTable, FieldContract, Representation};

/// An Avro schema together with its named types and nullable-field contracts.
#[derive(Debug, Clone)]
pub struct Schema {
    root: AvroSchema,
    named: HashMap<String, AvroSchema>,
    contracts: ContractTable,
}

impl Schema {
    /// Parses schema JSON text.
    pub fn parse(definition: &str) -> Result<Self, SchemaParseError> {
        let json: Value = serde_json::from_str(definition)?;
        Self::from_json(&json)
    }

    /// Parses an already-deserialized schema document.
    pub fn from_json(json: &Value) -> Result<Self, SchemaParseError> {
        let (root, named) = parser::SchemaParser::parse(json)?;
        let mut schema = Self {
            root,
            named,
            contracts: ContractTable::default(),
        };
        schema.contracts = ContractTable::build(&schema);
        log::trace!(
            "parsed schema {} ({} named types, {} field contracts)",
            schema.root.type_name(),
            schema.named.len(),
            schema.contracts.len()
        );
        Ok(schema)
    }

    pub fn root(&self) -> &AvroSchema {
        &self.root
    }

    /// Looks up a named type by full name.
    pub fn named(&self, full_name: &str) -> Option<&AvroSchema> {
        self.named.get(full_name)
    }

    pub(crate) fn named_types(&self) -> &HashMap<String, AvroSchema> {
        &self.named
    }

    /// Follows a reference to its definition.
    pub fn resolve<'a>(&'a self, schema: &'a AvroSchema) -> &'a AvroSchema {
        match schema {
            AvroSchema::Ref(name) => self.named.get(name).unwrap_or(schema),
            _ => schema,
        }
    }

    /// Accepted representations of every nullable or defaulted field.
    pub fn contracts(&self) -> &ContractTable {
        &self.contracts
    }
}

/// Parses schema JSON text into a [`Schema`].
pub fn parse_schema(definition: &str) -> Result<Schema, SchemaParseError> {
    Schema::parse(definition)
}
