//! Probe description loaded from TOML.
//!
//! ```toml
//! schema = "email_message.avsc"
//! record = "email_message.json"
//!
//! [[variant]]
//! name = "With empty sender object"
//! transform = "set-field"
//! path = "sender"
//! value = {}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::SchemaParseError;
use crate::probe::{default_variants, Variant};
use crate::schema::Schema;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid probe config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid record JSON in {}: {source}", .path.display())]
    Record {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid schema in {}: {source}", .path.display())]
    Schema {
        path: PathBuf,
        source: SchemaParseError,
    },
}

/// Deserialized form of a probe config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    pub schema: PathBuf,
    pub record: PathBuf,
    #[serde(default)]
    pub fail_on_reject: bool,
    #[serde(default, rename = "variant")]
    pub variants: Vec<Variant>,
}

impl ProbeConfig {
    /// Reads a config file; relative paths inside it are taken relative to
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        let mut config = Self::from_toml(&text)?;
        if let Some(dir) = path.parent() {
            config.schema = dir.join(&config.schema);
            config.record = dir.join(&config.record);
        }
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Configured variants, or the default set for `record` when none are
    /// listed.
    pub fn variants(&self, record: &Value) -> Vec<Variant> {
        if self.variants.is_empty() {
            default_variants(record)
        } else {
            self.variants.clone()
        }
    }
}

/// Schema, base record and variants ready to run.
#[derive(Debug, Clone)]
pub struct Probe {
    pub schema: Schema,
    pub record: Value,
    pub variants: Vec<Variant>,
}

impl Probe {
    pub fn load(config: &ProbeConfig) -> Result<Self, ConfigError> {
        let schema = load_schema(&config.schema)?;
        let record = load_record(&config.record)?;
        let variants = config.variants(&record);
        Ok(Self {
            schema,
            record,
            variants,
        })
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_schema(path: &Path) -> Result<Schema, ConfigError> {
    let text = read(path)?;
    log::info!("loading schema from {}", path.display());
    Schema::parse(&text).map_err(|source| ConfigError::Schema {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_record(path: &Path) -> Result<Value, ConfigError> {
    let text = read(path)?;
    log::info!("loading record from {}", path.display());
    serde_json::from_str(&text).map_err(|source| ConfigError::Record {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Transform;

    #[test]
    fn parses_variant_table() {
        let config = ProbeConfig::from_toml(
            r#"
schema = "s.avsc"
record = "r.json"
fail_on_reject = true

[[variant]]
name = "Without null fields"
transform = "strip-nulls"

[[variant]]
name = "With attachments as empty array"
transform = "set-field"
path = "attachments"
value = []
"#,
        )
        .unwrap();
        assert!(config.fail_on_reject);
        let variants = config.variants(&Value::Null);
        assert_eq!(variants.len(), 2);
        assert!(matches!(
            variants[0].transform(),
            Transform::StripNulls { deep: false }
        ));
        assert!(matches!(
            variants[1].transform(),
            Transform::SetField { path, value } if path == "attachments" && value.as_array().is_some_and(Vec::is_empty)
        ));
    }

    #[test]
    fn empty_variant_list_uses_defaults() {
        let config = ProbeConfig::from_toml("schema = \"s\"\nrecord = \"r\"\n").unwrap();
        assert!(!config.fail_on_reject);
        let record = serde_json::json!({"sender": null});
        assert_eq!(
            config.variants(&record).len(),
            default_variants(&record).len()
        );
    }

    #[test]
    fn unknown_transform_is_an_error() {
        let err = ProbeConfig::from_toml(
            "schema = \"s\"\nrecord = \"r\"\n[[variant]]\nname = \"x\"\ntransform = \"shuffle\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
