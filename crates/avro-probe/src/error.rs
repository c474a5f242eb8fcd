//! Error types shared by schema parsing and record encoding.

use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// A schema definition that could not be parsed.
///
/// `at` is a pointer into the schema JSON, e.g. `/fields/4/type/1`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaParseError {
    #[error("malformed schema JSON at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("undefined type `{name}` at {at}")]
    UndefinedType { name: String, at: String },
    #[error("invalid name `{name}` at {at}")]
    InvalidName { name: String, at: String },
    #[error("duplicate definition of `{name}` at {at}")]
    DuplicateName { name: String, at: String },
    #[error("duplicate field `{name}` at {at}")]
    DuplicateField { name: String, at: String },
    #[error("invalid union at {at}: {reason}")]
    InvalidUnion { at: String, reason: String },
    #[error("missing attribute `{attribute}` at {at}")]
    MissingAttribute { attribute: &'static str, at: String },
    #[error("invalid attribute `{attribute}` at {at}: {reason}")]
    InvalidAttribute {
        attribute: &'static str,
        at: String,
        reason: String,
    },
    #[error("record `{name}` at {at} always contains itself, so no finite value exists")]
    UnboundedRecursion { name: String, at: String },
    #[error("invalid default for field `{field}` at {at}: {reason}")]
    InvalidDefault {
        field: String,
        at: String,
        reason: String,
    },
}

impl From<serde_json::Error> for SchemaParseError {
    fn from(e: serde_json::Error) -> Self {
        SchemaParseError::Syntax {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        }
    }
}

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PathSegment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Location of a value inside a candidate record.
///
/// Displays as `recipient.displayName`, `attachments[0].filename` or
/// `templateData["token"]`; the empty path displays as `<root>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn field(&self, name: &str) -> Self {
        self.with(PathSegment::Field(name.to_string()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.with(PathSegment::Index(index))
    }

    pub fn key(&self, key: &str) -> Self {
        self.with(PathSegment::Key(key.to_string()))
    }

    fn with(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => f.write_str(name)?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
                PathSegment::Key(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

/// Short reason code reported for a rejected record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    MissingRequiredField,
    UnionBranchMismatch,
    TypeMismatch,
    NestedFailure,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::MissingRequiredField => "MissingRequiredField",
            ReasonCode::UnionBranchMismatch => "UnionBranchMismatch",
            ReasonCode::TypeMismatch => "TypeMismatch",
            ReasonCode::NestedFailure => "NestedFailure",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record that does not conform to its schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("{path}: required field missing")]
    MissingRequiredField { path: FieldPath },
    #[error("{path}: {found} does not match any union branch of [{}]", .branches.join(", "))]
    UnionBranchMismatch {
        path: FieldPath,
        branches: Vec<String>,
        found: String,
    },
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: FieldPath,
        expected: String,
        found: String,
    },
    #[error("{path}: nested failure: {source}")]
    NestedFailure {
        path: FieldPath,
        source: Box<EncodingError>,
    },
}

impl EncodingError {
    pub fn path(&self) -> &FieldPath {
        match self {
            EncodingError::MissingRequiredField { path }
            | EncodingError::UnionBranchMismatch { path, .. }
            | EncodingError::TypeMismatch { path, .. }
            | EncodingError::NestedFailure { path, .. } => path,
        }
    }

    pub fn reason(&self) -> ReasonCode {
        match self {
            EncodingError::MissingRequiredField { .. } => ReasonCode::MissingRequiredField,
            EncodingError::UnionBranchMismatch { .. } => ReasonCode::UnionBranchMismatch,
            EncodingError::TypeMismatch { .. } => ReasonCode::TypeMismatch,
            EncodingError::NestedFailure { .. } => ReasonCode::NestedFailure,
        }
    }

    /// Innermost error of a [`EncodingError::NestedFailure`] chain.
    pub fn root_cause(&self) -> &EncodingError {
        let mut current = self;
        while let EncodingError::NestedFailure { source, .. } = current {
            current = source;
        }
        current
    }

    /// Wraps `self` as a nested failure of the container at `path`, unless the
    /// error was raised at `path` itself.
    pub(crate) fn nest_under(self, path: &FieldPath) -> Self {
        if self.path().len() > path.len() {
            EncodingError::NestedFailure {
                path: path.clone(),
                source: Box::new(self),
            }
        } else {
            self
        }
    }
}

impl Serialize for EncodingError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let cause = match self {
            EncodingError::NestedFailure { source, .. } => Some(source.as_ref()),
            _ => None,
        };
        let mut s = serializer.serialize_struct("EncodingError", 4)?;
        s.serialize_field("reason", self.reason().as_str())?;
        s.serialize_field("path", &self.path().to_string())?;
        s.serialize_field("message", &self.to_string())?;
        match cause {
            Some(cause) => s.serialize_field("cause", cause)?,
            None => s.skip_field("cause")?,
        }
        s.end()
    }
}
