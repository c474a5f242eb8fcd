//! Named transformations of a candidate record.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Closure-backed transform supplied from code.
#[derive(Clone)]
pub struct CustomTransform(Arc<dyn Fn(&Value) -> Value + Send + Sync>);

impl fmt::Debug for CustomTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomTransform(..)")
    }
}

/// A pure function of the base record.
///
/// Config files select a transform with `transform = "<kebab-case name>"`;
/// [`Transform::Custom`] is only available from code.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "transform", rename_all = "kebab-case")]
pub enum Transform {
    Identity,
    /// Remove keys whose value is null.
    StripNulls {
        #[serde(default)]
        deep: bool,
    },
    /// Substitute null values of object keys with `with`.
    ReplaceNulls {
        with: Value,
        #[serde(default)]
        deep: bool,
    },
    /// Set a dotted path, creating intermediate objects.
    SetField { path: String, value: Value },
    /// Remove a dotted path if present.
    RemoveField { path: String },
    #[serde(skip)]
    Custom(CustomTransform),
}

impl Transform {
    pub fn apply(&self, base: &Value) -> Value {
        match self {
            Transform::Identity => base.clone(),
            Transform::StripNulls { deep } => {
                map_objects(base, *deep, &|map| map.retain(|_, v| !v.is_null()))
            }
            Transform::ReplaceNulls { with, deep } => map_objects(base, *deep, &|map| {
                for value in map.values_mut().filter(|v| v.is_null()) {
                    *value = with.clone();
                }
            }),
            Transform::SetField { path, value } => {
                let mut record = base.clone();
                set_path(&mut record, path, value.clone());
                record
            }
            Transform::RemoveField { path } => {
                let mut record = base.clone();
                remove_path(&mut record, path);
                record
            }
            Transform::Custom(CustomTransform(f)) => f(base),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Transform::Identity)
    }
}

/// Applies `edit` to the root object, or to every object when `deep`.
fn map_objects(value: &Value, deep: bool, edit: &dyn Fn(&mut Map<String, Value>)) -> Value {
    let mut value = value.clone();
    if deep {
        edit_deep(&mut value, edit);
    } else if let Value::Object(map) = &mut value {
        edit(map);
    }
    value
}

fn edit_deep(value: &mut Value, edit: &dyn Fn(&mut Map<String, Value>)) {
    match value {
        Value::Object(map) => {
            edit(map);
            for child in map.values_mut() {
                edit_deep(child, edit);
            }
        }
        Value::Array(items) => {
            for item in items {
                edit_deep(item, edit);
            }
        }
        _ => {}
    }
}

fn set_path(record: &mut Value, path: &str, value: Value) {
    let mut current = record;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

fn remove_path(record: &mut Value, path: &str) {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, path),
    };
    let target = match parent {
        Some(parent) => parent
            .split('.')
            .try_fold(record, |current, segment| current.get_mut(segment)),
        None => Some(record),
    };
    if let Some(Value::Object(map)) = target {
        map.shift_remove(last);
    }
}

/// A named transformation tried against the base record.
#[derive(Debug, Clone, Deserialize)]
pub struct Variant {
    name: String,
    #[serde(flatten)]
    transform: Transform,
}

impl Variant {
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
        }
    }

    /// The untransformed base record.
    pub fn identity() -> Self {
        Self::new("identity", Transform::Identity)
    }

    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self::new(name, Transform::Custom(CustomTransform(Arc::new(f))))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn apply(&self, base: &Value) -> Value {
        self.transform.apply(base)
    }
}

/// Variants derived from `base`: as-is, top-level nulls dropped, then each
/// null-valued top-level key set to `{}` and to `[]` on its own.
pub fn default_variants(base: &Value) -> Vec<Variant> {
    let mut variants = vec![
        Variant::identity(),
        Variant::new("strip-nulls", Transform::StripNulls { deep: false }),
    ];
    let Value::Object(map) = base else {
        return variants;
    };
    for key in map.iter().filter(|(_, v)| v.is_null()).map(|(k, _)| k) {
        variants.push(Variant::new(
            format!("{key}-as-empty-object"),
            Transform::SetField {
                path: key.clone(),
                value: Value::Object(Map::new()),
            },
        ));
        variants.push(Variant::new(
            format!("{key}-as-empty-array"),
            Transform::SetField {
                path: key.clone(),
                value: Value::Array(Vec::new()),
            },
        ));
    }
    variants
}
