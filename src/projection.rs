//! Field projection of raw registry items
//!
//! The registry answers with a JSON object mapping package names to metadata.
//! A [`FieldSpec`] decides what each cached item looks like: the package name
//! alone, an object with a few picked fields, or the output of a caller
//! supplied transform.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while projecting registry items
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A transform rejected an item
    #[error("Transform '{transform}' failed on item '{key}': {reason}")]
    TransformFailed {
        transform: String,
        key: String,
        reason: String,
    },
}

type TransformFn = dyn Fn(&Value) -> Result<Value, String> + Send + Sync;

/// A named mapping applied to every registry item
///
/// The identifier is part of the cache file name, so two transforms that
/// produce different shapes must use different identifiers.
#[derive(Clone)]
pub struct Transform {
    id: String,
    func: Arc<TransformFn>,
}

impl Transform {
    /// Creates a transform with a stable identifier
    pub fn new<F>(id: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            func: Arc::new(func),
        }
    }

    /// Identifier used to derive the cache location
    pub fn id(&self) -> &str {
        &self.id
    }

    fn apply(&self, key: &str, item: &Value) -> Result<Value, ProjectionError> {
        (self.func)(item).map_err(|reason| ProjectionError::TransformFailed {
            transform: self.id.clone(),
            key: key.to_string(),
            reason,
        })
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform").field("id", &self.id).finish()
    }
}

/// Shape of the cached items
#[derive(Debug, Clone, Default)]
pub enum FieldSpec {
    /// Package names, in registry order
    #[default]
    AllKeys,
    /// One object per package holding only these fields
    Pick(Vec<String>),
    /// One value per package produced by a transform
    Transform(Transform),
}

impl FieldSpec {
    /// Builds a picking spec
    ///
    /// Blank names are dropped; a list with no names left falls back to
    /// [`FieldSpec::AllKeys`].
    pub fn pick<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields
            .into_iter()
            .map(Into::into)
            .filter(|field: &String| !field.trim().is_empty())
            .collect();
        if fields.is_empty() {
            FieldSpec::AllKeys
        } else {
            FieldSpec::Pick(fields)
        }
    }

    /// Builds a transform spec
    pub fn transform<F>(id: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        FieldSpec::Transform(Transform::new(id, func))
    }

    /// String form hashed into the cache file name
    ///
    /// Variants carry their own prefix and picked names are JSON encoded;
    /// specs yielding differently shaped items never share a key.
    pub fn cache_key(&self) -> String {
        match self {
            FieldSpec::AllKeys => String::new(),
            FieldSpec::Pick(fields) if fields.is_empty() => String::new(),
            FieldSpec::Pick(fields) => {
                // Serializing a list of strings cannot fail
                let encoded = serde_json::to_string(fields).unwrap_or_default();
                format!("pick:{}", encoded)
            }
            FieldSpec::Transform(transform) => format!("transform:{}", transform.id),
        }
    }

    /// Projects the registry response into cache items
    ///
    /// Output order follows the iteration order of `raw`, which is the order
    /// the registry sent. A failing transform aborts the whole projection.
    pub fn project(&self, raw: &Map<String, Value>) -> Result<Vec<Value>, ProjectionError> {
        match self {
            FieldSpec::AllKeys => Ok(keys(raw)),
            FieldSpec::Pick(fields) if fields.is_empty() => Ok(keys(raw)),
            FieldSpec::Pick(fields) => Ok(raw.values().map(|item| pick(item, fields)).collect()),
            FieldSpec::Transform(transform) => raw
                .iter()
                .map(|(key, item)| transform.apply(key, item))
                .collect(),
        }
    }
}

fn keys(raw: &Map<String, Value>) -> Vec<Value> {
    raw.keys().cloned().map(Value::String).collect()
}

fn pick(item: &Value, fields: &[String]) -> Value {
    let mut picked = Map::new();
    if let Value::Object(source) = item {
        for field in fields {
            if let Some(value) = source.get(field) {
                picked.insert(field.clone(), value.clone());
            }
        }
    }
    Value::Object(picked)
}
