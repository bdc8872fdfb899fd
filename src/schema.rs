//! Schema validation.
//!
//! A [`Schema`] validates, and may transform, one JSON value. Closures of the shape
//! `Fn(Value) -> Result<Value, String>` are schemas, so adapters for validation crates
//! stay one line long.

use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Validates a value, returning the (possibly transformed) output or an issue.
pub trait Schema: Send + Sync {
    /// Validates `value`.
    ///
    /// # Errors
    ///
    /// Returns a description of the issue when `value` is rejected.
    fn validate(&self, value: Value) -> std::result::Result<Value, String>;
}

impl<F> Schema for F
where
    F: Fn(Value) -> std::result::Result<Value, String> + Send + Sync,
{
    fn validate(&self, value: Value) -> std::result::Result<Value, String> {
        self(value)
    }
}

/// What a schema is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaTarget {
    /// The request body (JSON bodies only).
    Body,
    /// The request headers, as an object of strings.
    Headers,
    /// The request method, as a string.
    Method,
    /// The path parameters.
    Params,
    /// The query parameters, as an object of strings.
    Query,
    /// The parsed success payload.
    Data,
    /// The parsed error payload of a non-2xx response.
    ErrorData,
}

impl fmt::Display for SchemaTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaTarget::Body => "body",
            SchemaTarget::Headers => "headers",
            SchemaTarget::Method => "method",
            SchemaTarget::Params => "params",
            SchemaTarget::Query => "query",
            SchemaTarget::Data => "data",
            SchemaTarget::ErrorData => "errorData",
        };
        f.write_str(name)
    }
}

/// The schemas configured for a call, one optional schema per target.
///
/// # Examples
///
/// ```
/// use callhook::{SchemaSet, SchemaTarget};
/// use serde_json::{json, Value};
///
/// let schemas = SchemaSet::new().with(SchemaTarget::Data, |value: Value| {
///     if value.get("id").is_some() {
///         Ok(value)
///     } else {
///         Err("missing id".to_string())
///     }
/// });
///
/// assert!(schemas.validate(SchemaTarget::Data, json!({ "id": 1 })).is_ok());
/// assert!(schemas.validate(SchemaTarget::Data, json!({})).is_err());
/// // Targets without a schema pass values through untouched.
/// assert_eq!(schemas.validate(SchemaTarget::Body, json!(3)).unwrap(), json!(3));
/// ```
#[derive(Clone, Default)]
pub struct SchemaSet {
    schemas: Vec<(SchemaTarget, Arc<dyn Schema>)>,
}

impl SchemaSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the schema for `target`, replacing an earlier one.
    pub fn with<S>(mut self, target: SchemaTarget, schema: S) -> Self
    where
        S: Schema + 'static,
    {
        self.schemas.retain(|(existing, _)| *existing != target);
        self.schemas.push((target, Arc::new(schema)));
        self
    }

    /// Returns `true` if a schema is configured for `target`.
    pub fn has(&self, target: SchemaTarget) -> bool {
        self.schemas.iter().any(|(existing, _)| *existing == target)
    }

    /// Validates `value` against the schema for `target`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the schema rejects the value.
    pub fn validate(&self, target: SchemaTarget, value: Value) -> Result<Value> {
        match self.schemas.iter().find(|(existing, _)| *existing == target) {
            Some((_, schema)) => schema
                .validate(value)
                .map_err(|issue| Error::validation(target, format!("Invalid {}: {}", target, issue))),
            None => Ok(value),
        }
    }
}

impl fmt::Debug for SchemaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.schemas.iter().map(|(target, _)| target))
            .finish()
    }
}
