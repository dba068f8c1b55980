//! The grant record type.
//!
//! A grant carries whatever fields the publisher included, so it is
//! backed by an explicit ordered mapping from field name to JSON value
//! rather than a fixed struct. Validation has already run by the time
//! a [`Grant`] exists; in memory it is freely inspectable and treated
//! as immutable once flattened for export.

use serde_json::{Map, Value};

use crate::flatten::{flatten, FlatRow};

/// One grant record: an ordered mapping of arbitrary nested fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    fields: Map<String, Value>,
}

impl Grant {
    /// Wrap a JSON object as a grant. Returns `None` for non-objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().map(|fields| Self {
            fields: fields.clone(),
        })
    }

    /// The grant's declared `id` field, when present.
    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    /// Look up one field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All fields in declared order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Flatten this grant into dotted/indexed flat keys.
    pub fn to_flat(&self) -> FlatRow {
        flatten(&self.fields)
    }
}

impl std::fmt::Display for Grant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Grant {}>", self.id().unwrap_or("unknown"))
    }
}
