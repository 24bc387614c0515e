//! Loosely-typed row values.
//!
//! Rows arrive from the backend as JSON objects. This module wraps them
//! with typed accessors that fail loudly when a required field is absent,
//! plus a decoder into per-query row-shape structs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// A single row from (or for) the remote store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    /// An empty row, for building insert/update payloads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON object.
    pub fn from_object(object: Map<String, Value>) -> Self {
        Self(object)
    }

    /// Builder-style field assignment.
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.insert(column.to_string(), value.into());
        self
    }

    /// Builder-style null assignment (explicitly clears a column).
    pub fn set_null(mut self, column: &str) -> Self {
        self.0.insert(column.to_string(), Value::Null);
        self
    }

    /// Raw field access.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Whether the row carries no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A required string field; absent or null is an error.
    pub fn str_field(&self, table: &'static str, column: &'static str) -> Result<&str, StoreError> {
        self.0
            .get(column)
            .and_then(Value::as_str)
            .ok_or(StoreError::MissingField { table, column })
    }

    /// An optional string field; absent and null both read as `None`.
    pub fn opt_str(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(Value::as_str)
    }

    /// A boolean field with a fallback for absent or null values.
    pub fn bool_or(&self, column: &str, default: bool) -> bool {
        self.0.get(column).and_then(Value::as_bool).unwrap_or(default)
    }

    /// A nested object embedded by a join, if present and non-null.
    pub fn nested(&self, alias: &str) -> Option<Row> {
        match self.0.get(alias) {
            Some(Value::Object(object)) => Some(Row(object.clone())),
            _ => None,
        }
    }

    /// Decode the row into a typed row-shape struct.
    ///
    /// Missing required fields surface as [`StoreError::Decode`] naming the
    /// collection, rather than silently defaulting.
    pub fn decode<T: DeserializeOwned>(&self, table: &'static str) -> Result<T, StoreError> {
        serde_json::from_value(Value::Object(self.0.clone())).map_err(|e| StoreError::Decode {
            table,
            message: e.to_string(),
        })
    }

    /// Consume the row into its JSON object.
    pub fn into_object(self) -> Map<String, Value> {
        self.0
    }

    /// View the row as a JSON object.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutable view, for gateway implementations that stamp ids.
    pub fn as_object_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }
}

impl From<Row> for Value {
    fn from(row: Row) -> Self {
        Value::Object(row.0)
    }
}
