//! Parameters shared by every visitor of one traversal.

use crate::metadata::parse_timestamp;
use chrono::{DateTime, Utc};
use cws_connectors::{CascadeError, CascadeResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// An open key/value bag with typed getters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraversalParams {
    values: HashMap<String, Value>,
}

impl TraversalParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`TraversalParams::set`].
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// A string parameter. Present but non-string is [`CascadeError::UnacceptableValue`].
    pub fn get_str(&self, key: &str) -> CascadeResult<Option<&str>> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(CascadeError::UnacceptableValue(format!(
                "Parameter '{}' must be a string, got {}",
                key, other
            ))),
        }
    }

    /// A boolean flag. Anything but `true`/`false` is [`CascadeError::UnacceptableValue`].
    pub fn get_bool(&self, key: &str) -> CascadeResult<Option<bool>> {
        match self.values.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(CascadeError::UnacceptableValue(format!(
                "Parameter '{}' must be a boolean, got {}",
                key, other
            ))),
        }
    }

    /// A timestamp given as RFC 3339 or `YYYY-MM-DD`.
    pub fn get_datetime(&self, key: &str) -> CascadeResult<Option<DateTime<Utc>>> {
        let Some(text) = self.get_str(key)? else {
            return Ok(None);
        };
        parse_timestamp(text).map(Some).ok_or_else(|| {
            CascadeError::UnacceptableValue(format!(
                "Parameter '{}' is not a date: {}",
                key, text
            ))
        })
    }

    pub fn require_str(&self, key: &str) -> CascadeResult<&str> {
        match self.get_str(key)? {
            Some(s) if !s.is_empty() => Ok(s),
            _ => Err(missing(key)),
        }
    }

    pub fn require_bool(&self, key: &str) -> CascadeResult<bool> {
        self.get_bool(key)?.ok_or_else(|| missing(key))
    }

    pub fn require_datetime(&self, key: &str) -> CascadeResult<DateTime<Utc>> {
        self.get_datetime(key)?.ok_or_else(|| missing(key))
    }
}

fn missing(key: &str) -> CascadeError {
    CascadeError::EmptyValue(format!("Missing parameter '{}'", key))
}
