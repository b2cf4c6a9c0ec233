//! Session snapshots, deltas and identifiers

use crate::config::constants::SESSION_KEY_PREFIX;
use crate::session::errors::SessionError;
use crate::strategies::errors::ExecutionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Identifier of a persisted session (`session-<uuid4>`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(format!("{}-{}", SESSION_KEY_PREFIX, Uuid::new_v4()))
    }

    /// Accept an identifier handed back by a client
    pub fn parse(value: &str) -> Result<Self, SessionError> {
        let prefix = format!("{}-", SESSION_KEY_PREFIX);
        match value.strip_prefix(&prefix) {
            Some(rest) if !rest.is_empty() => Ok(Self(value.to_string())),
            _ => Err(SessionError::InvalidId {
                session_id: value.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only view of a session handed to strategies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    values: Map<String, Value>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Value a strategy cannot proceed without
    pub fn require(&self, key: &str) -> Result<&Value, ExecutionError> {
        self.values
            .get(key)
            .ok_or_else(|| ExecutionError::missing(key))
    }

    pub fn require_str(&self, key: &str) -> Result<&str, ExecutionError> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| ExecutionError::invalid(key, "expected a string"))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    /// Snapshot with `delta` applied on top (plain merge)
    pub fn merged(&self, delta: &Delta) -> Session {
        let mut values = self.values.clone();
        crate::session::merge::merge_delta(&mut values, delta);
        Session { values }
    }
}

/// Partial key/value update returned by one strategy call
///
/// Values are `serde_json::Value`, so a delta is always serializable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta {
    values: Map<String, Value>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Insert any serializable value
    pub fn insert_serialized<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), ExecutionError> {
        let value = serde_json::to_value(value)?;
        self.values.insert(key.into(), value);
        Ok(())
    }

    /// Fold another delta in; its keys win
    pub fn extend(&mut self, other: Delta) {
        self.values.extend(other.values);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}
