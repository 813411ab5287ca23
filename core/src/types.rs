//! Identifier, record, and result envelope types.
//!
//! # Design
//! Records are kept as `serde_json::Map` because the admin UI works with
//! arbitrary attribute bags; only the envelopes around them are typed.
//! Envelopes serialize to exactly the `{data, total}` / `{data}` shapes the
//! UI expects.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A flattened record: `id`, attributes and resolved relationships.
pub type Record = Map<String, Value>;

/// A resource identifier.
///
/// JSON:API ids are strings, but UI code often passes numbers. Deserializes
/// from either and always serializes as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{"id": <id>}`, the reference shape used for unresolved relationships.
    pub fn to_reference(&self) -> Value {
        let mut reference = Map::new();
        reference.insert("id".to_string(), Value::String(self.0.clone()));
        Value::Object(reference)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Id {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for Id {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for Id {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl TryFrom<&Value> for Id {
    type Error = String;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(Self(s.clone())),
            Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(format!("expected a string or number id, got {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Id::try_from(&value).map_err(serde::de::Error::custom)
    }
}

/// Result of the list-shaped verbs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListResult {
    pub data: Vec<Record>,
    pub total: u64,
}

/// Result of get-one, create and update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordResult {
    pub data: Record,
}

/// Identifier of a deleted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedRecord {
    pub id: Id,
}

/// Result of delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub data: DeletedRecord,
}

/// Result of the batch verbs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdsResult {
    pub data: Vec<Id>,
}

/// Any verb's result, for callers dispatching by verb name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataResponse {
    List(ListResult),
    Record(RecordResult),
    Deleted(DeleteResult),
    Ids(IdsResult),
}
