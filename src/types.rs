//! Core data types shared by the search, store and query layers.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::error::{Error, Result};

/// Field every record must carry for response composition.
pub const DESCRIPTION_FIELD: &str = "description";

/// Field holding the identifier in serialized records.
pub const ID_FIELD: &str = "id";

/// Opaque record identifier.
///
/// Numeric identifiers (as produced by most vector indexes) are kept in their
/// decimal string form so every backend shares one key space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build an identifier from a JSON string or non-negative integer.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(s) if !s.is_empty() => Some(Self(s.clone())),
            JsonValue::Number(n) => n.as_u64().map(Self::from),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A nearest-neighbour hit reported by a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: RecordId,
    /// Non-negative; smaller is more similar
    pub distance: f32,
}

impl Candidate {
    pub fn new(id: impl Into<RecordId>, distance: f32) -> Self {
        Self {
            id: id.into(),
            distance,
        }
    }
}

/// A structured record resolved from the record store.
///
/// Serializes as a flat JSON object: the stored fields, plus `id` when the
/// stored fields do not already carry one.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    fields: Map<String, JsonValue>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, fields: Map<String, JsonValue>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Parse a record from a JSON object carrying an `id` field.
    pub fn from_json(value: JsonValue) -> Result<Self> {
        let JsonValue::Object(fields) = value else {
            return Err(Error::Store("record is not a JSON object".into()));
        };
        let id = fields
            .get(ID_FIELD)
            .and_then(RecordId::from_json)
            .ok_or_else(|| Error::Store("record has no usable 'id' field".into()))?;
        Ok(Self { id, fields })
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }

    /// The record's description text.
    ///
    /// Fails with [`Error::MalformedRecord`] when the field is absent or is
    /// not a string.
    pub fn description(&self) -> Result<&str> {
        match self.fields.get(DESCRIPTION_FIELD) {
            Some(JsonValue::String(text)) => Ok(text),
            Some(_) => Err(Error::MalformedRecord {
                id: self.id.to_string(),
                reason: format!("'{}' field is not a string", DESCRIPTION_FIELD),
            }),
            None => Err(Error::MalformedRecord {
                id: self.id.to_string(),
                reason: format!("missing '{}' field", DESCRIPTION_FIELD),
            }),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let has_id = self.fields.contains_key(ID_FIELD);
        let len = self.fields.len() + usize::from(!has_id);
        let mut map = serializer.serialize_map(Some(len))?;
        if !has_id {
            map.serialize_entry(ID_FIELD, &self.id)?;
        }
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_record_id_from_json() {
        assert_eq!(RecordId::from_json(&json!(42)), Some(RecordId::from(42u64)));
        assert_eq!(RecordId::from_json(&json!("abc")), Some(RecordId::from("abc")));
        assert_eq!(RecordId::from_json(&json!(-1)), None);
        assert_eq!(RecordId::from_json(&json!("")), None);
        assert_eq!(RecordId::from_json(&json!(null)), None);
    }

    #[test]
    fn test_description_missing_is_malformed() {
        let record = Record::new(7, fields(json!({ "name": "shoe" })));
        match record.description() {
            Err(Error::MalformedRecord { id, .. }) => assert_eq!(id, "7"),
            other => panic!("expected malformed record, got {:?}", other),
        }
    }

    #[test]
    fn test_description_must_be_text() {
        let record = Record::new(7, fields(json!({ "description": 12 })));
        assert!(matches!(
            record.description(),
            Err(Error::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_serialize_adds_id_when_absent() {
        let record = Record::new(42, fields(json!({ "description": "Red sandals" })));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({ "id": "42", "description": "Red sandals" }));
    }

    #[test]
    fn test_serialize_keeps_stored_id() {
        let record = Record::from_json(json!({ "id": 42, "description": "x" })).unwrap();
        assert_eq!(record.id().as_str(), "42");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({ "id": 42, "description": "x" }));
    }

    #[test]
    fn test_from_json_requires_object_with_id() {
        assert!(Record::from_json(json!([1, 2])).is_err());
        assert!(Record::from_json(json!({ "description": "x" })).is_err());
    }
}
