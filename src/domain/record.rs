use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Fully resolved mapping handed to the transport for one delivery.
///
/// Holds no template syntax; everything in it is plain JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransportRecord(Map<String, Value>);

impl TransportRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for TransportRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<TransportRecord> for Value {
    fn from(record: TransportRecord) -> Self {
        Value::Object(record.0)
    }
}

impl TryFrom<Value> for TransportRecord {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err(RecordError::NotAnObject("null")),
            Value::Bool(_) => Err(RecordError::NotAnObject("a boolean")),
            Value::Number(_) => Err(RecordError::NotAnObject("a number")),
            Value::String(_) => Err(RecordError::NotAnObject("a string")),
            Value::Array(_) => Err(RecordError::NotAnObject("an array")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_object() {
        let record = TransportRecord::try_from(json!({"msg": "Killing"})).unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("msg"), Some(&json!("Killing")));
    }

    #[test]
    fn test_record_rejects_non_objects() {
        let err = TransportRecord::try_from(json!([1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "expected a JSON object, got an array");
    }

    #[test]
    fn test_record_serializes_as_plain_object() {
        let mut record = TransportRecord::new();
        record.insert("kind", json!("Pod"));
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"kind":"Pod"}"#);
    }
}
