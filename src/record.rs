//! Ordered string-to-string records and their JSON form.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("record must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("value of key {key} must be a string, got {kind}")]
    NonStringValue { key: String, kind: &'static str },

    #[error("invalid JSON record: {0}")]
    Json(String),
}

/// A log record: unique keys, insertion order preserved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: IndexMap::with_capacity(capacity),
        }
    }

    /// Insert a field. An existing key keeps its position and takes the new
    /// value; the previous value is returned.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Build a record from a JSON object whose values are all strings
    pub fn from_json(value: &JsonValue) -> Result<Self, RecordError> {
        let object = value
            .as_object()
            .ok_or_else(|| RecordError::NotAnObject(json_kind(value)))?;

        let mut record = Record::with_capacity(object.len());
        for (key, value) in object {
            match value {
                JsonValue::String(s) => {
                    record.insert(key.as_str(), s.as_str());
                }
                other => {
                    return Err(RecordError::NonStringValue {
                        key: key.clone(),
                        kind: json_kind(other),
                    })
                }
            }
        }
        Ok(record)
    }

    /// Parse one JSON line
    pub fn from_json_str(line: &str) -> Result<Self, RecordError> {
        let value: JsonValue =
            serde_json::from_str(line).map_err(|e| RecordError::Json(e.to_string()))?;
        Self::from_json(&value)
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                .collect(),
        )
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, String);
    type IntoIter = indexmap::map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_keeps_first_position() {
        let mut record = Record::new();
        record.insert("a", "1");
        record.insert("b", "2");
        assert_eq!(record.insert("a", "3"), Some("1".to_string()));

        let pairs: Vec<_> = record.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_lookup() {
        let record: Record = [("host", "web-1"), ("empty", "")].into_iter().collect();
        assert_eq!(record.get("host"), Some("web-1"));
        assert_eq!(record.get("empty"), Some(""));
        assert_eq!(record.get("missing"), None);
        assert!(record.contains_key("empty"));
        assert_eq!(record.len(), 2);
        assert!(!record.is_empty());
    }

    #[test]
    fn test_from_json_preserves_order() {
        let record = Record::from_json_str(r#"{"z":"1","a":"2","m":"3"}"#).unwrap();
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(record.to_json(), json!({"z": "1", "a": "2", "m": "3"}));
    }

    #[test]
    fn test_from_json_rejects_non_strings() {
        assert_eq!(
            Record::from_json(&json!({"a": "1", "n": 5})),
            Err(RecordError::NonStringValue {
                key: "n".to_string(),
                kind: "number"
            })
        );
        assert_eq!(
            Record::from_json(&json!(["a"])),
            Err(RecordError::NotAnObject("array"))
        );
        assert!(matches!(
            Record::from_json_str("{not json"),
            Err(RecordError::Json(_))
        ));
    }

    #[test]
    fn test_serde_transparent() {
        let record: Record = [("b", "1"), ("a", "2")].into_iter().collect();
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"b":"1","a":"2"}"#);
        let back: Record = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
    }
}
