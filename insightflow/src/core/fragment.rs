//! The unit of output a stage contributes to shared state.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key/value output of one stage.
///
/// A fragment is degraded when any of its generated text is the
/// safe-mode notice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    data: Map<String, Value>,
    #[serde(default)]
    degraded: bool,
}

impl Fragment {
    /// An empty fragment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `value` into a fragment. It must serialize to an object.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(data) => Ok(Self { data, degraded: false }),
            other => Err(serde::ser::Error::custom(format!(
                "fragment must be a JSON object, got {other}"
            ))),
        }
    }

    /// Deserializes the fragment's data into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.data.clone()))
    }

    /// Adds a key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Marks the fragment degraded when `degraded` is true.
    #[must_use]
    pub fn degraded_if(mut self, degraded: bool) -> Self {
        self.degraded |= degraded;
        self
    }

    /// True when generated text fell back to safe mode.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Reads a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Reads a string key.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// All data.
    #[must_use]
    pub const fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// True when the fragment holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Summary {
        rows: usize,
        label: String,
    }

    #[test]
    fn test_from_serializable_and_decode() {
        let summary = Summary { rows: 3, label: "ok".into() };
        let fragment = Fragment::from_serializable(&summary).unwrap();
        assert_eq!(fragment.get("rows"), Some(&json!(3)));
        assert_eq!(fragment.decode::<Summary>().unwrap(), summary);
    }

    #[test]
    fn test_from_serializable_rejects_non_objects() {
        assert!(Fragment::from_serializable(&vec![1, 2]).is_err());
    }

    #[test]
    fn test_builder_and_degraded() {
        let fragment = Fragment::new().with("narrative", "text").degraded_if(true).degraded_if(false);
        assert_eq!(fragment.get_str("narrative"), Some("text"));
        assert!(fragment.is_degraded());
        assert!(!Fragment::new().is_degraded());
        assert!(Fragment::new().is_empty());
    }
}
