#![forbid(unsafe_code)]

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// Opaque serialized state of an entity, stored verbatim in the action log.
///
/// The log never interprets the payload; only the code that applies an undo
/// decodes it back into a typed row. An empty snapshot stands for "no state"
/// (the previous side of a create, the new side of a delete).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntitySnapshot(Option<JsonValue>);

impl EntitySnapshot {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn of<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self(Some(serde_json::to_value(value)?)))
    }

    pub fn from_value(value: JsonValue) -> Self {
        Self(Some(value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn value(&self) -> Option<&JsonValue> {
        self.0.as_ref()
    }

    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.0.as_ref().and_then(|value| value.get(name))
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        match &self.0 {
            Some(value) => serde_json::from_value(value.clone()).map(Some),
            None => Ok(None),
        }
    }

    /// Column representation: empty string for an empty snapshot.
    pub fn to_data_string(&self) -> String {
        match &self.0 {
            Some(value) => value.to_string(),
            None => String::new(),
        }
    }

    pub fn from_data_string(raw: &str) -> Result<Self, serde_json::Error> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::empty());
        }
        Ok(Self(Some(serde_json::from_str(raw)?)))
    }
}
