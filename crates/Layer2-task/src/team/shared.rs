//! Shared memory - write-through cache over the durable store
//!
//! Values live in the team's in-memory map and are mirrored as JSON under
//! `(team name, key)` in the `SharedStore`. Reads fall back to the store and
//! normalize what they find, so a fresh team sees what an earlier one wrote.

use super::Team;
use crate::types::{event_types, unique_nanos, CoordinationEvent, EventMetadata, WorkspaceEvent};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One shared-memory entry
#[derive(Debug, Clone, PartialEq)]
pub enum SharedValue {
    Text(String),
    /// Array whose every element is an object
    Records(Vec<Map<String, Value>>),
    /// The workspace event ring
    WorkspaceEvents(Vec<WorkspaceEvent>),
    /// Anything else. Mixed arrays stay here as-is.
    Json(Value),
}

impl SharedValue {
    /// Classify a decoded JSON value
    pub fn normalize(value: Value) -> Self {
        match value {
            Value::String(s) => SharedValue::Text(s),
            Value::Array(items) if items.iter().all(Value::is_object) => SharedValue::Records(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect(),
            ),
            other => SharedValue::Json(other),
        }
    }

    /// Decode stored bytes; non-JSON content reads back as text
    pub fn decode(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Self::normalize(value),
            Err(_) => SharedValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// JSON form, as persisted
    pub fn to_json(&self) -> Value {
        match self {
            SharedValue::Text(s) => Value::String(s.clone()),
            SharedValue::Records(records) => {
                Value::Array(records.iter().cloned().map(Value::Object).collect())
            }
            SharedValue::WorkspaceEvents(events) => {
                serde_json::to_value(events).unwrap_or(Value::Null)
            }
            SharedValue::Json(value) => value.clone(),
        }
    }

    /// Bytes written to the store, falling back to the debug form
    pub fn encode(&self) -> Vec<u8> {
        match serde_json::to_vec(&self.to_json()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Shared value not serializable ({}), storing debug form", e);
                format!("{:?}", self).into_bytes()
            }
        }
    }

    pub fn value_type(&self) -> &'static str {
        match self {
            SharedValue::Text(_) => "string",
            SharedValue::Records(_) => "records",
            SharedValue::WorkspaceEvents(_) => "workspace_events",
            SharedValue::Json(Value::Null) => "null",
            SharedValue::Json(Value::Bool(_)) => "bool",
            SharedValue::Json(Value::Number(_)) => "number",
            SharedValue::Json(Value::String(_)) => "string",
            SharedValue::Json(Value::Array(_)) => "array",
            SharedValue::Json(Value::Object(_)) => "object",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SharedValue::Text(s) => Some(s),
            SharedValue::Json(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_records(&self) -> Option<&[Map<String, Value>]> {
        match self {
            SharedValue::Records(records) => Some(records),
            _ => None,
        }
    }

    /// Workspace events, decoding records read back from the store
    pub fn to_workspace_events(&self) -> Option<Vec<WorkspaceEvent>> {
        match self {
            SharedValue::WorkspaceEvents(events) => Some(events.clone()),
            SharedValue::Records(records) => records
                .iter()
                .map(|r| serde_json::from_value(Value::Object(r.clone())).ok())
                .collect(),
            _ => None,
        }
    }
}

impl From<String> for SharedValue {
    fn from(s: String) -> Self {
        SharedValue::Text(s)
    }
}

impl From<&str> for SharedValue {
    fn from(s: &str) -> Self {
        SharedValue::Text(s.to_string())
    }
}

impl From<Value> for SharedValue {
    fn from(value: Value) -> Self {
        SharedValue::Json(value)
    }
}

impl From<Vec<Map<String, Value>>> for SharedValue {
    fn from(records: Vec<Map<String, Value>>) -> Self {
        SharedValue::Records(records)
    }
}

impl From<Vec<WorkspaceEvent>> for SharedValue {
    fn from(events: Vec<WorkspaceEvent>) -> Self {
        SharedValue::WorkspaceEvents(events)
    }
}

// ============================================================================
// Team API
// ============================================================================

impl Team {
    /// Update memory, persist best-effort, and note the change in the
    /// coordination log (in memory only).
    pub fn set_shared_data(&self, key: &str, value: impl Into<SharedValue>) {
        let value = value.into();
        let value_type = value.value_type();
        let bytes = self.store.as_ref().map(|_| value.encode());

        self.state.write().shared.insert(key.to_string(), value);

        if let (Some(store), Some(bytes)) = (&self.store, bytes) {
            if let Err(e) = store.set(&self.name, key, &bytes, None) {
                debug!("Shared store write failed for {}: {}", key, e);
            }
        }

        let event = CoordinationEvent {
            id: format!("shared_{}", unique_nanos()),
            event_type: event_types::SHARED_MEMORY_UPDATE.to_string(),
            from: "system".to_string(),
            to: "*".to_string(),
            content: format!("Updated shared data: {}", key),
            timestamp: Utc::now(),
            metadata: EventMetadata::SharedMemory {
                key: key.to_string(),
                value_type: value_type.to_string(),
            },
        };
        self.state.write().coordination.push(event);
        debug!("📊 Shared memory updated: {}", key);
    }

    /// Memory first, then the store. Store hits are normalized and cached.
    pub fn get_shared_data(&self, key: &str) -> Option<SharedValue> {
        if let Some(value) = self.state.read().shared.get(key) {
            return Some(value.clone());
        }

        let store = self.store.as_ref()?;
        let bytes = match store.get(&self.name, key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                debug!("Shared store read failed for {}: {}", key, e);
                return None;
            }
        };

        let value = SharedValue::decode(&bytes);
        self.state
            .write()
            .shared
            .insert(key.to_string(), value.clone());
        Some(value)
    }

    /// Copy of the in-memory map
    pub fn all_shared_data(&self) -> HashMap<String, SharedValue> {
        self.state.read().shared.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_homogeneous_objects() {
        let value = SharedValue::normalize(json!([{ "a": "1" }, { "b": "2" }]));
        let records = value.as_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["a"], "1");
    }

    #[test]
    fn test_mixed_array_stays_json() {
        let raw = json!([{ "a": 1 }, 2, "three"]);
        assert_eq!(SharedValue::normalize(raw.clone()), SharedValue::Json(raw));
    }

    #[test]
    fn test_decode_plain_text() {
        assert_eq!(
            SharedValue::decode(b"not json at all"),
            SharedValue::Text("not json at all".into())
        );
        assert_eq!(SharedValue::decode(b"\"quoted\""), SharedValue::Text("quoted".into()));
        assert_eq!(SharedValue::decode(b"42"), SharedValue::Json(json!(42)));
    }

    #[test]
    fn test_value_types() {
        assert_eq!(SharedValue::from("x").value_type(), "string");
        assert_eq!(SharedValue::from(json!({ "k": 1 })).value_type(), "object");
        assert_eq!(SharedValue::from(Vec::<WorkspaceEvent>::new()).value_type(), "workspace_events");
    }

    #[test]
    fn test_workspace_events_survive_records() {
        let event = WorkspaceEvent {
            id: "coder_file_created_1".into(),
            agent_id: "coder".into(),
            event_type: "file_created".into(),
            description: "main.go".into(),
            timestamp: Utc::now(),
            data: HashMap::new(),
        };
        let stored = SharedValue::from(vec![event.clone()]).encode();
        let reloaded = SharedValue::decode(&stored);

        assert!(matches!(reloaded, SharedValue::Records(_)));
        assert_eq!(reloaded.to_workspace_events().unwrap(), vec![event]);
    }
}
