//! Coordination log - append-only record of orchestration actions
//!
//! Events are kept in memory and persisted one per store key
//! (`coord-<id>`) under the team namespace. A new team built over the same
//! store reloads them in timestamp order.

use super::Team;
use crate::types::{unique_nanos, CoordinationEvent, EventMetadata};
use chrono::Utc;
use tracing::{debug, warn};

const COORD_KEY_PREFIX: &str = "coord-";
const SUMMARY_EVENTS: usize = 10;

impl Team {
    /// Append an event, persist it best-effort, and mirror it to the
    /// communication log
    pub fn log_coordination_event(
        &self,
        event_type: &str,
        from: &str,
        to: &str,
        content: &str,
        metadata: EventMetadata,
    ) -> CoordinationEvent {
        let event = CoordinationEvent {
            id: format!("{}_{}", event_type, unique_nanos()),
            event_type: event_type.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
            metadata,
        };

        self.state.write().coordination.push(event.clone());

        if let Some(store) = &self.store {
            match serde_json::to_vec(&event) {
                Ok(bytes) => {
                    let key = format!("{}{}", COORD_KEY_PREFIX, event.id);
                    if let Err(e) = store.set(&self.name, &key, &bytes, None) {
                        debug!("Coordination event {} not persisted: {}", event.id, e);
                    }
                }
                Err(e) => debug!("Coordination event {} not serializable: {}", event.id, e),
            }
        }

        self.comm_log().record(&format!(
            "COORDINATION: {} -> {} | {}: {}",
            from, to, event_type, content
        ));
        event
    }

    /// Restore persisted events; undecodable entries are skipped
    pub(crate) fn load_coordination_from_store(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let keys = match store.keys(&self.name) {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Could not list coordination events for {}: {}", self.name, e);
                return;
            }
        };

        let mut loaded: Vec<CoordinationEvent> = keys
            .iter()
            .filter(|key| key.starts_with(COORD_KEY_PREFIX))
            .filter_map(|key| match store.get(&self.name, key) {
                Ok(Some(bytes)) => serde_json::from_slice(&bytes).ok(),
                _ => None,
            })
            .collect();
        if loaded.is_empty() {
            return;
        }
        loaded.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        debug!("Restored {} coordination events for {}", loaded.len(), self.name);
        self.state.write().coordination.extend(loaded);
    }

    /// Every event, oldest first
    pub fn coordination_events(&self) -> Vec<CoordinationEvent> {
        self.state.read().coordination.clone()
    }

    /// Last ten events as a readable block
    pub fn coordination_summary(&self) -> String {
        let state = self.state.read();
        let events = &state.coordination;
        if events.is_empty() {
            return "No coordination events recorded.".to_string();
        }

        let mut out = format!("Recent Coordination Events ({} total):\n", events.len());
        let start = events.len().saturating_sub(SUMMARY_EVENTS);
        for event in &events[start..] {
            out.push_str(&format!(
                "- {}: {} -> {} | {}\n",
                event.timestamp.format("%H:%M:%S"),
                event.from,
                event.to,
                event.content
            ));
        }
        out
    }

    /// Last `limit` events as history lines (`0` = all)
    pub fn coordination_history(&self, limit: usize) -> Vec<String> {
        let state = self.state.read();
        let events = &state.coordination;
        let start = match limit {
            0 => 0,
            n => events.len().saturating_sub(n),
        };
        events[start..].iter().map(|e| e.history_line()).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::notify::Notifier;
    use crate::team::Team;
    use crate::types::{event_types, EventMetadata};
    use crew_core::{CoreAgent, MockClient, ToolRegistry};
    use crew_foundation::{MemoryStore, SharedStore};
    use std::sync::Arc;

    fn team_over(store: Arc<dyn SharedStore>) -> Arc<Team> {
        let parent = Arc::new(CoreAgent::new(
            Arc::new(MockClient::echo()),
            "mock",
            ToolRegistry::new(),
        ));
        Team::builder("coord", parent)
            .store(store)
            .work_dir(std::env::temp_dir())
            .notifier(Notifier::Silent)
            .build()
            .unwrap()
    }

    #[test]
    fn test_summary_and_history() {
        let team = team_over(Arc::new(MemoryStore::new()));
        assert_eq!(team.coordination_summary(), "No coordination events recorded.");

        for i in 0..12 {
            team.log_coordination_event(
                event_types::DIRECT_MESSAGE,
                "a",
                "b",
                &format!("msg {}", i),
                EventMetadata::None,
            );
        }

        let summary = team.coordination_summary();
        assert!(summary.starts_with("Recent Coordination Events (12 total):\n"));
        assert_eq!(summary.lines().count(), 11);
        assert!(!summary.contains("| msg 1\n"));
        assert!(summary.contains("a -> b | msg 11"));

        assert_eq!(team.coordination_history(0).len(), 12);
        let last = team.coordination_history(2);
        assert_eq!(last.len(), 2);
        assert!(last[1].ends_with("a -> b | msg 11"));
    }

    #[test]
    fn test_ids_are_unique() {
        let team = team_over(Arc::new(MemoryStore::new()));
        let a = team.log_coordination_event("delegation", "agent_0", "x", "t", EventMetadata::None);
        let b = team.log_coordination_event("delegation", "agent_0", "x", "t", EventMetadata::None);
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("delegation_"));
    }

    #[test]
    fn test_reload_from_store_in_order() {
        let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
        {
            let team = team_over(Arc::clone(&store));
            team.log_coordination_event("delegation", "agent_0", "coder", "first", EventMetadata::None);
            team.log_coordination_event(
                "delegation_success",
                "coder",
                "agent_0",
                "second",
                EventMetadata::DelegationSuccess {
                    result_length: 4,
                    agent_type: "coder".into(),
                },
            );
            // memory-only shared update must not come back
            team.set_shared_data("k", "v");
        }

        let reloaded = team_over(store);
        let events = reloaded.coordination_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].content, "first");
        assert_eq!(events[1].content, "second");
        assert!(matches!(
            events[1].metadata,
            EventMetadata::DelegationSuccess { result_length: 4, .. }
        ));
    }
}
