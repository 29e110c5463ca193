//! Workspace events - what agents have been doing, visible to every agent
//!
//! The events live in shared memory under `workspace_events` as a ring of
//! the latest fifty, so they persist with the rest of the shared data. Each
//! publish is also broadcast on the coordination log.

use super::Team;
use crate::types::{event_types, EventMetadata, WorkspaceEvent};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Shared-memory key holding the ring
pub const WORKSPACE_EVENTS_KEY: &str = "workspace_events";

/// Ring capacity
pub const WORKSPACE_EVENT_LIMIT: usize = 50;

/// Events shown to a delegated agent
const CONTEXT_EVENTS: usize = 5;

impl Team {
    pub fn publish_workspace_event(
        &self,
        agent_id: &str,
        event_type: &str,
        description: &str,
        data: HashMap<String, Value>,
    ) -> WorkspaceEvent {
        let now = Utc::now();
        let event = WorkspaceEvent {
            id: format!("{}_{}_{}", agent_id, event_type, now.timestamp()),
            agent_id: agent_id.to_string(),
            event_type: event_type.to_string(),
            description: description.to_string(),
            timestamp: now,
            data,
        };

        let mut events = self.workspace_events(0);
        events.push(event.clone());
        if events.len() > WORKSPACE_EVENT_LIMIT {
            let excess = events.len() - WORKSPACE_EVENT_LIMIT;
            events.drain(..excess);
        }
        self.set_shared_data(WORKSPACE_EVENTS_KEY, events);

        self.log_coordination_event(
            event_types::WORKSPACE_EVENT,
            agent_id,
            "*",
            &format!("{}: {}", event_type, description),
            EventMetadata::Workspace {
                event_type: event_type.to_string(),
                data: event.data.clone(),
            },
        );
        debug!("🌐 Workspace event from {}: {}", agent_id, event_type);
        event
    }

    /// Latest `limit` events, oldest first (`0` = all)
    pub fn workspace_events(&self, limit: usize) -> Vec<WorkspaceEvent> {
        let mut events = self
            .get_shared_data(WORKSPACE_EVENTS_KEY)
            .and_then(|value| value.to_workspace_events())
            .unwrap_or_default();
        if limit > 0 && events.len() > limit {
            events.drain(..events.len() - limit);
        }
        events
    }

    /// Block describing recent events, empty when there are none
    pub fn workspace_context(&self) -> String {
        workspace_context(&self.workspace_events(CONTEXT_EVENTS))
    }
}

/// Render events as the `RECENT WORKSPACE EVENTS` block
pub fn workspace_context(events: &[WorkspaceEvent]) -> String {
    if events.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n\nRECENT WORKSPACE EVENTS:\n");
    for event in events {
        out.push_str(&format!(
            "- [{}] {} | {}: {}\n",
            event.timestamp.format("%H:%M:%S"),
            event.agent_id,
            event.event_type,
            event.description
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifier;
    use crew_core::{CoreAgent, MockClient, ToolRegistry};
    use crew_foundation::{MemoryStore, SharedStore};
    use std::sync::Arc;

    fn team_over(store: Arc<dyn SharedStore>) -> Arc<Team> {
        let parent = Arc::new(CoreAgent::new(
            Arc::new(MockClient::echo()),
            "mock",
            ToolRegistry::new(),
        ));
        Team::builder("ws", parent)
            .store(store)
            .work_dir(std::env::temp_dir())
            .notifier(Notifier::Silent)
            .build()
            .unwrap()
    }

    #[test]
    fn test_publish_and_context() {
        let team = team_over(Arc::new(MemoryStore::new()));
        assert_eq!(team.workspace_context(), "");

        let mut data = HashMap::new();
        data.insert("path".to_string(), Value::from("main.go"));
        let event = team.publish_workspace_event("coder", "file_created", "Created main.go", data);
        assert!(event.id.starts_with("coder_file_created_"));

        let context = team.workspace_context();
        assert!(context.starts_with("\n\nRECENT WORKSPACE EVENTS:\n- ["));
        assert!(context.ends_with("] coder | file_created: Created main.go\n"));

        let coord = team.coordination_events();
        let last = coord.last().unwrap();
        assert_eq!(last.event_type, "workspace_event");
        assert_eq!(last.to, "*");
        assert_eq!(last.content, "file_created: Created main.go");
    }

    #[test]
    fn test_ring_is_bounded() {
        let team = team_over(Arc::new(MemoryStore::new()));
        for i in 0..55 {
            team.publish_workspace_event("a", "tick", &format!("tick {}", i), HashMap::new());
        }

        let events = team.workspace_events(0);
        assert_eq!(events.len(), WORKSPACE_EVENT_LIMIT);
        assert_eq!(events[0].description, "tick 5");
        assert_eq!(team.workspace_events(5).len(), 5);
        assert_eq!(team.workspace_events(5)[4].description, "tick 54");
    }

    #[test]
    fn test_events_survive_new_team() {
        let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new());
        team_over(Arc::clone(&store)).publish_workspace_event(
            "writer",
            "doc_updated",
            "README",
            HashMap::new(),
        );

        let events = team_over(store).workspace_events(0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].agent_id, "writer");
    }
}
