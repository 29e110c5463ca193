//! Agent-to-agent messaging
//!
//! Messages are kept in the team's message list; an inbox is the view of
//! messages addressed to one agent. Unread messages are injected into the
//! next delegation to that agent and then marked read. An agent may also
//! subscribe to a live feed of its incoming messages.

use super::Team;
use crate::types::{event_types, unique_nanos, EventMetadata, Message};
use chrono::Utc;
use crew_foundation::{Error, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Buffered messages per subscription before new ones are dropped
pub const MESSAGE_CHANNEL_CAPACITY: usize = 100;

impl Team {
    /// Send `content` from one member to another. Both must be registered.
    pub fn send_message(&self, from: &str, to: &str, content: &str) -> Result<Message> {
        {
            let state = self.state.read();
            if !state.agents_by_name.contains_key(from) {
                return Err(Error::sender_not_found(from));
            }
            if !state.agents_by_name.contains_key(to) {
                return Err(Error::recipient_not_found(to));
            }
        }

        self.log_coordination_event(
            event_types::DIRECT_MESSAGE,
            from,
            to,
            content,
            EventMetadata::DirectMessage {
                message_type: "agent_to_agent".to_string(),
            },
        );

        let message = Message {
            id: format!("msg_{}", unique_nanos()),
            from: from.to_string(),
            to: to.to_string(),
            content: content.to_string(),
            kind: "direct".to_string(),
            timestamp: Utc::now(),
            read: false,
        };
        let feed = {
            let mut state = self.state.write();
            state.messages.push(message.clone());
            state.subscribers.get(to).cloned()
        };
        if let Some(feed) = feed {
            self.deliver(to, &feed, &message);
        }
        debug!("📨 Message {} -> {}", from, to);
        Ok(message)
    }

    /// Live feed of messages sent to `agent` from now on. A new
    /// subscription replaces the previous one; dropping the receiver ends it.
    pub fn subscribe_to_messages(&self, agent: &str) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        self.state.write().subscribers.insert(agent.to_string(), tx);
        debug!("📡 {} subscribed to messages", agent);
        rx
    }

    fn deliver(&self, to: &str, feed: &mpsc::Sender<Message>, message: &Message) {
        match feed.try_send(message.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Message channel for agent {} is full", to);
            }
            Err(TrySendError::Closed(_)) => {
                let mut state = self.state.write();
                if state.subscribers.get(to).is_some_and(|tx| tx.is_closed()) {
                    state.subscribers.remove(to);
                }
            }
        }
    }

    /// Send to every member except the sender; per-recipient failures are
    /// logged and skipped. Returns how many were delivered.
    pub fn broadcast_message(&self, from: &str, content: &str) -> usize {
        let recipients: Vec<String> = self
            .agent_names()
            .into_iter()
            .filter(|name| name != from)
            .collect();

        recipients
            .iter()
            .filter(|to| match self.send_message(from, to, content) {
                Ok(_) => true,
                Err(e) => {
                    warn!("Broadcast from {} to {} failed: {}", from, to, e);
                    false
                }
            })
            .count()
    }

    /// Every message addressed to `agent`, oldest first
    pub fn inbox(&self, agent: &str) -> Vec<Message> {
        self.state
            .read()
            .messages
            .iter()
            .filter(|m| m.to == agent)
            .cloned()
            .collect()
    }

    pub fn unread_inbox(&self, agent: &str) -> Vec<Message> {
        self.state
            .read()
            .messages
            .iter()
            .filter(|m| m.to == agent && !m.read)
            .cloned()
            .collect()
    }

    /// Mark the given ids read, returning how many changed
    pub fn mark_messages_read(&self, agent: &str, ids: &[String]) -> usize {
        let mut state = self.state.write();
        let mut marked = 0;
        for message in state.messages.iter_mut() {
            if message.to == agent && !message.read && ids.contains(&message.id) {
                message.read = true;
                marked += 1;
            }
        }
        marked
    }

    /// Unread messages rendered for a prompt, marking them read.
    /// Empty when there is nothing new.
    pub(crate) fn take_inbox_context(&self, agent: &str) -> String {
        let unread = self.unread_inbox(agent);
        if unread.is_empty() {
            return String::new();
        }

        let mut out = String::from("\n\nINBOX CONTEXT (Unread Messages):\n");
        for message in &unread {
            out.push_str(&format!(
                "- [{}] {}: {}\n",
                message.timestamp.format("%H:%M:%S"),
                message.from,
                message.content
            ));
        }
        out.push_str("\n(Consider the above unread messages in your response.)");

        let ids: Vec<String> = unread.into_iter().map(|m| m.id).collect();
        self.mark_messages_read(agent, &ids);
        out
    }

    /// Ask for help, from one member or everyone (`""` or `"*"`)
    pub fn request_help(&self, from: &str, description: &str, preferred_helper: &str) -> Result<()> {
        if !self.quiet() {
            let mut data = HashMap::new();
            data.insert("preferred_helper".to_string(), Value::from(preferred_helper));
            data.insert("urgency".to_string(), Value::from("normal"));
            self.publish_workspace_event(from, event_types::HELP_REQUEST, description, data);
        }

        let content = format!("Help requested: {}", description);
        match preferred_helper {
            "" | "*" => {
                self.broadcast_message(from, &content);
                Ok(())
            }
            helper => self.send_message(from, helper, &content).map(|_| ()),
        }
    }

    /// Record a pending proposal in shared memory and message the target.
    /// Returns the shared-memory key.
    pub fn propose_collaboration(&self, from: &str, to: &str, proposal: &str) -> Result<String> {
        let now = Utc::now();
        let key = format!("proposal_{}_to_{}_{}", from, to, now.timestamp());
        self.set_shared_data(
            &key,
            json!({
                "from": from,
                "to": to,
                "proposal": proposal,
                "status": "pending",
                "timestamp": now.to_rfc3339(),
            }),
        );

        if !self.quiet() {
            let mut data = HashMap::new();
            data.insert("target_agent".to_string(), Value::from(to));
            data.insert("proposal".to_string(), Value::from(proposal));
            self.publish_workspace_event(
                from,
                event_types::COLLABORATION_PROPOSAL,
                &format!("Proposed collaboration with {}", to),
                data,
            );
        }

        self.send_message(
            from,
            to,
            &format!(
                "Collaboration proposal: {}. Please respond with your thoughts.",
                proposal
            ),
        )?;
        Ok(key)
    }
}
