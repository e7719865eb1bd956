//! Wire format spoken with the agent endpoint.

use serde::{Deserialize, Serialize};

use crate::state::{Role, Turn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub session_id: String,
    pub messages: Vec<AgentMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub role: String,
    pub content: String,
}

impl AgentMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Convert to a transcript turn, or `None` when there is nothing to show.
    pub fn into_turn(self) -> Option<Turn> {
        if self.content.is_empty() {
            return None;
        }
        Some(Turn {
            role: Role::from_backend(&self.role),
            content: self.content,
        })
    }
}

impl AgentResponse {
    /// Reconcile the batch into turns, preserving backend order.
    pub fn into_turns(self) -> (String, Vec<Turn>) {
        let turns = self
            .messages
            .into_iter()
            .filter_map(AgentMessage::into_turn)
            .collect();
        (self.session_id, turns)
    }
}
