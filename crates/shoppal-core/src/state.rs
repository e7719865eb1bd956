//! UI-agnostic conversation types
//!
//! This module contains data structures that are shared between the different
//! front-ends (TUI, one-shot CLI, HTML export) and don't depend on any specific
//! UI framework.

use serde::{Deserialize, Serialize};

/// One entry in the conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Who a turn is displayed as coming from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: content.into(),
        }
    }

    /// Empty turns are kept in history but never shown.
    pub fn is_displayable(&self) -> bool {
        !self.content.is_empty()
    }
}

impl Role {
    /// Map a backend role string onto a display role.
    ///
    /// `assistant` and `system` are shown as the bot. Every other value,
    /// including unknown ones, falls back to the user side.
    pub fn from_backend(role: &str) -> Self {
        match role {
            "assistant" | "system" => Role::Bot,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_mapping_assistant_and_system_are_bot() {
        assert_eq!(Role::from_backend("assistant"), Role::Bot);
        assert_eq!(Role::from_backend("system"), Role::Bot);
    }

    #[test]
    fn test_role_mapping_falls_back_to_user() {
        assert_eq!(Role::from_backend("user"), Role::User);
        assert_eq!(Role::from_backend("tool"), Role::User);
        assert_eq!(Role::from_backend(""), Role::User);
        // Matching is exact, not case-insensitive
        assert_eq!(Role::from_backend("Assistant"), Role::User);
    }

    #[test]
    fn test_empty_turn_is_not_displayable() {
        assert!(!Turn::user("").is_displayable());
        assert!(Turn::bot(" ").is_displayable());
    }
}
