//! Session identity shared by every turn of one conversation.

/// Opaque token issued by the agent backend.
///
/// Starts empty. Every response overwrites it, and whatever is stored is
/// echoed on the next request. The value is never inspected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a conversation with a token from an earlier run.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// The current token, or `""` before first contact.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_established(&self) -> bool {
        !self.token.is_empty()
    }

    /// Unconditional overwrite; the backend owns token identity.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }
}
