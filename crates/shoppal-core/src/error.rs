use reqwest::StatusCode;
use thiserror::Error;

/// Ways a single exchange with the agent endpoint can fail.
///
/// All of these are contained to one exchange; none of them is fatal.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("agent endpoint unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("agent endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("agent response was not understood: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("exchange interrupted: {0}")]
    Interrupted(String),
}
