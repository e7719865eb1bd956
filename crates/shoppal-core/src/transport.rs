//! Transport to the remote agent endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::TransportError;
use crate::protocol::{AgentRequest, AgentResponse};

/// One request, one response. Timeouts surface as errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, request: &AgentRequest) -> Result<AgentResponse, TransportError>;
}

/// JSON-over-HTTP transport to the agent's `POST` endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, request: &AgentRequest) -> Result<AgentResponse, TransportError> {
        debug!(
            endpoint = %self.endpoint,
            has_session = !request.session_id.is_empty(),
            message_len = request.message.len(),
            "posting to agent"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        // Read the body first so a bad shape is reported as a decode error,
        // not as a network one.
        let bytes = response.bytes().await?;
        let agent_response: AgentResponse = serde_json::from_slice(&bytes)?;

        debug!(messages = agent_response.messages.len(), "agent replied");
        Ok(agent_response)
    }
}
