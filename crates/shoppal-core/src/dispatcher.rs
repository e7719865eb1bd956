//! The send cycle: single-flight guard, optimistic echo, reconciliation.
//!
//! A send is split in two halves so an event loop can keep drawing while the
//! network call runs elsewhere:
//!
//! - [`Dispatcher::begin`] checks the gate, echoes the user's text into the
//!   transcript and hands back the [`AgentRequest`] to transmit.
//! - [`Dispatcher::settle`] applies the result and always returns to idle.
//!
//! [`Dispatcher::send`] runs both halves against a [`Transport`] in one call.

use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::protocol::{AgentRequest, AgentResponse};
use crate::session::Session;
use crate::state::Turn;
use crate::transcript::Transcript;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Sending,
}

/// The exchange currently in flight.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub text: String,
}

/// What became of one call to `send`.
#[derive(Debug)]
pub enum SendOutcome {
    /// Another exchange was still in flight; nothing happened.
    Rejected,
    /// The agent replied; `appended` bot/user turns were added.
    Delivered { appended: usize },
    /// The exchange failed; only the optimistic user turn was added.
    Failed(TransportError),
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered { .. })
    }
}

/// Owns the session, the transcript and the input draft.
///
/// It is the only writer of all three; renderers read through the accessors.
#[derive(Debug, Default)]
pub struct Dispatcher {
    session: Session,
    transcript: Transcript,
    draft: String,
    pending: Option<PendingRequest>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Text typed but not yet sent.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn state(&self) -> DispatchState {
        if self.pending.is_some() {
            DispatchState::Sending
        } else {
            DispatchState::Idle
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    /// Start an exchange for `text`.
    ///
    /// Returns `None` when another exchange is in flight. Otherwise the user
    /// turn is appended immediately (empty text included) and the request to
    /// transmit is returned.
    pub fn begin(&mut self, text: impl Into<String>) -> Option<AgentRequest> {
        let text = text.into();
        if let Some(pending) = &self.pending {
            warn!(
                in_flight_len = pending.text.len(),
                "send rejected: exchange already in flight"
            );
            return None;
        }

        self.transcript.append(Turn::user(text.clone()));
        let request = AgentRequest {
            session_id: self.session.token().to_string(),
            message: text.clone(),
        };
        self.pending = Some(PendingRequest { text });

        debug!(turns = self.transcript.len(), "exchange started");
        Some(request)
    }

    /// Start an exchange for the current draft.
    pub fn begin_draft(&mut self) -> Option<AgentRequest> {
        let text = self.draft.clone();
        self.begin(text)
    }

    /// Apply the result of the in-flight exchange and return to idle.
    pub fn settle(&mut self, result: Result<AgentResponse, TransportError>) -> SendOutcome {
        let outcome = match result {
            Ok(response) => {
                let (token, turns) = response.into_turns();
                if token != self.session.token() {
                    info!(session_id = %token, "agent issued session token");
                }
                self.session.set_token(token);

                let appended = turns.len();
                self.transcript.append_many(turns);
                SendOutcome::Delivered { appended }
            }
            Err(err) => {
                warn!(error = %err, "exchange with agent failed");
                SendOutcome::Failed(err)
            }
        };

        self.finish();
        outcome
    }

    /// Run a whole exchange against `transport`.
    pub async fn send<T>(&mut self, transport: &T, text: impl Into<String>) -> SendOutcome
    where
        T: Transport + ?Sized,
    {
        let Some(request) = self.begin(text) else {
            return SendOutcome::Rejected;
        };
        self.transmit(transport, request).await
    }

    /// Send the current draft.
    pub async fn submit<T>(&mut self, transport: &T) -> SendOutcome
    where
        T: Transport + ?Sized,
    {
        let Some(request) = self.begin_draft() else {
            return SendOutcome::Rejected;
        };
        self.transmit(transport, request).await
    }

    async fn transmit<T>(&mut self, transport: &T, request: AgentRequest) -> SendOutcome
    where
        T: Transport + ?Sized,
    {
        // Cleanup must run even if this future is dropped or the transport panics.
        let mut guard = SettleGuard {
            dispatcher: self,
            armed: true,
        };
        let result = transport.exchange(&request).await;
        guard.armed = false;
        guard.dispatcher.settle(result)
    }

    fn finish(&mut self) {
        self.draft.clear();
        self.pending = None;
    }
}

struct SettleGuard<'a> {
    dispatcher: &'a mut Dispatcher,
    armed: bool,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("exchange abandoned before settling");
            self.dispatcher.finish();
        }
    }
}
