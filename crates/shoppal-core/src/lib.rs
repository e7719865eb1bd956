pub mod bootstrap;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod render;
pub mod session;
pub mod state;
pub mod transcript;
pub mod transport;

// Re-export main types for convenience
pub use bootstrap::{OnceGate, STARTUP_GREETING};
pub use config::Config;
pub use dispatcher::{DispatchState, Dispatcher, PendingRequest, SendOutcome};
pub use error::TransportError;
pub use protocol::{AgentMessage, AgentRequest, AgentResponse};
pub use render::{render_html, render_transcript_html, HtmlSanitizer, RenderOptions};
pub use session::Session;
pub use state::{Role, Turn};
pub use transcript::Transcript;
pub use transport::{HttpTransport, Transport};
