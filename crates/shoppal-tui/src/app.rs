use std::path::PathBuf;
use std::sync::Arc;

use ratatui::layout::Rect;
use shoppal_core::{
    AgentResponse, Config, Dispatcher, OnceGate, RenderOptions, SendOutcome, Session, Transport,
    TransportError, STARTUP_GREETING,
};
use tokio::task::JoinHandle;

use crate::export;

/// Message shown in the footer until something replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Info(String),
    Error(String),
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub dispatcher: Dispatcher,
    pub transport: Arc<dyn Transport>,
    pub exchange_task: Option<JoinHandle<Result<AgentResponse, TransportError>>>,
    pub endpoint: String,
    pub render_options: RenderOptions,

    // Input state
    pub input_cursor: usize,

    // Transcript view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the chat area, updated during render
    pub chat_width: u16,
    pub follow_tail: bool,
    pub chat_area: Option<Rect>,

    pub animation_frame: u8,
    pub status: Option<StatusLine>,
    pub export_dir: Option<PathBuf>,
}

impl App {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            should_quit: false,
            dispatcher: Dispatcher::new(),
            transport,
            exchange_task: None,
            endpoint: config.endpoint.clone(),
            render_options: RenderOptions {
                image_max_width_px: config.image_max_width_px,
                ..RenderOptions::default()
            },

            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_tail: true,
            chat_area: None,

            animation_frame: 0,
            status: None,
            export_dir: None,
        }
    }

    /// Resume an earlier conversation instead of starting fresh.
    pub fn with_session(mut self, session: Session) -> Self {
        self.dispatcher = Dispatcher::with_session(session);
        self
    }

    /// Kick off the greeting exchange the first time the chat opens.
    pub fn start(&mut self, auto_greet: bool) {
        self.start_with(&STARTUP_GREETING, auto_greet);
    }

    pub fn start_with(&mut self, gate: &OnceGate, auto_greet: bool) {
        if auto_greet && gate.try_fire() {
            tracing::info!("sending startup greeting");
            self.submit();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.dispatcher.is_busy()
    }

    /// Send the current draft on a background task.
    ///
    /// Does nothing while an exchange is already in flight.
    pub fn submit(&mut self) {
        let Some(request) = self.dispatcher.begin_draft() else {
            return;
        };

        let transport = Arc::clone(&self.transport);
        self.exchange_task = Some(tokio::spawn(async move {
            transport.exchange(&request).await
        }));

        // Keep the echo and the "Thinking..." indicator in view
        self.follow_tail = true;
    }

    /// Settle the exchange if its task has completed.
    pub async fn poll_exchange(&mut self) {
        if self
            .exchange_task
            .as_ref()
            .is_some_and(|task| task.is_finished())
        {
            self.finish_exchange().await;
        }
    }

    /// Wait for the in-flight exchange and apply its result.
    pub async fn finish_exchange(&mut self) {
        let Some(task) = self.exchange_task.take() else {
            return;
        };

        let result = match task.await {
            Ok(result) => result,
            Err(join_err) => Err(TransportError::Interrupted(join_err.to_string())),
        };

        match self.dispatcher.settle(result) {
            SendOutcome::Delivered { .. } => {
                if matches!(self.status, Some(StatusLine::Error(_))) {
                    self.status = None;
                }
            }
            SendOutcome::Failed(err) => {
                self.status = Some(StatusLine::Error(format!("Send failed: {err}")));
            }
            SendOutcome::Rejected => {}
        }

        self.input_cursor = 0;
        self.follow_tail = true;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn half_page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }

    /// Write the visible transcript to an HTML file and report where.
    pub fn export_transcript(&mut self) {
        let path = match &self.export_dir {
            Some(dir) => Ok(export::transcript_file(dir, self.dispatcher.session())),
            None => export::default_transcript_path(self.dispatcher.session()),
        };

        let result = path.and_then(|path| {
            export::write_transcript(&self.dispatcher, &self.render_options, &path)?;
            Ok(path)
        });

        self.status = Some(match result {
            Ok(path) => StatusLine::Info(format!("Transcript saved to {}", path.display())),
            Err(err) => {
                tracing::warn!(error = %err, "transcript export failed");
                StatusLine::Error(format!("Export failed: {err}"))
            }
        });
    }

    // Draft editing, disabled while an exchange is in flight

    pub fn insert_char(&mut self, c: char) {
        if self.is_busy() {
            return;
        }
        let byte_pos = char_to_byte_index(self.dispatcher.draft(), self.input_cursor);
        self.dispatcher.draft_mut().insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.is_busy() || self.input_cursor == 0 {
            return;
        }
        self.input_cursor -= 1;
        let byte_pos = char_to_byte_index(self.dispatcher.draft(), self.input_cursor);
        self.dispatcher.draft_mut().remove(byte_pos);
    }

    pub fn delete_at_cursor(&mut self) {
        if self.is_busy() {
            return;
        }
        let char_count = self.dispatcher.draft().chars().count();
        if self.input_cursor < char_count {
            let byte_pos = char_to_byte_index(self.dispatcher.draft(), self.input_cursor);
            self.dispatcher.draft_mut().remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.dispatcher.draft().chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.dispatcher.draft().chars().count();
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
