//! Send/stream state machine over the UI state

use crate::error::{ChatError, INIT_FAILURE_MESSAGE, STREAM_FAILURE_MESSAGE};
use crate::events::{Message, MessageId, Sender, StreamUpdate, StreamUpdateKind};
use crate::llm::ChatSession;
use crate::store::MessageStore;
use crate::streaming::StreamTicket;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
    Streaming,
    Errored,
}

/// State the presentation layer renders from
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub messages: MessageStore,
    pub is_loading: bool,
    pub error: Option<String>,
}

struct ActiveStream {
    id: u64,
    ai_message: Option<MessageId>,
}

/// Owns the session handle and applies every transition to `UiState`
pub struct ChatController {
    state: UiState,
    phase: Phase,
    session: Option<Arc<dyn ChatSession>>,
    active: Option<ActiveStream>,
    next_stream_id: u64,
    root_token: CancellationToken,
}

impl ChatController {
    /// Build from the outcome of session initialization. A failure leaves the
    /// controller without a session and with a persistent error.
    pub fn new(session: Result<Arc<dyn ChatSession>, ChatError>) -> Self {
        let mut controller = Self {
            state: UiState::default(),
            phase: Phase::Idle,
            session: None,
            active: None,
            next_stream_id: 0,
            root_token: CancellationToken::new(),
        };

        match session {
            Ok(session) => {
                info!(model = session.model(), "Controller ready");
                controller.session = Some(session);
            }
            Err(e) => {
                error!(error = %e, "Chat initialization failed");
                controller.state.error = Some(INIT_FAILURE_MESSAGE.to_string());
                controller.phase = Phase::Errored;
            }
        }

        controller
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn model(&self) -> Option<&str> {
        self.session.as_deref().map(|session| session.model())
    }

    /// Whether a send/stream cycle is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Sending | Phase::Streaming)
    }

    /// Accept user text. Returns a ticket for the consumer task, `None` for
    /// blank input, or the reason the submit was refused.
    pub fn submit(&mut self, text: &str) -> Result<Option<StreamTicket>, ChatError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let Some(session) = self.session.clone() else {
            warn!("Submit without a session");
            if self.state.error.is_none() {
                self.state.error = Some(ChatError::NoSession.user_message().to_string());
            }
            self.phase = Phase::Errored;
            return Err(ChatError::NoSession);
        };

        if self.is_busy() {
            debug!("Submit rejected while a response is streaming");
            return Err(ChatError::Busy);
        }

        self.state.messages.append(Message::user(text));
        self.state.is_loading = true;
        self.state.error = None;
        self.phase = Phase::Sending;

        self.next_stream_id += 1;
        let stream_id = self.next_stream_id;
        self.active = Some(ActiveStream {
            id: stream_id,
            ai_message: None,
        });

        debug!(stream_id, chars = text.chars().count(), "Submit accepted");

        Ok(Some(StreamTicket {
            stream_id,
            text: text.to_string(),
            session,
            cancel_token: self.root_token.child_token(),
        }))
    }

    /// Apply one update from the consumer. Returns false if it was stale.
    pub fn apply(&mut self, update: StreamUpdate) -> bool {
        let Some(active) = self.active.as_mut().filter(|active| active.id == update.stream_id)
        else {
            debug!(stream_id = update.stream_id, "Dropping stale stream update");
            return false;
        };

        match update.kind {
            StreamUpdateKind::Opened => {
                if active.ai_message.is_none() {
                    let placeholder = Message::ai_placeholder();
                    debug!(
                        stream_id = update.stream_id,
                        message_id = %placeholder.id,
                        "Reply opened"
                    );
                    active.ai_message = Some(placeholder.id);
                    self.state.messages.append(placeholder);
                }
                self.phase = Phase::Streaming;
            }
            StreamUpdateKind::Chunk { text } => {
                if let Some(id) = active.ai_message {
                    self.state.messages.update_text(id, text);
                }
            }
            StreamUpdateKind::Failed { reason } => {
                warn!(stream_id = update.stream_id, %reason, "Response failed");
                match active.ai_message {
                    Some(id) => {
                        self.state.messages.update_text(id, STREAM_FAILURE_MESSAGE);
                    }
                    None => {
                        let mut message = Message::ai_placeholder();
                        message.text = STREAM_FAILURE_MESSAGE.to_string();
                        self.state.messages.append(message);
                    }
                }
                self.state.error = Some(STREAM_FAILURE_MESSAGE.to_string());
                self.finish(Phase::Errored);
            }
            StreamUpdateKind::Completed => {
                self.finish(Phase::Idle);
            }
        }

        true
    }

    fn finish(&mut self, phase: Phase) {
        self.state.is_loading = false;
        self.phase = phase;
        self.active = None;
    }

    /// Cancel every in-flight stream; later updates are ignored
    pub fn shutdown(&mut self) {
        self.root_token.cancel();
        if self.active.take().is_some() {
            self.state.is_loading = false;
            self.phase = Phase::Idle;
        }
    }
}

impl Drop for ChatController {
    fn drop(&mut self) {
        self.root_token.cancel();
    }
}

/// The AI message a stream is writing into, if it is the last one
pub fn trailing_ai_message(state: &UiState) -> Option<&Message> {
    state
        .messages
        .last()
        .filter(|message| message.sender == Sender::Ai)
}
