//! Turn controller: submits a request, consumes its stream, and settles the exchange.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use proto::{ChatError, ChatRequest, SessionError, StreamEvent};
use tracing::{debug, info, warn};

use crate::client::{ChatBackend, ChatStream};
use crate::conversation::ConversationStore;
use crate::metrics::RateMeter;

/// Observable state of the current turn.
///
/// The terminal states (`Completed`, `Cancelled`, `Failed`) behave like
/// `Idle`: a new turn may be submitted from any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl SessionState {
    pub fn is_busy(self) -> bool {
        matches!(self, SessionState::Sending | SessionState::Streaming)
    }
}

/// Result of one [`StreamingSession::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// The server accepted the request; events follow.
    Opened,
    /// One event was applied. Empty when the event carried no text.
    Delta(String),
    /// The turn reached a terminal state.
    Finished(SessionState),
}

/// Direction for history browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDirection {
    Older,
    Newer,
}

type PendingStream = BoxFuture<'static, Result<Box<dyn ChatStream>, ChatError>>;

enum Turn {
    None,
    Sending(PendingStream),
    Streaming(Box<dyn ChatStream>),
}

/// Drives one chat turn at a time against a [`ChatBackend`].
///
/// The session never spawns work of its own. The caller's event loop awaits
/// [`step`](Self::step) alongside its other sources; every await point is
/// cancel-safe, so dropping a pending `step` (for a key press or a timer
/// tick) loses nothing, and [`cancel`](Self::cancel) closes the transport.
pub struct StreamingSession {
    backend: Arc<dyn ChatBackend>,
    model: String,
    conversation: ConversationStore,
    meter: RateMeter,
    state: SessionState,
    turn: Turn,
    error: Option<String>,
}

impl StreamingSession {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        model: impl Into<String>,
        conversation: ConversationStore,
        meter: RateMeter,
    ) -> Self {
        Self {
            backend,
            model: model.into(),
            conversation,
            meter,
            state: SessionState::Idle,
            turn: Turn::None,
            error: None,
        }
    }

    /// Opens a new exchange for `text` and issues the request for it.
    pub fn submit(&mut self, text: &str) -> Result<(), SessionError> {
        if self.state.is_busy() {
            return Err(SessionError::Busy);
        }
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        self.conversation.add(text);
        self.meter.reset();
        self.error = None;

        let req = ChatRequest {
            model: self.model.clone(),
            messages: self.conversation.messages().collect(),
        };
        info!(model = %req.model, messages = %req.messages.len(), "Turn submitted");

        let backend = Arc::clone(&self.backend);
        self.turn = Turn::Sending(Box::pin(async move { backend.open(req).await }));
        self.state = SessionState::Sending;
        Ok(())
    }

    /// Waits for the next piece of progress on the current turn and applies it.
    ///
    /// Returns `None` when no turn is in flight.
    pub async fn step(&mut self) -> Option<SessionUpdate> {
        match &mut self.turn {
            Turn::None => None,
            Turn::Sending(pending) => {
                let opened = pending.await;
                Some(self.on_opened(opened))
            }
            Turn::Streaming(stream) => {
                let next = stream.next_event().await;
                Some(self.on_event(next))
            }
        }
    }

    /// Steps until the current turn settles and returns its final state.
    pub async fn drive(&mut self) -> SessionState {
        while self.step().await.is_some() {}
        self.state
    }

    /// Abandons the in-flight turn, if any, and marks its exchange cancelled.
    pub fn cancel(&mut self) -> bool {
        if !self.state.is_busy() {
            return false;
        }
        self.turn = Turn::None;
        self.conversation.cancel();
        self.state = SessionState::Cancelled;
        info!("Turn cancelled");
        true
    }

    /// Clears the conversation. Rejected while a turn is in flight.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.state.is_busy() {
            return Err(SessionError::Busy);
        }
        self.conversation.reset();
        self.state = SessionState::Idle;
        self.error = None;
        Ok(())
    }

    pub fn navigate_history(&mut self, direction: HistoryDirection) -> String {
        let history = self.conversation.history_mut();
        match direction {
            HistoryDirection::Older => history.previous_line(),
            HistoryDirection::Newer => history.next_line(),
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.conversation.set_width(width);
        self.conversation.set_height(height);
    }

    pub fn rendered(&mut self) -> &str {
        self.conversation.rendered()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    /// Message of the last failed turn.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Tokens per second observed during the current (or last) turn.
    pub fn rate(&self) -> f64 {
        self.meter.rate()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn conversation(&self) -> &ConversationStore {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut ConversationStore {
        &mut self.conversation
    }

    fn on_opened(&mut self, opened: Result<Box<dyn ChatStream>, ChatError>) -> SessionUpdate {
        match opened {
            Ok(stream) => {
                debug!("Stream opened");
                self.turn = Turn::Streaming(stream);
                self.state = SessionState::Streaming;
                SessionUpdate::Opened
            }
            Err(e) => self.fail(e),
        }
    }

    fn on_event(&mut self, next: Result<Option<StreamEvent>, ChatError>) -> SessionUpdate {
        match next {
            Ok(Some(event)) => {
                let content = event.message.content;
                if !content.is_empty() {
                    if let Err(e) = self.conversation.append_assistant_text(&content) {
                        warn!(error = %e, "Dropping stream fragment");
                    }
                    self.meter.observe(event.created_at);
                }
                SessionUpdate::Delta(content)
            }
            Ok(None) => {
                self.turn = Turn::None;
                self.conversation.complete();
                self.state = SessionState::Completed;
                info!(rate = %format!("{:.2}", self.meter.rate()), "Turn completed");
                SessionUpdate::Finished(SessionState::Completed)
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, e: ChatError) -> SessionUpdate {
        warn!(error = %e, "Turn failed");
        self.turn = Turn::None;
        self.error = Some(e.to_string());
        self.state = SessionState::Failed;
        SessionUpdate::Finished(SessionState::Failed)
    }
}
