//! Ordered request/response exchanges and their rendered projection.

use proto::{ChatMessage, Role, SessionError};

use crate::history::HistoryBuffer;
use crate::render::{RenderStyle, render_message};

/// Lifecycle of one exchange. Only `Open` accepts assistant text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStatus {
    Open,
    Complete,
    Cancelled,
}

/// One user submission and the (possibly partial) reply it produced.
#[derive(Debug, Clone)]
pub struct Exchange {
    user_text: String,
    assistant_text: String,
    status: ExchangeStatus,
}

impl Exchange {
    fn new(user_text: String) -> Self {
        Self {
            user_text,
            assistant_text: String::new(),
            status: ExchangeStatus::Open,
        }
    }

    pub fn user_text(&self) -> &str {
        &self.user_text
    }

    pub fn assistant_text(&self) -> &str {
        &self.assistant_text
    }

    pub fn status(&self) -> ExchangeStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == ExchangeStatus::Open
    }

    pub fn is_complete(&self) -> bool {
        self.status == ExchangeStatus::Complete
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == ExchangeStatus::Cancelled
    }
}

/// Owns the conversation and the input history, and caches the rendered transcript.
#[derive(Debug)]
pub struct ConversationStore {
    exchanges: Vec<Exchange>,
    history: HistoryBuffer,
    style: RenderStyle,
    width: usize,
    height: usize,
    rendered: Option<String>,
}

impl ConversationStore {
    pub fn new(history: HistoryBuffer, style: RenderStyle) -> Self {
        Self {
            exchanges: Vec::new(),
            history,
            style,
            width: 0,
            height: 0,
            rendered: None,
        }
    }

    /// Opens a new exchange for `user_text` and records it in the input history.
    pub fn add(&mut self, user_text: impl Into<String>) {
        let user_text = user_text.into();
        self.history.push(user_text.clone());
        self.exchanges.push(Exchange::new(user_text));
        self.invalidate();
    }

    /// Appends a fragment to the open exchange's reply.
    pub fn append_assistant_text(&mut self, delta: &str) -> Result<(), SessionError> {
        let exchange = self
            .exchanges
            .last_mut()
            .filter(|e| e.is_open())
            .ok_or(SessionError::NoOpenExchange)?;
        exchange.assistant_text.push_str(delta);
        self.invalidate();
        Ok(())
    }

    /// Marks the last exchange complete if it is still open.
    pub fn complete(&mut self) {
        self.close_last(ExchangeStatus::Complete);
    }

    /// Marks the last exchange cancelled if it is still open. A completed
    /// exchange stays complete.
    pub fn cancel(&mut self) {
        self.close_last(ExchangeStatus::Cancelled);
    }

    /// Drops every exchange. The input history is kept.
    pub fn reset(&mut self) {
        self.exchanges.clear();
        self.invalidate();
    }

    /// Role-tagged messages for the next request, skipping cancelled exchanges
    /// and empty replies.
    pub fn messages(&self) -> impl Iterator<Item = ChatMessage> + '_ {
        self.exchanges
            .iter()
            .filter(|e| !e.is_cancelled())
            .flat_map(|e| {
                let reply = (!e.assistant_text.is_empty())
                    .then(|| ChatMessage::assistant(e.assistant_text.clone()));
                std::iter::once(ChatMessage::user(e.user_text.clone())).chain(reply)
            })
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn last(&self) -> Option<&Exchange> {
        self.exchanges.last()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryBuffer {
        &mut self.history
    }

    pub fn set_width(&mut self, width: usize) {
        if self.width != width {
            self.width = width;
            self.invalidate();
        }
    }

    pub fn set_height(&mut self, height: usize) {
        self.height = height;
    }

    /// Rows the transcript occupies, capped at the viewport height.
    pub fn height(&mut self) -> usize {
        let lines = self.rendered().lines().count();
        lines.min(self.height)
    }

    /// The transcript wrapped to the current width, rebuilt only after a change.
    pub fn rendered(&mut self) -> &str {
        if self.rendered.is_none() {
            self.rendered = Some(self.build());
        }
        self.rendered.as_deref().unwrap_or_default()
    }

    fn build(&self) -> String {
        let mut out = String::new();
        for exchange in &self.exchanges {
            out.push_str(&render_message(
                &self.style,
                Role::User,
                &exchange.user_text,
                self.width,
            ));
            if !exchange.assistant_text.is_empty() {
                out.push_str(&render_message(
                    &self.style,
                    Role::Assistant,
                    &exchange.assistant_text,
                    self.width,
                ));
            }
        }
        out
    }

    fn close_last(&mut self, status: ExchangeStatus) {
        if let Some(exchange) = self.exchanges.last_mut() {
            if exchange.is_open() {
                exchange.status = status;
                self.invalidate();
            }
        }
    }

    fn invalidate(&mut self) {
        self.rendered = None;
    }
}
