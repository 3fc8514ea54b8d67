//! Chat backend abstraction and the HTTP implementation.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use proto::{ChatError, ChatRequest, StreamEvent};
use tracing::debug;

use crate::stream::{LineDecoder, decode_event, error_body_message};

/// Path of the streaming chat endpoint, relative to the base URL.
pub const CHAT_PATH: &str = "/api/chat";

/// Opens one streamed response per chat turn.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends `req` and returns the response stream once the server accepts it.
    async fn open(&self, req: ChatRequest) -> Result<Box<dyn ChatStream>, ChatError>;
}

/// Source of incremental response events. Dropping it closes the transport.
#[async_trait]
pub trait ChatStream: Send {
    /// Returns the next event, or `None` once the server has closed the stream.
    ///
    /// Must be cancel-safe: dropping the returned future before it resolves
    /// loses no data.
    async fn next_event(&mut self) -> Result<Option<StreamEvent>, ChatError>;
}

/// Client for a chat server speaking line-delimited JSON over HTTP.
pub struct HttpChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatClient {
    /// Creates a client targeting `base_url`, e.g. `http://127.0.0.1:11434`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}{CHAT_PATH}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatBackend for HttpChatClient {
    async fn open(&self, req: ChatRequest) -> Result<Box<dyn ChatStream>, ChatError> {
        let body = serde_json::to_vec(&req).map_err(|e| ChatError::Request(e.to_string()))?;
        let url = self.chat_url();
        debug!(
            url = %url,
            model = %req.model,
            messages = %req.messages.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    ChatError::Request(e.to_string())
                } else {
                    ChatError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        debug!(status = %status.as_u16(), "Chat response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body: error_body_message(status.as_u16(), status.canonical_reason(), &body),
            });
        }

        Ok(Box::new(HttpChatStream {
            bytes: response
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()))
                .boxed(),
            decoder: LineDecoder::default(),
            exhausted: false,
        }))
    }
}

struct HttpChatStream {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: LineDecoder,
    exhausted: bool,
}

#[async_trait]
impl ChatStream for HttpChatStream {
    async fn next_event(&mut self) -> Result<Option<StreamEvent>, ChatError> {
        loop {
            if let Some(line) = self.decoder.next_line() {
                return decode_event(&line).map(Some);
            }
            if self.exhausted {
                return self.decoder.finish().map(|line| decode_event(&line)).transpose();
            }

            match self.bytes.next().await {
                Some(Ok(chunk)) => self.decoder.feed(&chunk),
                Some(Err(e)) => return Err(ChatError::Transport(e.to_string())),
                None => self.exhausted = true,
            }
        }
    }
}
