//! Line-delimited JSON decoding for streamed chat responses.

use proto::{ChatError, ErrorPayload, StreamEvent};

/// Splits arbitrarily chunked bytes into complete lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pops the next complete line without its terminator, skipping blank lines.
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let pos = self.buf.iter().position(|b| *b == b'\n')?;
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }

    /// Takes whatever is left once the source is exhausted.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        let text = String::from_utf8_lossy(&rest);
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// Decodes one stream line into an event.
///
/// An `{"error": ...}` line becomes [`ChatError::Remote`]; anything else that
/// is not a valid event becomes [`ChatError::Decode`].
pub fn decode_event(line: &str) -> Result<StreamEvent, ChatError> {
    serde_json::from_str::<StreamEvent>(line).map_err(|e| {
        match serde_json::from_str::<ErrorPayload>(line) {
            Ok(payload) => ChatError::Remote(payload.error),
            Err(_) => ChatError::Decode(e.to_string()),
        }
    })
}

/// Turns a non-success response body into the message shown to the user.
pub fn error_body_message(status: u16, reason: Option<&str>, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        return payload.error;
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    match reason {
        Some(reason) => format!("{status} {reason}"),
        None => status.to_string(),
    }
}
