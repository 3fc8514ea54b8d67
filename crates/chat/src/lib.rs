//! Conversation engine: input history, throughput metrics, exchange store,
//! streaming HTTP client and the turn controller.

pub mod client;
pub mod conversation;
pub mod history;
pub mod metrics;
pub mod render;
pub mod session;
pub mod stream;

/// Chat backend interfaces and the HTTP implementation.
pub use client::{ChatBackend, ChatStream, HttpChatClient};
/// Exchange store and exchange lifecycle.
pub use conversation::{ConversationStore, Exchange, ExchangeStatus};
/// Persistent input history.
pub use history::HistoryBuffer;
/// Token rate estimator.
pub use metrics::RateMeter;
/// Transcript rendering configuration.
pub use render::RenderStyle;
/// Turn controller.
pub use session::{HistoryDirection, SessionState, SessionUpdate, StreamingSession};
