//! Shared protocol types for the chat client.
//!
//! This crate defines the serializable request/stream structures exchanged
//! with the chat endpoint and the strongly-typed error enums shared across
//! the workspace.

pub mod error;
pub mod message;

/// Re-export of all protocol error types.
pub use error::*;
/// Re-export of chat wire types.
pub use message::{ChatMessage, ChatRequest, ErrorPayload, Role, StreamEvent};
