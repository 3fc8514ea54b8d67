//! Full-screen ratatui chat interface.

pub mod app;
pub mod event;
pub mod theme;

pub use event::run_tui;
