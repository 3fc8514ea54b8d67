//! TUI colors built on ratatui's Tailwind CSS palette.

use ratatui::style::Color;
use ratatui::style::palette::tailwind;

/// Visual tokens handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    /// Primary foreground/text color.
    pub fg: Color,
    /// Muted foreground for placeholders and hints.
    pub fg_muted: Color,
    /// Border of inactive panels.
    pub border: Color,
    /// Border of the focused input box.
    pub border_active: Color,
    pub error: Color,
    pub spinner: Color,
    /// Throughput readout in the status line.
    pub rate: Color,
    pub help_key: Color,
    pub help_desc: Color,
}

impl Theme {
    /// The default dark theme using Tailwind palette.
    pub const fn default_dark() -> Self {
        Self {
            fg: tailwind::SLATE.c100,
            fg_muted: tailwind::SLATE.c500,
            border: tailwind::SLATE.c700,
            border_active: tailwind::EMERALD.c500,
            error: tailwind::RED.c500,
            spinner: tailwind::AMBER.c400,
            rate: tailwind::SKY.c400,
            help_key: tailwind::SLATE.c100,
            help_desc: tailwind::EMERALD.c600,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_dark()
    }
}
