//! TUI application state, rendering, and input handling.

use chat::{HistoryDirection, SessionUpdate, StreamingSession};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use tracing::debug;

use super::theme::Theme;

/// Spinner animation frames (Braille pattern).
const SPINNER: &[char] = &['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];

/// Key bindings shown by the full help view.
const BINDINGS: &[(&str, &str)] = &[
    ("ctrl+l", "clear screen"),
    ("pgup", "page up"),
    ("pgdown", "page down"),
    ("↑/↓", "history"),
    ("/?", "help"),
    ("ctrl+c", "cancel"),
    ("ctrl+d", "quit"),
    ("ctrl+z", "suspend"),
];

/// Full state for the TUI: the chat session plus editor and view state.
pub struct TuiApp {
    pub session: StreamingSession,
    /// Current text typed in the input box (not yet submitted).
    pub input: String,
    /// Cursor position within `input` (byte offset).
    pub cursor_pos: usize,
    /// Vertical scroll offset for the transcript panel.
    pub scroll: u16,
    pub spinner_tick: u8,
    pub show_help: bool,
    pub should_quit: bool,
    /// Set by ctrl+z; the event loop hands the terminal back to the shell.
    pub suspend_requested: bool,
    pub theme: Theme,
}

impl TuiApp {
    pub fn new(session: StreamingSession, theme: Theme) -> Self {
        Self {
            session,
            input: String::new(),
            cursor_pos: 0,
            scroll: u16::MAX,
            spinner_tick: 0,
            show_help: false,
            should_quit: false,
            suspend_requested: false,
            theme,
        }
    }

    /// Take the current input and reset it.
    pub fn take_input(&mut self) -> String {
        self.cursor_pos = 0;
        std::mem::take(&mut self.input)
    }

    fn set_input(&mut self, value: String) {
        self.cursor_pos = value.len();
        self.input = value;
    }

    /// Advances the spinner; only animates while a turn is in flight.
    pub fn tick(&mut self) {
        if self.session.is_busy() {
            self.spinner_tick = self.spinner_tick.wrapping_add(1);
        }
    }

    /// Reacts to progress reported by the session.
    pub fn apply_update(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::Opened => {}
            SessionUpdate::Delta(text) if text.is_empty() => {}
            SessionUpdate::Delta(_) | SessionUpdate::Finished(_) => self.scroll_to_bottom(),
        }
    }

    /// Handles a line submitted with Enter: slash commands or a new turn.
    pub fn submit(&mut self) {
        let value = self.take_input();
        match value.as_str() {
            "" => {}
            "/?" => self.show_help = !self.show_help,
            "/bye" => self.should_quit = true,
            cmd if cmd.starts_with("/set ") => {
                let history = self.session.conversation_mut().history_mut();
                match cmd.split_whitespace().nth(1) {
                    Some("history") => history.set_persist(true),
                    Some("nohistory") => history.set_persist(false),
                    other => debug!(option = ?other, "Unknown /set option"),
                }
            }
            _ => match self.session.submit(&value) {
                Ok(()) => self.scroll_to_bottom(),
                Err(e) => {
                    debug!(error = %e, "Submission rejected");
                    self.set_input(value);
                }
            },
        }
    }

    // ── Input handling ───────────────────────────────────────

    /// Handle a keyboard event.
    pub fn handle_key(&mut self, key: KeyEvent) {
        let idle = !self.session.is_busy();
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                if !self.session.cancel() {
                    self.take_input();
                }
            }
            (KeyModifiers::CONTROL, KeyCode::Char('d')) => {
                self.should_quit = true;
            }
            (KeyModifiers::CONTROL, KeyCode::Char('z')) => {
                self.suspend_requested = true;
            }
            (KeyModifiers::CONTROL, KeyCode::Char('l')) => {
                if let Err(e) = self.session.reset() {
                    debug!(error = %e, "Reset rejected");
                }
            }
            (_, KeyCode::Enter) if idle => self.submit(),
            (_, KeyCode::Up) => {
                let line = self.session.navigate_history(HistoryDirection::Older);
                if !line.is_empty() {
                    self.set_input(line);
                }
            }
            (_, KeyCode::Down) => {
                let line = self.session.navigate_history(HistoryDirection::Newer);
                self.set_input(line);
            }
            (_, KeyCode::PageUp) => {
                self.scroll = self.scroll.saturating_sub(10);
            }
            (_, KeyCode::PageDown) => {
                self.scroll = self.scroll.saturating_add(10);
            }
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(c)) if idle => {
                self.input.insert(self.cursor_pos, c);
                self.cursor_pos += c.len_utf8();
            }
            (_, KeyCode::Backspace) if idle => {
                if self.cursor_pos > 0 {
                    let prev = self.input[..self.cursor_pos]
                        .char_indices()
                        .last()
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    self.input.drain(prev..self.cursor_pos);
                    self.cursor_pos = prev;
                }
            }
            (_, KeyCode::Left) if idle => {
                if self.cursor_pos > 0 {
                    self.cursor_pos = self.input[..self.cursor_pos]
                        .char_indices()
                        .last()
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                }
            }
            (_, KeyCode::Right) if idle => {
                if self.cursor_pos < self.input.len() {
                    self.cursor_pos = self.input[self.cursor_pos..]
                        .char_indices()
                        .nth(1)
                        .map(|(i, _)| self.cursor_pos + i)
                        .unwrap_or(self.input.len());
                }
            }
            _ => {}
        }
    }

    // ── Rendering ────────────────────────────────────────────

    /// Render the entire TUI into the given frame.
    pub fn render(&mut self, frame: &mut Frame<'_>) {
        let area = frame.area();
        let help_height = if self.show_help {
            BINDINGS.len() as u16
        } else {
            1
        };

        // Layout: transcript(fill) | status(1) | input(3) | help
        let chunks = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(help_height),
        ])
        .split(area);

        self.render_transcript(frame, chunks[0]);
        self.render_status(frame, chunks[1]);
        self.render_input(frame, chunks[2]);
        self.render_help(frame, chunks[3]);
    }

    fn render_transcript(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let inner_width = area.width.saturating_sub(2) as usize;
        let inner_height = area.height.saturating_sub(2) as usize;
        self.session.resize(inner_width, inner_height);

        let text = Text::from(self.session.rendered().to_string());
        let visible = self.session.conversation_mut().height();
        let max_scroll = text.lines.len().saturating_sub(visible) as u16;
        self.scroll = self.scroll.min(max_scroll);

        let transcript = Paragraph::new(text)
            .style(Style::default().fg(self.theme.fg))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.border)),
            )
            .scroll((self.scroll, 0));

        frame.render_widget(transcript, area);
    }

    fn render_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut spans = Vec::new();
        if self.session.is_busy() {
            let spinner = SPINNER[(self.spinner_tick as usize) % SPINNER.len()];
            spans.push(Span::styled(
                format!(" {spinner} "),
                Style::default().fg(self.theme.spinner),
            ));
        }

        let rate = self.session.rate();
        if rate > 0.0 {
            spans.push(Span::styled(
                format!(" {rate:.1} tokens/s "),
                Style::default().fg(self.theme.rate),
            ));
        }

        if let Some(err) = self.session.error() {
            spans.push(Span::styled(
                format!(" Error: {err} "),
                Style::default()
                    .fg(self.theme.error)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)).right_aligned(), area);
    }

    fn render_input(&self, frame: &mut Frame<'_>, area: Rect) {
        let idle = !self.session.is_busy();
        let border_color = if idle {
            self.theme.border_active
        } else {
            self.theme.border
        };

        let (display_text, input_style) = if self.input.is_empty() && idle {
            ("Type here...", Style::default().fg(self.theme.fg_muted))
        } else {
            (self.input.as_str(), Style::default().fg(self.theme.fg))
        };

        let input = Paragraph::new(Span::styled(display_text, input_style)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(format!(" {} ", self.session.model())),
        );

        frame.render_widget(input, area);

        if idle {
            let cursor_col = self.input[..self.cursor_pos].chars().count() as u16;
            frame.set_cursor_position((area.x + 1 + cursor_col, area.y + 1));
        }
    }

    fn render_help(&self, frame: &mut Frame<'_>, area: Rect) {
        let key_style = Style::default().fg(self.theme.help_key);
        let desc_style = Style::default().fg(self.theme.help_desc);

        let lines: Vec<Line<'_>> = if self.show_help {
            BINDINGS
                .iter()
                .map(|(key, desc)| {
                    Line::from(vec![
                        Span::styled(format!(" {key:<8}"), key_style),
                        Span::styled(*desc, desc_style),
                    ])
                })
                .collect()
        } else {
            let cancel = if self.session.is_busy() {
                "  ctrl+c cancel"
            } else {
                ""
            };
            vec![Line::from(vec![
                Span::styled(" /? ", key_style),
                Span::styled("help", desc_style),
                Span::styled(cancel, desc_style),
                Span::styled("  ctrl+d ", key_style),
                Span::styled("quit", desc_style),
            ])]
        };

        frame.render_widget(Paragraph::new(Text::from(lines)), area);
    }

    /// Ensure scroll is at the bottom (for auto-scroll on new messages).
    pub fn scroll_to_bottom(&mut self) {
        // Clamped to the real maximum at render time.
        self.scroll = u16::MAX;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chat::{
        ChatBackend, ChatStream, ConversationStore, HistoryBuffer, RateMeter, RenderStyle,
        SessionState,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use proto::{ChatError, ChatRequest, StreamEvent};
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;

    struct EmptyBackend;

    struct EmptyStream;

    #[async_trait]
    impl ChatBackend for EmptyBackend {
        async fn open(&self, _req: ChatRequest) -> Result<Box<dyn ChatStream>, ChatError> {
            Ok(Box::new(EmptyStream))
        }
    }

    #[async_trait]
    impl ChatStream for EmptyStream {
        async fn next_event(&mut self) -> Result<Option<StreamEvent>, ChatError> {
            Ok(None)
        }
    }

    fn make_app() -> TuiApp {
        let conversation = ConversationStore::new(HistoryBuffer::new(10), RenderStyle::default());
        let session = StreamingSession::new(
            Arc::new(EmptyBackend),
            "llama3.2",
            conversation,
            RateMeter::default(),
        );
        TuiApp::new(session, Theme::default())
    }

    fn press(app: &mut TuiApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn ctrl(app: &mut TuiApp, c: char) {
        app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
    }

    fn type_str(app: &mut TuiApp, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn handle_key_inserts_chars() {
        let mut app = make_app();
        type_str(&mut app, "ab");
        assert_eq!(app.input, "ab");
        assert_eq!(app.cursor_pos, 2);
    }

    #[test]
    fn handle_key_backspace_deletes_multibyte_char() {
        let mut app = make_app();
        type_str(&mut app, "hé");
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.input, "h");
        assert_eq!(app.cursor_pos, 1);
    }

    #[test]
    fn enter_submits_and_blocks_typing_until_settled() {
        let mut app = make_app();
        type_str(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.input, "");
        assert_eq!(app.session.state(), SessionState::Sending);

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.input, "");
    }

    #[test]
    fn ctrl_c_cancels_busy_turn_then_clears_input() {
        let mut app = make_app();
        type_str(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        ctrl(&mut app, 'c');
        assert_eq!(app.session.state(), SessionState::Cancelled);

        type_str(&mut app, "draft");
        ctrl(&mut app, 'c');
        assert_eq!(app.input, "");
        assert!(!app.should_quit);
    }

    #[test]
    fn ctrl_l_is_ignored_while_busy() {
        let mut app = make_app();
        type_str(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        ctrl(&mut app, 'l');
        assert_eq!(app.session.conversation().exchanges().len(), 1);

        ctrl(&mut app, 'c');
        ctrl(&mut app, 'l');
        assert!(app.session.conversation().is_empty());
    }

    #[test]
    fn up_recalls_history_and_down_clears() {
        let mut app = make_app();
        type_str(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        ctrl(&mut app, 'c');

        press(&mut app, KeyCode::Up);
        assert_eq!(app.input, "hello");
        assert_eq!(app.cursor_pos, 5);

        // already at the oldest entry: input untouched
        press(&mut app, KeyCode::Up);
        assert_eq!(app.input, "hello");

        press(&mut app, KeyCode::Down);
        assert_eq!(app.input, "");
    }

    #[test]
    fn slash_commands_are_not_sent() {
        let mut app = make_app();
        type_str(&mut app, "/?");
        press(&mut app, KeyCode::Enter);
        assert!(app.show_help);

        type_str(&mut app, "/set nohistory");
        press(&mut app, KeyCode::Enter);
        assert!(!app.session.conversation().history().persist());

        type_str(&mut app, "/set history");
        press(&mut app, KeyCode::Enter);
        assert!(app.session.conversation().history().persist());

        type_str(&mut app, "/bye");
        press(&mut app, KeyCode::Enter);
        assert!(app.should_quit);
        assert!(app.session.conversation().is_empty());
    }

    #[test]
    fn control_chords_do_not_insert_text() {
        let mut app = make_app();
        ctrl(&mut app, 'a');
        app.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT));
        assert_eq!(app.input, "");

        app.handle_key(KeyEvent::new(KeyCode::Char('H'), KeyModifiers::SHIFT));
        press(&mut app, KeyCode::Char('i'));
        assert_eq!(app.input, "Hi");
    }

    #[test]
    fn ctrl_z_requests_suspend_and_is_listed_in_help() {
        let mut app = make_app();
        ctrl(&mut app, 'z');
        assert!(app.suspend_requested);
        assert!(app.input.is_empty());
        assert!(BINDINGS.iter().any(|(key, desc)| *key == "ctrl+z" && *desc == "suspend"));
    }

    #[test]
    fn transcript_scroll_is_clamped_to_visible_height() {
        let mut app = make_app();
        for i in 0..10 {
            app.session.conversation_mut().add(format!("q{i}"));
        }
        let mut terminal = Terminal::new(TestBackend::new(40, 12)).expect("terminal");

        // transcript panel: 12 - status(1) - input(3) - help(1) = 7 rows, 5 inside borders
        terminal.draw(|frame| app.render(frame)).expect("draw");
        assert_eq!(app.scroll, 5);

        press(&mut app, KeyCode::PageUp);
        terminal.draw(|frame| app.render(frame)).expect("draw");
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn spinner_only_advances_while_busy() {
        let mut app = make_app();
        app.tick();
        assert_eq!(app.spinner_tick, 0);

        type_str(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        app.tick();
        assert_eq!(app.spinner_tick, 1);
    }

    #[tokio::test]
    async fn settled_turn_reenables_input() {
        let mut app = make_app();
        type_str(&mut app, "hello");
        press(&mut app, KeyCode::Enter);
        while let Some(update) = app.session.step().await {
            app.apply_update(update);
        }
        assert_eq!(app.session.state(), SessionState::Completed);

        type_str(&mut app, "next");
        assert_eq!(app.input, "next");
    }
}
