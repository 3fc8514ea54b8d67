//! Async event loop for the TUI: interleaves key presses, stream progress and spinner ticks.

use chat::StreamingSession;
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, warn};

use super::app::TuiApp;
use super::theme::Theme;

/// RAII guard that restores the terminal on drop (even on panic).
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
    }
}

/// Hands the terminal back to the shell via job control and restores it on resume.
#[cfg(unix)]
fn suspend(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(std::io::stdout(), LeaveAlternateScreen)?;
    debug!("Suspending");
    // SAFETY: plain FFI call with a constant signal, sent to our own process group.
    unsafe { libc::kill(0, libc::SIGTSTP) };
    enable_raw_mode()?;
    execute!(std::io::stdout(), EnterAlternateScreen)?;
    terminal.clear()?;
    Ok(())
}

#[cfg(not(unix))]
fn suspend(_terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> anyhow::Result<()> {
    Ok(())
}

/// Run the full-screen TUI until the user quits.
pub async fn run_tui(session: StreamingSession) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _guard = TerminalGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    debug!(model = %session.model(), "TUI started");
    let mut app = TuiApp::new(session, Theme::default());

    let mut crossterm_stream = EventStream::new();

    let mut spinner_interval = tokio::time::interval(std::time::Duration::from_millis(100));
    spinner_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        terminal.draw(|frame| app.render(frame))?;

        // Every branch is cancel-safe, so a key press may interrupt a pending step.
        tokio::select! {
            maybe_event = crossterm_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        app.handle_key(key);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "Terminal event error");
                    }
                    None => break,
                }
            }

            Some(update) = app.session.step(), if app.session.is_busy() => {
                app.apply_update(update);
            }

            _ = spinner_interval.tick(), if app.session.is_busy() => {
                app.tick();
            }
        }

        if app.should_quit {
            break;
        }
        if std::mem::take(&mut app.suspend_requested) {
            suspend(&mut terminal)?;
        }
    }

    // Quitting mid-turn closes the connection and marks the exchange cancelled.
    app.session.cancel();
    debug!("TUI stopped");
    Ok(())
}
