//! CLI entrypoint: argument parsing, logging setup and mode dispatch.

mod config;
#[cfg(test)]
mod test_support;
mod tui;

use std::io::Write;
use std::sync::Arc;

use chat::{
    ConversationStore, HistoryBuffer, HttpChatClient, RateMeter, RenderStyle, SessionState,
    SessionUpdate, StreamingSession,
};
use chrono::TimeDelta;
use clap::Parser;
use config::Config;

#[cfg(not(test))]
use tracing::{error, info, warn};
#[cfg(not(test))]
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Top-level command-line arguments.
#[derive(Parser)]
#[command(name = "termchat")]
#[command(about = "Terminal chat client for a streaming chat server", version = "0.1.0")]
struct Cli {
    /// Model to chat with (overrides config and TERMCHAT_MODEL)
    #[arg(value_name = "MODEL")]
    model: Option<String>,

    /// Chat server address
    #[arg(long)]
    base_url: Option<String>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug logging to ~/.termchat/logs/debug.log
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Send a single message, print the streamed reply and exit
    #[arg(short = 'e', long)]
    exec: Option<String>,
}

#[cfg(not(test))]
#[tokio::main]
/// Program entrypoint.
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let is_tui = cli.exec.is_none();

    // Console output is sunk in TUI mode so it cannot corrupt the display.
    // --debug adds a daily-rotated file under ~/.termchat/logs.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // WorkerGuard must outlive main() so buffered file writes are flushed on exit.
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>;

    let debug_writer = if cli.debug {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let log_dir = std::path::PathBuf::from(home)
            .join(".termchat")
            .join("logs");
        std::fs::create_dir_all(&log_dir).ok();
        let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        _file_guard = Some(guard);
        Some(writer)
    } else {
        _file_guard = None;
        None
    };

    let file_filter = || EnvFilter::new("debug,hyper_util=info,reqwest=info");

    match (is_tui, debug_writer) {
        (true, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::sink)
                .with_target(false)
                .with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter());
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        (true, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::sink)
                .with_target(false)
                .init();
        }
        (false, Some(writer)) => {
            let console = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(console_filter);
            let file = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter());
            tracing_subscriber::registry()
                .with(console)
                .with(file)
                .init();
        }
        (false, None) => {
            fmt()
                .with_env_filter(console_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
    }

    if cli.debug {
        info!(
            mode = if is_tui { "tui" } else { "exec" },
            pid = std::process::id(),
            "=== termchat session start ==="
        );
    }

    let mut config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Failed to load config: {e}. Using defaults.");
        Config::default()
    });
    config.apply_overrides(cli.base_url, cli.model);
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        eprintln!("Error: {e}");
        eprintln!("Usage: termchat [--base-url URL] MODEL");
        std::process::exit(2);
    }

    let session = build_session(&config);
    match cli.exec {
        Some(prompt) => cmd_exec(session, prompt).await,
        None => tui::run_tui(session).await,
    }
}

/// Wires the history file, rate meter and HTTP client into a session.
fn build_session(config: &Config) -> StreamingSession {
    let history = HistoryBuffer::load(
        config.history.resolved_path(),
        config.history.max_entries,
        config.history.persist,
    );
    let conversation = ConversationStore::new(history, RenderStyle::default());
    let meter = RateMeter::new(TimeDelta::milliseconds(config.metrics.round_ms));
    let backend = Arc::new(HttpChatClient::new(config.server.base_url.clone()));
    StreamingSession::new(backend, config.server.model.clone(), conversation, meter)
}

/// Runs one turn, copying reply deltas to `out` as they arrive.
async fn stream_reply(
    session: &mut StreamingSession,
    prompt: &str,
    out: &mut impl Write,
) -> anyhow::Result<SessionState> {
    session.submit(prompt)?;
    while let Some(update) = session.step().await {
        if let SessionUpdate::Delta(text) = update {
            write!(out, "{text}")?;
            out.flush()?;
        }
    }
    writeln!(out)?;
    Ok(session.state())
}

#[cfg(not(test))]
async fn cmd_exec(mut session: StreamingSession, prompt: String) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout();
    let state = stream_reply(&mut session, &prompt, &mut stdout).await?;
    if state == SessionState::Failed {
        eprintln!("Error: {}", session.error().unwrap_or("request failed"));
        std::process::exit(1);
    }
    info!(rate = %format!("{:.1}", session.rate()), "Exec finished");
    Ok(())
}
