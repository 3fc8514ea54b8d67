use thiserror::Error;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading/validation error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Chat request or response stream error.
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    /// Session sequencing error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Message rendering error.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was not provided.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// A field has an invalid value and reason.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Filesystem read error.
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    Toml(String),
}

/// Errors that end a single chat turn.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The request could not be built or serialized.
    #[error("Invalid request: {0}")]
    Request(String),

    /// Network/connection-level failure.
    #[error("Connection error: {0}")]
    Transport(String),

    /// Server answered with a non-success status.
    #[error("{body}")]
    Status { status: u16, body: String },

    /// Server reported an error inside the response stream.
    #[error("{0}")]
    Remote(String),

    /// A stream line was not a valid event.
    #[error("Invalid stream event: {0}")]
    Decode(String),
}

/// Session sequencing errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A turn is already being sent or streamed.
    #[error("A response is still in progress")]
    Busy,

    /// Submitted text was empty.
    #[error("Nothing to send")]
    EmptyInput,

    /// Assistant text arrived with no open exchange to receive it.
    #[error("No open exchange")]
    NoOpenExchange,
}

/// Rendering errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The wrap width leaves no room for content.
    #[error("Wrap width too small: {0}")]
    WidthTooSmall(usize),
}
