//! Error types shared across the server, the controller and the transport.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// A remote call could not be completed. Fatal to a controller session.
    Transport(String),
    /// Non-positive dimensions or turns, or a grid that does not match them.
    MalformedParams(String),
    /// A run was started while another one is still in flight.
    RunInProgress(String),
    /// Malformed request or response on the wire.
    Protocol(String),
    /// Snapshot or image read/write failure.
    Persistence(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::MalformedParams(msg) => write!(f, "malformed params: {msg}"),
            Self::RunInProgress(msg) => write!(f, "run in progress: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Persistence(msg) => write!(f, "persistence: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(format!("invalid json: {err}"))
    }
}

impl AppError {
    /// Stable snake-case kind, carried over the wire next to the message.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Transport(_) => "transport",
            Self::MalformedParams(_) => "malformed_params",
            Self::RunInProgress(_) => "run_in_progress",
            Self::Protocol(_) => "protocol",
            Self::Persistence(_) => "persistence",
            Self::Io(_) => "io",
        }
    }

    /// Rebuild an error reported by the remote side.
    ///
    /// Unknown kinds become `Protocol` errors.
    #[must_use]
    pub fn from_remote(kind: Option<&str>, message: String) -> Self {
        match kind {
            Some("config") => Self::Config(message),
            Some("transport") => Self::Transport(message),
            Some("malformed_params") => Self::MalformedParams(message),
            Some("run_in_progress") => Self::RunInProgress(message),
            Some("persistence") => Self::Persistence(message),
            Some("io") => Self::Io(message),
            _ => Self::Protocol(message),
        }
    }

    /// Message without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Config(msg)
            | Self::Transport(msg)
            | Self::MalformedParams(msg)
            | Self::RunInProgress(msg)
            | Self::Protocol(msg)
            | Self::Persistence(msg)
            | Self::Io(msg) => msg,
        }
    }
}
