use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures of the real-time channel itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    #[error("no transport available: {0}")]
    NoTransport(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("a connect attempt is already in flight or the session is connected")]
    AttemptInFlight,

    #[error("channel closed")]
    Closed,

    #[error("encode error: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for ChannelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("publisher already running")]
    AlreadyRunning,

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

#[derive(Debug, thiserror::Error)]
pub enum WaypointError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Publisher(#[from] PublisherError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
