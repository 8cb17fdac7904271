use thiserror::Error;

use crate::domain::error::{LookupError, Rejection};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        /// Full file contents, kept so the CLI can point at the offending span.
        contents: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Feed-level failures.
///
/// Transport errors are retried by the channel that hit them; fatal errors end
/// that channel only.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("fatal feed error: {0}")]
    Fatal(String),

    #[error("not connected")]
    NotConnected,

    #[error("every feed channel terminated: {0}")]
    AllChannelsFailed(String),
}

/// Snapshot persistence failures. Never fatal to the live pipeline.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("snapshot task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no Gamma event with slug {0:?}")]
    UnknownEvent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}

impl Error {
    /// Whether a feed channel must stop retrying after this error.
    ///
    /// Handshake rejections in the 4xx range (other than 429) and malformed
    /// endpoints are treated as unrecoverable; everything else is transport.
    pub fn is_fatal(&self) -> bool {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match self {
            Error::Feed(FeedError::Fatal(_)) | Error::Url(_) => true,
            Error::WebSocket(err) => match err.as_ref() {
                WsError::Http(response) => {
                    let status = response.status();
                    status.is_client_error() && status.as_u16() != 429
                }
                WsError::Url(_) => true,
                _ => false,
            },
            _ => false,
        }
    }
}
