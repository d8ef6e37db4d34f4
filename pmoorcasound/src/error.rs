//! Error types for the Orcasound player core

/// Result type alias for Orcasound operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Orcasound player core
///
/// Pointer fetch failures are produced by [`crate::pointer::PointerSource`]
/// implementations but never escape the poller: a failed tick is logged and
/// skipped, the next tick retries implicitly.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing failed
    #[error("YAML parsing failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The pointer resource answered with something other than 200
    #[error("Unexpected status {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The pointer resource answered 200 with a blank body
    #[error("Empty pointer body for {0}")]
    EmptyPointer(String),

    /// Configuration values are not usable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The player worker is gone
    #[error("Player worker is no longer running")]
    WorkerClosed,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
