//! Error types for private DNS validation
//!
//! Configuration errors are returned synchronously from the engine's public
//! operations. Probe failures never surface here as a returned value: they are
//! reported to the observer as a terminal `Validation::Fail`.

use thiserror::Error;

/// Result type alias for private DNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// POSIX `ENOENT`
const ENOENT: i32 = 2;
/// POSIX `EBUSY`
const EBUSY: i32 = 16;
/// POSIX `EINVAL`
const EINVAL: i32 = 22;
/// POSIX `EIO`
const EIO: i32 = 5;

/// Core error type for the private DNS validation engine
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input, e.g. an unparsable server address passed to `set`
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown network, unconfigured server or mismatched mark
    #[error("Not found: {0}")]
    NotFound(String),

    /// A validation is already running for the server
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Connectivity or handshake failure reported by a prober
    #[error("Probe failed: {0}")]
    Probe(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No async runtime available to run validation tasks
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a probe failure
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a runtime error
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Negative POSIX error code for callers that speak the C-style contract
    ///
    /// `set` reports `-EINVAL` for bad input and callers compare against zero
    /// on success, so this never returns 0.
    pub fn errno(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) | Self::Config(_) | Self::Json(_) => -EINVAL,
            Self::NotFound(_) => -ENOENT,
            Self::Conflict(_) => -EBUSY,
            Self::Probe(_) | Self::Runtime(_) | Self::Other(_) => -EIO,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
