//! Error types for the offload dispatcher

use thiserror::Error;

/// Result type alias for fallible worker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while driving a background worker.
///
/// None of these reach a `dispatch` caller: the dispatchers log them and fall
/// back to computing inline. They surface only from the fallible helpers
/// (configuration parsing, the worker-side `serve` loop, process round trips).
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to start a background execution unit
    #[error("Worker spawn failed: {0}")]
    SpawnError(String),

    /// Reading from or writing to a worker failed
    #[error("Worker I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A worker message could not be encoded, decoded or matched
    #[error("Worker protocol error: {0}")]
    ProtocolError(String),

    /// The worker exited before replying
    #[error("Worker closed before replying to request {0}")]
    WorkerClosed(u64),

    /// The reply channel was dropped without a value
    #[error("Reply canceled: {0}")]
    Canceled(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ProtocolError(err.to_string())
    }
}
