//! Error types for the warehouse crate.

use thiserror::Error;

/// Errors raised while configuring a buffer or driving a worker.
#[derive(Debug, Error)]
pub enum Error {
    /// The capacity configuration cannot describe a usable buffer.
    #[error("invalid capacity configuration: {0}")]
    InvalidConfig(String),

    /// `start` was called on a worker whose loop is still active.
    #[error("worker `{0}` is already running")]
    AlreadyRunning(String),

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker `{name}`: {source}")]
    Spawn {
        /// Name of the worker thread.
        name: String,
        /// Underlying spawn failure.
        #[source]
        source: std::io::Error,
    },

    /// The worker thread panicked and its step could not be recovered.
    #[error("worker `{0}` panicked")]
    Panicked(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
