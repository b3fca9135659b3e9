//! Error types for the file log writer

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while writing, rotating or sweeping log files
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration cannot describe a usable writer
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The log directory could not be created
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// A file operation failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File the operation targeted
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Queue or consumer failure
    #[error(transparent)]
    Warehouse(#[from] proven_warehouse::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
