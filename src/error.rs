//! Error types for code model operations.
//!
//! Only outward-facing operations return these: reading files on request,
//! writing dumps, validating rename text. Failures inside an indexing batch or a
//! search are recovered locally (the file is skipped and the failure logged) so
//! that partial results still reach the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for code model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in code model operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file exceeds the configured indexer size limit.
    #[error("{path} is {size} bytes, above the {limit_mb} MB indexer limit")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        limit_mb: u32,
    },

    /// A symbol search pattern is not a valid regular expression.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Replacement text for a rename is not an identifier.
    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(String),

    /// The worker pool could not be started.
    #[error("could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A background thread could not be spawned.
    #[error("could not start {name} thread: {source}")]
    Thread {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an I/O error for a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error means the file simply is not there.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
