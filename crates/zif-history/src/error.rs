//! History store error taxonomy.

use thiserror::Error;
use std::path::PathBuf;

/// Errors the history store can raise.
#[derive(Debug, Error)]
pub enum Error {
    /// The database file could not be opened.
    #[error("failed to open history database at {path}: {source}")]
    FailedToOpen {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },

    /// A query or write against an open database failed.
    #[error("history operation failed: {0}")]
    Failed(#[from] rusqlite::Error),

    /// A reason string read back from a row did not parse.
    #[error(transparent)]
    Core(#[from] zif_core::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
