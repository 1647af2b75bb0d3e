//! RPM commit-driver error taxonomy.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading RPM headers, verifying signatures, or
/// driving the transaction set.
#[derive(Debug, Error)]
pub enum Error {
    /// The RPM file's header could not be opened/parsed.
    #[error("failed to open RPM header at {path}: {reason}")]
    HeaderOpenFailed {
        /// Path to the offending file.
        path: PathBuf,
        /// Human-readable reason.
        reason: String,
    },

    /// The header's signature was present but malformed.
    #[error("corrupt signature in {path}")]
    SignatureCorrupt {
        /// Path to the offending file.
        path: PathBuf,
    },

    /// A public key could not be parsed or imported into the keyring.
    #[error("failed to import key: {0}")]
    KeyImportFailed(String),

    /// The transaction set reported a problem during ordering, a test
    /// run, or the real run.
    #[error("transaction set failed: {0}")]
    TransactionFailed(String),

    /// Underlying filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
