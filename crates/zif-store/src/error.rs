//! Store error taxonomy.

use thiserror::Error;

/// Errors a [`crate::Store`] implementation can raise.
#[derive(Debug, Error)]
pub enum Error {
    /// Generic, otherwise-uncategorized failure.
    #[error("store operation failed: {0}")]
    Failed(String),

    /// The store's backing repository is unreachable.
    #[error("store is offline")]
    Offline,

    /// A lookup found nothing and the caller does not treat that as
    /// recoverable at this call site.
    #[error("not found: {0}")]
    NotFound(String),

    /// Fetching package data or an artifact failed.
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// A query that is legitimately allowed to return nothing did so.
    /// Not fatal; callers treat this as "zero matches" and recover.
    #[error("query returned no packages")]
    EmptyArray,

    /// This store does not implement the requested operation.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// A write was attempted without first acquiring the store's lock.
    #[error("store is not locked")]
    NotLocked,

    /// A query expected to match at most one package matched several.
    #[error("multiple packages matched: {0}")]
    MultipleMatches(String),

    /// A package-model invariant violation surfaced while scanning.
    #[error(transparent)]
    Core(#[from] zif_core::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
