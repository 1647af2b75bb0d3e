//! Transaction error taxonomy.

use thiserror::Error;

/// Errors a transaction's `resolve`/`prepare`/`commit` calls can raise.
#[derive(Debug, Error)]
pub enum Error {
    /// A resolution, prepare, or commit step failed for a reason that
    /// does not fit a more specific variant.
    #[error("transaction failed: {0}")]
    Failed(String),

    /// Resolution determined the requested change has no net effect
    /// (e.g. an update whose candidate is not newer than what's installed).
    #[error("nothing to do: {0}")]
    NothingToDo(String),

    /// The requested operation is not implemented for this configuration.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Two queued items are irreconcilably in conflict.
    #[error("conflicting: {0}")]
    Conflicting(String),

    /// A call was made out of state order.
    #[error("invalid transaction state: expected {expected}, was {actual}")]
    InvalidState {
        /// State the call required.
        expected: &'static str,
        /// State the transaction was actually in.
        actual: &'static str,
    },

    /// A lower-layer store error surfaced uncaught.
    #[error(transparent)]
    Store(#[from] zif_store::Error),

    /// A lower-layer package-model error surfaced uncaught.
    #[error(transparent)]
    Core(#[from] zif_core::Error),

    /// A lower-layer RPM commit-driver error surfaced uncaught.
    #[error(transparent)]
    Rpm(#[from] zif_rpm::Error),

    /// A lower-layer history-store error surfaced uncaught.
    #[error(transparent)]
    History(#[from] zif_history::Error),

    /// A lower-layer yumdb error surfaced uncaught.
    #[error(transparent)]
    Yumdb(#[from] zif_yumdb::Error),

    /// The progress/state tree raised cancellation or an overflow.
    #[error(transparent)]
    Progress(#[from] zif_progress::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
