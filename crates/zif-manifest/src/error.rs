//! Manifest parse/check error taxonomy.

use thiserror::Error;

/// Errors raised while parsing or checking a manifest.
#[derive(Debug, Error)]
pub enum Error {
    /// A line failed to parse into a directive.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A resource line (`requires`/`provides`/...) appeared before any
    /// `package` directive to attach it to.
    #[error("resource line with no preceding package directive")]
    DanglingResource,

    /// A depend description did not parse.
    #[error("invalid depend description: {0}")]
    BadDepend(String),

    /// `install`/`remove`/`update`/`downgrade` named a package not present
    /// in the store it should come from.
    #[error("package '{name}' not found in store '{store}'")]
    PackageNotFound { name: String, store: String },

    /// After `run`, the local store's contents didn't match the
    /// `expect-state`/`expect-absent` directives that followed.
    #[error("post-run state mismatch: {0}")]
    StateMismatch(String),

    /// A lower-layer store error surfaced uncaught.
    #[error(transparent)]
    Store(#[from] zif_store::Error),

    /// A lower-layer package-model error surfaced uncaught.
    #[error(transparent)]
    Core(#[from] zif_core::Error),

    /// A lower-layer transaction-engine error surfaced uncaught.
    #[error(transparent)]
    Transaction(#[from] zif_transaction::Error),

    /// A lower-layer progress/state error surfaced uncaught.
    #[error(transparent)]
    Progress(#[from] zif_progress::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
