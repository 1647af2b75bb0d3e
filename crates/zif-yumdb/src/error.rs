//! Yumdb error taxonomy.

use thiserror::Error;

/// Errors the yumdb store can raise.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested key does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The key name itself is invalid (empty, contains `/`, or is `.`/`..`).
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A value was read that is not valid UTF-8 where a string was expected.
    #[error("value for key `{0}` is not valid UTF-8")]
    InvalidValue(String),

    /// Underlying filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
