//! Error taxonomy for Zif.
//!
//! Each error carries a unique code (e.g. `E0101`) so it can be searched
//! for and referenced from documentation, plus a human message and
//! optional context. This is the shape every other Zif crate's own error
//! enum embeds or converts from.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes, grouped by domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Package errors (E01xx)
    /// Package lookup failed.
    E0101,
    /// Package attribute written twice with different values.
    E0102,
    /// Package does not support the requested operation.
    E0103,

    // Depend errors (E02xx)
    /// Depend string could not be parsed.
    E0201,
    /// Architecture incompatibility.
    E0202,

    // Store errors (E03xx)
    /// Store operation failed.
    E0301,
    /// Store is offline.
    E0302,
    /// Store query found nothing.
    E0303,
    /// Store does not support the operation.
    E0304,
    /// Store is not locked when a locked operation was attempted.
    E0305,
    /// Store query matched more than one package unexpectedly.
    E0306,

    // Config errors (E04xx)
    /// Configuration file could not be parsed.
    E0401,
    /// A required configuration key is missing.
    E0402,

    // IO errors (E05xx)
    /// Underlying I/O operation failed.
    E0501,
}

impl ErrorCode {
    /// Render as the conventional `E####` string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0102 => "E0102",
            Self::E0103 => "E0103",
            Self::E0201 => "E0201",
            Self::E0202 => "E0202",
            Self::E0301 => "E0301",
            Self::E0302 => "E0302",
            Self::E0303 => "E0303",
            Self::E0304 => "E0304",
            Self::E0305 => "E0305",
            Self::E0306 => "E0306",
            Self::E0401 => "E0401",
            Self::E0402 => "E0402",
            Self::E0501 => "E0501",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A Zif core error: package/depend/store/config/IO failures that do not
/// belong to the transaction, history, yumdb, or RPM domains (those crates
/// define their own `thiserror` enums).
#[derive(Debug, Error)]
pub enum Error {
    /// A package attribute was written twice with conflicting values.
    #[error("[{code}] attribute `{attribute}` already set on {package} with a different value")]
    DirtyAttribute {
        /// Error code.
        code: ErrorCode,
        /// Attribute name.
        attribute: &'static str,
        /// Package identity string.
        package: String,
    },

    /// A depend string failed to parse.
    #[error("[{code}] invalid depend string: {raw}")]
    InvalidDepend {
        /// Error code.
        code: ErrorCode,
        /// Raw input that failed to parse.
        raw: String,
    },

    /// Config file could not be parsed.
    #[error("[{code}] failed to parse config at {path}: {source}")]
    ConfigParse {
        /// Error code.
        code: ErrorCode,
        /// Path to the offending file.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A required configuration key was missing and had no default.
    #[error("[{code}] missing configuration key: {key}")]
    MissingConfigKey {
        /// Error code.
        code: ErrorCode,
        /// The missing key.
        key: &'static str,
    },

    /// Generic I/O failure with context about what was being done.
    #[error("[{code}] {context}: {source}")]
    Io {
        /// Error code.
        code: ErrorCode,
        /// What was being attempted.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The requested package/attribute has no support for this operation
    /// (e.g. querying file lists on a meta package).
    #[error("[{code}] not supported: {what}")]
    NotSupported {
        /// Error code.
        code: ErrorCode,
        /// Description of the unsupported operation.
        what: String,
    },
}

impl Error {
    /// The error code for this variant.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DirtyAttribute { code, .. }
            | Self::InvalidDepend { code, .. }
            | Self::ConfigParse { code, .. }
            | Self::MissingConfigKey { code, .. }
            | Self::Io { code, .. }
            | Self::NotSupported { code, .. } => *code,
        }
    }
}

/// Convenience alias for `zif-core` results.
pub type Result<T> = std::result::Result<T, Error>;
