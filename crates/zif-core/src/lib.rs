//! Core types shared across Zif: package and depend identity models, the
//! RPM version comparator, configuration, and the error taxonomy every
//! other crate builds its own error enum on top of.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod arch;
pub mod config;
pub mod depend;
pub mod error;
pub mod package;
pub mod reason;
pub mod version;

pub use arch::Arch;
pub use config::Config;
pub use depend::{Depend, DependFlag};
pub use error::{Error, ErrorCode, Result};
pub use package::{CompareFlags, CompareMode, Origin, Package, TrustKind};
pub use reason::Reason;
pub use version::{compare_evr, Evr};

pub use ahash::{AHashMap, AHashSet};
