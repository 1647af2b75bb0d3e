//! RPM consumption interfaces: header reading, keyring management,
//! signature/trust classification, and the transaction-set contract
//! that drives commit.

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod keyring;
pub mod lock;
pub mod signature;
pub mod transaction_set;

pub use backend::HeaderReader;
pub use error::{Error, Result};
pub use keyring::Keyring;
pub use lock::RpmDbLock;
pub use signature::{classify, HeaderSignature, LookupOutcome, SignatureAlgorithm};
pub use transaction_set::{FilterFlags, ProgressEvent, TransactionProblem, TransactionSet, TrustPolicy};
