//! The transaction engine: queue install/update/remove candidates,
//! resolve dependencies against a set of stores, prepare the resulting
//! plan (fetch + trust-classify), and commit it through an RPM
//! transaction set, recording the outcome in history and yumdb.

#![warn(clippy::all)]

mod commit;
mod error;
mod prepare;
mod projected;
mod queue;
mod resolve;
mod score;
mod transaction;

pub use commit::TransactionSummary;
pub use error::{Error, Result};
pub use prepare::{DownloadEngine, DownloadRequest};
pub use projected::ProjectedStore;
pub use transaction::{Transaction, TxState};
