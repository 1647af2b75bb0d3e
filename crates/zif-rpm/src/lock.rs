//! The rpmdb write-lock contract: a real binding
//! takes an flock-style exclusive lock on the rpmdb directory; Zif's
//! commit phase only depends on this trait.

use crate::error::Result;

/// Acquires and releases the rpmdb write lock.
pub trait RpmDbLock: std::fmt::Debug + Send + Sync {
    /// Attempt to acquire the lock without blocking.
    ///
    /// `Ok(false)` means another process currently holds it and the
    /// caller should retry after a delay; any other failure (most
    /// notably a permission error) is returned as `Err` and should be
    /// treated as fatal, not retried.
    fn try_acquire(&self) -> Result<bool>;

    /// Release a previously acquired lock. A no-op if not held.
    fn release(&self);
}
