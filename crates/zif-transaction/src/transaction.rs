//! The `Transaction` state machine: install/update/remove queues, the
//! stores resolution draws from, and the audit fields captured for
//! history rows.

use crate::error::{Error, Result};
use crate::queue::Queue;
use std::sync::Arc;
use zif_core::{Arch, Config, Package, Reason};
use zif_store::Store;

/// Lifecycle state enforcing `resolve` precedes `prepare` precedes
/// `commit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Freshly constructed or still accepting `add_*` calls.
    Clean,
    /// `resolve` has succeeded; queues are final pending `prepare`.
    Resolved,
    /// `prepare` has succeeded; install candidates are cached and
    /// trust-stamped.
    Prepared,
    /// `commit` has succeeded; the plan has been applied.
    Committed,
}

impl TxState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Resolved => "resolved",
            Self::Prepared => "prepared",
            Self::Committed => "committed",
        }
    }
}

/// A package install/update/remove transaction.
pub struct Transaction {
    pub(crate) state: TxState,
    pub(crate) install: Queue,
    pub(crate) update: Queue,
    pub(crate) remove: Queue,
    pub(crate) store_local: Arc<dyn Store>,
    pub(crate) stores_remote: Vec<Arc<dyn Store>>,
    pub(crate) config: Config,
    pub(crate) native_arch: Arch,
    pub(crate) euid: u32,
    pub(crate) cmdline: String,
    pub(crate) resolve_count: u64,
    pub(crate) unresolved_dependencies: bool,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("state", &self.state.as_str())
            .field("install_len", &self.install.len())
            .field("update_len", &self.update.len())
            .field("remove_len", &self.remove.len())
            .field("resolve_count", &self.resolve_count)
            .finish_non_exhaustive()
    }
}

impl Transaction {
    /// Start a new, clean transaction rooted at `store_local` with the
    /// given remote stores and config. `euid`/`cmdline` are captured for
    /// the history row this transaction eventually writes.
    #[must_use]
    pub fn new(
        store_local: Arc<dyn Store>,
        stores_remote: Vec<Arc<dyn Store>>,
        config: Config,
        native_arch: Arch,
        euid: u32,
        cmdline: impl Into<String>,
    ) -> Self {
        Self {
            state: TxState::Clean,
            install: Queue::new(),
            update: Queue::new(),
            remove: Queue::new(),
            store_local,
            stores_remote,
            config,
            native_arch,
            euid,
            cmdline: cmdline.into(),
            resolve_count: 0,
            unresolved_dependencies: false,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TxState {
        self.state
    }

    /// Queue `package` for install with `reason`. Idempotent.
    pub fn add_install(&mut self, package: Package, reason: Reason) -> Result<()> {
        self.require_state(TxState::Clean)?;
        self.install.push(package, reason);
        Ok(())
    }

    /// Queue an installed `package` for update consideration with
    /// `reason` (typically `Reason::UpdateUserAction` or
    /// `Reason::UpdateSystem`).
    pub fn add_update(&mut self, package: Package, reason: Reason) -> Result<()> {
        self.require_state(TxState::Clean)?;
        self.update.push(package, reason);
        Ok(())
    }

    /// Queue `package` for removal with `reason`.
    pub fn add_remove(&mut self, package: Package, reason: Reason) -> Result<()> {
        self.require_state(TxState::Clean)?;
        self.remove.push(package, reason);
        Ok(())
    }

    /// The packages that will be installed once committed (live items
    /// from the install queue only; update resolution expands into this
    /// and `remove_set`).
    #[must_use]
    pub fn install_set(&self) -> Vec<Package> {
        self.install.live_packages()
    }

    /// The packages that will be removed once committed.
    #[must_use]
    pub fn remove_set(&self) -> Vec<Package> {
        self.remove.live_packages()
    }

    /// The step count a caller should size a [`zif_progress::State`] to
    /// before calling [`Transaction::resolve`]: each install/remove item
    /// is one step, each update item counts double since it expands into
    /// a paired install and remove.
    #[must_use]
    pub fn progress_budget(&self) -> usize {
        self.install.len() + 2 * self.update.len() + self.remove.len()
    }

    pub(crate) fn require_state(&self, expected: TxState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }
}
