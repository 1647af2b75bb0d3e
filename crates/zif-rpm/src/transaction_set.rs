//! The RPM transaction-set contract: add elements, order, test-run, and
//! run with progress. A real binding to `librpm` implements this trait;
//! Zif's engine only depends on the trait.

use crate::error::Result;
use std::path::Path;
use zif_progress::State;

/// Filter flags controlling how the real run tolerates conditions that
/// would otherwise abort it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterFlags {
    /// Skip the disk-space check (set when `diskspacecheck` is off).
    pub no_diskspace: bool,
    /// Allow installing an older version over a newer one (set when any
    /// queued item is a downgrade).
    pub allow_oldpackage: bool,
}

/// Whether untrusted packages may proceed into the real run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Require every install to carry an OK signature.
    Trusted,
    /// Tolerate `NOKEY`/`NOTFOUND`, but still fail on a signature
    /// mismatch.
    Untrusted,
}

/// One problem reported by ordering or a test run.
#[derive(Debug, Clone)]
pub struct TransactionProblem {
    /// Human-readable description (e.g. a missing dependency or a
    /// conflicting file).
    pub description: String,
}

/// Progress events the transaction set reports while running, mapped
/// onto the hierarchical [`State`] tree by the caller.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The whole transaction started.
    TransStart,
    /// The whole transaction finished.
    TransStop,
    /// An install element started.
    InstallStart {
        /// Package NEVRA being installed.
        nevra: String,
    },
    /// A remove element started.
    RemoveStart {
        /// Package NEVRA being removed.
        nevra: String,
    },
    /// Incremental progress within the current element.
    Progress {
        /// Amount completed so far.
        amount: u64,
        /// Total expected.
        total: u64,
    },
}

/// The RPM transaction-set contract.
pub trait TransactionSet: std::fmt::Debug + Send {
    /// Set the root the transaction operates under (`<prefix>`).
    fn set_root(&mut self, root: &Path) -> Result<()>;

    /// Add an install element for the RPM file at `path`.
    fn add_install(&mut self, path: &Path, policy: TrustPolicy) -> Result<()>;

    /// Add an erase element for the installed header identified by
    /// `header_id` (an opaque handle the local store resolved).
    fn add_erase(&mut self, header_id: &str) -> Result<()>;

    /// Topologically order the added elements.
    fn order(&mut self) -> Result<Vec<TransactionProblem>>;

    /// Set filter flags for the upcoming run.
    fn set_filter_flags(&mut self, flags: FilterFlags);

    /// Run a debug/test pass without touching disk, surfacing problems.
    fn test_run(&mut self) -> Result<Vec<TransactionProblem>>;

    /// Run the transaction for real, routing progress onto `state`.
    fn run(&mut self, state: &State, on_event: &mut dyn FnMut(ProgressEvent)) -> Result<()>;
}
