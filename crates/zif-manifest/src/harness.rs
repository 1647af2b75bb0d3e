//! In-process doubles for the RPM/network boundary: the manifest runner
//! drives the real transaction engine, but never touches a real rpmdb or
//! network, for everything upstream of those seams.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use zif_progress::State;
use zif_rpm::{
    FilterFlags, HeaderReader, HeaderSignature, ProgressEvent, Result as RpmResult, RpmDbLock, TransactionProblem,
    TransactionSet, TrustPolicy,
};
use zif_transaction::{DownloadEngine, DownloadRequest, Result as TxResult};

/// A `HeaderReader` that never reports a signature: manifests are offline
/// fixtures, so `gpgcheck` should stay off in manifest-driven configs.
#[derive(Debug, Default)]
pub struct NullHeaderReader;

impl HeaderReader for NullHeaderReader {
    fn read_package(&self, _path: &Path) -> RpmResult<zif_core::Package> {
        unimplemented!("manifests seed stores directly; nothing ever reads a real RPM header")
    }

    fn read_signature(&self, _path: &Path) -> RpmResult<Option<HeaderSignature>> {
        Ok(None)
    }
}

/// A `DownloadEngine` that materializes an empty placeholder file for
/// every request instead of fetching anything.
#[derive(Debug, Default)]
pub struct NullDownloadEngine;

impl DownloadEngine for NullDownloadEngine {
    fn fetch(&self, requests: &[DownloadRequest]) -> TxResult<()> {
        for request in requests {
            if let Some(parent) = request.cache_path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            std::fs::write(&request.cache_path, b"manifest fixture").ok();
        }
        Ok(())
    }

    fn fetch_gpgkey(&self, _repo_id: &str) -> TxResult<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// A lock that's always free: the manifest runner never contends with a
/// real rpmdb holder.
#[derive(Debug, Default)]
pub struct NullLock(AtomicBool);

impl RpmDbLock for NullLock {
    fn try_acquire(&self) -> RpmResult<bool> {
        Ok(!self.0.swap(true, Ordering::SeqCst))
    }

    fn release(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A `TransactionSet` that records what it was asked to do without
/// touching disk or a real RPM library.
#[derive(Debug, Default)]
pub struct RecordingTransactionSet {
    pub installs: Vec<std::path::PathBuf>,
    pub erases: Vec<String>,
    pub flags: FilterFlags,
}

impl TransactionSet for RecordingTransactionSet {
    fn set_root(&mut self, _root: &Path) -> RpmResult<()> {
        Ok(())
    }

    fn add_install(&mut self, path: &Path, _policy: TrustPolicy) -> RpmResult<()> {
        self.installs.push(path.to_path_buf());
        Ok(())
    }

    fn add_erase(&mut self, header_id: &str) -> RpmResult<()> {
        self.erases.push(header_id.to_string());
        Ok(())
    }

    fn order(&mut self) -> RpmResult<Vec<TransactionProblem>> {
        Ok(Vec::new())
    }

    fn set_filter_flags(&mut self, flags: FilterFlags) {
        self.flags = flags;
    }

    fn test_run(&mut self) -> RpmResult<Vec<TransactionProblem>> {
        Ok(Vec::new())
    }

    fn run(&mut self, _state: &State, _on_event: &mut dyn FnMut(ProgressEvent)) -> RpmResult<()> {
        Ok(())
    }
}
