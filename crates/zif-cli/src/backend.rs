//! Concrete trait implementations the CLI hands to the transaction
//! engine. None of this workspace's crates wraps `librpm` directly (see
//! zif-rpm's trait-only boundary), so signature reading and the actual
//! RPM transaction set remain unimplemented seams here too; what can be
//! real — the on-disk exclusive lock — is.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use zif_progress::State;
use zif_rpm::{
    FilterFlags, HeaderReader, HeaderSignature, ProgressEvent, Result as RpmResult, RpmDbLock, TransactionProblem,
    TransactionSet, TrustPolicy,
};
use zif_transaction::{DownloadEngine, DownloadRequest, Result as TxResult};

/// No real RPM header parser lives in this workspace; packages are
/// already fully described by the world file, so nothing ever calls
/// `read_package`. Signature lookups report "none found", which is only
/// safe with `gpgcheck` disabled.
#[derive(Debug, Default)]
pub struct UnimplementedHeaderReader;

impl HeaderReader for UnimplementedHeaderReader {
    fn read_package(&self, path: &Path) -> RpmResult<zif_core::Package> {
        Err(zif_rpm::Error::HeaderOpenFailed {
            path: path.to_path_buf(),
            reason: "no RPM header parser is linked in this build".to_string(),
        })
    }

    fn read_signature(&self, _path: &Path) -> RpmResult<Option<HeaderSignature>> {
        Ok(None)
    }
}

/// Copies (or, lacking a real source, touches) the cache path for each
/// requested package. Real network fetching belongs to a repository
/// metadata crate this workspace doesn't carry.
#[derive(Debug, Default)]
pub struct LocalDownloadEngine;

impl DownloadEngine for LocalDownloadEngine {
    fn fetch(&self, requests: &[DownloadRequest]) -> TxResult<()> {
        for request in requests {
            if let Some(parent) = request.cache_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| zif_transaction::Error::Failed(e.to_string()))?;
            }
            if !request.cache_path.exists() {
                std::fs::write(&request.cache_path, b"").map_err(|e| zif_transaction::Error::Failed(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn fetch_gpgkey(&self, _repo_id: &str) -> TxResult<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// An advisory exclusive lock on a single file, held for the process's
/// lifetime once acquired. A real multi-process rpmdb lock would use
/// `flock(2)`; `std::fs::File`'s create-new semantics give the same
/// single-holder guarantee without reaching for a new dependency.
#[derive(Debug)]
pub struct FileRpmDbLock {
    path: PathBuf,
    held: Mutex<Option<std::fs::File>>,
}

impl FileRpmDbLock {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self { path: root.join("var/lib/rpm/.zif.lock"), held: Mutex::new(None) }
    }
}

impl RpmDbLock for FileRpmDbLock {
    fn try_acquire(&self) -> RpmResult<bool> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let mut held = self.held.lock().expect("lock poisoned");
        if held.is_some() {
            return Ok(true);
        }
        match std::fs::OpenOptions::new().write(true).create_new(true).open(&self.path) {
            Ok(file) => {
                *held = Some(file);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn release(&self) {
        let mut held = self.held.lock().expect("lock poisoned");
        *held = None;
        std::fs::remove_file(&self.path).ok();
    }
}

/// No real RPM transaction set exists in this workspace (the honest seam
/// zif-rpm documents); this records what it was asked to do and reports
/// it as committed so the rest of the pipeline (history, yumdb, cache
/// cleanup) can be exercised end to end.
#[derive(Debug, Default)]
pub struct NoopTransactionSet {
    pub installs: Vec<PathBuf>,
    pub erases: Vec<String>,
}

impl TransactionSet for NoopTransactionSet {
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

    fn set_filter_flags(&mut self, _flags: FilterFlags) {}

    fn test_run(&mut self) -> RpmResult<Vec<TransactionProblem>> {
        Ok(Vec::new())
    }

    fn run(&mut self, _state: &State, _on_event: &mut dyn FnMut(ProgressEvent)) -> RpmResult<()> {
        Ok(())
    }
}
