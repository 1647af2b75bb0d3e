//! The commit phase: acquire the rpmdb write lock, drive the RPM
//! transaction set, and record the outcome in history and yumdb.

use crate::error::{Error, Result};
use crate::prepare::artifact_path;
use crate::transaction::{Transaction, TxState};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;
use zif_core::{Origin, Package, Reason, TrustKind};
use zif_history::HistoryStore;
use zif_progress::State;
use zif_rpm::{FilterFlags, ProgressEvent, RpmDbLock, TransactionProblem, TransactionSet, TrustPolicy};
use zif_yumdb::{PackageKey, YumdbStore};

/// What a committed transaction actually did: package counts plus
/// whatever `prepare` fetched.
#[derive(Debug, Clone, Default)]
pub struct TransactionSummary {
    /// Packages newly installed (excluding update pairs).
    pub installed: u32,
    /// Packages removed (excluding update pairs).
    pub removed: u32,
    /// Install/remove pairs that together made up an update.
    pub updated: u32,
}

impl Transaction {
    /// Commit the prepared plan. `allow_untrusted` controls whether an
    /// install lacking a trusted signature blocks the commit.
    #[allow(clippy::too_many_arguments)]
    pub fn commit(
        &mut self,
        lock: &Arc<dyn RpmDbLock>,
        txset: &mut dyn TransactionSet,
        history: &HistoryStore,
        yumdb: &YumdbStore,
        progress: &Arc<State>,
        timestamp: i64,
        allow_untrusted: bool,
    ) -> Result<TransactionSummary> {
        self.require_state(TxState::Prepared)?;

        acquire_lock(&**lock, self.config.lock_retries, self.config.lock_delay)?;
        let result = self.run_commit(txset, history, yumdb, progress, timestamp, allow_untrusted);
        lock.release();
        let summary = result?;

        if !self.config.keepcache {
            cleanup_cache(&self.install.live_packages(), &self.config);
        }

        self.state = TxState::Committed;
        Ok(summary)
    }

    fn run_commit(
        &mut self,
        txset: &mut dyn TransactionSet,
        history: &HistoryStore,
        yumdb: &YumdbStore,
        progress: &Arc<State>,
        timestamp: i64,
        allow_untrusted: bool,
    ) -> Result<TransactionSummary> {
        txset.set_root(&self.config.prefix)?;

        let policy = if allow_untrusted { TrustPolicy::Untrusted } else { TrustPolicy::Trusted };
        for package in self.install.live_packages() {
            if !allow_untrusted && package.trust() != TrustKind::Pubkey {
                return Err(Error::Failed(format!("{} carries no trusted signature", package.nevra())));
            }
            let path = artifact_path(&package, &self.config);
            txset.add_install(&path, policy)?;
        }
        for package in self.remove.live_packages() {
            if let Some(header_id) = package.pkgid()? {
                txset.add_erase(&header_id)?;
            }
        }

        fail_on_problems(&txset.order()?)?;
        if self.config.rpm_check_debug {
            fail_on_problems(&txset.test_run()?)?;
        }

        let any_downgrade = self.install.iter().chain(self.remove.iter()).any(|item| item.reason.is_downgrade());
        txset.set_filter_flags(FilterFlags {
            no_diskspace: !self.config.diskspacecheck,
            allow_oldpackage: any_downgrade,
        });

        txset.run(progress, &mut |event| log_progress_event(&event))?;

        let mut summary = TransactionSummary::default();
        for item in self.install.live_items() {
            record_install(history, yumdb, &item.package, item.reason, self.euid, &self.cmdline, &self.config, timestamp)?;
            if is_update_family(item.reason) {
                summary.updated += 1;
            } else {
                summary.installed += 1;
            }
        }
        for item in self.remove.live_items() {
            record_remove(history, yumdb, &item.package, item.reason, self.euid, &self.cmdline, &self.config, timestamp)?;
            if !is_update_family(item.reason) {
                summary.removed += 1;
            }
        }

        Ok(summary)
    }
}

fn acquire_lock(lock: &dyn RpmDbLock, retries: u32, delay_ms: u64) -> Result<()> {
    for attempt in 0..=retries {
        match lock.try_acquire() {
            Ok(true) => return Ok(()),
            Ok(false) if attempt < retries => thread::sleep(Duration::from_millis(delay_ms)),
            Ok(false) => return Err(Error::Failed("could not acquire rpmdb lock".to_string())),
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::Failed("could not acquire rpmdb lock".to_string()))
}

fn fail_on_problems(problems: &[TransactionProblem]) -> Result<()> {
    if problems.is_empty() {
        return Ok(());
    }
    let joined = problems.iter().map(|p| p.description.as_str()).collect::<Vec<_>>().join("; ");
    Err(Error::Failed(joined))
}

fn log_progress_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::InstallStart { nevra } => debug!(nevra, "installing"),
        ProgressEvent::RemoveStart { nevra } => debug!(nevra, "removing"),
        ProgressEvent::TransStart => debug!("rpm transaction started"),
        ProgressEvent::TransStop => debug!("rpm transaction finished"),
        ProgressEvent::Progress { .. } => {}
    }
}

fn is_update_family(reason: Reason) -> bool {
    matches!(
        reason,
        Reason::UpdateUserAction
            | Reason::UpdateSystem
            | Reason::UpdateDepend
            | Reason::UpdateForConflict
            | Reason::InstallForUpdate
            | Reason::RemoveForUpdate
    )
}

fn version_release(package: &Package) -> String {
    format!("{}-{}", package.version(), package.release())
}

#[allow(clippy::too_many_arguments)]
fn record_install(
    history: &HistoryStore,
    yumdb: &YumdbStore,
    package: &Package,
    reason: Reason,
    uid: u32,
    cmdline: &str,
    config: &zif_core::Config,
    timestamp: i64,
) -> Result<()> {
    let from_repo = match package.origin() {
        Origin::Repo(id) => id.clone(),
        _ => "local".to_string(),
    };
    history.add_entry(
        package.name(),
        &version_release(package),
        package.arch().as_str(),
        timestamp,
        reason,
        uid,
        cmdline,
        &from_repo,
        &config.releasever,
    )?;
    if config.yumdb_allow_write {
        if let Some(key) = PackageKey::from_package(package)? {
            yumdb.set(&key, "from_repo", from_repo.as_bytes())?;
            yumdb.set(&key, "installed_by", uid.to_string().as_bytes())?;
            yumdb.set(&key, "reason", reason.yumdb_reason().as_bytes())?;
            yumdb.set(&key, "releasever", config.releasever.as_bytes())?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn record_remove(
    history: &HistoryStore,
    yumdb: &YumdbStore,
    package: &Package,
    reason: Reason,
    uid: u32,
    cmdline: &str,
    config: &zif_core::Config,
    timestamp: i64,
) -> Result<()> {
    let from_repo = match package.origin() {
        Origin::Repo(id) => id.clone(),
        _ => "local".to_string(),
    };
    history.add_entry(
        package.name(),
        &version_release(package),
        package.arch().as_str(),
        timestamp,
        reason,
        uid,
        cmdline,
        &from_repo,
        &config.releasever,
    )?;
    if config.yumdb_allow_write {
        if let Some(key) = PackageKey::from_package(package)? {
            yumdb.remove_all(&key)?;
        }
    }
    Ok(())
}

fn cleanup_cache(packages: &[Package], config: &zif_core::Config) {
    for package in packages {
        if let Some(name) = package.cache_filename() {
            let _ = std::fs::remove_file(config.cachedir.join(name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use zif_core::{Arch, Config};
    use zif_store::{MetaStore, Store};

    #[derive(Debug, Default)]
    struct AlwaysLock(AtomicBool);
    impl RpmDbLock for AlwaysLock {
        fn try_acquire(&self) -> zif_rpm::Result<bool> {
            Ok(!self.0.swap(true, Ordering::SeqCst))
        }
        fn release(&self) {
            self.0.store(false, Ordering::SeqCst);
        }
    }

    #[derive(Debug, Default)]
    struct FakeTxSet {
        installs: Vec<std::path::PathBuf>,
        erases: Vec<String>,
    }
    impl TransactionSet for FakeTxSet {
        fn set_root(&mut self, _root: &Path) -> zif_rpm::Result<()> {
            Ok(())
        }
        fn add_install(&mut self, path: &Path, _policy: TrustPolicy) -> zif_rpm::Result<()> {
            self.installs.push(path.to_path_buf());
            Ok(())
        }
        fn add_erase(&mut self, header_id: &str) -> zif_rpm::Result<()> {
            self.erases.push(header_id.to_string());
            Ok(())
        }
        fn order(&mut self) -> zif_rpm::Result<Vec<TransactionProblem>> {
            Ok(Vec::new())
        }
        fn set_filter_flags(&mut self, _flags: FilterFlags) {}
        fn test_run(&mut self) -> zif_rpm::Result<Vec<TransactionProblem>> {
            Ok(Vec::new())
        }
        fn run(&mut self, _state: &State, _on_event: &mut dyn FnMut(ProgressEvent)) -> zif_rpm::Result<()> {
            Ok(())
        }
    }

    fn pkg(name: &str) -> Package {
        Package::new(name, 0, "1.0", "1", Arch::new("x86_64"), Origin::Repo("base".to_string()))
    }

    #[test]
    fn commit_rejects_untrusted_signature_by_default() {
        let local: Arc<dyn Store> = Arc::new(MetaStore::new("installed", vec![]));
        let mut tx = Transaction::new(local, vec![], Config::default(), Arch::new("x86_64"), 0, "test");
        tx.add_install(pkg("hello"), Reason::InstallUserAction).unwrap();
        let progress = zif_progress::State::new(tx.progress_budget().max(1));
        tx.resolve(&progress).unwrap();
        tx.state = TxState::Prepared;

        let lock: Arc<dyn RpmDbLock> = Arc::new(AlwaysLock::default());
        let mut txset = FakeTxSet::default();
        let history = HistoryStore::open_in_memory().unwrap();
        let yumdb_dir = tempfile::tempdir().unwrap();
        let yumdb = YumdbStore::new(yumdb_dir.path());
        let commit_progress = zif_progress::State::new(1);
        let err = tx
            .commit(&lock, &mut txset, &history, &yumdb, &commit_progress, 100, false)
            .unwrap_err();
        assert!(matches!(err, Error::Failed(_)));
    }

    #[test]
    fn commit_records_history_for_trusted_install() {
        let local: Arc<dyn Store> = Arc::new(MetaStore::new("installed", vec![]));
        let mut tx = Transaction::new(local, vec![], Config::default(), Arch::new("x86_64"), 1000, "zif install hello");
        let package = pkg("hello");
        tx.add_install(package.clone(), Reason::InstallUserAction).unwrap();
        let progress = zif_progress::State::new(tx.progress_budget().max(1));
        tx.resolve(&progress).unwrap();
        tx.state = TxState::Prepared;
        package.set_trust(TrustKind::Pubkey).unwrap();
        for installed in tx.install_set() {
            installed.set_trust(TrustKind::Pubkey).unwrap();
        }

        let lock: Arc<dyn RpmDbLock> = Arc::new(AlwaysLock::default());
        let mut txset = FakeTxSet::default();
        let history = HistoryStore::open_in_memory().unwrap();
        let yumdb_dir = tempfile::tempdir().unwrap();
        let yumdb = YumdbStore::new(yumdb_dir.path());
        let commit_progress = zif_progress::State::new(1);
        let summary = tx
            .commit(&lock, &mut txset, &history, &yumdb, &commit_progress, 100, false)
            .unwrap();
        assert_eq!(summary.installed, 1);
        assert_eq!(history.get_packages(100).unwrap().len(), 1);
        assert_eq!(tx.state(), TxState::Committed);
    }

    #[test]
    fn commit_records_history_for_remove() {
        let package = pkg("hello");
        let local: Arc<dyn Store> = Arc::new(MetaStore::new("installed", vec![package.clone()]));
        let mut tx = Transaction::new(local, vec![], Config::default(), Arch::new("x86_64"), 1000, "zif remove hello");
        tx.add_remove(package, Reason::RemoveUserAction).unwrap();
        let progress = zif_progress::State::new(tx.progress_budget().max(1));
        tx.resolve(&progress).unwrap();
        tx.state = TxState::Prepared;

        let lock: Arc<dyn RpmDbLock> = Arc::new(AlwaysLock::default());
        let mut txset = FakeTxSet::default();
        let history = HistoryStore::open_in_memory().unwrap();
        let yumdb_dir = tempfile::tempdir().unwrap();
        let yumdb = YumdbStore::new(yumdb_dir.path());
        let commit_progress = zif_progress::State::new(1);
        let summary = tx
            .commit(&lock, &mut txset, &history, &yumdb, &commit_progress, 100, false)
            .unwrap();
        assert_eq!(summary.removed, 1);
        assert_eq!(history.get_packages(100).unwrap().len(), 1);
        assert_eq!(tx.state(), TxState::Committed);
    }
}
