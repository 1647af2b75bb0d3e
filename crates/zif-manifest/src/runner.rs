//! Drives a parsed manifest: builds `MetaStore`s from `package`
//! directives, queues `install`/`remove`/`update`/`downgrade` actions,
//! and runs the real transaction engine (resolve → prepare → commit) at
//! each `run`, checking `expect-state`/`expect-absent` assertions against
//! the resulting local store.

use crate::directive::{Directive, ResourceKind};
use crate::error::{Error, Result};
use crate::harness::{NullDownloadEngine, NullHeaderReader, NullLock, RecordingTransactionSet};
use std::sync::Arc;
use tracing::debug;
use zif_core::{AHashMap, Arch, Config, Depend, Origin, Package, Reason};
use zif_progress::State;
use zif_store::{MetaStore, Store};
use zif_transaction::{Transaction, TransactionSummary};

const LOCAL_STORE_ID: &str = "installed";

/// The outcome of running a manifest: one `TransactionSummary` per `run`
/// directive, or a flag saying the whole file opened with `disable`.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// `true` if the manifest's first directive was `disable`.
    pub skipped: bool,
    /// One summary per `run` directive encountered, in order.
    pub summaries: Vec<TransactionSummary>,
}

/// Runs manifest text against a fresh set of virtual stores.
#[derive(Debug)]
pub struct ManifestRunner {
    native_arch: Arch,
}

#[derive(Default)]
struct ResourceBuffers {
    requires: Vec<Depend>,
    provides: Vec<Depend>,
    conflicts: Vec<Depend>,
    obsoletes: Vec<Depend>,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Install,
    Remove,
    Update,
    Downgrade,
}

#[derive(Debug, Clone)]
enum ExpectationDirective {
    Present { name: String, version: String, release: String, arch: String },
    Absent { name: String },
}

/// What one `run` actually did to the local store, for the caller to fold
/// back into its own bookkeeping (no real rpmdb does this for us here).
struct RunOutcome {
    summary: TransactionSummary,
    installed: Vec<Package>,
    removed: Vec<Package>,
}

impl ManifestRunner {
    /// A runner that resolves against `native_arch`.
    #[must_use]
    pub fn new(native_arch: Arch) -> Self {
        Self { native_arch }
    }

    /// Parse and execute `text`.
    pub fn run(&self, text: &str) -> Result<RunReport> {
        let directives = crate::directive::parse(text)?;
        if matches!(directives.first(), Some(Directive::Disable)) {
            return Ok(RunReport { skipped: true, summaries: Vec::new() });
        }
        self.execute(&directives)
    }

    fn execute(&self, directives: &[Directive]) -> Result<RunReport> {
        let mut config = Config::default();
        config.gpgcheck = false;
        config.localpkg_gpgcheck = false;
        config.rpm_check_debug = false;

        let mut packages_by_store: AHashMap<String, Vec<Package>> = AHashMap::default();
        let mut current_package: Option<Package> = None;
        let mut buffers = ResourceBuffers::default();

        let mut pending_actions: Vec<(Action, String)> = Vec::new();
        let mut pending_expectations: Vec<ExpectationDirective> = Vec::new();
        let mut report = RunReport::default();

        for directive in directives {
            match directive {
                Directive::Disable => {}
                Directive::Config { key, value } => apply_config(&mut config, key, value),
                Directive::Repo { id } => {
                    packages_by_store.entry(id.clone()).or_default();
                }
                Directive::Package { store, name, epoch, version, release, arch } => {
                    flush_resources(&current_package, &mut buffers)?;
                    let origin = if store == LOCAL_STORE_ID { Origin::Installed } else { Origin::Repo(store.clone()) };
                    let package = Package::new(name.clone(), *epoch, version.clone(), release.clone(), Arch::new(arch), origin);
                    packages_by_store.entry(store.clone()).or_default().push(package.clone());
                    current_package = Some(package);
                }
                Directive::Resource { kind, description } => {
                    let depend = Depend::parse(description).ok_or_else(|| Error::BadDepend(description.clone()))?;
                    match kind {
                        ResourceKind::Requires => buffers.requires.push(depend),
                        ResourceKind::Provides => buffers.provides.push(depend),
                        ResourceKind::Conflicts => buffers.conflicts.push(depend),
                        ResourceKind::Obsoletes => buffers.obsoletes.push(depend),
                    }
                }
                Directive::Install { name } => pending_actions.push((Action::Install, name.clone())),
                Directive::Remove { name } => pending_actions.push((Action::Remove, name.clone())),
                Directive::Update { name } => pending_actions.push((Action::Update, name.clone())),
                Directive::Downgrade { name } => pending_actions.push((Action::Downgrade, name.clone())),
                Directive::Run => {
                    flush_resources(&current_package, &mut buffers)?;
                    current_package = None;

                    let outcome = self.run_once(&config, &packages_by_store, &pending_actions)?;
                    apply_outcome_to_local_store(&mut packages_by_store, &outcome);
                    report.summaries.push(outcome.summary);
                    pending_actions.clear();

                    check_expectations(&packages_by_store, &pending_expectations)?;
                    pending_expectations.clear();
                }
                Directive::ExpectState { name, version, release, arch } => {
                    pending_expectations.push(ExpectationDirective::Present {
                        name: name.clone(),
                        version: version.clone(),
                        release: release.clone(),
                        arch: arch.clone(),
                    });
                }
                Directive::ExpectAbsent { name } => {
                    pending_expectations.push(ExpectationDirective::Absent { name: name.clone() });
                }
            }
        }
        flush_resources(&current_package, &mut buffers)?;
        check_expectations(&packages_by_store, &pending_expectations)?;
        Ok(report)
    }

    fn run_once(
        &self,
        config: &Config,
        packages_by_store: &AHashMap<String, Vec<Package>>,
        actions: &[(Action, String)],
    ) -> Result<RunOutcome> {
        let local_packages = packages_by_store.get(LOCAL_STORE_ID).cloned().unwrap_or_default();
        let local: Arc<dyn Store> = Arc::new(MetaStore::new(LOCAL_STORE_ID, local_packages));
        let remotes: Vec<Arc<dyn Store>> = packages_by_store
            .iter()
            .filter(|(id, _)| id.as_str() != LOCAL_STORE_ID)
            .map(|(id, packages)| Arc::new(MetaStore::new(id.clone(), packages.clone())) as Arc<dyn Store>)
            .collect();

        let mut tx = Transaction::new(local.clone(), remotes.clone(), config.clone(), self.native_arch.clone(), 0, "zif-manifest");
        for (action, name) in actions {
            let package = match action {
                Action::Remove => find_package(local.as_ref(), name)?,
                _ => find_in_any_remote(&remotes, name)?,
            };
            match action {
                Action::Install => tx.add_install(package, Reason::InstallUserAction)?,
                Action::Remove => tx.add_remove(package, Reason::RemoveUserAction)?,
                Action::Update => tx.add_update(package, Reason::UpdateUserAction)?,
                Action::Downgrade => tx.add_install(package, Reason::DowngradeUserAction)?,
            }
        }

        let progress = State::new(tx.progress_budget().max(1));
        tx.resolve(&progress)?;
        debug!(install = tx.install_set().len(), remove = tx.remove_set().len(), "manifest transaction resolved");

        let headers: Arc<dyn zif_rpm::HeaderReader> = Arc::new(NullHeaderReader);
        let downloader: Arc<dyn zif_transaction::DownloadEngine> = Arc::new(NullDownloadEngine);
        let mut keyring = zif_rpm::Keyring::new();
        let gpg_dir = std::env::temp_dir();
        tx.prepare(&headers, &downloader, &mut keyring, &gpg_dir)?;

        let installed = tx.install_set();
        let removed = tx.remove_set();

        let lock: Arc<dyn zif_rpm::RpmDbLock> = Arc::new(NullLock::default());
        let mut txset = RecordingTransactionSet::default();
        let history = zif_history::HistoryStore::open_in_memory()?;
        let yumdb_dir = tempfile::tempdir().map_err(|e| Error::StateMismatch(e.to_string()))?;
        let yumdb = zif_yumdb::YumdbStore::new(yumdb_dir.path());
        let commit_progress = State::new(1);
        let summary = tx.commit(&lock, &mut txset, &history, &yumdb, &commit_progress, 0, false)?;
        Ok(RunOutcome { summary, installed, removed })
    }
}

fn find_in_any_remote(remotes: &[Arc<dyn Store>], name: &str) -> Result<Package> {
    for store in remotes {
        if let Ok(package) = find_package(store.as_ref(), name) {
            return Ok(package);
        }
    }
    Err(Error::PackageNotFound { name: name.to_string(), store: "<any repo>".to_string() })
}

fn find_package(store: &dyn Store, name: &str) -> Result<Package> {
    let matches = store.packages()?;
    matches
        .into_iter()
        .find(|p| p.name() == name)
        .ok_or_else(|| Error::PackageNotFound { name: name.to_string(), store: store.id().to_string() })
}

fn flush_resources(current: &Option<Package>, buffers: &mut ResourceBuffers) -> Result<()> {
    let Some(package) = current else {
        return Ok(());
    };
    if !buffers.requires.is_empty() {
        package.set_requires(std::mem::take(&mut buffers.requires))?;
    }
    if !buffers.provides.is_empty() {
        package.set_provides(std::mem::take(&mut buffers.provides))?;
    }
    if !buffers.conflicts.is_empty() {
        package.set_conflicts(std::mem::take(&mut buffers.conflicts))?;
    }
    if !buffers.obsoletes.is_empty() {
        package.set_obsoletes(std::mem::take(&mut buffers.obsoletes))?;
    }
    Ok(())
}

fn apply_config(config: &mut Config, key: &str, value: &str) {
    match key {
        "releasever" => config.releasever = value.to_string(),
        "gpgcheck" => config.gpgcheck = value == "true",
        "diskspacecheck" => config.diskspacecheck = value == "true",
        "keepcache" => config.keepcache = value == "true",
        other => debug!(key = other, "unrecognized manifest config key, ignoring"),
    }
}

/// Mirrors `libzif`'s manifest section handler, which explicitly adds the
/// resolved install set to, and removes the resolved remove set from, the
/// fake local store after every transaction.
fn apply_outcome_to_local_store(packages_by_store: &mut AHashMap<String, Vec<Package>>, outcome: &RunOutcome) {
    let mut local = packages_by_store.remove(LOCAL_STORE_ID).unwrap_or_default();
    let removed_names: std::collections::HashSet<(String, String)> =
        outcome.removed.iter().map(|p| (p.name().to_string(), p.arch().as_str().to_string())).collect();
    local.retain(|p| !removed_names.contains(&(p.name().to_string(), p.arch().as_str().to_string())));
    for package in &outcome.installed {
        let installed = Package::new(
            package.name(),
            package.epoch(),
            package.version(),
            package.release(),
            package.arch().clone(),
            Origin::Installed,
        );
        local.push(installed);
    }
    packages_by_store.insert(LOCAL_STORE_ID.to_string(), local);
}

fn check_expectations(packages_by_store: &AHashMap<String, Vec<Package>>, expectations: &[ExpectationDirective]) -> Result<()> {
    if expectations.is_empty() {
        return Ok(());
    }
    let local = packages_by_store.get(LOCAL_STORE_ID).cloned().unwrap_or_default();
    for expectation in expectations {
        match expectation {
            ExpectationDirective::Present { name, version, release, arch } => {
                let found = local
                    .iter()
                    .any(|p| p.name() == name && p.version() == version && p.release() == release && p.arch().as_str() == arch);
                if !found {
                    return Err(Error::StateMismatch(format!("expected {name}-{version}-{release}.{arch} installed, not found")));
                }
            }
            ExpectationDirective::Absent { name } => {
                if local.iter().any(|p| p.name() == name) {
                    return Err(Error::StateMismatch(format!("expected {name} absent, but it is installed")));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_from_repo_lands_in_local_store() {
        let text = "\
repo updates
package updates hal 0 0.0.2 1 x86_64
install hal
run
expect-state hal 0.0.2 1 x86_64
";
        let runner = ManifestRunner::new(Arch::new("x86_64"));
        let report = runner.run(text).unwrap();
        assert!(!report.skipped);
        assert_eq!(report.summaries.len(), 1);
        assert_eq!(report.summaries[0].installed, 1);
    }

    #[test]
    fn remove_drops_package_from_local_store() {
        let text = "\
package installed hal 0 0.0.1 1 x86_64
remove hal
run
expect-absent hal
";
        let runner = ManifestRunner::new(Arch::new("x86_64"));
        let report = runner.run(text).unwrap();
        assert_eq!(report.summaries[0].removed, 1);
    }

    #[test]
    fn disable_skips_the_whole_manifest() {
        let runner = ManifestRunner::new(Arch::new("x86_64"));
        let report = runner.run("disable\ninstall hal\n").unwrap();
        assert!(report.skipped);
    }

    #[test]
    fn wrong_expectation_is_reported() {
        let text = "\
repo updates
package updates hal 0 0.0.2 1 x86_64
install hal
run
expect-state hal 9.9.9 1 x86_64
";
        let runner = ManifestRunner::new(Arch::new("x86_64"));
        assert!(runner.run(text).is_err());
    }
}
