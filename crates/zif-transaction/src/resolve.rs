//! The resolver outer loop: install, update, remove, and conflict-check
//! phases, one item processed per phase per pass, until nothing is left
//! unresolved. Best-provider selection is [`crate::score::best_provider`];
//! membership and cancellation propagation live on [`Queue`].

use crate::error::{Error, Result};
use crate::projected::{effective_provides, ProjectedStore};
use crate::queue::Queue;
use crate::score::best_provider;
use crate::transaction::{Transaction, TxState};
use std::sync::Arc;
use zif_core::{Arch, Config, Depend, DependFlag, Package, Reason};
use zif_store::Store;

/// What processing a single queue item produced.
enum ItemOutcome {
    /// The item is fully resolved; keep it in the queue.
    Done,
    /// Resolution determined this item has no net effect; drop it.
    Drop,
}

impl Transaction {
    /// Resolve every queued item: expand requires/obsoletes/conflicts into
    /// concrete install and remove plans, honoring `skip_broken`. On
    /// success the transaction moves to [`TxState::Resolved`].
    ///
    /// `progress` should be sized to [`Transaction::progress_budget`];
    /// overshooting that estimate (a dependency pulls in more items than
    /// the initial queue) is tolerated, cancellation is not.
    pub fn resolve(&mut self, progress: &Arc<zif_progress::State>) -> Result<()> {
        self.require_state(TxState::Clean)?;

        self.store_local.load()?;
        for store in &self.stores_remote {
            store.load()?;
        }

        let installed = self.store_local.packages()?;
        let mut projected = ProjectedStore::new(installed);
        for item in self.install.iter() {
            projected.apply_install(item.package.clone());
        }
        for item in self.remove.iter() {
            projected.apply_remove(&item.package);
        }

        loop {
            if progress.is_cancelled() {
                return Err(zif_progress::Error::Cancelled.into());
            }
            self.resolve_count += 1;

            let install_progressed = phase_install(self, &mut projected, progress)?;
            let update_progressed = phase_update(self, &mut projected, progress)?;
            let remove_progressed = phase_remove(self, &mut projected, progress)?;
            let conflicts_progressed = phase_conflicts(self, &mut projected)?;

            let progressed =
                install_progressed || update_progressed || remove_progressed || conflicts_progressed;
            self.unresolved_dependencies = progressed;
            if !progressed {
                break;
            }
        }

        if !self.install.has_live_items() && !self.remove.has_live_items() {
            return Err(Error::NothingToDo(
                "resolution produced no effective change".to_string(),
            ));
        }

        self.state = TxState::Resolved;
        Ok(())
    }
}

fn report_step(progress: &Arc<zif_progress::State>, steps: usize) -> Result<()> {
    match progress.done(steps) {
        Ok(()) => Ok(()),
        Err(zif_progress::Error::Cancelled) => Err(zif_progress::Error::Cancelled.into()),
        Err(zif_progress::Error::StepOverflow { .. }) => Ok(()),
    }
}

fn compare_mode(config: &Config) -> zif_core::CompareMode {
    match config.pkg_compare_mode {
        zif_core::config::PkgCompareMode::Version => zif_core::CompareMode::Version,
        zif_core::config::PkgCompareMode::Distro => zif_core::CompareMode::Distro,
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
    )
}

/// The reason a dependency-pulled-in provider should carry, inherited from
/// the reason of the item that required it.
fn provider_reason(requiring_reason: Reason) -> Reason {
    if is_update_family(requiring_reason) {
        Reason::UpdateDepend
    } else if requiring_reason.is_downgrade() {
        Reason::DowngradeForDep
    } else {
        Reason::InstallDepend
    }
}

/// The reason an install-only-n eviction should carry.
fn onlyn_remove_reason(reason: Reason) -> Reason {
    if is_update_family(reason) {
        Reason::RemoveForUpdate
    } else if reason.is_downgrade() {
        Reason::DowngradeInstalled
    } else {
        Reason::RemoveAsOnlyN
    }
}

fn queue_install_and_project(
    install_queue: &mut Queue,
    projected: &mut ProjectedStore,
    package: Package,
    reason: Reason,
) {
    if install_queue.push(package.clone(), reason) {
        projected.apply_install(package);
    }
}

fn queue_remove_and_project(
    remove_queue: &mut Queue,
    projected: &mut ProjectedStore,
    package: Package,
    reason: Reason,
) {
    if remove_queue.push(package.clone(), reason) {
        projected.apply_remove(&package);
    }
}

/// Swallow `Error::EmptyArray`, a store's "legitimately no matches" signal,
/// while letting any other store error propagate.
fn collect_store_matches(
    stores: &[Arc<dyn Store>],
    query: impl Fn(&Arc<dyn Store>) -> zif_store::Result<Vec<Package>>,
) -> Result<Vec<Package>> {
    let mut out = Vec::new();
    for store in stores {
        match query(store) {
            Ok(found) => out.extend(found),
            Err(zif_store::Error::EmptyArray) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(out)
}

// --- Install resolution (one queued install candidate) ------------------

#[allow(clippy::too_many_arguments)]
fn resolve_install_item(
    config: &Config,
    native_arch: &Arch,
    stores_remote: &[Arc<dyn Store>],
    install_queue: &mut Queue,
    remove_queue: &mut Queue,
    projected: &mut ProjectedStore,
    package: &Package,
    reason: Reason,
    related: &mut Vec<Package>,
) -> Result<ItemOutcome> {
    if config.is_excluded(package.name()) {
        return Err(Error::Failed(format!("{} is excluded from this transaction", package.name())));
    }

    // install-only-n: evict the oldest once the limit would be exceeded.
    let (name, arch) = package.name_arch_key();
    let limit = if config.is_installonly(&name) { config.installonly_limit } else { 1 };
    let mode = compare_mode(config);
    let mut existing: Vec<Package> = projected.by_name_arch(&name, &arch).into_iter().cloned().collect();
    if existing.len() as u32 >= limit {
        existing.sort_by(|a, b| Package::compare(a, b, mode));
        if let Some(oldest) = existing.into_iter().next() {
            if &oldest == package {
                return Ok(ItemOutcome::Drop);
            }
            queue_remove_and_project(remove_queue, projected, oldest.clone(), onlyn_remove_reason(reason));
            related.push(oldest);
        }
    }

    // requires: each must already be queued, already projected, or found
    // from a remote store and queued alongside this item.
    for dep in package.requires()?.iter() {
        if dep.is_rpmlib() {
            continue;
        }

        let mut satisfied = false;
        for item in install_queue.iter() {
            if Package::any_satisfies(&effective_provides(&item.package)?, dep) {
                satisfied = true;
                break;
            }
        }
        if !satisfied && projected.provides(dep)?.is_some() {
            satisfied = true;
        }
        if satisfied {
            continue;
        }

        let candidates = collect_store_matches(stores_remote, |store| store.what_provides(std::slice::from_ref(dep)))?;
        if candidates.is_empty() {
            return Err(Error::Failed(format!(
                "unsatisfied require `{dep}` of {}",
                package.nevra()
            )));
        }
        let installed_snapshot = projected.packages().to_vec();
        let provider = best_provider(&candidates, package, dep, &installed_snapshot, config, native_arch)?
            .ok_or_else(|| Error::Failed(format!("no architecture-compatible provider for `{dep}`")))?;

        if projected.packages().iter().any(|p| p == &provider) {
            continue;
        }

        let (provider_name, provider_arch) = provider.name_arch_key();
        if let Some(older) = projected
            .by_name_arch(&provider_name, &provider_arch)
            .into_iter()
            .find(|p| **p != provider)
            .cloned()
        {
            let remove_reason = if Package::compare(&provider, &older, mode) == std::cmp::Ordering::Less {
                Reason::DowngradeForDep
            } else {
                Reason::RemoveForUpdate
            };
            queue_remove_and_project(remove_queue, projected, older.clone(), remove_reason);
            related.push(older);
        }

        queue_install_and_project(install_queue, projected, provider.clone(), provider_reason(reason));
        related.push(provider);
    }

    // obsoletes: anything the projected store holds that this package
    // obsoletes gets queued for removal (obsoleting oneself is ignored).
    for obsolete in package.obsoletes()?.iter() {
        if let Some(victim) = projected.provides(obsolete)? {
            if victim != *package {
                queue_remove_and_project(remove_queue, projected, victim.clone(), Reason::RemoveObsolete);
                related.push(victim);
            }
        }
    }

    Ok(ItemOutcome::Done)
}

fn phase_install(
    tx: &mut Transaction,
    projected: &mut ProjectedStore,
    progress: &Arc<zif_progress::State>,
) -> Result<bool> {
    let Some(idx) = tx.install.first_unresolved() else {
        return Ok(false);
    };
    let item = tx.install.get(idx).expect("index came from first_unresolved");
    let package = item.package.clone();
    let reason = item.reason;

    let mut related = Vec::new();
    let outcome = resolve_install_item(
        &tx.config,
        &tx.native_arch,
        &tx.stores_remote,
        &mut tx.install,
        &mut tx.remove,
        projected,
        &package,
        reason,
        &mut related,
    );
    apply_item_outcome(&mut tx.install, idx, outcome, related, tx.config.skip_broken)?;
    report_step(progress, 1)?;
    Ok(true)
}

// --- Update resolution ----------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn resolve_update_item(
    config: &Config,
    native_arch: &Arch,
    stores_remote: &[Arc<dyn Store>],
    install_queue: &mut Queue,
    remove_queue: &mut Queue,
    projected: &mut ProjectedStore,
    package: &Package,
    reason: Reason,
    related: &mut Vec<Package>,
) -> Result<ItemOutcome> {
    let mode = compare_mode(config);

    let obsolete_trigger = Depend::new(package.name(), DependFlag::GREATER_OR_EQUAL, package.evr().to_string());
    let obsoleters =
        collect_store_matches(stores_remote, |store| store.what_obsoletes(std::slice::from_ref(&obsolete_trigger)))?;
    if let Some(chosen) = obsoleters.into_iter().max_by(|a, b| Package::compare(a, b, mode)) {
        queue_remove_and_project(remove_queue, projected, package.clone(), Reason::RemoveObsolete);
        related.push(package.clone());
        queue_install_and_project(install_queue, projected, chosen.clone(), reason);
        related.push(chosen);
        return Ok(ItemOutcome::Done);
    }

    let candidates = collect_store_matches(stores_remote, |store| {
        store.resolve(&[package.name().to_string()], zif_store::ResolveFlags::NAME, native_arch)
    })?;
    let mut compatible: Vec<Package> =
        candidates.into_iter().filter(|p| p.arch().is_compatible_with(package.arch())).collect();
    if compatible.is_empty() {
        return Ok(ItemOutcome::Drop);
    }
    compatible.sort_by(|a, b| {
        Package::compare(a, b, mode).then_with(|| a.arch().i386_preference_bonus().cmp(&b.arch().i386_preference_bonus()))
    });
    let Some(newest) = compatible.into_iter().next_back() else {
        return Ok(ItemOutcome::Drop);
    };
    if Package::compare(&newest, package, mode) != std::cmp::Ordering::Greater {
        return Ok(ItemOutcome::Drop);
    }

    let limit = if config.is_installonly(package.name()) { config.installonly_limit } else { 1 };
    if limit <= 1 {
        queue_remove_and_project(remove_queue, projected, package.clone(), Reason::RemoveForUpdate);
        related.push(package.clone());
    }
    queue_install_and_project(install_queue, projected, newest.clone(), Reason::InstallForUpdate);
    related.push(newest);
    Ok(ItemOutcome::Done)
}

fn phase_update(
    tx: &mut Transaction,
    projected: &mut ProjectedStore,
    progress: &Arc<zif_progress::State>,
) -> Result<bool> {
    let Some(idx) = tx.update.first_unresolved() else {
        return Ok(false);
    };
    let item = tx.update.get(idx).expect("index came from first_unresolved");
    let package = item.package.clone();
    let reason = item.reason;

    let mut related = Vec::new();
    let outcome = resolve_update_item(
        &tx.config,
        &tx.native_arch,
        &tx.stores_remote,
        &mut tx.install,
        &mut tx.remove,
        projected,
        &package,
        reason,
        &mut related,
    );
    apply_item_outcome(&mut tx.update, idx, outcome, related, tx.config.skip_broken)?;
    report_step(progress, 2)?;
    Ok(true)
}

// --- Remove resolution ------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn resolve_remove_item(
    config: &Config,
    native_arch: &Arch,
    stores_remote: &[Arc<dyn Store>],
    install_queue: &mut Queue,
    remove_queue: &mut Queue,
    projected: &mut ProjectedStore,
    package: &Package,
    reason: Reason,
    related: &mut Vec<Package>,
) -> Result<ItemOutcome> {
    let queued_installs: Vec<Package> = install_queue.iter().map(|item| item.package.clone()).collect();
    let requirers = projected.sole_requirers_of(package, &queued_installs)?;

    for requirer in requirers {
        if reason == Reason::RemoveForUpdate {
            let mut scratch = Vec::new();
            let outcome = resolve_update_item(
                config,
                native_arch,
                stores_remote,
                install_queue,
                remove_queue,
                projected,
                &requirer,
                Reason::UpdateDepend,
                &mut scratch,
            );
            if let Ok(ItemOutcome::Done) = outcome {
                related.extend(scratch);
                related.push(requirer);
            }
            // nothing-to-do (and any other failure) is tolerated here: the
            // originating removal still proceeds.
        } else if reason.is_downgrade() {
            queue_remove_and_project(remove_queue, projected, requirer.clone(), Reason::DowngradeForDep);
            related.push(requirer);
        } else {
            queue_remove_and_project(remove_queue, projected, requirer.clone(), Reason::RemoveForDep);
            related.push(requirer);
        }
    }

    Ok(ItemOutcome::Done)
}

fn phase_remove(
    tx: &mut Transaction,
    projected: &mut ProjectedStore,
    progress: &Arc<zif_progress::State>,
) -> Result<bool> {
    let Some(idx) = tx.remove.first_unresolved() else {
        return Ok(false);
    };
    let item = tx.remove.get(idx).expect("index came from first_unresolved");
    let package = item.package.clone();
    let reason = item.reason;

    let mut related = Vec::new();
    let outcome = resolve_remove_item(
        &tx.config,
        &tx.native_arch,
        &tx.stores_remote,
        &mut tx.install,
        &mut tx.remove,
        projected,
        &package,
        reason,
        &mut related,
    );
    apply_item_outcome(&mut tx.remove, idx, outcome, related, tx.config.skip_broken)?;
    report_step(progress, 1)?;
    Ok(true)
}

// --- Conflict checking -------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn check_conflicts(
    config: &Config,
    native_arch: &Arch,
    stores_remote: &[Arc<dyn Store>],
    install_queue: &mut Queue,
    remove_queue: &mut Queue,
    projected: &mut ProjectedStore,
    package: &Package,
    related: &mut Vec<Package>,
) -> Result<()> {
    for provide in effective_provides(package)? {
        for other in projected.packages() {
            if other == package {
                continue;
            }
            if Package::any_satisfies(&other.conflicts()?, &provide) {
                return Err(Error::Conflicting(format!("{} conflicted by {}", package.nevra(), other.nevra())));
            }
        }
    }

    for conflict in package.conflicts()?.iter() {
        let Some(victim) = projected.provides(conflict)? else {
            continue;
        };
        if victim == *package {
            continue;
        }
        let mut scratch = Vec::new();
        let outcome = resolve_update_item(
            config,
            native_arch,
            stores_remote,
            install_queue,
            remove_queue,
            projected,
            &victim,
            Reason::UpdateForConflict,
            &mut scratch,
        );
        match outcome {
            Ok(ItemOutcome::Done) => {
                related.extend(scratch);
                related.push(victim);
            }
            _ => {
                return Err(Error::Conflicting(format!(
                    "{} conflicts with installed {}",
                    package.nevra(),
                    victim.nevra()
                )));
            }
        }
    }

    Ok(())
}

fn phase_conflicts(tx: &mut Transaction, projected: &mut ProjectedStore) -> Result<bool> {
    let Some(idx) = tx.install.first_unchecked_for_conflicts() else {
        return Ok(false);
    };
    let package = tx.install.get(idx).expect("index came from first_unchecked_for_conflicts").package.clone();

    let mut related = Vec::new();
    let outcome = check_conflicts(
        &tx.config,
        &tx.native_arch,
        &tx.stores_remote,
        &mut tx.install,
        &mut tx.remove,
        projected,
        &package,
        &mut related,
    );
    match outcome {
        Ok(()) => {
            if let Some(item) = tx.install.get_mut(idx) {
                item.conflict_checked = true;
                item.related.extend(related);
            }
        }
        Err(e) => {
            if tx.config.skip_broken {
                if let Some(item) = tx.install.get_mut(idx) {
                    item.related.extend(related);
                }
                tx.install.cancel(idx);
            } else {
                return Err(e);
            }
        }
    }
    Ok(true)
}

/// Apply an install/update/remove item's resolution result to its queue:
/// `Done` marks it resolved, `Drop` removes it outright (the "nothing to
/// do at item level" case), and a failure either cancels it (plus its
/// related packages) under `skip_broken` or propagates.
fn apply_item_outcome(
    queue: &mut Queue,
    idx: usize,
    outcome: Result<ItemOutcome>,
    related: Vec<Package>,
    skip_broken: bool,
) -> Result<()> {
    match outcome {
        Ok(ItemOutcome::Done) => {
            if let Some(item) = queue.get_mut(idx) {
                item.resolved = true;
                item.related = related;
            }
            Ok(())
        }
        Ok(ItemOutcome::Drop) => {
            queue.remove_at(idx);
            Ok(())
        }
        Err(e) => {
            if skip_broken {
                if let Some(item) = queue.get_mut(idx) {
                    item.related = related;
                }
                queue.cancel(idx);
                Ok(())
            } else {
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use zif_core::Origin;
    use zif_store::MetaStore;

    fn pkg(name: &str, version: &str, arch: &str) -> Package {
        Package::new(name, 0, version, "1", Arch::new(arch), Origin::Meta)
    }

    fn new_tx(local: Vec<Package>, remote: Vec<Package>) -> Transaction {
        let local_store: Arc<dyn Store> = Arc::new(MetaStore::new("installed", local));
        let remote_store: Arc<dyn Store> = Arc::new(MetaStore::new("base", remote));
        Transaction::new(local_store, vec![remote_store], Config::default(), Arch::new("x86_64"), 0, "test")
    }

    #[test]
    fn simple_install_with_no_deps_resolves() {
        let mut tx = new_tx(vec![], vec![]);
        tx.add_install(pkg("hello", "1.0", "x86_64"), Reason::InstallUserAction).unwrap();
        let progress = zif_progress::State::new(tx.progress_budget());
        tx.resolve(&progress).unwrap();
        assert_eq!(tx.state(), TxState::Resolved);
        assert_eq!(tx.install_set().len(), 1);
    }

    #[test]
    fn install_pulls_in_unmet_require_from_remote() {
        let libx = pkg("libx", "1.0", "x86_64");
        libx.set_provides(vec![Depend::unconstrained("libx")]).unwrap();
        let app = pkg("app", "1.0", "x86_64");
        app.set_requires(vec![Depend::unconstrained("libx")]).unwrap();

        let mut tx = new_tx(vec![], vec![libx.clone()]);
        tx.add_install(app, Reason::InstallUserAction).unwrap();
        let progress = zif_progress::State::new(tx.progress_budget().max(1) + 1);
        tx.resolve(&progress).unwrap();

        let names: Vec<&str> = tx.install_set().iter().map(Package::name).collect();
        assert!(names.contains(&"libx"));
        assert!(names.contains(&"app"));
    }

    #[test]
    fn unsatisfiable_require_fails_without_skip_broken() {
        let app = pkg("app", "1.0", "x86_64");
        app.set_requires(vec![Depend::unconstrained("missing-lib")]).unwrap();
        let mut tx = new_tx(vec![], vec![]);
        tx.add_install(app, Reason::InstallUserAction).unwrap();
        let progress = zif_progress::State::new(tx.progress_budget().max(1));
        assert!(tx.resolve(&progress).is_err());
    }

    #[test]
    fn unsatisfiable_require_is_cancelled_under_skip_broken() {
        let app = pkg("app", "1.0", "x86_64");
        app.set_requires(vec![Depend::unconstrained("missing-lib")]).unwrap();
        let local_store: Arc<dyn Store> = Arc::new(MetaStore::new("installed", vec![]));
        let remote_store: Arc<dyn Store> = Arc::new(MetaStore::new("base", vec![]));
        let mut config = Config::default();
        config.skip_broken = true;
        let mut tx = Transaction::new(local_store, vec![remote_store], config, Arch::new("x86_64"), 0, "test");
        tx.add_install(app, Reason::InstallUserAction).unwrap();
        let progress = zif_progress::State::new(tx.progress_budget().max(1));
        let err = tx.resolve(&progress).unwrap_err();
        assert!(matches!(err, Error::NothingToDo(_)));
    }

    #[test]
    fn remove_cascades_to_sole_requirer() {
        let libx = pkg("libx", "1.0", "x86_64");
        libx.set_provides(vec![Depend::unconstrained("libx")]).unwrap();
        let app = pkg("app", "1.0", "x86_64");
        app.set_requires(vec![Depend::unconstrained("libx")]).unwrap();

        let mut tx = new_tx(vec![libx.clone(), app.clone()], vec![]);
        tx.add_remove(libx, Reason::RemoveUserAction).unwrap();
        let progress = zif_progress::State::new(tx.progress_budget().max(1) + 1);
        tx.resolve(&progress).unwrap();

        let names: Vec<&str> = tx.remove_set().iter().map(Package::name).collect();
        assert!(names.contains(&"app"));
    }

    #[test]
    fn excluded_package_fails_resolution() {
        let mut config = Config::default();
        config.excludes.insert("banned".to_string());
        let local_store: Arc<dyn Store> = Arc::new(MetaStore::new("installed", vec![]));
        let remote_store: Arc<dyn Store> = Arc::new(MetaStore::new("base", vec![]));
        let mut tx = Transaction::new(local_store, vec![remote_store], config, Arch::new("x86_64"), 0, "test");
        tx.add_install(pkg("banned", "1.0", "x86_64"), Reason::InstallUserAction).unwrap();
        let progress = zif_progress::State::new(tx.progress_budget().max(1));
        assert!(tx.resolve(&progress).is_err());
    }
}
