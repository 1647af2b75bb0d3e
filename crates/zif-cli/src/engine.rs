//! Drives a single install/remove/update/downgrade transaction against a
//! world file's stores: resolve → prepare → commit, with a progress bar
//! and a real (file-based) rpmdb lock.

use crate::backend::{FileRpmDbLock, LocalDownloadEngine, NoopTransactionSet, UnimplementedHeaderReader};
use crate::commands::Cli;
use crate::progress;
use crate::world::{self, World};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use zif_core::{Arch, Config, Reason};
use zif_progress::State;
use zif_rpm::{HeaderReader, Keyring, RpmDbLock};
use zif_store::Store;
use zif_transaction::{DownloadEngine, Transaction, TransactionSummary};

#[derive(Debug, Clone, Copy)]
pub enum Action {
    Install,
    Remove,
    Update,
    Downgrade,
}

pub fn run_actions(cli: &Cli, action: Action, names: &[String]) -> Result<TransactionSummary> {
    let Some(world_path) = &cli.world else {
        bail!("this command requires --world <FILE> until a real rpmdb/repo backend is linked in");
    };
    let World { local, remotes } = world::load(world_path)?;

    let mut config = Config::default();
    config.prefix = cli.root.clone();
    config.releasever = cli.releasever.clone();
    config.gpgcheck = false;
    config.localpkg_gpgcheck = false;
    config.rpm_check_debug = false;

    let native_arch = Arch::new(std::env::consts::ARCH);
    let mut tx = Transaction::new(local.clone(), remotes.clone(), config, native_arch, current_uid(), cmdline());

    for name in names {
        let package = match action {
            Action::Remove => find_package(local.as_ref(), name)?,
            Action::Install | Action::Update | Action::Downgrade => find_in_any_remote(&remotes, name)?,
        };
        match action {
            Action::Install => tx.add_install(package, Reason::InstallUserAction)?,
            Action::Remove => tx.add_remove(package, Reason::RemoveUserAction)?,
            Action::Update => tx.add_update(package, Reason::UpdateUserAction)?,
            Action::Downgrade => tx.add_install(package, Reason::DowngradeUserAction)?,
        }
    }

    let resolve_progress = State::new(tx.progress_budget().max(1));
    progress::attach(&resolve_progress, cli.quiet);
    tx.resolve(&resolve_progress)?;

    let headers: Arc<dyn HeaderReader> = Arc::new(UnimplementedHeaderReader);
    let downloader: Arc<dyn DownloadEngine> = Arc::new(LocalDownloadEngine);
    let mut keyring = Keyring::new();
    let gpg_dir = cli.root.join("etc/pki/rpm-gpg");
    tx.prepare(&headers, &downloader, &mut keyring, &gpg_dir)?;

    let lock: Arc<dyn RpmDbLock> = Arc::new(FileRpmDbLock::new(&cli.root));
    let mut txset = NoopTransactionSet::default();
    let history_path = cli.root.join("var/lib/zif/history.sqlite");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let history = zif_history::HistoryStore::open(&history_path).context("opening history database")?;
    let yumdb = zif_yumdb::YumdbStore::new(cli.root.join("var/lib/zif/yumdb"));

    let commit_progress = State::new(1);
    progress::attach(&commit_progress, cli.quiet);
    // No header reader ever classifies a real signature yet (gpgcheck is
    // forced off above), so every install is "untrusted" by construction;
    // `-y`/`--assumeyes` is what lets the commit through.
    let summary = tx.commit(&lock, &mut txset, &history, &yumdb, &commit_progress, timestamp(), cli.assumeyes)?;
    Ok(summary)
}

fn find_in_any_remote(remotes: &[Arc<dyn Store>], name: &str) -> Result<zif_core::Package> {
    for store in remotes {
        if let Ok(package) = find_package(store.as_ref(), name) {
            return Ok(package);
        }
    }
    bail!("package '{name}' not found in any declared repo")
}

fn find_package(store: &dyn Store, name: &str) -> Result<zif_core::Package> {
    let packages = store.packages()?;
    packages.into_iter().find(|p| p.name() == name).with_context(|| format!("package '{name}' not found in store '{}'", store.id()))
}

fn current_uid() -> u32 {
    #[cfg(unix)]
    {
        rustix::process::getuid().as_raw()
    }
    #[cfg(not(unix))]
    {
        0
    }
}

fn cmdline() -> String {
    std::env::args().collect::<Vec<_>>().join(" ")
}

fn timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .try_into()
        .unwrap_or(i64::MAX)
}
