//! The prepare phase: make sure every install candidate's artifact is
//! cached on disk, then classify its signature trust against the
//! keyring, importing more keys on a miss before giving up.

use crate::error::{Error, Result};
use crate::transaction::{Transaction, TxState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zif_core::{Origin, Package, TrustKind};
use zif_rpm::{classify, HeaderReader, Keyring, LookupOutcome};

/// One artifact `prepare` needs fetched before commit can proceed.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Repo id the artifact comes from.
    pub repo_id: String,
    /// The package's NEVRA, for logging/progress labels.
    pub nevra: String,
    /// Where the artifact should land once fetched.
    pub cache_path: PathBuf,
}

/// Fetches package artifacts and repo GPG keys during prepare. A real
/// binding drives a cache-aware HTTP client; `zif-transaction` only
/// depends on this trait, the same seam `zif-rpm`'s `TransactionSet`
/// draws around the RPM library.
pub trait DownloadEngine: std::fmt::Debug + Send + Sync {
    /// Fetch every requested artifact in one batch.
    fn fetch(&self, requests: &[DownloadRequest]) -> Result<()>;

    /// Fetch a repo's configured `gpgkey` URL content, if it has one.
    fn fetch_gpgkey(&self, repo_id: &str) -> Result<Option<Vec<u8>>>;
}

impl Transaction {
    /// Cache install artifacts and classify their signature trust.
    /// `gpg_key_dir` is the `/etc/pki/rpm-gpg/*`-equivalent directory
    /// swept once per transaction on a keyring miss.
    pub fn prepare(
        &mut self,
        headers: &Arc<dyn HeaderReader>,
        downloader: &Arc<dyn DownloadEngine>,
        keyring: &mut Keyring,
        gpg_key_dir: &Path,
    ) -> Result<()> {
        self.require_state(TxState::Resolved)?;

        let mut requests = Vec::new();
        for package in self.install.live_packages() {
            let Origin::Repo(repo_id) = package.origin() else {
                continue;
            };
            if package.cache_filename().is_none() {
                package.set_cache_filename(cache_filename(&package))?;
            }
            let cache_path = artifact_path(&package, &self.config);
            if !cache_path.exists() {
                requests.push(DownloadRequest {
                    repo_id: repo_id.clone(),
                    nevra: package.nevra(),
                    cache_path,
                });
            }
        }
        if !requests.is_empty() {
            downloader.fetch(&requests)?;
        }

        let mut swept_gpg_dir = false;
        for package in self.install.live_packages() {
            if !needs_signature_check(&package, &self.config) {
                continue;
            }
            let path = artifact_path(&package, &self.config);
            let Some(signature) = headers.read_signature(&path)? else {
                package.set_trust(TrustKind::None)?;
                continue;
            };
            package.set_signature_key_id(signature.key_id.clone())?;

            let mut outcome = classify(keyring, &signature);
            if outcome == LookupOutcome::Missing && !swept_gpg_dir {
                keyring.import_dir(gpg_key_dir)?;
                swept_gpg_dir = true;
                outcome = classify(keyring, &signature);
            }
            if outcome == LookupOutcome::Missing {
                if let Origin::Repo(repo_id) = package.origin() {
                    if let Some(key_bytes) = downloader.fetch_gpgkey(repo_id)? {
                        if keyring.add_key(&key_bytes).is_ok() {
                            outcome = classify(keyring, &signature);
                        }
                    }
                }
            }
            package.set_trust(outcome.trust_kind())?;
        }

        self.state = TxState::Prepared;
        Ok(())
    }
}

fn needs_signature_check(package: &Package, config: &zif_core::Config) -> bool {
    match package.origin() {
        Origin::Repo(_) => config.gpgcheck,
        Origin::LocalFile => config.localpkg_gpgcheck,
        Origin::Installed | Origin::Meta => false,
    }
}

fn cache_filename(package: &Package) -> String {
    format!("{}-{}-{}.{}.rpm", package.name(), package.version(), package.release(), package.arch().as_str())
}

pub(crate) fn artifact_path(package: &Package, config: &zif_core::Config) -> PathBuf {
    match package.cache_filename() {
        Some(name) => config.cachedir.join(name),
        None => config.cachedir.join(cache_filename(package)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use zif_core::{Arch, Config, Reason};
    use zif_store::{MetaStore, Store};
    use zif_rpm::HeaderSignature;

    #[derive(Debug)]
    struct NoSignature;
    impl HeaderReader for NoSignature {
        fn read_package(&self, _path: &Path) -> zif_rpm::Result<Package> {
            unimplemented!()
        }
        fn read_signature(&self, _path: &Path) -> zif_rpm::Result<Option<HeaderSignature>> {
            Ok(None)
        }
    }

    #[derive(Debug)]
    struct NeverFetches;
    impl DownloadEngine for NeverFetches {
        fn fetch(&self, requests: &[DownloadRequest]) -> Result<()> {
            for req in requests {
                if let Some(parent) = req.cache_path.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(&req.cache_path, b"fake rpm").unwrap();
            }
            Ok(())
        }
        fn fetch_gpgkey(&self, _repo_id: &str) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }
    }

    fn pkg(name: &str, origin: Origin) -> Package {
        Package::new(name, 0, "1.0", "1", Arch::new("x86_64"), origin)
    }

    #[test]
    fn meta_packages_skip_signature_check_and_download() {
        let local: Arc<dyn Store> = Arc::new(MetaStore::new("installed", vec![]));
        let mut tx = Transaction::new(local, vec![], Config::default(), Arch::new("x86_64"), 0, "test");
        tx.add_install(pkg("hello", Origin::Meta), Reason::InstallUserAction).unwrap();
        let progress = zif_progress::State::new(tx.progress_budget().max(1));
        tx.resolve(&progress).unwrap();

        let headers: Arc<dyn HeaderReader> = Arc::new(NoSignature);
        let downloader: Arc<dyn DownloadEngine> = Arc::new(NeverFetches);
        let mut keyring = Keyring::new();
        let dir = tempfile::tempdir().unwrap();
        tx.prepare(&headers, &downloader, &mut keyring, dir.path()).unwrap();
        assert_eq!(tx.state(), TxState::Prepared);
    }

    #[test]
    fn remote_install_downloads_missing_artifact() {
        let local: Arc<dyn Store> = Arc::new(MetaStore::new("installed", vec![]));
        let mut config = Config::default();
        let cachedir = tempfile::tempdir().unwrap();
        config.cachedir = cachedir.path().to_path_buf();
        config.gpgcheck = false;
        let mut tx = Transaction::new(local, vec![], config, Arch::new("x86_64"), 0, "test");
        tx.add_install(pkg("hello", Origin::Repo("base".to_string())), Reason::InstallUserAction).unwrap();
        let progress = zif_progress::State::new(tx.progress_budget().max(1));
        tx.resolve(&progress).unwrap();

        let headers: Arc<dyn HeaderReader> = Arc::new(NoSignature);
        let downloader: Arc<dyn DownloadEngine> = Arc::new(NeverFetches);
        let mut keyring = Keyring::new();
        let dir = tempfile::tempdir().unwrap();
        tx.prepare(&headers, &downloader, &mut keyring, dir.path()).unwrap();

        let installed = tx.install_set();
        let cached = artifact_path(&installed[0], &tx.config);
        assert!(cached.exists());
    }
}
