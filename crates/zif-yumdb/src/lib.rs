//! A filesystem key/value store, one directory per installed package.
//! Writes are single-file and not atomic; callers accept best-effort
//! durability in exchange for a plain, dependency-free on-disk format.

#![warn(clippy::all)]

mod error;

pub use error::{Error, Result};

use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// The identity a yumdb entry is filed under:
/// `<root>/<shard>/<pkgid>-<name>-<version>-<arch>/`.
///
/// `pkgid` is expected to be the 40-hex-char `sha1` content hash Zif
/// uses elsewhere (e.g. `zif_store::package_id_hash`) so directory names
/// can be parsed back unambiguously even though `name` may itself
/// contain hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageKey {
    /// Content-hash pkgid.
    pub pkgid: String,
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Package architecture.
    pub arch: String,
}

const PKGID_LEN: usize = 40;

impl PackageKey {
    /// Build a package key.
    #[must_use]
    pub fn new(
        pkgid: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            pkgid: pkgid.into(),
            name: name.into(),
            version: version.into(),
            arch: arch.into(),
        }
    }

    fn shard(&self) -> char {
        self.name
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or('_')
    }

    fn dir_name(&self) -> String {
        format!("{}-{}-{}-{}", self.pkgid, self.name, self.version, self.arch)
    }

    fn parse_dir_name(dir_name: &str) -> Option<Self> {
        if dir_name.len() <= PKGID_LEN + 1 {
            return None;
        }
        let pkgid = &dir_name[..PKGID_LEN];
        let rest = dir_name.get(PKGID_LEN + 1..)?; // skip the separating '-'
        let (name_version, arch) = rest.rsplit_once('-')?;
        let (name, version) = name_version.rsplit_once('-')?;
        Some(Self::new(pkgid, name, version, arch))
    }

    /// Derive a key from a package's identity and its already-resolved
    /// `pkgid` attribute. Returns `None` if the package carries no pkgid
    /// yet (it has not been downloaded/hashed).
    pub fn from_package(package: &zif_core::Package) -> zif_core::Result<Option<Self>> {
        Ok(package.pkgid()?.map(|pkgid| {
            Self::new(pkgid, package.name(), package.version(), package.arch().as_str())
        }))
    }
}

/// The filesystem-backed yumdb store.
#[derive(Debug, Clone)]
pub struct YumdbStore {
    root: PathBuf,
}

impl YumdbStore {
    /// Open (without requiring it to exist yet) a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn package_dir(&self, pkg: &PackageKey) -> PathBuf {
        self.root.join(pkg.shard().to_string()).join(pkg.dir_name())
    }

    fn key_path(&self, pkg: &PackageKey, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.package_dir(pkg).join(key))
    }

    /// Write `value` under `pkg`'s directory at `key`, creating the
    /// directory tree if needed.
    pub fn set(&self, pkg: &PackageKey, key: &str, value: &[u8]) -> Result<()> {
        let path = self.key_path(pkg, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, value)?;
        trace!(pkgid = %pkg.pkgid, key, "yumdb set");
        Ok(())
    }

    /// Read the value at `key`, or `Error::NotFound` if absent.
    pub fn get(&self, pkg: &PackageKey, key: &str) -> Result<Vec<u8>> {
        let path = self.key_path(pkg, key)?;
        fs::read(&path).map_err(|source| map_not_found(source, &path))
    }

    /// Read the value at `key` as a UTF-8 string.
    pub fn get_string(&self, pkg: &PackageKey, key: &str) -> Result<String> {
        let bytes = self.get(pkg, key)?;
        String::from_utf8(bytes).map_err(|_| Error::InvalidValue(key.to_string()))
    }

    /// Remove one key. Removing an absent key is a no-op.
    pub fn remove(&self, pkg: &PackageKey, key: &str) -> Result<()> {
        let path = self.key_path(pkg, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Remove a package's entire directory.
    pub fn remove_all(&self, pkg: &PackageKey) -> Result<()> {
        let dir = self.package_dir(pkg);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// List the keys currently set for `pkg`.
    pub fn get_keys(&self, pkg: &PackageKey) -> Result<Vec<String>> {
        let dir = self.package_dir(pkg);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Every package currently filed under the store root, parsed back
    /// from the `<pkgid>-<name>-<version>-<arch>` directory naming.
    pub fn get_packages(&self) -> Result<Vec<PackageKey>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut packages = Vec::new();
        for shard_entry in fs::read_dir(&self.root)? {
            let shard_entry = shard_entry?;
            if !shard_entry.file_type()?.is_dir() {
                continue;
            }
            for pkg_entry in fs::read_dir(shard_entry.path())? {
                let pkg_entry = pkg_entry?;
                if !pkg_entry.file_type()?.is_dir() {
                    continue;
                }
                if let Some(name) = pkg_entry.file_name().to_str() {
                    if let Some(key) = PackageKey::parse_dir_name(name) {
                        packages.push(key);
                    }
                }
            }
        }
        Ok(packages)
    }

    /// The store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('/') || key == "." || key == ".." {
        return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn map_not_found(source: std::io::Error, path: &Path) -> Error {
    if source.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(path.display().to_string())
    } else {
        Error::Io(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PackageKey {
        PackageKey::new("a".repeat(40), "hello", "1.0-1", "x86_64")
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = YumdbStore::new(dir.path());
        store.set(&key(), "from_repo", b"base").unwrap();
        assert_eq!(store.get(&key(), "from_repo").unwrap(), b"base");
    }

    #[test]
    fn get_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = YumdbStore::new(dir.path());
        let err = store.get(&key(), "missing").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn remove_then_get_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = YumdbStore::new(dir.path());
        store.set(&key(), "reason", b"user").unwrap();
        store.remove(&key(), "reason").unwrap();
        assert!(matches!(store.get(&key(), "reason"), Err(Error::NotFound(_))));
    }

    #[test]
    fn remove_all_clears_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = YumdbStore::new(dir.path());
        store.set(&key(), "reason", b"user").unwrap();
        store.set(&key(), "from_repo", b"base").unwrap();
        store.remove_all(&key()).unwrap();
        assert_eq!(store.get_keys(&key()).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn get_keys_lists_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = YumdbStore::new(dir.path());
        store.set(&key(), "reason", b"user").unwrap();
        store.set(&key(), "from_repo", b"base").unwrap();
        assert_eq!(store.get_keys(&key()).unwrap(), vec!["from_repo", "reason"]);
    }

    #[test]
    fn get_packages_parses_sharded_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = YumdbStore::new(dir.path());
        store.set(&key(), "reason", b"user").unwrap();
        let packages = store.get_packages().unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "hello");
        assert_eq!(packages[0].version, "1.0-1");
        assert_eq!(packages[0].arch, "x86_64");
    }

    #[test]
    fn invalid_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = YumdbStore::new(dir.path());
        assert!(matches!(store.set(&key(), "../escape", b"x"), Err(Error::InvalidKey(_))));
    }
}
