//! The `Store` trait contract: a variant-agnostic interface
//! the engine never downcasts. `InMemoryStoreBase` gives every concrete
//! store a default in-memory implementation of everything but `load`:
//! a trait with default implementations that iterate the in-memory
//! package list, where concrete stores override only the hooks they
//! need (`load`, `get_id`, specific search shortcuts).

use crate::error::{Error, Result};
use crate::flags::ResolveFlags;
use crate::id::package_id_hash;
use crate::package_array::PackageArrayExt;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use zif_core::{Arch, Depend, Package};

/// A loaded, queryable collection of packages.
///
/// Implementations provide `id`, `load`, `unload`, `is_loaded`, and
/// `packages`; every other method has a default that filters/searches
/// the in-memory list `packages()` returns, so the engine can treat
/// `LocalStore`, `RemoteStore`, and `MetaStore` uniformly.
pub trait Store: std::fmt::Debug + Send + Sync {
    /// A short identifier (e.g. a repo id, or `"installed"` for the
    /// local store).
    fn id(&self) -> &str;

    /// Populate the in-memory package list. Idempotent: a second call
    /// after a successful load is a no-op until `unload` resets the
    /// single-shot guard.
    fn load(&self) -> Result<()>;

    /// Reset the loaded guard so the next `load` call repopulates the
    /// list (needed after a repository refresh).
    fn unload(&self);

    /// Has `load` succeeded since the last `unload`?
    fn is_loaded(&self) -> bool;

    /// The current in-memory package list. Implementations should
    /// return `Error::Offline`/`Error::Failed` rather than an empty
    /// list if `load` has not yet succeeded, so callers can tell "not
    /// loaded" apart from "legitimately empty".
    fn packages(&self) -> Result<Vec<Package>>;

    /// Look up by name with the given match strategy. With
    /// [`ResolveFlags::PREFER_NATIVE`], bare names are first searched
    /// suffixed with the native arch; if that yields nothing, the
    /// search is repeated without the suffix.
    fn resolve(&self, names: &[String], flags: ResolveFlags, native_arch: &Arch) -> Result<Vec<Package>> {
        let packages = self.packages()?;
        let mut matches = Vec::new();
        for name in names {
            let mut found = if flags.contains(ResolveFlags::PREFER_NATIVE) {
                let suffixed = format!("{name}.{}", native_arch.as_str());
                let with_suffix = resolve_name(&packages, &suffixed, flags);
                if with_suffix.is_empty() {
                    resolve_name(&packages, name, flags)
                } else {
                    with_suffix
                }
            } else {
                resolve_name(&packages, name, flags)
            };
            matches.append(&mut found);
        }
        let matches = matches.as_slice().duplicates_removed();
        if matches.is_empty() {
            return Err(Error::EmptyArray);
        }
        Ok(matches)
    }

    /// O(1)-by-hash lookup of one package by its `package_id_hash`.
    fn find_package(&self, id_hash: &str) -> Result<Package> {
        let packages = self.packages()?;
        let mut matches = packages
            .into_iter()
            .filter(|p| package_id_hash(p) == id_hash);
        let first = matches.next().ok_or_else(|| Error::NotFound(id_hash.to_string()))?;
        if matches.next().is_some() {
            return Err(Error::MultipleMatches(id_hash.to_string()));
        }
        Ok(first)
    }

    /// All packages whose provides satisfy any of `depends`, deduplicated.
    fn what_provides(&self, depends: &[Depend]) -> Result<Vec<Package>> {
        self.what_matching(depends, |p| p.provides())
    }

    /// All packages whose requires match any of `depends`, deduplicated.
    fn what_requires(&self, depends: &[Depend]) -> Result<Vec<Package>> {
        self.what_matching(depends, |p| p.requires())
    }

    /// All packages whose conflicts match any of `depends`, deduplicated.
    fn what_conflicts(&self, depends: &[Depend]) -> Result<Vec<Package>> {
        self.what_matching(depends, |p| p.conflicts())
    }

    /// All packages whose obsoletes match any of `depends`, deduplicated.
    fn what_obsoletes(&self, depends: &[Depend]) -> Result<Vec<Package>> {
        self.what_matching(depends, |p| p.obsoletes())
    }

    /// Default `what_*` implementation: scan every package's named
    /// relation list for a depend satisfying any of `depends`.
    fn what_matching(
        &self,
        depends: &[Depend],
        relation: impl Fn(&Package) -> zif_core::Result<Arc<Vec<Depend>>>,
    ) -> Result<Vec<Package>> {
        let packages = self.packages()?;
        let mut out = Vec::new();
        for package in packages {
            let list = relation(&package)?;
            if depends.iter().any(|d| Package::any_satisfies(&list, d)) {
                out.push(package);
            }
        }
        let out = out.as_slice().duplicates_removed();
        if out.is_empty() {
            return Err(Error::EmptyArray);
        }
        Ok(out)
    }

    /// Every currently loaded package.
    fn get_packages(&self) -> Result<Vec<Package>> {
        self.packages()
    }

    /// Distinct non-empty category attributes across the store.
    fn get_categories(&self) -> Result<Vec<String>> {
        let packages = self.packages()?;
        let mut categories = Vec::new();
        for package in packages {
            if let Some(category) = package.category()? {
                if !categories.contains(&category) {
                    categories.push(category);
                }
            }
        }
        Ok(categories)
    }

    /// Substring search over package names.
    fn search_name(&self, terms: &[String]) -> Result<Vec<Package>> {
        self.search_by(terms, |p, term| p.name().contains(term))
    }

    /// Substring search over summary/description.
    fn search_details(&self, terms: &[String]) -> Result<Vec<Package>> {
        let packages = self.packages()?;
        let mut out = Vec::new();
        for package in packages {
            let summary = package.summary()?.unwrap_or_default();
            let description = package.description()?.unwrap_or_default();
            if terms
                .iter()
                .any(|t| summary.contains(t.as_str()) || description.contains(t.as_str()))
            {
                out.push(package);
            }
        }
        if out.is_empty() {
            return Err(Error::EmptyArray);
        }
        Ok(out)
    }

    /// Exact-match search over the category attribute.
    fn search_category(&self, terms: &[String]) -> Result<Vec<Package>> {
        let packages = self.packages()?;
        let mut out = Vec::new();
        for package in packages {
            if let Some(category) = package.category()? {
                if terms.iter().any(|t| t == &category) {
                    out.push(package);
                }
            }
        }
        if out.is_empty() {
            return Err(Error::EmptyArray);
        }
        Ok(out)
    }

    /// Exact-match search over the group attribute.
    fn search_group(&self, terms: &[String]) -> Result<Vec<Package>> {
        let packages = self.packages()?;
        let mut out = Vec::new();
        for package in packages {
            if let Some(group) = package.group()? {
                if terms.iter().any(|t| t == &group) {
                    out.push(package);
                }
            }
        }
        if out.is_empty() {
            return Err(Error::EmptyArray);
        }
        Ok(out)
    }

    /// Search the installed file list for an exact path match.
    fn search_file(&self, terms: &[String]) -> Result<Vec<Package>> {
        let packages = self.packages()?;
        let mut out = Vec::new();
        for package in &packages {
            if let Some(files) = package.files()? {
                if terms.iter().any(|t| files.iter().any(|f| f == t)) {
                    out.push(package.clone());
                }
            }
        }
        if out.is_empty() {
            return Err(Error::EmptyArray);
        }
        Ok(out)
    }

    /// Shared substring-search helper for the simple name-like searches.
    fn search_by(&self, terms: &[String], predicate: impl Fn(&Package, &str) -> bool) -> Result<Vec<Package>> {
        let packages = self.packages()?;
        let mut out = Vec::new();
        for package in packages {
            if terms.iter().any(|t| predicate(&package, t)) {
                out.push(package);
            }
        }
        if out.is_empty() {
            return Err(Error::EmptyArray);
        }
        Ok(out)
    }
}

fn resolve_name(packages: &[Package], name: &str, flags: ResolveFlags) -> Vec<Package> {
    packages
        .iter()
        .filter(|p| match_name(p, name, flags))
        .cloned()
        .collect()
}

fn match_name(package: &Package, name: &str, flags: ResolveFlags) -> bool {
    if flags.contains(ResolveFlags::GLOB) {
        return glob_match(name, package.name());
    }
    if flags.contains(ResolveFlags::REGEX) {
        return regex_lite_match(name, package.name());
    }
    if flags.contains(ResolveFlags::NAME_VERSION_ARCH) {
        if let Some((n, v, a)) = split_name_version_arch(name) {
            return package.name() == n && package.version() == v && package.arch().as_str() == a;
        }
    }
    if flags.contains(ResolveFlags::NAME_VERSION) {
        if let Some((n, v)) = name.rsplit_once('-') {
            return package.name() == n && package.version() == v;
        }
    }
    if flags.contains(ResolveFlags::NAME_ARCH) {
        if let Some((n, a)) = name.rsplit_once('.') {
            return package.name() == n && package.arch().as_str() == a;
        }
    }
    package.name() == name
}

fn split_name_version_arch(name: &str) -> Option<(&str, &str, &str)> {
    let (rest, arch) = name.rsplit_once('.')?;
    let (n, v) = rest.rsplit_once('-')?;
    Some((n, v, arch))
}

/// Minimal `*`/`?` glob matcher, enough for package-name patterns; not a
/// general-purpose glob engine.
fn glob_match(pattern: &str, text: &str) -> bool {
    fn recurse(pattern: &[u8], text: &[u8]) -> bool {
        match pattern.first() {
            None => text.is_empty(),
            Some(b'*') => {
                (0..=text.len()).any(|i| recurse(&pattern[1..], &text[i..]))
            }
            Some(b'?') => !text.is_empty() && recurse(&pattern[1..], &text[1..]),
            Some(&c) => !text.is_empty() && text[0] == c && recurse(&pattern[1..], &text[1..]),
        }
    }
    recurse(pattern.as_bytes(), text.as_bytes())
}

/// Fallback regex-style match for the subset of anchors a repo query
/// typically needs (`^`, `$`), avoiding a full regex dependency in this
/// crate's default search path.
fn regex_lite_match(pattern: &str, text: &str) -> bool {
    let anchored_start = pattern.starts_with('^');
    let anchored_end = pattern.ends_with('$');
    let core = pattern
        .trim_start_matches('^')
        .trim_end_matches('$');
    match (anchored_start, anchored_end) {
        (true, true) => text == core,
        (true, false) => text.starts_with(core),
        (false, true) => text.ends_with(core),
        (false, false) => text.contains(core),
    }
}

/// A default in-memory store body: a single-shot `loaded` guard around a
/// `RwLock<Vec<Package>>`, embedded by `LocalStore`/`RemoteStore`/
/// `MetaStore`. `unload` resets the guard so a later `load` repopulates
/// instead of silently no-op'ing forever.
#[derive(Debug, Default)]
pub struct InMemoryStoreBase {
    loaded: AtomicBool,
    packages: RwLock<Vec<Package>>,
}

impl InMemoryStoreBase {
    /// An empty, not-yet-loaded base.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Is the single-shot load guard set?
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Reset the guard so a subsequent `load_with` call repopulates.
    pub fn unload(&self) {
        self.loaded.store(false, Ordering::SeqCst);
        self.packages.write().clear();
    }

    /// The current package list, cloned.
    #[must_use]
    pub fn packages(&self) -> Vec<Package> {
        self.packages.read().clone()
    }

    /// Run `loader` once unless already loaded, storing its result.
    pub fn load_with(&self, loader: impl FnOnce() -> Result<Vec<Package>>) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }
        let packages = loader()?;
        *self.packages.write() = packages;
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Directly seed the package list and mark loaded, bypassing a
    /// loader closure (used by [`crate::MetaStore`]).
    pub fn seed(&self, packages: Vec<Package>) {
        *self.packages.write() = packages;
        self.loaded.store(true, Ordering::SeqCst);
    }
}

/// A trait a local rpmdb reader implements to back [`LocalStore::load`].
/// Kept separate from `zif-rpm` to avoid a dependency cycle; `zif-rpm`
/// implements this trait and the transaction-engine wiring injects it.
pub trait LocalLoader: std::fmt::Debug + Send + Sync {
    /// Read every currently installed package from the rpmdb rooted at
    /// `prefix`.
    fn load_installed(&self, prefix: &std::path::Path) -> Result<Vec<Package>>;
}

/// The store backed by the local rpmdb: `Origin::Installed` packages
/// rooted at a configurable prefix.
#[derive(Debug)]
pub struct LocalStore {
    prefix: std::path::PathBuf,
    base: InMemoryStoreBase,
    loader: Arc<dyn LocalLoader>,
}

impl LocalStore {
    /// Construct a local store rooted at `prefix`, backed by `loader`.
    #[must_use]
    pub fn new(prefix: impl Into<std::path::PathBuf>, loader: Arc<dyn LocalLoader>) -> Self {
        Self {
            prefix: prefix.into(),
            base: InMemoryStoreBase::new(),
            loader,
        }
    }
}

impl Store for LocalStore {
    fn id(&self) -> &str {
        "installed"
    }

    fn load(&self) -> Result<()> {
        let prefix = self.prefix.clone();
        let loader = Arc::clone(&self.loader);
        self.base.load_with(|| loader.load_installed(&prefix))
    }

    fn unload(&self) {
        self.base.unload();
    }

    fn is_loaded(&self) -> bool {
        self.base.is_loaded()
    }

    fn packages(&self) -> Result<Vec<Package>> {
        if !self.base.is_loaded() {
            return Err(Error::Failed("local store not loaded".to_string()));
        }
        Ok(self.base.packages())
    }
}

/// A trait a repository metadata backend implements to back
/// [`RemoteStore::load`] (the "metadata parser" consumed interface).
pub trait RemoteLoader: std::fmt::Debug + Send + Sync {
    /// Fetch (from cache or network, per repo refresh policy) the
    /// current package list for `repo_id`.
    fn load_repo(&self, repo_id: &str) -> Result<Vec<Package>>;
}

/// A store backed by a refreshed repository's primary/filelists cache.
#[derive(Debug)]
pub struct RemoteStore {
    repo_id: String,
    base: InMemoryStoreBase,
    loader: Arc<dyn RemoteLoader>,
}

impl RemoteStore {
    /// Construct a remote store for `repo_id`, backed by `loader`.
    #[must_use]
    pub fn new(repo_id: impl Into<String>, loader: Arc<dyn RemoteLoader>) -> Self {
        Self {
            repo_id: repo_id.into(),
            base: InMemoryStoreBase::new(),
            loader,
        }
    }
}

impl Store for RemoteStore {
    fn id(&self) -> &str {
        &self.repo_id
    }

    fn load(&self) -> Result<()> {
        let repo_id = self.repo_id.clone();
        let loader = Arc::clone(&self.loader);
        let result = self.base.load_with(|| loader.load_repo(&repo_id));
        if let Err(err) = &result {
            debug!(repo = %self.repo_id, error = %err, "remote store load failed");
        }
        result
    }

    fn unload(&self) {
        self.base.unload();
    }

    fn is_loaded(&self) -> bool {
        self.base.is_loaded()
    }

    fn packages(&self) -> Result<Vec<Package>> {
        if !self.base.is_loaded() {
            return Err(Error::Offline);
        }
        Ok(self.base.packages())
    }
}

/// An in-memory store built directly from a package list, used by the
/// manifest test harness.
#[derive(Debug)]
pub struct MetaStore {
    id: String,
    base: InMemoryStoreBase,
}

impl MetaStore {
    /// Build a meta store pre-seeded with `packages`.
    #[must_use]
    pub fn new(id: impl Into<String>, packages: Vec<Package>) -> Self {
        let base = InMemoryStoreBase::new();
        base.seed(packages);
        Self { id: id.into(), base }
    }

    /// Replace the store's package list in place, for callers (the
    /// manifest runner) that mutate a virtual local store to reflect a
    /// committed transaction themselves, since no real rpmdb is backing it.
    pub fn reseed(&self, packages: Vec<Package>) {
        self.base.seed(packages);
    }
}

impl Store for MetaStore {
    fn id(&self) -> &str {
        &self.id
    }

    fn load(&self) -> Result<()> {
        Ok(())
    }

    fn unload(&self) {
        self.base.unload();
    }

    fn is_loaded(&self) -> bool {
        self.base.is_loaded()
    }

    fn packages(&self) -> Result<Vec<Package>> {
        Ok(self.base.packages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zif_core::{Arch, Origin};

    fn pkg(name: &str) -> Package {
        Package::new(name, 0, "1.0", "1", Arch::new("x86_64"), Origin::Meta)
    }

    #[test]
    fn meta_store_resolve_by_name() {
        let store = MetaStore::new("test", vec![pkg("hello"), pkg("world")]);
        let matches = store
            .resolve(&["hello".to_string()], ResolveFlags::NAME, &Arch::new("x86_64"))
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name(), "hello");
    }

    #[test]
    fn resolve_empty_is_empty_array_error() {
        let store = MetaStore::new("test", vec![pkg("hello")]);
        let err = store
            .resolve(&["missing".to_string()], ResolveFlags::NAME, &Arch::new("x86_64"))
            .unwrap_err();
        assert!(matches!(err, Error::EmptyArray));
    }

    #[test]
    fn find_package_by_hash() {
        let p = pkg("hello");
        let hash = package_id_hash(&p);
        let store = MetaStore::new("test", vec![p]);
        let found = store.find_package(&hash).unwrap();
        assert_eq!(found.name(), "hello");
    }

    #[test]
    fn unload_resets_local_store_guard() {
        #[derive(Debug)]
        struct CountingLoader(std::sync::atomic::AtomicUsize);
        impl LocalLoader for CountingLoader {
            fn load_installed(&self, _prefix: &std::path::Path) -> Result<Vec<Package>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(vec![])
            }
        }
        let loader = Arc::new(CountingLoader(std::sync::atomic::AtomicUsize::new(0)));
        let store = LocalStore::new("/", loader.clone());
        store.load().unwrap();
        store.load().unwrap();
        assert_eq!(loader.0.load(Ordering::SeqCst), 1);
        store.unload();
        store.load().unwrap();
        assert_eq!(loader.0.load(Ordering::SeqCst), 2);
    }
}
