//! The `Package` identity model: immutable NEVRA identity plus lazily
//! populated attributes.

use crate::arch::Arch;
use crate::depend::Depend;
use crate::error::{Error, ErrorCode};
use crate::version::{compare_evr, Evr};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Where a package's metadata came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    /// Already installed in the local rpmdb.
    Installed,
    /// Available from the named remote repository id.
    Repo(String),
    /// A standalone `.rpm` file on disk.
    LocalFile,
    /// An in-memory package, used only by the manifest test harness.
    Meta,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed => write!(f, "installed"),
            Self::Repo(id) => write!(f, "repo:{id}"),
            Self::LocalFile => write!(f, "local-file"),
            Self::Meta => write!(f, "meta"),
        }
    }
}

/// Signature trust state, set during prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrustKind {
    /// Not yet evaluated.
    #[default]
    Unknown,
    /// Evaluated and found to carry no recognizable signature.
    None,
    /// Verified against an imported public key.
    Pubkey,
}

/// Which ordering a `Package::compare` call should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompareMode {
    /// Plain `(epoch, version, release)` ordering.
    #[default]
    Version,
    /// Distribution-version ordering: a synthetic "distribution" element,
    /// extracted from the release tag's trailing `.distN` component when
    /// present, takes precedence over the rest of the release comparison
    /// (original_source `zif-package.h`'s `ZIF_PACKAGE_COMPARE_MODE_DISTRO`).
    Distro,
}

/// Flags controlling `Package::compare_full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareFlags {
    /// Also require matching architecture.
    pub require_same_arch: bool,
}

/// A lazily-populated, write-once-per-value attribute slot: a dirty bit
/// forbids a second write with a different value.
#[derive(Debug, Default)]
struct Lazy<T: Clone + PartialEq> {
    value: Option<T>,
}

impl<T: Clone + PartialEq> Lazy<T> {
    fn get(&self) -> Option<T> {
        self.value.clone()
    }

    fn set(&mut self, attribute: &'static str, package: &str, value: T) -> Result<(), Error> {
        match &self.value {
            None => {
                self.value = Some(value);
                Ok(())
            }
            Some(existing) if *existing == value => Ok(()),
            Some(_) => Err(Error::DirtyAttribute {
                code: ErrorCode::E0102,
                attribute,
                package: package.to_string(),
            }),
        }
    }
}

/// Lazily populated attributes, guarded by one lock so `ensure` can
/// upgrade them without requiring `&mut Package`.
#[derive(Debug, Default)]
struct Attrs {
    summary: Lazy<String>,
    description: Lazy<String>,
    license: Lazy<String>,
    url: Lazy<String>,
    size: Lazy<u64>,
    category: Lazy<String>,
    group: Lazy<String>,
    files: Lazy<Arc<Vec<String>>>,
    requires: Lazy<Arc<Vec<Depend>>>,
    provides: Lazy<Arc<Vec<Depend>>>,
    conflicts: Lazy<Arc<Vec<Depend>>>,
    obsoletes: Lazy<Arc<Vec<Depend>>>,
    source_rpm: Lazy<String>,
    cache_filename: Lazy<String>,
    pkgid: Lazy<String>,
    signature_key_id: Lazy<String>,
    trust: Lazy<TrustKind>,
}

/// Trait a store implements to lazily populate a package's attributes on
/// first access. Default methods return
/// `not-supported` so a store only needs to override the hooks its
/// backing data can actually answer.
pub trait AttributeLoader: std::fmt::Debug + Send + Sync {
    /// Load any attribute not yet resolved. Implementations should be
    /// idempotent; `Package::ensure` calls this at most once per distinct
    /// attribute thanks to the dirty-bit cache.
    fn ensure(&self, package: &Package) -> Result<(), Error> {
        let _ = package;
        Err(Error::NotSupported {
            code: ErrorCode::E0103,
            what: "attribute loading".to_string(),
        })
    }
}

/// A package identity plus lazily populated attributes.
///
/// Identity (`name, epoch, version, release, arch, origin`) is immutable
/// once constructed. Attribute setters enforce a write-once-with-a-
/// consistent-value rule.
#[derive(Clone)]
pub struct Package {
    name: Arc<str>,
    epoch: u32,
    version: Arc<str>,
    release: Arc<str>,
    arch: Arch,
    origin: Origin,
    attrs: Arc<RwLock<Attrs>>,
    loader: Option<Arc<dyn AttributeLoader>>,
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("nevra", &self.nevra())
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl Package {
    /// Construct a package identity. Attributes are populated lazily.
    #[must_use]
    pub fn new(
        name: impl Into<Arc<str>>,
        epoch: u32,
        version: impl Into<Arc<str>>,
        release: impl Into<Arc<str>>,
        arch: Arch,
        origin: Origin,
    ) -> Self {
        Self {
            name: name.into(),
            epoch,
            version: version.into(),
            release: release.into(),
            arch,
            origin,
            attrs: Arc::new(RwLock::new(Attrs::default())),
            loader: None,
        }
    }

    /// Attach an attribute loader used by `ensure_*` accessors.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn AttributeLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Epoch (defaults to 0 when unspecified upstream).
    #[must_use]
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Upstream version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Packager release string.
    #[must_use]
    pub fn release(&self) -> &str {
        &self.release
    }

    /// Architecture.
    #[must_use]
    pub const fn arch(&self) -> &Arch {
        &self.arch
    }

    /// Origin of this package's metadata.
    #[must_use]
    pub const fn origin(&self) -> &Origin {
        &self.origin
    }

    /// The epoch/version/release triple used for ordering.
    #[must_use]
    pub fn evr(&self) -> Evr {
        Evr::new(self.epoch, self.version.to_string(), self.release.to_string())
    }

    /// `name-epoch:version-release.arch`, the canonical identity string
    /// used in logs, history rows, and the `package_id_hash` key.
    #[must_use]
    pub fn nevra(&self) -> String {
        if self.epoch != 0 {
            format!(
                "{}-{}:{}-{}.{}",
                self.name, self.epoch, self.version, self.release, self.arch
            )
        } else {
            format!("{}-{}-{}.{}", self.name, self.version, self.release, self.arch)
        }
    }

    /// The `(name, arch)` key used by install-only-n and resolve-by-name
    /// lookups.
    #[must_use]
    pub fn name_arch_key(&self) -> (String, String) {
        (self.name.to_string(), self.arch.as_str().to_string())
    }

    /// Compare two packages' EVR using the given mode.
    ///
    /// In [`CompareMode::Distro`] mode, a synthetic distribution element
    /// extracted from each release's trailing `.distN` tag (if present)
    /// is compared first; ties (or releases without a dist tag) fall back
    /// to the plain version comparison.
    #[must_use]
    pub fn compare(a: &Self, b: &Self, mode: CompareMode) -> Ordering {
        if mode == CompareMode::Distro {
            let da = distro_tag(&a.release);
            let db = distro_tag(&b.release);
            if let (Some(da), Some(db)) = (da, db) {
                let ord = da.cmp(&db);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
        compare_evr(&a.evr(), &b.evr())
    }

    /// Compare requiring name equality (and, with
    /// [`CompareFlags::require_same_arch`], arch equality) before falling
    /// back to EVR ordering; returns `None` when the identity fields the
    /// flags require do not match.
    #[must_use]
    pub fn compare_full(a: &Self, b: &Self, mode: CompareMode, flags: CompareFlags) -> Option<Ordering> {
        if a.name != b.name {
            return None;
        }
        if flags.require_same_arch && a.arch != b.arch {
            return None;
        }
        Some(Self::compare(a, b, mode))
    }

    /// Scan `haystack` (typically `provides`/`requires`/`conflicts`/
    /// `obsoletes`) for the depend that best matches `needle` by name:
    /// equal-flag matches beat constrained matches, which beat
    /// unconstrained (`ANY`) matches.
    #[must_use]
    pub fn best_match<'a>(haystack: &'a [Depend], needle: &Depend) -> Option<&'a Depend> {
        haystack
            .iter()
            .filter(|d| d.name == needle.name)
            .max_by_key(|d| d.match_strength())
    }

    /// Does any depend in `haystack` satisfy `needle`?
    #[must_use]
    pub fn any_satisfies(haystack: &[Depend], needle: &Depend) -> bool {
        haystack.iter().any(|d| needle.is_satisfied_by(d))
    }

    // --- Lazy attribute accessors -----------------------------------

    fn ensure(&self) -> Result<(), Error> {
        if let Some(loader) = &self.loader {
            loader.ensure(self)?;
        }
        Ok(())
    }

    /// Package summary (one-line description).
    pub fn summary(&self) -> Result<Option<String>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().summary.get())
    }

    /// Set the summary attribute; fails if already set to a different value.
    pub fn set_summary(&self, value: impl Into<String>) -> Result<(), Error> {
        self.attrs
            .write()
            .summary
            .set("summary", &self.nevra(), value.into())
    }

    /// Package description.
    pub fn description(&self) -> Result<Option<String>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().description.get())
    }

    /// Set the description attribute.
    pub fn set_description(&self, value: impl Into<String>) -> Result<(), Error> {
        self.attrs
            .write()
            .description
            .set("description", &self.nevra(), value.into())
    }

    /// License string.
    pub fn license(&self) -> Result<Option<String>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().license.get())
    }

    /// Set the license attribute.
    pub fn set_license(&self, value: impl Into<String>) -> Result<(), Error> {
        self.attrs
            .write()
            .license
            .set("license", &self.nevra(), value.into())
    }

    /// Project URL.
    pub fn url(&self) -> Result<Option<String>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().url.get())
    }

    /// Set the URL attribute.
    pub fn set_url(&self, value: impl Into<String>) -> Result<(), Error> {
        self.attrs.write().url.set("url", &self.nevra(), value.into())
    }

    /// Installed/download size in bytes.
    pub fn size(&self) -> Result<Option<u64>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().size.get())
    }

    /// Set the size attribute.
    pub fn set_size(&self, value: u64) -> Result<(), Error> {
        self.attrs.write().size.set("size", &self.nevra(), value)
    }

    /// Yum-style category (e.g. `base`).
    pub fn category(&self) -> Result<Option<String>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().category.get())
    }

    /// Set the category attribute.
    pub fn set_category(&self, value: impl Into<String>) -> Result<(), Error> {
        self.attrs
            .write()
            .category
            .set("category", &self.nevra(), value.into())
    }

    /// Group (e.g. `System Environment/Base`).
    pub fn group(&self) -> Result<Option<String>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().group.get())
    }

    /// Set the group attribute.
    pub fn set_group(&self, value: impl Into<String>) -> Result<(), Error> {
        self.attrs.write().group.set("group", &self.nevra(), value.into())
    }

    /// Installed file list.
    pub fn files(&self) -> Result<Option<Arc<Vec<String>>>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().files.get())
    }

    /// Set the file list.
    pub fn set_files(&self, value: Vec<String>) -> Result<(), Error> {
        self.attrs
            .write()
            .files
            .set("files", &self.nevra(), Arc::new(value))
    }

    /// Requires list.
    pub fn requires(&self) -> Result<Arc<Vec<Depend>>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().requires.get().unwrap_or_default())
    }

    /// Set the requires list.
    pub fn set_requires(&self, value: Vec<Depend>) -> Result<(), Error> {
        self.attrs
            .write()
            .requires
            .set("requires", &self.nevra(), Arc::new(value))
    }

    /// Provides list (does not implicitly include the self-provide; the
    /// resolver adds that separately when needed).
    pub fn provides(&self) -> Result<Arc<Vec<Depend>>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().provides.get().unwrap_or_default())
    }

    /// Set the provides list.
    pub fn set_provides(&self, value: Vec<Depend>) -> Result<(), Error> {
        self.attrs
            .write()
            .provides
            .set("provides", &self.nevra(), Arc::new(value))
    }

    /// Conflicts list.
    pub fn conflicts(&self) -> Result<Arc<Vec<Depend>>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().conflicts.get().unwrap_or_default())
    }

    /// Set the conflicts list.
    pub fn set_conflicts(&self, value: Vec<Depend>) -> Result<(), Error> {
        self.attrs
            .write()
            .conflicts
            .set("conflicts", &self.nevra(), Arc::new(value))
    }

    /// Obsoletes list.
    pub fn obsoletes(&self) -> Result<Arc<Vec<Depend>>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().obsoletes.get().unwrap_or_default())
    }

    /// Set the obsoletes list.
    pub fn set_obsoletes(&self, value: Vec<Depend>) -> Result<(), Error> {
        self.attrs
            .write()
            .obsoletes
            .set("obsoletes", &self.nevra(), Arc::new(value))
    }

    /// Source RPM filename.
    pub fn source_rpm(&self) -> Result<Option<String>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().source_rpm.get())
    }

    /// Set the source RPM filename.
    pub fn set_source_rpm(&self, value: impl Into<String>) -> Result<(), Error> {
        self.attrs
            .write()
            .source_rpm
            .set("source_rpm", &self.nevra(), value.into())
    }

    /// Local cache filename (set once the artifact has been downloaded).
    pub fn cache_filename(&self) -> Option<String> {
        self.attrs.read().cache_filename.get()
    }

    /// Set the cache filename.
    pub fn set_cache_filename(&self, value: impl Into<String>) -> Result<(), Error> {
        self.attrs
            .write()
            .cache_filename
            .set("cache_filename", &self.nevra(), value.into())
    }

    /// Content-hash pkgid.
    pub fn pkgid(&self) -> Result<Option<String>, Error> {
        self.ensure()?;
        Ok(self.attrs.read().pkgid.get())
    }

    /// Set the pkgid.
    pub fn set_pkgid(&self, value: impl Into<String>) -> Result<(), Error> {
        self.attrs
            .write()
            .pkgid
            .set("pkgid", &self.nevra(), value.into())
    }

    /// Signature key id, once known.
    pub fn signature_key_id(&self) -> Option<String> {
        self.attrs.read().signature_key_id.get()
    }

    /// Set the signature key id.
    pub fn set_signature_key_id(&self, value: impl Into<String>) -> Result<(), Error> {
        self.attrs
            .write()
            .signature_key_id
            .set("signature_key_id", &self.nevra(), value.into())
    }

    /// Current trust state (set during prepare).
    #[must_use]
    pub fn trust(&self) -> TrustKind {
        self.attrs.read().trust.get().unwrap_or_default()
    }

    /// Set the trust state.
    pub fn set_trust(&self, value: TrustKind) -> Result<(), Error> {
        self.attrs.write().trust.set("trust", &self.nevra(), value)
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.epoch == other.epoch
            && self.version == other.version
            && self.release == other.release
            && self.arch == other.arch
    }
}

impl Eq for Package {}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nevra())
    }
}

/// Extract the trailing `.distN` tag from a release string, if present
/// (e.g. `"1.fc40"` -> `Some("fc40")`), for distro-compare mode.
fn distro_tag(release: &str) -> Option<&str> {
    release.rsplit('.').next().filter(|tag| {
        tag.len() > 2 && tag.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str, epoch: u32, version: &str, release: &str) -> Package {
        Package::new(name, epoch, version, release, Arch::new("x86_64"), Origin::Meta)
    }

    #[test]
    fn identity_equality_ignores_origin() {
        let a = pkg("hello", 0, "1.0", "1");
        let b = Package::new(
            "hello",
            0,
            "1.0",
            "1",
            Arch::new("x86_64"),
            Origin::Repo("base".to_string()),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn second_write_same_value_ok() {
        let p = pkg("hello", 0, "1.0", "1");
        p.set_summary("a greeting").unwrap();
        p.set_summary("a greeting").unwrap();
    }

    #[test]
    fn second_write_different_value_is_dirty_error() {
        let p = pkg("hello", 0, "1.0", "1");
        p.set_summary("a greeting").unwrap();
        let err = p.set_summary("something else").unwrap_err();
        assert_eq!(err.code(), ErrorCode::E0102);
    }

    #[test]
    fn compare_by_version() {
        let old = pkg("hello", 0, "1.0", "1");
        let new = pkg("hello", 0, "2.0", "1");
        assert_eq!(Package::compare(&old, &new, CompareMode::Version), Ordering::Less);
    }

    #[test]
    fn compare_full_rejects_name_mismatch() {
        let a = pkg("hello", 0, "1.0", "1");
        let b = pkg("world", 0, "1.0", "1");
        assert!(Package::compare_full(&a, &b, CompareMode::Version, CompareFlags::default()).is_none());
    }

    #[test]
    fn best_match_prefers_equal_over_any() {
        let deps = vec![
            Depend::unconstrained("libx"),
            Depend::new("libx", crate::depend::DependFlag::EQUAL, "2.0"),
        ];
        let needle = Depend::unconstrained("libx");
        let best = Package::best_match(&deps, &needle).unwrap();
        assert_eq!(best.version, "2.0");
    }
}
