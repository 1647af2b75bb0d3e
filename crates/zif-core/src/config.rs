//! Typed configuration, layered from defaults, a TOML file, and
//! `ZIF_`-prefixed environment overrides. Uses the same layered-source
//! approach as a standard config loader, minus per-platform path
//! resolution this side never needs.

use crate::error::{Error, ErrorCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Package version-comparison mode, mirrored from [`crate::package::CompareMode`]
/// so config can be deserialized without a dependency cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PkgCompareMode {
    /// Plain version ordering.
    #[default]
    Version,
    /// Distribution-tag-aware ordering.
    Distro,
}

/// The full set of recognized configuration keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root prefix the local store and RPM transaction set operate under.
    pub prefix: PathBuf,
    /// Directory for downloaded package and metadata caches.
    pub cachedir: PathBuf,
    /// System log file.
    pub logfile: PathBuf,
    /// SQLite history database path.
    pub history_db: PathBuf,
    /// Yumdb directory root.
    pub yumdb: PathBuf,
    /// `$releasever` substitution value.
    pub releasever: String,
    /// Known-compatible architecture list, most to least preferred.
    pub archinfo: Vec<String>,
    /// Require exact arch matches rather than family compatibility.
    pub exactarch: bool,
    /// Package names allowed to have more than one version installed.
    pub installonlypkgs: Vec<String>,
    /// Maximum concurrently installed versions for `installonlypkgs` names.
    pub installonly_limit: u32,
    /// Names never considered for install or removal.
    pub excludes: BTreeSet<String>,
    /// Names that cannot be removed by a user-initiated action.
    pub protected_packages: BTreeSet<String>,
    /// Continue resolving past unsatisfiable/broken items instead of failing.
    pub skip_broken: bool,
    /// Require valid GPG signatures on repository packages.
    pub gpgcheck: bool,
    /// Require valid GPG signatures on packages installed from a local file.
    pub localpkg_gpgcheck: bool,
    /// Retain downloaded package files in the cache after commit.
    pub keepcache: bool,
    /// Verify enough free disk space exists before committing.
    pub diskspacecheck: bool,
    /// Pass `--test`-equivalent RPM debug checks before a real commit.
    pub rpm_check_debug: bool,
    /// RPM library verbosity level.
    pub rpmverbosity: String,
    /// Seconds before cached repository metadata is considered stale.
    pub metadata_expire: u64,
    /// Number of times to retry acquiring the transaction lock.
    pub lock_retries: u32,
    /// Delay in milliseconds between lock retry attempts.
    pub lock_delay: u64,
    /// Run without interactive progress output.
    pub background: bool,
    /// Assume "yes" to any confirmation prompt.
    pub assumeyes: bool,
    /// Version-comparison mode used by `Package::compare`.
    pub pkg_compare_mode: PkgCompareMode,
    /// Re-check `releasever`/arch compatibility at runtime, not just at resolve.
    pub runtime_version_checks: bool,
    /// Permit writes to the yumdb.
    pub yumdb_allow_write: bool,
    /// Permit reads from the yumdb.
    pub yumdb_allow_read: bool,
    /// Seed resolver decisions from the history DB rather than only the
    /// installed-package set.
    pub use_installed_history: bool,
    /// Automatically enable the matching debuginfo repo when resolving.
    pub auto_enable_debuginfo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: PathBuf::from("/"),
            cachedir: PathBuf::from("/var/cache/zif"),
            logfile: PathBuf::from("/var/log/zif.log"),
            history_db: PathBuf::from("/var/lib/zif/history.sqlite"),
            yumdb: PathBuf::from("/var/lib/zif/yumdb"),
            releasever: String::new(),
            archinfo: Vec::new(),
            exactarch: false,
            installonlypkgs: vec!["kernel".to_string(), "kernel-devel".to_string()],
            installonly_limit: 3,
            excludes: BTreeSet::new(),
            protected_packages: BTreeSet::new(),
            skip_broken: false,
            gpgcheck: true,
            localpkg_gpgcheck: false,
            keepcache: false,
            diskspacecheck: true,
            rpm_check_debug: true,
            rpmverbosity: "info".to_string(),
            metadata_expire: 21_600,
            lock_retries: 20,
            lock_delay: 2,
            background: false,
            assumeyes: false,
            pkg_compare_mode: PkgCompareMode::Version,
            runtime_version_checks: true,
            yumdb_allow_write: true,
            yumdb_allow_read: true,
            use_installed_history: false,
            auto_enable_debuginfo: false,
        }
    }
}

impl Config {
    /// Load defaults layered with a TOML file (if it exists) and then
    /// `ZIF_`-prefixed environment variable overrides, in that order of
    /// increasing precedence.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
                code: ErrorCode::E0501,
                context: format!("reading config file {}", path.display()),
                source,
            })?;
            toml::from_str(&text).map_err(|source| Error::ConfigParse {
                code: ErrorCode::E0401,
                path: path.to_path_buf(),
                source,
            })?
        } else {
            debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Overlay `ZIF_<KEY>` environment variables onto scalar/bool fields.
    /// List and set fields are intentionally left to the file layer: their
    /// encoding as a single env var would be ambiguous.
    fn apply_env_overrides(&mut self) {
        macro_rules! override_str {
            ($field:ident, $key:literal) => {
                if let Ok(v) = std::env::var(concat!("ZIF_", $key)) {
                    self.$field = v.into();
                }
            };
        }
        macro_rules! override_bool {
            ($field:ident, $key:literal) => {
                if let Ok(v) = std::env::var(concat!("ZIF_", $key)) {
                    if let Ok(parsed) = v.parse() {
                        self.$field = parsed;
                    }
                }
            };
        }
        macro_rules! override_num {
            ($field:ident, $key:literal) => {
                if let Ok(v) = std::env::var(concat!("ZIF_", $key)) {
                    if let Ok(parsed) = v.parse() {
                        self.$field = parsed;
                    }
                }
            };
        }

        override_str!(prefix, "PREFIX");
        override_str!(cachedir, "CACHEDIR");
        override_str!(logfile, "LOGFILE");
        override_str!(history_db, "HISTORY_DB");
        override_str!(yumdb, "YUMDB");
        override_str!(releasever, "RELEASEVER");
        override_bool!(exactarch, "EXACTARCH");
        override_num!(installonly_limit, "INSTALLONLY_LIMIT");
        override_bool!(skip_broken, "SKIP_BROKEN");
        override_bool!(gpgcheck, "GPGCHECK");
        override_bool!(localpkg_gpgcheck, "LOCALPKG_GPGCHECK");
        override_bool!(keepcache, "KEEPCACHE");
        override_bool!(diskspacecheck, "DISKSPACECHECK");
        override_bool!(rpm_check_debug, "RPM_CHECK_DEBUG");
        override_str!(rpmverbosity, "RPMVERBOSITY");
        override_num!(metadata_expire, "METADATA_EXPIRE");
        override_num!(lock_retries, "LOCK_RETRIES");
        override_num!(lock_delay, "LOCK_DELAY");
        override_bool!(background, "BACKGROUND");
        override_bool!(assumeyes, "ASSUMEYES");
        override_bool!(runtime_version_checks, "RUNTIME_VERSION_CHECKS");
        override_bool!(yumdb_allow_write, "YUMDB_ALLOW_WRITE");
        override_bool!(yumdb_allow_read, "YUMDB_ALLOW_READ");
        override_bool!(use_installed_history, "USE_INSTALLED_HISTORY");
        override_bool!(auto_enable_debuginfo, "AUTO_ENABLE_DEBUGINFO");
    }

    /// Is `name` excluded from install/remove consideration?
    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excludes.contains(name)
    }

    /// Is `name` protected from user-initiated removal?
    #[must_use]
    pub fn is_protected(&self, name: &str) -> bool {
        self.protected_packages.contains(name)
    }

    /// Is `name` allowed to have more than one concurrently installed
    /// version?
    #[must_use]
    pub fn is_installonly(&self, name: &str) -> bool {
        self.installonlypkgs.iter().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config.gpgcheck);
        assert_eq!(config.installonly_limit, 3);
        assert!(config.is_installonly("kernel"));
        assert!(!config.is_installonly("hello"));
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let config = Config::load("/nonexistent/path/zif.conf.toml").unwrap();
        assert_eq!(config.prefix, PathBuf::from("/"));
    }

    #[test]
    fn load_parses_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zif.conf.toml");
        std::fs::write(&path, "prefix = \"/mnt/sysimage\"\ngpgcheck = false\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.prefix, PathBuf::from("/mnt/sysimage"));
        assert!(!config.gpgcheck);
    }

    #[test]
    fn excludes_and_protected_lookup() {
        let mut config = Config::default();
        config.excludes.insert("bad-pkg".to_string());
        config.protected_packages.insert("glibc".to_string());
        assert!(config.is_excluded("bad-pkg"));
        assert!(config.is_protected("glibc"));
        assert!(!config.is_excluded("glibc"));
    }
}
