//! Filtering helpers over a package slice: newest, best-arch, duplicate
//! removal, and require satisfiability. Kept as named, independently
//! testable functions rather than inlined into the resolver.

use ahash::AHashMap;
use zif_core::{CompareMode, Depend, Package};

/// Filtering operations over a package result set.
pub trait PackageArrayExt {
    /// Keep only the newest version of each distinct `(name, arch)`.
    fn newest(&self, mode: CompareMode) -> Vec<Package>;

    /// Keep, for each name, only packages of the most-preferred
    /// compatible architecture present (e.g. drop `i686` builds when a
    /// `x86_64` build of the same name exists).
    fn best_arch(&self) -> Vec<Package>;

    /// Remove exact-NEVRA duplicates, keeping the first occurrence.
    fn duplicates_removed(&self) -> Vec<Package>;

    /// Keep only packages that provide something satisfying `depend`.
    fn satisfies(&self, depend: &Depend) -> zif_core::Result<Vec<Package>>;
}

impl PackageArrayExt for [Package] {
    fn newest(&self, mode: CompareMode) -> Vec<Package> {
        let mut best: AHashMap<(String, String), Package> = AHashMap::new();
        for package in self {
            let key = package.name_arch_key();
            match best.get(&key) {
                Some(existing) if Package::compare(existing, package, mode).is_ge() => {}
                _ => {
                    best.insert(key, package.clone());
                }
            }
        }
        best.into_values().collect()
    }

    fn best_arch(&self) -> Vec<Package> {
        let mut by_name: AHashMap<&str, Vec<&Package>> = AHashMap::new();
        for package in self {
            by_name.entry(package.name()).or_default().push(package);
        }
        let mut out = Vec::new();
        for candidates in by_name.into_values() {
            let mut ranked = candidates;
            ranked.sort_by(|a, b| arch_rank(b.arch().as_str()).cmp(&arch_rank(a.arch().as_str())));
            let Some(best_arch) = ranked.first().map(|p| p.arch().clone()) else {
                continue;
            };
            out.extend(
                ranked
                    .into_iter()
                    .filter(|p| *p.arch() == best_arch)
                    .cloned(),
            );
        }
        out
    }

    fn duplicates_removed(&self) -> Vec<Package> {
        let mut seen: AHashMap<(String, u32, String, String, String), ()> = AHashMap::new();
        let mut out = Vec::new();
        for package in self {
            let key = (
                package.name().to_string(),
                package.epoch(),
                package.version().to_string(),
                package.release().to_string(),
                package.arch().as_str().to_string(),
            );
            if seen.insert(key, ()).is_none() {
                out.push(package.clone());
            }
        }
        out
    }

    fn satisfies(&self, depend: &Depend) -> zif_core::Result<Vec<Package>> {
        let mut out = Vec::new();
        for package in self {
            if Package::any_satisfies(&package.provides()?, depend) {
                out.push(package.clone());
            }
        }
        Ok(out)
    }
}

/// Preference ranking for architecture choice within `best_arch`: native
/// 64-bit arches first, then the i386 family (higher is better), then
/// noarch last (it only wins when nothing more specific exists).
fn arch_rank(arch: &str) -> i64 {
    if arch == "noarch" {
        return -1;
    }
    if let "i386" | "i486" | "i586" | "i686" = arch {
        return i64::from(arch.as_bytes()[1] - b'0');
    }
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use zif_core::{Arch, Origin};

    fn pkg(name: &str, version: &str, arch: &str) -> Package {
        Package::new(name, 0, version, "1", Arch::new(arch), Origin::Meta)
    }

    #[test]
    fn newest_keeps_highest_version_per_name_arch() {
        let packages = vec![
            pkg("hello", "1.0", "x86_64"),
            pkg("hello", "2.0", "x86_64"),
            pkg("hello", "1.5", "noarch"),
        ];
        let newest = packages.newest(CompareMode::Version);
        assert_eq!(newest.len(), 2);
        assert!(newest.iter().any(|p| p.version() == "2.0"));
        assert!(newest.iter().any(|p| p.version() == "1.5"));
    }

    #[test]
    fn best_arch_prefers_native_over_noarch() {
        let packages = vec![pkg("hello", "1.0", "noarch"), pkg("hello", "1.0", "x86_64")];
        let best = packages.best_arch();
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].arch().as_str(), "x86_64");
    }

    #[test]
    fn best_arch_prefers_i686_over_i386() {
        let packages = vec![pkg("hello", "1.0", "i386"), pkg("hello", "1.0", "i686")];
        let best = packages.best_arch();
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].arch().as_str(), "i686");
    }

    #[test]
    fn duplicates_removed_keeps_first() {
        let packages = vec![pkg("hello", "1.0", "x86_64"), pkg("hello", "1.0", "x86_64")];
        assert_eq!(packages.duplicates_removed().len(), 1);
    }

    #[test]
    fn satisfies_filters_by_provide() {
        let provider = pkg("libx", "1.0", "x86_64");
        provider
            .set_provides(vec![zif_core::Depend::unconstrained("libx")])
            .unwrap();
        let other = pkg("liby", "1.0", "x86_64");
        other.set_provides(vec![]).unwrap();
        let packages = vec![provider, other];
        let matches = packages
            .satisfies(&zif_core::Depend::unconstrained("libx"))
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name(), "libx");
    }
}
