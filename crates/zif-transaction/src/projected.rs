//! The resolver's projected post-state store: a snapshot of
//! installed packages mutated in place as the resolver queues installs
//! and removes. Conflict checking and install-only-n both query this,
//! never the live local store, so later phases see earlier phases'
//! effects within the same pass.

use zif_core::{depend::self_provide, Depend, Package};

/// A package's declared provides plus its implicit self-provide
/// (`name = epoch:version-release`), the form requires/obsoletes/conflicts
/// match against "is this exact package present".
pub(crate) fn effective_provides(package: &Package) -> zif_core::Result<Vec<Depend>> {
    let mut provides = (*package.provides()?).clone();
    provides.push(self_provide(package.name(), &package.evr()));
    Ok(provides)
}

/// A mutable working copy of "what will be installed once this
/// transaction commits".
#[derive(Debug, Clone)]
pub struct ProjectedStore {
    packages: Vec<Package>,
}

impl ProjectedStore {
    /// Seed the projected store from the local store's current package list.
    #[must_use]
    pub fn new(installed: Vec<Package>) -> Self {
        Self { packages: installed }
    }

    /// The current projected package list.
    #[must_use]
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Apply a queued install: add `package` if its identity isn't
    /// already present.
    pub fn apply_install(&mut self, package: Package) {
        if !self.packages.contains(&package) {
            self.packages.push(package);
        }
    }

    /// Apply a queued remove: drop any package matching `package`'s identity.
    pub fn apply_remove(&mut self, package: &Package) {
        self.packages.retain(|p| p != package);
    }

    /// All projected packages whose name matches `name` (any arch), newest
    /// first, used by install-only-n and update resolution.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Vec<&Package> {
        let mut found: Vec<&Package> = self.packages.iter().filter(|p| p.name() == name).collect();
        found.sort_by(|a, b| zif_core::Package::compare(b, a, zif_core::CompareMode::Version));
        found
    }

    /// All projected packages matching `(name, arch)` exactly.
    #[must_use]
    pub fn by_name_arch(&self, name: &str, arch: &str) -> Vec<&Package> {
        self.packages
            .iter()
            .filter(|p| p.name() == name && p.arch().as_str() == arch)
            .collect()
    }

    /// Does any projected package provide something satisfying `depend`?
    pub fn provides(&self, depend: &Depend) -> zif_core::Result<Option<Package>> {
        for package in &self.packages {
            if Package::any_satisfies(&effective_provides(package)?, depend) {
                return Ok(Some(package.clone()));
            }
        }
        Ok(None)
    }

    /// Every installed package whose requires list contains a depend
    /// satisfied only by `provider` (no other projected package, and no
    /// package in `also_excluding`, provides it) for at least one of
    /// `provider`'s provides.
    pub fn sole_requirers_of(
        &self,
        provider: &Package,
        also_providing: &[Package],
    ) -> zif_core::Result<Vec<Package>> {
        let provides = effective_provides(provider)?;
        let mut out = Vec::new();
        'requirer: for candidate in &self.packages {
            if candidate == provider {
                continue;
            }
            let requires = candidate.requires()?;
            for provide in provides.iter() {
                if !Package::any_satisfies(&requires, provide) {
                    continue;
                }
                for other in &self.packages {
                    if other == provider || other == candidate {
                        continue;
                    }
                    if Package::any_satisfies(&effective_provides(other)?, provide) {
                        continue 'requirer;
                    }
                }
                for other in also_providing {
                    if Package::any_satisfies(&effective_provides(other)?, provide) {
                        continue 'requirer;
                    }
                }
                out.push(candidate.clone());
                continue 'requirer;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zif_core::{Arch, DependFlag, Origin};

    fn pkg(name: &str, version: &str) -> Package {
        Package::new(name, 0, version, "1", Arch::new("x86_64"), Origin::Meta)
    }

    #[test]
    fn apply_install_then_remove_round_trips() {
        let mut store = ProjectedStore::new(vec![]);
        store.apply_install(pkg("hello", "1.0"));
        assert_eq!(store.packages().len(), 1);
        store.apply_remove(&pkg("hello", "1.0"));
        assert!(store.packages().is_empty());
    }

    #[test]
    fn by_name_sorted_newest_first() {
        let store = ProjectedStore::new(vec![pkg("kernel", "1"), pkg("kernel", "3"), pkg("kernel", "2")]);
        let found = store.by_name("kernel");
        assert_eq!(found[0].version(), "3");
        assert_eq!(found[2].version(), "1");
    }

    #[test]
    fn sole_requirer_found_when_no_other_provider() {
        let libx = pkg("libx", "1.0");
        libx.set_provides(vec![Depend::unconstrained("libx")]).unwrap();
        let app = pkg("app", "1.0");
        app.set_requires(vec![Depend::new("libx", DependFlag::ANY, "")]).unwrap();
        let store = ProjectedStore::new(vec![libx.clone(), app.clone()]);
        let requirers = store.sole_requirers_of(&libx, &[]).unwrap();
        assert_eq!(requirers.len(), 1);
        assert_eq!(requirers[0].name(), "app");
    }

    #[test]
    fn sole_requirer_absent_when_another_provider_remains() {
        let libx = pkg("libx", "1.0");
        libx.set_provides(vec![Depend::unconstrained("libx")]).unwrap();
        let libx2 = pkg("libx-compat", "1.0");
        libx2.set_provides(vec![Depend::unconstrained("libx")]).unwrap();
        let app = pkg("app", "1.0");
        app.set_requires(vec![Depend::new("libx", DependFlag::ANY, "")]).unwrap();
        let store = ProjectedStore::new(vec![libx.clone(), libx2, app]);
        let requirers = store.sole_requirers_of(&libx, &[]).unwrap();
        assert!(requirers.is_empty());
    }
}
