//! Best-provider selection: scoring candidates that satisfy
//! the same require, so the resolver can pick one deterministically.

use zif_core::{Arch, CompareMode, Config, Depend, Package};

/// Sum of the weighted signals below for one candidate. Higher wins; ties
/// are broken by the caller comparing `newest`.
#[must_use]
pub fn score(
    candidate: &Package,
    requirer: &Package,
    depend: &Depend,
    installed: &[Package],
    native_arch: &Arch,
) -> zif_core::Result<i64> {
    let mut total: i64 = 0;

    if let Some(installed_same_name) = installed.iter().find(|p| p.name() == candidate.name()) {
        if installed_same_name.version() == candidate.version()
            && installed_same_name.release() == candidate.release()
        {
            total += 1000;
        } else {
            match Package::compare(candidate, installed_same_name, CompareMode::Version) {
                std::cmp::Ordering::Greater => total += 5,
                std::cmp::Ordering::Less => total -= 1024,
                std::cmp::Ordering::Equal => {}
            }
        }
    }

    let common_prefix = requirer
        .name()
        .chars()
        .zip(candidate.name().chars())
        .take_while(|(a, b)| a == b)
        .count();
    total += 2 * common_prefix as i64;

    let provide = Package::best_match(&candidate.provides()?, depend);
    if provide.is_some_and(|d| d.match_strength() == 2) {
        total += 500;
    }

    if !candidate.arch().is_compatible_with(requirer.arch()) {
        total -= 300;
    }
    if !candidate.arch().is_compatible_with(native_arch) {
        total -= 80;
    }

    if let (Ok(Some(a)), Ok(Some(b))) = (candidate.source_rpm(), requirer.source_rpm()) {
        if a == b {
            total += 20;
        }
    }

    total -= candidate.name().len() as i64;
    total += candidate.arch().i386_preference_bonus();

    Ok(total)
}

/// Pick the best candidate from `candidates` satisfying `depend`, applying
/// `config.exactarch` filtering first. `None` if filtering leaves nothing.
pub fn best_provider(
    candidates: &[Package],
    requirer: &Package,
    depend: &Depend,
    installed: &[Package],
    config: &Config,
    native_arch: &Arch,
) -> zif_core::Result<Option<Package>> {
    let pool: Vec<&Package> = if config.exactarch {
        candidates.iter().filter(|p| p.arch() == native_arch || p.arch().is_noarch()).collect()
    } else {
        candidates.iter().collect()
    };
    if pool.is_empty() {
        return Ok(None);
    }
    let mut best: Option<(i64, &Package)> = None;
    for candidate in pool {
        let s = score(candidate, requirer, depend, installed, native_arch)?;
        best = match best {
            None => Some((s, candidate)),
            Some((best_score, _)) if s > best_score => Some((s, candidate)),
            Some((best_score, best_pkg))
                if s == best_score
                    && Package::compare(candidate, best_pkg, CompareMode::Version).is_gt() =>
            {
                Some((s, candidate))
            }
            other => other,
        };
    }
    Ok(best.map(|(_, pkg)| pkg.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zif_core::{DependFlag, Origin};

    fn pkg(name: &str, version: &str, arch: &str) -> Package {
        Package::new(name, 0, version, "1", Arch::new(arch), Origin::Meta)
    }

    #[test]
    fn upgrade_scores_higher_than_downgrade() {
        let requirer = pkg("app", "1.0", "x86_64");
        let installed = vec![pkg("libx", "2.0", "x86_64")];
        let newer = pkg("libx", "3.0", "x86_64");
        let older = pkg("libx", "1.0", "x86_64");
        let native = Arch::new("x86_64");
        let depend = Depend::unconstrained("libx");
        let newer_score = score(&newer, &requirer, &depend, &installed, &native).unwrap();
        let older_score = score(&older, &requirer, &depend, &installed, &native).unwrap();
        assert!(newer_score > older_score);
    }

    #[test]
    fn exactarch_filters_non_native() {
        let requirer = pkg("app", "1.0", "x86_64");
        let native = Arch::new("x86_64");
        let candidates = vec![pkg("libx", "1.0", "i686")];
        let mut config = Config::default();
        config.exactarch = true;
        let depend = Depend::unconstrained("libx");
        let best = best_provider(&candidates, &requirer, &depend, &[], &config, &native).unwrap();
        assert!(best.is_none());
    }

    #[test]
    fn exact_match_scores_above_loose_match() {
        let requirer = pkg("app", "1.0", "x86_64");
        let native = Arch::new("x86_64");
        let tight = pkg("libx", "2.0", "x86_64");
        tight
            .set_provides(vec![Depend::new("libx", DependFlag::EQUAL, "2.0")])
            .unwrap();
        let loose = pkg("libx-alt", "2.0", "x86_64");
        loose.set_provides(vec![Depend::unconstrained("libx")]).unwrap();
        let depend = Depend::new("libx", DependFlag::EQUAL, "2.0");
        let tight_score = score(&tight, &requirer, &depend, &[], &native).unwrap();
        let loose_score = score(&loose, &requirer, &depend, &[], &native).unwrap();
        assert!(tight_score > loose_score);
    }
}
