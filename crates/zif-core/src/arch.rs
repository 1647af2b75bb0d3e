//! Architecture identity and compatibility.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A package architecture string, with the family-compatibility rules
/// `Package::is_compatible_arch` relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arch(String);

impl Arch {
    /// Wrap an arbitrary architecture string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the universal `noarch` architecture.
    #[must_use]
    pub fn is_noarch(&self) -> bool {
        self.0 == "noarch"
    }

    /// Is this one of the 32-bit x86 family members (`i386`..`i686`)?
    #[must_use]
    pub fn is_i386_family(&self) -> bool {
        matches!(self.0.as_str(), "i386" | "i486" | "i586" | "i686")
    }

    /// Two arches are compatible when: either is `noarch`; both are in the
    /// i386 family; or both are exactly equal (covers `x86_64`, `aarch64`,
    /// etc., which are only compatible with themselves and `noarch`).
    #[must_use]
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        if self.is_noarch() || other.is_noarch() {
            return true;
        }
        if self.is_i386_family() && other.is_i386_family() {
            return true;
        }
        self == other
    }

    /// Scoring weight used by best-provider selection: within
    /// the i386 family, later members (`i686` over `i386`) get a small
    /// bonus, computed as the numeric suffix divided by 100 (e.g. `i686`
    /// -> `686 / 100 == 6`).
    #[must_use]
    pub fn i386_preference_bonus(&self) -> i64 {
        if !self.is_i386_family() {
            return 0;
        }
        self.0
            .get(1..)
            .and_then(|suffix| suffix.parse::<i64>().ok())
            .map_or(0, |n| n / 100)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noarch_is_universally_compatible() {
        let noarch = Arch::new("noarch");
        let x86_64 = Arch::new("x86_64");
        assert!(noarch.is_compatible_with(&x86_64));
        assert!(x86_64.is_compatible_with(&noarch));
    }

    #[test]
    fn i386_family_is_mutually_compatible() {
        let i386 = Arch::new("i386");
        let i686 = Arch::new("i686");
        assert!(i386.is_compatible_with(&i686));
    }

    #[test]
    fn x86_64_only_compatible_with_itself_and_noarch() {
        let x86_64 = Arch::new("x86_64");
        let i686 = Arch::new("i686");
        assert!(!x86_64.is_compatible_with(&i686));
        assert!(x86_64.is_compatible_with(&Arch::new("x86_64")));
    }
}
