//! Resolve-query flags: which identity fields a name must
//! match, plus the `prefer-native` arch-suffix retry behavior.

use std::fmt;

/// Bitflags-style selector for [`crate::Store::resolve`], mirroring
/// [`zif_core::DependFlag`]'s combinable-bits shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolveFlags(u8);

impl ResolveFlags {
    /// Match on name alone.
    pub const NAME: Self = Self(1 << 0);
    /// Match on name and arch.
    pub const NAME_ARCH: Self = Self(1 << 1);
    /// Match on name and version.
    pub const NAME_VERSION: Self = Self(1 << 2);
    /// Match on name, version, and arch.
    pub const NAME_VERSION_ARCH: Self = Self(1 << 3);
    /// Treat the search term as a regular expression.
    pub const REGEX: Self = Self(1 << 4);
    /// Treat the search term as a shell glob.
    pub const GLOB: Self = Self(1 << 5);
    /// First retry bare names suffixed with the machine arch; if that
    /// yields nothing, retry without the suffix.
    pub const PREFER_NATIVE: Self = Self(1 << 6);

    /// Combine flags.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Does this selector include `other`'s bits?
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ResolveFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl Default for ResolveFlags {
    fn default() -> Self {
        Self::NAME
    }
}

impl fmt::Display for ResolveFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for (flag, label) in [
            (Self::NAME, "name"),
            (Self::NAME_ARCH, "name-arch"),
            (Self::NAME_VERSION, "name-version"),
            (Self::NAME_VERSION_ARCH, "name-version-arch"),
            (Self::REGEX, "regex"),
            (Self::GLOB, "glob"),
            (Self::PREFER_NATIVE, "prefer-native"),
        ] {
            if self.contains(flag) {
                parts.push(label);
            }
        }
        write!(f, "{}", parts.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_combines_bits() {
        let flags = ResolveFlags::NAME_ARCH | ResolveFlags::PREFER_NATIVE;
        assert!(flags.contains(ResolveFlags::NAME_ARCH));
        assert!(flags.contains(ResolveFlags::PREFER_NATIVE));
        assert!(!flags.contains(ResolveFlags::REGEX));
    }

    #[test]
    fn default_is_name_only() {
        assert_eq!(ResolveFlags::default(), ResolveFlags::NAME);
    }
}
