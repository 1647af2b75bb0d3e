//! The `Depend` triple: `(name, flag, version)`.

use crate::version::{compare_segment, Evr};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison flags a `Depend` can carry. Compound forms combine by
/// bitwise-or, so this is represented as a bitflags-style struct rather
/// than a plain enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependFlag(u8);

impl DependFlag {
    /// No version constraint at all.
    pub const ANY: Self = Self(0);
    /// `<`
    pub const LESS: Self = Self(1 << 0);
    /// `>`
    pub const GREATER: Self = Self(1 << 1);
    /// `=`
    pub const EQUAL: Self = Self(1 << 2);
    /// `<=` (LESS | EQUAL)
    pub const LESS_OR_EQUAL: Self = Self(Self::LESS.0 | Self::EQUAL.0);
    /// `>=` (GREATER | EQUAL)
    pub const GREATER_OR_EQUAL: Self = Self(Self::GREATER.0 | Self::EQUAL.0);
    /// Flag bits present but none recognized.
    pub const UNKNOWN: Self = Self(1 << 7);

    /// Combine two flags (bitwise-or), for building compound forms.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Does this flag include `LESS`?
    #[must_use]
    pub const fn has_less(self) -> bool {
        self.0 & Self::LESS.0 != 0
    }

    /// Does this flag include `GREATER`?
    #[must_use]
    pub const fn has_greater(self) -> bool {
        self.0 & Self::GREATER.0 != 0
    }

    /// Does this flag include `EQUAL`?
    #[must_use]
    pub const fn has_equal(self) -> bool {
        self.0 & Self::EQUAL.0 != 0
    }

    /// Parse the conventional two-character operator strings.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" => Some(Self::ANY),
            "<" => Some(Self::LESS),
            ">" => Some(Self::GREATER),
            "=" | "==" => Some(Self::EQUAL),
            "<=" => Some(Self::LESS_OR_EQUAL),
            ">=" => Some(Self::GREATER_OR_EQUAL),
            _ => None,
        }
    }
}

impl fmt::Display for DependFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Self::ANY => "",
            Self::LESS => "<",
            Self::GREATER => ">",
            Self::EQUAL => "=",
            Self::LESS_OR_EQUAL => "<=",
            Self::GREATER_OR_EQUAL => ">=",
            _ => "?",
        };
        write!(f, "{s}")
    }
}

/// A dependency relation: a name plus an optional version constraint.
///
/// Used uniformly for requires, provides, conflicts, and obsoletes — the
/// four kinds of relation a package declares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Depend {
    /// The dependency name. Names beginning with `/` are filename depends;
    /// names of the form `rpmlib(...)` are internal capability markers.
    pub name: String,
    /// Comparison flag; `ANY` iff `version` is empty.
    pub flag: DependFlag,
    /// Version string the flag compares against (empty when flag is `ANY`).
    pub version: String,
}

impl Depend {
    /// Build a new depend, normalizing to the `ANY`/empty-version
    /// invariant this type requires.
    #[must_use]
    pub fn new(name: impl Into<String>, flag: DependFlag, version: impl Into<String>) -> Self {
        let version = version.into();
        if version.is_empty() {
            Self {
                name: name.into(),
                flag: DependFlag::ANY,
                version: String::new(),
            }
        } else {
            Self {
                name: name.into(),
                flag,
                version,
            }
        }
    }

    /// An unconstrained depend on `name`.
    #[must_use]
    pub fn unconstrained(name: impl Into<String>) -> Self {
        Self::new(name, DependFlag::ANY, "")
    }

    /// Is this a filename-style depend (name begins with `/`)?
    #[must_use]
    pub fn is_filename(&self) -> bool {
        self.name.starts_with('/')
    }

    /// Is this an `rpmlib(...)` internal capability marker?
    #[must_use]
    pub fn is_rpmlib(&self) -> bool {
        self.name.starts_with("rpmlib(")
    }

    /// Parse `"name"`, `"name op version"`, or `"name(op)version"` forms.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(idx) = s.find(|c: char| c.is_whitespace()) {
            let name = &s[..idx];
            let rest = s[idx..].trim();
            let op_len = rest
                .find(|c: char| !matches!(c, '<' | '>' | '='))
                .unwrap_or(rest.len());
            let (op, version) = rest.split_at(op_len);
            let flag = DependFlag::parse(op)?;
            if name.is_empty() || version.trim().is_empty() {
                return None;
            }
            Some(Self::new(name, flag, version.trim()))
        } else if s.is_empty() {
            None
        } else {
            Some(Self::unconstrained(s))
        }
    }

    /// Does `provide` (an EVR-bearing depend, typically a package's own
    /// `name = version-release` provide) satisfy `self` as a requirement?
    ///
    /// Name must match exactly. If `self` has no version constraint
    /// (`ANY`), any version of `provide` satisfies it. Otherwise both the
    /// provide and the requirement must carry a version, and the
    /// requirement's operator must hold between the provide's version and
    /// the requirement's version.
    #[must_use]
    pub fn is_satisfied_by(&self, provide: &Depend) -> bool {
        if self.name != provide.name {
            return false;
        }
        if self.flag == DependFlag::ANY {
            return true;
        }
        if provide.version.is_empty() {
            // An unversioned provide only satisfies an unversioned require.
            return false;
        }
        let ord = compare_segment(&provide.version, &self.version);
        use std::cmp::Ordering::{Equal, Greater, Less};
        match ord {
            Equal => self.flag.has_equal(),
            Less => self.flag.has_less(),
            Greater => self.flag.has_greater(),
        }
    }

    /// Score how "tight" a match this depend is against a require, used by
    /// `Package::provides`'s best-match rule: exact equal-flag
    /// match scores highest, a constrained match next, an unconstrained
    /// `ANY` match last.
    #[must_use]
    pub fn match_strength(&self) -> u8 {
        if self.flag == DependFlag::EQUAL {
            2
        } else if self.flag != DependFlag::ANY {
            1
        } else {
            0
        }
    }
}

impl fmt::Display for Depend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flag == DependFlag::ANY {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {} {}", self.name, self.flag, self.version)
        }
    }
}

/// Build a depend representing a package's own identity provide
/// (`name = epoch:version-release`), the form used when matching a
/// require against "is this exact package installed".
#[must_use]
pub fn self_provide(name: &str, evr: &Evr) -> Depend {
    Depend::new(name, DependFlag::EQUAL, evr.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_iff_empty_version() {
        let d = Depend::new("foo", DependFlag::EQUAL, "");
        assert_eq!(d.flag, DependFlag::ANY);
    }

    #[test]
    fn parse_constrained() {
        let d = Depend::parse("libx >= 2.0").unwrap();
        assert_eq!(d.name, "libx");
        assert_eq!(d.flag, DependFlag::GREATER_OR_EQUAL);
        assert_eq!(d.version, "2.0");
    }

    #[test]
    fn parse_unconstrained() {
        let d = Depend::parse("libx").unwrap();
        assert_eq!(d.flag, DependFlag::ANY);
    }

    #[test]
    fn satisfies_ge() {
        let req = Depend::new("libx", DependFlag::GREATER_OR_EQUAL, "2.0");
        let provide = Depend::new("libx", DependFlag::EQUAL, "2.5");
        assert!(req.is_satisfied_by(&provide));
        let too_old = Depend::new("libx", DependFlag::EQUAL, "1.0");
        assert!(!req.is_satisfied_by(&too_old));
    }

    #[test]
    fn unversioned_require_matches_anything() {
        let req = Depend::unconstrained("libx");
        let provide = Depend::new("libx", DependFlag::EQUAL, "9.9");
        assert!(req.is_satisfied_by(&provide));
    }

    #[test]
    fn is_filename_and_rpmlib() {
        assert!(Depend::unconstrained("/usr/bin/perl").is_filename());
        assert!(Depend::unconstrained("rpmlib(PayloadIsXz)").is_rpmlib());
    }
}
