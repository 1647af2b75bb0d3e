//! RPM-style version comparison (the `rpmvercmp` algorithm).
//!
//! RPM versions do not follow semver: segments alternate between runs of
//! digits and runs of letters, tildes sort before everything (including
//! the empty string), and missing segments compare as older. This module
//! implements that comparator.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// An epoch/version/release triple, the ordering unit for `Package::compare`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evr {
    /// Epoch; packages with no explicit epoch default to 0.
    pub epoch: u32,
    /// Upstream version string.
    pub version: String,
    /// Packager release string.
    pub release: String,
}

impl Evr {
    /// Build an EVR triple.
    #[must_use]
    pub fn new(epoch: u32, version: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release: release.into(),
        }
    }
}

impl fmt::Display for Evr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}:{}-{}", self.epoch, self.version, self.release)
        } else {
            write!(f, "{}-{}", self.version, self.release)
        }
    }
}

/// Compare two epoch/version/release triples using RPM's ordering rules.
///
/// Order is `(epoch, version, release)` lexicographic, each compared with
/// [`compare_segment`].
#[must_use]
pub fn compare_evr(a: &Evr, b: &Evr) -> Ordering {
    a.epoch
        .cmp(&b.epoch)
        .then_with(|| compare_segment(&a.version, &b.version))
        .then_with(|| compare_segment(&a.release, &b.release))
}

/// Compare two version/release strings using the `rpmvercmp` algorithm:
/// walk both strings splitting into alternating runs of digits and
/// non-digits, comparing numerically within digit runs and lexically
/// within alpha runs, with tildes ranking below everything else
/// (including end-of-string) and tildes on both sides cancelling out.
#[must_use]
pub fn compare_segment(a: &str, b: &str) -> Ordering {
    let mut a = a;
    let mut b = b;

    loop {
        // Skip over non-alphanumeric, non-tilde characters on both sides.
        a = a.trim_start_matches(|c: char| !c.is_ascii_alphanumeric() && c != '~');
        b = b.trim_start_matches(|c: char| !c.is_ascii_alphanumeric() && c != '~');

        // Tilde handling: a tilde sorts before anything, including the
        // empty string on the other side.
        match (a.starts_with('~'), b.starts_with('~')) {
            (true, true) => {
                a = &a[1..];
                b = &b[1..];
                continue;
            }
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        if a.is_empty() || b.is_empty() {
            break;
        }

        let (a_seg, a_rest, a_is_digit) = take_segment(a);
        let (b_seg, b_rest, b_is_digit) = take_segment(b);

        let ord = if a_is_digit && b_is_digit {
            compare_numeric(a_seg, b_seg)
        } else if !a_is_digit && !b_is_digit {
            a_seg.cmp(b_seg)
        } else if a_is_digit {
            // Digit segments always win over alpha segments.
            Ordering::Greater
        } else {
            Ordering::Less
        };

        if ord != Ordering::Equal {
            return ord;
        }

        a = a_rest;
        b = b_rest;
    }

    // Whatever is left non-empty (ignoring a trailing tilde, already
    // handled above) is considered newer; a lone trailing tilde has
    // already been consumed by the loop above.
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

/// Split off a leading run of either digits or non-digits (never both),
/// returning `(segment, remainder, is_digit_run)`.
fn take_segment(s: &str) -> (&str, &str, bool) {
    let is_digit = s
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit());

    let end = s
        .find(|c: char| c.is_ascii_digit() != is_digit)
        .unwrap_or(s.len());

    (&s[..end], &s[end..], is_digit)
}

/// Compare two digit runs numerically, ignoring leading zeros, without
/// overflow by comparing trimmed string length first.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_versions() {
        assert_eq!(compare_segment("1.0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn numeric_ordering_ignores_leading_zeros() {
        assert_eq!(compare_segment("1.0007", "1.7"), Ordering::Equal);
    }

    #[test]
    fn alpha_before_numeric_suffix() {
        assert_eq!(compare_segment("1.0", "1.0a"), Ordering::Greater);
    }

    #[test]
    fn tilde_sorts_before_release() {
        assert_eq!(compare_segment("1.0~rc1", "1.0"), Ordering::Less);
    }

    #[test]
    fn tilde_vs_tilde_alpha_compare() {
        assert_eq!(compare_segment("1.0~rc1", "1.0~rc2"), Ordering::Less);
    }

    #[test]
    fn evr_epoch_dominates() {
        let a = Evr::new(1, "1.0", "1");
        let b = Evr::new(0, "9.0", "1");
        assert_eq!(compare_evr(&a, &b), Ordering::Greater);
    }

    #[test]
    fn caret_like_letters_vs_digits() {
        assert_eq!(compare_segment("10a", "10"), Ordering::Less);
    }

    #[test]
    fn fc_release_tags() {
        assert_eq!(compare_segment("1.fc30", "1.fc31"), Ordering::Less);
    }

    proptest::proptest! {
        #[test]
        fn reflexive(s in "[a-z0-9.~-]{0,20}") {
            assert_eq!(compare_segment(&s, &s), Ordering::Equal);
        }
    }
}
