//! The `package_id_hash` used for O(1) `find_package` lookups.

use sha1::{Digest, Sha1};
use zif_core::Package;

/// A stable content hash of a package's NEVRA, used as the key
/// `find_package` looks up by.
#[must_use]
pub fn package_id_hash(package: &Package) -> String {
    let mut hasher = Sha1::new();
    hasher.update(package.nevra().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zif_core::{Arch, Origin};

    #[test]
    fn identity_determines_hash() {
        let a = Package::new("hello", 0, "1.0", "1", Arch::new("x86_64"), Origin::Meta);
        let b = Package::new(
            "hello",
            0,
            "1.0",
            "1",
            Arch::new("x86_64"),
            Origin::Repo("base".to_string()),
        );
        assert_eq!(package_id_hash(&a), package_id_hash(&b));
    }

    #[test]
    fn different_identity_differs() {
        let a = Package::new("hello", 0, "1.0", "1", Arch::new("x86_64"), Origin::Meta);
        let b = Package::new("hello", 0, "2.0", "1", Arch::new("x86_64"), Origin::Meta);
        assert_ne!(package_id_hash(&a), package_id_hash(&b));
    }
}
