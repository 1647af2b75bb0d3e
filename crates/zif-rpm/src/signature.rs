//! Header signature extraction and trust classification.

use zif_core::TrustKind;

/// Which signature algorithm a header carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// RSA, the preferred/modern algorithm.
    Rsa,
    /// DSA, the legacy fallback when no RSA signature is present.
    Dsa,
}

/// A header signature as read off an RPM file, before keyring lookup.
#[derive(Debug, Clone)]
pub struct HeaderSignature {
    /// Which algorithm signed the header.
    pub algorithm: SignatureAlgorithm,
    /// The signing key's id, hex-encoded.
    pub key_id: String,
}

/// The outcome of looking a header signature's key id up in the keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The key was found: trust = pubkey.
    Found,
    /// The key was not found (after any import attempts): trust = none.
    Missing,
}

impl LookupOutcome {
    /// The resulting [`TrustKind`] for this outcome.
    #[must_use]
    pub const fn trust_kind(self) -> TrustKind {
        match self {
            Self::Found => TrustKind::Pubkey,
            Self::Missing => TrustKind::None,
        }
    }
}

/// Classify a signature against the keyring. This is the pure, single
/// lookup step; the retry-after-import orchestration (scan
/// `/etc/pki/rpm-gpg/*`, then the repo's `gpgkey` URL, then retry once)
/// belongs to the caller, which can call this twice.
#[must_use]
pub fn classify(keyring: &crate::keyring::Keyring, signature: &HeaderSignature) -> LookupOutcome {
    if keyring.contains(&signature.key_id) {
        LookupOutcome::Found
    } else {
        LookupOutcome::Missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring::Keyring;

    #[test]
    fn missing_key_classifies_as_missing() {
        let keyring = Keyring::new();
        let sig = HeaderSignature {
            algorithm: SignatureAlgorithm::Rsa,
            key_id: "deadbeefdeadbeef".to_string(),
        };
        assert_eq!(classify(&keyring, &sig), LookupOutcome::Missing);
        assert_eq!(LookupOutcome::Missing.trust_kind(), TrustKind::None);
    }
}
