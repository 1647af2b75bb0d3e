//! RPM keyring: imported public keys, looked up by key id during prepare
//!.

use crate::error::{Error, Result};
use ahash::AHashMap;
use sequoia_openpgp::parse::Parse;
use sequoia_openpgp::Cert;
use std::path::Path;
use tracing::debug;

/// An imported OpenPGP key, keyed by its lowercase-hex key id.
#[derive(Debug, Default)]
pub struct Keyring {
    certs: AHashMap<String, Cert>,
}

impl Keyring {
    /// An empty keyring.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Is a key with this id already imported?
    #[must_use]
    pub fn contains(&self, key_id: &str) -> bool {
        self.certs.contains_key(&normalize_key_id(key_id))
    }

    /// Look up a previously imported key.
    #[must_use]
    pub fn lookup(&self, key_id: &str) -> Option<&Cert> {
        self.certs.get(&normalize_key_id(key_id))
    }

    /// Parse and add a key from armored or binary bytes.
    pub fn add_key(&mut self, bytes: &[u8]) -> Result<()> {
        let cert = Cert::from_bytes(bytes).map_err(|err| Error::KeyImportFailed(err.to_string()))?;
        let key_id = normalize_key_id(&cert.keyid().to_hex());
        debug!(key_id, "imported rpm gpg key");
        self.certs.insert(key_id, cert);
        Ok(())
    }

    /// Import every `*.asc`/`*.gpg`/`*.key` file directly under `dir`
    /// (the usual `/etc/pki/rpm-gpg/*` sweep). Returns the number of
    /// keys successfully imported; unreadable/unparseable
    /// files are skipped rather than failing the whole sweep, since a
    /// bystander file in that directory should not block prepare.
    pub fn import_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.exists() {
            return Ok(0);
        }
        let mut imported = 0;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let is_key_file = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| matches!(ext, "asc" | "gpg" | "key"));
            if !is_key_file {
                continue;
            }
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            if self.add_key(&bytes).is_ok() {
                imported += 1;
            }
        }
        Ok(imported)
    }

    /// Number of keys currently imported.
    #[must_use]
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// Is the keyring empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }
}

fn normalize_key_id(key_id: &str) -> String {
    key_id.trim_start_matches("0x").to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_keyring_has_no_keys() {
        let keyring = Keyring::new();
        assert!(keyring.is_empty());
        assert!(!keyring.contains("deadbeef"));
    }

    #[test]
    fn import_dir_on_missing_path_is_zero() {
        let mut keyring = Keyring::new();
        assert_eq!(keyring.import_dir(Path::new("/does/not/exist")).unwrap(), 0);
    }

    #[test]
    fn add_key_rejects_garbage() {
        let mut keyring = Keyring::new();
        assert!(keyring.add_key(b"not a pgp key").is_err());
    }
}
