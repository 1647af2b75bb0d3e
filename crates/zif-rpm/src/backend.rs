//! Reading RPM headers off disk: NEVRA and relation lists for a
//! standalone `.rpm` file, plus its signature, if any.

use crate::error::Result;
use crate::signature::HeaderSignature;
use std::path::Path;
use zif_core::Package;

/// Reads headers from `.rpm` files. A real binding to `librpm`'s header
/// API implements this trait; Zif's prepare phase only depends on it.
pub trait HeaderReader: std::fmt::Debug + Send + Sync {
    /// Parse `path` into a `Package` with `Origin::LocalFile`, all
    /// attributes populated eagerly (a standalone file has no lazy
    /// store to defer to).
    fn read_package(&self, path: &Path) -> Result<Package>;

    /// Extract the header's RSA (or DSA fallback) signature, if the
    /// file carries one.
    fn read_signature(&self, path: &Path) -> Result<Option<HeaderSignature>>;
}
