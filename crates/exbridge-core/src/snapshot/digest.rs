//! Content digests for exchanged blobs.
//!
//! The poller compares digests of successive file reads so that a rewrite
//! with identical bytes is not forwarded into the pipeline.

use sha2::{Digest, Sha256};

/// Compute the hex-encoded SHA256 digest of raw content.
///
/// ## Example
///
/// ```
/// use exbridge_core::snapshot::digest::content_digest;
///
/// let digest = content_digest(b"{\"a\":1}");
/// assert_eq!(digest.len(), 64);
/// ```
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
