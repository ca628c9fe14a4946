//! Content hashing for stale-input detection and reproducibility checks.
//!
//! Input hashing (the resume controller's stale-input guard) and
//! reproducibility checks both need a stable digest over file content.
//! BLAKE3 is used throughout, matching the hashing
//! algorithm this crate's lineage already standardized on for receipts.

use camino::Utf8Path;
use std::io;

/// BLAKE3 digest of a file's bytes, hex-encoded.
pub fn hash_file(path: &Utf8Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

/// BLAKE3 digest of an in-memory buffer, hex-encoded.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Hash a set of (path, content) pairs order-independently by sorting on
/// path first, then feeding path+digest pairs into a combining hasher. Used
/// to compare a stage's full declared-input set against its last-recorded
/// hash set.
#[must_use]
pub fn hash_input_set(mut entries: Vec<(String, String)>) -> String {
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    let mut hasher = blake3::Hasher::new();
    for (path, digest) in entries {
        hasher.update(path.as_bytes());
        hasher.update(b"\0");
        hasher.update(digest.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}
