//! Content hashing.

use sha2::{Digest, Sha256};

/// Hex characters kept for short hashes (64 bits).
const SHORT_LEN: usize = 16;

/// Full SHA-256 of `bytes`, hex encoded.
pub fn content_hash(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

/// Truncated SHA-256 of `bytes`, for file names and cache keys.
pub fn short_hash(bytes: impl AsRef<[u8]>) -> String {
    let mut hash = content_hash(bytes);
    hash.truncate(SHORT_LEN);
    hash
}
