//! Content hashing utilities.

use xxhash_rust::xxh3::{xxh3_128, xxh3_64};

/// Compute a content hash for arbitrary bytes
pub fn content_hash(data: &[u8]) -> u64 {
    xxh3_64(data)
}

/// Compute a 128-bit content hash rendered as lowercase hex.
///
/// Used for observation row keys, where collisions across millions of
/// records must stay negligible.
#[must_use]
pub fn content_hash_hex(data: &[u8]) -> String {
    format!("{:032x}", xxh3_128(data))
}
