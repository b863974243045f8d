//! Content hashing so results can be joined back to the exact image bytes.

/// BLAKE3 hex digest of an image's bytes.
pub fn content_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}
