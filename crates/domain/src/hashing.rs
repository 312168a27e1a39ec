//! Content addressing.
//!
//! The remote store deduplicates by digest, so hashing always runs over the
//! raw file bytes (never decoded text).

use sha2::{Digest, Sha256};

/// Length of a hex-encoded content hash.
pub const CONTENT_HASH_HEX_LEN: usize = 64;

/// Compute the lowercase hex SHA-256 digest of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            content_hash(b"test"),
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn digest_is_lowercase_hex_of_fixed_length() {
        let hash = content_hash("ünïcödé".as_bytes());
        assert_eq!(hash.len(), CONTENT_HASH_HEX_LEN);
        assert!(hash.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }
}
