//! # SHA-256 Hashing
//!
//! One-shot SHA-256 helpers. Every hash in the transparency log, the
//! commit-reveal protocol, and the duplicate-detection fingerprints is
//! SHA-256; nothing else is used anywhere in the protocol.

use sha2::{Digest, Sha256};

/// SHA-256 output (256-bit).
pub type Hash256 = [u8; 32];

/// Hash data with SHA-256 (one-shot).
pub fn sha256_bytes(data: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash data and return the lowercase hex digest.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256_bytes(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(sha256_bytes(b"lead"), sha256_bytes(b"lead"));
        assert_ne!(sha256_bytes(b"lead"), sha256_bytes(b"Lead"));
    }

    #[test]
    fn test_hex_is_lowercase_64_chars() {
        let h = sha256_hex(b"abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, h.to_lowercase());
    }
}
