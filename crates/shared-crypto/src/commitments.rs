//! # Commit-Reveal Commitments
//!
//! Hash binding for the two-phase validation protocol. A validator first
//! publishes `SHA-256(value || salt)` for each of its three hidden values,
//! then later discloses the values and the salt so anyone can recompute
//! the hashes.
//!
//! Rep scores are hashed over their decimal string form, so `42` with salt
//! `"deadbeef"` commits to `SHA-256("42deadbeef")`.

use crate::hashing::sha256_hex;

/// Commitment hash over a string value and salt.
pub fn commitment_hash(value: &str, salt: &str) -> String {
    let mut buf = String::with_capacity(value.len() + salt.len());
    buf.push_str(value);
    buf.push_str(salt);
    sha256_hex(buf.as_bytes())
}

/// Commitment hash for an integer rep score.
pub fn rep_score_commitment(rep_score: u32, salt: &str) -> String {
    commitment_hash(&rep_score.to_string(), salt)
}

/// Constant-shape check of a revealed value against its stored commitment.
pub fn verify_commitment(value: &str, salt: &str, expected_hash: &str) -> bool {
    // Stored hashes are lowercase hex; normalize the comparison side only.
    commitment_hash(value, salt) == expected_hash.to_lowercase()
}
