//! # Leadgate Cryptographic Primitives
//!
//! Deterministic hashing and signing building blocks for the gateway:
//!
//! - `canonical`: sorted-key, tight-separator JSON for stable hashing
//! - `hashing`: SHA-256 helpers
//! - `merkle`: checkpoint trees and inclusion proofs
//! - `signatures`: Ed25519 keypairs and SS58 wallet verification
//! - `commitments`: commit-reveal hash binding
//! - `fingerprint`: email / LinkedIn duplicate-detection hashes

pub mod canonical;
pub mod commitments;
pub mod errors;
pub mod fingerprint;
pub mod hashing;
pub mod merkle;
pub mod signatures;

pub use canonical::{canonical_json, canonical_json_bytes};
pub use commitments::{commitment_hash, rep_score_commitment, verify_commitment};
pub use errors::CryptoError;
pub use fingerprint::{compute_email_hash, compute_linkedin_combo_hash, normalize_linkedin_url, UrlKind};
pub use hashing::{sha256_bytes, sha256_hex, Hash256};
pub use merkle::{event_leaf_hash, verify_inclusion, MerkleProof, MerkleTree, ProofStep, Side};
pub use signatures::{
    ss58_decode, ss58_encode, verify_ss58_signature, Ed25519KeyPair, Ed25519PublicKey,
    Ed25519Signature,
};
