//! # Ed25519 Signatures and SS58 Identities
//!
//! Twisted Edwards curve signatures with deterministic nonces, plus the
//! SS58 address decoding needed to verify wallet signatures from chain
//! hotkeys.
//!
//! ## Security Properties
//!
//! - No RNG dependency at signing time (deterministic nonce from message)
//! - SS58 checksum verified (blake2b-512 over `SS58PRE || prefix || body`)

use blake2::{Blake2b512, Digest};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroize;

use crate::errors::CryptoError;

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create from bytes, validating the curve point.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse from hex (with or without a `0x` prefix).
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidHex("signature is not 64 bytes".to_string()))?;
        Ok(Self(arr))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Ed25519 keypair.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate a random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from a secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Get the public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message (deterministic).
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Get the secret seed (for persistence).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Drop for Ed25519KeyPair {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

// =============================================================================
// SS58
// =============================================================================

/// Checksum preamble defined by the SS58 format.
const SS58_PREFIX: &[u8] = b"SS58PRE";

/// Decode an SS58 address into its 32-byte Ed25519 public key.
///
/// Accepts single-byte network prefixes (covers the substrate/bittensor
/// range used by hotkeys). The 2-byte blake2b-512 checksum is verified.
pub fn ss58_decode(address: &str) -> Result<[u8; 32], CryptoError> {
    let raw = bs58::decode(address)
        .into_vec()
        .map_err(|e| CryptoError::InvalidSs58Address(e.to_string()))?;

    // 1 prefix byte + 32 body bytes + 2 checksum bytes.
    if raw.len() != 35 {
        return Err(CryptoError::InvalidSs58Address(format!(
            "unexpected length {}",
            raw.len()
        )));
    }

    let (body, checksum) = raw.split_at(33);
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(body);
    let digest = hasher.finalize();
    if digest[..2] != checksum[..2] {
        return Err(CryptoError::InvalidSs58Address("checksum mismatch".to_string()));
    }

    let mut pubkey = [0u8; 32];
    pubkey.copy_from_slice(&body[1..33]);
    Ok(pubkey)
}

/// Encode a 32-byte public key as an SS58 address with the given network
/// prefix (42 = generic substrate).
pub fn ss58_encode(pubkey: &[u8; 32], prefix: u8) -> String {
    let mut body = Vec::with_capacity(35);
    body.push(prefix);
    body.extend_from_slice(pubkey);

    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(&body);
    let digest = hasher.finalize();
    body.extend_from_slice(&digest[..2]);

    bs58::encode(body).into_string()
}

/// Verify a detached Ed25519 signature from an SS58-identified wallet.
pub fn verify_ss58_signature(
    message: &[u8],
    signature_hex: &str,
    ss58_address: &str,
) -> Result<(), CryptoError> {
    let pubkey_bytes = ss58_decode(ss58_address)?;
    let pubkey = Ed25519PublicKey::from_bytes(pubkey_bytes)?;
    let signature = Ed25519Signature::from_hex(signature_hex)?;
    pubkey.verify(message, &signature)
}
