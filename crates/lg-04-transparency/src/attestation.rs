//! # Attestation
//!
//! Binds the enclave's signing key to the exact application code. The
//! attestation document's `user_data` is `SHA-256(pubkey || code_hash)`,
//! so a verifier holding the document knows which key signs for which
//! code image.
//!
//! On Nitro hardware the document comes from the NSM device and carries
//! real PCR measurements; outside the enclave we produce a self-signed
//! document with PCRs derived from the code hash, which keeps every
//! verifier code path exercisable.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_crypto::{canonical_json_bytes, sha256_hex, Ed25519KeyPair};

/// Attestation document returned from `get_attestation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationDocument {
    /// Hex-encoded signed document body.
    pub document: String,
    /// Hex enclave public key the document binds.
    pub pubkey: String,
    /// SHA-256 of the deployed application code, cached at boot.
    pub code_hash: String,
    pub pcr0: String,
    pub pcr1: String,
    pub pcr2: String,
}

/// Compute the SHA-256 code hash over a source tree.
///
/// Files are visited in sorted path order; each contributes its file
/// name and raw bytes. Hidden directories, build output, and test files
/// are skipped so the hash is stable across checkouts.
pub fn compute_code_hash(root: &Path) -> std::io::Result<String> {
    let mut files = Vec::new();
    collect_source_files(root, &mut files)?;
    files.sort();

    let mut hasher = Sha256::new();
    for path in files {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            hasher.update(name.as_bytes());
        }
        hasher.update(std::fs::read(&path)?);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn collect_source_files(dir: &Path, out: &mut Vec<std::path::PathBuf>) -> std::io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name == "target" {
            continue;
        }
        if path.is_dir() {
            collect_source_files(&path, out)?;
        } else if name.ends_with(".rs") || name == "Cargo.toml" {
            out.push(path);
        }
    }
    Ok(())
}

/// Build the self-signed attestation document for non-Nitro runs.
pub fn build_attestation(keypair: &Ed25519KeyPair, code_hash: &str) -> AttestationDocument {
    let pubkey = keypair.public_key().to_hex();
    let user_data = sha256_hex(format!("{}{}", pubkey, code_hash).as_bytes());

    // Deterministic pseudo-PCRs; real measurements come from the NSM.
    let pcr0 = sha256_hex(format!("pcr0:{}", code_hash).as_bytes());
    let pcr1 = sha256_hex(format!("pcr1:{}", code_hash).as_bytes());
    let pcr2 = sha256_hex(format!("pcr2:{}", code_hash).as_bytes());

    let body = serde_json::json!({
        "user_data": user_data,
        "pubkey": pubkey,
        "pcr0": pcr0,
        "pcr1": pcr1,
        "pcr2": pcr2,
    });
    let signature = keypair.sign(&canonical_json_bytes(&body));

    AttestationDocument {
        document: signature.to_hex(),
        pubkey,
        code_hash: code_hash.to_string(),
        pcr0,
        pcr1,
        pcr2,
    }
}
