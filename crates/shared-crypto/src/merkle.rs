//! # Merkle Trees for Checkpoints and Assignments
//!
//! Standard construction shared by the checkpoint batcher, the epoch
//! assignment root, and validator manifests:
//!
//! - Leaves are `SHA-256(canonical_json(event))`
//! - Internal nodes are `SHA-256(left || right)`
//! - Odd nodes at any level are paired with themselves
//! - All levels are retained so inclusion proofs can be generated later
//!
//! Changing any leaf invalidates the root; a proof lets an auditor verify
//! one event against a signed root without the full batch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::canonical_json_bytes;
use crate::errors::CryptoError;
use crate::hashing::{sha256_bytes, Hash256};

/// Which side of the path a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// One step of an inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    /// Hex hash of the sibling node.
    pub sibling: String,
    /// Side the sibling sits on relative to the path.
    pub side: Side,
}

/// An inclusion proof: siblings from leaf level up to (not including) the
/// root.
pub type MerkleProof = Vec<ProofStep>;

/// Leaf hash for a transparency event.
pub fn event_leaf_hash(event: &Value) -> Hash256 {
    sha256_bytes(&canonical_json_bytes(event))
}

fn hash_pair(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left);
    buf[32..].copy_from_slice(right);
    sha256_bytes(&buf)
}

/// A fully materialized Merkle tree.
///
/// Level 0 holds the leaves; the last level holds the single root.
#[derive(Debug, Clone, PartialEq)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash256>>,
}

impl MerkleTree {
    /// Build a tree from precomputed leaf hashes.
    pub fn from_leaves(leaves: Vec<Hash256>) -> Result<Self, CryptoError> {
        if leaves.is_empty() {
            return Err(CryptoError::EmptyMerkleTree);
        }

        let mut levels = vec![leaves];
        while levels[levels.len() - 1].len() > 1 {
            let current = &levels[levels.len() - 1];
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                next.push(hash_pair(left, right));
            }
            levels.push(next);
        }
        Ok(Self { levels })
    }

    /// Build a tree over canonical serializations of events.
    pub fn from_events(events: &[Value]) -> Result<Self, CryptoError> {
        Self::from_leaves(events.iter().map(event_leaf_hash).collect())
    }

    /// The root hash.
    pub fn root(&self) -> Hash256 {
        // from_leaves guarantees a non-empty final level.
        self.levels[self.levels.len() - 1][0]
    }

    /// The root as lowercase hex.
    pub fn root_hex(&self) -> String {
        hex::encode(self.root())
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// All levels as hex strings, leaves first. Stored alongside
    /// checkpoints so proofs can be generated after the fact.
    pub fn levels_hex(&self) -> Vec<Vec<String>> {
        self.levels
            .iter()
            .map(|level| level.iter().map(hex::encode).collect())
            .collect()
    }

    /// Generate an inclusion proof for the leaf at `index`.
    pub fn prove(&self, index: usize) -> Result<MerkleProof, CryptoError> {
        let len = self.levels[0].len();
        if index >= len {
            return Err(CryptoError::LeafIndexOutOfRange { index, len });
        }

        let mut proof = Vec::new();
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let (sibling, side) = if idx % 2 == 0 {
                // Left child; sibling is to the right, or the node itself
                // when the level has an odd tail.
                let sibling = level.get(idx + 1).unwrap_or(&level[idx]);
                (sibling, Side::Right)
            } else {
                (&level[idx - 1], Side::Left)
            };
            proof.push(ProofStep {
                sibling: hex::encode(sibling),
                side,
            });
            idx /= 2;
        }
        Ok(proof)
    }
}

/// Fold a proof from a leaf hash and compare against an expected root.
pub fn verify_inclusion(
    leaf: &Hash256,
    proof: &MerkleProof,
    expected_root: &Hash256,
) -> Result<bool, CryptoError> {
    let mut current = *leaf;
    for step in proof {
        let sibling_bytes =
            hex::decode(&step.sibling).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let sibling: Hash256 = sibling_bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidHex("sibling is not 32 bytes".to_string()))?;
        current = match step.side {
            Side::Left => hash_pair(&sibling, &current),
            Side::Right => hash_pair(&current, &sibling),
        };
    }
    Ok(current == *expected_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn events(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"event_type": "TEST", "seq": i})).collect()
    }

    #[test]
    fn test_single_leaf_root_is_leaf() {
        let evs = events(1);
        let tree = MerkleTree::from_events(&evs).unwrap();
        assert_eq!(tree.root(), event_leaf_hash(&evs[0]));
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(
            MerkleTree::from_leaves(vec![]),
            Err(CryptoError::EmptyMerkleTree)
        );
    }

    #[test]
    fn test_odd_leaf_duplicated() {
        // Three leaves: root = H(H(L1||L2) || H(L3||L3)).
        let evs = events(3);
        let l: Vec<Hash256> = evs.iter().map(event_leaf_hash).collect();
        let n12 = hash_pair(&l[0], &l[1]);
        let n33 = hash_pair(&l[2], &l[2]);
        let expected = hash_pair(&n12, &n33);
        let tree = MerkleTree::from_events(&evs).unwrap();
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn test_five_leaf_structure() {
        // L1..L5 -> N12, N34, N55 -> P1=H(N12||N34), P2=H(N55||N55)
        // -> Root=H(P1||P2).
        let evs = events(5);
        let l: Vec<Hash256> = evs.iter().map(event_leaf_hash).collect();
        let n12 = hash_pair(&l[0], &l[1]);
        let n34 = hash_pair(&l[2], &l[3]);
        let n55 = hash_pair(&l[4], &l[4]);
        let p1 = hash_pair(&n12, &n34);
        let p2 = hash_pair(&n55, &n55);
        let root = hash_pair(&p1, &p2);

        let tree = MerkleTree::from_events(&evs).unwrap();
        assert_eq!(tree.root(), root);

        // Proof for E3 (index 2): [(L4, right), (N12, left), (P2, right)].
        let proof = tree.prove(2).unwrap();
        assert_eq!(proof.len(), 3);
        assert_eq!(proof[0], ProofStep { sibling: hex::encode(l[3]), side: Side::Right });
        assert_eq!(proof[1], ProofStep { sibling: hex::encode(n12), side: Side::Left });
        assert_eq!(proof[2], ProofStep { sibling: hex::encode(p2), side: Side::Right });

        assert!(verify_inclusion(&l[2], &proof, &root).unwrap());
    }

    #[test]
    fn test_all_leaves_prove_and_verify() {
        for n in 1..=9 {
            let evs = events(n);
            let tree = MerkleTree::from_events(&evs).unwrap();
            let root = tree.root();
            for (i, ev) in evs.iter().enumerate() {
                let proof = tree.prove(i).unwrap();
                let leaf = event_leaf_hash(ev);
                assert!(verify_inclusion(&leaf, &proof, &root).unwrap());
            }
        }
    }

    #[test]
    fn test_tampered_leaf_fails() {
        let evs = events(4);
        let tree = MerkleTree::from_events(&evs).unwrap();
        let proof = tree.prove(1).unwrap();
        let wrong_leaf = event_leaf_hash(&json!({"event_type": "TEST", "seq": 99}));
        assert!(!verify_inclusion(&wrong_leaf, &proof, &tree.root()).unwrap());
    }

    #[test]
    fn test_out_of_range_proof() {
        let tree = MerkleTree::from_events(&events(2)).unwrap();
        assert!(matches!(
            tree.prove(2),
            Err(CryptoError::LeafIndexOutOfRange { index: 2, len: 2 })
        ));
    }
}
