// Copyright (c) 2026 Timbertrace
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Sorted-pair Merkle tree over precomputed leaves.
//!
//! node = keccak256( min(a, b) || max(a, b) )
//!
//! Leaves are used as given (no re-hashing, no sorting of the leaf sequence). A level
//! with an odd number of nodes promotes its last node unchanged. Because pairs are
//! sorted, proofs carry no left/right tags.

use crate::core::hash::{keccak256_concat, parse_hash32, to_hex_prefixed, HashError};
use thiserror::Error;

pub use crate::core::hash::Hash32;

/// Merkle errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    /// Zero leaves.
    #[error("cannot commit an empty batch")]
    EmptyLeaves,
}

/// Hash two nodes in ascending byte order.
pub fn hash_sorted_pair(a: &Hash32, b: &Hash32) -> Hash32 {
    if a <= b {
        keccak256_concat(&[a, b])
    } else {
        keccak256_concat(&[b, a])
    }
}

fn next_level(level: &[Hash32]) -> Vec<Hash32> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [a, b] => hash_sorted_pair(a, b),
            [carry] => *carry,
            _ => unreachable!("chunks(2) yields one or two nodes"),
        })
        .collect()
}

/// Immutable Merkle tree. All levels are kept so proofs are lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    // levels[0] = leaves, last = [root]
    levels: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    /// Build a tree. Fails on an empty leaf sequence.
    pub fn build(leaves: &[Hash32]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyLeaves);
        }
        let mut levels = vec![leaves.to_vec()];
        let mut cur = leaves.to_vec();
        while cur.len() > 1 {
            cur = next_level(&cur);
            levels.push(cur.clone());
        }
        Ok(Self { levels })
    }

    /// Root digest.
    pub fn root(&self) -> Hash32 {
        self.levels
            .last()
            .and_then(|l| l.first())
            .copied()
            .unwrap_or_default()
    }

    /// Root as `0x` lowercase hex.
    pub fn hex_root(&self) -> String {
        to_hex_prefixed(&self.root())
    }

    /// Leaves in commitment order.
    pub fn leaves(&self) -> &[Hash32] {
        self.levels.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves().len()
    }

    /// Always false: empty trees cannot be built.
    pub fn is_empty(&self) -> bool {
        self.leaves().is_empty()
    }

    /// Index of the first occurrence of `leaf`.
    pub fn index_of(&self, leaf: &Hash32) -> Option<usize> {
        self.leaves().iter().position(|l| l == leaf)
    }

    /// Sibling path for the leaf at `index`, bottom-up.
    pub fn proof_at(&self, index: usize) -> Option<Vec<Hash32>> {
        if index >= self.len() {
            return None;
        }
        let mut idx = index;
        let mut path = Vec::with_capacity(self.levels.len());
        for level in self.levels.iter().take(self.levels.len().saturating_sub(1)) {
            let sib = idx ^ 1;
            // A promoted node has no sibling at this level.
            if let Some(h) = level.get(sib) {
                path.push(*h);
            }
            idx /= 2;
        }
        Some(path)
    }

    /// Sibling path for `leaf`. With duplicate leaves the first occurrence is proven.
    pub fn proof(&self, leaf: &Hash32) -> Option<Vec<Hash32>> {
        self.index_of(leaf).and_then(|i| self.proof_at(i))
    }
}

/// Root over `leaves`.
pub fn merkle_root(leaves: &[Hash32]) -> Result<Hash32, MerkleError> {
    MerkleTree::build(leaves).map(|t| t.root())
}

/// Verify a sorted-pair proof. Any mismatch yields `false`.
pub fn verify_proof(proof: &[Hash32], leaf: Hash32, root: Hash32) -> bool {
    let cur = proof
        .iter()
        .fold(leaf, |acc, sibling| hash_sorted_pair(&acc, sibling));
    cur == root
}

/// Proof as `0x` hex strings.
pub fn proof_to_hex(proof: &[Hash32]) -> Vec<String> {
    proof.iter().map(to_hex_prefixed).collect()
}

/// Parse a hex-encoded proof.
pub fn proof_from_hex<S: AsRef<str>>(proof: &[S]) -> Result<Vec<Hash32>, HashError> {
    proof.iter().map(|s| parse_hash32(s.as_ref())).collect()
}

/// Outcome of proving and verifying every leaf of a tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProofAudit {
    /// Leaves checked.
    pub total: usize,
    /// Proofs that verified.
    pub valid: usize,
    /// Proofs that did not.
    pub invalid: usize,
}

/// Prove every leaf (first-occurrence rule) and verify against the root.
pub fn audit_proofs(tree: &MerkleTree) -> ProofAudit {
    let root = tree.root();
    let mut audit = ProofAudit::default();
    for leaf in tree.leaves() {
        audit.total += 1;
        let ok = tree
            .proof(leaf)
            .map(|p| verify_proof(&p, *leaf, root))
            .unwrap_or(false);
        if ok {
            audit.valid += 1;
        } else {
            audit.invalid += 1;
        }
    }
    audit
}
