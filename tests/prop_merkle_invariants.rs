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

use proptest::prelude::*;

use timbertrace::core::state::merkle::{audit_proofs, verify_proof, MerkleTree};

proptest! {
    #[test]
    fn every_leaf_proof_verifies(leaves in proptest::collection::vec(any::<[u8; 32]>(), 1..=50)) {
        let tree = MerkleTree::build(&leaves).expect("non-empty");
        let root = tree.root();
        for i in 0..leaves.len() {
            let proof = tree.proof_at(i).expect("index in range");
            prop_assert!(verify_proof(&proof, leaves[i], root));
        }
        let audit = audit_proofs(&tree);
        prop_assert_eq!(audit.total, leaves.len());
        prop_assert_eq!(audit.invalid, 0);
    }

    #[test]
    fn root_is_deterministic(leaves in proptest::collection::vec(any::<[u8; 32]>(), 1..=50)) {
        let a = MerkleTree::build(&leaves).expect("non-empty");
        let b = MerkleTree::build(&leaves.clone()).expect("non-empty");
        prop_assert_eq!(a.root(), b.root());
    }

    #[test]
    fn flipped_leaf_byte_changes_root(
        leaves in proptest::collection::vec(any::<[u8; 32]>(), 1..=50),
        pick in any::<prop::sample::Index>(),
        byte in 0usize..32,
        mask in 1u8..=255,
    ) {
        let i = pick.index(leaves.len());
        let tree = MerkleTree::build(&leaves).expect("non-empty");
        let proof = tree.proof_at(i).expect("index in range");

        let mut tampered = leaves.clone();
        tampered[i][byte] ^= mask;
        let tampered_tree = MerkleTree::build(&tampered).expect("non-empty");

        prop_assert_ne!(tree.root(), tampered_tree.root());
        prop_assert!(!verify_proof(&proof, tampered[i], tree.root()));
    }
}
