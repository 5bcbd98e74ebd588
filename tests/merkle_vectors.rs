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

use timbertrace::core::hash::{keccak256, parse_hash32, to_hex_prefixed, Hash32};
use timbertrace::core::state::merkle::{
    audit_proofs, hash_sorted_pair, merkle_root, proof_from_hex, proof_to_hex, verify_proof,
    MerkleError, MerkleTree,
};

fn h(s: &str) -> Hash32 {
    parse_hash32(s).unwrap()
}

#[test]
fn keccak_vectors() {
    assert_eq!(
        to_hex_prefixed(&keccak256(b"")),
        "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
    );
    assert_eq!(
        to_hex_prefixed(&keccak256(b"abc")),
        "0x4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
    );
}

#[test]
fn empty_leaf_set_is_rejected() {
    assert_eq!(MerkleTree::build(&[]).unwrap_err(), MerkleError::EmptyLeaves);
    assert_eq!(merkle_root(&[]).unwrap_err(), MerkleError::EmptyLeaves);
}

#[test]
fn single_leaf_root_is_the_leaf() {
    let l = keccak256(b"a");
    let tree = MerkleTree::build(&[l]).unwrap();
    assert_eq!(tree.root(), l);
    assert!(tree.proof(&l).unwrap().is_empty());
    assert!(verify_proof(&[], l, l));
}

#[test]
fn pair_hash_is_order_independent() {
    let (a, b) = (keccak256(b"a"), keccak256(b"b"));
    assert_eq!(hash_sorted_pair(&a, &b), hash_sorted_pair(&b, &a));
    assert_eq!(
        to_hex_prefixed(&hash_sorted_pair(&a, &b)),
        "0x805b21d846b189efaeb0377d6bb0d201b3872a363e607c25088f025b0c6ae1f8"
    );
}

#[test]
fn odd_node_is_carried_up() {
    let (a, b, c) = (keccak256(b"a"), keccak256(b"b"), keccak256(b"c"));
    let tree = MerkleTree::build(&[a, b, c]).unwrap();
    assert_eq!(tree.root(), hash_sorted_pair(&hash_sorted_pair(&a, &b), &c));
    assert_eq!(
        tree.hex_root(),
        "0x5842148bc6ebeb52af882a317c765fccd3ae80589b21a9b8cbf21abb630e46a7"
    );

    // The carried leaf has no sibling on the first level.
    let pc = tree.proof(&c).unwrap();
    assert_eq!(pc, vec![hash_sorted_pair(&a, &b)]);
    let pa = tree.proof(&a).unwrap();
    assert_eq!(pa, vec![b, c]);
}

#[test]
fn leaf_order_changes_root() {
    let (a, b, c) = (keccak256(b"a"), keccak256(b"b"), keccak256(b"c"));
    let abc = MerkleTree::build(&[a, b, c]).unwrap().root();
    let cba = MerkleTree::build(&[c, b, a]).unwrap().root();
    assert_ne!(abc, cba);
    assert_eq!(
        cba,
        h("0x62f06d4eb5d61444c0ea23c265ae9f99cb37170d7a082cd7f1e9116f5cc0f3cf")
    );
}

#[test]
fn duplicate_leaf_proves_first_occurrence() {
    let (a, b) = (keccak256(b"a"), keccak256(b"b"));
    let tree = MerkleTree::build(&[a, b, a]).unwrap();
    assert_eq!(tree.index_of(&a), Some(0));
    assert_eq!(tree.proof(&a), tree.proof_at(0));
    assert!(verify_proof(&tree.proof(&a).unwrap(), a, tree.root()));
    let audit = audit_proofs(&tree);
    assert_eq!((audit.total, audit.valid, audit.invalid), (3, 3, 0));
}

#[test]
fn unknown_leaf_has_no_proof() {
    let tree = MerkleTree::build(&[keccak256(b"a")]).unwrap();
    assert!(tree.proof(&keccak256(b"z")).is_none());
    assert!(tree.proof_at(1).is_none());
}

#[test]
fn wrong_root_fails_verification() {
    let (a, b) = (keccak256(b"a"), keccak256(b"b"));
    let tree = MerkleTree::build(&[a, b]).unwrap();
    let p = tree.proof(&a).unwrap();
    assert!(verify_proof(&p, a, tree.root()));
    assert!(!verify_proof(&p, a, keccak256(b"other")));
    assert!(!verify_proof(&p, b, tree.root()));
}

#[test]
fn hex_proof_parses_back() {
    let leaves: Vec<Hash32> = (0u8..7).map(|i| keccak256(&[i])).collect();
    let tree = MerkleTree::build(&leaves).unwrap();
    let p = tree.proof_at(6).unwrap();
    let encoded = proof_to_hex(&p);
    assert!(encoded.iter().all(|s| s.len() == 66 && s.starts_with("0x")));
    let upper: Vec<String> = encoded.iter().map(|s| s.to_uppercase().replacen("0X", "0x", 1)).collect();
    assert_eq!(proof_from_hex(&upper).unwrap(), p);
}
