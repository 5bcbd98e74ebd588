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

#![no_main]
#![forbid(unsafe_code)]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use timbertrace::core::state::merkle::{verify_proof, MerkleTree};

#[derive(Clone, Debug, Arbitrary)]
struct Input {
    leaves: Vec<[u8; 32]>,
    index: u16,
    proof: Vec<[u8; 32]>,
}

fuzz_target!(|inp: Input| {
    let Ok(tree) = MerkleTree::build(&inp.leaves) else {
        return;
    };
    let idx = (inp.index as usize) % inp.leaves.len();
    let leaf = inp.leaves[idx];

    if let Some(p) = tree.proof_at(idx) {
        assert!(verify_proof(&p, leaf, tree.root()));
    }
    let _ = verify_proof(&inp.proof, leaf, tree.root());
});
