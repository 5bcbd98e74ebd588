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

use libfuzzer_sys::fuzz_target;
use timbertrace::core::evidence::batch::{BatchBuilder, ForestUnit};
use timbertrace::core::state::merkle::{audit_proofs, MerkleTree};
use timbertrace::core::verify::verify_batch_integrity;

fuzz_target!(|data: &[u8]| {
    let Ok(v) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let batch = BatchBuilder::default().build(&ForestUnit::from_value(&v), "fuzz");
    assert_eq!(batch.records.len(), batch.leaves.len());
    if let Ok(tree) = MerkleTree::build(&batch.leaves) {
        assert_eq!(audit_proofs(&tree).invalid, 0);
    }
    let _ = verify_batch_integrity(None, &v);
});
