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
#![deny(missing_docs)]

//! EPC identity resolution for child records.
//!
//! synthetic = "E280" || UPPER_HEX( keccak256(raw || "|" || seed) )[..20]
//!
//! The parent identity is the seed, so two parents with structurally identical
//! children (two trees each carrying a "log-1") never collide.

use crate::core::hash::{keccak256, to_hex_upper};

/// Prefix of synthetic identities.
pub const SYNTHETIC_EPC_PREFIX: &str = "E280";

/// Hex characters taken from the digest.
pub const SYNTHETIC_EPC_SUFFIX_LEN: usize = 20;

/// Resolve the identity of a record from its raw identifier and its parent's identity.
///
/// Returns an empty string when both inputs are empty: no identity can be assigned and
/// the record must not enter a batch.
pub fn resolve(raw: &str, seed: &str) -> String {
    if raw.is_empty() && seed.is_empty() {
        return String::new();
    }
    if is_issued_epc(raw) {
        return raw.to_string();
    }
    let digest = keccak256(format!("{raw}|{seed}").as_bytes());
    let hex = to_hex_upper(&digest);
    format!("{SYNTHETIC_EPC_PREFIX}{}", &hex[..SYNTHETIC_EPC_SUFFIX_LEN])
}

/// Externally issued EPCs start with `E` (either case) and pass through unchanged.
pub fn is_issued_epc(raw: &str) -> bool {
    raw.chars()
        .next()
        .map(|c| c.eq_ignore_ascii_case(&'e'))
        .unwrap_or(false)
}
