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

//! Hash primitives.
//!
//! Every commitment produced by this crate is keccak-256. Roots already anchored on
//! the ledger were computed with it, so the function is fixed for the lifetime of the
//! leaf format.

use sha3::{Digest, Keccak256};
use thiserror::Error;

/// 32-byte digest.
pub type Hash32 = [u8; 32];

/// All-zero digest. A ledger slot that was never written reads back as this value.
pub const ZERO_HASH: Hash32 = [0u8; 32];

/// Hex decoding errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    /// Not valid hex.
    #[error("invalid hex")]
    InvalidHex,
    /// Decoded to something other than 32 bytes.
    #[error("expected 32 bytes, got {0}")]
    BadLength(usize),
}

/// keccak-256 over `data`.
pub fn keccak256(data: &[u8]) -> Hash32 {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// keccak-256 over the concatenation of `parts`, without an intermediate buffer.
pub fn keccak256_concat(parts: &[&[u8]]) -> Hash32 {
    let mut hasher = Keccak256::new();
    for p in parts {
        hasher.update(p);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// `0x`-prefixed lowercase hex (66 chars).
pub fn to_hex_prefixed(h: &Hash32) -> String {
    format!("0x{}", hex::encode(h))
}

/// Parse a 32-byte digest from hex. Accepts an optional `0x`/`0X` prefix and either case.
pub fn parse_hash32(s: &str) -> Result<Hash32, HashError> {
    let t = s.trim();
    let t = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    let bytes = hex::decode(t).map_err(|_| HashError::InvalidHex)?;
    if bytes.len() != 32 {
        return Err(HashError::BadLength(bytes.len()));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Uppercase hex without prefix, as used inside synthetic EPCs.
pub fn to_hex_upper(h: &Hash32) -> String {
    hex::encode_upper(h)
}
