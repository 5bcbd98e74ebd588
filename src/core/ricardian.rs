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

//! Ricardian contract binding.
//!
//! The contract document is hashed as compact JSON with keys in document order. The
//! hash, the batch root and the unit key are then bound in an EIP-712 typed message;
//! this module produces the digest a wallet signs, not the signature.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::hash::{keccak256, keccak256_concat, parse_hash32, to_hex_prefixed, Hash32};

/// Fields added to a document after hashing. Stripped before re-hashing.
pub const RUNTIME_FIELDS: &[&str] = &["signature", "ipfsUri", "ricardianHash"];

/// Default EIP-712 domain name.
pub const DEFAULT_DOMAIN_NAME: &str = "RicardianForestTracking";
/// Default EIP-712 domain version.
pub const DEFAULT_DOMAIN_VERSION: &str = "1";

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const RICARDIAN_FOREST_TYPE: &str =
    "RicardianForest(string forestUnitKey,bytes32 ricardianHash,bytes32 merkleRoot,string createdAt)";

/// Ricardian errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RicardianError {
    /// The document is not valid JSON.
    #[error("invalid json")]
    InvalidJson,
    /// The document is not a JSON object.
    #[error("document is not an object")]
    NotAnObject,
    /// A hash is not 32 bytes of hex.
    #[error("invalid hash")]
    InvalidHash,
    /// A contract address is not 20 bytes of hex.
    #[error("invalid address")]
    InvalidAddress,
}

/// keccak-256 of the compact JSON rendering of `document`.
pub fn ricardian_hash(document: &Value) -> Hash32 {
    keccak256(document.to_string().as_bytes())
}

/// Result of re-hashing a stored document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RicardianCheck {
    /// Hashes agree.
    pub ok: bool,
    /// Hash of the stored document with runtime fields removed.
    pub fetched_hash: String,
    /// Hash the caller expected, normalized.
    pub expected_hash: String,
}

/// Re-hash a stored document (as fetched from content-addressed storage) and compare
/// with `expected_hash`.
pub fn verify_ricardian_document(
    bytes: &[u8],
    expected_hash: &str,
) -> Result<RicardianCheck, RicardianError> {
    let expected = parse_hash32(expected_hash).map_err(|_| RicardianError::InvalidHash)?;
    let mut doc: Value = serde_json::from_slice(bytes).map_err(|_| RicardianError::InvalidJson)?;
    let obj = doc.as_object_mut().ok_or(RicardianError::NotAnObject)?;
    for f in RUNTIME_FIELDS {
        // shift_remove keeps the remaining keys in document order
        obj.shift_remove(*f);
    }
    let fetched = ricardian_hash(&doc);
    Ok(RicardianCheck {
        ok: fetched == expected,
        fetched_hash: to_hex_prefixed(&fetched),
        expected_hash: to_hex_prefixed(&expected),
    })
}

/// EIP-712 domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eip712Domain {
    /// Domain name.
    pub name: String,
    /// Domain version.
    pub version: String,
    /// Chain id.
    pub chain_id: u64,
    /// Contract address (20 bytes).
    pub verifying_contract: [u8; 20],
}

impl Eip712Domain {
    /// Default name/version for `chain_id` and a `0x`-hex contract address.
    pub fn ricardian_forest(chain_id: u64, verifying_contract: &str) -> Result<Self, RicardianError> {
        Ok(Self {
            name: DEFAULT_DOMAIN_NAME.to_string(),
            version: DEFAULT_DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract: parse_address(verifying_contract)?,
        })
    }

    /// Domain separator.
    pub fn separator(&self) -> Hash32 {
        let mut contract = [0u8; 32];
        contract[12..].copy_from_slice(&self.verifying_contract);
        keccak256_concat(&[
            &keccak256(DOMAIN_TYPE.as_bytes()),
            &keccak256(self.name.as_bytes()),
            &keccak256(self.version.as_bytes()),
            &uint256(self.chain_id),
            &contract,
        ])
    }
}

/// The typed message binding a contract document to a batch root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RicardianForestMessage {
    /// Forest unit key.
    pub forest_unit_key: String,
    /// Ricardian document hash.
    pub ricardian_hash: Hash32,
    /// Batch Merkle root.
    pub merkle_root: Hash32,
    /// Document creation time, as written in the document.
    pub created_at: String,
}

impl RicardianForestMessage {
    /// EIP-712 struct hash.
    pub fn struct_hash(&self) -> Hash32 {
        keccak256_concat(&[
            &keccak256(RICARDIAN_FOREST_TYPE.as_bytes()),
            &keccak256(self.forest_unit_key.as_bytes()),
            &self.ricardian_hash,
            &self.merkle_root,
            &keccak256(self.created_at.as_bytes()),
        ])
    }
}

/// `keccak256(0x19 0x01 || domainSeparator || structHash)`.
pub fn signing_digest(domain: &Eip712Domain, message: &RicardianForestMessage) -> Hash32 {
    keccak256_concat(&[b"\x19\x01", &domain.separator(), &message.struct_hash()])
}

fn uint256(v: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&v.to_be_bytes());
    out
}

/// Parse a 20-byte address from hex, `0x` optional.
pub fn parse_address(s: &str) -> Result<[u8; 20], RicardianError> {
    let t = s.trim();
    let t = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    let bytes = hex::decode(t).map_err(|_| RicardianError::InvalidAddress)?;
    bytes
        .try_into()
        .map_err(|_| RicardianError::InvalidAddress)
}
