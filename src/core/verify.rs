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

//! Re-verification of persisted batches against a committed root.
//!
//! A root mismatch is an outcome, not an error: it is what tamper detection looks
//! like. Only structurally unusable input (not an array, empty, unparseable root) is
//! rejected.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::evidence::flight::{build_flight_batch, FlightError};
use crate::core::hash::{parse_hash32, to_hex_prefixed, Hash32, ZERO_HASH};
use crate::core::state::merkle::{MerkleError, MerkleTree};
use crate::core::types::LeafFields;

/// Verification errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    /// The batch is not a JSON array.
    #[error("batch is not an array")]
    NotAnArray,
    /// The batch has no records.
    #[error("batch is empty")]
    EmptyBatch,
    /// The committed root is not a 32-byte hex digest.
    #[error("invalid committed root")]
    InvalidRoot,
}

impl From<FlightError> for VerifyError {
    fn from(e: FlightError) -> Self {
        match e {
            FlightError::NotAnArray => VerifyError::NotAnArray,
        }
    }
}

impl From<MerkleError> for VerifyError {
    fn from(e: MerkleError) -> Self {
        match e {
            MerkleError::EmptyLeaves => VerifyError::EmptyBatch,
        }
    }
}

/// Outcome of an integrity check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityStatus {
    /// Recomputed root equals the committed root.
    Match,
    /// Recomputed root differs.
    Mismatch,
    /// No root has been committed yet.
    NotCommitted,
}

/// Structured integrity report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Outcome.
    pub status: IntegrityStatus,
    /// `true` only for [`IntegrityStatus::Match`].
    #[serde(rename = "match")]
    pub matched: bool,
    /// Root recomputed from the batch.
    pub computed_root: String,
    /// Root the batch was checked against, normalized to lowercase `0x` hex.
    pub committed_root: Option<String>,
    /// Records re-hashed.
    pub leaf_count: usize,
}

/// Parse a committed root. `None`, blank, bare `0x` and the all-zero digest all mean
/// "not committed".
pub fn parse_committed_root(committed: Option<&str>) -> Result<Option<Hash32>, VerifyError> {
    let Some(s) = committed.map(str::trim) else {
        return Ok(None);
    };
    if s.is_empty() || s.eq_ignore_ascii_case("0x") {
        return Ok(None);
    }
    let h = parse_hash32(s).map_err(|_| VerifyError::InvalidRoot)?;
    Ok((h != ZERO_HASH).then_some(h))
}

fn text_field<'a>(obj: &'a Value, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Leaf for one persisted record. Missing or mistyped fields hash as empty.
pub fn persisted_leaf(rec: &Value) -> Hash32 {
    LeafFields {
        kind: text_field(rec, "kind"),
        identity: text_field(rec, "identity"),
        first_reading: text_field(rec, "firstReading"),
        sub_type: text_field(rec, "subType"),
        coordinates: text_field(rec, "coordinates"),
        notes: text_field(rec, "notes"),
        parent_id: text_field(rec, "parentId"),
        grandparent_id: text_field(rec, "grandparentId"),
        observations: text_field(rec, "observations"),
        container_id: text_field(rec, "containerId"),
        deleted: rec.get("deleted").and_then(Value::as_bool).unwrap_or(false),
        last_modification: text_field(rec, "lastModification"),
    }
    .leaf()
}

/// Leaves of a persisted forest batch, in stored order.
pub fn persisted_leaves(batch: &Value) -> Result<Vec<Hash32>, VerifyError> {
    let items = batch.as_array().ok_or(VerifyError::NotAnArray)?;
    if items.is_empty() {
        return Err(VerifyError::EmptyBatch);
    }
    Ok(items.iter().map(persisted_leaf).collect())
}

/// Compare the root over `leaves` with `committed_root`.
pub fn verify_leaves(
    committed_root: Option<&str>,
    leaves: &[Hash32],
) -> Result<IntegrityReport, VerifyError> {
    let committed = parse_committed_root(committed_root)?;
    let tree = MerkleTree::build(leaves)?;
    let computed = tree.root();

    let status = match committed {
        None => IntegrityStatus::NotCommitted,
        Some(c) if c == computed => IntegrityStatus::Match,
        Some(_) => IntegrityStatus::Mismatch,
    };
    let report = IntegrityReport {
        status,
        matched: status == IntegrityStatus::Match,
        computed_root: to_hex_prefixed(&computed),
        committed_root: committed.as_ref().map(to_hex_prefixed),
        leaf_count: leaves.len(),
    };
    match status {
        IntegrityStatus::Mismatch => warn!(
            computed = %report.computed_root,
            committed = ?report.committed_root,
            leaves = report.leaf_count,
            "batch root mismatch"
        ),
        _ => info!(status = ?status, leaves = report.leaf_count, "batch integrity checked"),
    }
    Ok(report)
}

/// Verify a persisted forest batch against a committed root.
pub fn verify_batch_integrity(
    committed_root: Option<&str>,
    batch: &Value,
) -> Result<IntegrityReport, VerifyError> {
    let leaves = persisted_leaves(batch)?;
    verify_leaves(committed_root, &leaves)
}

/// Verify raw flight points against a committed root.
pub fn verify_flight_integrity(
    committed_root: Option<&str>,
    records: &Value,
    device_id: &str,
) -> Result<IntegrityReport, VerifyError> {
    let batch = build_flight_batch(records, device_id)?;
    verify_leaves(committed_root, &batch.leaves)
}
