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

//! Canonical evidence types, the leaf hash contract, and codecs.
//!
//! Forest leaf preimage (field order is part of the commitment format):
//!
//! ```text
//! kind|identity|firstReading|subType|coordinates|notes|parentId|grandparentId|observations|containerId|identity|deleted(0/1)|lastModification
//! ```
//!
//! Flight leaf preimage:
//!
//! ```text
//! device_id|timestamp|latitude|longitude|signature
//! ```

use crate::core::hash::{keccak256, Hash32};
use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Canonical serialization error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Encoding failed.
    #[error("serialization")]
    Serialize,
    /// Bytes do not decode to the expected type.
    #[error("deserialization")]
    Deserialize,
    /// Input exceeds the decode limit.
    #[error("size limit exceeded")]
    TooLarge,
}

/// Canonical bincode options (deterministic).
fn bincode_opts() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode with deterministic rules.
pub fn encode_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    bincode_opts()
        .serialize(v)
        .map_err(|_| CodecError::Serialize)
}

/// Decode with a hard size cap.
pub fn decode_canonical_limited<T: DeserializeOwned>(
    bytes: &[u8],
    max: usize,
) -> Result<T, CodecError> {
    if bytes.len() > max {
        return Err(CodecError::TooLarge);
    }
    bincode_opts()
        .with_limit(max as u64)
        .deserialize(bytes)
        .map_err(|_| CodecError::Deserialize)
}

/// Kind of a committed forest record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Standing or felled tree (root of the graph).
    Tree,
    /// Log cut from a tree.
    WoodLog,
    /// Sawn timber cut from a log.
    SawnTimber,
}

impl RecordKind {
    /// Name as it appears in the leaf preimage and the persisted batch.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Tree => "Tree",
            RecordKind::WoodLog => "WoodLog",
            RecordKind::SawnTimber => "SawnTimber",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit committed to the tree. Serialized field names form the persisted batch format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    /// Record kind.
    pub kind: RecordKind,
    /// Identity, unique within a batch.
    pub identity: String,
    /// Formatted first reading time (empty if unknown).
    pub first_reading: String,
    /// Species, `"Unknown"` when not resolvable.
    pub sub_type: String,
    /// Immediate parent identity (empty for trees).
    pub parent_id: String,
    /// Grandparent identity (sawn timber only).
    pub grandparent_id: String,
    /// `"<lat>,<lon>"` or empty.
    pub coordinates: String,
    /// Notes joined by `"; "`.
    pub notes: String,
    /// Observations joined by `"; "`, or the no-observation sentinel.
    pub observations: String,
    /// Enclosing unit/batch identifier.
    pub container_id: String,
    /// Soft-delete flag.
    pub deleted: bool,
    /// Last modification marker, verbatim from upstream.
    pub last_modification: String,
}

impl CanonicalRecord {
    /// Borrow the hashed fields.
    pub fn leaf_fields(&self) -> LeafFields<'_> {
        LeafFields {
            kind: self.kind.as_str(),
            identity: &self.identity,
            first_reading: &self.first_reading,
            sub_type: &self.sub_type,
            coordinates: &self.coordinates,
            notes: &self.notes,
            parent_id: &self.parent_id,
            grandparent_id: &self.grandparent_id,
            observations: &self.observations,
            container_id: &self.container_id,
            deleted: self.deleted,
            last_modification: &self.last_modification,
        }
    }

    /// Leaf hash of this record.
    pub fn leaf(&self) -> Hash32 {
        self.leaf_fields().leaf()
    }
}

/// Borrowed view over the fields that enter a forest leaf.
///
/// Persisted batches are re-hashed through this view without requiring the kind to be
/// one of the known variants, so a tampered kind still produces a (different) leaf.
#[derive(Clone, Copy, Debug)]
pub struct LeafFields<'a> {
    /// Kind name.
    pub kind: &'a str,
    /// Identity.
    pub identity: &'a str,
    /// First reading.
    pub first_reading: &'a str,
    /// Sub type.
    pub sub_type: &'a str,
    /// Coordinates.
    pub coordinates: &'a str,
    /// Notes.
    pub notes: &'a str,
    /// Parent identity.
    pub parent_id: &'a str,
    /// Grandparent identity.
    pub grandparent_id: &'a str,
    /// Observations.
    pub observations: &'a str,
    /// Container id.
    pub container_id: &'a str,
    /// Deleted flag.
    pub deleted: bool,
    /// Last modification.
    pub last_modification: &'a str,
}

impl LeafFields<'_> {
    /// Pipe-delimited preimage. Identity appears twice; the second copy is the domain marker.
    pub fn preimage(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.kind,
            self.identity,
            self.first_reading,
            self.sub_type,
            self.coordinates,
            self.notes,
            self.parent_id,
            self.grandparent_id,
            self.observations,
            self.container_id,
            self.identity,
            if self.deleted { '1' } else { '0' },
            self.last_modification,
        )
    }

    /// keccak-256 of the preimage.
    pub fn leaf(&self) -> Hash32 {
        keccak256(self.preimage().as_bytes())
    }
}

/// One drone flight-data point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Device that produced the point.
    pub device_id: String,
    /// Device timestamp, rendered as upstream sent it.
    pub timestamp: String,
    /// Latitude text.
    pub latitude: String,
    /// Longitude text.
    pub longitude: String,
    /// Device signature over the payload.
    pub signature: String,
}

impl FlightRecord {
    /// Pipe-delimited preimage.
    pub fn preimage(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.device_id, self.timestamp, self.latitude, self.longitude, self.signature
        )
    }

    /// Leaf hash.
    pub fn leaf(&self) -> Hash32 {
        keccak256(self.preimage().as_bytes())
    }
}

/// Lifecycle of a staged commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentStatus {
    /// Root computed and batch persisted; not yet confirmed by the ledger.
    Pending,
    /// Ledger accepted the root.
    Confirmed,
}

/// Durable commitment bookkeeping for one container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    /// Container id.
    pub container_id: String,
    /// Root as `0x` hex.
    pub root: String,
    /// Number of leaves under the root.
    pub leaf_count: u64,
    /// Pending or confirmed.
    pub status: CommitmentStatus,
    /// Ledger confirmation reference (e.g. transaction hash), once confirmed.
    pub ledger_ref: Option<String>,
}

/// Upper bound on an encoded `CommitmentRecord`.
pub const MAX_COMMITMENT_RECORD_BYTES: usize = 64 * 1024;

/// Persisted batch form: a pretty-printed JSON array of canonical records.
pub fn encode_batch_json(batch: &[CanonicalRecord]) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec_pretty(batch).map_err(|_| CodecError::Serialize)
}

/// Decode a persisted batch as a generic JSON value (verification accepts partial records).
pub fn decode_batch_json(bytes: &[u8]) -> Result<serde_json::Value, CodecError> {
    serde_json::from_slice(bytes).map_err(|_| CodecError::Deserialize)
}
