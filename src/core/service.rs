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

//! Commitment service: builds batches, stages them with their root, records ledger
//! confirmations and re-verifies stored batches.
//!
//! Submitting the root to the ledger is the caller's job. The service only keeps the
//! durable artifacts needed to prove and re-verify what was submitted.
//!
//! Store layout:
//!
//! | key                     | value                               |
//! |-------------------------|-------------------------------------|
//! | `batch/<container>`     | persisted batch (JSON array)        |
//! | `commitment/<container>`| [`CommitmentRecord`] (bincode)      |

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::core::config::PipelineConfig;
use crate::core::evidence::batch::{BuiltBatch, ForestUnit};
use crate::core::hash::{parse_hash32, to_hex_prefixed, Hash32, HashError};
use crate::core::state::merkle::{proof_to_hex, MerkleTree};
use crate::core::state::persistent_state::{KvOp, KvStore, StoreError};
use crate::core::types::{
    decode_batch_json, decode_canonical_limited, encode_batch_json, encode_canonical, CodecError,
    CommitmentRecord, CommitmentStatus, MAX_COMMITMENT_RECORD_BYTES,
};
use crate::core::verify::{persisted_leaves, verify_batch_integrity, IntegrityReport, VerifyError};
use crate::monitoring::metrics::Metrics;

const BATCH_PREFIX: &str = "batch/";
const COMMITMENT_PREFIX: &str = "commitment/";

/// Service errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The unit produced no records.
    #[error("cannot commit an empty batch")]
    EmptyBatch,
    /// Nothing is staged under this container id.
    #[error("unknown container: {0}")]
    UnknownContainer(String),
    /// No record in the batch carries this identity.
    #[error("identity not in batch: {0}")]
    UnknownIdentity(String),
    /// The confirmed root differs from the staged one.
    #[error("root mismatch: staged {staged}, confirmed {confirmed}")]
    RootMismatch {
        /// Staged root.
        staged: String,
        /// Root reported by the ledger.
        confirmed: String,
    },
    /// A different batch was staged for a confirmed container.
    #[error("container {0} already confirmed with a different root")]
    AlreadyConfirmed(String),
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Encoding or decoding failure.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Verification failure.
    #[error(transparent)]
    Verify(#[from] VerifyError),
    /// Malformed root.
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// A built batch together with its tree.
#[derive(Clone, Debug)]
pub struct UnitCommitment {
    /// Container id stamped on every record.
    pub container_id: String,
    /// Batch.
    pub batch: BuiltBatch,
    /// Tree over `batch.leaves`.
    pub tree: MerkleTree,
}

impl UnitCommitment {
    /// Root digest.
    pub fn root(&self) -> Hash32 {
        self.tree.root()
    }

    /// Pending commitment record for this batch.
    pub fn pending_record(&self) -> CommitmentRecord {
        CommitmentRecord {
            container_id: self.container_id.clone(),
            root: self.tree.hex_root(),
            leaf_count: self.tree.len() as u64,
            status: CommitmentStatus::Pending,
            ledger_ref: None,
        }
    }
}

/// Inclusion proof for one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProofBundle {
    /// Record identity.
    pub identity: String,
    /// Leaf.
    pub leaf: String,
    /// Sibling path, bottom-up.
    pub proof: Vec<String>,
    /// Root.
    pub root: String,
}

/// Inclusion proof for the record with `identity` in a persisted batch.
pub fn proof_in_batch(batch: &Value, identity: &str) -> Result<ProofBundle, ServiceError> {
    let leaves = persisted_leaves(batch)?;
    let idx = batch
        .as_array()
        .and_then(|items| {
            items
                .iter()
                .position(|r| r.get("identity").and_then(Value::as_str) == Some(identity))
        })
        .ok_or_else(|| ServiceError::UnknownIdentity(identity.to_string()))?;
    let tree = MerkleTree::build(&leaves).map_err(|_| ServiceError::EmptyBatch)?;
    let leaf = leaves[idx];
    let proof = tree
        .proof(&leaf)
        .ok_or_else(|| ServiceError::UnknownIdentity(identity.to_string()))?;
    Ok(ProofBundle {
        identity: identity.to_string(),
        leaf: to_hex_prefixed(&leaf),
        proof: proof_to_hex(&proof),
        root: tree.hex_root(),
    })
}

fn batch_key(container_id: &str) -> Vec<u8> {
    format!("{BATCH_PREFIX}{container_id}").into_bytes()
}

fn commitment_key(container_id: &str) -> Vec<u8> {
    format!("{COMMITMENT_PREFIX}{container_id}").into_bytes()
}

/// Commitment service over an injected store.
pub struct CommitmentService<S: KvStore> {
    store: S,
    config: PipelineConfig,
    metrics: Option<Arc<Metrics>>,
}

impl<S: KvStore> CommitmentService<S> {
    /// Create a service.
    pub fn new(store: S, config: PipelineConfig) -> Self {
        Self {
            store,
            config,
            metrics: None,
        }
    }

    /// Attach metrics.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the batch and tree for `unit`. Empty batches are rejected.
    pub fn build_unit(
        &self,
        container_id: &str,
        unit: &ForestUnit,
    ) -> Result<UnitCommitment, ServiceError> {
        let batch = self.config.batch_builder().build(unit, container_id);
        if let Some(m) = &self.metrics {
            m.observe_batch(&batch);
        }
        let tree = MerkleTree::build(&batch.leaves).map_err(|_| ServiceError::EmptyBatch)?;
        info!(container_id, root = %tree.hex_root(), leaves = tree.len(), "unit built");
        Ok(UnitCommitment {
            container_id: container_id.to_string(),
            batch,
            tree,
        })
    }

    /// Persist the batch and a pending commitment record in one atomic write.
    ///
    /// Re-staging an unchanged batch after confirmation returns the confirmed record
    /// untouched; a different batch for a confirmed container is refused.
    pub fn stage(&self, unit: &UnitCommitment) -> Result<CommitmentRecord, ServiceError> {
        let id = unit.container_id.as_str();
        if let Some(existing) = self.commitment(id)? {
            if existing.status == CommitmentStatus::Confirmed {
                if parse_hash32(&existing.root)? == unit.root() {
                    return Ok(existing);
                }
                return Err(ServiceError::AlreadyConfirmed(id.to_string()));
            }
        }

        let record = unit.pending_record();
        let batch_bytes = encode_batch_json(&unit.batch.records)?;
        let record_bytes = encode_canonical(&record)?;
        self.store.commit_atomic(vec![
            KvOp::put(batch_key(id), batch_bytes),
            KvOp::put(commitment_key(id), record_bytes),
        ])?;
        info!(container_id = id, root = %record.root, "commitment staged");
        Ok(record)
    }

    /// Commitment record for a container, if staged.
    pub fn commitment(&self, container_id: &str) -> Result<Option<CommitmentRecord>, ServiceError> {
        match self.store.get(&commitment_key(container_id))? {
            Some(bytes) => Ok(Some(decode_canonical_limited(
                &bytes,
                MAX_COMMITMENT_RECORD_BYTES,
            )?)),
            None => Ok(None),
        }
    }

    /// Persisted batch of a container.
    pub fn load_batch(&self, container_id: &str) -> Result<Value, ServiceError> {
        let bytes = self
            .store
            .get(&batch_key(container_id))?
            .ok_or_else(|| ServiceError::UnknownContainer(container_id.to_string()))?;
        Ok(decode_batch_json(&bytes)?)
    }

    /// Staged container ids, ascending.
    pub fn containers(&self) -> Result<Vec<String>, ServiceError> {
        let keys = self.store.keys_with_prefix(COMMITMENT_PREFIX.as_bytes())?;
        Ok(keys
            .into_iter()
            .filter_map(|k| {
                k.strip_prefix(COMMITMENT_PREFIX.as_bytes())
                    .map(|id| String::from_utf8_lossy(id).into_owned())
            })
            .collect())
    }

    /// Mark a staged commitment as accepted by the ledger. `root` must equal the
    /// staged root.
    pub fn record_confirmation(
        &self,
        container_id: &str,
        root: &str,
        ledger_ref: Option<&str>,
    ) -> Result<CommitmentRecord, ServiceError> {
        let mut record = self
            .commitment(container_id)?
            .ok_or_else(|| ServiceError::UnknownContainer(container_id.to_string()))?;
        let confirmed = parse_hash32(root)?;
        if parse_hash32(&record.root)? != confirmed {
            return Err(ServiceError::RootMismatch {
                staged: record.root,
                confirmed: to_hex_prefixed(&confirmed),
            });
        }
        record.status = CommitmentStatus::Confirmed;
        record.ledger_ref = ledger_ref.map(str::to_string);
        self.store.commit_atomic(vec![KvOp::put(
            commitment_key(container_id),
            encode_canonical(&record)?,
        )])?;
        info!(container_id, ledger_ref = ?record.ledger_ref, "commitment confirmed");
        Ok(record)
    }

    /// Re-verify a stored batch. Without an explicit root the confirmed root on record
    /// is used; a pending commitment reports "not committed".
    pub fn verify_stored(
        &self,
        container_id: &str,
        committed_root: Option<&str>,
    ) -> Result<IntegrityReport, ServiceError> {
        let batch = self.load_batch(container_id)?;
        let root = match committed_root {
            Some(r) => Some(r.to_string()),
            None => self
                .commitment(container_id)?
                .filter(|r| r.status == CommitmentStatus::Confirmed)
                .map(|r| r.root),
        };
        let report = verify_batch_integrity(root.as_deref(), &batch)?;
        if let Some(m) = &self.metrics {
            m.observe_integrity(report.status);
        }
        Ok(report)
    }

    /// Inclusion proof for `identity` in a stored batch.
    pub fn proof_for(&self, container_id: &str, identity: &str) -> Result<ProofBundle, ServiceError> {
        let batch = self.load_batch(container_id)?;
        proof_in_batch(&batch, identity)
    }
}
