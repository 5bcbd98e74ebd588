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

//! Pipeline metrics.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

use crate::core::evidence::batch::BuiltBatch;
use crate::core::verify::IntegrityStatus;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or text encoding failed.
    #[error("prometheus")]
    Prom,
}

/// Metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Batches built.
    pub batches_built_total: IntCounter,
    /// Records admitted into built batches.
    pub records_committed_total: IntCounter,
    /// Records dropped as duplicate identities.
    pub duplicates_skipped_total: IntCounter,
    /// Records dropped for lack of an identity.
    pub unidentified_skipped_total: IntCounter,
    /// Size of the most recent batch.
    pub last_batch_size: IntGauge,

    /// Integrity checks that matched.
    pub integrity_match_total: IntCounter,
    /// Integrity checks that did not match.
    pub integrity_mismatch_total: IntCounter,
    /// Integrity checks with no committed root.
    pub integrity_not_committed_total: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, MetricsError> {
    let c = IntCounter::new(name, help).map_err(|_| MetricsError::Prom)?;
    registry
        .register(Box::new(c.clone()))
        .map_err(|_| MetricsError::Prom)?;
    Ok(c)
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let batches_built_total =
            counter(&registry, "timbertrace_batches_built_total", "Batches built")?;
        let records_committed_total = counter(
            &registry,
            "timbertrace_records_committed_total",
            "Records admitted into batches",
        )?;
        let duplicates_skipped_total = counter(
            &registry,
            "timbertrace_duplicates_skipped_total",
            "Records skipped as duplicate identities",
        )?;
        let unidentified_skipped_total = counter(
            &registry,
            "timbertrace_unidentified_skipped_total",
            "Records skipped without identity",
        )?;

        let last_batch_size =
            IntGauge::new("timbertrace_last_batch_size", "Records in the last batch")
                .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(last_batch_size.clone()))
            .map_err(|_| MetricsError::Prom)?;

        let integrity_match_total = counter(
            &registry,
            "timbertrace_integrity_match_total",
            "Integrity checks that matched",
        )?;
        let integrity_mismatch_total = counter(
            &registry,
            "timbertrace_integrity_mismatch_total",
            "Integrity checks that did not match",
        )?;
        let integrity_not_committed_total = counter(
            &registry,
            "timbertrace_integrity_not_committed_total",
            "Integrity checks without a committed root",
        )?;

        Ok(Self {
            registry,
            batches_built_total,
            records_committed_total,
            duplicates_skipped_total,
            unidentified_skipped_total,
            last_batch_size,
            integrity_match_total,
            integrity_mismatch_total,
            integrity_not_committed_total,
        })
    }

    /// Account for a built batch.
    pub fn observe_batch(&self, batch: &BuiltBatch) {
        self.batches_built_total.inc();
        self.records_committed_total.inc_by(batch.len() as u64);
        self.duplicates_skipped_total
            .inc_by(batch.duplicates_skipped as u64);
        self.unidentified_skipped_total
            .inc_by(batch.unidentified_skipped as u64);
        self.last_batch_size.set(batch.len() as i64);
    }

    /// Account for an integrity check.
    pub fn observe_integrity(&self, status: IntegrityStatus) {
        match status {
            IntegrityStatus::Match => self.integrity_match_total.inc(),
            IntegrityStatus::Mismatch => self.integrity_mismatch_total.inc(),
            IntegrityStatus::NotCommitted => self.integrity_not_committed_total.inc(),
        }
    }

    /// Prometheus text exposition of all metrics.
    pub fn render(&self) -> Result<String, MetricsError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|_| MetricsError::Prom)?;
        String::from_utf8(buf).map_err(|_| MetricsError::Prom)
    }
}
