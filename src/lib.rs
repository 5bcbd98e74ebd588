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

//! Timbertrace - evidence batches and Merkle commitments for forest traceability data.
//!
//! This crate provides:
//! - Normalization of upstream tree / wood log / sawn timber records into canonical records
//! - Deterministic batch building with identity dedup and synthetic EPCs
//! - keccak-256 sorted-pair Merkle roots and inclusion proofs
//! - Re-verification of persisted batches against committed roots
//! - Drone flight-data batches and Ricardian contract digests
//! - Durable staging in sled, Prometheus metrics and structured logging

/// Pipeline primitives (types, evidence, state, verification).
pub mod core;
/// Observability (metrics, logging setup).
pub mod monitoring;
