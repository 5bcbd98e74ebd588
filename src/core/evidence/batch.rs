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

//! Batch builder: walks tree -> wood logs -> sawn timbers and emits the ordered batch
//! plus its parallel leaf sequence.
//!
//! Leaf order is traversal order, and the root depends on it. With
//! [`TraversalOrder::Insertion`] the order is the key order of the upstream JSON
//! objects as received.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::core::evidence::identity;
use crate::core::evidence::normalizer::{
    inherited_sub_type, raw_identifier, Normalizer, RecordContext,
};
use crate::core::evidence::raw::{RawRecord, IDENTITY_FIELDS};
use crate::core::hash::Hash32;
use crate::core::types::{CanonicalRecord, RecordKind};

/// Order in which sibling records are visited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalOrder {
    /// Key order of the upstream JSON objects.
    #[default]
    Insertion,
    /// Lexicographic key order. Produces different roots than `Insertion`.
    Sorted,
}

/// A child entry: either the record itself or a key into a unit-level table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecordRef<'a> {
    /// Record given in place.
    Inline(&'a Value),
    /// Key into the unit's `woodLogs` / `sawnTimbers` table.
    Reference(&'a str),
}

impl<'a> RecordRef<'a> {
    /// Classify a raw child entry.
    pub fn classify(v: &'a Value) -> Self {
        match v {
            Value::String(s) => RecordRef::Reference(s),
            other => RecordRef::Inline(other),
        }
    }
}

/// One forest unit snapshot: trees plus the side tables references point into.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForestUnit {
    /// Trees keyed by upstream key.
    pub trees: Map<String, Value>,
    /// Unit-level wood log table.
    pub wood_logs: Map<String, Value>,
    /// Unit-level sawn timber table.
    pub sawn_timbers: Map<String, Value>,
}

impl ForestUnit {
    /// Read a unit from JSON. Missing or non-object containers are treated as empty.
    pub fn from_value(v: &Value) -> Self {
        let table = |k: &str| v.get(k).and_then(Value::as_object).cloned().unwrap_or_default();
        Self {
            trees: table("trees"),
            wood_logs: table("woodLogs"),
            sawn_timbers: table("sawnTimbers"),
        }
    }

    fn wood_log(&self, r: RecordRef<'_>) -> RawRecord {
        match r {
            RecordRef::Inline(v) => RawRecord::from_value(v),
            RecordRef::Reference(k) => self
                .wood_logs
                .get(k)
                .map(RawRecord::from_value)
                .unwrap_or_default(),
        }
    }

    fn sawn_timber(&self, r: RecordRef<'_>) -> RawRecord {
        match r {
            RecordRef::Inline(v) => RawRecord::from_value(v),
            RecordRef::Reference(k) => self
                .sawn_timbers
                .get(k)
                .map(RawRecord::from_value)
                .unwrap_or_else(|| RawRecord::stub(k)),
        }
    }
}

/// Pick a unit out of a `{"forestUnits": {...}}` response. Without a key the last unit
/// is taken (the most recently created one upstream).
pub fn select_unit<'a>(response: &'a Value, key: Option<&str>) -> Option<(String, &'a Value)> {
    let units = response.get("forestUnits")?.as_object()?;
    match key {
        Some(k) => units.get(k).map(|u| (k.to_string(), u)),
        None => units.iter().last().map(|(k, u)| (k.clone(), u)),
    }
}

/// Builder output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuiltBatch {
    /// Canonical records in traversal order, unique by identity.
    pub records: Vec<CanonicalRecord>,
    /// Leaf per record, same order.
    pub leaves: Vec<Hash32>,
    /// Records dropped because their identity was already in the batch.
    pub duplicates_skipped: usize,
    /// Records dropped because no identity could be assigned.
    pub unidentified_skipped: usize,
}

impl BuiltBatch {
    /// True when no record was admitted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of admitted records.
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Batch builder.
#[derive(Clone, Copy, Debug, Default)]
pub struct BatchBuilder {
    normalizer: Normalizer,
    traversal: TraversalOrder,
}

struct Accumulator {
    seen: HashSet<String>,
    out: BuiltBatch,
}

impl Accumulator {
    /// Admit a record unless its identity is empty or already present.
    fn admit(&mut self, kind: RecordKind, identity: &str) -> bool {
        if identity.is_empty() {
            debug!(%kind, "record without identity excluded");
            self.out.unidentified_skipped += 1;
            return false;
        }
        if !self.seen.insert(identity.to_string()) {
            debug!(%kind, identity, "duplicate identity skipped");
            self.out.duplicates_skipped += 1;
            return false;
        }
        true
    }

    fn push(&mut self, rec: CanonicalRecord) {
        self.out.leaves.push(rec.leaf());
        self.out.records.push(rec);
    }
}

impl BatchBuilder {
    /// Create a builder.
    pub fn new(normalizer: Normalizer, traversal: TraversalOrder) -> Self {
        Self {
            normalizer,
            traversal,
        }
    }

    fn entries<'a>(&self, m: &'a Map<String, Value>) -> Vec<(&'a String, &'a Value)> {
        let mut v: Vec<_> = m.iter().collect();
        if self.traversal == TraversalOrder::Sorted {
            v.sort_by(|a, b| a.0.cmp(b.0));
        }
        v
    }

    /// Build the batch for `unit`, stamping every record with `container_id`.
    ///
    /// An empty unit yields an empty batch; committing it is the caller's error.
    pub fn build(&self, unit: &ForestUnit, container_id: &str) -> BuiltBatch {
        let mut acc = Accumulator {
            seen: HashSet::new(),
            out: BuiltBatch::default(),
        };

        for (tree_key, tree_value) in self.entries(&unit.trees) {
            let tree = RawRecord::from_value(tree_value);
            let tree_id = raw_identifier(&tree, tree_key);
            let species = inherited_sub_type(&tree);

            if acc.admit(RecordKind::Tree, &tree_id) {
                let rec = self.normalizer.normalize(
                    &tree,
                    &RecordContext {
                        kind: RecordKind::Tree,
                        identity: &tree_id,
                        parent_id: "",
                        grandparent_id: "",
                        container_id,
                        inherited_sub_type: None,
                    },
                );
                acc.push(rec);
            }

            let Some(logs) = tree.object("woodLogs") else {
                continue;
            };
            for (_, log_value) in self.entries(logs) {
                let log = unit.wood_log(RecordRef::classify(log_value));
                // Logs are seeded from their identifier fields only, never the map key.
                let log_id = identity::resolve(&log.text(IDENTITY_FIELDS), &tree_id);

                if acc.admit(RecordKind::WoodLog, &log_id) {
                    let rec = self.normalizer.normalize(
                        &log,
                        &RecordContext {
                            kind: RecordKind::WoodLog,
                            identity: &log_id,
                            parent_id: &tree_id,
                            grandparent_id: "",
                            container_id,
                            inherited_sub_type: Some(&species),
                        },
                    );
                    acc.push(rec);
                }

                let Some(timbers) = log.object("sawnTimbers") else {
                    continue;
                };
                for (st_key, st_value) in self.entries(timbers) {
                    let st = unit.sawn_timber(RecordRef::classify(st_value));
                    let st_id = identity::resolve(&raw_identifier(&st, st_key), &log_id);

                    if acc.admit(RecordKind::SawnTimber, &st_id) {
                        let rec = self.normalizer.normalize(
                            &st,
                            &RecordContext {
                                kind: RecordKind::SawnTimber,
                                identity: &st_id,
                                parent_id: &log_id,
                                grandparent_id: &tree_id,
                                container_id,
                                inherited_sub_type: Some(&species),
                            },
                        );
                        acc.push(rec);
                    }
                }
            }
        }

        let out = acc.out;
        info!(
            container_id,
            records = out.records.len(),
            duplicates = out.duplicates_skipped,
            unidentified = out.unidentified_skipped,
            "evidence batch built"
        );
        out
    }
}
