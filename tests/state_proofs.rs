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

use std::sync::Arc;

use serde_json::json;

use timbertrace::core::config::PipelineConfig;
use timbertrace::core::evidence::batch::ForestUnit;
use timbertrace::core::hash::parse_hash32;
use timbertrace::core::service::{CommitmentService, ServiceError};
use timbertrace::core::state::merkle::{proof_from_hex, verify_proof};
use timbertrace::core::state::persistent_state::{KvOp, KvStore, MemoryStore, SledStore};
use timbertrace::core::types::CommitmentStatus;
use timbertrace::core::verify::IntegrityStatus;
use timbertrace::monitoring::metrics::Metrics;

fn unit() -> ForestUnit {
    ForestUnit::from_value(&json!({
        "trees": {
            "T1": {"EPC": "E28000AA", "woodLogs": {"L1": {"EPC": "LOG-A"}, "L2": "LOG-B"}}
        },
        "woodLogs": {"LOG-B": {"EPC": "LOG-B", "sawnTimbers": {"s": {"EPC": "ST-1"}}}}
    }))
}

#[test]
fn sled_commit_is_atomic_and_readable() {
    let dir = tempfile::tempdir().unwrap();
    let st = SledStore::open(dir.path()).unwrap();

    st.commit_atomic(vec![
        KvOp::put(b"batch/a".to_vec(), b"1".to_vec()),
        KvOp::put(b"commitment/a".to_vec(), b"2".to_vec()),
        KvOp::put(b"commitment/b".to_vec(), b"3".to_vec()),
    ])
    .unwrap();
    st.commit_atomic(vec![KvOp::Del {
        key: b"batch/a".to_vec(),
    }])
    .unwrap();

    assert_eq!(st.get(b"batch/a").unwrap(), None);
    assert_eq!(st.get(b"commitment/a").unwrap(), Some(b"2".to_vec()));
    assert_eq!(
        st.keys_with_prefix(b"commitment/").unwrap(),
        vec![b"commitment/a".to_vec(), b"commitment/b".to_vec()]
    );
}

#[test]
fn memory_store_prefix_scan() {
    let st = MemoryStore::new();
    st.commit_atomic(vec![
        KvOp::put(b"a/1".to_vec(), b"x".to_vec()),
        KvOp::put(b"b/1".to_vec(), b"y".to_vec()),
        KvOp::put(b"a/2".to_vec(), b"z".to_vec()),
    ])
    .unwrap();
    assert_eq!(
        st.keys_with_prefix(b"a/").unwrap(),
        vec![b"a/1".to_vec(), b"a/2".to_vec()]
    );
}

#[test]
fn stage_confirm_verify_lifecycle_on_sled() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = Arc::new(Metrics::new().unwrap());
    let svc = CommitmentService::new(SledStore::open(dir.path()).unwrap(), PipelineConfig::default())
        .with_metrics(Arc::clone(&metrics));

    let built = svc.build_unit("U1", &unit()).unwrap();
    assert_eq!(built.batch.len(), 4);
    let root = built.tree.hex_root();

    let staged = svc.stage(&built).unwrap();
    assert_eq!(staged.status, CommitmentStatus::Pending);
    assert_eq!(staged.leaf_count, 4);
    assert_eq!(svc.containers().unwrap(), vec!["U1".to_string()]);

    // Pending roots are not treated as committed.
    let r = svc.verify_stored("U1", None).unwrap();
    assert_eq!(r.status, IntegrityStatus::NotCommitted);

    let confirmed = svc
        .record_confirmation("U1", &root.to_uppercase().replacen("0X", "0x", 1), Some("0xtx"))
        .unwrap();
    assert_eq!(confirmed.status, CommitmentStatus::Confirmed);
    assert_eq!(confirmed.ledger_ref.as_deref(), Some("0xtx"));

    let r = svc.verify_stored("U1", None).unwrap();
    assert_eq!(r.status, IntegrityStatus::Match);

    let other = format!("0x{}", "11".repeat(32));
    let r = svc.verify_stored("U1", Some(&other)).unwrap();
    assert_eq!(r.status, IntegrityStatus::Mismatch);

    assert_eq!(metrics.batches_built_total.get(), 1);
    assert_eq!(metrics.records_committed_total.get(), 4);
    assert_eq!(metrics.integrity_match_total.get(), 1);
    assert_eq!(metrics.integrity_mismatch_total.get(), 1);
    assert_eq!(metrics.integrity_not_committed_total.get(), 1);
    assert!(metrics.render().unwrap().contains("timbertrace_last_batch_size 4"));
}

#[test]
fn staged_batch_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let root = {
        let svc = CommitmentService::new(SledStore::open(dir.path()).unwrap(), PipelineConfig::default());
        let built = svc.build_unit("U1", &unit()).unwrap();
        svc.stage(&built).unwrap();
        svc.store().flush().unwrap();
        built.tree.hex_root()
    };
    let svc = CommitmentService::new(SledStore::open(dir.path()).unwrap(), PipelineConfig::default());
    let rec = svc.commitment("U1").unwrap().unwrap();
    assert_eq!(rec.root, root);
    assert!(svc.verify_stored("U1", Some(&root)).unwrap().matched);
}

#[test]
fn proof_for_stored_record_verifies() {
    let svc = CommitmentService::new(MemoryStore::new(), PipelineConfig::default());
    let built = svc.build_unit("U1", &unit()).unwrap();
    svc.stage(&built).unwrap();

    for rec in &built.batch.records {
        let bundle = svc.proof_for("U1", &rec.identity).unwrap();
        let proof = proof_from_hex(&bundle.proof).unwrap();
        let leaf = parse_hash32(&bundle.leaf).unwrap();
        assert_eq!(leaf, rec.leaf());
        assert!(verify_proof(&proof, leaf, parse_hash32(&bundle.root).unwrap()));
    }
    assert!(matches!(
        svc.proof_for("U1", "nope"),
        Err(ServiceError::UnknownIdentity(_))
    ));
    assert!(matches!(
        svc.proof_for("U2", "nope"),
        Err(ServiceError::UnknownContainer(_))
    ));
}

#[test]
fn empty_unit_cannot_be_committed() {
    let svc = CommitmentService::new(MemoryStore::new(), PipelineConfig::default());
    let err = svc
        .build_unit("U1", &ForestUnit::from_value(&json!({"trees": {}})))
        .unwrap_err();
    assert!(matches!(err, ServiceError::EmptyBatch));
    assert_eq!(err.to_string(), "cannot commit an empty batch");
}

#[test]
fn confirmation_with_wrong_root_is_rejected() {
    let svc = CommitmentService::new(MemoryStore::new(), PipelineConfig::default());
    let built = svc.build_unit("U1", &unit()).unwrap();
    svc.stage(&built).unwrap();
    let wrong = format!("0x{}", "ab".repeat(32));
    assert!(matches!(
        svc.record_confirmation("U1", &wrong, None),
        Err(ServiceError::RootMismatch { .. })
    ));
    assert_eq!(
        svc.commitment("U1").unwrap().unwrap().status,
        CommitmentStatus::Pending
    );
    assert!(matches!(
        svc.record_confirmation("U9", &wrong, None),
        Err(ServiceError::UnknownContainer(_))
    ));
}

#[test]
fn confirmed_container_refuses_a_different_batch() {
    let svc = CommitmentService::new(MemoryStore::new(), PipelineConfig::default());
    let built = svc.build_unit("U1", &unit()).unwrap();
    svc.stage(&built).unwrap();
    svc.record_confirmation("U1", &built.tree.hex_root(), None).unwrap();

    // Same batch again: idempotent.
    let again = svc.stage(&svc.build_unit("U1", &unit()).unwrap()).unwrap();
    assert_eq!(again.status, CommitmentStatus::Confirmed);

    let changed = ForestUnit::from_value(&json!({"trees": {"T9": {"EPC": "E28000FF"}}}));
    let err = svc.stage(&svc.build_unit("U1", &changed).unwrap()).unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyConfirmed(_)));
}
