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

use serde_json::json;

use timbertrace::core::evidence::flight::{build_flight_batch, normalize_flight, FlightError};
use timbertrace::core::evidence::raw::RawRecord;
use timbertrace::core::hash::{keccak256, parse_hash32, to_hex_prefixed};
use timbertrace::core::ricardian::{
    parse_address, ricardian_hash, signing_digest, verify_ricardian_document, Eip712Domain,
    RicardianError, RicardianForestMessage,
};

const DOC: &str =
    r#"{"version":"1.0","type":"RicardianForestTracking","scope":{"forestUnitKey":"U1"}}"#;
const DOC_HASH: &str = "0x87e3ccccfa305ba6d75d1b133fe0930623d6549b55c4004e1c9a43b557c03c53";

#[test]
fn flight_leaf_vector() {
    let pts = json!([
        {"device_id": "drone-7", "timestamp": 1700000000, "localization": {"latitude": 45.1, "longitude": 9.2}, "signature": "0xsig"}
    ]);
    let batch = build_flight_batch(&pts, "fallback").unwrap();
    assert_eq!(batch.records[0].preimage(), "drone-7|1700000000|45.1|9.2|0xsig");
    assert_eq!(
        to_hex_prefixed(&batch.leaves[0]),
        "0xb5d6ebdfd0b55b62b2022c979c1773c51beee046513bcce83e10ce47a23649fa"
    );
}

#[test]
fn flight_defaults() {
    let rec = normalize_flight(&RawRecord::from_value(&json!({})), "drone-7");
    assert_eq!(rec.preimage(), "drone-7|0|0|0|");
    assert_eq!(
        to_hex_prefixed(&rec.leaf()),
        "0x503900ccd900687961732dc858c886cd367e20f16ac3f27c7da5d344307ba173"
    );

    // Zero is a coordinate, not a missing value.
    let rec = normalize_flight(
        &RawRecord::from_value(&json!({"localization": {"latitude": 0, "longitude": null}})),
        "d",
    );
    assert_eq!(rec.latitude, "0");
    assert_eq!(rec.longitude, "0");
}

#[test]
fn flight_keeps_order_and_duplicates() {
    let p = json!({"device_id": "d", "timestamp": 1});
    let batch = build_flight_batch(&json!([p.clone(), p]), "d").unwrap();
    assert_eq!(batch.leaves.len(), 2);
    assert_eq!(batch.leaves[0], batch.leaves[1]);
    assert_eq!(
        build_flight_batch(&json!({"points": []}), "d").unwrap_err(),
        FlightError::NotAnArray
    );
}

#[test]
fn ricardian_hash_is_compact_json_in_document_order() {
    let doc: serde_json::Value = serde_json::from_str(DOC).unwrap();
    assert_eq!(to_hex_prefixed(&ricardian_hash(&doc)), DOC_HASH);
    assert_eq!(ricardian_hash(&doc), keccak256(DOC.as_bytes()));
}

#[test]
fn stored_document_with_runtime_fields_verifies() {
    let stored = r#"{
        "version": "1.0",
        "type": "RicardianForestTracking",
        "ricardianHash": "0xdeadbeef",
        "scope": {"forestUnitKey": "U1"},
        "signature": {"eip712": {"signature": "0x00"}},
        "ipfsUri": "ipfs://cid/ricardian-forest.json"
    }"#;
    let check = verify_ricardian_document(stored.as_bytes(), &DOC_HASH.to_uppercase()).unwrap();
    assert!(check.ok);
    assert_eq!(check.fetched_hash, DOC_HASH);

    let edited = stored.replace("\"U1\"", "\"U2\"");
    assert!(!verify_ricardian_document(edited.as_bytes(), DOC_HASH).unwrap().ok);
}

#[test]
fn ricardian_verify_errors() {
    assert_eq!(
        verify_ricardian_document(b"not json", DOC_HASH).unwrap_err(),
        RicardianError::InvalidJson
    );
    assert_eq!(
        verify_ricardian_document(b"[1]", DOC_HASH).unwrap_err(),
        RicardianError::NotAnObject
    );
    assert_eq!(
        verify_ricardian_document(DOC.as_bytes(), "0x12").unwrap_err(),
        RicardianError::InvalidHash
    );
}

#[test]
fn eip712_digest_vector() {
    let domain =
        Eip712Domain::ricardian_forest(31337, "0x5FbDB2315678afecb367f032d93F642f64180aa3").unwrap();
    assert_eq!(
        to_hex_prefixed(&domain.separator()),
        "0x3e2181b8822422033cd054c0392d7db852d5330dfff13bead1ad17938decd55c"
    );

    let msg = RicardianForestMessage {
        forest_unit_key: "U1".to_string(),
        ricardian_hash: parse_hash32(DOC_HASH).unwrap(),
        merkle_root: parse_hash32(
            "0xba7fbb03be62c9aafb0a2ab410f390d70687eeadb11516ee8c6e349cd923ad93",
        )
        .unwrap(),
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
    };
    assert_eq!(
        to_hex_prefixed(&msg.struct_hash()),
        "0x2f4d39310e3b7f8b71c627cc8da130c0f3bc3c953c9807885637d0a577fc12d6"
    );
    assert_eq!(
        to_hex_prefixed(&signing_digest(&domain, &msg)),
        "0x3de7900448e742a7d802f40452f32fdc309d0723a3afa4d6e50e378fa594b0fd"
    );
}

#[test]
fn domain_type_hash_matches_eip712() {
    assert_eq!(
        to_hex_prefixed(&keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)"
        )),
        "0x8b73c3c69bb8fe3d512ecc4cf759cc79239f7b179b0ffacaa9a75d522b39400f"
    );
}

#[test]
fn address_parsing() {
    assert!(parse_address("5FbDB2315678afecb367f032d93F642f64180aa3").is_ok());
    assert_eq!(parse_address("0x1234").unwrap_err(), RicardianError::InvalidAddress);
    assert_eq!(parse_address("0xzz").unwrap_err(), RicardianError::InvalidAddress);
}
