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

use serde_json::{json, Value};

use timbertrace::core::evidence::identity::{is_issued_epc, resolve};
use timbertrace::core::evidence::normalizer::{
    coordinates, inherited_sub_type, notes, observations, raw_identifier, sub_type, Normalizer,
    ReadingTimeFormat, RecordContext, NO_OBSERVATION, UNKNOWN_SUB_TYPE,
};
use timbertrace::core::evidence::raw::RawRecord;
use timbertrace::core::types::RecordKind;

fn raw(v: Value) -> RawRecord {
    RawRecord::from_value(&v)
}

#[test]
fn synthetic_epc_shape() {
    let id = resolve("LOGABC", "E2801234");
    assert_eq!(id, "E28065935AA750DF43BFE31A");
    assert_eq!(id.len(), 24);
    assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    assert_eq!(resolve("LOGABC", "E2801234"), id);
    assert_ne!(resolve("LOGABC", "E2809999"), id);
}

#[test]
fn issued_epcs_pass_through() {
    assert_eq!(resolve("E2801234", "seed"), "E2801234");
    assert_eq!(resolve("e2abc", "seed"), "e2abc");
    assert!(is_issued_epc("E"));
    assert!(!is_issued_epc(""));
    assert!(!is_issued_epc("LOG"));
}

#[test]
fn empty_inputs_have_no_identity() {
    assert_eq!(resolve("", ""), "");
    assert!(resolve("", "E2801234").starts_with("E280"));
    assert!(resolve("log-1", "").starts_with("E280"));
}

#[test]
fn identifier_aliases_in_order() {
    assert_eq!(raw_identifier(&raw(json!({"epc": "b", "domainUuid": "c"})), "k"), "b");
    assert_eq!(raw_identifier(&raw(json!({"domainUuid": "c"})), "k"), "c");
    assert_eq!(raw_identifier(&raw(json!({"EPC": ""})), "k"), "k");
}

#[test]
fn sub_type_aliases_and_default() {
    assert_eq!(sub_type(&raw(json!({"treeTypeId": "PINE"}))), "PINE");
    assert_eq!(sub_type(&raw(json!({"specie": "Fir"}))), "Fir");
    assert_eq!(sub_type(&raw(json!({"treeType": {}}))), UNKNOWN_SUB_TYPE);
}

#[test]
fn inherited_sub_type_skips_flat_specie() {
    let tree = raw(json!({"specie": "Fir"}));
    assert_eq!(sub_type(&tree), "Fir");
    assert_eq!(inherited_sub_type(&tree), UNKNOWN_SUB_TYPE);
    assert_eq!(
        inherited_sub_type(&raw(json!({"treeType": {"specie": "Oak"}, "treeTypeId": "PINE"}))),
        "Oak"
    );
}

#[test]
fn coordinates_strip_dangling_commas() {
    assert_eq!(coordinates(&raw(json!({"coordinates": {"lat": 1.5, "lon": 2}}))), "1.5,2");
    assert_eq!(coordinates(&raw(json!({"coordinates": {"latitude": 1.5}}))), "1.5");
    assert_eq!(coordinates(&raw(json!({"coordinates": {"longitude": 2.25}}))), "2.25");
    assert_eq!(coordinates(&raw(json!({"coordinates": {}}))), "");
    assert_eq!(coordinates(&raw(json!({}))), "");
}

#[test]
fn notes_shapes() {
    assert_eq!(notes(&raw(json!({"notes": "free text"}))), "free text");
    assert_eq!(
        notes(&raw(json!({"notes": [{"description": "a"}, {"id": 3}, "c"]}))),
        r#"a; {"id":3}; c"#
    );
    assert_eq!(notes(&raw(json!({"notes": 12}))), "");
    assert_eq!(notes(&raw(json!({}))), "");
}

#[test]
fn observations_render_and_fall_back() {
    let r = raw(json!({"treeObservations": [
        {"phenomenonType": {"phenomenonTypeName": "Diameter"}, "quantity": 42, "unit": {"unitName": "cm"}},
        {"phenomenonName": "Health", "quantity": "good"},
        {"phenomenonTypeId": "P9", "quantity": 0, "unitId": "u"}
    ]}));
    assert_eq!(observations(&r), "Diameter: 42 cm; Health: good; P9 u");
    assert_eq!(observations(&raw(json!({"obs": "  dry  "}))), "dry");
    assert_eq!(observations(&raw(json!({"observations": []}))), NO_OBSERVATION);
    assert_eq!(observations(&raw(json!({"observation": "   "}))), NO_OBSERVATION);
    assert_eq!(observations(&raw(json!({}))), NO_OBSERVATION);
}

#[test]
fn first_reading_parsing() {
    let iso = Normalizer::new(ReadingTimeFormat::Iso8601);
    let unix = Normalizer::new(ReadingTimeFormat::UnixSeconds);

    let r = raw(json!({"firstReading": "2024-05-01 10:00:00"}));
    assert_eq!(iso.first_reading(&r), "2024-05-01T10:00:00.000Z");
    let r = raw(json!({"firstReadingTime": 1714557600123i64}));
    assert_eq!(iso.first_reading(&r), "2024-05-01T10:00:00.123Z");
    assert_eq!(unix.first_reading(&r), "1714557600");
    let r = raw(json!({"firstReadingTime": "2024-05-01T12:00:00+02:00"}));
    assert_eq!(iso.first_reading(&r), "2024-05-01T10:00:00.000Z");
    let r = raw(json!({"firstReadingTime": "yesterday"}));
    assert_eq!(iso.first_reading(&r), "yesterday");
    assert_eq!(iso.first_reading(&raw(json!({}))), "");
}

#[test]
fn normalize_full_record() {
    let r = raw(json!({
        "EPC": "ignored-by-context",
        "treeType": {"specie": "Own"},
        "deleted": 1,
        "lastModfication": "v3",
        "notes": ["n1"]
    }));
    let ctx = RecordContext {
        kind: RecordKind::SawnTimber,
        identity: "E280S",
        parent_id: "E280L",
        grandparent_id: "E280T",
        container_id: "U1",
        inherited_sub_type: None,
    };
    let rec = Normalizer::default().normalize(&r, &ctx);
    assert_eq!(
        rec.leaf_fields().preimage(),
        "SawnTimber|E280S||Own||n1|E280L|E280T|(no observation)|U1|E280S|1|v3"
    );
}
