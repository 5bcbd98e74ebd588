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

//! Loosely typed upstream records.
//!
//! The tracking API returns nested JSON whose field names drift between releases
//! (`EPC`/`epc`/`domainUUID`/`domainUuid`, `lastModification`/`lastModfication`, ...).
//! Each logical field is read through an ordered list of [`FieldPath`] candidates; the
//! first candidate holding a *present* value wins.
//!
//! "Present" follows the upstream scripts that produced the historical commitments:
//! `null`, `false`, `0` and `""` are absent, while arrays and objects are present even
//! when empty.

use serde_json::{Map, Value};

/// A path to a candidate field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldPath {
    /// Top-level field.
    Flat(&'static str),
    /// Field inside a nested object.
    Nested(&'static str, &'static str),
}

/// Identifier candidates, in resolution order.
pub const IDENTITY_FIELDS: &[FieldPath] = &[
    FieldPath::Flat("EPC"),
    FieldPath::Flat("epc"),
    FieldPath::Flat("domainUUID"),
    FieldPath::Flat("domainUuid"),
];

/// Species candidates, in resolution order.
pub const SUB_TYPE_FIELDS: &[FieldPath] = &[
    FieldPath::Nested("treeType", "specie"),
    FieldPath::Flat("treeTypeId"),
    FieldPath::Flat("specie"),
];

/// Species candidates a tree hands down to its logs and timbers. The flat `specie`
/// field is not inherited.
pub const INHERITED_SUB_TYPE_FIELDS: &[FieldPath] = &[
    FieldPath::Nested("treeType", "specie"),
    FieldPath::Flat("treeTypeId"),
];

/// First reading time candidates.
pub const FIRST_READING_FIELDS: &[FieldPath] = &[
    FieldPath::Flat("firstReadingTime"),
    FieldPath::Flat("firstReading"),
];

/// Latitude candidates inside `coordinates`.
pub const LATITUDE_FIELDS: &[FieldPath] = &[
    FieldPath::Flat("latitude"),
    FieldPath::Flat("lat"),
];

/// Longitude candidates inside `coordinates`.
pub const LONGITUDE_FIELDS: &[FieldPath] = &[
    FieldPath::Flat("longitude"),
    FieldPath::Flat("lon"),
];

/// Observation list/string candidates.
pub const OBSERVATION_FIELDS: &[FieldPath] = &[
    FieldPath::Flat("observations"),
    FieldPath::Flat("treeObservations"),
    FieldPath::Flat("phenomena"),
    FieldPath::Flat("obs"),
    FieldPath::Flat("observation"),
];

/// Phenomenon name candidates inside one observation.
pub const PHENOMENON_NAME_FIELDS: &[FieldPath] = &[
    FieldPath::Nested("phenomenonType", "phenomenonTypeName"),
    FieldPath::Flat("phenomenonName"),
    FieldPath::Flat("phenomenonTypeId"),
];

/// Unit candidates inside one observation.
pub const UNIT_FIELDS: &[FieldPath] = &[
    FieldPath::Nested("unit", "unitName"),
    FieldPath::Flat("unitId"),
];

/// Last modification candidates (the second spelling is a long-lived upstream typo).
pub const LAST_MODIFICATION_FIELDS: &[FieldPath] = &[
    FieldPath::Flat("lastModification"),
    FieldPath::Flat("lastModfication"),
];

/// A raw upstream record (JSON object). Non-object inputs behave as an empty record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    /// Wrap a JSON value; anything but an object becomes the empty record.
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Object(m) => Self(m.clone()),
            _ => Self::default(),
        }
    }

    /// Record holding a single identifier, used for dangling references.
    pub fn stub(epc: &str) -> Self {
        let mut m = Map::new();
        m.insert("EPC".to_string(), Value::String(epc.to_string()));
        Self(m)
    }

    /// Raw field access.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Value at `path`, if any.
    pub fn at(&self, path: FieldPath) -> Option<&Value> {
        match path {
            FieldPath::Flat(k) => self.0.get(k),
            FieldPath::Nested(outer, inner) => self.0.get(outer).and_then(|o| o.get(inner)),
        }
    }

    /// First present value among `paths`.
    pub fn first_present(&self, paths: &[FieldPath]) -> Option<&Value> {
        paths
            .iter()
            .filter_map(|p| self.at(*p))
            .find(|v| is_present(v))
    }

    /// Text of the first present value among `paths`, or empty.
    pub fn text(&self, paths: &[FieldPath]) -> String {
        self.first_present(paths)
            .and_then(scalar_text)
            .unwrap_or_default()
    }

    /// Nested object under `key`, if it is one.
    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Truthiness of `key`.
    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).map(is_present).unwrap_or(false)
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(m: Map<String, Value>) -> Self {
        Self(m)
    }
}

/// Whether a value counts as present.
pub fn is_present(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a scalar the way it was interpolated into historical preimages.
///
/// Strings are verbatim, integral numbers have no fractional part, booleans are
/// `true`/`false`. `null` yields `None`. Arrays and objects render as compact JSON.
pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_text(n)),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(v).ok(),
    }
}

fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        // Integral floats print without a trailing ".0".
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
