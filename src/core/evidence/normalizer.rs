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

//! Record normalizer: raw upstream record -> [`CanonicalRecord`].
//!
//! Normalization never fails. Every missing or malformed field degrades to a fixed
//! default so an audit record can always be produced from partial upstream data:
//!
//! | field              | default              |
//! |--------------------|----------------------|
//! | `firstReading`     | `""` (iso8601) / `"0"` (unix_seconds) |
//! | `subType`          | `"Unknown"`          |
//! | `coordinates`      | `""`                 |
//! | `notes`            | `""`                 |
//! | `observations`     | `"(no observation)"` |
//! | `deleted`          | `false`              |
//! | `lastModification` | `""`                 |

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::evidence::raw::{
    is_present, scalar_text, FieldPath, RawRecord, FIRST_READING_FIELDS, IDENTITY_FIELDS,
    INHERITED_SUB_TYPE_FIELDS, LAST_MODIFICATION_FIELDS, LATITUDE_FIELDS, LONGITUDE_FIELDS, OBSERVATION_FIELDS,
    PHENOMENON_NAME_FIELDS, SUB_TYPE_FIELDS, UNIT_FIELDS,
};
use crate::core::types::{CanonicalRecord, RecordKind};

/// Observation text when nothing was collected.
pub const NO_OBSERVATION: &str = "(no observation)";

/// Sub type when no species is known.
pub const UNKNOWN_SUB_TYPE: &str = "Unknown";

/// How `firstReading` is rendered. The two formats produce incompatible leaves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingTimeFormat {
    /// `2024-05-01T10:00:00.000Z`.
    #[default]
    Iso8601,
    /// Integer seconds since the UNIX epoch (legacy scripts).
    UnixSeconds,
}

/// Graph position of the record being normalized, supplied by the batch builder.
#[derive(Clone, Copy, Debug)]
pub struct RecordContext<'a> {
    /// Kind.
    pub kind: RecordKind,
    /// Resolved identity.
    pub identity: &'a str,
    /// Parent identity, empty for trees.
    pub parent_id: &'a str,
    /// Grandparent identity, empty unless sawn timber.
    pub grandparent_id: &'a str,
    /// Container id.
    pub container_id: &'a str,
    /// Species inherited from the enclosing tree. `None` resolves from the record itself.
    pub inherited_sub_type: Option<&'a str>,
}

/// Record normalizer.
#[derive(Clone, Copy, Debug, Default)]
pub struct Normalizer {
    reading_format: ReadingTimeFormat,
}

impl Normalizer {
    /// Create a normalizer rendering reading times with `reading_format`.
    pub fn new(reading_format: ReadingTimeFormat) -> Self {
        Self { reading_format }
    }

    /// Reading time format in use.
    pub fn reading_format(&self) -> ReadingTimeFormat {
        self.reading_format
    }

    /// Normalize one raw record.
    pub fn normalize(&self, raw: &RawRecord, ctx: &RecordContext<'_>) -> CanonicalRecord {
        let sub_type = match ctx.inherited_sub_type {
            Some(s) => s.to_string(),
            None => sub_type(raw),
        };
        CanonicalRecord {
            kind: ctx.kind,
            identity: ctx.identity.to_string(),
            first_reading: self.first_reading(raw),
            sub_type,
            parent_id: ctx.parent_id.to_string(),
            grandparent_id: ctx.grandparent_id.to_string(),
            coordinates: coordinates(raw),
            notes: notes(raw),
            observations: observations(raw),
            container_id: ctx.container_id.to_string(),
            deleted: raw.flag("deleted"),
            last_modification: raw.text(LAST_MODIFICATION_FIELDS),
        }
    }

    /// `firstReading` rendered in the configured format.
    ///
    /// Strings are parsed as RFC 3339, as a naive date-time (taken as UTC), or as a bare
    /// date; numbers are epoch milliseconds. Text that does not parse is kept verbatim.
    pub fn first_reading(&self, raw: &RawRecord) -> String {
        let Some(v) = raw.first_present(FIRST_READING_FIELDS) else {
            return match self.reading_format {
                ReadingTimeFormat::Iso8601 => String::new(),
                ReadingTimeFormat::UnixSeconds => "0".to_string(),
            };
        };
        match parse_instant(v) {
            Some(dt) => match self.reading_format {
                ReadingTimeFormat::Iso8601 => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
                ReadingTimeFormat::UnixSeconds => dt.timestamp().to_string(),
            },
            None => scalar_text(v).unwrap_or_default(),
        }
    }
}

/// Raw identifier: EPC, epc, domain UUID, then `fallback_key`.
pub fn raw_identifier(raw: &RawRecord, fallback_key: &str) -> String {
    let id = raw.text(IDENTITY_FIELDS);
    if id.is_empty() {
        fallback_key.to_string()
    } else {
        id
    }
}

/// Species: nested `treeType.specie`, `treeTypeId`, flat `specie`, then `"Unknown"`.
pub fn sub_type(raw: &RawRecord) -> String {
    let s = raw.text(SUB_TYPE_FIELDS);
    if s.is_empty() {
        UNKNOWN_SUB_TYPE.to_string()
    } else {
        s
    }
}

/// Species stamped on a tree's logs and timbers: nested `treeType.specie`,
/// `treeTypeId`, then `"Unknown"`.
pub fn inherited_sub_type(tree: &RawRecord) -> String {
    let s = tree.text(INHERITED_SUB_TYPE_FIELDS);
    if s.is_empty() {
        UNKNOWN_SUB_TYPE.to_string()
    } else {
        s
    }
}

/// `"<lat>,<lon>"` with a dangling leading/trailing comma removed.
pub fn coordinates(raw: &RawRecord) -> String {
    let Some(c) = raw.object("coordinates") else {
        return String::new();
    };
    let c = RawRecord::from(c.clone());
    let joined = format!("{},{}", c.text(LATITUDE_FIELDS), c.text(LONGITUDE_FIELDS));
    let trimmed = joined.strip_prefix(',').unwrap_or(&joined);
    trimmed.strip_suffix(',').unwrap_or(trimmed).to_string()
}

/// Notes: list entries (their `description`, or the entry itself) joined by `"; "`,
/// a string verbatim, anything else empty.
pub fn notes(raw: &RawRecord) -> String {
    match raw.get("notes") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|n| {
                let described = n
                    .get("description")
                    .filter(|d| is_present(d))
                    .unwrap_or(n);
                scalar_text(described).unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join("; "),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Observations rendered as `"name: qty unit; ..."`, or [`NO_OBSERVATION`].
pub fn observations(raw: &RawRecord) -> String {
    let rendered = match raw.first_present(OBSERVATION_FIELDS) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|o| observation_entry(&RawRecord::from_value(o)))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    };
    if rendered.is_empty() {
        NO_OBSERVATION.to_string()
    } else {
        rendered
    }
}

fn observation_entry(o: &RawRecord) -> String {
    let name = o.text(PHENOMENON_NAME_FIELDS);
    let qty = o.text(&[FieldPath::Flat("quantity")]);
    let unit = o.text(UNIT_FIELDS);

    let mut out = name;
    if !qty.is_empty() {
        out.push_str(": ");
        out.push_str(&qty);
    }
    if !unit.is_empty() {
        out.push(' ');
        out.push_str(&unit);
    }
    out.trim().to_string()
}

fn parse_instant(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => parse_instant_str(s.trim()),
        Value::Number(n) => {
            let ms = n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?;
            DateTime::<Utc>::from_timestamp_millis(ms)
        }
        _ => None,
    }
}

fn parse_instant_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
