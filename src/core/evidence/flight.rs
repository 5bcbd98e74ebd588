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

//! Drone flight-data batches.

use serde_json::Value;
use thiserror::Error;

use crate::core::evidence::raw::{scalar_text, FieldPath, RawRecord};
use crate::core::hash::Hash32;
use crate::core::types::FlightRecord;

/// Flight batch errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlightError {
    /// Flight data must arrive as a JSON array.
    #[error("flight data is not an array")]
    NotAnArray,
}

/// Flight batch: records in input order plus their leaves.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlightBatch {
    /// Normalized points.
    pub records: Vec<FlightRecord>,
    /// Leaf per point.
    pub leaves: Vec<Hash32>,
}

/// Normalize one raw flight point. `device_id` fills in a missing device.
pub fn normalize_flight(raw: &RawRecord, device_id: &str) -> FlightRecord {
    let own_device = raw.text(&[FieldPath::Flat("device_id")]);
    let timestamp = raw.text(&[FieldPath::Flat("timestamp")]);
    FlightRecord {
        device_id: if own_device.is_empty() {
            device_id.to_string()
        } else {
            own_device
        },
        timestamp: if timestamp.is_empty() {
            "0".to_string()
        } else {
            timestamp
        },
        latitude: coordinate(raw, "latitude"),
        longitude: coordinate(raw, "longitude"),
        signature: raw.text(&[FieldPath::Flat("signature")]),
    }
}

// Zero is a valid coordinate; only absent or null falls back.
fn coordinate(raw: &RawRecord, axis: &'static str) -> String {
    raw.at(FieldPath::Nested("localization", axis))
        .and_then(scalar_text)
        .unwrap_or_else(|| "0".to_string())
}

/// Build a flight batch from a JSON array of points.
pub fn build_flight_batch(records: &Value, device_id: &str) -> Result<FlightBatch, FlightError> {
    let items = records.as_array().ok_or(FlightError::NotAnArray)?;
    let mut out = FlightBatch::default();
    for item in items.iter() {
        let rec = normalize_flight(&RawRecord::from_value(item), device_id);
        out.leaves.push(rec.leaf());
        out.records.push(rec);
    }
    Ok(out)
}

