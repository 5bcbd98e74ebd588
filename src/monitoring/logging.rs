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

//! tracing subscriber setup.

use std::str::FromStr;
use tracing::level_filters::LevelFilter;

use crate::core::config::LoggingSettings;

/// Install the global subscriber. Logs go to stderr so stdout stays machine-readable.
///
/// An unparseable level falls back to `info`. A second call is a no-op.
pub fn init(settings: &LoggingSettings) {
    let level = LevelFilter::from_str(settings.level.trim()).unwrap_or(LevelFilter::INFO);
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);
    let _ = if settings.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
}
