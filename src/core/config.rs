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

//! Pipeline configuration (TOML).
//!
//! ```toml
//! [pipeline]
//! reading_time_format = "iso8601"   # or "unix_seconds"
//! traversal_order = "insertion"     # or "sorted"
//!
//! [store]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::evidence::batch::{BatchBuilder, TraversalOrder};
use crate::core::evidence::normalizer::{Normalizer, ReadingTimeFormat};

/// Env var naming the config file.
pub const ENV_CONFIG: &str = "TIMBERTRACE_CONFIG";
/// Env var overriding `store.data_dir`.
pub const ENV_DATA_DIR: &str = "TIMBERTRACE_DATA_DIR";
/// Env var overriding `logging.json`.
pub const ENV_LOG_JSON: &str = "TIMBERTRACE_LOG_JSON";

/// Config errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("config read: {0}")]
    Read(#[from] std::io::Error),
    /// The config file is not valid TOML for [`PipelineConfig`].
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Full configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Normalization and traversal.
    pub pipeline: PipelineSettings,
    /// Store location.
    pub store: StoreSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Settings that change leaf bytes. Changing either changes every root.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    /// `firstReading` rendering.
    pub reading_time_format: ReadingTimeFormat,
    /// Sibling visit order.
    pub traversal_order: TraversalOrder,
}

/// Store settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    /// sled directory.
    pub data_dir: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Max level: `error`, `warn`, `info`, `debug` or `trace`.
    pub level: String,
    /// JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl PipelineConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// Resolve configuration: explicit path, else `TIMBERTRACE_CONFIG`, else defaults.
    /// Env overrides are applied last. An explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match explicit {
            Some(p) => Self::from_file(p)?,
            None => match std::env::var_os(ENV_CONFIG) {
                Some(p) => Self::from_file(Path::new(&p))?,
                None => Self::default(),
            },
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    /// Apply overrides from `lookup` (the process env in production).
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.is_empty()) {
            self.store.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = lookup(ENV_LOG_JSON) {
            self.logging.json = matches!(v.trim(), "1" | "true" | "TRUE" | "yes");
        }
    }

    /// Normalizer for these settings.
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.pipeline.reading_time_format)
    }

    /// Batch builder for these settings.
    pub fn batch_builder(&self) -> BatchBuilder {
        BatchBuilder::new(self.normalizer(), self.pipeline.traversal_order)
    }
}
