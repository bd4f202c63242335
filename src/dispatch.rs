//! Static routing of inbound paths to forwarding targets.
//!
//! The table is read from a YAML file at startup:
//!
//! ```yaml
//! Meta:
//!   SchemaVersion: 1
//! Dispatch:
//!   - Path: /github
//!     Targets:
//!       - http://ci.internal/hooks/github
//! ```

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
pub struct Meta {
    #[serde(rename = "SchemaVersion", default)]
    pub schema_version: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DispatchRule {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Targets", default)]
    pub targets: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DispatchConfig {
    #[serde(rename = "Meta", default)]
    pub meta: Meta,
    #[serde(rename = "Dispatch", default)]
    pub dispatch: Vec<DispatchRule>,
}

/// Immutable after startup and shared by every request task.
#[derive(Debug, Default)]
pub struct DispatchTable {
    schema_version: u32,
    rules: Vec<DispatchRule>,
}

impl DispatchTable {
    pub fn new(rules: Vec<DispatchRule>) -> DispatchTable {
        DispatchTable { schema_version: 0, rules }
    }

    pub fn from_yaml(text: &str) -> Result<DispatchTable, ConfigError> {
        // An empty document deserializes to unit, not to a mapping.
        if text.trim().is_empty() {
            return Ok(DispatchTable::default());
        }
        let config: DispatchConfig = serde_yml::from_str(text)?;
        Ok(DispatchTable {
            schema_version: config.meta.schema_version,
            rules: config.dispatch,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<DispatchTable, ConfigError> {
        let text = fs::read_to_string(path)?;
        DispatchTable::from_yaml(&text)
    }

    /// Never fails: an unreadable or malformed file yields an empty table.
    pub fn load<P: AsRef<Path>>(path: P) -> DispatchTable {
        let path = path.as_ref();
        match DispatchTable::from_file(path) {
            Ok(table) => {
                info!(
                    "Loaded config from {} (schema {}) with {} dispatch rules",
                    path.display(),
                    table.schema_version,
                    table.len()
                );
                table
            }
            Err(err) => {
                warn!("Failed to load config from {}: {}", path.display(), err);
                warn!("Continuing without dispatch rules");
                DispatchTable::default()
            }
        }
    }

    /// Targets of the first rule whose path equals `path` exactly.
    pub fn lookup(&self, path: &str) -> &[String] {
        self.rules
            .iter()
            .find(|rule| rule.path == path)
            .map(|rule| rule.targets.as_slice())
            .unwrap_or(&[])
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
