//! Engine configuration types.
//!
//! `EngineConfig` represents the `config.toml` in the procflow data directory.
//! Every field has a default, so an empty or missing file is valid.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the procflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on node advances performed by a single trigger call.
    #[serde(default = "default_max_steps_per_trigger")]
    pub max_steps_per_trigger: usize,

    /// Capacity of the broadcast channel carrying engine events.
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// SQLite file name, relative to the data directory.
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Tracing filter used when `RUST_LOG` is unset (e.g. `"procflow=debug"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

fn default_max_steps_per_trigger() -> usize {
    10_000
}

fn default_event_bus_capacity() -> usize {
    1024
}

fn default_database_file() -> String {
    "procflow.db".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps_per_trigger: default_max_steps_per_trigger(),
            event_bus_capacity: default_event_bus_capacity(),
            database_file: default_database_file(),
            log_filter: None,
        }
    }
}
