// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration sections of `ninefold.toml`

use ninefold_dynamics::{Quantity, Unit};
use ninefold_network::{FlattenOptions, SharedDestinationPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NinefoldConfig {
    pub flattening: FlatteningConfig,
    pub logging: LoggingConfig,
    pub simulation: SimulationConfig,
}

/// How networks are flattened
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FlatteningConfig {
    pub shared_destination_policy: SharedDestinationPolicy,
    pub validate_composites: bool,
}

impl Default for FlatteningConfig {
    fn default() -> Self {
        let options = FlattenOptions::default();
        Self {
            shared_destination_policy: options.shared_destination_policy,
            validate_composites: options.validate_composites,
        }
    }
}

impl FlatteningConfig {
    pub fn flatten_options(&self) -> FlattenOptions {
        FlattenOptions {
            shared_destination_policy: self.shared_destination_policy,
            validate_composites: self.validate_composites,
        }
    }
}

impl From<&FlatteningConfig> for FlattenOptions {
    fn from(config: &FlatteningConfig) -> Self {
        config.flatten_options()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// text or compact
    pub format: String,
    /// Crates logged at debug regardless of `level`
    pub debug_crates: Vec<String>,
    /// Directory for per-run log files; console only when unset
    pub log_dir: Option<PathBuf>,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            debug_crates: Vec::new(),
            log_dir: None,
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Time step in milliseconds
    pub dt_ms: f64,
    /// Global seed; a fresh one per run when unset
    pub seed: Option<u64>,
    pub properties_seed: Option<u64>,
    pub dynamics_seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt_ms: 0.1,
            seed: None,
            properties_seed: None,
            dynamics_seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn dt(&self) -> Quantity {
        self.dt_ms * Unit::MS
    }
}
