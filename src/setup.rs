// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Wiring from a loaded [`NinefoldConfig`] to the other crates

use ninefold_backend::{BackendResult, SimulationContext};
use ninefold_config::{ConfigError, ConfigResult, NinefoldConfig, SimulationConfig};
use ninefold_network::{flatten, FlattenedNetwork, Network, NetworkResult};
use ninefold_observability::{parse_debug_flags, CrateDebugFlags, LogFormat, LoggingGuard};
use tracing::debug;

/// Observability settings for the `[logging]` section
pub fn logging_config(
    config: &ninefold_config::LoggingConfig,
) -> ConfigResult<ninefold_observability::LoggingConfig> {
    let format = config
        .format
        .parse::<LogFormat>()
        .map_err(|reason| ConfigError::InvalidValue {
            field: "logging.format".to_string(),
            reason,
        })?;
    Ok(ninefold_observability::LoggingConfig {
        level: config.level.clone(),
        format,
        log_dir: config.log_dir.clone(),
        retention_days: config.retention_days,
        retention_runs: config.retention_runs,
    })
}

/// Debug flags from the process and `NINEFOLD_DEBUG`, plus `logging.debug_crates`
pub fn debug_flags(config: &NinefoldConfig) -> CrateDebugFlags {
    let mut flags = parse_debug_flags();
    for name in &config.logging.debug_crates {
        flags.enable(name);
    }
    flags
}

/// Install the global subscriber as configured
pub fn init_logging(config: &NinefoldConfig) -> anyhow::Result<LoggingGuard> {
    let logging = logging_config(&config.logging)?;
    ninefold_observability::init_logging(&debug_flags(config), &logging)
}

pub fn simulation_context(config: &SimulationConfig) -> BackendResult<SimulationContext> {
    let mut builder = SimulationContext::builder(config.dt());
    if let Some(seed) = config.seed {
        builder = builder.seed(seed);
    }
    if let Some(seed) = config.properties_seed {
        builder = builder.properties_seed(seed);
    }
    if let Some(seed) = config.dynamics_seed {
        builder = builder.dynamics_seed(seed);
    }
    builder.build()
}

/// Flatten with the `[flattening]` options
pub fn flatten_network(network: &Network, config: &NinefoldConfig) -> NetworkResult<FlattenedNetwork> {
    let options = config.flattening.flatten_options();
    debug!(
        target: "ninefold",
        "Flattening '{}' (shared destinations: {}, validate composites: {})",
        network.name(),
        options.shared_destination_policy,
        options.validate_composites
    );
    flatten(network, &options)
}
