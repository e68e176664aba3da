// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every problem is collected before reporting, so one run shows them all.

use crate::{ConfigError, ConfigResult, NinefoldConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "compact"];

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Returns `ConfigError::ValidationError` listing every problem found.
pub fn validate_config(config: &NinefoldConfig) -> ConfigResult<()> {
    let errors = collect_problems(config);
    if errors.is_empty() {
        return Ok(());
    }
    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Every problem in `config`, in section order
pub fn collect_problems(config: &NinefoldConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_logging(config, &mut errors);
    validate_simulation(config, &mut errors);
    errors
}

fn validate_logging(config: &NinefoldConfig, errors: &mut Vec<ConfigValidationError>) {
    let logging = &config.logging;
    if logging.level.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "logging.level".to_string(),
        });
    } else if !LOG_LEVELS.contains(&logging.level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("'{}' is not one of {}", logging.level, LOG_LEVELS.join(", ")),
        });
    }
    if !LOG_FORMATS.contains(&logging.format.to_ascii_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.format".to_string(),
            reason: format!("'{}' is not one of {}", logging.format, LOG_FORMATS.join(", ")),
        });
    }
    for name in &logging.debug_crates {
        if name.trim().is_empty() {
            errors.push(ConfigValidationError::InvalidValue {
                field: "logging.debug_crates".to_string(),
                reason: "contains an empty crate name".to_string(),
            });
        }
    }
    if logging.log_dir.is_some() && logging.retention_runs == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.retention_runs".to_string(),
            reason: "must keep at least the current run".to_string(),
        });
    }
}

fn validate_simulation(config: &NinefoldConfig, errors: &mut Vec<ConfigValidationError>) {
    let dt = config.simulation.dt_ms;
    if !dt.is_finite() || dt <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "simulation.dt_ms".to_string(),
            reason: "must be positive".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = NinefoldConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_time_step() {
        let mut config = NinefoldConfig::default();
        config.simulation.dt_ms = 0.0;

        let result = validate_config(&config);
        if let Err(ConfigError::ValidationError(msg)) = result {
            assert!(msg.contains("simulation.dt_ms"));
        } else {
            panic!("expected a validation error");
        }
    }

    #[test]
    fn test_all_problems_reported() {
        let mut config = NinefoldConfig::default();
        config.logging.level = "loud".to_string();
        config.logging.format = "json".to_string();
        config.simulation.dt_ms = f64::NAN;

        let problems = collect_problems(&config);
        assert_eq!(problems.len(), 3);

        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("logging.level"));
        assert!(msg.contains("logging.format"));
        assert!(msg.contains("simulation.dt_ms"));
    }

    #[test]
    fn test_level_is_case_insensitive() {
        let mut config = NinefoldConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());

        config.logging.level = "  ".to_string();
        assert_eq!(
            collect_problems(&config),
            vec![ConfigValidationError::MissingRequired {
                field: "logging.level".to_string()
            }]
        );
    }
}
