// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # ninefold configuration
//!
//! TOML configuration with three layers, later ones winning:
//! 1. `ninefold.toml` (found through `NINEFOLD_CONFIG_PATH`, the working
//!    directory or its parents)
//! 2. `NINEFOLD_*` environment variables
//! 3. CLI-style key/value overrides
//!
//! ```rust,no_run
//! use ninefold_config::load_config;
//!
//! let config = load_config(None, None).expect("Failed to load config");
//! let options = config.flattening.flatten_options();
//! println!("Shared destinations: {}", options.shared_destination_policy);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{apply_cli_overrides, apply_environment_overrides, find_config_file, load_config};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse_from_empty_file() {
        let config: NinefoldConfig = toml::from_str("").unwrap();
        assert!(config.flattening.validate_composites);
        assert_eq!(config.logging.level, "info");
    }
}
