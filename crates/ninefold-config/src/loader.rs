// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, applied in order:
//! 1. TOML file (base values; missing keys keep their defaults)
//! 2. Environment variables
//! 3. CLI-style key/value overrides

use crate::{ConfigError, ConfigResult, NinefoldConfig};
use ninefold_network::SharedDestinationPolicy;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const CONFIG_FILE_NAME: &str = "ninefold.toml";
const CONFIG_PATH_VAR: &str = "NINEFOLD_CONFIG_PATH";

/// Find `ninefold.toml`
///
/// Search order:
/// 1. `NINEFOLD_CONFIG_PATH`
/// 2. The current working directory
/// 3. Up to five parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_VAR) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_VAR,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        search_paths.extend(
            cwd.ancestors()
                .skip(1)
                .take(5)
                .map(|dir| dir.join(CONFIG_FILE_NAME)),
        );
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_VAR
    )))
}

/// Load the configuration and apply environment then CLI overrides
///
/// With `config_path` unset the file is searched with [`find_config_file`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<NinefoldConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    let content = fs::read_to_string(&config_file)?;
    let mut config: NinefoldConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }
    Ok(config)
}

fn parse<T>(field: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{}': {}", value, e),
    })
}

fn parse_bool(field: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{}' is not a boolean", value),
        }),
    }
}

/// Apply `NINEFOLD_*` environment variables
///
/// - `NINEFOLD_LOG_LEVEL` -> `logging.level`
/// - `NINEFOLD_LOG_DIR` -> `logging.log_dir`
/// - `NINEFOLD_SHARED_DESTINATION_POLICY` -> `flattening.shared_destination_policy`
/// - `NINEFOLD_VALIDATE_COMPOSITES` -> `flattening.validate_composites`
/// - `NINEFOLD_SEED` -> `simulation.seed`
/// - `NINEFOLD_DT_MS` -> `simulation.dt_ms`
///
/// A value that does not parse is an error rather than being skipped.
pub fn apply_environment_overrides(config: &mut NinefoldConfig) -> ConfigResult<()> {
    if let Ok(value) = env::var("NINEFOLD_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Ok(value) = env::var("NINEFOLD_LOG_DIR") {
        config.logging.log_dir = Some(PathBuf::from(value));
    }
    if let Ok(value) = env::var("NINEFOLD_SHARED_DESTINATION_POLICY") {
        config.flattening.shared_destination_policy =
            parse::<SharedDestinationPolicy>("NINEFOLD_SHARED_DESTINATION_POLICY", &value)?;
    }
    if let Ok(value) = env::var("NINEFOLD_VALIDATE_COMPOSITES") {
        config.flattening.validate_composites = parse_bool("NINEFOLD_VALIDATE_COMPOSITES", &value)?;
    }
    if let Ok(value) = env::var("NINEFOLD_SEED") {
        config.simulation.seed = Some(parse("NINEFOLD_SEED", &value)?);
    }
    if let Ok(value) = env::var("NINEFOLD_DT_MS") {
        config.simulation.dt_ms = parse("NINEFOLD_DT_MS", &value)?;
    }
    Ok(())
}

/// Apply CLI-style overrides, e.g. `{"seed": "42", "log_level": "debug"}`
///
/// Unknown keys are ignored so callers can pass their whole argument map.
pub fn apply_cli_overrides(
    config: &mut NinefoldConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("log_format") {
        config.logging.format = value.clone();
    }
    if let Some(value) = cli_args.get("log_dir") {
        config.logging.log_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = cli_args.get("shared_destination_policy") {
        config.flattening.shared_destination_policy = parse("shared_destination_policy", value)?;
    }
    if let Some(value) = cli_args.get("validate_composites") {
        config.flattening.validate_composites = parse_bool("validate_composites", value)?;
    }
    if let Some(value) = cli_args.get("seed") {
        config.simulation.seed = Some(parse("seed", value)?);
    }
    if let Some(value) = cli_args.get("properties_seed") {
        config.simulation.properties_seed = Some(parse("properties_seed", value)?);
    }
    if let Some(value) = cli_args.get("dynamics_seed") {
        config.simulation.dynamics_seed = Some(parse("dynamics_seed", value)?);
    }
    if let Some(value) = cli_args.get("dt_ms") {
        config.simulation.dt_ms = parse("dt_ms", value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const OVERRIDE_VARS: &[&str] = &[
        "NINEFOLD_LOG_LEVEL",
        "NINEFOLD_LOG_DIR",
        "NINEFOLD_SHARED_DESTINATION_POLICY",
        "NINEFOLD_VALIDATE_COMPOSITES",
        "NINEFOLD_SEED",
        "NINEFOLD_DT_MS",
    ];

    fn clear_override_vars() {
        for var in OVERRIDE_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        File::create(&config_path).unwrap();

        env::set_var(CONFIG_PATH_VAR, config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_VAR);

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_missing_env_path_is_reported() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        env::set_var(CONFIG_PATH_VAR, dir.path().join("absent.toml"));
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_VAR);

        assert!(matches!(result, Err(ConfigError::FileNotFound(msg)) if msg.contains(CONFIG_PATH_VAR)));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[flattening]").unwrap();
        writeln!(file, "shared_destination_policy = \"reject\"").unwrap();
        writeln!(file, "[simulation]").unwrap();
        writeln!(file, "seed = 12").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();
        assert_eq!(
            config.flattening.shared_destination_policy,
            SharedDestinationPolicy::Reject
        );
        assert!(config.flattening.validate_composites);
        assert_eq!(config.simulation.seed, Some(12));
        assert_eq!(config.simulation.dt_ms, 0.1);
    }

    #[test]
    fn test_bad_toml() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[flattening\nvalidate_composites = ").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        let mut config = NinefoldConfig::default();

        env::set_var("NINEFOLD_LOG_LEVEL", "debug");
        env::set_var("NINEFOLD_SHARED_DESTINATION_POLICY", "Reject");
        env::set_var("NINEFOLD_DT_MS", "0.025");
        let result = apply_environment_overrides(&mut config);
        clear_override_vars();

        result.unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.flattening.shared_destination_policy,
            SharedDestinationPolicy::Reject
        );
        assert_eq!(config.simulation.dt_ms, 0.025);
    }

    #[test]
    fn test_unparsable_environment_value() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        let mut config = NinefoldConfig::default();

        env::set_var("NINEFOLD_SEED", "forty-two");
        let result = apply_environment_overrides(&mut config);
        clear_override_vars();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "NINEFOLD_SEED"
        ));
        assert_eq!(config.simulation.seed, None);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = NinefoldConfig::default();
        let cli_args: HashMap<String, String> = [
            ("seed", "42"),
            ("validate_composites", "no"),
            ("log_format", "compact"),
            ("unrelated", "ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        apply_cli_overrides(&mut config, &cli_args).unwrap();
        assert_eq!(config.simulation.seed, Some(42));
        assert!(!config.flattening.validate_composites);
        assert_eq!(config.logging.format, "compact");
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &config_path,
            "[simulation]\nseed = 1\ndt_ms = 0.5\n\n[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();

        env::set_var("NINEFOLD_SEED", "2");
        env::set_var("NINEFOLD_LOG_LEVEL", "error");
        let mut cli_args = HashMap::new();
        cli_args.insert("seed".to_string(), "3".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args));
        clear_override_vars();

        // CLI wins for the seed, env wins for the level, file keeps dt
        let config = config.unwrap();
        assert_eq!(config.simulation.seed, Some(3));
        assert_eq!(config.logging.level, "error");
        assert_eq!(config.simulation.dt_ms, 0.5);
    }
}
