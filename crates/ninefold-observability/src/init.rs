// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always; with the `file-logging` feature and a `log_dir`,
//! each run also gets a timestamped folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       ├── ninefold-network.log
//!       ├── ninefold-backend.log
//!       └── ninefold.log (combined)
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps file writers alive; logs are flushed when it drops
pub struct LoggingGuard {
    started_at: DateTime<Utc>,
    log_dir: Option<PathBuf>,
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
}

impl LoggingGuard {
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// This run's log folder, if logging to files
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Filter from the configured level plus per-crate debug flags
pub fn build_filter(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = debug_flags.to_filter_string(&config.level.to_ascii_lowercase());
    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter '{}'", directives))
}

/// Install the global subscriber
///
/// Fails if a global subscriber is already set.
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    let started_at = Utc::now();
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false);
    let console = match config.format {
        LogFormat::Text => console.with_filter(build_filter(debug_flags, config)?).boxed(),
        LogFormat::Compact => console
            .compact()
            .with_filter(build_filter(debug_flags, config)?)
            .boxed(),
    };
    layers.push(console);

    #[cfg(feature = "file-logging")]
    let (log_dir, file_guards) = match &config.log_dir {
        Some(base) => {
            let (run_folder, guards) =
                file_layers(base, started_at, debug_flags, config, &mut layers)?;
            (Some(run_folder), guards)
        }
        None => (None, Vec::new()),
    };
    #[cfg(not(feature = "file-logging"))]
    let log_dir: Option<PathBuf> = None;

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    info!(
        target: "ninefold",
        "📝 Logging initialized (level {}, format {})",
        config.level,
        config.format
    );
    #[cfg(not(feature = "file-logging"))]
    {
        if let Some(dir) = &config.log_dir {
            tracing::warn!(
                target: "ninefold",
                "Log directory {} ignored: built without file-logging",
                dir.display()
            );
        }
    }

    Ok(LoggingGuard {
        started_at,
        log_dir,
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
    })
}

/// Console logging at `info` with flags from the process arguments and environment
pub fn init_logging_default() -> Result<LoggingGuard> {
    init_logging(&crate::cli::parse_debug_flags(), &LoggingConfig::default())
}

#[cfg(feature = "file-logging")]
fn file_layers(
    base: &Path,
    started_at: DateTime<Utc>,
    debug_flags: &CrateDebugFlags,
    config: &LoggingConfig,
    layers: &mut Vec<BoxedLayer>,
) -> Result<(PathBuf, Vec<tracing_appender::non_blocking::WorkerGuard>)> {
    use tracing_appender::rolling;

    let run_folder = base.join(format!("{}{}", RUN_PREFIX, started_at.format(RUN_TIMESTAMP)));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    for stale in expired_runs(base, started_at, config.retention_days, config.retention_runs)? {
        if stale == run_folder {
            continue;
        }
        if let Err(e) = std::fs::remove_dir_all(&stale) {
            eprintln!("Warning: Failed to remove old log directory {}: {}", stale.display(), e);
        }
    }

    let mut guards = Vec::new();
    for crate_name in crate::KNOWN_CRATES {
        let (writer, guard) =
            tracing_appender::non_blocking(rolling::daily(&run_folder, format!("{}.log", crate_name)));
        guards.push(guard);
        let filter = EnvFilter::try_new(format!("{}=debug", crate_name))
            .with_context(|| format!("Invalid log filter for {}", crate_name))?;
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter)
                .boxed(),
        );
    }

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&run_folder, "ninefold.log"));
    guards.push(guard);
    layers.push(
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(build_filter(debug_flags, config)?)
            .boxed(),
    );

    Ok((run_folder, guards))
}

/// Run folders under `base_log_dir` that fall outside the retention policy
///
/// A run is expired when it is older than `retention_days`, or when more
/// than `retention_runs` newer runs exist. Folders whose name is not a run
/// timestamp are never listed.
pub fn expired_runs(
    base_log_dir: &Path,
    now: DateTime<Utc>,
    retention_days: u64,
    retention_runs: usize,
) -> Result<Vec<PathBuf>> {
    if !base_log_dir.exists() {
        return Ok(Vec::new());
    }
    // Capped at a century so the subtraction cannot overflow
    let cutoff = now - Duration::days(retention_days.min(36_500) as i64);

    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();
    let entries = std::fs::read_dir(base_log_dir)
        .with_context(|| format!("Failed to list {}", base_log_dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|s| NaiveDateTime::parse_from_str(s, RUN_TIMESTAMP).ok());
        if let Some(stamp) = stamp {
            runs.push((path, Utc.from_utc_datetime(&stamp)));
        }
    }

    // Newest first
    runs.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(runs
        .into_iter()
        .enumerate()
        .filter(|(rank, (_, stamp))| *rank >= retention_runs || *stamp < cutoff)
        .map(|(_, (path, _))| path)
        .collect())
}
