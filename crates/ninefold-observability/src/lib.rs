// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # ninefold-observability
//!
//! Logging setup shared by the ninefold crates, with per-crate debug flags.
//!
//! ## Features
//! - `file-logging`: per-run log files with rotation and retention

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Crates (and tracing targets) that accept debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "ninefold",
    "ninefold-dynamics",
    "ninefold-network",
    "ninefold-backend",
    "ninefold-config",
];
