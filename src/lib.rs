// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # ninefold
//!
//! Flattens hierarchical neuronal network models into what simulators
//! consume: one component array per population (the cell merged with every
//! synapse that can be folded into it) and event connection groups between
//! arrays.
//!
//! ## Feature Flags
//! - **`backend`** (default): translation tables, cell descriptors, simulation context
//! - **`config`** (default): `ninefold.toml` loading with overrides
//! - **`observability`** (default): logging setup and per-crate debug flags
//! - **`file-logging`**: per-run log files
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ninefold::prelude::*;
//!
//! # fn build() -> Network { unimplemented!() }
//! let network = build();
//! let flat = flatten(&network, &FlattenOptions::default())?;
//! for (name, array) in &flat.component_arrays {
//!     println!("{}: {} cells", name, array.size());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Model: ninefold-dynamics                               │
//! │  (Units, expressions, dynamics, composition)            │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Algorithm: ninefold-network                            │
//! │  (Populations, projections, flattener)                  │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Backend support: ninefold-backend                      │
//! │  (Name translation, descriptors, simulation context)    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub use ninefold_dynamics as dynamics;
pub use ninefold_network as network;

#[cfg(feature = "backend")]
pub use ninefold_backend as backend;

#[cfg(feature = "config")]
pub use ninefold_config as config;

#[cfg(feature = "observability")]
pub use ninefold_observability as observability;

#[cfg(all(feature = "backend", feature = "config", feature = "observability"))]
pub mod setup;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::dynamics::{
        Dimension, Dynamics, DynamicsProperties, FindMismatch, MultiDynamicsProperties, Quantity,
        RegimeBuilder, TransitionBuilder, Unit,
    };
    pub use crate::network::{
        flatten, ConnectionGroup, ConnectionRuleProperties, ComponentArray, FlattenOptions,
        FlattenedNetwork, Network, Population, Projection, Role, Selection,
        SharedDestinationPolicy,
    };

    #[cfg(feature = "backend")]
    pub use crate::backend::{CellDescriptorFactory, SimulationContext, TranslationTable};

    #[cfg(feature = "config")]
    pub use crate::config::{load_config, NinefoldConfig};
}
