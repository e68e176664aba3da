// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Backend-facing support for ninefold.

Simulator adapters are out of scope; this crate holds the pieces every
adapter needs regardless of simulator:
- [`TranslationTable`]: model names to backend names and back
- [`CellDescriptorFactory`]: cached per-cell-type descriptors
- [`SimulationContext`]: time step, seed streams and run lifecycle
*/

pub mod context;
pub mod descriptor;
mod error;
pub mod translation;

pub use context::{SimulationContext, SimulationContextBuilder, SimulationState};
pub use descriptor::{source_identity, CellDescriptor, CellDescriptorFactory};
pub use error::{BackendError, BackendResult};
pub use translation::TranslationTable;
