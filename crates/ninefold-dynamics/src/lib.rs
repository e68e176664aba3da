// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Model layer for ninefold: expressions, dimensions, ports, dynamics,
//! dynamics properties and multi-dynamics composition.
//!
//! Everything here is plain data with validating constructors; nothing is
//! simulated. The network flattener (`ninefold-network`) and the backend
//! support crate (`ninefold-backend`) build on these types.

pub mod dynamics;
mod error;
pub mod expression;
pub mod mismatch;
pub mod multi;
pub mod ports;
pub mod properties;
pub mod units;
pub mod values;

pub use dynamics::{Dynamics, DynamicsBuilder, RegimeBuilder, TransitionBuilder};
pub use error::{DynamicsError, DynamicsResult};
pub use expression::{Expr, ExpressionError};
pub use mismatch::{FindMismatch, Mismatch};
pub use multi::{MultiDynamicsProperties, PortConnection, PortExposure, SubComponentProperties};
pub use ports::{Communication, Port, PortKind, ReduceOperator};
pub use properties::{DynamicsProperties, Property};
pub use units::{Dimension, Quantity, Unit};
pub use values::{RandomDistributionProperties, Value};
