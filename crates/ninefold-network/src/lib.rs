// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Network layer for ninefold.
//!
//! A [`Network`] holds populations of cells, selections over them and
//! projections between them. [`flatten`] turns it into per-population
//! [`ComponentArray`]s and per-pathway [`ConnectionGroup`]s, the shapes a
//! simulator backend actually instantiates.

mod component_array;
mod connection_group;
mod connectivity;
mod error;
pub mod flatten;
mod network;
mod population;
mod projection;
pub mod synapse;

pub use component_array::{ComponentArray, MultiDynamicsWithSynapsesProperties};
pub use connection_group::ConnectionGroup;
pub use connectivity::{ConnectionRule, ConnectionRuleProperties, Connectivity};
pub use error::{NetworkError, NetworkResult};
pub use flatten::{flatten, FlattenOptions, FlattenedNetwork, SharedDestinationPolicy};
pub use network::Network;
pub use population::{Population, Selection};
pub use projection::{
    ProjectionPortConnection, Projection, Role, PLASTICITY_SUB_COMPONENT, RESPONSE_SUB_COMPONENT,
};
pub use synapse::{ConnectionPropertySet, SynapseProperties, CELL_SUB_COMPONENT};
