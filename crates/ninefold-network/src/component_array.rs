// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-population output of the flattener

use crate::synapse::{ConnectionPropertySet, SynapseProperties};
use ninefold_dynamics::ports::namespace;
use ninefold_dynamics::{
    impl_find_mismatch, DynamicsProperties, DynamicsResult, MultiDynamicsProperties, Port,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The merged cell composite plus what could not be merged into it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiDynamicsWithSynapsesProperties {
    name: String,
    dynamics_properties: MultiDynamicsProperties,
    /// Keyed by projection name
    synapses: BTreeMap<String, SynapseProperties>,
    /// Keyed by exposed event port
    connection_property_sets: BTreeMap<String, ConnectionPropertySet>,
}

impl_find_mismatch!(
    MultiDynamicsWithSynapsesProperties,
    |props| format!("MultiDynamicsWithSynapsesProperties({})", props.name),
    [name, dynamics_properties, synapses, connection_property_sets]
);

impl MultiDynamicsWithSynapsesProperties {
    pub fn new<S, C>(
        name: impl Into<String>,
        dynamics_properties: MultiDynamicsProperties,
        synapses: S,
        connection_property_sets: C,
    ) -> Self
    where
        S: IntoIterator<Item = SynapseProperties>,
        C: IntoIterator<Item = ConnectionPropertySet>,
    {
        Self {
            name: name.into(),
            dynamics_properties,
            synapses: synapses.into_iter().map(|s| (s.name.clone(), s)).collect(),
            connection_property_sets: connection_property_sets
                .into_iter()
                .map(|set| (set.port.clone(), set))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dynamics_properties(&self) -> &MultiDynamicsProperties {
        &self.dynamics_properties
    }

    pub fn synapses(&self) -> impl Iterator<Item = &SynapseProperties> {
        self.synapses.values()
    }

    pub fn synapse(&self, name: &str) -> Option<&SynapseProperties> {
        self.synapses.get(name)
    }

    pub fn connection_property_sets(&self) -> impl Iterator<Item = &ConnectionPropertySet> {
        self.connection_property_sets.values()
    }

    pub fn connection_property_set(&self, port: &str) -> Option<&ConnectionPropertySet> {
        self.connection_property_sets.get(port)
    }

    /// Ports reachable from outside: the composite's exposures plus every
    /// held synapse port as `<port>__<synapse>`
    pub fn ports(&self) -> Vec<Port> {
        let mut ports = self.dynamics_properties.ports();
        for synapse in self.synapses.values() {
            ports.extend(
                synapse
                    .dynamics_properties
                    .ports()
                    .into_iter()
                    .map(|p| p.renamed(namespace(&p.name, &synapse.name))),
            );
        }
        ports
    }

    pub fn port(&self, name: &str) -> Option<Port> {
        if let Some(port) = self.dynamics_properties.port(name) {
            return Some(port);
        }
        self.synapses.values().find_map(|synapse| {
            let inner = name.strip_suffix(&format!("__{}", synapse.name))?;
            synapse
                .dynamics_properties
                .port(inner)
                .map(|p| p.renamed(name))
        })
    }

    /// The cell composite as a single dynamics
    pub fn flatten(&self) -> DynamicsResult<DynamicsProperties> {
        self.dynamics_properties.flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentArray {
    /// Population name
    name: String,
    size: usize,
    dynamics_properties: MultiDynamicsWithSynapsesProperties,
}

impl_find_mismatch!(
    ComponentArray,
    |array| format!("ComponentArray({})", array.name),
    [name, size, dynamics_properties]
);

impl ComponentArray {
    pub fn new(
        name: impl Into<String>,
        size: usize,
        dynamics_properties: MultiDynamicsWithSynapsesProperties,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            dynamics_properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dynamics_properties(&self) -> &MultiDynamicsWithSynapsesProperties {
        &self.dynamics_properties
    }

    pub fn port(&self, name: &str) -> Option<Port> {
        self.dynamics_properties.port(name)
    }

    pub fn ports(&self) -> Vec<Port> {
        self.dynamics_properties.ports()
    }
}
