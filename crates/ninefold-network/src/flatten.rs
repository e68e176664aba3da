// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Network flattening.

Turns a [`Network`] into one [`ComponentArray`] per population and one
[`ConnectionGroup`] per pathway touching a pre-synaptic cell:

1. every population starts from its cell under the `cell` sub-component;
2. each projection's synapse (`<projection>_syn`) is merged into every post
   population under `<projection>`, or held next to it when it cannot be
   merged (see [`crate::synapse`]);
3. synapse to post wiring becomes composite connections, so several
   projections accumulate on one reduce port;
4. each connection to or from `pre` becomes a connection group, named after
   the projection when it is the only one;
5. selections are resolved to population name sets;
6. every cell port not fed internally is exposed.

Processing follows the ordered maps of the network, and every output is held
in ordered collections, so the result does not depend on the order the
network was built in.
*/

use crate::component_array::{ComponentArray, MultiDynamicsWithSynapsesProperties};
use crate::connection_group::ConnectionGroup;
use crate::connectivity::Connectivity;
use crate::error::{NetworkError, NetworkResult};
use crate::network::Network;
use crate::population::Population;
use crate::projection::{Projection, ProjectionPortConnection, Role};
use crate::synapse::{
    synapse_port_name, ConnectionPropertySet, Placement, SynapsePlan, SynapseProperties,
    CELL_SUB_COMPONENT,
};
use ninefold_dynamics::ports::namespace;
use ninefold_dynamics::{
    impl_find_mismatch, MultiDynamicsProperties, Port, PortConnection, Quantity,
    SubComponentProperties,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// What to do when two pre-synaptic ports feed the same destination port of
/// one projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharedDestinationPolicy {
    /// Keep one connection group per pathway
    #[default]
    Split,
    /// Refuse to flatten
    Reject,
}

impl fmt::Display for SharedDestinationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharedDestinationPolicy::Split => write!(f, "split"),
            SharedDestinationPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for SharedDestinationPolicy {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "split" => Ok(SharedDestinationPolicy::Split),
            "reject" => Ok(SharedDestinationPolicy::Reject),
            other => Err(NetworkError::invalid(
                "shared destination policy",
                format!("unknown policy '{}' (expected 'split' or 'reject')", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenOptions {
    pub shared_destination_policy: SharedDestinationPolicy,
    /// Check every connection group against the exposed ports of its arrays
    pub validate_composites: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            shared_destination_policy: SharedDestinationPolicy::Split,
            validate_composites: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenedNetwork {
    pub component_arrays: BTreeMap<String, ComponentArray>,
    pub connection_groups: BTreeMap<String, ConnectionGroup>,
    /// Selection name -> member population names
    pub selections: BTreeMap<String, BTreeSet<String>>,
}

impl_find_mismatch!(
    FlattenedNetwork,
    |flat| format!("FlattenedNetwork({} arrays)", flat.component_arrays.len()),
    [component_arrays, connection_groups, selections]
);

pub fn flatten(network: &Network, options: &FlattenOptions) -> NetworkResult<FlattenedNetwork> {
    let mut plans: BTreeMap<&str, SynapsePlan> = BTreeMap::new();
    for projection in network.projections() {
        plans.insert(projection.name(), SynapsePlan::new(projection)?);
    }

    let mut component_arrays = BTreeMap::new();
    for population in network.populations() {
        let array = build_component_array(network, population, &plans)?;
        component_arrays.insert(population.name().to_string(), array);
    }

    let mut connection_groups = BTreeMap::new();
    for projection in network.projections() {
        for group in build_connection_groups(network, projection, options)? {
            if connection_groups.contains_key(&group.name) {
                return Err(NetworkError::collision(
                    format!("connection groups of network '{}'", network.name()),
                    group.name,
                ));
            }
            connection_groups.insert(group.name.clone(), group);
        }
    }

    let selections: BTreeMap<String, BTreeSet<String>> = network
        .selections()
        .map(|s| (s.name().to_string(), s.populations().iter().cloned().collect()))
        .collect();

    if options.validate_composites {
        for group in connection_groups.values() {
            group.validate(&component_arrays, &selections)?;
        }
    }

    let held = plans
        .values()
        .filter(|plan| plan.placement == Placement::Held)
        .count();
    info!(
        target: "ninefold-network",
        "Flattened network '{}': {} component arrays, {} connection groups, {} selections ({} synapses held separately)",
        network.name(),
        component_arrays.len(),
        connection_groups.len(),
        selections.len(),
        held
    );

    Ok(FlattenedNetwork {
        component_arrays,
        connection_groups,
        selections,
    })
}

/// Port of the first member cell of a population or selection
///
/// Every member has it; `Network` checks cell ports against each member.
fn cell_port(network: &Network, endpoint: &str, port: &str, context: &str) -> NetworkResult<Port> {
    network
        .members(endpoint)
        .and_then(|members| members.first().copied())
        .and_then(|population| population.cell().definition().port(port).cloned())
        .ok_or_else(|| NetworkError::reference(context, format!("{}.{}", endpoint, port)))
}

/// Everything a component array is composed from
#[derive(Default)]
struct ArrayParts {
    sub_components: Vec<(String, SubComponentProperties)>,
    connections: BTreeSet<PortConnection>,
    exposures: BTreeSet<(String, String)>,
    synapses: Vec<SynapseProperties>,
    property_sets: BTreeMap<String, ConnectionPropertySet>,
}

impl ArrayParts {
    fn expose(&mut self, sub_component: &str, port: &str) {
        self.exposures
            .insert((sub_component.to_string(), port.to_string()));
    }

    fn merge_synapse(
        &mut self,
        projection: &Projection,
        synapse: &MultiDynamicsProperties,
        property_sets: &[ConnectionPropertySet],
        context: &str,
    ) -> NetworkResult<()> {
        let name = projection.name();
        self.sub_components
            .push((name.to_string(), synapse.clone().into()));
        for connection in projection.port_connections() {
            let send = synapse_port_name(connection.sender_role, &connection.send_port);
            let receive = synapse_port_name(connection.receiver_role, &connection.receive_port);
            match (connection.sender_role, connection.receiver_role) {
                (sender, Role::Post) if sender.is_synapse_side() => {
                    self.connections.insert(PortConnection::new(
                        name,
                        send,
                        CELL_SUB_COMPONENT,
                        receive,
                    ));
                }
                (Role::Post, receiver) if receiver.is_synapse_side() => {
                    self.connections.insert(PortConnection::new(
                        CELL_SUB_COMPONENT,
                        send,
                        name,
                        receive,
                    ));
                }
                (Role::Pre, receiver) if receiver.is_synapse_side() => self.expose(name, &receive),
                (sender, Role::Pre) if sender.is_synapse_side() => self.expose(name, &send),
                (Role::Pre, Role::Post) => self.expose(CELL_SUB_COMPONENT, &receive),
                (Role::Post, Role::Pre) => self.expose(CELL_SUB_COMPONENT, &send),
                _ => {}
            }
        }
        for set in property_sets {
            if self.property_sets.contains_key(&set.port) {
                return Err(NetworkError::collision(context, set.port.clone()));
            }
            self.property_sets.insert(set.port.clone(), set.clone());
        }
        Ok(())
    }

    fn hold_synapse(
        &mut self,
        projection: &Projection,
        synapse: &MultiDynamicsProperties,
        cell: &Population,
        context: &str,
    ) -> NetworkResult<()> {
        let name = projection.name();
        let cell_port = |port: &str| -> NetworkResult<Port> {
            cell.cell()
                .definition()
                .port(port)
                .cloned()
                .ok_or_else(|| NetworkError::reference(context, format!("post.{}", port)))
        };
        let mut wiring = BTreeSet::new();
        for connection in projection.port_connections() {
            let send = synapse_port_name(connection.sender_role, &connection.send_port);
            let receive = synapse_port_name(connection.receiver_role, &connection.receive_port);
            match (connection.sender_role, connection.receiver_role) {
                (sender, Role::Post) if sender.is_synapse_side() => {
                    let port = cell_port(&connection.receive_port)?;
                    self.expose(CELL_SUB_COMPONENT, &port.name);
                    wiring.insert(ProjectionPortConnection::new(
                        Role::Synapse,
                        namespace(&send, name),
                        Role::Post,
                        port.exposure_name(CELL_SUB_COMPONENT),
                    ));
                }
                (Role::Post, receiver) if receiver.is_synapse_side() => {
                    let port = cell_port(&connection.send_port)?;
                    self.expose(CELL_SUB_COMPONENT, &port.name);
                    wiring.insert(ProjectionPortConnection::new(
                        Role::Post,
                        port.exposure_name(CELL_SUB_COMPONENT),
                        Role::Synapse,
                        namespace(&receive, name),
                    ));
                }
                (Role::Pre, Role::Post) => self.expose(CELL_SUB_COMPONENT, &receive),
                (Role::Post, Role::Pre) => self.expose(CELL_SUB_COMPONENT, &send),
                _ => {}
            }
        }
        self.synapses.push(SynapseProperties {
            name: name.to_string(),
            dynamics_properties: synapse.clone(),
            port_connections: wiring,
        });
        Ok(())
    }
}

fn build_component_array(
    network: &Network,
    population: &Population,
    plans: &BTreeMap<&str, SynapsePlan>,
) -> NetworkResult<ComponentArray> {
    let pop = population.name();
    let context = format!("component array '{}'", pop);
    let mut parts = ArrayParts::default();
    parts
        .sub_components
        .push((CELL_SUB_COMPONENT.to_string(), population.cell().clone().into()));

    for projection in network.projections() {
        if network.includes(projection.post(), pop) {
            let plan = plans
                .get(projection.name())
                .ok_or_else(|| NetworkError::reference(&context, projection.name()))?;
            match &plan.placement {
                Placement::Merged { property_sets } => {
                    parts.merge_synapse(projection, &plan.synapse, property_sets, &context)?
                }
                Placement::Held => parts.hold_synapse(projection, &plan.synapse, population, &context)?,
            }
        }
        if network.includes(projection.pre(), pop) {
            for connection in projection.connections_with(Role::Pre) {
                if connection.sender_role == Role::Pre {
                    parts.expose(CELL_SUB_COMPONENT, &connection.send_port);
                }
                if connection.receiver_role == Role::Pre {
                    parts.expose(CELL_SUB_COMPONENT, &connection.receive_port);
                }
            }
        }
    }

    // Whatever the cell does not get from inside stays reachable from outside
    for port in population.cell().definition().ports() {
        let fed_internally = port.kind.is_receive()
            && parts
                .connections
                .iter()
                .any(|c| c.receiver == CELL_SUB_COMPONENT && c.receive_port == port.name);
        if !fed_internally {
            parts.expose(CELL_SUB_COMPONENT, &port.name);
        }
    }

    let name = format!("{}_cell", pop);
    let composite = MultiDynamicsProperties::compose(
        name.clone(),
        parts.sub_components,
        parts.connections,
        parts.exposures,
    )?;
    debug!(
        target: "ninefold-network",
        "Component array '{}': {} sub-components, {} held synapses",
        pop,
        composite.sub_components().len(),
        parts.synapses.len()
    );
    Ok(ComponentArray::new(
        pop,
        population.size(),
        MultiDynamicsWithSynapsesProperties::new(
            name,
            composite,
            parts.synapses,
            parts.property_sets.into_values(),
        ),
    ))
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Pre => "pre",
        Role::Post => "post",
        _ => "synapse",
    }
}

fn build_connection_groups(
    network: &Network,
    projection: &Projection,
    options: &FlattenOptions,
) -> NetworkResult<Vec<ConnectionGroup>> {
    let name = projection.name();
    let context = format!("connection groups of projection '{}'", name);
    let pathways: Vec<&ProjectionPortConnection> = projection.connections_with(Role::Pre).collect();

    if options.shared_destination_policy == SharedDestinationPolicy::Reject {
        let mut destinations: BTreeMap<(Role, &str), &str> = BTreeMap::new();
        for pathway in pathways.iter().filter(|c| c.sender_role == Role::Pre) {
            let key = (pathway.receiver_role, pathway.receive_port.as_str());
            if let Some(previous) = destinations.insert(key, pathway.send_port.as_str()) {
                return Err(NetworkError::invalid(
                    context,
                    format!(
                        "pre ports '{}' and '{}' both feed {}.{}",
                        previous, pathway.send_port, pathway.receiver_role, pathway.receive_port
                    ),
                ));
            }
        }
    }

    let size = |endpoint: &str| {
        network
            .endpoint_size(endpoint)
            .ok_or_else(|| NetworkError::reference(&context, endpoint))
    };
    let connectivity = Connectivity::new(
        projection.connectivity().clone(),
        size(projection.pre())?,
        size(projection.post())?,
    )?;

    // Name of a non-pre port as seen on the post component array
    let post_side_port = |role: Role, port: &str| -> NetworkResult<String> {
        if role.is_synapse_side() {
            Ok(namespace(&synapse_port_name(role, port), name))
        } else {
            Ok(cell_port(network, projection.post(), port, &context)?.exposure_name(CELL_SUB_COMPONENT))
        }
    };

    let mut groups = Vec::with_capacity(pathways.len());
    for pathway in &pathways {
        let group_name = if pathways.len() == 1 {
            name.to_string()
        } else {
            format!(
                "{}__{}__{}__{}__{}",
                name,
                role_label(pathway.sender_role),
                synapse_port_name(pathway.sender_role, &pathway.send_port),
                role_label(pathway.receiver_role),
                synapse_port_name(pathway.receiver_role, &pathway.receive_port)
            )
        };

        let group = if pathway.sender_role == Role::Pre {
            let pre_port = cell_port(network, projection.pre(), &pathway.send_port, &context)?;
            ConnectionGroup {
                name: group_name,
                communication: pre_port.communication(),
                source: projection.pre().to_string(),
                destination: projection.post().to_string(),
                source_port: pre_port.exposure_name(CELL_SUB_COMPONENT),
                destination_port: post_side_port(pathway.receiver_role, &pathway.receive_port)?,
                connectivity: connectivity.clone(),
                delay: projection.delay().clone(),
            }
        } else {
            let pre_port = cell_port(network, projection.pre(), &pathway.receive_port, &context)?;
            ConnectionGroup {
                name: group_name,
                communication: pre_port.communication(),
                source: projection.post().to_string(),
                destination: projection.pre().to_string(),
                source_port: post_side_port(pathway.sender_role, &pathway.send_port)?,
                destination_port: pre_port.exposure_name(CELL_SUB_COMPONENT),
                connectivity: connectivity.inverse(),
                delay: Quantity::new(0.0, projection.delay().units.clone()),
            }
        };
        groups.push(group);
    }
    Ok(groups)
}
