// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Synapses: the response (and plasticity) of one projection, composed into a
single `<projection>_syn` composite.

A synapse is folded into the post-synaptic cell when it is linear and every
heterogeneous (array or random) parameter only feeds event handling. Those
parameters are then lifted into [`ConnectionPropertySet`]s so the backend can
sample one value per connection. Any other synapse is held next to the cell as
[`SynapseProperties`].
*/

use crate::error::{NetworkError, NetworkResult};
use crate::projection::{Projection, ProjectionPortConnection, Role};
use ninefold_dynamics::ports::namespace;
use ninefold_dynamics::impl_find_mismatch;
use ninefold_dynamics::{
    Expr, MultiDynamicsProperties, PortConnection, PortKind, Property, SubComponentProperties,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Sub-component name of the cell inside a component array
pub const CELL_SUB_COMPONENT: &str = "cell";

/// Per-connection properties attached to an exposed event port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPropertySet {
    /// Exposed event receive port (`<event_port>__<projection>`)
    pub port: String,
    pub properties: Vec<Property>,
}

impl_find_mismatch!(
    ConnectionPropertySet,
    |set| format!("ConnectionPropertySet({})", set.port),
    [port, properties]
);

impl ConnectionPropertySet {
    pub fn new<I: IntoIterator<Item = Property>>(port: impl Into<String>, properties: I) -> Self {
        Self {
            port: port.into(),
            properties: properties.into_iter().collect(),
        }
    }
}

/// A synapse kept apart from the post-synaptic cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynapseProperties {
    /// Projection name
    pub name: String,
    pub dynamics_properties: MultiDynamicsProperties,
    /// `synapse`/`post` wiring, with ports under their component array names
    pub port_connections: BTreeSet<ProjectionPortConnection>,
}

impl_find_mismatch!(
    SynapseProperties,
    |syn| format!("SynapseProperties({})", syn.name),
    [name, dynamics_properties, port_connections]
);

/// Where a projection's synapse ends up
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Placement {
    Merged {
        property_sets: Vec<ConnectionPropertySet>,
    },
    Held,
}

/// Name of a response or plasticity port inside the synapse composite
pub(crate) fn synapse_port_name(role: Role, port: &str) -> String {
    match role.sub_component() {
        Some(sub) => namespace(port, sub),
        None => port.to_string(),
    }
}

/// The synapse of one projection and where it goes
#[derive(Debug, Clone)]
pub(crate) struct SynapsePlan {
    pub synapse: MultiDynamicsProperties,
    pub placement: Placement,
}

impl SynapsePlan {
    pub fn new(projection: &Projection) -> NetworkResult<Self> {
        let context = format!("projection '{}'", projection.name());
        if projection.name() == CELL_SUB_COMPONENT {
            return Err(NetworkError::collision(context, CELL_SUB_COMPONENT));
        }
        if !projection.has_analog_input_to_post() {
            return Err(NetworkError::kind_mismatch(
                context,
                "the synapse has no analog connection into the post-synaptic cell",
            ));
        }

        let synapse = build_synapse(projection)?;
        let property_sets = if synapse.is_linear()? {
            extract_property_sets(projection, &synapse)?
        } else {
            None
        };
        let placement = match property_sets {
            Some(property_sets) => Placement::Merged { property_sets },
            None => Placement::Held,
        };

        debug!(
            target: "ninefold-network",
            "Projection '{}' ({} -> {}): synapse {}",
            projection.name(),
            projection.pre(),
            projection.post(),
            match &placement {
                Placement::Merged { property_sets } =>
                    format!("merged with {} connection property sets", property_sets.len()),
                Placement::Held => "held separately".to_string(),
            }
        );
        Ok(Self { synapse, placement })
    }
}

/// Compose response and plasticity into `<projection>_syn`
///
/// Internal response/plasticity wiring becomes composite connections; every
/// synapse port wired to a cell is exposed.
pub(crate) fn build_synapse(projection: &Projection) -> NetworkResult<MultiDynamicsProperties> {
    let mut sub_components: Vec<(&str, SubComponentProperties)> = Vec::with_capacity(2);
    for role in [Role::Response, Role::Plasticity] {
        if let (Some(sub), Some(props)) = (role.sub_component(), projection.role_properties(role)) {
            sub_components.push((sub, props.clone().into()));
        }
    }

    let mut connections: Vec<PortConnection> = Vec::new();
    let mut exposures: BTreeSet<(&str, &str)> = BTreeSet::new();
    for connection in projection.port_connections() {
        let sender = connection.sender_role.sub_component();
        let receiver = connection.receiver_role.sub_component();
        match (sender, receiver) {
            (Some(sender), Some(receiver)) => connections.push(PortConnection::new(
                sender,
                connection.send_port.as_str(),
                receiver,
                connection.receive_port.as_str(),
            )),
            (Some(sender), None) => {
                exposures.insert((sender, connection.send_port.as_str()));
            }
            (None, Some(receiver)) => {
                exposures.insert((receiver, connection.receive_port.as_str()));
            }
            (None, None) => {}
        }
    }

    Ok(MultiDynamicsProperties::compose(
        format!("{}_syn", projection.name()),
        sub_components,
        connections,
        exposures,
    )?)
}

/// Lift heterogeneous event-only parameters into connection property sets
///
/// Returns `None` when a heterogeneous parameter reaches the continuous part
/// of the synapse (or an analog output), in which case the synapse cannot be
/// merged into the cell.
pub(crate) fn extract_property_sets(
    projection: &Projection,
    synapse: &MultiDynamicsProperties,
) -> NetworkResult<Option<Vec<ConnectionPropertySet>>> {
    let flat = synapse.flatten()?;
    let definition = flat.definition();

    let varying: BTreeSet<String> = flat.varying_parameters().map(String::from).collect();
    if varying.is_empty() {
        return Ok(Some(Vec::new()));
    }

    let analog_outputs: Vec<Expr> = definition
        .ports()
        .filter(|p| p.kind == PortKind::AnalogSend)
        .map(|p| Expr::symbol(p.name.clone()))
        .collect();
    let mut not_permitted = definition.continuous_parameters();
    not_permitted.extend(definition.required_parameters(&analog_outputs));
    if !varying.is_disjoint(&not_permitted) {
        return Ok(None);
    }

    let mut per_port: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for regime in definition.regimes() {
        for (port, on_event) in &regime.on_events {
            let required =
                definition.required_parameters(on_event.assignments.iter().map(|a| &a.rhs));
            let used: Vec<String> = required.intersection(&varying).cloned().collect();
            if !used.is_empty() {
                per_port.entry(port.as_str()).or_default().extend(used);
            }
        }
    }

    let sets = per_port
        .into_iter()
        .map(|(port, parameters)| {
            let properties = parameters.into_iter().filter_map(|parameter| {
                flat.property(&parameter).map(|quantity| {
                    Property::new(namespace(&parameter, projection.name()), quantity.clone())
                })
            });
            ConnectionPropertySet::new(namespace(port, projection.name()), properties)
        })
        .collect();
    Ok(Some(sets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::ConnectionRuleProperties;
    use ninefold_dynamics::{
        Dimension, Dynamics, DynamicsProperties, Quantity, RandomDistributionProperties,
        RegimeBuilder, TransitionBuilder, Unit,
    };

    fn exc() -> DynamicsProperties {
        let definition = Dynamics::builder("Exc")
            .alias("i", "SV1")
            .regime(
                RegimeBuilder::new("default")
                    .time_derivative("SV1", "SV1/tau")
                    .transition(TransitionBuilder::on_event("spike").assign("SV1", "SV1 + weight")),
            )
            .state_variable("SV1", Dimension::CURRENT)
            .analog_send_port("i", Dimension::CURRENT)
            .analog_receive_port("weight", Dimension::CURRENT)
            .parameter("tau", Dimension::TIME)
            .build()
            .unwrap();
        DynamicsProperties::new("ExcProps", definition, [("tau", 1.0 * Unit::MS)]).unwrap()
    }

    fn fixed(weight: Quantity) -> DynamicsProperties {
        let definition = Dynamics::builder("Static")
            .alias("fixed_weight", "weight")
            .regime(RegimeBuilder::new("default"))
            .analog_send_port("fixed_weight", Dimension::CURRENT)
            .parameter("weight", Dimension::CURRENT)
            .build()
            .unwrap();
        DynamicsProperties::new("StaticProps", definition, [("weight", weight)]).unwrap()
    }

    fn random_weight() -> Quantity {
        let normal = RandomDistributionProperties::new(
            "normal",
            "NormalDistribution",
            [("mean", 1.0), ("variance", 0.25)],
        );
        Quantity::new(normal, Unit::NA)
    }

    fn projection(name: &str, weight: Quantity) -> Projection {
        Projection::new(
            name,
            "Pop1",
            "Pop2",
            exc(),
            Some(fixed(weight)),
            ConnectionRuleProperties::all_to_all("AllToAll"),
            1.5 * Unit::MS,
            [
                (Role::Pre, "spike", Role::Response, "spike"),
                (Role::Response, "i", Role::Post, "i_ext"),
                (Role::Plasticity, "fixed_weight", Role::Response, "weight"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_synapse_composite() {
        let synapse = build_synapse(&projection("Proj1", 2.0 * Unit::NA)).unwrap();
        assert_eq!(synapse.name(), "Proj1_syn");
        let exposed: Vec<String> = synapse.port_exposures().map(|e| e.name()).collect();
        assert_eq!(exposed, vec!["i__psr", "spike__psr"]);
        assert_eq!(synapse.port_connections().len(), 1);
    }

    #[test]
    fn test_random_weight_becomes_connection_property() {
        let proj = projection("Proj1", random_weight());
        let plan = SynapsePlan::new(&proj).unwrap();
        match plan.placement {
            Placement::Merged { property_sets } => {
                assert_eq!(property_sets.len(), 1);
                assert_eq!(property_sets[0].port, "spike__psr__Proj1");
                assert_eq!(property_sets[0].properties[0].name, "weight__pls__Proj1");
                assert_eq!(property_sets[0].properties[0].quantity, random_weight());
            }
            Placement::Held => panic!("linear synapse should be merged"),
        }
    }

    #[test]
    fn test_single_weight_has_no_property_sets() {
        let plan = SynapsePlan::new(&projection("Proj1", 2.0 * Unit::NA)).unwrap();
        assert_eq!(plan.placement, Placement::Merged { property_sets: vec![] });
    }

    #[test]
    fn test_projection_named_cell() {
        let err = SynapsePlan::new(&projection("cell", 2.0 * Unit::NA)).unwrap_err();
        assert!(matches!(err, NetworkError::NamingCollision { .. }));
    }

    #[test]
    fn test_requires_analog_input_to_post() {
        let proj = Projection::new(
            "Silent",
            "Pop1",
            "Pop2",
            exc(),
            Some(fixed(2.0 * Unit::NA)),
            ConnectionRuleProperties::all_to_all("AllToAll"),
            1.5 * Unit::MS,
            [
                (Role::Pre, "spike", Role::Response, "spike"),
                (Role::Plasticity, "fixed_weight", Role::Response, "weight"),
            ],
        )
        .unwrap();
        let err = SynapsePlan::new(&proj).unwrap_err();
        assert!(matches!(err, NetworkError::KindMismatch { .. }));
    }
}
