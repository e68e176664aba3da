// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Network flattening integration tests

Covers:
- The three population / four projection network against hand-built arrays
  and connection groups
- A Brunel style network whose projections target a selection
- Accumulation of several synapses on one reduce port
- Shared destination policy and boundary errors
*/

mod common;

use common::*;
use ninefold_dynamics::{
    Communication, Dimension, Dynamics, DynamicsProperties, FindMismatch,
    MultiDynamicsProperties, Property, Quantity, RegimeBuilder, SubComponentProperties,
    TransitionBuilder, Unit,
};
use ninefold_network::{
    flatten, ComponentArray, ConnectionGroup, ConnectionPropertySet, Connectivity,
    FlattenOptions, MultiDynamicsWithSynapsesProperties, Network, NetworkError, Population,
    Projection, ProjectionPortConnection, Role, Selection, SharedDestinationPolicy,
    SynapseProperties,
};
use std::collections::BTreeSet;

fn compose<I, C, E>(name: &str, subs: I, connections: C, exposures: E) -> MultiDynamicsProperties
where
    I: IntoIterator<Item = (&'static str, SubComponentProperties)>,
    C: IntoIterator<Item = (&'static str, &'static str, &'static str, &'static str)>,
    E: IntoIterator<Item = (&'static str, &'static str)>,
{
    MultiDynamicsProperties::compose(name, subs, connections, exposures)
        .unwrap_or_else(|e| panic!("failed to compose '{}': {}", name, e))
}

fn no_connections() -> Vec<(&'static str, &'static str, &'static str, &'static str)> {
    Vec::new()
}

fn static_synapse(name: &str, response: DynamicsProperties, double: bool) -> MultiDynamicsProperties {
    let mut exposures = vec![("psr", "i"), ("psr", "spike")];
    if double {
        exposures.push(("psr", "double_spike"));
    }
    compose(
        name,
        [("psr", response.into()), ("pls", random_static().into())],
        [("pls", "fixed_weight", "psr", "weight")],
        exposures,
    )
}

fn weight_set(port: &str, projection: &str) -> ConnectionPropertySet {
    ConnectionPropertySet::new(
        port,
        [Property::new(format!("weight__pls__{}", projection), random_weight())],
    )
}

fn expected_pop1() -> ComponentArray {
    let composite = compose(
        "Pop1_cell",
        [
            ("cell", cell1().into()),
            ("Proj2", static_synapse("Proj2_syn", exc(), true).into()),
            ("Proj4", static_synapse("Proj4_syn", exc(), false).into()),
        ],
        [
            ("Proj2", "i__psr", "cell", "i_ext"),
            ("Proj4", "i__psr", "cell", "i_ext"),
        ],
        [
            ("cell", "spike"),
            ("Proj2", "double_spike__psr"),
            ("Proj2", "spike__psr"),
            ("Proj4", "spike__psr"),
        ],
    );
    ComponentArray::new(
        "Pop1",
        10,
        MultiDynamicsWithSynapsesProperties::new(
            "Pop1_cell",
            composite,
            Vec::<SynapseProperties>::new(),
            [
                weight_set("spike__psr__Proj2", "Proj2"),
                weight_set("double_spike__psr__Proj2", "Proj2"),
                weight_set("spike__psr__Proj4", "Proj4"),
            ],
        ),
    )
}

fn expected_pop2() -> ComponentArray {
    let composite = compose(
        "Pop2_cell",
        [
            ("cell", cell2().into()),
            ("Proj1", static_synapse("Proj1_syn", inh(), false).into()),
        ],
        [("Proj1", "i__psr", "cell", "i_ext")],
        [
            ("cell", "spike"),
            ("cell", "double_spike"),
            ("Proj1", "spike__psr"),
            ("cell", "i_ext"),
        ],
    );
    let proj3_syn = compose(
        "Proj3_syn",
        [("psr", exc().into()), ("pls", stdp().into())],
        [("pls", "wsyn_current", "psr", "weight")],
        [("psr", "spike"), ("pls", "incoming_spike"), ("psr", "i")],
    );
    let held = SynapseProperties {
        name: "Proj3".to_string(),
        dynamics_properties: proj3_syn,
        port_connections: [ProjectionPortConnection::new(
            Role::Synapse,
            "i__psr__Proj3",
            Role::Post,
            "i_ext__cell__reduce",
        )]
        .into_iter()
        .collect(),
    };
    ComponentArray::new(
        "Pop2",
        15,
        MultiDynamicsWithSynapsesProperties::new(
            "Pop2_cell",
            composite,
            [held],
            [weight_set("spike__psr__Proj1", "Proj1")],
        ),
    )
}

fn expected_pop3() -> ComponentArray {
    let composite = compose(
        "Pop3_cell",
        [("cell", cell3().into())],
        no_connections(),
        [("cell", "spike"), ("cell", "i_ext")],
    );
    ComponentArray::new(
        "Pop3",
        20,
        MultiDynamicsWithSynapsesProperties::new(
            "Pop3_cell",
            composite,
            Vec::<SynapseProperties>::new(),
            Vec::<ConnectionPropertySet>::new(),
        ),
    )
}

fn event_group(
    name: &str,
    source: (&str, usize),
    destination: (&str, usize),
    source_port: &str,
    destination_port: &str,
) -> ConnectionGroup {
    ConnectionGroup {
        name: name.to_string(),
        communication: Communication::Event,
        source: source.0.to_string(),
        destination: destination.0.to_string(),
        source_port: source_port.to_string(),
        destination_port: destination_port.to_string(),
        connectivity: Connectivity::new(all_to_all(), source.1, destination.1)
            .expect("connectivity"),
        delay: delay(),
    }
}

fn assert_no_mismatch<T: FindMismatch + std::fmt::Debug>(actual: &T, expected: &T) {
    if let Some(mismatch) = actual.find_mismatch(expected) {
        panic!("Mismatch between generated and expected:\n{}", mismatch);
    }
}

// ===== TEST 1: three populations, four projections =====
#[test]
fn test_component_arrays_match_expected() {
    let flat = flatten(&four_projection_network(), &FlattenOptions::default())
        .expect("flatten four projection network");

    assert_eq!(flat.component_arrays.len(), 3);
    assert_no_mismatch(&flat.component_arrays["Pop1"], &expected_pop1());
    assert_no_mismatch(&flat.component_arrays["Pop2"], &expected_pop2());
    assert_no_mismatch(&flat.component_arrays["Pop3"], &expected_pop3());
    assert_eq!(flat.component_arrays["Pop1"], expected_pop1());

    let pop1_subs: Vec<&str> = flat.component_arrays["Pop1"]
        .dynamics_properties()
        .dynamics_properties()
        .sub_components()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(pop1_subs, ["Proj2", "Proj4", "cell"]);
    let pop2 = flat.component_arrays["Pop2"].dynamics_properties();
    assert!(pop2.synapse("Proj3").is_some());
    assert!(flat.selections.is_empty());
}

// ===== TEST 2: connection groups =====
#[test]
fn test_connection_groups_match_expected() {
    let flat = flatten(&four_projection_network(), &FlattenOptions::default())
        .expect("flatten four projection network");

    let expected = [
        event_group("Proj1", ("Pop1", 10), ("Pop2", 15), "spike__cell", "spike__psr__Proj1"),
        event_group(
            "Proj2__pre__spike__synapse__spike__psr",
            ("Pop2", 15),
            ("Pop1", 10),
            "spike__cell",
            "spike__psr__Proj2",
        ),
        event_group(
            "Proj2__pre__double_spike__synapse__double_spike__psr",
            ("Pop2", 15),
            ("Pop1", 10),
            "double_spike__cell",
            "double_spike__psr__Proj2",
        ),
        event_group(
            "Proj3__pre__spike__synapse__spike__psr",
            ("Pop3", 20),
            ("Pop2", 15),
            "spike__cell",
            "spike__psr__Proj3",
        ),
        event_group(
            "Proj3__pre__spike__synapse__incoming_spike__pls",
            ("Pop3", 20),
            ("Pop2", 15),
            "spike__cell",
            "incoming_spike__pls__Proj3",
        ),
        event_group("Proj4", ("Pop3", 20), ("Pop1", 10), "spike__cell", "spike__psr__Proj4"),
    ];

    assert_eq!(flat.connection_groups.len(), expected.len());
    for group in &expected {
        let actual = flat
            .connection_groups
            .get(&group.name)
            .unwrap_or_else(|| panic!("missing connection group '{}'", group.name));
        assert_no_mismatch(actual, group);
    }
}

// ===== TEST 3: Brunel network with a selection =====
#[test]
fn test_brunel_network() {
    let flat = flatten(&brunel_network(), &FlattenOptions::default()).expect("flatten brunel");
    assert_eq!(flat.component_arrays.len(), 3);
    assert_eq!(flat.connection_groups.len(), 3);
    assert_eq!(flat.selections.len(), 1);

    let all: BTreeSet<String> = ["Exc", "Inh"].iter().map(|s| s.to_string()).collect();
    assert_eq!(flat.selections["All"], all);

    let excitation = &flat.connection_groups["Excitation"];
    assert_eq!(excitation.source, "Exc");
    assert_eq!(excitation.destination, "All");
    assert_eq!(excitation.source_port, "spike_output__cell");
    assert_eq!(excitation.destination_port, "spike__psr__Excitation");
    assert_eq!(excitation.connectivity.source_size, 40);
    assert_eq!(excitation.connectivity.destination_size, 50);

    // Every selection member receives every projection onto the selection
    for name in ["Exc", "Inh"] {
        let subs = flat.component_arrays[name]
            .dynamics_properties()
            .dynamics_properties()
            .sub_components();
        assert_eq!(subs.len(), 4, "{} sub-components", name);
    }
    let ext_subs = flat.component_arrays["Ext"]
        .dynamics_properties()
        .dynamics_properties()
        .sub_components();
    assert_eq!(ext_subs.len(), 1);
}

// ===== TEST 4: synapses accumulate on the reduce port =====
#[test]
fn test_reduce_accumulation() {
    let flat = flatten(&four_projection_network(), &FlattenOptions::default())
        .expect("flatten four projection network");
    let pop1 = flat.component_arrays["Pop1"]
        .dynamics_properties()
        .flatten()
        .expect("flatten Pop1 composite");
    let i_ext = pop1.definition().alias("i_ext__cell").expect("i_ext alias");
    let sources: BTreeSet<String> = i_ext.rhs.symbols();
    let expected: BTreeSet<String> = ["i__psr__Proj2", "i__psr__Proj4"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(sources, expected);

    // The held Proj3 keeps Pop2's reduce port open
    let pop2 = &flat.component_arrays["Pop2"];
    assert!(pop2.port("i_ext__cell__reduce").is_some());
    assert!(pop2.port("i__psr__Proj3").is_some());
}

#[test]
fn test_dropping_a_projection_removes_only_its_summand() {
    let full = flatten(&four_projection_network(), &FlattenOptions::default())
        .expect("flatten four projection network");
    let without_proj4 = Network::new(
        "Net",
        [pop1(), pop2(), pop3()],
        Vec::<Selection>::new(),
        [proj1(), proj2(), proj3()],
    )
    .expect("Net without Proj4");
    let reduced = flatten(&without_proj4, &FlattenOptions::default())
        .expect("flatten without Proj4");

    let pop1 = reduced.component_arrays["Pop1"]
        .dynamics_properties()
        .flatten()
        .expect("flatten Pop1 composite");
    let i_ext = pop1.definition().alias("i_ext__cell").expect("i_ext alias");
    assert_eq!(i_ext.rhs.to_string(), "i__psr__Proj2");

    let composite = |flat: &ninefold_network::FlattenedNetwork| {
        flat.component_arrays["Pop1"]
            .dynamics_properties()
            .dynamics_properties()
            .clone()
    };
    let (before, after) = (composite(&full), composite(&reduced));
    assert!(after.sub_component("Proj4").is_none());
    let proj2_before = before.sub_component("Proj2").expect("Proj2 before");
    let proj2_after = after.sub_component("Proj2").expect("Proj2 after");
    assert!(proj2_before.find_mismatch(proj2_after).is_none());
    assert_eq!(proj2_before, proj2_after);
}

// ===== TEST 5: shared destination policy =====
fn converging_network() -> Network {
    let proj = Projection::new(
        "Converge",
        "Pop2",
        "Pop1",
        exc(),
        Some(random_static()),
        all_to_all(),
        delay(),
        [
            (Role::Pre, "spike", Role::Response, "spike"),
            (Role::Pre, "double_spike", Role::Response, "spike"),
            (Role::Response, "i", Role::Post, "i_ext"),
            (Role::Plasticity, "fixed_weight", Role::Response, "weight"),
        ],
    )
    .expect("Converge");
    Network::new("Converging", [pop1(), pop2()], Vec::<Selection>::new(), [proj])
        .expect("Converging")
}

#[test]
fn test_shared_destination_policy() {
    let network = converging_network();

    let split = flatten(&network, &FlattenOptions::default()).expect("split policy");
    assert_eq!(split.connection_groups.len(), 2);
    assert!(split
        .connection_groups
        .contains_key("Converge__pre__double_spike__synapse__spike__psr"));

    let options = FlattenOptions {
        shared_destination_policy: SharedDestinationPolicy::Reject,
        ..FlattenOptions::default()
    };
    let err = flatten(&network, &options).unwrap_err();
    assert!(matches!(err, NetworkError::Invalid { .. }), "got {:?}", err);
}

// ===== TEST 6: boundary errors =====
#[test]
fn test_projection_without_analog_input_to_post() {
    let proj = Projection::new(
        "Silent",
        "Pop1",
        "Pop3",
        exc(),
        Some(random_static()),
        all_to_all(),
        delay(),
        [
            (Role::Pre, "spike", Role::Response, "spike"),
            (Role::Plasticity, "fixed_weight", Role::Response, "weight"),
        ],
    )
    .expect("Silent");
    let network = Network::new("Net", [pop1(), pop3()], Vec::<Selection>::new(), [proj])
        .expect("Net");
    let err = flatten(&network, &FlattenOptions::default()).unwrap_err();
    assert!(matches!(err, NetworkError::KindMismatch { .. }), "got {:?}", err);
}

#[test]
fn test_projection_named_cell() {
    let proj = Projection::new(
        "cell",
        "Pop1",
        "Pop3",
        exc(),
        Some(random_static()),
        all_to_all(),
        delay(),
        [
            (Role::Pre, "spike", Role::Response, "spike"),
            (Role::Response, "i", Role::Post, "i_ext"),
            (Role::Plasticity, "fixed_weight", Role::Response, "weight"),
        ],
    )
    .expect("cell projection");
    let network = Network::new("Net", [pop1(), pop3()], Vec::<Selection>::new(), [proj])
        .expect("Net");
    let err = flatten(&network, &FlattenOptions::default()).unwrap_err();
    assert!(matches!(err, NetworkError::NamingCollision { ref name, .. } if name == "cell"));
}

#[test]
fn test_undeclared_cell_port() {
    let proj = Projection::new(
        "Typo",
        "Pop1",
        "Pop3",
        exc(),
        Some(random_static()),
        all_to_all(),
        delay(),
        [
            (Role::Pre, "spiek", Role::Response, "spike"),
            (Role::Response, "i", Role::Post, "i_ext"),
            (Role::Plasticity, "fixed_weight", Role::Response, "weight"),
        ],
    )
    .expect("Typo");
    let err = Network::new("Net", [pop1(), pop3()], Vec::<Selection>::new(), [proj]).unwrap_err();
    assert!(
        matches!(err, NetworkError::Reference { ref name, .. } if name == "pre.spiek"),
        "got {:?}",
        err
    );
}

#[test]
fn test_undeclared_post_port() {
    let proj = Projection::new(
        "Wrong",
        "Pop1",
        "Pop3",
        exc(),
        Some(random_static()),
        all_to_all(),
        delay(),
        [
            (Role::Pre, "spike", Role::Response, "spike"),
            (Role::Response, "i", Role::Post, "P_missing"),
            (Role::Plasticity, "fixed_weight", Role::Response, "weight"),
        ],
    )
    .expect("Wrong");
    let err = Network::new("Net", [pop1(), pop3()], Vec::<Selection>::new(), [proj]).unwrap_err();
    assert!(
        matches!(err, NetworkError::Reference { ref name, .. } if name == "post.P_missing"),
        "got {:?}",
        err
    );
}

#[test]
fn test_event_into_analog_port() {
    let proj = Projection::new(
        "Wrong",
        "Pop1",
        "Pop3",
        exc(),
        None,
        all_to_all(),
        delay(),
        [
            (Role::Pre, "spike", Role::Response, "spike"),
            (Role::Pre, "spike", Role::Response, "weight"),
            (Role::Response, "i", Role::Post, "i_ext"),
        ],
    )
    .expect("Wrong");
    let err = Network::new("Net", [pop1(), pop3()], Vec::<Selection>::new(), [proj]).unwrap_err();
    assert!(matches!(err, NetworkError::KindMismatch { .. }), "got {:?}", err);
}

#[test]
fn test_dimension_mismatch_between_roles() {
    // wsyn is dimensionless, weight is a current
    let err = Projection::new(
        "Wrong",
        "Pop3",
        "Pop2",
        exc(),
        Some(stdp()),
        all_to_all(),
        delay(),
        [
            (Role::Pre, "spike", Role::Response, "spike"),
            (Role::Response, "i", Role::Post, "i_ext"),
            (Role::Plasticity, "wsyn", Role::Response, "weight"),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, NetworkError::Dimension { .. }), "got {:?}", err);
}

#[test]
fn test_zero_sized_population() {
    let err = Population::new("Empty", 0, cell1()).unwrap_err();
    assert!(matches!(err, NetworkError::Invalid { .. }));
}

// ===== TEST 7: synapse to pre pathways run backwards =====
fn echo() -> DynamicsProperties {
    // Reports back to the sender once its current crosses a threshold
    let definition = Dynamics::builder("Echo")
        .alias("i", "SV1")
        .regime(
            RegimeBuilder::new("default")
                .time_derivative("SV1", "-SV1/tau")
                .transition(TransitionBuilder::on_condition("SV1 > ONE_NA").emit("echo")),
        )
        .constant("ONE_NA", 1.0, Unit::NA)
        .state_variable("SV1", Dimension::CURRENT)
        .analog_send_port("i", Dimension::CURRENT)
        .parameter("tau", Dimension::TIME)
        .build()
        .expect("Echo definition");
    DynamicsProperties::new("EchoProps", definition, [("tau", 2.0 * Unit::MS)])
        .expect("Echo properties")
}

fn listener() -> Population {
    let definition = Dynamics::builder("Listener")
        .state_variable("n", Dimension::DIMENSIONLESS)
        .regime(
            RegimeBuilder::new("default")
                .transition(TransitionBuilder::on_event("heard").assign("n", "n + 1")),
        )
        .build()
        .expect("Listener definition");
    let none: [(&str, Quantity); 0] = [];
    let cell =
        DynamicsProperties::new("ListenerProps", definition, none).expect("Listener properties");
    Population::new("Listener", 5, cell).expect("Listener")
}

#[test]
fn test_synapse_to_pre_is_inverted() {
    let proj = Projection::new(
        "Echo",
        "Listener",
        "Pop3",
        echo(),
        None,
        all_to_all(),
        delay(),
        [
            (Role::Response, "echo", Role::Pre, "heard"),
            (Role::Response, "i", Role::Post, "i_ext"),
        ],
    )
    .expect("Echo projection");
    let network = Network::new("Net", [listener(), pop3()], Vec::<Selection>::new(), [proj])
        .expect("Net");
    let flat = flatten(&network, &FlattenOptions::default()).expect("flatten echo network");

    // The threshold makes the synapse non-linear, so it is held next to Pop3
    let pop3 = flat.component_arrays["Pop3"].dynamics_properties();
    assert!(pop3.synapse("Echo").is_some());

    let group = &flat.connection_groups["Echo"];
    assert_eq!(group.source, "Pop3");
    assert_eq!(group.destination, "Listener");
    assert_eq!(group.source_port, "echo__psr__Echo");
    assert_eq!(group.destination_port, "heard__cell");
    assert!(group.connectivity.inverted);
    assert_eq!(group.connectivity.source_size, 20);
    assert_eq!(group.connectivity.destination_size, 5);
    assert_eq!(group.delay, Quantity::new(0.0, Unit::MS));
}
