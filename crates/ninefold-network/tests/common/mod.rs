// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared network fixtures for the flattener tests

#![allow(dead_code)]

use ninefold_dynamics::{
    Dimension, Dynamics, DynamicsProperties, Quantity, RandomDistributionProperties,
    ReduceOperator, RegimeBuilder, TransitionBuilder, Unit,
};
use ninefold_network::{
    ConnectionRule, ConnectionRuleProperties, Network, Population, Projection, Role, Selection,
};

pub fn delay() -> Quantity {
    1.5 * Unit::MS
}

pub fn all_to_all() -> ConnectionRuleProperties {
    ConnectionRuleProperties::all_to_all("all_to_all_props")
}

// ---------------------------------------------------------------------------
// Dynamics
// ---------------------------------------------------------------------------

fn cell1_definition() -> Dynamics {
    Dynamics::builder("Cell")
        .state_variable("SV1", Dimension::VOLTAGE)
        .regime(
            RegimeBuilder::new("R1")
                .time_derivative("SV1", "-SV1 / P1 + i_ext / P2")
                .transition(TransitionBuilder::on_condition("SV1 > P3").emit("spike")),
        )
        .analog_reduce_port("i_ext", Dimension::CURRENT, ReduceOperator::Add)
        .event_send_port("spike")
        .parameter("P1", Dimension::TIME)
        .parameter("P2", Dimension::CAPACITANCE)
        .parameter("P3", Dimension::VOLTAGE)
        .build()
        .expect("cell1 definition")
}

fn cell2_definition() -> Dynamics {
    Dynamics::builder("Cell")
        .state_variable("SV1", Dimension::VOLTAGE)
        .regime(
            RegimeBuilder::new("R1")
                .time_derivative("SV1", "-SV1 ^ 2 / P1 + i_ext / P2")
                .transition(TransitionBuilder::on_condition("SV1 > P3").emit("spike"))
                .transition(TransitionBuilder::on_condition("SV1 > P4").emit("double_spike")),
        )
        .analog_reduce_port("i_ext", Dimension::CURRENT, ReduceOperator::Add)
        .parameter("P1", Dimension::TIME * Dimension::VOLTAGE)
        .parameter("P2", Dimension::CAPACITANCE)
        .parameter("P3", Dimension::VOLTAGE)
        .parameter("P4", Dimension::VOLTAGE)
        .build()
        .expect("cell2 definition")
}

pub fn cell1() -> DynamicsProperties {
    DynamicsProperties::new(
        "Pop1Props",
        cell1_definition(),
        [
            ("P1", 10.0 * Unit::MS),
            ("P2", 100.0 * Unit::UF),
            ("P3", -50.0 * Unit::MV),
        ],
    )
    .expect("cell1 properties")
}

pub fn cell2() -> DynamicsProperties {
    DynamicsProperties::new(
        "Pop2Props",
        cell2_definition(),
        [
            ("P1", Quantity::new(20.0, Unit::MS * Unit::MV)),
            ("P2", 50.0 * Unit::UF),
            ("P3", -40.0 * Unit::MV),
            ("P4", -20.0 * Unit::MV),
        ],
    )
    .expect("cell2 properties")
}

pub fn cell3() -> DynamicsProperties {
    DynamicsProperties::new(
        "Pop3Props",
        cell1_definition(),
        [
            ("P1", 30.0 * Unit::MS),
            ("P2", 50.0 * Unit::PF),
            ("P3", -20.0 * Unit::MV),
        ],
    )
    .expect("cell3 properties")
}

pub fn exc() -> DynamicsProperties {
    let definition = Dynamics::builder("Exc")
        .alias("i", "SV1")
        .regime(
            RegimeBuilder::new("default")
                .time_derivative("SV1", "SV1/tau")
                .transition(TransitionBuilder::on_event("spike").assign("SV1", "SV1 + weight"))
                .transition(
                    TransitionBuilder::on_event("double_spike").assign("SV1", "SV1 + 2 * weight"),
                ),
        )
        .state_variable("SV1", Dimension::CURRENT)
        .analog_send_port("i", Dimension::CURRENT)
        .analog_receive_port("weight", Dimension::CURRENT)
        .parameter("tau", Dimension::TIME)
        .build()
        .expect("exc definition");
    DynamicsProperties::new("ExcProps", definition, [("tau", 1.0 * Unit::MS)])
        .expect("exc properties")
}

pub fn inh() -> DynamicsProperties {
    let definition = Dynamics::builder("Inh")
        .alias("i", "SV1")
        .regime(
            RegimeBuilder::new("default")
                .time_derivative("SV1", "SV1/tau")
                .transition(TransitionBuilder::on_event("spike").assign("SV1", "SV1 - weight")),
        )
        .state_variable("SV1", Dimension::CURRENT)
        .analog_send_port("i", Dimension::CURRENT)
        .analog_receive_port("weight", Dimension::CURRENT)
        .parameter("tau", Dimension::TIME)
        .build()
        .expect("inh definition");
    DynamicsProperties::new("ExcProps", definition, [("tau", 1.0 * Unit::MS)])
        .expect("inh properties")
}

pub fn random_weight() -> Quantity {
    let normal = RandomDistributionProperties::new(
        "normal",
        "NormalDistribution",
        [("mean", 1.0), ("variance", 0.25)],
    );
    Quantity::new(normal, Unit::NA)
}

pub fn random_wmax() -> Quantity {
    let normal = RandomDistributionProperties::new(
        "normal",
        "NormalDistribution",
        [("mean", 2.0), ("variance", 0.5)],
    );
    Quantity::new(normal, Unit::UNITLESS)
}

pub fn static_weight(weight: Quantity) -> DynamicsProperties {
    let definition = Dynamics::builder("Static")
        .alias("fixed_weight", "weight")
        .regime(RegimeBuilder::new("default"))
        .analog_send_port("fixed_weight", Dimension::CURRENT)
        .parameter("weight", Dimension::CURRENT)
        .build()
        .expect("static definition");
    DynamicsProperties::new("StaticProps", definition, [("weight", weight)])
        .expect("static properties")
}

/// Static weights drawn from [`random_weight`]
pub fn random_static() -> DynamicsProperties {
    static_weight(random_weight())
}

pub fn stdp() -> DynamicsProperties {
    let definition = Dynamics::builder("PartialStdpGuetig")
        .parameter("tauLTP", Dimension::TIME)
        .parameter("aLTD", Dimension::DIMENSIONLESS)
        .parameter("wmax", Dimension::DIMENSIONLESS)
        .parameter("muLTP", Dimension::DIMENSIONLESS)
        .parameter("tauLTD", Dimension::TIME)
        .parameter("aLTP", Dimension::DIMENSIONLESS)
        .state_variable("tlast_post", Dimension::TIME)
        .state_variable("tlast_pre", Dimension::TIME)
        .state_variable("deltaw", Dimension::DIMENSIONLESS)
        .state_variable("interval", Dimension::TIME)
        .state_variable("M", Dimension::DIMENSIONLESS)
        .state_variable("P", Dimension::DIMENSIONLESS)
        .state_variable("wsyn", Dimension::DIMENSIONLESS)
        .constant("ONE_NA", 1.0, Unit::NA)
        .alias("wsyn_current", "wsyn * ONE_NA")
        .analog_send_port("wsyn", Dimension::DIMENSIONLESS)
        .analog_send_port("wsyn_current", Dimension::CURRENT)
        .regime(
            RegimeBuilder::new("sole").transition(
                TransitionBuilder::on_event("incoming_spike")
                    .assign("tlast_post", "t")
                    .assign("tlast_pre", "tlast_pre")
                    .assign(
                        "deltaw",
                        "P*pow(wmax - wsyn, muLTP) * exp(-interval/tauLTP) + deltaw",
                    )
                    .assign("interval", "t - tlast_pre")
                    .assign("M", "M*exp((-t + tlast_post)/tauLTD) - aLTD")
                    .assign("P", "P*exp((-t + tlast_pre)/tauLTP) + aLTP")
                    .assign("wsyn", "deltaw + wsyn"),
            ),
        )
        .build()
        .expect("stdp definition");
    DynamicsProperties::new(
        "StdpProps",
        definition,
        [
            ("tauLTP", 10.0 * Unit::MS),
            ("aLTD", Quantity::from(1.0)),
            ("wmax", random_wmax()),
            ("muLTP", Quantity::from(3.0)),
            ("tauLTD", 20.0 * Unit::MS),
            ("aLTP", Quantity::from(4.0)),
        ],
    )
    .expect("stdp properties")
}

// ---------------------------------------------------------------------------
// Three populations, four projections
// ---------------------------------------------------------------------------

pub fn pop1() -> Population {
    Population::new("Pop1", 10, cell1()).expect("Pop1")
}

pub fn pop2() -> Population {
    Population::new("Pop2", 15, cell2()).expect("Pop2")
}

pub fn pop3() -> Population {
    Population::new("Pop3", 20, cell3()).expect("Pop3")
}

pub fn proj1() -> Projection {
    Projection::new(
        "Proj1",
        "Pop1",
        "Pop2",
        inh(),
        Some(random_static()),
        all_to_all(),
        delay(),
        [
            (Role::Pre, "spike", Role::Response, "spike"),
            (Role::Response, "i", Role::Post, "i_ext"),
            (Role::Plasticity, "fixed_weight", Role::Response, "weight"),
        ],
    )
    .expect("Proj1")
}

pub fn proj2() -> Projection {
    Projection::new(
        "Proj2",
        "Pop2",
        "Pop1",
        exc(),
        Some(random_static()),
        all_to_all(),
        delay(),
        [
            (Role::Pre, "spike", Role::Response, "spike"),
            (Role::Pre, "double_spike", Role::Response, "double_spike"),
            (Role::Response, "i", Role::Post, "i_ext"),
            (Role::Plasticity, "fixed_weight", Role::Response, "weight"),
        ],
    )
    .expect("Proj2")
}

pub fn proj3() -> Projection {
    Projection::new(
        "Proj3",
        "Pop3",
        "Pop2",
        exc(),
        Some(stdp()),
        all_to_all(),
        delay(),
        [
            (Role::Pre, "spike", Role::Response, "spike"),
            (Role::Response, "i", Role::Post, "i_ext"),
            (Role::Plasticity, "wsyn_current", Role::Response, "weight"),
            (Role::Pre, "spike", Role::Plasticity, "incoming_spike"),
        ],
    )
    .expect("Proj3")
}

pub fn proj4() -> Projection {
    Projection::new(
        "Proj4",
        "Pop3",
        "Pop1",
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
    .expect("Proj4")
}

pub fn four_projection_network() -> Network {
    Network::new(
        "Net",
        [pop1(), pop2(), pop3()],
        Vec::<Selection>::new(),
        [proj1(), proj2(), proj3(), proj4()],
    )
    .expect("Net")
}

// ---------------------------------------------------------------------------
// Brunel (2000) style network: Exc and Inh grouped under a selection
// ---------------------------------------------------------------------------

fn brunel_iaf() -> DynamicsProperties {
    let definition = Dynamics::builder("BrunelIaF")
        .state_variable("V", Dimension::VOLTAGE)
        .state_variable("t_rpend", Dimension::TIME)
        .regime(
            RegimeBuilder::new("subthreshold")
                .time_derivative("V", "(-V + R*i_synaptic)/tau")
                .transition(
                    TransitionBuilder::on_condition("V > theta")
                        .assign("V", "Vreset")
                        .assign("t_rpend", "t + tau_rp")
                        .emit("spike_output")
                        .to("refractory"),
                ),
        )
        .regime(
            RegimeBuilder::new("refractory")
                .transition(TransitionBuilder::on_condition("t > t_rpend").to("subthreshold")),
        )
        .analog_reduce_port("i_synaptic", Dimension::CURRENT, ReduceOperator::Add)
        .analog_send_port("V", Dimension::VOLTAGE)
        .parameter("tau", Dimension::TIME)
        .parameter("theta", Dimension::VOLTAGE)
        .parameter("tau_rp", Dimension::TIME)
        .parameter("Vreset", Dimension::VOLTAGE)
        .parameter("R", Dimension::RESISTANCE)
        .build()
        .expect("BrunelIaF definition");
    DynamicsProperties::new(
        "BrunelIaFProps",
        definition,
        [
            ("tau", 20.0 * Unit::MS),
            ("theta", 20.0 * Unit::MV),
            ("tau_rp", 2.0 * Unit::MS),
            ("Vreset", 10.0 * Unit::MV),
            ("R", 1.5 * Unit::MOHM),
        ],
    )
    .expect("BrunelIaF properties")
}

fn poisson() -> DynamicsProperties {
    let definition = Dynamics::builder("Poisson")
        .state_variable("t_next", Dimension::TIME)
        .regime(
            RegimeBuilder::new("default").transition(
                TransitionBuilder::on_condition("t > t_next")
                    .assign("t_next", "t + 1 / rate")
                    .emit("spike_output"),
            ),
        )
        .parameter("rate", Dimension::PER_TIME)
        .build()
        .expect("Poisson definition");
    DynamicsProperties::new("PoissonProps", definition, [("rate", 20.0 * Unit::HZ)])
        .expect("Poisson properties")
}

fn alpha_psr(name: &str) -> DynamicsProperties {
    let definition = Dynamics::builder("Alpha")
        .state_variable("A", Dimension::CURRENT)
        .state_variable("B", Dimension::CURRENT)
        .alias("Isyn", "B")
        .regime(
            RegimeBuilder::new("default")
                .time_derivative("A", "-A/tau")
                .time_derivative("B", "(A - B)/tau")
                .transition(TransitionBuilder::on_event("spike").assign("A", "A + q")),
        )
        .analog_receive_port("q", Dimension::CURRENT)
        .analog_send_port("Isyn", Dimension::CURRENT)
        .parameter("tau", Dimension::TIME)
        .build()
        .expect("Alpha definition");
    DynamicsProperties::new(name, definition, [("tau", 0.1 * Unit::MS)])
        .expect("Alpha properties")
}

fn brunel_projection(name: &str, pre: &str, weight: f64, number: f64) -> Projection {
    let fan_in =
        ConnectionRuleProperties::new(format!("{}Conn", name), ConnectionRule::RandomFanIn, [(
            "number",
            Quantity::from(number),
        )])
        .expect("fan-in properties");
    Projection::new(
        name,
        pre,
        "All",
        alpha_psr(&format!("{}PSR", name)),
        Some(static_weight(weight * Unit::NA)),
        fan_in,
        delay(),
        [
            (Role::Pre, "spike_output", Role::Response, "spike"),
            (Role::Response, "Isyn", Role::Post, "i_synaptic"),
            (Role::Plasticity, "fixed_weight", Role::Response, "q"),
        ],
    )
    .expect("Brunel projection")
}

pub fn brunel_network() -> Network {
    let exc = Population::new("Exc", 40, brunel_iaf()).expect("Exc");
    let inh = Population::new("Inh", 10, brunel_iaf()).expect("Inh");
    let ext = Population::new("Ext", 50, poisson()).expect("Ext");
    let all = Selection::new("All", ["Exc", "Inh"]).expect("All");
    Network::new(
        "brunel_ai",
        [exc, inh, ext],
        [all],
        [
            brunel_projection("Excitation", "Exc", 0.1, 4.0),
            brunel_projection("Inhibition", "Inh", -0.5, 1.0),
            brunel_projection("External", "Ext", 0.1, 4.0),
        ],
    )
    .expect("brunel_ai")
}
