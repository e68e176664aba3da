// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fluent construction of [`Dynamics`] from expression strings
//!
//! Expressions are only parsed in [`DynamicsBuilder::build`], which reports the
//! first problem found as a [`DynamicsError`].

use super::{
    Alias, Constant, Dynamics, DynamicsParts, OnCondition, OnEvent, Parameter, Regime,
    StateAssignment, StateVariable,
};
use crate::error::{DynamicsError, DynamicsResult};
use crate::expression::Expr;
use crate::ports::{Port, ReduceOperator};
use crate::units::{Dimension, Unit};
use std::collections::{BTreeMap, BTreeSet};

fn parse(context: impl Into<String>, text: &str) -> DynamicsResult<Expr> {
    Expr::parse(text).map_err(|source| DynamicsError::Parse {
        context: context.into(),
        source,
    })
}

fn insert_unique<V>(
    map: &mut BTreeMap<String, V>,
    name: &str,
    value: V,
    context: &str,
) -> DynamicsResult<()> {
    if map.insert(name.to_string(), value).is_some() {
        return Err(DynamicsError::collision(context, name));
    }
    Ok(())
}

#[derive(Debug, Clone)]
enum Trigger {
    Event(String),
    Condition(String),
}

/// A transition under construction
#[derive(Debug, Clone)]
pub struct TransitionBuilder {
    trigger: Trigger,
    assignments: Vec<(String, String)>,
    output_events: Vec<String>,
    target_regime: Option<String>,
}

impl TransitionBuilder {
    pub fn on_event(port: impl Into<String>) -> Self {
        Self::new(Trigger::Event(port.into()))
    }

    pub fn on_condition(trigger: impl Into<String>) -> Self {
        Self::new(Trigger::Condition(trigger.into()))
    }

    fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            assignments: Vec::new(),
            output_events: Vec::new(),
            target_regime: None,
        }
    }

    pub fn assign(mut self, variable: impl Into<String>, rhs: impl Into<String>) -> Self {
        self.assignments.push((variable.into(), rhs.into()));
        self
    }

    pub fn emit(mut self, port: impl Into<String>) -> Self {
        self.output_events.push(port.into());
        self
    }

    pub fn to(mut self, regime: impl Into<String>) -> Self {
        self.target_regime = Some(regime.into());
        self
    }

    fn parse_assignments(&self, context: &str) -> DynamicsResult<Vec<StateAssignment>> {
        self.assignments
            .iter()
            .map(|(variable, rhs)| {
                Ok(StateAssignment {
                    variable: variable.clone(),
                    rhs: parse(format!("assignment to '{}' in {}", variable, context), rhs)?,
                })
            })
            .collect()
    }
}

/// A regime under construction
#[derive(Debug, Clone)]
pub struct RegimeBuilder {
    name: String,
    time_derivatives: Vec<(String, String)>,
    transitions: Vec<TransitionBuilder>,
}

impl RegimeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_derivatives: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// `d<variable>/dt = rhs`
    pub fn time_derivative(mut self, variable: impl Into<String>, rhs: impl Into<String>) -> Self {
        self.time_derivatives.push((variable.into(), rhs.into()));
        self
    }

    pub fn transition(mut self, transition: TransitionBuilder) -> Self {
        self.transitions.push(transition);
        self
    }

    fn build(&self, dynamics_name: &str) -> DynamicsResult<Regime> {
        let context = format!("regime '{}' of dynamics '{}'", self.name, dynamics_name);
        let mut regime = Regime::new(&self.name);

        for (variable, rhs) in &self.time_derivatives {
            let expr = parse(format!("d{}/dt in {}", variable, context), rhs)?;
            insert_unique(&mut regime.time_derivatives, variable, expr, &context)?;
        }

        for transition in &self.transitions {
            let output_events: BTreeSet<String> = transition.output_events.iter().cloned().collect();
            match &transition.trigger {
                Trigger::Event(port) => {
                    let on_event = OnEvent {
                        src_port: port.clone(),
                        assignments: transition
                            .parse_assignments(&format!("OnEvent({}) of {}", port, context))?,
                        output_events,
                        target_regime: transition.target_regime.clone(),
                    };
                    insert_unique(&mut regime.on_events, port, on_event, &context)?;
                }
                Trigger::Condition(text) => {
                    let trigger = parse(format!("trigger of {}", context), text)?;
                    regime.on_conditions.push(OnCondition {
                        assignments: transition
                            .parse_assignments(&format!("OnCondition({}) of {}", text, context))?,
                        trigger,
                        output_events,
                        target_regime: transition.target_regime.clone(),
                    });
                }
            }
        }
        Ok(regime)
    }
}

/// Builder for [`Dynamics`]
///
/// Event ports that transitions use but that were not declared are added
/// automatically: `OnEvent` sources as event receive ports and output
/// events as event send ports.
#[derive(Debug, Clone)]
pub struct DynamicsBuilder {
    name: String,
    parameters: Vec<Parameter>,
    state_variables: Vec<StateVariable>,
    aliases: Vec<(String, String)>,
    constants: Vec<Constant>,
    ports: Vec<Port>,
    regimes: Vec<RegimeBuilder>,
    initial_regime: Option<String>,
}

impl DynamicsBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            state_variables: Vec::new(),
            aliases: Vec::new(),
            constants: Vec::new(),
            ports: Vec::new(),
            regimes: Vec::new(),
            initial_regime: None,
        }
    }

    pub fn parameter(mut self, name: impl Into<String>, dimension: Dimension) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            dimension,
        });
        self
    }

    pub fn state_variable(mut self, name: impl Into<String>, dimension: Dimension) -> Self {
        self.state_variables.push(StateVariable {
            name: name.into(),
            dimension,
        });
        self
    }

    pub fn alias(mut self, name: impl Into<String>, rhs: impl Into<String>) -> Self {
        self.aliases.push((name.into(), rhs.into()));
        self
    }

    pub fn constant(mut self, name: impl Into<String>, value: f64, units: Unit) -> Self {
        self.constants.push(Constant {
            name: name.into(),
            value,
            units,
        });
        self
    }

    pub fn port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    pub fn analog_send_port(self, name: impl Into<String>, dimension: Dimension) -> Self {
        self.port(Port::analog_send(name, dimension))
    }

    pub fn analog_receive_port(self, name: impl Into<String>, dimension: Dimension) -> Self {
        self.port(Port::analog_receive(name, dimension))
    }

    pub fn analog_reduce_port(
        self,
        name: impl Into<String>,
        dimension: Dimension,
        operator: ReduceOperator,
    ) -> Self {
        self.port(Port::analog_reduce(name, dimension, operator))
    }

    pub fn event_send_port(self, name: impl Into<String>) -> Self {
        self.port(Port::event_send(name))
    }

    pub fn event_receive_port(self, name: impl Into<String>) -> Self {
        self.port(Port::event_receive(name))
    }

    pub fn regime(mut self, regime: RegimeBuilder) -> Self {
        self.regimes.push(regime);
        self
    }

    /// Defaults to the first regime added
    pub fn initial_regime(mut self, name: impl Into<String>) -> Self {
        self.initial_regime = Some(name.into());
        self
    }

    pub fn build(self) -> DynamicsResult<Dynamics> {
        let context = format!("dynamics '{}'", self.name);
        let mut parts = DynamicsParts {
            name: self.name.clone(),
            ..DynamicsParts::default()
        };

        for parameter in self.parameters {
            let name = parameter.name.clone();
            insert_unique(&mut parts.parameters, &name, parameter, &context)?;
        }
        for state_variable in self.state_variables {
            let name = state_variable.name.clone();
            insert_unique(&mut parts.state_variables, &name, state_variable, &context)?;
        }
        for constant in self.constants {
            let name = constant.name.clone();
            insert_unique(&mut parts.constants, &name, constant, &context)?;
        }
        for (name, rhs) in &self.aliases {
            let alias = Alias {
                name: name.clone(),
                rhs: parse(format!("alias '{}' of {}", name, context), rhs)?,
            };
            insert_unique(&mut parts.aliases, name, alias, &context)?;
        }
        for port in self.ports {
            let name = port.name.clone();
            insert_unique(&mut parts.ports, &name, port, &context)?;
        }

        for regime in &self.regimes {
            let built = regime.build(&self.name)?;
            for transition in built.transitions() {
                for output in transition.output_events() {
                    parts
                        .ports
                        .entry(output.clone())
                        .or_insert_with(|| Port::event_send(output.clone()));
                }
            }
            for src_port in built.on_events.keys() {
                parts
                    .ports
                    .entry(src_port.clone())
                    .or_insert_with(|| Port::event_receive(src_port.clone()));
            }
            let name = built.name.clone();
            insert_unique(&mut parts.regimes, &name, built, &context)?;
        }

        parts.initial_regime = match self.initial_regime {
            Some(name) => name,
            None => match self.regimes.first() {
                Some(regime) => regime.name.clone(),
                None => {
                    return Err(DynamicsError::invalid(
                        context,
                        "at least one regime is required",
                    ))
                }
            },
        };

        Dynamics::from_parts(parts)
    }
}
