// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Flattening a composite into a single [`Dynamics`]
//!
//! Every sub-component is namespaced with its name, then:
//! - analog receive ports become aliases onto their source,
//! - reduce ports become aliases folding every source (and the outer reduce
//!   port, when exposed) with the port's operator,
//! - regimes are the cartesian product of the sub-component regimes, named
//!   `<a>___<b>` in sub-component order,
//! - a transition also fires every `OnEvent` reachable through internal
//!   event connections,
//! - the outer ports are exactly the exposures.

use super::MultiDynamicsProperties;
use crate::dynamics::{
    Alias, Dynamics, DynamicsParts, OnCondition, OnEvent, Regime, StateAssignment, TransitionRef,
};
use crate::error::{DynamicsError, DynamicsResult};
use crate::expression::Expr;
use crate::ports::{namespace, PortKind};
use crate::properties::DynamicsProperties;
use crate::units::Quantity;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Joins sub-component regime names into a composite regime name
pub const REGIME_SEPARATOR: &str = "___";

fn insert_symbol<V>(
    map: &mut BTreeMap<String, V>,
    name: &str,
    value: V,
    context: &str,
) -> DynamicsResult<()> {
    if map.contains_key(name) {
        return Err(DynamicsError::collision(context, name));
    }
    map.insert(name.to_string(), value);
    Ok(())
}

/// Effects accumulated while one composite transition cascades
struct Firing {
    regimes: Vec<String>,
    assignments: Vec<StateAssignment>,
    output_events: BTreeSet<String>,
    visited: BTreeSet<(usize, String)>,
}

impl Firing {
    fn target(&self, current: &str) -> Option<String> {
        let target = self.regimes.join(REGIME_SEPARATOR);
        (target != current).then_some(target)
    }
}

struct Flattener<'a> {
    multi: &'a MultiDynamicsProperties,
    sub_names: Vec<&'a str>,
    /// Namespaced sub-component dynamics, in `sub_names` order
    subs: Vec<Dynamics>,
    outer_ports: BTreeSet<String>,
}

impl<'a> Flattener<'a> {
    fn index_of(&self, sub: &str) -> Option<usize> {
        self.sub_names.iter().position(|name| *name == sub)
    }

    fn fire_from(
        &self,
        combo: &[&str],
        sub_index: usize,
        transition: TransitionRef<'_>,
        src_port: Option<&str>,
    ) -> Firing {
        let mut firing = Firing {
            regimes: combo.iter().map(|name| name.to_string()).collect(),
            assignments: Vec::new(),
            output_events: BTreeSet::new(),
            visited: BTreeSet::new(),
        };
        if let Some(port) = src_port {
            firing.visited.insert((sub_index, port.to_string()));
        }
        self.fire(&mut firing, combo, sub_index, transition);
        firing
    }

    fn fire(
        &self,
        firing: &mut Firing,
        combo: &[&str],
        sub_index: usize,
        transition: TransitionRef<'_>,
    ) {
        firing
            .assignments
            .extend(transition.assignments().iter().cloned());
        if let Some(target) = transition.target_regime() {
            firing.regimes[sub_index] = target.to_string();
        }

        let sender = self.sub_names[sub_index];
        for output in transition.output_events() {
            if self.outer_ports.contains(output) {
                firing.output_events.insert(output.clone());
            }
            let links = self
                .multi
                .port_connections
                .iter()
                .filter(|c| c.sender == sender && namespace(&c.send_port, sender) == *output);
            for link in links {
                let Some(receiver_index) = self.index_of(&link.receiver) else {
                    continue;
                };
                let port = namespace(&link.receive_port, &link.receiver);
                if !firing.visited.insert((receiver_index, port.clone())) {
                    continue;
                }
                let on_event = self.subs[receiver_index]
                    .regime(combo[receiver_index])
                    .and_then(|regime| regime.on_events.get(&port));
                if let Some(on_event) = on_event {
                    self.fire(firing, combo, receiver_index, TransitionRef::Event(on_event));
                }
            }
        }
    }

    fn build_regimes(&self, parts: &mut DynamicsParts) {
        let mut combos: Vec<Vec<&str>> = vec![Vec::new()];
        for dynamics in &self.subs {
            let names: Vec<&str> = dynamics.regimes().map(|r| r.name.as_str()).collect();
            combos = combos
                .into_iter()
                .flat_map(|combo| {
                    names.iter().map(move |name| {
                        let mut next = combo.clone();
                        next.push(*name);
                        next
                    })
                })
                .collect();
        }

        let initial: Vec<&str> = self.subs.iter().map(|d| d.initial_regime()).collect();
        parts.initial_regime = initial.join(REGIME_SEPARATOR);

        for combo in &combos {
            let name = combo.join(REGIME_SEPARATOR);
            let mut regime = Regime::new(&name);

            for (index, dynamics) in self.subs.iter().enumerate() {
                let Some(sub_regime) = dynamics.regime(combo[index]) else {
                    continue;
                };
                regime.time_derivatives.extend(
                    sub_regime
                        .time_derivatives
                        .iter()
                        .map(|(variable, rhs)| (variable.clone(), rhs.clone())),
                );
                for on_condition in &sub_regime.on_conditions {
                    let firing =
                        self.fire_from(combo, index, TransitionRef::Condition(on_condition), None);
                    regime.on_conditions.push(OnCondition {
                        trigger: on_condition.trigger.clone(),
                        target_regime: firing.target(&name),
                        assignments: firing.assignments,
                        output_events: firing.output_events,
                    });
                }
            }

            for exposure in self.multi.port_exposures.values() {
                if exposure.port.kind != PortKind::EventReceive {
                    continue;
                }
                let Some(index) = self.index_of(&exposure.sub_component) else {
                    continue;
                };
                let port = exposure.name();
                let Some(on_event) = self.subs[index]
                    .regime(combo[index])
                    .and_then(|r| r.on_events.get(&port))
                else {
                    continue;
                };
                let firing =
                    self.fire_from(combo, index, TransitionRef::Event(on_event), Some(&port));
                regime.on_events.insert(
                    port.clone(),
                    OnEvent {
                        src_port: port,
                        target_regime: firing.target(&name),
                        assignments: firing.assignments,
                        output_events: firing.output_events,
                    },
                );
            }

            parts.regimes.insert(name, regime);
        }
    }
}

impl MultiDynamicsProperties {
    /// Collapse the composite into one [`DynamicsProperties`]
    ///
    /// Symbols are renamed `<symbol>__<sub_component>` (recursively for
    /// nested composites) and properties follow the same renaming.
    pub fn flatten(&self) -> DynamicsResult<DynamicsProperties> {
        let context = format!("multi-dynamics '{}'", self.name);
        if self.sub_components.is_empty() {
            return Err(DynamicsError::invalid(
                context,
                "at least one sub-component is required",
            ));
        }

        let mut sub_names = Vec::with_capacity(self.sub_components.len());
        let mut subs = Vec::with_capacity(self.sub_components.len());
        let mut properties: BTreeMap<String, Quantity> = BTreeMap::new();
        for (sub_name, sub) in &self.sub_components {
            let flat = sub.flatten()?;
            for (name, quantity) in flat.property_map() {
                properties.insert(namespace(name, sub_name), quantity.clone());
            }
            subs.push(flat.definition().namespaced(sub_name));
            sub_names.push(sub_name.as_str());
        }

        let mut parts = DynamicsParts {
            name: self.name.clone(),
            ..DynamicsParts::default()
        };
        for dynamics in &subs {
            for parameter in dynamics.parameters() {
                insert_symbol(&mut parts.parameters, &parameter.name, parameter.clone(), &context)?;
            }
            for state_variable in dynamics.state_variables() {
                insert_symbol(
                    &mut parts.state_variables,
                    &state_variable.name,
                    state_variable.clone(),
                    &context,
                )?;
            }
            for alias in dynamics.aliases() {
                insert_symbol(&mut parts.aliases, &alias.name, alias.clone(), &context)?;
            }
            for constant in dynamics.constants() {
                insert_symbol(&mut parts.constants, &constant.name, constant.clone(), &context)?;
            }
        }

        self.wire_inputs(&mut parts, &context)?;

        for exposure in self.port_exposures.values() {
            let port = exposure.outer_port();
            parts.ports.insert(port.name.clone(), port);
        }

        let flattener = Flattener {
            multi: self,
            sub_names,
            subs,
            outer_ports: parts.ports.keys().cloned().collect(),
        };
        flattener.build_regimes(&mut parts);

        trace!(
            target: "ninefold-dynamics",
            "Flattened '{}' into {} regimes",
            self.name,
            parts.regimes.len()
        );

        let dynamics = Dynamics::from_parts(parts)?;
        DynamicsProperties::new(self.name.clone(), dynamics, properties)
    }

    /// Replace every analog input of every sub-component by an alias onto
    /// whatever feeds it
    fn wire_inputs(&self, parts: &mut DynamicsParts, context: &str) -> DynamicsResult<()> {
        for (sub_name, sub) in &self.sub_components {
            for port in sub.ports() {
                let inner = namespace(&port.name, sub_name);
                let exposed = self
                    .port_exposures
                    .contains_key(&port.exposure_name(sub_name));
                let mut sources: Vec<Expr> = self
                    .sources_of(sub_name, &port.name)
                    .map(|c| Expr::symbol(namespace(&c.send_port, &c.sender)))
                    .collect();

                let rhs = match port.kind {
                    PortKind::AnalogReceive => {
                        if exposed {
                            continue;
                        }
                        if sources.is_empty() {
                            return Err(DynamicsError::reference(
                                format!("source of analog receive port in {}", context),
                                format!("{}.{}", sub_name, port.name),
                            ));
                        }
                        sources.remove(0)
                    }
                    PortKind::AnalogReduce(operator) => {
                        if exposed {
                            sources.push(Expr::symbol(port.exposure_name(sub_name)));
                        }
                        Expr::fold(operator.binary_operator(), sources, operator.identity())
                    }
                    _ => continue,
                };
                insert_symbol(
                    &mut parts.aliases,
                    &inner,
                    Alias {
                        name: inner.clone(),
                        rhs,
                    },
                    context,
                )?;
            }
        }
        Ok(())
    }
}
