// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Connection rules and the connectivity of a concrete connection group.

A rule is described by name plus its properties; the backend is the one that
actually draws connections. Here we only check that a rule carries exactly the
properties it needs and that the sizes it is applied to make sense.
*/

use crate::error::{NetworkError, NetworkResult};
use ninefold_dynamics::{impl_find_mismatch, impl_leaf_mismatch};
use ninefold_dynamics::{Dimension, Quantity, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionRule {
    AllToAll,
    OneToOne,
    /// Each destination draws `number` sources
    RandomFanIn,
    /// Each source draws `number` destinations
    RandomFanOut,
    Probabilistic,
    Explicit,
}

impl ConnectionRule {
    pub fn required_properties(&self) -> &'static [&'static str] {
        match self {
            ConnectionRule::AllToAll | ConnectionRule::OneToOne => &[],
            ConnectionRule::RandomFanIn | ConnectionRule::RandomFanOut => &["number"],
            ConnectionRule::Probabilistic => &["probability"],
            ConnectionRule::Explicit => &["destination_indices", "source_indices"],
        }
    }
}

impl fmt::Display for ConnectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionRule::AllToAll => "AllToAll",
            ConnectionRule::OneToOne => "OneToOne",
            ConnectionRule::RandomFanIn => "RandomFanIn",
            ConnectionRule::RandomFanOut => "RandomFanOut",
            ConnectionRule::Probabilistic => "Probabilistic",
            ConnectionRule::Explicit => "Explicit",
        };
        write!(f, "{}", name)
    }
}

#[derive(Deserialize)]
struct ConnectionRulePropertiesData {
    name: String,
    rule: ConnectionRule,
    properties: BTreeMap<String, Quantity>,
}

/// A connection rule bound to its (dimensionless) properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConnectionRulePropertiesData")]
pub struct ConnectionRuleProperties {
    name: String,
    rule: ConnectionRule,
    properties: BTreeMap<String, Quantity>,
}

impl_leaf_mismatch!(ConnectionRule);

impl_find_mismatch!(
    ConnectionRuleProperties,
    |props| format!("ConnectionRuleProperties({})", props.name),
    [name, rule, properties]
);

impl TryFrom<ConnectionRulePropertiesData> for ConnectionRuleProperties {
    type Error = NetworkError;

    fn try_from(data: ConnectionRulePropertiesData) -> Result<Self, Self::Error> {
        ConnectionRuleProperties::new(data.name, data.rule, data.properties)
    }
}

impl ConnectionRuleProperties {
    pub fn new<I, S, Q>(name: impl Into<String>, rule: ConnectionRule, properties: I) -> NetworkResult<Self>
    where
        I: IntoIterator<Item = (S, Q)>,
        S: Into<String>,
        Q: Into<Quantity>,
    {
        let name = name.into();
        let context = format!("connection rule properties '{}' ({})", name, rule);
        let mut bound = BTreeMap::new();
        for (property, quantity) in properties {
            let property = property.into();
            let quantity = quantity.into();
            if !rule.required_properties().contains(&property.as_str()) {
                return Err(NetworkError::reference(&context, property));
            }
            if !quantity.dimension().is_dimensionless() {
                return Err(NetworkError::Dimension {
                    context: format!("property '{}' of {}", property, context),
                    expected: Dimension::DIMENSIONLESS,
                    actual: quantity.dimension(),
                });
            }
            if bound.insert(property.clone(), quantity).is_some() {
                return Err(NetworkError::collision(&context, property));
            }
        }
        if let Some(missing) = rule
            .required_properties()
            .iter()
            .find(|p| !bound.contains_key(**p))
        {
            return Err(NetworkError::invalid(
                context,
                format!("property '{}' is required", missing),
            ));
        }

        let props = Self {
            name,
            rule,
            properties: bound,
        };
        props.check_values(&context)?;
        Ok(props)
    }

    /// Shorthand for the property-free `AllToAll` rule
    pub fn all_to_all(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rule: ConnectionRule::AllToAll,
            properties: BTreeMap::new(),
        }
    }

    fn check_values(&self, context: &str) -> NetworkResult<()> {
        match self.rule {
            ConnectionRule::Probabilistic => {
                if let Some(p) = self.single("probability") {
                    if !(0.0..=1.0).contains(&p) {
                        return Err(NetworkError::invalid(
                            context,
                            format!("probability {} is outside [0, 1]", p),
                        ));
                    }
                }
            }
            ConnectionRule::RandomFanIn | ConnectionRule::RandomFanOut => {
                if let Some(n) = self.single("number") {
                    if n < 0.0 || n.fract() != 0.0 {
                        return Err(NetworkError::invalid(
                            context,
                            format!("number {} is not a count", n),
                        ));
                    }
                }
            }
            ConnectionRule::Explicit => {
                let sources = self.array("source_indices");
                let destinations = self.array("destination_indices");
                match (sources, destinations) {
                    (Some(s), Some(d)) if s.len() == d.len() => {}
                    (Some(s), Some(d)) => {
                        return Err(NetworkError::invalid(
                            context,
                            format!("{} source indices but {} destination indices", s.len(), d.len()),
                        ))
                    }
                    _ => {
                        return Err(NetworkError::invalid(
                            context,
                            "explicit indices must be arrays",
                        ))
                    }
                }
            }
            ConnectionRule::AllToAll | ConnectionRule::OneToOne => {}
        }
        Ok(())
    }

    fn single(&self, name: &str) -> Option<f64> {
        self.properties.get(name).and_then(|q| q.value.as_single())
    }

    fn array(&self, name: &str) -> Option<&[f64]> {
        match self.properties.get(name).map(|q| &q.value) {
            Some(Value::Array(values)) => Some(values),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self) -> ConnectionRule {
        self.rule
    }

    pub fn property(&self, name: &str) -> Option<&Quantity> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &BTreeMap<String, Quantity> {
        &self.properties
    }
}

/// A rule applied between a source of `source_size` and a destination of
/// `destination_size` cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connectivity {
    pub rule_properties: ConnectionRuleProperties,
    pub source_size: usize,
    pub destination_size: usize,
    /// Set on reverse (synapse to pre-synaptic cell) connectivity, whose
    /// source and destination are swapped relative to the rule
    pub inverted: bool,
}

impl_find_mismatch!(
    Connectivity,
    |conn| format!("Connectivity({})", conn.rule_properties.name()),
    [rule_properties, source_size, destination_size, inverted]
);

impl Connectivity {
    pub fn new(
        rule_properties: ConnectionRuleProperties,
        source_size: usize,
        destination_size: usize,
    ) -> NetworkResult<Self> {
        let context = format!("connectivity '{}'", rule_properties.name());
        if source_size == 0 || destination_size == 0 {
            return Err(NetworkError::invalid(context, "sizes must be positive"));
        }
        if rule_properties.rule() == ConnectionRule::OneToOne && source_size != destination_size {
            return Err(NetworkError::invalid(
                context,
                format!(
                    "one-to-one needs equal sizes, got {} and {}",
                    source_size, destination_size
                ),
            ));
        }
        if let Some(indices) = rule_properties.array("source_indices") {
            if indices.iter().any(|i| *i < 0.0 || *i >= source_size as f64) {
                return Err(NetworkError::invalid(context, "source index out of range"));
            }
        }
        if let Some(indices) = rule_properties.array("destination_indices") {
            if indices.iter().any(|i| *i < 0.0 || *i >= destination_size as f64) {
                return Err(NetworkError::invalid(context, "destination index out of range"));
            }
        }
        Ok(Self {
            rule_properties,
            source_size,
            destination_size,
            inverted: false,
        })
    }

    /// The same connections seen from the destination side
    pub fn inverse(&self) -> Self {
        Self {
            rule_properties: self.rule_properties.clone(),
            source_size: self.destination_size,
            destination_size: self.source_size,
            inverted: !self.inverted,
        }
    }
}
