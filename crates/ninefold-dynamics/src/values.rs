// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Property values: single numbers, explicit arrays, or random distributions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A random distribution bound to its parameters
///
/// The distribution itself is identified by name (e.g. `NormalDistribution`);
/// sampling is done by the backend when connections or cells are instantiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomDistributionProperties {
    pub name: String,
    pub distribution: String,
    pub properties: BTreeMap<String, f64>,
}

impl RandomDistributionProperties {
    pub fn new<I, S>(name: impl Into<String>, distribution: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            distribution: distribution.into(),
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }
    }

    pub fn property(&self, name: &str) -> Option<f64> {
        self.properties.get(name).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Single(f64),
    Array(Vec<f64>),
    Random(RandomDistributionProperties),
}

impl Value {
    /// Single values are shared by every instance; the others vary per instance
    pub fn is_single(&self) -> bool {
        matches!(self, Value::Single(_))
    }

    pub fn as_single(&self) -> Option<f64> {
        match self {
            Value::Single(v) => Some(*v),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Single(_) => "single",
            Value::Array(_) => "array",
            Value::Random(_) => "random",
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Single(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::Array(values)
    }
}

impl From<RandomDistributionProperties> for Value {
    fn from(random: RandomDistributionProperties) -> Self {
        Value::Random(random)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Single(v) => write!(f, "{}", v),
            Value::Array(values) => write!(f, "array[{}]", values.len()),
            Value::Random(random) => write!(f, "{}({})", random.distribution, random.name),
        }
    }
}

crate::impl_leaf_mismatch!(RandomDistributionProperties, Value);
