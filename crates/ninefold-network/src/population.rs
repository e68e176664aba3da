// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Populations of identical cells and named unions of them

use crate::error::{NetworkError, NetworkResult};
use ninefold_dynamics::{impl_find_mismatch, DynamicsProperties};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    name: String,
    size: usize,
    cell: DynamicsProperties,
}

impl_find_mismatch!(
    Population,
    |pop| format!("Population({})", pop.name),
    [name, size, cell]
);

impl Population {
    pub fn new(name: impl Into<String>, size: usize, cell: DynamicsProperties) -> NetworkResult<Self> {
        let name = name.into();
        if size == 0 {
            return Err(NetworkError::invalid(
                format!("population '{}'", name),
                "size must be positive",
            ));
        }
        Ok(Self { name, size, cell })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell(&self) -> &DynamicsProperties {
        &self.cell
    }
}

/// Concatenation of populations, addressable wherever a population is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    name: String,
    populations: Vec<String>,
}

ninefold_dynamics::impl_leaf_mismatch!(Selection);

impl Selection {
    pub fn new<I, S>(name: impl Into<String>, populations: I) -> NetworkResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let context = format!("selection '{}'", name);
        let mut members: Vec<String> = Vec::new();
        for population in populations {
            let population = population.into();
            if members.contains(&population) {
                return Err(NetworkError::collision(&context, population));
            }
            members.push(population);
        }
        if members.is_empty() {
            return Err(NetworkError::invalid(context, "at least one population is required"));
        }
        Ok(Self {
            name,
            populations: members,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member population names, in concatenation order
    pub fn populations(&self) -> &[String] {
        &self.populations
    }
}
