// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! A complete network description: populations, selections and projections

use crate::error::{NetworkError, NetworkResult};
use crate::population::{Population, Selection};
use crate::projection::{check_port_pair, Projection, ProjectionPortConnection, Role};
use ninefold_dynamics::{impl_find_mismatch, Port};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Deserialize)]
struct NetworkData {
    name: String,
    populations: BTreeMap<String, Population>,
    selections: BTreeMap<String, Selection>,
    projections: BTreeMap<String, Projection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NetworkData")]
pub struct Network {
    name: String,
    populations: BTreeMap<String, Population>,
    selections: BTreeMap<String, Selection>,
    projections: BTreeMap<String, Projection>,
}

impl_find_mismatch!(
    Network,
    |network| format!("Network({})", network.name),
    [name, populations, selections, projections]
);

impl TryFrom<NetworkData> for Network {
    type Error = NetworkError;

    fn try_from(data: NetworkData) -> Result<Self, Self::Error> {
        Network::new(
            data.name,
            data.populations.into_values(),
            data.selections.into_values(),
            data.projections.into_values(),
        )
    }
}

impl Network {
    pub fn new<P, S, J>(
        name: impl Into<String>,
        populations: P,
        selections: S,
        projections: J,
    ) -> NetworkResult<Self>
    where
        P: IntoIterator<Item = Population>,
        S: IntoIterator<Item = Selection>,
        J: IntoIterator<Item = Projection>,
    {
        let name = name.into();
        let context = format!("network '{}'", name);

        let mut network = Self {
            name,
            populations: BTreeMap::new(),
            selections: BTreeMap::new(),
            projections: BTreeMap::new(),
        };

        for population in populations {
            let key = population.name().to_string();
            if network.populations.contains_key(&key) {
                return Err(NetworkError::collision(&context, key));
            }
            network.populations.insert(key, population);
        }

        for selection in selections {
            let key = selection.name().to_string();
            if network.selections.contains_key(&key) || network.populations.contains_key(&key) {
                return Err(NetworkError::collision(&context, key));
            }
            if let Some(missing) = selection
                .populations()
                .iter()
                .find(|member| !network.populations.contains_key(*member))
            {
                return Err(NetworkError::reference(
                    format!("selection '{}' of {}", key, context),
                    missing,
                ));
            }
            network.selections.insert(key, selection);
        }

        for projection in projections {
            let key = projection.name().to_string();
            if network.projections.contains_key(&key) {
                return Err(NetworkError::collision(&context, key));
            }
            network.validate_projection(&projection, &context)?;
            network.projections.insert(key, projection);
        }

        debug!(
            target: "ninefold-network",
            "Assembled {}: {} populations, {} selections, {} projections",
            context,
            network.populations.len(),
            network.selections.len(),
            network.projections.len()
        );
        Ok(network)
    }

    fn validate_projection(&self, projection: &Projection, context: &str) -> NetworkResult<()> {
        let projection_context = format!("projection '{}' of {}", projection.name(), context);
        for (role, endpoint) in [(Role::Pre, projection.pre()), (Role::Post, projection.post())] {
            if self.members(endpoint).is_none() {
                return Err(NetworkError::reference(
                    format!("{} of {}", role, projection_context),
                    endpoint,
                ));
            }
        }
        for connection in projection.port_connections() {
            self.validate_cell_ports(projection, connection, &projection_context)?;
        }
        Ok(())
    }

    /// Check the pre/post ends of `connection` against every member cell
    fn validate_cell_ports(
        &self,
        projection: &Projection,
        connection: &ProjectionPortConnection,
        context: &str,
    ) -> NetworkResult<()> {
        let connection_context = format!("port connection {} of {}", connection, context);
        let ends = [
            (connection.sender_role, connection.send_port.as_str()),
            (connection.receiver_role, connection.receive_port.as_str()),
        ];
        // One port per end, taken from each member population in turn
        let lookup = |role: Role, port: &str, population: &Population| -> NetworkResult<Port> {
            population.cell().definition().port(port).cloned().ok_or_else(|| {
                NetworkError::reference(
                    format!("population '{}' in {}", population.name(), connection_context),
                    format!("{}.{}", role, port),
                )
            })
        };
        let other_end = |role: Role, port: &str| -> Option<Port> {
            projection
                .role_properties(role)
                .and_then(|props| props.definition().port(port).cloned())
        };

        for (index, (role, port_name)) in ends.iter().enumerate() {
            let endpoint = match role {
                Role::Pre => projection.pre(),
                Role::Post => projection.post(),
                _ => continue,
            };
            let is_sender = index == 0;
            let (other_role, other_port) = ends[1 - index];
            for population in self.members(endpoint).unwrap_or_default() {
                let port = lookup(*role, *port_name, population)?;
                let other = if other_role.is_synapse_side() {
                    other_end(other_role, other_port)
                } else {
                    // Direct pre <-> post wiring: check against the other cell
                    let other_endpoint = match other_role {
                        Role::Pre => projection.pre(),
                        _ => projection.post(),
                    };
                    self.members(other_endpoint)
                        .and_then(|members| members.first().copied())
                        .and_then(|p| p.cell().definition().port(other_port).cloned())
                };
                let Some(other) = other else {
                    continue;
                };
                if is_sender {
                    check_port_pair(&port, &other, &connection_context)?;
                } else {
                    check_port_pair(&other, &port, &connection_context)?;
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn populations(&self) -> impl Iterator<Item = &Population> {
        self.populations.values()
    }

    pub fn population(&self, name: &str) -> Option<&Population> {
        self.populations.get(name)
    }

    pub fn selections(&self) -> impl Iterator<Item = &Selection> {
        self.selections.values()
    }

    pub fn selection(&self, name: &str) -> Option<&Selection> {
        self.selections.get(name)
    }

    pub fn projections(&self) -> impl Iterator<Item = &Projection> {
        self.projections.values()
    }

    pub fn projection(&self, name: &str) -> Option<&Projection> {
        self.projections.get(name)
    }

    /// Populations behind a population or selection name
    pub fn members(&self, endpoint: &str) -> Option<Vec<&Population>> {
        if let Some(population) = self.populations.get(endpoint) {
            return Some(vec![population]);
        }
        self.selections.get(endpoint).map(|selection| {
            selection
                .populations()
                .iter()
                .filter_map(|name| self.populations.get(name))
                .collect()
        })
    }

    /// Total number of cells behind a population or selection name
    pub fn endpoint_size(&self, endpoint: &str) -> Option<usize> {
        self.members(endpoint)
            .map(|members| members.iter().map(|p| p.size()).sum())
    }

    /// Whether `population` is `endpoint` or a member of it
    pub fn includes(&self, endpoint: &str, population: &str) -> bool {
        endpoint == population
            || self
                .selections
                .get(endpoint)
                .map(|s| s.populations().iter().any(|p| p == population))
                .unwrap_or(false)
    }
}
