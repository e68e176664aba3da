// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! One pathway between two component arrays (or selections of them)

use crate::component_array::ComponentArray;
use crate::connectivity::Connectivity;
use crate::error::{NetworkError, NetworkResult};
use ninefold_dynamics::{impl_find_mismatch, Communication, Quantity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGroup {
    pub name: String,
    pub communication: Communication,
    /// Component array or selection name
    pub source: String,
    /// Component array or selection name
    pub destination: String,
    pub source_port: String,
    pub destination_port: String,
    pub connectivity: Connectivity,
    pub delay: Quantity,
}

impl_find_mismatch!(
    ConnectionGroup,
    |group| format!("ConnectionGroup({})", group.name),
    [
        name,
        communication,
        source,
        destination,
        source_port,
        destination_port,
        connectivity,
        delay
    ]
);

impl ConnectionGroup {
    /// Check both ports against every array behind each endpoint
    pub fn validate(
        &self,
        arrays: &BTreeMap<String, ComponentArray>,
        selections: &BTreeMap<String, BTreeSet<String>>,
    ) -> NetworkResult<()> {
        let context = format!("connection group '{}'", self.name);
        for (endpoint, port_name, sending) in [
            (&self.source, &self.source_port, true),
            (&self.destination, &self.destination_port, false),
        ] {
            let members: Vec<&str> = if arrays.contains_key(endpoint) {
                vec![endpoint.as_str()]
            } else if let Some(members) = selections.get(endpoint) {
                members.iter().map(String::as_str).collect()
            } else {
                return Err(NetworkError::reference(&context, endpoint));
            };
            for member in members {
                let port = arrays
                    .get(member)
                    .and_then(|array| array.port(port_name))
                    .ok_or_else(|| {
                        NetworkError::reference(&context, format!("{}.{}", member, port_name))
                    })?;
                if port.kind.is_send() != sending || port.communication() != self.communication {
                    return Err(NetworkError::kind_mismatch(
                        &context,
                        format!(
                            "{} of '{}' cannot {} {} connections",
                            port,
                            member,
                            if sending { "send" } else { "receive" },
                            self.communication
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}
