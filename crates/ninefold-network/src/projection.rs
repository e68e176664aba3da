// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Projections: directed links between populations.

A projection bundles a response dynamics, an optional plasticity dynamics, a
connection rule and a delay, plus explicit port wiring between four roles:
the pre-synaptic cell, the post-synaptic cell, the response and the plasticity.
Ports on the response and plasticity are checked here; ports on the cells are
checked by [`Network`](crate::Network), which knows the populations.
*/

use crate::connectivity::ConnectionRuleProperties;
use crate::error::{NetworkError, NetworkResult};
use ninefold_dynamics::{impl_find_mismatch, impl_leaf_mismatch};
use ninefold_dynamics::{
    Communication, Dimension, DynamicsProperties, Port, PortKind, Quantity,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Sub-component name of the response inside a synapse composite
pub const RESPONSE_SUB_COMPONENT: &str = "psr";
/// Sub-component name of the plasticity inside a synapse composite
pub const PLASTICITY_SUB_COMPONENT: &str = "pls";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Pre,
    Post,
    Response,
    Plasticity,
    /// Response and plasticity merged; only appears after flattening
    Synapse,
}

impl Role {
    /// Whether ports of this role live on the synapse rather than on a cell
    pub fn is_synapse_side(&self) -> bool {
        matches!(self, Role::Response | Role::Plasticity | Role::Synapse)
    }

    /// Name of the role inside the synapse composite, if it has one
    pub fn sub_component(&self) -> Option<&'static str> {
        match self {
            Role::Response => Some(RESPONSE_SUB_COMPONENT),
            Role::Plasticity => Some(PLASTICITY_SUB_COMPONENT),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Pre => "pre",
            Role::Post => "post",
            Role::Response => "response",
            Role::Plasticity => "plasticity",
            Role::Synapse => "synapse",
        };
        write!(f, "{}", name)
    }
}

/// `(sender_role, send_port) -> (receiver_role, receive_port)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectionPortConnection {
    pub sender_role: Role,
    pub send_port: String,
    pub receiver_role: Role,
    pub receive_port: String,
}

impl ProjectionPortConnection {
    pub fn new(
        sender_role: Role,
        send_port: impl Into<String>,
        receiver_role: Role,
        receive_port: impl Into<String>,
    ) -> Self {
        Self {
            sender_role,
            send_port: send_port.into(),
            receiver_role,
            receive_port: receive_port.into(),
        }
    }

    /// Whether either end is the pre-synaptic cell
    pub fn involves_pre(&self) -> bool {
        self.sender_role == Role::Pre || self.receiver_role == Role::Pre
    }
}

impl<A: Into<String>, B: Into<String>> From<(Role, A, Role, B)> for ProjectionPortConnection {
    fn from((sender_role, send_port, receiver_role, receive_port): (Role, A, Role, B)) -> Self {
        ProjectionPortConnection::new(sender_role, send_port, receiver_role, receive_port)
    }
}

impl fmt::Display for ProjectionPortConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.sender_role, self.send_port, self.receiver_role, self.receive_port
        )
    }
}

impl_leaf_mismatch!(Role, ProjectionPortConnection);

/// Check that `send` may drive `receive`
pub(crate) fn check_port_pair(send: &Port, receive: &Port, context: &str) -> NetworkResult<()> {
    if !send.kind.can_send_to(&receive.kind) {
        return Err(NetworkError::kind_mismatch(
            context,
            format!("cannot connect {} to {}", send, receive),
        ));
    }
    if send.communication() == Communication::Analog {
        if let (Some(expected), Some(actual)) = (receive.dimension, send.dimension) {
            if expected != actual {
                return Err(NetworkError::Dimension {
                    context: context.to_string(),
                    expected,
                    actual,
                });
            }
        }
    }
    Ok(())
}

#[derive(Deserialize)]
struct ProjectionData {
    name: String,
    pre: String,
    post: String,
    response: DynamicsProperties,
    plasticity: Option<DynamicsProperties>,
    connectivity: ConnectionRuleProperties,
    delay: Quantity,
    port_connections: BTreeSet<ProjectionPortConnection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProjectionData")]
pub struct Projection {
    name: String,
    /// Population or selection name
    pre: String,
    /// Population or selection name
    post: String,
    response: DynamicsProperties,
    plasticity: Option<DynamicsProperties>,
    connectivity: ConnectionRuleProperties,
    delay: Quantity,
    port_connections: BTreeSet<ProjectionPortConnection>,
}

impl_find_mismatch!(
    Projection,
    |proj| format!("Projection({})", proj.name),
    [
        name,
        pre,
        post,
        response,
        plasticity,
        connectivity,
        delay,
        port_connections
    ]
);

impl TryFrom<ProjectionData> for Projection {
    type Error = NetworkError;

    fn try_from(data: ProjectionData) -> Result<Self, Self::Error> {
        Projection::new(
            data.name,
            data.pre,
            data.post,
            data.response,
            data.plasticity,
            data.connectivity,
            data.delay,
            data.port_connections,
        )
    }
}

impl Projection {
    #[allow(clippy::too_many_arguments)]
    pub fn new<C>(
        name: impl Into<String>,
        pre: impl Into<String>,
        post: impl Into<String>,
        response: DynamicsProperties,
        plasticity: Option<DynamicsProperties>,
        connectivity: ConnectionRuleProperties,
        delay: Quantity,
        port_connections: C,
    ) -> NetworkResult<Self>
    where
        C: IntoIterator,
        C::Item: Into<ProjectionPortConnection>,
    {
        let name = name.into();
        let context = format!("projection '{}'", name);

        if delay.dimension() != Dimension::TIME {
            return Err(NetworkError::Dimension {
                context: format!("delay of {}", context),
                expected: Dimension::TIME,
                actual: delay.dimension(),
            });
        }
        match delay.value.as_single() {
            Some(d) if d >= 0.0 => {}
            _ => {
                return Err(NetworkError::invalid(
                    &context,
                    format!("delay {} must be a single non-negative value", delay),
                ))
            }
        }

        let mut projection = Self {
            name,
            pre: pre.into(),
            post: post.into(),
            response,
            plasticity,
            connectivity,
            delay,
            port_connections: BTreeSet::new(),
        };

        for connection in port_connections {
            let connection = connection.into();
            projection.validate_connection(&connection, &context)?;
            if projection.port_connections.contains(&connection) {
                return Err(NetworkError::collision(&context, connection.to_string()));
            }
            projection.port_connections.insert(connection);
        }
        Ok(projection)
    }

    fn validate_connection(
        &self,
        connection: &ProjectionPortConnection,
        context: &str,
    ) -> NetworkResult<()> {
        let connection_context = format!("port connection {} of {}", connection, context);
        if connection.sender_role == Role::Synapse || connection.receiver_role == Role::Synapse {
            return Err(NetworkError::invalid(
                connection_context,
                "the synapse role is reserved for flattened projections",
            ));
        }
        if connection.sender_role == connection.receiver_role {
            return Err(NetworkError::invalid(
                connection_context,
                "sender and receiver roles must differ",
            ));
        }

        let send = self.synapse_side_port(connection.sender_role, &connection.send_port, &connection_context)?;
        let receive =
            self.synapse_side_port(connection.receiver_role, &connection.receive_port, &connection_context)?;
        if let Some(send) = &send {
            if !send.kind.is_send() {
                return Err(NetworkError::kind_mismatch(
                    &connection_context,
                    format!("{} is not a send port", send),
                ));
            }
        }
        if let Some(receive) = &receive {
            if !receive.kind.is_receive() {
                return Err(NetworkError::kind_mismatch(
                    &connection_context,
                    format!("{} is not a receive port", receive),
                ));
            }
        }
        if let (Some(send), Some(receive)) = (send, receive) {
            check_port_pair(&send, &receive, &connection_context)?;
        }
        Ok(())
    }

    /// The port on the response or plasticity, `None` for cell roles
    fn synapse_side_port(
        &self,
        role: Role,
        port: &str,
        context: &str,
    ) -> NetworkResult<Option<Port>> {
        if !role.is_synapse_side() {
            return Ok(None);
        }
        let props = self
            .role_properties(role)
            .ok_or_else(|| NetworkError::reference(context, role.to_string()))?;
        props
            .definition()
            .port(port)
            .cloned()
            .map(Some)
            .ok_or_else(|| NetworkError::reference(context, format!("{}.{}", role, port)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pre(&self) -> &str {
        &self.pre
    }

    pub fn post(&self) -> &str {
        &self.post
    }

    pub fn response(&self) -> &DynamicsProperties {
        &self.response
    }

    pub fn plasticity(&self) -> Option<&DynamicsProperties> {
        self.plasticity.as_ref()
    }

    /// Response or plasticity properties behind a synapse-side role
    pub fn role_properties(&self, role: Role) -> Option<&DynamicsProperties> {
        match role {
            Role::Response => Some(&self.response),
            Role::Plasticity => self.plasticity.as_ref(),
            _ => None,
        }
    }

    pub fn connectivity(&self) -> &ConnectionRuleProperties {
        &self.connectivity
    }

    pub fn delay(&self) -> &Quantity {
        &self.delay
    }

    pub fn port_connections(&self) -> &BTreeSet<ProjectionPortConnection> {
        &self.port_connections
    }

    /// Connections with a given role at either end
    pub fn connections_with(&self, role: Role) -> impl Iterator<Item = &ProjectionPortConnection> {
        self.port_connections
            .iter()
            .filter(move |c| c.sender_role == role || c.receiver_role == role)
    }

    /// Whether the synapse drives the post cell through an analog port
    pub fn has_analog_input_to_post(&self) -> bool {
        self.port_connections.iter().any(|c| {
            c.receiver_role == Role::Post
                && c.sender_role.is_synapse_side()
                && self
                    .role_properties(c.sender_role)
                    .and_then(|p| p.definition().port(&c.send_port))
                    .map(|p| matches!(p.kind, PortKind::AnalogSend))
                    .unwrap_or(false)
        })
    }
}
