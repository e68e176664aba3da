// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Multi-dynamics composition.

A [`MultiDynamicsProperties`] wires several sub-components (plain
[`DynamicsProperties`] or nested composites) together through port
connections, and promotes selected inner ports to outer ports named
`<port>__<sub_component>`. Exposed reduce ports get an extra `__reduce`
suffix, because the composite keeps an accumulating alias under the plain
`<port>__<sub_component>` name.

All collections are ordered, so composing the same parts in any order yields
structurally equal values.
*/

mod flatten;

use crate::error::{DynamicsError, DynamicsResult};
use crate::{impl_find_mismatch, impl_leaf_mismatch};
use crate::mismatch::{FindMismatch, Mismatch};
use crate::ports::{Communication, Port, PortKind};
use crate::properties::DynamicsProperties;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// A sub-component of a composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubComponentProperties {
    Dynamics(DynamicsProperties),
    Multi(Box<MultiDynamicsProperties>),
}

impl SubComponentProperties {
    pub fn name(&self) -> &str {
        match self {
            SubComponentProperties::Dynamics(props) => props.name(),
            SubComponentProperties::Multi(multi) => multi.name(),
        }
    }

    pub fn port(&self, name: &str) -> Option<Port> {
        match self {
            SubComponentProperties::Dynamics(props) => props.definition().port(name).cloned(),
            SubComponentProperties::Multi(multi) => multi.port(name),
        }
    }

    pub fn ports(&self) -> Vec<Port> {
        match self {
            SubComponentProperties::Dynamics(props) => {
                props.definition().ports().cloned().collect()
            }
            SubComponentProperties::Multi(multi) => multi.ports(),
        }
    }

    /// The single flat dynamics this sub-component stands for
    pub fn flatten(&self) -> DynamicsResult<Cow<'_, DynamicsProperties>> {
        match self {
            SubComponentProperties::Dynamics(props) => Ok(Cow::Borrowed(props)),
            SubComponentProperties::Multi(multi) => multi.flatten().map(Cow::Owned),
        }
    }

    pub fn as_multi(&self) -> Option<&MultiDynamicsProperties> {
        match self {
            SubComponentProperties::Multi(multi) => Some(multi),
            SubComponentProperties::Dynamics(_) => None,
        }
    }
}

impl From<DynamicsProperties> for SubComponentProperties {
    fn from(props: DynamicsProperties) -> Self {
        SubComponentProperties::Dynamics(props)
    }
}

impl From<MultiDynamicsProperties> for SubComponentProperties {
    fn from(multi: MultiDynamicsProperties) -> Self {
        SubComponentProperties::Multi(Box::new(multi))
    }
}

impl FindMismatch for SubComponentProperties {
    fn find_mismatch(&self, other: &Self) -> Option<Mismatch> {
        match (self, other) {
            (SubComponentProperties::Dynamics(a), SubComponentProperties::Dynamics(b)) => {
                a.find_mismatch(b)
            }
            (SubComponentProperties::Multi(a), SubComponentProperties::Multi(b)) => {
                a.find_mismatch(b)
            }
            _ => Some(Mismatch::new(format!(
                "sub-component '{}' is a {} on the left but a {} on the right",
                self.name(),
                kind_label(self),
                kind_label(other)
            ))),
        }
    }

    fn nested_mismatch(&self, other: &Self) -> Option<Mismatch> {
        match (self, other) {
            (SubComponentProperties::Dynamics(a), SubComponentProperties::Dynamics(b)) => {
                a.nested_mismatch(b)
            }
            (SubComponentProperties::Multi(a), SubComponentProperties::Multi(b)) => {
                a.nested_mismatch(b)
            }
            _ => self.find_mismatch(other),
        }
    }
}

fn kind_label(sub: &SubComponentProperties) -> &'static str {
    match sub {
        SubComponentProperties::Dynamics(_) => "dynamics",
        SubComponentProperties::Multi(_) => "multi-dynamics",
    }
}

/// `(sender, send_port) -> (receiver, receive_port)` between sub-components
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortConnection {
    pub sender: String,
    pub send_port: String,
    pub receiver: String,
    pub receive_port: String,
}

impl PortConnection {
    pub fn new(
        sender: impl Into<String>,
        send_port: impl Into<String>,
        receiver: impl Into<String>,
        receive_port: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            send_port: send_port.into(),
            receiver: receiver.into(),
            receive_port: receive_port.into(),
        }
    }
}

impl<A, B, C, D> From<(A, B, C, D)> for PortConnection
where
    A: Into<String>,
    B: Into<String>,
    C: Into<String>,
    D: Into<String>,
{
    fn from((sender, send_port, receiver, receive_port): (A, B, C, D)) -> Self {
        PortConnection::new(sender, send_port, receiver, receive_port)
    }
}

/// An inner port promoted to the composite's interface
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortExposure {
    pub sub_component: String,
    /// The port as declared by the sub-component
    pub port: Port,
}

impl PortExposure {
    pub fn name(&self) -> String {
        self.port.exposure_name(&self.sub_component)
    }

    pub fn outer_port(&self) -> Port {
        self.port.renamed(self.name())
    }
}

#[derive(Deserialize)]
struct MultiDynamicsData {
    name: String,
    sub_components: BTreeMap<String, SubComponentProperties>,
    port_connections: BTreeSet<PortConnection>,
    port_exposures: BTreeMap<String, PortExposure>,
}

/// Several dynamics wired together into one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MultiDynamicsData")]
pub struct MultiDynamicsProperties {
    name: String,
    sub_components: BTreeMap<String, SubComponentProperties>,
    port_connections: BTreeSet<PortConnection>,
    /// Keyed by outer port name
    port_exposures: BTreeMap<String, PortExposure>,
}

impl_find_mismatch!(
    MultiDynamicsProperties,
    |multi| format!("MultiDynamicsProperties({})", multi.name),
    [name, sub_components, port_connections, port_exposures]
);

impl_leaf_mismatch!(PortConnection, PortExposure);

impl TryFrom<MultiDynamicsData> for MultiDynamicsProperties {
    type Error = DynamicsError;

    fn try_from(data: MultiDynamicsData) -> Result<Self, Self::Error> {
        let exposures: Vec<(String, String)> = data
            .port_exposures
            .into_values()
            .map(|e| (e.sub_component, e.port.name))
            .collect();
        MultiDynamicsProperties::compose(
            data.name,
            data.sub_components,
            data.port_connections,
            exposures,
        )
    }
}

impl MultiDynamicsProperties {
    /// Validate and assemble a composite
    ///
    /// `port_exposures` lists `(sub_component, port)` pairs. The result is
    /// also flattened once, which surfaces alias cycles created through the
    /// connections and analog receive ports left without a source.
    pub fn compose<I, S, C, E, A, B>(
        name: impl Into<String>,
        sub_components: I,
        port_connections: C,
        port_exposures: E,
    ) -> DynamicsResult<Self>
    where
        I: IntoIterator<Item = (S, SubComponentProperties)>,
        S: Into<String>,
        C: IntoIterator,
        C::Item: Into<PortConnection>,
        E: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let name = name.into();
        let context = format!("multi-dynamics '{}'", name);

        let mut subs = BTreeMap::new();
        for (sub_name, sub) in sub_components {
            let sub_name = sub_name.into();
            if subs.contains_key(&sub_name) {
                return Err(DynamicsError::collision(&context, sub_name));
            }
            subs.insert(sub_name, sub);
        }

        let mut connections = BTreeSet::new();
        for connection in port_connections {
            let connection = connection.into();
            validate_connection(&subs, &connection, &context)?;
            if connections.contains(&connection) {
                return Err(DynamicsError::collision(
                    &context,
                    format!(
                        "{}.{} -> {}.{}",
                        connection.sender,
                        connection.send_port,
                        connection.receiver,
                        connection.receive_port
                    ),
                ));
            }
            connections.insert(connection);
        }
        check_single_sources(&subs, &connections, &context)?;

        let mut exposures = BTreeMap::new();
        for (sub_name, port_name) in port_exposures {
            let sub_name = sub_name.into();
            let port_name = port_name.into();
            let exposure_context = format!("port exposure of {}", context);
            let sub = subs
                .get(&sub_name)
                .ok_or_else(|| DynamicsError::reference(&exposure_context, &sub_name))?;
            let port = sub.port(&port_name).ok_or_else(|| {
                DynamicsError::reference(
                    &exposure_context,
                    format!("{}.{}", sub_name, port_name),
                )
            })?;
            if port.kind == PortKind::AnalogReceive
                && connections
                    .iter()
                    .any(|c| c.receiver == sub_name && c.receive_port == port_name)
            {
                return Err(DynamicsError::invalid(
                    &context,
                    format!(
                        "analog receive port '{}.{}' is both connected and exposed",
                        sub_name, port_name
                    ),
                ));
            }
            let exposure = PortExposure {
                sub_component: sub_name,
                port,
            };
            let outer_name = exposure.name();
            if exposures.contains_key(&outer_name) {
                return Err(DynamicsError::collision(&context, outer_name));
            }
            exposures.insert(outer_name, exposure);
        }

        let multi = Self {
            name,
            sub_components: subs,
            port_connections: connections,
            port_exposures: exposures,
        };
        multi.flatten()?;
        trace!(
            target: "ninefold-dynamics",
            "Composed '{}' from {} sub-components",
            multi.name,
            multi.sub_components.len()
        );
        Ok(multi)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sub_components(&self) -> &BTreeMap<String, SubComponentProperties> {
        &self.sub_components
    }

    pub fn sub_component(&self, name: &str) -> Option<&SubComponentProperties> {
        self.sub_components.get(name)
    }

    pub fn port_connections(&self) -> &BTreeSet<PortConnection> {
        &self.port_connections
    }

    pub fn port_exposures(&self) -> impl Iterator<Item = &PortExposure> {
        self.port_exposures.values()
    }

    pub fn exposure(&self, outer_name: &str) -> Option<&PortExposure> {
        self.port_exposures.get(outer_name)
    }

    /// Outer ports, one per exposure
    pub fn ports(&self) -> Vec<Port> {
        self.port_exposures.values().map(PortExposure::outer_port).collect()
    }

    pub fn port(&self, name: &str) -> Option<Port> {
        self.port_exposures.get(name).map(PortExposure::outer_port)
    }

    /// Connections feeding `receiver.receive_port`
    pub fn sources_of<'a>(
        &'a self,
        receiver: &'a str,
        receive_port: &'a str,
    ) -> impl Iterator<Item = &'a PortConnection> + 'a {
        self.port_connections
            .iter()
            .filter(move |c| c.receiver == receiver && c.receive_port == receive_port)
    }

    /// Whether the flattened dynamics is linear
    pub fn is_linear(&self) -> DynamicsResult<bool> {
        Ok(self.flatten()?.definition().is_linear())
    }

    /// Same composite under another name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

fn validate_connection(
    subs: &BTreeMap<String, SubComponentProperties>,
    connection: &PortConnection,
    context: &str,
) -> DynamicsResult<()> {
    let connection_context = format!(
        "port connection {}.{} -> {}.{} of {}",
        connection.sender,
        connection.send_port,
        connection.receiver,
        connection.receive_port,
        context
    );
    let lookup = |sub_name: &str, port_name: &str| -> DynamicsResult<Port> {
        let sub = subs
            .get(sub_name)
            .ok_or_else(|| DynamicsError::reference(&connection_context, sub_name))?;
        sub.port(port_name).ok_or_else(|| {
            DynamicsError::reference(&connection_context, format!("{}.{}", sub_name, port_name))
        })
    };
    let send = lookup(&connection.sender, &connection.send_port)?;
    let receive = lookup(&connection.receiver, &connection.receive_port)?;

    if !send.kind.can_send_to(&receive.kind) {
        return Err(DynamicsError::kind_mismatch(
            connection_context,
            format!("cannot connect {} to {}", send, receive),
        ));
    }
    if send.communication() == Communication::Analog {
        if let (Some(expected), Some(actual)) = (receive.dimension, send.dimension) {
            if expected != actual {
                return Err(DynamicsError::Dimension {
                    context: connection_context,
                    expected,
                    actual,
                });
            }
        }
    }
    Ok(())
}

fn check_single_sources(
    subs: &BTreeMap<String, SubComponentProperties>,
    connections: &BTreeSet<PortConnection>,
    context: &str,
) -> DynamicsResult<()> {
    let mut sources: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for connection in connections {
        *sources
            .entry((connection.receiver.as_str(), connection.receive_port.as_str()))
            .or_default() += 1;
    }
    for ((receiver, port_name), count) in sources {
        if count < 2 {
            continue;
        }
        let kind = subs
            .get(receiver)
            .and_then(|sub| sub.port(port_name))
            .map(|port| port.kind);
        if kind == Some(PortKind::AnalogReceive) {
            return Err(DynamicsError::kind_mismatch(
                context,
                format!(
                    "analog receive port '{}.{}' has {} sources; only reduce ports accept several",
                    receiver, port_name, count
                ),
            ));
        }
    }
    Ok(())
}
