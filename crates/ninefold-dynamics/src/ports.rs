// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Analog and event ports

use crate::expression::BinaryOperator;
use crate::units::Dimension;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix appended to the outer name of an exposed reduce port
pub const REDUCE_SUFFIX: &str = "reduce";

/// Join a symbol with the namespace it is moved into (`weight` + `pls` -> `weight__pls`)
pub fn namespace(name: &str, ns: &str) -> String {
    format!("{}__{}", name, ns)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReduceOperator {
    Add,
    Multiply,
}

impl ReduceOperator {
    /// Value a reduce port takes when nothing is connected to it
    pub fn identity(&self) -> f64 {
        match self {
            ReduceOperator::Add => 0.0,
            ReduceOperator::Multiply => 1.0,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ReduceOperator::Add => "+",
            ReduceOperator::Multiply => "*",
        }
    }

    pub fn binary_operator(&self) -> BinaryOperator {
        match self {
            ReduceOperator::Add => BinaryOperator::Add,
            ReduceOperator::Multiply => BinaryOperator::Multiply,
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(ReduceOperator::Add),
            "*" => Some(ReduceOperator::Multiply),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Communication {
    Analog,
    Event,
}

impl fmt::Display for Communication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Communication::Analog => write!(f, "analog"),
            Communication::Event => write!(f, "event"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    AnalogSend,
    AnalogReceive,
    AnalogReduce(ReduceOperator),
    EventSend,
    EventReceive,
}

impl PortKind {
    pub fn communication(&self) -> Communication {
        match self {
            PortKind::AnalogSend | PortKind::AnalogReceive | PortKind::AnalogReduce(_) => {
                Communication::Analog
            }
            PortKind::EventSend | PortKind::EventReceive => Communication::Event,
        }
    }

    pub fn is_send(&self) -> bool {
        matches!(self, PortKind::AnalogSend | PortKind::EventSend)
    }

    pub fn is_receive(&self) -> bool {
        !self.is_send()
    }

    /// Whether a connection from `self` into `receiver` is well formed
    pub fn can_send_to(&self, receiver: &PortKind) -> bool {
        match self {
            PortKind::AnalogSend => {
                matches!(receiver, PortKind::AnalogReceive | PortKind::AnalogReduce(_))
            }
            PortKind::EventSend => matches!(receiver, PortKind::EventReceive),
            _ => false,
        }
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::AnalogSend => write!(f, "analog send"),
            PortKind::AnalogReceive => write!(f, "analog receive"),
            PortKind::AnalogReduce(op) => write!(f, "analog reduce ({})", op.symbol()),
            PortKind::EventSend => write!(f, "event send"),
            PortKind::EventReceive => write!(f, "event receive"),
        }
    }
}

/// A named port; analog ports carry the dimension of the value they pass
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub kind: PortKind,
    pub dimension: Option<Dimension>,
}

impl Port {
    pub fn analog_send(name: impl Into<String>, dimension: Dimension) -> Self {
        Self::analog(name, PortKind::AnalogSend, dimension)
    }

    pub fn analog_receive(name: impl Into<String>, dimension: Dimension) -> Self {
        Self::analog(name, PortKind::AnalogReceive, dimension)
    }

    pub fn analog_reduce(
        name: impl Into<String>,
        dimension: Dimension,
        operator: ReduceOperator,
    ) -> Self {
        Self::analog(name, PortKind::AnalogReduce(operator), dimension)
    }

    pub fn event_send(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::EventSend,
            dimension: None,
        }
    }

    pub fn event_receive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::EventReceive,
            dimension: None,
        }
    }

    fn analog(name: impl Into<String>, kind: PortKind, dimension: Dimension) -> Self {
        Self {
            name: name.into(),
            kind,
            dimension: Some(dimension),
        }
    }

    pub fn communication(&self) -> Communication {
        self.kind.communication()
    }

    pub fn is_reduce(&self) -> bool {
        matches!(self.kind, PortKind::AnalogReduce(_))
    }

    /// Name the port takes when exposed from sub-component `sub`
    pub fn exposure_name(&self, sub: &str) -> String {
        let name = namespace(&self.name, sub);
        if self.is_reduce() {
            namespace(&name, REDUCE_SUFFIX)
        } else {
            name
        }
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: self.kind,
            dimension: self.dimension,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} port '{}'", self.kind, self.name)
    }
}

crate::impl_leaf_mismatch!(ReduceOperator, Communication, PortKind, Port);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_compatibility() {
        let reduce = PortKind::AnalogReduce(ReduceOperator::Add);
        assert!(PortKind::AnalogSend.can_send_to(&PortKind::AnalogReceive));
        assert!(PortKind::AnalogSend.can_send_to(&reduce));
        assert!(PortKind::EventSend.can_send_to(&PortKind::EventReceive));
        assert!(!PortKind::EventSend.can_send_to(&PortKind::AnalogReceive));
        assert!(!PortKind::AnalogReceive.can_send_to(&PortKind::AnalogReceive));
    }

    #[test]
    fn test_exposure_names() {
        let i_ext = Port::analog_reduce("i_ext", Dimension::CURRENT, ReduceOperator::Add);
        assert_eq!(i_ext.exposure_name("cell"), "i_ext__cell__reduce");
        assert_eq!(Port::event_send("spike").exposure_name("cell"), "spike__cell");
    }

    #[test]
    fn test_reduce_identity() {
        assert_eq!(ReduceOperator::Add.identity(), 0.0);
        assert_eq!(ReduceOperator::Multiply.identity(), 1.0);
        assert_eq!(ReduceOperator::from_symbol("+"), Some(ReduceOperator::Add));
    }
}
