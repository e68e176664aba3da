// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Physical dimensions, units and quantities
//!
//! Only dimensional compatibility is checked here. Converting magnitudes
//! between unit systems is left to the backend adapters.

use crate::values::Value;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::ops::{Div, Mul};

/// Exponents of the seven SI base dimensions
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Dimension {
    /// Mass
    pub m: i8,
    /// Length
    pub l: i8,
    /// Time
    pub t: i8,
    /// Electric current
    pub i: i8,
    /// Amount of substance
    pub n: i8,
    /// Temperature
    pub k: i8,
    /// Luminous intensity
    pub j: i8,
}

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension::new(0, 0, 0, 0, 0, 0, 0);
    pub const TIME: Dimension = Dimension::new(0, 0, 1, 0, 0, 0, 0);
    pub const PER_TIME: Dimension = Dimension::new(0, 0, -1, 0, 0, 0, 0);
    pub const LENGTH: Dimension = Dimension::new(0, 1, 0, 0, 0, 0, 0);
    pub const CURRENT: Dimension = Dimension::new(0, 0, 0, 1, 0, 0, 0);
    pub const CHARGE: Dimension = Dimension::new(0, 0, 1, 1, 0, 0, 0);
    pub const VOLTAGE: Dimension = Dimension::new(1, 2, -3, -1, 0, 0, 0);
    pub const RESISTANCE: Dimension = Dimension::new(1, 2, -3, -2, 0, 0, 0);
    pub const CONDUCTANCE: Dimension = Dimension::new(-1, -2, 3, 2, 0, 0, 0);
    pub const CAPACITANCE: Dimension = Dimension::new(-1, -2, 4, 2, 0, 0, 0);
    pub const CONCENTRATION: Dimension = Dimension::new(0, -3, 0, 0, 1, 0, 0);
    pub const TEMPERATURE: Dimension = Dimension::new(0, 0, 0, 0, 0, 1, 0);

    pub const fn new(m: i8, l: i8, t: i8, i: i8, n: i8, k: i8, j: i8) -> Self {
        Self { m, l, t, i, n, k, j }
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::DIMENSIONLESS
    }

    /// Raise the dimension to an integer power
    pub fn powi(self, power: i8) -> Self {
        Self::new(
            self.m * power,
            self.l * power,
            self.t * power,
            self.i * power,
            self.n * power,
            self.k * power,
            self.j * power,
        )
    }

    fn exponents(&self) -> [(&'static str, i8); 7] {
        [
            ("m", self.m),
            ("l", self.l),
            ("t", self.t),
            ("i", self.i),
            ("n", self.n),
            ("k", self.k),
            ("j", self.j),
        ]
    }
}

impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Dimension) -> Dimension {
        Dimension::new(
            self.m + rhs.m,
            self.l + rhs.l,
            self.t + rhs.t,
            self.i + rhs.i,
            self.n + rhs.n,
            self.k + rhs.k,
            self.j + rhs.j,
        )
    }
}

impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Dimension) -> Dimension {
        self * rhs.powi(-1)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "dimensionless");
        }
        let parts: Vec<String> = self
            .exponents()
            .iter()
            .filter(|(_, exp)| *exp != 0)
            .map(|(sym, exp)| {
                if *exp == 1 {
                    sym.to_string()
                } else {
                    format!("{}^{}", sym, exp)
                }
            })
            .collect();
        write!(f, "{}", parts.join("*"))
    }
}

/// A named unit: a dimension scaled by a power of ten
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Unit {
    pub name: Cow<'static, str>,
    pub dimension: Dimension,
    pub power: i8,
}

impl Unit {
    pub const UNITLESS: Unit = Unit::fixed("unitless", Dimension::DIMENSIONLESS, 0);
    pub const S: Unit = Unit::fixed("s", Dimension::TIME, 0);
    pub const MS: Unit = Unit::fixed("ms", Dimension::TIME, -3);
    pub const HZ: Unit = Unit::fixed("Hz", Dimension::PER_TIME, 0);
    pub const V: Unit = Unit::fixed("V", Dimension::VOLTAGE, 0);
    pub const MV: Unit = Unit::fixed("mV", Dimension::VOLTAGE, -3);
    pub const A: Unit = Unit::fixed("A", Dimension::CURRENT, 0);
    pub const NA: Unit = Unit::fixed("nA", Dimension::CURRENT, -9);
    pub const PA: Unit = Unit::fixed("pA", Dimension::CURRENT, -12);
    pub const UF: Unit = Unit::fixed("uF", Dimension::CAPACITANCE, -6);
    pub const NF: Unit = Unit::fixed("nF", Dimension::CAPACITANCE, -9);
    pub const PF: Unit = Unit::fixed("pF", Dimension::CAPACITANCE, -12);
    pub const US: Unit = Unit::fixed("uS", Dimension::CONDUCTANCE, -6);
    pub const NS: Unit = Unit::fixed("nS", Dimension::CONDUCTANCE, -9);
    pub const MOHM: Unit = Unit::fixed("MOhm", Dimension::RESISTANCE, 6);
    pub const UM: Unit = Unit::fixed("um", Dimension::LENGTH, -6);
    pub const MM: Unit = Unit::fixed("mM", Dimension::CONCENTRATION, 0);

    const fn fixed(name: &'static str, dimension: Dimension, power: i8) -> Self {
        Self {
            name: Cow::Borrowed(name),
            dimension,
            power,
        }
    }

    pub fn new(name: impl Into<String>, dimension: Dimension, power: i8) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            dimension,
            power,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        Unit::new(
            format!("{}*{}", self.name, rhs.name),
            self.dimension * rhs.dimension,
            self.power + rhs.power,
        )
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit {
        Unit::new(
            format!("{}/{}", self.name, rhs.name),
            self.dimension / rhs.dimension,
            self.power - rhs.power,
        )
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A value paired with the unit it is expressed in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: Value,
    pub units: Unit,
}

impl Quantity {
    pub fn new(value: impl Into<Value>, units: Unit) -> Self {
        Self {
            value: value.into(),
            units,
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.units.dimension
    }

    /// True when every instance shares the same value
    pub fn is_single(&self) -> bool {
        self.value.is_single()
    }
}

impl From<f64> for Quantity {
    fn from(value: f64) -> Self {
        Quantity::new(value, Unit::UNITLESS)
    }
}

impl Mul<Unit> for f64 {
    type Output = Quantity;

    fn mul(self, rhs: Unit) -> Quantity {
        Quantity::new(self, rhs)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.units)
    }
}

crate::impl_leaf_mismatch!(Dimension, Unit, Quantity);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_dimensions() {
        assert_eq!(Dimension::CURRENT * Dimension::RESISTANCE, Dimension::VOLTAGE);
        assert_eq!(Dimension::CHARGE / Dimension::VOLTAGE, Dimension::CAPACITANCE);
        assert_eq!(
            Dimension::CONDUCTANCE,
            Dimension::DIMENSIONLESS / Dimension::RESISTANCE
        );
    }

    #[test]
    fn test_unit_products() {
        let unit = Unit::MS * Unit::MV;
        assert_eq!(unit.dimension, Dimension::TIME * Dimension::VOLTAGE);
        assert_eq!(unit.power, -6);
        assert_eq!(unit.name(), "ms*mV");
    }

    #[test]
    fn test_quantity_from_scalar() {
        let q = 1.5 * Unit::MS;
        assert_eq!(q.dimension(), Dimension::TIME);
        assert!(q.is_single());
        assert_eq!(Quantity::from(3.0).dimension(), Dimension::DIMENSIONLESS);
    }

    #[test]
    fn test_dimension_display() {
        assert_eq!(Dimension::DIMENSIONLESS.to_string(), "dimensionless");
        assert_eq!(Dimension::CURRENT.to_string(), "i");
        assert_eq!(Dimension::VOLTAGE.to_string(), "m*l^2*t^-3*i^-1");
    }
}
