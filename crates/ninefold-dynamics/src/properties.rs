// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! A dynamics definition bound to concrete parameter values

use crate::dynamics::Dynamics;
use crate::error::{DynamicsError, DynamicsResult};
use crate::units::Quantity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub quantity: Quantity,
}

impl Property {
    pub fn new(name: impl Into<String>, quantity: impl Into<Quantity>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
        }
    }
}

#[derive(Deserialize)]
struct DynamicsPropertiesData {
    name: String,
    definition: Arc<Dynamics>,
    properties: BTreeMap<String, Quantity>,
}

/// [`Dynamics`] plus one property per declared parameter
///
/// The definition is shared through an `Arc`, so cloning properties never
/// copies the underlying model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DynamicsPropertiesData")]
pub struct DynamicsProperties {
    name: String,
    definition: Arc<Dynamics>,
    properties: BTreeMap<String, Quantity>,
}

crate::impl_leaf_mismatch!(Property);

crate::impl_find_mismatch!(
    DynamicsProperties,
    |props| format!("DynamicsProperties({})", props.name),
    [name, definition, properties]
);

impl TryFrom<DynamicsPropertiesData> for DynamicsProperties {
    type Error = DynamicsError;

    fn try_from(data: DynamicsPropertiesData) -> Result<Self, Self::Error> {
        DynamicsProperties::new(data.name, data.definition, data.properties)
    }
}

impl DynamicsProperties {
    /// Bind `properties` to `definition`
    ///
    /// Every parameter needs exactly one property whose units have the
    /// parameter's dimension.
    pub fn new<I, S, Q>(
        name: impl Into<String>,
        definition: impl Into<Arc<Dynamics>>,
        properties: I,
    ) -> DynamicsResult<Self>
    where
        I: IntoIterator<Item = (S, Q)>,
        S: Into<String>,
        Q: Into<Quantity>,
    {
        let name = name.into();
        let definition = definition.into();
        let context = format!("properties '{}' of dynamics '{}'", name, definition.name());

        let mut bound = BTreeMap::new();
        for (property, quantity) in properties {
            let property = property.into();
            let quantity = quantity.into();
            let Some(parameter) = definition.parameter(&property) else {
                return Err(DynamicsError::reference(&context, property));
            };
            if quantity.dimension() != parameter.dimension {
                return Err(DynamicsError::Dimension {
                    context: format!("property '{}' of {}", property, context),
                    expected: parameter.dimension,
                    actual: quantity.dimension(),
                });
            }
            if bound.insert(property.clone(), quantity).is_some() {
                return Err(DynamicsError::collision(&context, property));
            }
        }

        if let Some(missing) = definition
            .parameters()
            .find(|p| !bound.contains_key(&p.name))
        {
            return Err(DynamicsError::invalid(
                context,
                format!("parameter '{}' has no property", missing.name),
            ));
        }

        Ok(Self {
            name,
            definition,
            properties: bound,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &Arc<Dynamics> {
        &self.definition
    }

    pub fn property(&self, name: &str) -> Option<&Quantity> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = Property> + '_ {
        self.properties.iter().map(|(name, quantity)| Property {
            name: name.clone(),
            quantity: quantity.clone(),
        })
    }

    pub fn property_map(&self) -> &BTreeMap<String, Quantity> {
        &self.properties
    }

    /// Parameters whose value is not shared by every instance
    pub fn varying_parameters(&self) -> impl Iterator<Item = &str> + '_ {
        self.properties
            .iter()
            .filter(|(_, quantity)| !quantity.is_single())
            .map(|(name, _)| name.as_str())
    }

    /// Same definition and values under another name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: Arc::clone(&self.definition),
            properties: self.properties.clone(),
        }
    }
}
