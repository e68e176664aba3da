// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Explicit name translation between a dynamics and a simulator.

Backends rarely use the names a model was written with; a hand-written
mechanism may call a membrane time constant `tau_m` where the model says
`tau__cell`. A [`TranslationTable`] records that mapping once, checks it
against the dynamics, and answers lookups in both directions.
*/

use crate::error::{BackendError, BackendResult};
use ahash::AHashMap;
use ninefold_dynamics::Dynamics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct TranslationTable {
    forward: BTreeMap<String, String>,
    #[serde(skip)]
    reverse: AHashMap<String, String>,
}

impl TryFrom<BTreeMap<String, String>> for TranslationTable {
    type Error = BackendError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        TranslationTable::new(map)
    }
}

impl From<TranslationTable> for BTreeMap<String, String> {
    fn from(table: TranslationTable) -> Self {
        table.forward
    }
}

impl TranslationTable {
    /// Build from `(model name, backend name)` pairs
    ///
    /// Both sides must be unique.
    pub fn new<I, A, B>(pairs: I) -> BackendResult<Self>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut table = Self::default();
        for (logical, backend) in pairs {
            let logical = logical.into();
            let backend = backend.into();
            if table.forward.contains_key(&logical) {
                return Err(BackendError::NamingCollision {
                    context: "translation table".to_string(),
                    name: logical,
                });
            }
            if table.reverse.contains_key(&backend) {
                return Err(BackendError::NamingCollision {
                    context: "translation table targets".to_string(),
                    name: backend,
                });
            }
            table.reverse.insert(backend.clone(), logical.clone());
            table.forward.insert(logical, backend);
        }
        Ok(table)
    }

    /// Every model name maps to itself
    pub fn identity(dynamics: &Dynamics) -> Self {
        let names = dynamics
            .parameters()
            .map(|p| p.name.clone())
            .chain(dynamics.state_variables().map(|s| s.name.clone()))
            .chain(dynamics.ports().map(|p| p.name.clone()));
        let mut table = Self::default();
        for name in names {
            table.reverse.insert(name.clone(), name.clone());
            table.forward.insert(name.clone(), name);
        }
        table
    }

    /// Check that every model name exists in `dynamics`
    pub fn validate(&self, dynamics: &Dynamics) -> BackendResult<()> {
        for logical in self.forward.keys() {
            if !dynamics.defines_symbol(logical) && dynamics.port(logical).is_none() {
                return Err(BackendError::UnknownName {
                    context: "translation table".to_string(),
                    name: logical.clone(),
                    dynamics: dynamics.name().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, logical: &str) -> Option<&str> {
        self.forward.get(logical).map(String::as_str)
    }

    /// Backend name of `logical`, which must have a translation
    pub fn translate(&self, logical: &str) -> BackendResult<&str> {
        self.get(logical).ok_or_else(|| BackendError::Untranslated {
            context: "translation table".to_string(),
            name: logical.to_string(),
        })
    }

    /// Model name behind a backend name
    pub fn reverse(&self, backend: &str) -> Option<&str> {
        self.reverse.get(backend).map(String::as_str)
    }

    /// Backend name if there is one, otherwise the model name unchanged
    pub fn translate_or_keep<'a>(&'a self, logical: &'a str) -> &'a str {
        self.get(logical).unwrap_or(logical)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ninefold_dynamics::{Dimension, RegimeBuilder, TransitionBuilder};

    fn leaky() -> Dynamics {
        Dynamics::builder("Leaky")
            .state_variable("v", Dimension::VOLTAGE)
            .regime(
                RegimeBuilder::new("R")
                    .time_derivative("v", "-v/tau")
                    .transition(TransitionBuilder::on_condition("v > th").emit("spike")),
            )
            .parameter("tau", Dimension::TIME)
            .parameter("th", Dimension::VOLTAGE)
            .build()
            .unwrap()
    }

    #[test]
    fn test_lookups_both_ways() {
        let table = TranslationTable::new([("tau", "tau_m"), ("v", "v_m")]).unwrap();
        assert_eq!(table.translate("tau").unwrap(), "tau_m");
        assert_eq!(table.reverse("v_m"), Some("v"));
        assert_eq!(table.translate_or_keep("th"), "th");
        assert!(matches!(
            table.translate("th"),
            Err(BackendError::Untranslated { ref name, .. }) if name == "th"
        ));
        table.validate(&leaky()).unwrap();
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let err = TranslationTable::new([("tau", "x"), ("th", "x")]).unwrap_err();
        assert!(matches!(err, BackendError::NamingCollision { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_unknown_model_name() {
        let table = TranslationTable::new([("gbar", "gnabar")]).unwrap();
        let err = table.validate(&leaky()).unwrap_err();
        assert!(matches!(err, BackendError::UnknownName { ref name, .. } if name == "gbar"));
    }

    #[test]
    fn test_identity_covers_ports() {
        let table = TranslationTable::identity(&leaky());
        assert_eq!(table.get("spike"), Some("spike"));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_serde_rebuilds_reverse_index() {
        let table = TranslationTable::new([("tau", "tau_m")]).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"tau":"tau_m"}"#);
        let restored: TranslationTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.reverse("tau_m"), Some("tau"));
        assert_eq!(restored, table);
    }
}
