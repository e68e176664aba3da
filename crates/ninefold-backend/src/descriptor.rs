// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Cell descriptors and the cache that builds them.

A [`CellDescriptor`] is everything a backend needs to generate or look up one
cell type: the flattened dynamics, its external ports and the name
translation. Building one means flattening a composite, so descriptors are
cached per factory under `(component name, source identity)`, where the
identity is an xxh64 digest of the definition and translation. Two factories
never share entries.
*/

use crate::error::{BackendError, BackendResult};
use crate::translation::TranslationTable;
use ahash::AHashMap;
use ninefold_dynamics::{Dynamics, DynamicsProperties, Port};
use ninefold_network::ComponentArray;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};
use xxhash_rust::xxh64::xxh64;

/// Seed of the identity digest; changing it invalidates persisted identities
const IDENTITY_SEED: u64 = 0x6e69_6e65_666f_6c64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellDescriptor {
    pub component_name: String,
    pub definition: Arc<Dynamics>,
    pub translations: TranslationTable,
    /// Digest of `definition` and `translations`
    pub source_identity: u64,
}

impl CellDescriptor {
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.definition.ports()
    }

    /// Backend name of a model-level name
    pub fn backend_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.translations.translate_or_keep(name)
    }
}

/// Digest of any serializable source
pub fn source_identity<T: Serialize + ?Sized>(source: &T, context: &str) -> BackendResult<u64> {
    let bytes = serde_json::to_vec(source).map_err(|source| BackendError::Serialization {
        context: context.to_string(),
        source,
    })?;
    Ok(xxh64(&bytes, IDENTITY_SEED))
}

type CacheKey = (String, u64);

/// Builds cell descriptors and keeps them for reuse
#[derive(Debug, Default)]
pub struct CellDescriptorFactory {
    cache: RwLock<AHashMap<CacheKey, Arc<CellDescriptor>>>,
}

impl CellDescriptorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for a flat dynamics
    ///
    /// Without a translation table every name is used as is.
    pub fn descriptor(
        &self,
        component_name: &str,
        definition: &Arc<Dynamics>,
        translations: Option<&TranslationTable>,
    ) -> BackendResult<Arc<CellDescriptor>> {
        let translations = translations.cloned().unwrap_or_default();
        let identity = source_identity(
            &(definition.as_ref(), &translations),
            &format!("cell '{}'", component_name),
        )?;
        let key = (component_name.to_string(), identity);

        if let Some(found) = self.cache.read().get(&key) {
            trace!(
                target: "ninefold-backend",
                "Descriptor cache hit for '{}' ({:016x})",
                component_name,
                identity
            );
            return Ok(Arc::clone(found));
        }

        translations.validate(definition)?;
        let descriptor = Arc::new(CellDescriptor {
            component_name: component_name.to_string(),
            definition: Arc::clone(definition),
            translations,
            source_identity: identity,
        });

        // Another caller may have built the same descriptor meanwhile
        let mut cache = self.cache.write();
        let entry = cache.entry(key).or_insert_with(|| Arc::clone(&descriptor));
        debug!(
            target: "ninefold-backend",
            "Built descriptor for '{}' ({} ports, identity {:016x})",
            component_name,
            entry.definition.ports().count(),
            identity
        );
        Ok(Arc::clone(entry))
    }

    /// Descriptor for a single cell's properties
    pub fn descriptor_for_properties(
        &self,
        properties: &DynamicsProperties,
        translations: Option<&TranslationTable>,
    ) -> BackendResult<Arc<CellDescriptor>> {
        self.descriptor(properties.name(), properties.definition(), translations)
    }

    /// Descriptor for a component array's merged cell
    ///
    /// Held synapses are not part of the cell; backends describe them on
    /// their own with [`descriptor`](Self::descriptor).
    pub fn descriptor_for_array(
        &self,
        array: &ComponentArray,
        translations: Option<&TranslationTable>,
    ) -> BackendResult<Arc<CellDescriptor>> {
        let props = array.dynamics_properties();
        let flat = props.flatten()?;
        self.descriptor(props.name(), flat.definition(), translations)
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }
}
