// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::context::SimulationState;
use ninefold_dynamics::DynamicsError;
use ninefold_network::NetworkError;

/// Errors raised by backend support code
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("No translation for '{name}' in {context}")]
    Untranslated { context: String, name: String },

    #[error("Translation '{name}' in {context} does not name anything in dynamics '{dynamics}'")]
    UnknownName {
        context: String,
        name: String,
        dynamics: String,
    },

    #[error("Naming collision in {context}: '{name}' is used more than once")]
    NamingCollision { context: String, name: String },

    #[error("Cannot {action} a simulation that is {state}")]
    Lifecycle {
        action: &'static str,
        state: SimulationState,
    },

    #[error("Invalid {context}: {detail}")]
    Invalid { context: String, detail: String },

    #[error("Failed to serialize {context}: {source}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Dynamics(#[from] DynamicsError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

pub type BackendResult<T> = Result<T, BackendError>;
