// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use ninefold_dynamics::{Dimension, DynamicsError};

/// Errors raised while assembling or flattening a network
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetworkError {
    #[error("Reference error in {context}: '{name}' is not defined")]
    Reference { context: String, name: String },

    #[error("Kind mismatch in {context}: {detail}")]
    KindMismatch { context: String, detail: String },

    #[error("Naming collision in {context}: '{name}' is defined more than once")]
    NamingCollision { context: String, name: String },

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    Dimension {
        context: String,
        expected: Dimension,
        actual: Dimension,
    },

    #[error("Invalid {context}: {detail}")]
    Invalid { context: String, detail: String },

    #[error(transparent)]
    Dynamics(#[from] DynamicsError),
}

pub type NetworkResult<T> = Result<T, NetworkError>;

impl NetworkError {
    pub(crate) fn reference(context: impl Into<String>, name: impl Into<String>) -> Self {
        NetworkError::Reference {
            context: context.into(),
            name: name.into(),
        }
    }

    pub(crate) fn kind_mismatch(context: impl Into<String>, detail: impl Into<String>) -> Self {
        NetworkError::KindMismatch {
            context: context.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn collision(context: impl Into<String>, name: impl Into<String>) -> Self {
        NetworkError::NamingCollision {
            context: context.into(),
            name: name.into(),
        }
    }

    pub(crate) fn invalid(context: impl Into<String>, detail: impl Into<String>) -> Self {
        NetworkError::Invalid {
            context: context.into(),
            detail: detail.into(),
        }
    }
}
