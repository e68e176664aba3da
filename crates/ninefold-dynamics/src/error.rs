// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::expression::ExpressionError;
use crate::units::Dimension;

/// Errors raised while building or composing dynamics
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DynamicsError {
    #[error("Parse error in {context}: {source}")]
    Parse {
        context: String,
        source: ExpressionError,
    },

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

    #[error("Alias cycle in {context}: {}", .cycle.join(" -> "))]
    AliasCycle { context: String, cycle: Vec<String> },

    #[error("Invalid {context}: {detail}")]
    Invalid { context: String, detail: String },
}

pub type DynamicsResult<T> = Result<T, DynamicsError>;

impl DynamicsError {
    pub(crate) fn reference(context: impl Into<String>, name: impl Into<String>) -> Self {
        DynamicsError::Reference {
            context: context.into(),
            name: name.into(),
        }
    }

    pub(crate) fn kind_mismatch(context: impl Into<String>, detail: impl Into<String>) -> Self {
        DynamicsError::KindMismatch {
            context: context.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn collision(context: impl Into<String>, name: impl Into<String>) -> Self {
        DynamicsError::NamingCollision {
            context: context.into(),
            name: name.into(),
        }
    }

    pub(crate) fn invalid(context: impl Into<String>, detail: impl Into<String>) -> Self {
        DynamicsError::Invalid {
            context: context.into(),
            detail: detail.into(),
        }
    }
}
