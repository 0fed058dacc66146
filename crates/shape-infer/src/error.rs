// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for per-node inference.
//!
//! None of these abort a pass: the driver turns each one into a
//! [`crate::SkipRecord`] and moves on.

use tensor_meta::ShapeError;

/// Why a rule could not type a node's outputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferError {
    /// No rule is registered for the operator.
    #[error("no inference rule for '{domain}::{op_type}'")]
    NoRule { domain: String, op_type: String },

    /// A required input slot is empty.
    #[error("input {index} is missing")]
    MissingInput { index: usize },

    /// An input's rank is unknown, so nothing can be derived.
    #[error("rank of input {index} is unknown")]
    UnknownRank { index: usize },

    /// A required attribute is absent.
    #[error("attribute '{0}' is missing")]
    MissingAttribute(&'static str),

    /// An attribute or constant input has an unusable value.
    #[error("invalid '{name}': {detail}")]
    InvalidArgument { name: &'static str, detail: String },

    /// Input shapes are incompatible with the operator.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

impl InferError {
    pub(crate) fn invalid(name: &'static str, detail: impl Into<String>) -> Self {
        InferError::InvalidArgument {
            name,
            detail: detail.into(),
        }
    }
}
