// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model loading, graph construction and validation.

use std::path::PathBuf;

/// Errors that can occur while reading, building or writing a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model file could not be opened, mapped or written.
    #[error("cannot access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes do not form a well-formed model.
    #[error("failed to deserialize model: {0}")]
    Deserialization(String),

    /// A node or graph output refers to a value nothing produces.
    #[error("node '{node}' references unresolved value '{value}'")]
    UnresolvedReference { node: String, value: String },

    /// The producer/consumer relation contains a cycle.
    #[error("graph contains a cycle through value '{value}'")]
    CyclicGraph { value: String },
}

/// A structural rule the model violates. Always fatal for that model.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// A name appears more than once in a list that requires uniqueness.
    #[error("duplicate {list} name '{name}'")]
    DuplicateName { list: &'static str, name: String },

    /// A node output re-assigns a value that already has a producer.
    #[error("node '{node}' output '{name}' collides with {existing}")]
    DuplicateProducer {
        node: String,
        name: String,
        existing: &'static str,
    },

    /// Dangling reference or cycle detected on re-check.
    #[error(transparent)]
    Structure(#[from] ModelError),

    /// A node's op type, arity or attributes are malformed.
    #[error("malformed node '{node}' ({op_type}): {detail}")]
    MalformedNode {
        node: String,
        op_type: String,
        detail: String,
    },

    /// The opset import list is inconsistent.
    #[error("invalid opset import: {0}")]
    Opset(String),

    /// The IR version is unsupported or too low for the features in use.
    #[error("invalid ir_version {version}: {detail}")]
    IrVersion { version: i64, detail: String },
}
