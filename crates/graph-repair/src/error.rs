// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the repair pipeline.

use std::path::PathBuf;

/// Errors that abort the repair of one model (or a whole batch setup).
#[derive(Debug, thiserror::Error)]
pub enum RepairError {
    /// Loading, decoding or writing the model failed.
    #[error("model error: {0}")]
    Model(#[from] model_ir::ModelError),

    /// The repaired model violates a structural rule; nothing was written.
    #[error("validation failed: {0}")]
    Validation(#[from] model_ir::ValidationError),

    /// A path selector could not be expanded.
    #[error("cannot select '{}': {detail}", path.display())]
    Selection { path: PathBuf, detail: String },

    /// A worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Task(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
