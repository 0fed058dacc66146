// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Repair configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! min_ir_version = 4
//! max_ir_version = 11
//! infer_shapes = true
//! in_place = false
//! output_suffix = ".fixed"
//! workers = 4
//! ```
//!
//! Every key is optional; missing keys take their [`Default`] value.

use crate::RepairError;
use model_ir::{ValidationPolicy, IR_VERSION_INITIALIZERS_NOT_INPUTS};
use std::path::{Path, PathBuf};

/// Configuration for the repair pipeline and batch driver.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// `ir_version` floor applied after input normalization.
    pub min_ir_version: i64,
    /// Highest `ir_version` the validator accepts.
    pub max_ir_version: i64,
    /// Whether to run shape/type propagation before validating.
    pub infer_shapes: bool,
    /// Overwrite the source file instead of writing a sibling.
    pub in_place: bool,
    /// Inserted before `.onnx` in side-by-side output names.
    pub output_suffix: String,
    /// Number of concurrent workers (defaults to available parallelism).
    pub workers: Option<usize>,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            min_ir_version: IR_VERSION_INITIALIZERS_NOT_INPUTS,
            max_ir_version: ValidationPolicy::default().max_supported_ir_version,
            infer_shapes: true,
            in_place: false,
            output_suffix: ".fixed".to_string(),
            workers: None,
        }
    }
}

impl RepairConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RepairError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RepairError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and checks configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RepairError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| RepairError::ConfigError(format!("TOML parse error: {e}")))?;
        config.check()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RepairError> {
        toml::to_string_pretty(self)
            .map_err(|e| RepairError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Rejects settings the pipeline cannot honour.
    pub fn check(&self) -> Result<(), RepairError> {
        if self.min_ir_version < 1 || self.min_ir_version > self.max_ir_version {
            return Err(RepairError::ConfigError(format!(
                "min_ir_version {} outside 1..={}",
                self.min_ir_version, self.max_ir_version
            )));
        }
        if !self.in_place && self.output_suffix.is_empty() {
            return Err(RepairError::ConfigError(
                "output_suffix must be non-empty unless in_place is set".into(),
            ));
        }
        if self.workers == Some(0) {
            return Err(RepairError::ConfigError("workers must be at least 1".into()));
        }
        Ok(())
    }

    /// Resolves the number of concurrent workers.
    pub fn resolve_workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    /// Validator settings derived from this configuration.
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            max_supported_ir_version: self.max_ir_version,
            ..ValidationPolicy::default()
        }
    }

    /// Destination for the repaired copy of `source`.
    ///
    /// `dir/name.onnx` becomes `dir/name<suffix>.onnx`; in-place mode
    /// returns `source` itself.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        if self.in_place {
            return source.to_path_buf();
        }
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = source
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());
        source.with_file_name(format!("{stem}{}.{ext}", self.output_suffix))
    }

    /// Returns `true` if `path` looks like a side-by-side output of an
    /// earlier run, e.g. `name.fixed.onnx`.
    pub fn is_output_name(&self, path: &Path) -> bool {
        if self.in_place || self.output_suffix.is_empty() {
            return false;
        }
        path.file_stem()
            .is_some_and(|s| s.to_string_lossy().ends_with(&self.output_suffix))
    }
}
