// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The per-model repair pipeline.
//!
//! ```text
//! load → normalize inputs → enforce ir_version → infer shapes (best-effort)
//!      → validate → write
//! ```
//!
//! Each step takes the model by value or `&mut` and nothing is shared
//! between models. Writing is the last step and only a validated model can
//! be written, so a failure at any earlier point leaves the disk untouched.

use crate::{enforce_min_version, normalize_inputs, RepairConfig, RepairError, RepairReport};
use model_ir::{
    extract_manifest, Loaded, ManifestEntry, ModelDescriptor, ModelLoader, ModelWriter, Validated,
};
use shape_infer::ShapeInferencer;
use std::path::{Path, PathBuf};

/// A validated model plus what was done to it.
#[derive(Debug)]
pub struct Repaired {
    pub model: ModelDescriptor<Validated>,
    pub report: RepairReport,
}

/// Result of repairing one file.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub source: PathBuf,
    /// Where the model was written; `None` if an in-place repair found
    /// nothing to change.
    pub written: Option<PathBuf>,
    pub report: RepairReport,
}

/// Normalizes, version-enforces, optionally infers and always validates.
pub fn repair_model(
    mut model: ModelDescriptor<Loaded>,
    config: &RepairConfig,
) -> Result<Repaired, RepairError> {
    let inputs_removed = normalize_inputs(model.graph_mut());
    let version = enforce_min_version(&mut model, config.min_ir_version);

    let inference = if config.infer_shapes {
        let opset = model.default_opset().unwrap_or(1);
        let report = ShapeInferencer::default().run_in_place(model.graph_mut(), opset);
        if !report.is_complete() {
            tracing::warn!("Shape inference skipped for {} node(s)", report.skipped.len());
            for skip in &report.skipped {
                tracing::debug!("  {skip}");
            }
        }
        Some(report)
    } else {
        None
    };

    let model = model.validate(&config.validation_policy())?;
    Ok(Repaired {
        model,
        report: RepairReport {
            inputs_removed,
            version,
            inference,
        },
    })
}

/// Repairs the model at `path` and writes the result per `config`.
pub fn repair_file(path: &Path, config: &RepairConfig) -> Result<RepairOutcome, RepairError> {
    let model = ModelLoader::load(path)?;
    tracing::debug!("{}", model.summary());
    let Repaired { model, report } = repair_model(model, config)?;

    let written = if config.in_place && !report.changed() {
        tracing::info!("'{}' already clean, left untouched", path.display());
        None
    } else {
        let dest = config.output_path(path);
        ModelWriter::write(&model, &dest)?;
        tracing::info!("Wrote '{}' ({})", dest.display(), report.summary());
        Some(dest)
    };

    Ok(RepairOutcome {
        source: path.to_path_buf(),
        written,
        report,
    })
}

/// Loads the model at `path` and describes its primary input.
pub fn manifest_file(path: &Path) -> Result<ManifestEntry, RepairError> {
    let model = ModelLoader::load(path)?;
    Ok(extract_manifest(&model))
}
