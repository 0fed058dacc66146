// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # graph-repair
//!
//! Brings ONNX models in line with a runtime's structural contract and
//! extracts their primary-input manifests, one file or a whole batch at a
//! time.
//!
//! # Pipeline
//! ```text
//! ModelDescriptor<Loaded>
//!   → normalize_inputs      (initializers leave the input list)
//!   → enforce_min_version   (ir_version ≥ 4)
//!   → ShapeInferencer       (best-effort, skips are diagnostics)
//!   → validate              (always)
//!   → ModelDescriptor<Validated> → ModelWriter
//! ```
//!
//! # Batches
//! [`run_batch`] fans files out over tokio's blocking pool, bounded by a
//! semaphore. One bad file never stops the others; see [`BatchOutcome`].
//!
//! # Example
//! ```no_run
//! use graph_repair::{repair_file, RepairConfig};
//! use std::path::Path;
//!
//! let outcome = repair_file(Path::new("in.onnx"), &RepairConfig::default()).unwrap();
//! println!("{}", outcome.report.summary());
//! ```

mod batch;
mod config;
mod error;
mod normalize;
mod pipeline;
mod report;
mod selection;
mod version;

pub use batch::{run_batch, BatchOutcome};
pub use config::RepairConfig;
pub use error::RepairError;
pub use normalize::normalize_inputs;
pub use pipeline::{manifest_file, repair_file, repair_model, RepairOutcome, Repaired};
pub use report::{relative_key, ManifestReport, RepairReport};
pub use selection::{scan_directory, select_models};
pub use version::{enforce_min_version, VersionChange};
