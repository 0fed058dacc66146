// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `graph-mend manifest` command: primary-input manifest of many models.
//!
//! Keys are model paths relative to `--root`, which defaults to the first
//! selector when it is a directory and to the working directory otherwise.

use anyhow::Context;
use graph_repair::{manifest_file, relative_key, run_batch, select_models, ManifestReport, RepairConfig};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Format {
    Json,
    Text,
}

pub async fn execute(
    paths: Vec<String>,
    root: Option<PathBuf>,
    format: Format,
    output: Option<PathBuf>,
    config: RepairConfig,
) -> anyhow::Result<()> {
    let root = root.unwrap_or_else(|| match paths.first().map(PathBuf::from) {
        Some(p) if p.is_dir() => p,
        _ => PathBuf::from("."),
    });
    let files = select_models(&paths)?;

    let outcome = run_batch(files, config.resolve_workers(), |p: &Path| manifest_file(p)).await;

    let mut report = ManifestReport::new();
    for (path, entry) in outcome.successes.iter().cloned() {
        report.insert(relative_key(&root, &path), entry);
    }
    for (path, err) in &outcome.failures {
        eprintln!("  FAIL  {}: {err}", path.display());
    }

    let rendered = match format {
        Format::Json => report.to_json().context("serialising manifest")?,
        Format::Text => report.to_table(),
    };
    match output {
        Some(path) => {
            std::fs::write(&path, rendered.as_bytes())
                .with_context(|| format!("writing manifest to '{}'", path.display()))?;
            tracing::info!("Wrote {} entries to '{}'", report.len(), path.display());
        }
        None => println!("{rendered}"),
    }

    if !outcome.all_succeeded() {
        anyhow::bail!("{} file(s) failed", outcome.failures.len());
    }
    Ok(())
}
