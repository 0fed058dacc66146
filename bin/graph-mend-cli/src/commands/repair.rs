// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `graph-mend repair` command: batch repair of model files.

use graph_repair::{repair_file, run_batch, select_models, RepairConfig};
use std::path::Path;
use std::sync::Arc;

/// Flags that override the configuration file.
pub struct Overrides {
    pub in_place: bool,
    pub suffix: Option<String>,
    pub min_ir_version: Option<i64>,
    pub no_infer: bool,
    pub workers: Option<usize>,
}

impl Overrides {
    fn apply(self, mut config: RepairConfig) -> anyhow::Result<RepairConfig> {
        config.in_place |= self.in_place;
        config.infer_shapes &= !self.no_infer;
        if let Some(suffix) = self.suffix {
            config.output_suffix = suffix;
        }
        if let Some(v) = self.min_ir_version {
            config.min_ir_version = v;
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        config.check()?;
        Ok(config)
    }
}

pub async fn execute(
    paths: Vec<String>,
    config: RepairConfig,
    overrides: Overrides,
) -> anyhow::Result<()> {
    let config = Arc::new(overrides.apply(config)?);

    let files: Vec<_> = select_models(&paths)?
        .into_iter()
        .filter(|p| {
            let skip = config.is_output_name(p);
            if skip {
                tracing::debug!("skipping earlier output '{}'", p.display());
            }
            !skip
        })
        .collect();
    if files.is_empty() {
        anyhow::bail!("no model files selected");
    }

    let job_config = Arc::clone(&config);
    let outcome = run_batch(files, config.resolve_workers(), move |p: &Path| {
        repair_file(p, &job_config)
    })
    .await;

    for (path, result) in &outcome.successes {
        match &result.written {
            Some(dest) => println!("  ok    {} -> {}", path.display(), dest.display()),
            None => println!("  clean {}", path.display()),
        }
        println!("        {}", result.report.summary());
    }
    for (path, err) in &outcome.failures {
        println!("  FAIL  {}: {err}", path.display());
    }
    println!();
    println!("  {}", outcome.summary());

    if !outcome.all_succeeded() {
        anyhow::bail!("{} file(s) failed", outcome.failures.len());
    }
    Ok(())
}
