// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared setup.

pub mod inspect;
pub mod manifest;
pub mod repair;

use anyhow::Context;
use graph_repair::RepairConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Configuration from `--config`, or the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<RepairConfig> {
    match path {
        Some(p) => RepairConfig::from_file(p)
            .with_context(|| format!("loading configuration from '{}'", p.display())),
        None => Ok(RepairConfig::default()),
    }
}
