// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # graph-mend
//!
//! Command-line interface for repairing ONNX models and extracting their
//! input manifests.
//!
//! ## Usage
//! ```bash
//! # Repair every model under a directory (writes *.fixed.onnx next to each)
//! graph-mend repair ./models
//!
//! # Repair in place with a config file
//! graph-mend --config mend.toml repair 'models/**/*.onnx' --in-place
//!
//! # Input manifest for the web front end
//! graph-mend manifest ./public/models --output manifest.json
//!
//! # Inspect one model
//! graph-mend inspect --model ./models/candy.onnx
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "graph-mend",
    about = "Repair ONNX models and describe their primary inputs",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (CLI flags override its values).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize inputs, enforce ir_version, infer shapes, validate and write.
    Repair {
        /// Model files, directories or glob patterns.
        #[arg(required = true)]
        paths: Vec<String>,

        /// Overwrite each source file instead of writing a sibling.
        #[arg(long)]
        in_place: bool,

        /// Suffix for side-by-side outputs (`name<suffix>.onnx`).
        #[arg(long)]
        suffix: Option<String>,

        /// Minimum ir_version to enforce.
        #[arg(long)]
        min_ir_version: Option<i64>,

        /// Skip shape inference.
        #[arg(long)]
        no_infer: bool,

        /// Number of files processed concurrently.
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Describe each model's primary input (layout, H, W, dtype).
    Manifest {
        /// Model files, directories or glob patterns.
        #[arg(required = true)]
        paths: Vec<String>,

        /// Directory the manifest keys are relative to.
        #[arg(long)]
        root: Option<PathBuf>,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "json")]
        format: commands::manifest::Format,

        /// Write the manifest to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a model's structure, manifest and inference diagnostics.
    Inspect {
        /// Path to the model file.
        #[arg(short, long)]
        model: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Repair {
            paths,
            in_place,
            suffix,
            min_ir_version,
            no_infer,
            workers,
        } => {
            let overrides = commands::repair::Overrides {
                in_place,
                suffix,
                min_ir_version,
                no_infer,
                workers,
            };
            commands::repair::execute(paths, config, overrides).await
        }
        Commands::Manifest {
            paths,
            root,
            format,
            output,
        } => commands::manifest::execute(paths, root, format, output, config).await,
        Commands::Inspect { model } => commands::inspect::execute(model, config).await,
    }
}
