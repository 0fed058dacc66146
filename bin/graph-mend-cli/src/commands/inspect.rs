// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `graph-mend inspect` command: display model structure and diagnostics.
//!
//! Loads one model and prints its metadata, declared values, operator
//! histogram, primary-input manifest and what shape inference makes of it.
//! Nothing is written.

use graph_repair::{normalize_inputs, RepairConfig};
use model_ir::{extract_manifest, ModelLoader, ValueInfo};
use shape_infer::ShapeInferencer;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub async fn execute(model: PathBuf, config: RepairConfig) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             graph-mend · Model Inspector             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let descriptor = ModelLoader::load(&model).map_err(|e| {
        anyhow::anyhow!("failed to load model from '{}': {e}", model.display())
    })?;
    let graph = descriptor.graph();

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", descriptor.summary());
    println!("  {}", graph.summary());
    let opsets: Vec<String> = descriptor.opset_import().iter().map(|o| o.to_string()).collect();
    println!("  Opsets: {}", opsets.join(", "));
    if !descriptor.producer_name().is_empty() {
        println!(
            "  Producer: {} {}",
            descriptor.producer_name(),
            descriptor.producer_version()
        );
    }
    println!();

    // ── Declared Values ────────────────────────────────────────
    print_values("Inputs", graph.inputs(), |vi| graph.is_initializer(&vi.name));
    print_values("Outputs", graph.outputs(), |_| false);

    let weight_bytes: usize = graph
        .initializers()
        .iter()
        .filter_map(|i| i.payload_bytes())
        .sum();
    println!(
        "  Initializers: {} ({:.2} MB)",
        graph.initializers().len(),
        weight_bytes as f64 / (1024.0 * 1024.0),
    );
    println!();

    // ── Operators ──────────────────────────────────────────────
    let mut histogram: BTreeMap<String, usize> = BTreeMap::new();
    for node in graph.nodes() {
        let key = if node.is_default_domain() {
            node.op_type.clone()
        } else {
            format!("{}::{}", node.domain, node.op_type)
        };
        *histogram.entry(key).or_default() += 1;
    }
    println!("  {:<32} {:>6}", "Operator", "Count");
    println!("  {}", "-".repeat(39));
    for (op, count) in &histogram {
        println!("  {op:<32} {count:>6}");
    }
    println!();

    // ── Manifest ───────────────────────────────────────────────
    let entry = extract_manifest(&descriptor);
    println!("  Primary input: '{}'", entry.input_name);
    println!(
        "   Layout: {}   H: {}   W: {}   dtype: {}",
        entry.layout,
        entry.height.map_or_else(|| "?".to_string(), |v| v.to_string()),
        entry.width.map_or_else(|| "?".to_string(), |v| v.to_string()),
        entry.elem_type.map_or_else(|| "?".to_string(), |t| t.to_string()),
    );
    println!();

    // ── Shape Inference ────────────────────────────────────────
    if !config.infer_shapes {
        println!("  Shape inference disabled by configuration.");
        return Ok(());
    }
    let mut scratch = graph.clone();
    let removed = normalize_inputs(&mut scratch);
    if removed > 0 {
        println!("  {removed} initializer(s) listed as inputs (repair would remove them)");
    }
    let opset = descriptor.default_opset().unwrap_or(1);
    let report = ShapeInferencer::default().run_in_place(&mut scratch, opset);
    println!("  Shape inference: {}", report.summary());
    for skip in &report.skipped {
        println!("   skipped {skip}");
    }
    println!();
    Ok(())
}

fn print_values(title: &str, values: &[ValueInfo], is_constant: impl Fn(&ValueInfo) -> bool) {
    println!("  {title}: {}", values.len());
    for vi in values {
        let marker = if is_constant(vi) { "  (initializer)" } else { "" };
        println!("   {vi}{marker}");
    }
}
