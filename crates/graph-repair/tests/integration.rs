// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end repair and manifest batches on disk.
//!
//! These tests write real model files, run them through selection, the
//! batch driver and the pipeline, and read the results back.

use graph_repair::{
    manifest_file, relative_key, repair_file, run_batch, select_models, ManifestReport,
    RepairConfig, RepairError,
};
use model_ir::{
    Graph, Initializer, Layout, Loaded, ModelDescriptor, ModelLoader, Node, OpsetId, ValueInfo,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tensor_meta::{Dim, ElemType};

// ── Helpers ────────────────────────────────────────────────────

/// A small style-transfer-like model: conv + instance-norm + relu, with
/// the conv weight duplicated in the input list the way old exporters did.
fn style_model(dims: [Dim; 4], ir_version: i64) -> ModelDescriptor<Loaded> {
    let channels = if dims[1].is(3) { 3 } else { dims[3].value().unwrap_or(3) };
    let graph = Graph::builder("style")
        .input(ValueInfo::tensor("input1", ElemType::Float, dims.to_vec()))
        .input(ValueInfo::tensor(
            "conv.weight",
            ElemType::Float,
            vec![Dim::Known(16), Dim::Known(channels), Dim::Known(3), Dim::Known(3)],
        ))
        .initializer(Initializer::from_f32(
            "conv.weight",
            vec![16, channels, 3, 3],
            vec![0.01; (16 * channels * 9) as usize],
        ))
        .initializer(Initializer::from_f32("scale", vec![16], vec![1.0; 16]))
        .initializer(Initializer::from_f32("bias", vec![16], vec![0.0; 16]))
        .node(Node::new("Conv", &["input1", "conv.weight"], &["c"]).with_attr("pads", vec![1i64, 1, 1, 1]))
        .node(Node::new("InstanceNormalization", &["c", "scale", "bias"], &["n"]))
        .node(Node::new("Relu", &["n"], &["output1"]))
        .output(ValueInfo::untyped("output1"))
        .build()
        .unwrap();
    ModelDescriptor::new(ir_version, vec![OpsetId::onnx(9)], graph)
}

fn nchw(h: u64, w: u64) -> [Dim; 4] {
    [Dim::Known(1), Dim::Known(3), Dim::Known(h), Dim::Known(w)]
}

fn write_model(path: &Path, model: &ModelDescriptor<Loaded>) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, model.to_bytes()).unwrap();
}

fn selector(path: &Path) -> Vec<String> {
    vec![path.to_string_lossy().into_owned()]
}

// ── Repair Batches ─────────────────────────────────────────────

#[tokio::test]
async fn test_batch_with_one_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let names = ["candy", "mosaic", "udnie", "rain-princess"];
    for name in names {
        write_model(&dir.path().join(format!("{name}.onnx")), &style_model(nchw(224, 224), 3));
    }
    std::fs::write(dir.path().join("broken.onnx"), b"\x08\xff\xff not a model").unwrap();

    let files = select_models(&selector(dir.path())).unwrap();
    assert_eq!(files.len(), names.len() + 1);

    let config = Arc::new(RepairConfig::default());
    let job_config = Arc::clone(&config);
    let outcome = run_batch(files, 3, move |p: &Path| repair_file(p, &job_config)).await;

    assert_eq!(outcome.successes.len(), names.len());
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].0.ends_with("broken.onnx"));
    assert!(matches!(outcome.failures[0].1, RepairError::Model(_)));

    for name in names {
        let fixed = dir.path().join(format!("{name}.fixed.onnx"));
        let model = ModelLoader::load(&fixed).unwrap();
        assert_eq!(model.ir_version(), 4);
        let inputs: Vec<&str> = model.graph().inputs().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(inputs, ["input1"]);
        assert!(!model.graph().outputs()[0].ty.is_unknown());
    }
    assert!(!dir.path().join("broken.fixed.onnx").exists());
}

#[test]
fn test_validation_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let graph = Graph::builder("bad")
        .input(ValueInfo::tensor("x", ElemType::Float, vec![Dim::Known(2)]))
        .node(Node::new("Relu", &["x"], &["y"]))
        .output(ValueInfo::untyped("y"))
        .build()
        .unwrap();
    // Opset 0 is never valid.
    let model = ModelDescriptor::new(7, vec![OpsetId::onnx(0)], graph);
    let src = dir.path().join("bad.onnx");
    write_model(&src, &model);

    let err = repair_file(&src, &RepairConfig::default()).unwrap_err();
    assert!(matches!(err, RepairError::Validation(_)));
    assert!(!dir.path().join("bad.fixed.onnx").exists());
}

#[test]
fn test_in_place_overwrites_source() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("net.onnx");
    write_model(&src, &style_model(nchw(64, 64), 3));

    let config = RepairConfig {
        in_place: true,
        ..Default::default()
    };
    let outcome = repair_file(&src, &config).unwrap();
    assert_eq!(outcome.written, Some(src.clone()));
    assert_eq!(ModelLoader::load(&src).unwrap().ir_version(), 4);

    let entries: Vec<PathBuf> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries, vec![src]);
}

// ── Manifest ───────────────────────────────────────────────────

#[tokio::test]
async fn test_manifest_over_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    write_model(&root.join("style/candy.onnx"), &style_model(nchw(224, 224), 4));
    write_model(
        &root.join("detect/nhwc.onnx"),
        &style_model(
            [Dim::from("N"), Dim::from("unk"), Dim::Known(320), Dim::Known(3)],
            7,
        ),
    );

    let files = select_models(&selector(&root)).unwrap();
    let outcome = run_batch(files, 2, |p: &Path| manifest_file(p)).await;
    assert!(outcome.all_succeeded());

    let mut report = ManifestReport::new();
    for (path, entry) in outcome.successes {
        report.insert(relative_key(&root, &path), entry);
    }
    let candy = report.get("style/candy.onnx").unwrap();
    assert_eq!(candy.layout, Layout::Nchw);
    assert_eq!((candy.height, candy.width), (Some(224), Some(224)));

    let nhwc = report.get("detect/nhwc.onnx").unwrap();
    assert_eq!(nhwc.layout, Layout::Nhwc);
    assert_eq!((nhwc.height, nhwc.width), (None, Some(320)));
    assert_eq!(nhwc.opset, Some(9));

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["style/candy.onnx"]["input"], "input1");
}
