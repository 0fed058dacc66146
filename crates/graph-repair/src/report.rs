// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-model repair reports and the batch manifest report.

use crate::VersionChange;
use model_ir::ManifestEntry;
use shape_infer::InferenceReport;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Component, Path};

/// What the pipeline did to one model.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RepairReport {
    /// Declared inputs dropped because they name initializers.
    pub inputs_removed: usize,
    pub version: VersionChange,
    /// `None` when inference was disabled.
    pub inference: Option<InferenceReport>,
}

impl RepairReport {
    /// Returns `true` if normalization or version enforcement modified the
    /// model. Inferred value-info alone does not count.
    pub fn changed(&self) -> bool {
        self.inputs_removed > 0 || self.version.changed()
    }

    pub fn summary(&self) -> String {
        let mut s = format!(
            "{} input(s) removed, ir_version {} -> {}",
            self.inputs_removed, self.version.from, self.version.to
        );
        match &self.inference {
            Some(r) => {
                let _ = write!(s, ", {}", r.summary());
            }
            None => s.push_str(", inference disabled"),
        }
        s
    }
}

/// Manifest entries keyed by model path relative to the scan root.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ManifestReport {
    entries: BTreeMap<String, ManifestEntry>,
}

impl ManifestReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: ManifestEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Pretty-printed JSON object.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Fixed-width text table, one row per model.
    pub fn to_table(&self) -> String {
        let width = self
            .entries
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(5)
            .max(5);
        let opt = |v: Option<u64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());

        let mut out = format!(
            "{:<width$}  {:<16} {:<8} {:>6} {:>6} {:>6} {:>4} {:>6}\n",
            "Model", "Input", "Layout", "H", "W", "dtype", "IR", "opset"
        );
        let _ = writeln!(out, "{}", "-".repeat(width + 60));
        for (key, e) in &self.entries {
            let _ = writeln!(
                out,
                "{:<width$}  {:<16} {:<8} {:>6} {:>6} {:>6} {:>4} {:>6}",
                key,
                e.input_name,
                e.layout.as_str(),
                opt(e.height),
                opt(e.width),
                e.elem_type.map_or(0, |t| t.code()),
                e.ir_version,
                e.opset.map_or_else(|| "-".to_string(), |v| v.to_string()),
            );
        }
        out
    }
}

/// `path` relative to `root`, `/`-separated. Paths outside `root` keep
/// their full form.
pub fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::RootDir => Some(String::new()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::Layout;
    use tensor_meta::ElemType;

    fn entry(layout: Layout, hw: Option<u64>) -> ManifestEntry {
        ManifestEntry {
            input_name: "input1".into(),
            layout,
            height: hw,
            width: hw,
            elem_type: Some(ElemType::Float),
            ir_version: 7,
            opset: Some(13),
        }
    }

    #[test]
    fn test_manifest_json_keys() {
        let mut report = ManifestReport::new();
        report.insert("style/mosaic.onnx", entry(Layout::Nchw, Some(224)));
        report.insert("detect/yolo.onnx", entry(Layout::Unknown, None));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let mosaic = &json["style/mosaic.onnx"];
        assert_eq!(mosaic["input"], "input1");
        assert_eq!(mosaic["layout"], "NCHW");
        assert_eq!(mosaic["H"], 224);
        assert_eq!(mosaic["dtype"], "1");
        assert_eq!(mosaic["opset"], 13);
        assert!(json["detect/yolo.onnx"]["W"].is_null());

        let keys: Vec<&str> = report.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["detect/yolo.onnx", "style/mosaic.onnx"]);
    }

    #[test]
    fn test_table_lists_every_model() {
        let mut report = ManifestReport::new();
        report.insert("a.onnx", entry(Layout::Nhwc, Some(320)));
        let table = report.to_table();
        assert!(table.contains("a.onnx"));
        assert!(table.contains("NHWC"));
        assert!(table.contains("320"));
    }

    #[test]
    fn test_relative_key() {
        assert_eq!(
            relative_key(Path::new("models"), Path::new("models/style/candy.onnx")),
            "style/candy.onnx"
        );
        assert_eq!(relative_key(Path::new("other"), Path::new("m.onnx")), "m.onnx");
    }

    #[test]
    fn test_repair_report_changed() {
        let report = RepairReport {
            inputs_removed: 0,
            version: VersionChange { from: 7, to: 7 },
            inference: None,
        };
        assert!(!report.changed());
        assert!(report.summary().contains("inference disabled"));
        let report = RepairReport {
            inputs_removed: 3,
            ..report
        };
        assert!(report.changed());
    }
}
