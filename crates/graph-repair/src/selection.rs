// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Expanding command-line selectors into model files.
//!
//! A selector is a glob pattern (`models/**/*.onnx`), a directory (walked
//! recursively for files with an `.onnx` extension in any letter case) or
//! a plain file.

use crate::RepairError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const MODEL_EXTENSION: &str = "onnx";

fn is_pattern(selector: &str) -> bool {
    selector.contains(['*', '?', '['])
}

fn is_model_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(MODEL_EXTENSION))
}

fn expand_glob(pattern: &str, origin: &Path) -> Result<Vec<PathBuf>, RepairError> {
    let selection_err = |detail: String| RepairError::Selection {
        path: origin.to_path_buf(),
        detail,
    };
    let paths = glob::glob(pattern).map_err(|e| selection_err(e.to_string()))?;
    let mut out = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => out.push(path),
            Err(e) => tracing::warn!("skipping unreadable path: {e}"),
        }
    }
    Ok(out)
}

/// Every file below `dir` with a model extension, compared case-insensitively.
pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>, RepairError> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = format!("{escaped}/**/*");
    let mut files: Vec<PathBuf> = expand_glob(&pattern, dir)?
        .into_iter()
        .filter(|p| is_model_file(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Expands `selectors` into a sorted, de-duplicated list of files.
///
/// A selector that names nothing is an error; a pattern that matches
/// nothing only logs a warning.
pub fn select_models<S: AsRef<str>>(selectors: &[S]) -> Result<Vec<PathBuf>, RepairError> {
    let mut selected = BTreeSet::new();
    for selector in selectors {
        let selector = selector.as_ref();
        let path = Path::new(selector);
        if path.is_dir() {
            selected.extend(scan_directory(path)?);
        } else if path.is_file() {
            selected.insert(path.to_path_buf());
        } else if is_pattern(selector) {
            let matches: Vec<PathBuf> = expand_glob(selector, path)?
                .into_iter()
                .filter(|p| p.is_file())
                .collect();
            if matches.is_empty() {
                tracing::warn!("pattern '{selector}' matched no files");
            }
            selected.extend(matches);
        } else {
            return Err(RepairError::Selection {
                path: path.to_path_buf(),
                detail: "no such file or directory".into(),
            });
        }
    }
    Ok(selected.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_scan_directory_recursive() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.onnx"));
        touch(&dir.path().join("nested/deep/b.onnx"));
        touch(&dir.path().join("nested/readme.txt"));

        let files = scan_directory(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "onnx"));
    }

    #[test]
    fn test_scan_directory_extension_any_case() {
        let dir = tempfile::tempdir().unwrap();
        let lower = dir.path().join("a.onnx");
        let upper = dir.path().join("nested/B.ONNX");
        touch(&lower);
        touch(&upper);
        touch(&dir.path().join("nested/B.ONNX.bak"));

        let files = scan_directory(dir.path()).unwrap();
        assert_eq!(files, vec![lower, upper]);
    }

    #[test]
    fn test_select_mixed_selectors() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.onnx");
        let b = dir.path().join("sub/b.onnx");
        let c = dir.path().join("c.bin");
        touch(&a);
        touch(&b);
        touch(&c);

        let pattern = format!("{}/*.bin", dir.path().display());
        let selectors = [
            dir.path().to_string_lossy().into_owned(),
            a.to_string_lossy().into_owned(),
            pattern,
        ];
        let files = select_models(&selectors).unwrap();
        assert_eq!(files.len(), 3);
        let expected: BTreeSet<PathBuf> = [a, b, c].into_iter().collect();
        assert_eq!(files.into_iter().collect::<BTreeSet<_>>(), expected);
    }

    #[test]
    fn test_missing_selector() {
        let err = select_models(&["/definitely/not/here.onnx"]).unwrap_err();
        assert!(matches!(err, RepairError::Selection { .. }));
    }

    #[test]
    fn test_unmatched_pattern_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.onnx", dir.path().display());
        assert!(select_models(&[pattern]).unwrap().is_empty());
    }
}
