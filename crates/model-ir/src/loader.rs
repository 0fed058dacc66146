// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reading and writing model files.
//!
//! Files are memory-mapped for decoding. Writes go to a temporary file in
//! the destination directory which is then renamed over the target, so a
//! failed write never leaves a truncated model behind.

use crate::codec;
use crate::model::{Loaded, Validated};
use crate::proto::ModelProto;
use crate::{ModelDescriptor, ModelError};
use prost::Message;
use std::io::Write;
use std::path::Path;

/// Decodes models from disk or memory.
pub struct ModelLoader;

impl ModelLoader {
    /// Loads a model file.
    ///
    /// Unreadable files map to [`ModelError::Io`]; empty or malformed
    /// content maps to [`ModelError::Deserialization`]; dangling references
    /// and cycles surface as the corresponding structural errors.
    pub fn load(path: &Path) -> Result<ModelDescriptor<Loaded>, ModelError> {
        let io_err = |source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::open(path).map_err(io_err)?;
        let len = file.metadata().map_err(io_err)?.len();
        if len == 0 {
            return Err(ModelError::Deserialization(format!(
                "'{}' is empty",
                path.display()
            )));
        }

        // Memory-map the file for zero-copy decoding.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(io_err)?;
        let model = Self::from_bytes(&mmap)?;
        tracing::debug!("loaded '{}' ({len} bytes)", path.display());
        Ok(model)
    }

    /// Decodes a model from protobuf bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<ModelDescriptor<Loaded>, ModelError> {
        if bytes.is_empty() {
            return Err(ModelError::Deserialization("empty input".into()));
        }
        let proto =
            ModelProto::decode(bytes).map_err(|e| ModelError::Deserialization(e.to_string()))?;
        codec::model_from_proto(proto)
    }
}

/// Persists validated models.
pub struct ModelWriter;

impl ModelWriter {
    /// Atomically writes `model` to `path`, replacing any existing file.
    pub fn write(model: &ModelDescriptor<Validated>, path: &Path) -> Result<(), ModelError> {
        let io_err = |source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let bytes = model.to_bytes();

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;

        tracing::debug!("wrote '{}' ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Graph, Node, OpsetId, ValidationPolicy, ValueInfo};
    use tensor_meta::{Dim, ElemType};

    fn sample() -> ModelDescriptor<Validated> {
        let graph = Graph::builder("g")
            .input(ValueInfo::tensor("x", ElemType::Float, vec![Dim::Known(2)]))
            .node(Node::new("Neg", &["x"], &["y"]))
            .output(ValueInfo::untyped("y"))
            .build()
            .unwrap();
        ModelDescriptor::new(8, vec![OpsetId::onnx(13)], graph)
            .validate(&ValidationPolicy::default())
            .unwrap()
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.onnx");
        let model = sample();
        ModelWriter::write(&model, &path).unwrap();

        let loaded = ModelLoader::load(&path).unwrap();
        assert_eq!(loaded.ir_version(), 8);
        assert_eq!(loaded.graph(), model.graph());
    }

    #[test]
    fn test_empty_file_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            ModelLoader::load(file.path()),
            Err(ModelError::Deserialization(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ModelLoader::load(&dir.path().join("absent.onnx"));
        assert!(matches!(result, Err(ModelError::Io { .. })));
    }

    #[test]
    fn test_garbage_rejected() {
        let result = ModelLoader::from_bytes(&[0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert!(matches!(result, Err(ModelError::Deserialization(_))));
    }
}
