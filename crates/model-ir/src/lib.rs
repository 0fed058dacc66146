// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! In-memory representation of serialized ONNX computation graphs.
//!
//! - [`Graph`] — nodes, declared inputs/outputs, initializers and
//!   intermediate value types, with an O(1) name → producer index and a
//!   precomputed topological order.
//! - [`ModelDescriptor`] — a graph plus `ir_version` and opset imports,
//!   with a **type-state pattern** (`Loaded` → `Validated`).
//! - [`ModelLoader`] / [`ModelWriter`] — protobuf decoding via mmap and
//!   atomic encoding back to disk.
//! - [`validate_model`] — the ordered structural checks.
//! - [`extract_manifest`] — primary-input layout classification.
//!
//! # Example
//! ```no_run
//! use model_ir::{extract_manifest, ModelLoader, ValidationPolicy};
//! use std::path::Path;
//!
//! let model = ModelLoader::load(Path::new("model.onnx")).unwrap();
//! let model = model.validate(&ValidationPolicy::default()).unwrap();
//! println!("{}", model.summary());
//! println!("{:?}", extract_manifest(&model));
//! ```

mod attribute;
mod codec;
mod error;
pub mod graph;
mod loader;
mod manifest;
pub mod model;
mod node;
pub mod proto;
pub mod schema;
mod validate;
mod value;

pub use attribute::{AttributeValue, Attributes};
pub use error::{ModelError, ValidationError};
pub use graph::{Graph, GraphBuilder, Producer};
pub use loader::{ModelLoader, ModelWriter};
pub use manifest::{extract_manifest, Layout, ManifestEntry};
pub use model::{Loaded, ModelDescriptor, ModelState, OpsetId, Validated};
pub use node::{canonical_domain, Node};
pub use validate::{validate_model, ValidationPolicy, IR_VERSION_INITIALIZERS_NOT_INPUTS};
pub use value::{Initializer, TensorData, TensorType, TypeConflict, ValueInfo};
