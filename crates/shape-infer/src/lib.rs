// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # shape-infer
//!
//! Best-effort shape and element-type propagation over a [`model_ir::Graph`].
//!
//! Nodes are visited in topological order. Each node's operator is looked
//! up in a [`RuleRegistry`]; the rule sees the node's inputs through a
//! [`NodeContext`] and returns its output types. Anything that cannot be
//! typed becomes a [`SkipRecord`] rather than an error, so a pass always
//! completes.
//!
//! # Rule classes
//!
//! | Class | Examples | Output |
//! |---|---|---|
//! | Elementwise | `Relu`, `Add`, `Sum`, `Equal`, `Cast` | input shape or numpy broadcast |
//! | Shape transform | `Reshape`, `Concat`, `Gather`, `Conv`, `MaxPool` | computed from attributes, constants and known dims |
//! | Unknown | anything unregistered | untyped, plus a skip record |
//!
//! # Trait-Based Extensibility
//!
//! Any function `Fn(&NodeContext) -> Result<Vec<TensorType>, InferError>`
//! is an [`InferenceRule`], so operators can be added or overridden
//! without touching the driver:
//!
//! ```
//! use model_ir::TensorType;
//! use shape_infer::{InferError, NodeContext, ShapeInferencer};
//!
//! fn passthrough(ctx: &NodeContext<'_>) -> Result<Vec<TensorType>, InferError> {
//!     NodeContext::single(ctx.input_type(0)?.clone())
//! }
//!
//! let mut inferencer = ShapeInferencer::default();
//! inferencer.registry_mut().register("MyVendorIdentity", passthrough);
//! ```
//!
//! # Example
//! ```no_run
//! use model_ir::ModelLoader;
//! use std::path::Path;
//!
//! let model = ModelLoader::load(Path::new("model.onnx")).unwrap();
//! let opset = model.default_opset().unwrap_or(1);
//! let (graph, report) = shape_infer::infer_shapes(model.graph().clone(), opset);
//! println!("{}: {}", graph.name(), report.summary());
//! ```

mod context;
mod error;
mod infer;
mod rule;
pub mod rules;

pub use context::{InputView, NodeContext};
pub use error::InferError;
pub use infer::{infer_shapes, InferenceReport, ShapeInferencer, SkipRecord};
pub use rule::{InferenceRule, RuleRegistry};
