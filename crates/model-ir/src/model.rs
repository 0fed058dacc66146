// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model descriptor: versioning metadata plus the computation graph.
//!
//! # Type-State Pattern
//!
//! ```text
//! ModelDescriptor<Loaded>     — decoded or built, freely mutable.
//!       │  .validate(&policy)
//!       ▼
//! ModelDescriptor<Validated>  — structurally sound, read-only, writable to disk.
//! ```
//!
//! [`crate::ModelWriter`] only accepts the `Validated` state, so a model
//! that failed validation can never be persisted.

use crate::proto::{FunctionProto, TrainingInfoProto};
use crate::validate::{validate_model, ValidationPolicy};
use crate::{codec, node::canonical_domain, Graph, ValidationError};
use prost::Message;
use std::fmt;
use std::marker::PhantomData;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: decoded or constructed, not yet checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded;

/// Marker: passed every structural check.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Loaded {}
    impl Sealed for super::Validated {}
}

/// Descriptor states. Sealed: only [`Loaded`] and [`Validated`] exist.
///
/// ```compile_fail
/// use model_ir::ModelState;
///
/// #[derive(Debug, Clone)]
/// struct Draft;
/// impl ModelState for Draft {}
/// ```
pub trait ModelState: sealed::Sealed + fmt::Debug + Clone {}
impl ModelState for Loaded {}
impl ModelState for Validated {}

/// One entry of the operator set import list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpsetId {
    /// Empty for the default ONNX domain.
    pub domain: String,
    pub version: i64,
}

impl OpsetId {
    pub fn new(domain: impl Into<String>, version: i64) -> Self {
        Self {
            domain: domain.into(),
            version,
        }
    }

    /// Default-domain import at `version`.
    pub fn onnx(version: i64) -> Self {
        Self::new("", version)
    }
}

impl fmt::Display for OpsetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let domain = if self.domain.is_empty() {
            "ai.onnx"
        } else {
            &self.domain
        };
        write!(f, "{domain} v{}", self.version)
    }
}

// ── ModelDescriptor ────────────────────────────────────────────────

/// A complete model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor<S: ModelState = Loaded> {
    pub(crate) ir_version: i64,
    pub(crate) opset_import: Vec<OpsetId>,
    pub(crate) producer_name: String,
    pub(crate) producer_version: String,
    pub(crate) domain: String,
    pub(crate) model_version: i64,
    pub(crate) doc_string: String,
    pub(crate) metadata_props: Vec<(String, String)>,
    pub(crate) graph: Graph,
    pub(crate) functions: Vec<FunctionProto>,
    pub(crate) training_info: Vec<TrainingInfoProto>,
    pub(crate) _state: PhantomData<S>,
}

impl<S: ModelState> ModelDescriptor<S> {
    pub fn ir_version(&self) -> i64 {
        self.ir_version
    }

    pub fn opset_import(&self) -> &[OpsetId] {
        &self.opset_import
    }

    pub fn producer_name(&self) -> &str {
        &self.producer_name
    }

    pub fn producer_version(&self) -> &str {
        &self.producer_version
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn model_version(&self) -> i64 {
        self.model_version
    }

    pub fn doc_string(&self) -> &str {
        &self.doc_string
    }

    pub fn metadata_props(&self) -> &[(String, String)] {
        &self.metadata_props
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Model-local function definitions, carried as decoded.
    pub fn functions(&self) -> &[FunctionProto] {
        &self.functions
    }

    pub fn training_info(&self) -> &[TrainingInfoProto] {
        &self.training_info
    }

    /// Imported version of `domain` (`""` and `"ai.onnx"` are the same).
    pub fn opset_version(&self, domain: &str) -> Option<i64> {
        let domain = canonical_domain(domain);
        self.opset_import
            .iter()
            .find(|op| canonical_domain(&op.domain) == domain)
            .map(|op| op.version)
    }

    /// Imported version of the default ONNX operator set.
    pub fn default_opset(&self) -> Option<i64> {
        self.opset_version("")
    }

    /// Encodes the model to protobuf wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        codec::model_to_proto(self).encode_to_vec()
    }

    /// Returns a one-line summary.
    pub fn summary(&self) -> String {
        let opsets: Vec<String> = self.opset_import.iter().map(ToString::to_string).collect();
        format!(
            "ir_version {}, opsets [{}], producer '{}' {} | {}",
            self.ir_version,
            opsets.join(", "),
            self.producer_name,
            self.producer_version,
            self.graph.summary(),
        )
    }
}

// ── Loaded state ───────────────────────────────────────────────────

impl ModelDescriptor<Loaded> {
    /// Wraps a graph with the given versioning metadata.
    pub fn new(ir_version: i64, opset_import: Vec<OpsetId>, graph: Graph) -> Self {
        Self {
            ir_version,
            opset_import,
            producer_name: String::new(),
            producer_version: String::new(),
            domain: String::new(),
            model_version: 0,
            doc_string: String::new(),
            metadata_props: Vec::new(),
            graph,
            functions: Vec::new(),
            training_info: Vec::new(),
            _state: PhantomData,
        }
    }

    pub fn with_producer(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.producer_name = name.into();
        self.producer_version = version.into();
        self
    }

    pub fn set_ir_version(&mut self, version: i64) {
        self.ir_version = version;
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Replaces the graph, returning the old one.
    pub fn replace_graph(&mut self, graph: Graph) -> Graph {
        std::mem::replace(&mut self.graph, graph)
    }

    /// Runs every structural check and transitions to `Validated`.
    ///
    /// See [`validate_model`] for the checks, in order. The first
    /// violation is returned.
    pub fn validate(self, policy: &ValidationPolicy) -> Result<ModelDescriptor<Validated>, ValidationError> {
        validate_model(&self, policy)?;
        tracing::debug!("model validated: {}", self.graph.summary());
        Ok(ModelDescriptor {
            ir_version: self.ir_version,
            opset_import: self.opset_import,
            producer_name: self.producer_name,
            producer_version: self.producer_version,
            domain: self.domain,
            model_version: self.model_version,
            doc_string: self.doc_string,
            metadata_props: self.metadata_props,
            graph: self.graph,
            functions: self.functions,
            training_info: self.training_info,
            _state: PhantomData,
        })
    }
}
