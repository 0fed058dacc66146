// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`InferenceRule`] trait and the op-type keyed [`RuleRegistry`].

use crate::{rules, InferError, NodeContext};
use model_ir::{Initializer, TensorType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Per-operator type inference.
///
/// Rules are pure functions of the [`NodeContext`], with no I/O and no
/// access to the rest of the graph, so they can be unit-tested in
/// isolation. Any `Fn(&NodeContext) -> Result<Vec<TensorType>, InferError>`
/// is a rule.
pub trait InferenceRule: Send + Sync {
    /// Types of the node's outputs, in slot order. May be shorter than the
    /// output list; trailing outputs are then left untyped.
    fn infer(&self, ctx: &NodeContext<'_>) -> Result<Vec<TensorType>, InferError>;

    /// Output values, for rules that can evaluate small integer tensors
    /// (shape arithmetic). `None` entries are outputs that stay symbolic.
    fn fold(&self, _ctx: &NodeContext<'_>) -> Option<Vec<Option<Initializer>>> {
        None
    }
}

impl<F> InferenceRule for F
where
    F: Fn(&NodeContext<'_>) -> Result<Vec<TensorType>, InferError> + Send + Sync,
{
    fn infer(&self, ctx: &NodeContext<'_>) -> Result<Vec<TensorType>, InferError> {
        self(ctx)
    }
}

/// Maps default-domain op types to rules.
///
/// New operators are supported by registering a rule; the driver never
/// changes.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Arc<dyn InferenceRule>>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in rules.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        rules::register_defaults(&mut registry);
        registry
    }

    /// Registers `rule` for `op_type`, returning the rule it replaced.
    pub fn register<R>(&mut self, op_type: &str, rule: R) -> Option<Arc<dyn InferenceRule>>
    where
        R: InferenceRule + 'static,
    {
        self.rules.insert(op_type.to_string(), Arc::new(rule))
    }

    /// Registers one rule under several op types.
    pub fn register_many<R>(&mut self, op_types: &[&str], rule: R)
    where
        R: InferenceRule + 'static,
    {
        let rule: Arc<dyn InferenceRule> = Arc::new(rule);
        for op in op_types {
            self.rules.insert(op.to_string(), Arc::clone(&rule));
        }
    }

    pub fn get(&self, op_type: &str) -> Option<&dyn InferenceRule> {
        self.rules.get(op_type).map(|r| r.as_ref())
    }

    pub fn contains(&self, op_type: &str) -> bool {
        self.rules.contains_key(op_type)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Registered op types, sorted.
    pub fn op_types(&self) -> Vec<&str> {
        let mut ops: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        ops.sort_unstable();
        ops
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("op_types", &self.op_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::Node;
    use tensor_meta::{ElemType, Shape};

    #[test]
    fn test_defaults_cover_core_ops() {
        let registry = RuleRegistry::with_defaults();
        for op in [
            "Add", "Relu", "Cast", "Equal", "Sum", "Reshape", "Transpose", "Flatten", "Squeeze",
            "Unsqueeze", "Concat", "Gather", "Pad", "Resize", "Upsample", "MatMul", "Gemm",
            "Shape", "Constant", "Conv", "ConvTranspose", "MaxPool", "AveragePool",
            "GlobalAveragePool", "GlobalMaxPool",
        ] {
            assert!(registry.contains(op), "missing rule for {op}");
        }
        assert!(!registry.contains("NoSuchOp"));
    }

    fn int8_scalar(_: &NodeContext<'_>) -> Result<Vec<TensorType>, InferError> {
        NodeContext::single(TensorType::new(ElemType::Int8, Shape::scalar()))
    }

    #[test]
    fn test_register_overrides() {
        let mut registry = RuleRegistry::with_defaults();
        let replaced = registry.register("Relu", int8_scalar);
        assert!(replaced.is_some());

        let node = Node::new("Relu", &["x"], &["y"]);
        let ctx = NodeContext::new(&node, vec![None], 13);
        let out = registry.get("Relu").unwrap().infer(&ctx).unwrap();
        assert_eq!(out[0].elem_type, Some(ElemType::Int8));
    }
}
