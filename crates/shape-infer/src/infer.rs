// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The propagation driver.
//!
//! Walks the graph in topological order, asks the registered rule for each
//! node's output types and merges them with whatever the model already
//! declares. The pass is best-effort: a node that cannot be typed becomes
//! a [`SkipRecord`] and the walk continues.

use crate::{InferError, InputView, NodeContext, RuleRegistry};
use model_ir::{Graph, Initializer, Node, TensorType, ValueInfo};
use std::collections::HashMap;
use std::fmt;

/// One node the pass could not (fully) type.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SkipRecord {
    /// Node name, or its first output when unnamed.
    pub node: String,
    pub op_type: String,
    pub reason: String,
}

impl fmt::Display for SkipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.node, self.op_type, self.reason)
    }
}

/// Outcome of one inference pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct InferenceReport {
    /// Number of values that received a type.
    pub inferred: usize,
    pub skipped: Vec<SkipRecord>,
}

impl InferenceReport {
    /// Returns `true` if no node was skipped.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} values inferred, {} nodes skipped",
            self.inferred,
            self.skipped.len()
        )
    }
}

/// Runs shape/type propagation with a configurable [`RuleRegistry`].
#[derive(Debug, Clone)]
pub struct ShapeInferencer {
    registry: RuleRegistry,
}

impl Default for ShapeInferencer {
    fn default() -> Self {
        Self::new(RuleRegistry::with_defaults())
    }
}

impl ShapeInferencer {
    pub fn new(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Mutable access for registering or overriding rules.
    pub fn registry_mut(&mut self) -> &mut RuleRegistry {
        &mut self.registry
    }

    /// Infers types for `graph` under default-domain opset `opset` and
    /// returns the annotated graph together with the diagnostics.
    pub fn run(&self, mut graph: Graph, opset: i64) -> (Graph, InferenceReport) {
        let report = self.run_in_place(&mut graph, opset);
        (graph, report)
    }

    /// Same as [`ShapeInferencer::run`] without moving the graph.
    pub fn run_in_place(&self, graph: &mut Graph, opset: i64) -> InferenceReport {
        let mut state = PassState::seed(graph);
        let mut report = InferenceReport::default();
        let mut records = Vec::new();

        for (_, node) in graph.iter_topological() {
            let label = node.label().to_string();
            let result = self.infer_node(graph, node, opset, &state);

            let (types, folded) = match result {
                Ok(out) => out,
                Err(e) => {
                    tracing::debug!(node = %label, op = %node.op_type, "skipped: {e}");
                    report.skipped.push(SkipRecord {
                        node: label,
                        op_type: node.op_type.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            for (slot, value) in folded.into_iter().enumerate() {
                if let (Some(mut value), Some(out)) = (value, node.outputs.get(slot)) {
                    if !out.is_empty() {
                        value.name = out.clone();
                        state.constants.insert(out.clone(), value);
                    }
                }
            }

            for (out, ty) in node.outputs.iter().zip(types) {
                if out.is_empty() || ty.is_unknown() {
                    continue;
                }
                let merged = match state.declared.get(out) {
                    None => ty,
                    Some(declared) => match declared.merge(&ty) {
                        Ok(merged) => merged,
                        Err(conflict) => {
                            tracing::debug!(node = %label, value = %out, "declared type kept: {conflict}");
                            report.skipped.push(SkipRecord {
                                node: label.clone(),
                                op_type: node.op_type.clone(),
                                reason: format!(
                                    "output '{out}': declared {declared} conflicts with inferred {ty}: {conflict}"
                                ),
                            });
                            state.known.insert(out.clone(), declared.clone());
                            continue;
                        }
                    },
                };
                tracing::trace!(value = %out, ty = %merged, "inferred");
                state.known.insert(out.clone(), merged.clone());
                records.push(ValueInfo::new(out.clone(), merged));
                report.inferred += 1;
            }
        }

        for info in records {
            graph.record_value_info(info);
        }
        report
    }

    /// Runs the rule for one node, returning output types and any folded
    /// output values.
    fn infer_node(
        &self,
        graph: &Graph,
        node: &Node,
        opset: i64,
        state: &PassState,
    ) -> Result<(Vec<TensorType>, Vec<Option<Initializer>>), InferError> {
        let no_rule = || InferError::NoRule {
            domain: node.domain.clone(),
            op_type: node.op_type.clone(),
        };
        if !node.is_default_domain() {
            return Err(no_rule());
        }
        let rule = self.registry.get(&node.op_type).ok_or_else(no_rule)?;

        let inputs = node
            .inputs
            .iter()
            .map(|name| {
                (!name.is_empty()).then(|| InputView {
                    name,
                    ty: state.type_of(name),
                    constant: graph
                        .initializer(name)
                        .or_else(|| state.constants.get(name.as_str())),
                })
            })
            .collect();
        let ctx = NodeContext::new(node, inputs, opset);

        let types = rule.infer(&ctx)?;
        let folded = rule.fold(&ctx).unwrap_or_default();
        Ok((types, folded))
    }
}

/// Everything the walk has learned so far.
struct PassState {
    /// Types of declared inputs, initializers and already inferred values.
    known: HashMap<String, TensorType>,
    /// Types the model declares for outputs and intermediate values.
    declared: HashMap<String, TensorType>,
    /// Values computed by folding small integer subgraphs.
    constants: HashMap<String, Initializer>,
}

impl PassState {
    fn seed(graph: &Graph) -> Self {
        let mut known = HashMap::new();
        for vi in graph.inputs() {
            known.insert(vi.name.clone(), vi.ty.clone());
        }
        // Initializer metadata overrides a same-named declared input.
        for init in graph.initializers() {
            known.insert(init.name.clone(), init.ty());
        }
        for values in graph.sparse_initializers().iter().filter_map(|s| s.values.as_ref()) {
            if let Some(ty) = graph.value_type(&values.name) {
                known.insert(values.name.clone(), ty);
            }
        }
        let declared = graph
            .outputs()
            .iter()
            .chain(graph.value_info())
            .filter(|vi| !vi.ty.is_unknown())
            .map(|vi| (vi.name.clone(), vi.ty.clone()))
            .collect();
        Self {
            known,
            declared,
            constants: HashMap::new(),
        }
    }

    fn type_of(&self, name: &str) -> TensorType {
        self.known
            .get(name)
            .or_else(|| self.declared.get(name))
            .cloned()
            .unwrap_or_default()
    }
}

/// Runs the built-in rules over `graph`.
pub fn infer_shapes(graph: Graph, opset: i64) -> (Graph, InferenceReport) {
    ShapeInferencer::default().run(graph, opset)
}
