// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Structural validation of a model.
//!
//! # Checks (in order, first violation wins)
//! 1. Names are unique within the input, output and initializer lists, and
//!    every node output is assigned exactly once.
//! 2. All references resolve and the graph is acyclic.
//! 3. Nodes match their operator signature (arity, required attributes).
//! 4. The opset import list has no duplicate domains, only positive
//!    versions, and covers every domain a node uses.
//! 5. `ir_version` is in the supported range and high enough for the
//!    features in use.

use crate::graph::resolve;
use crate::model::ModelState;
use crate::node::canonical_domain;
use crate::{schema, ModelDescriptor, ValidationError};
use std::collections::{HashMap, HashSet};

/// First IR version that allows initializers absent from the input list.
pub const IR_VERSION_INITIALIZERS_NOT_INPUTS: i64 = 4;

/// Models below this version may omit the opset import list.
const IR_VERSION_OPSET_REQUIRED: i64 = 3;

/// Accepted `ir_version` range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub min_supported_ir_version: i64,
    pub max_supported_ir_version: i64,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_supported_ir_version: 1,
            max_supported_ir_version: 11,
        }
    }
}

/// Runs every structural check against `model`.
pub fn validate_model<S: ModelState>(
    model: &ModelDescriptor<S>,
    policy: &ValidationPolicy,
) -> Result<(), ValidationError> {
    check_unique_names(model)?;

    let graph = model.graph();
    resolve(
        graph.nodes(),
        graph.inputs(),
        graph.initializers(),
        graph.sparse_initializers(),
        graph.outputs(),
    )?;

    check_node_schemas(model)?;
    check_opsets(model)?;
    check_ir_version(model, policy)
}

fn check_unique_names<S: ModelState>(model: &ModelDescriptor<S>) -> Result<(), ValidationError> {
    let graph = model.graph();
    let lists = [
        ("input", graph.inputs().iter().map(|v| v.name.as_str()).collect::<Vec<_>>()),
        ("output", graph.outputs().iter().map(|v| v.name.as_str()).collect()),
        ("initializer", graph.initializers().iter().map(|i| i.name.as_str()).collect()),
    ];
    for (list, names) in &lists {
        let mut seen = HashSet::with_capacity(names.len());
        for name in names {
            if !seen.insert(*name) {
                return Err(ValidationError::DuplicateName {
                    list: *list,
                    name: name.to_string(),
                });
            }
        }
    }

    // Single assignment: node outputs may not shadow anything.
    let mut assigned: HashMap<&str, &'static str> = HashMap::new();
    for vi in graph.inputs() {
        assigned.insert(&vi.name, "a graph input");
    }
    for init in graph.initializers() {
        assigned.insert(&init.name, "an initializer");
    }
    for sparse in graph.sparse_initializers() {
        assigned.insert(crate::graph::sparse_name(sparse), "a sparse initializer");
    }
    for node in graph.nodes() {
        for out in node.present_outputs() {
            if let Some(existing) = assigned.insert(out, "another node output") {
                return Err(ValidationError::DuplicateProducer {
                    node: node.label().to_string(),
                    name: out.to_string(),
                    existing,
                });
            }
        }
    }
    Ok(())
}

fn check_node_schemas<S: ModelState>(model: &ModelDescriptor<S>) -> Result<(), ValidationError> {
    for node in model.graph().nodes() {
        let malformed = |detail: String| ValidationError::MalformedNode {
            node: node.label().to_string(),
            op_type: node.op_type.clone(),
            detail,
        };
        if node.op_type.is_empty() {
            return Err(malformed("empty op_type".into()));
        }
        if !node.is_default_domain() {
            continue;
        }
        if let Some(schema) = schema::lookup(&node.op_type) {
            schema.check(node).map_err(malformed)?;
        }
    }
    Ok(())
}

fn check_opsets<S: ModelState>(model: &ModelDescriptor<S>) -> Result<(), ValidationError> {
    let mut domains = HashSet::new();
    for op in model.opset_import() {
        let domain = canonical_domain(&op.domain);
        if !domains.insert(domain) {
            return Err(ValidationError::Opset(format!(
                "domain '{}' imported more than once",
                op.domain
            )));
        }
        if op.version < 1 {
            return Err(ValidationError::Opset(format!(
                "domain '{}' has non-positive version {}",
                op.domain, op.version
            )));
        }
    }

    if model.opset_import().is_empty() && model.ir_version() < IR_VERSION_OPSET_REQUIRED {
        return Ok(());
    }
    for node in model.graph().nodes() {
        let domain = canonical_domain(&node.domain);
        if !domains.contains(domain) {
            let shown = if domain.is_empty() { "ai.onnx" } else { domain };
            return Err(ValidationError::Opset(format!(
                "node '{}' uses domain '{shown}' which is not imported",
                node.label()
            )));
        }
    }
    Ok(())
}

fn check_ir_version<S: ModelState>(
    model: &ModelDescriptor<S>,
    policy: &ValidationPolicy,
) -> Result<(), ValidationError> {
    let version = model.ir_version();
    if version < policy.min_supported_ir_version || version > policy.max_supported_ir_version {
        return Err(ValidationError::IrVersion {
            version,
            detail: format!(
                "supported range is {}..={}",
                policy.min_supported_ir_version, policy.max_supported_ir_version
            ),
        });
    }

    let graph = model.graph();
    if version < IR_VERSION_INITIALIZERS_NOT_INPUTS {
        let input_names: HashSet<&str> = graph.inputs().iter().map(|v| v.name.as_str()).collect();
        if let Some(init) = graph
            .initializers()
            .iter()
            .find(|i| !input_names.contains(i.name.as_str()))
        {
            return Err(ValidationError::IrVersion {
                version,
                detail: format!(
                    "initializer '{}' is not a graph input, which requires ir_version >= {}",
                    init.name, IR_VERSION_INITIALIZERS_NOT_INPUTS
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Graph, Initializer, ModelError, Node, OpsetId, ValueInfo};
    use tensor_meta::{Dim, ElemType};

    fn x() -> ValueInfo {
        ValueInfo::tensor("x", ElemType::Float, vec![Dim::Known(1), Dim::Known(3)])
    }

    fn model(graph: Graph, ir_version: i64) -> ModelDescriptor {
        ModelDescriptor::new(ir_version, vec![OpsetId::onnx(13)], graph)
    }

    fn check(m: &ModelDescriptor) -> Result<(), ValidationError> {
        validate_model(m, &ValidationPolicy::default())
    }

    #[test]
    fn test_valid_model() {
        let graph = Graph::builder("ok")
            .input(x())
            .initializer(Initializer::from_f32("w", vec![1, 3], vec![1.0; 3]))
            .node(Node::new("Add", &["x", "w"], &["y"]))
            .output(ValueInfo::untyped("y"))
            .build()
            .unwrap();
        assert!(check(&model(graph, 7)).is_ok());
    }

    #[test]
    fn test_duplicate_input() {
        let graph = Graph::builder("dup").input(x()).input(x()).build().unwrap();
        match check(&model(graph, 7)) {
            Err(ValidationError::DuplicateName { list, name }) => {
                assert_eq!(list, "input");
                assert_eq!(name, "x");
            }
            other => panic!("expected duplicate, got {other:?}"),
        }
    }

    #[test]
    fn test_output_collides_with_initializer() {
        let graph = Graph::builder("collide")
            .input(x())
            .initializer(Initializer::from_f32("w", vec![1, 3], vec![1.0; 3]))
            .node(Node::new("Relu", &["x"], &["w"]).with_name("relu"))
            .build()
            .unwrap();
        match check(&model(graph, 7)) {
            Err(ValidationError::DuplicateProducer { node, name, existing }) => {
                assert_eq!(node, "relu");
                assert_eq!(name, "w");
                assert_eq!(existing, "an initializer");
            }
            other => panic!("expected collision, got {other:?}"),
        }
    }

    #[test]
    fn test_two_nodes_same_output() {
        let graph = Graph::builder("twice")
            .input(x())
            .node(Node::new("Relu", &["x"], &["y"]))
            .node(Node::new("Neg", &["x"], &["y"]))
            .build()
            .unwrap();
        assert!(matches!(
            check(&model(graph, 7)),
            Err(ValidationError::DuplicateProducer { .. })
        ));
    }

    #[test]
    fn test_dangling_after_input_removal() {
        let mut graph = Graph::builder("dangling")
            .input(x())
            .node(Node::new("Relu", &["x"], &["y"]))
            .build()
            .unwrap();
        graph.retain_inputs(|_| false);
        assert!(matches!(
            check(&model(graph, 7)),
            Err(ValidationError::Structure(ModelError::UnresolvedReference { .. }))
        ));
    }

    #[test]
    fn test_malformed_node() {
        let graph = Graph::builder("bad")
            .input(x())
            .node(Node::new("MaxPool", &["x"], &["y"]))
            .build()
            .unwrap();
        assert!(matches!(
            check(&model(graph, 7)),
            Err(ValidationError::MalformedNode { .. })
        ));
    }

    #[test]
    fn test_custom_domain_op_unchecked_but_must_be_imported() {
        let graph = Graph::builder("custom")
            .input(x())
            .node(Node::new("Fancy", &["x", "x", "x"], &["y"]).with_domain("com.example"))
            .build()
            .unwrap();
        let mut m = model(graph, 7);
        assert!(matches!(check(&m), Err(ValidationError::Opset(_))));
        m.opset_import.push(OpsetId::new("com.example", 1));
        assert!(check(&m).is_ok());
    }

    #[test]
    fn test_duplicate_opset_domain_alias() {
        let graph = Graph::builder("g").input(x()).build().unwrap();
        let m = ModelDescriptor::new(
            7,
            vec![OpsetId::onnx(13), OpsetId::new("ai.onnx", 12)],
            graph,
        );
        assert!(matches!(check(&m), Err(ValidationError::Opset(_))));
    }

    #[test]
    fn test_ir_version_out_of_range() {
        let graph = Graph::builder("g").input(x()).build().unwrap();
        assert!(matches!(
            check(&model(graph.clone(), 0)),
            Err(ValidationError::IrVersion { .. })
        ));
        assert!(matches!(
            check(&model(graph, 99)),
            Err(ValidationError::IrVersion { .. })
        ));
    }

    #[test]
    fn test_initializer_outside_inputs_needs_ir4() {
        let graph = Graph::builder("g")
            .input(x())
            .initializer(Initializer::from_f32("w", vec![1, 3], vec![1.0; 3]))
            .node(Node::new("Add", &["x", "w"], &["y"]))
            .build()
            .unwrap();
        assert!(matches!(
            check(&model(graph.clone(), 3)),
            Err(ValidationError::IrVersion { version: 3, .. })
        ));
        assert!(check(&model(graph, 4)).is_ok());
    }
}
