// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Computation graph: operator nodes connected by named values.
//!
//! A [`Graph`] can only be obtained through [`GraphBuilder::build`] (or by
//! deserializing a model), which resolves every referenced name and
//! computes a topological order up front:
//!
//! ```text
//! GraphBuilder ── build() ──► Graph
//!                   │
//!                   ├─ index name → producer (input | initializer | sparse initializer | node slot)
//!                   ├─ every node input / graph output resolves, else UnresolvedReference
//!                   └─ iterative DFS over producers, else CyclicGraph
//! ```
//!
//! Nodes are immutable after construction, so the order stays valid for
//! the lifetime of the graph.

use crate::proto::{SparseTensorProto, TensorAnnotation};
use crate::{Initializer, ModelError, Node, TensorType, ValueInfo};
use tensor_meta::{ElemType, Shape};
use std::collections::HashMap;
use std::fmt;

/// What produces a named value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Producer {
    /// A runtime-supplied graph input.
    Input,
    /// An embedded constant, by position in [`Graph::initializers`].
    Initializer(usize),
    /// A sparse constant, by position in [`Graph::sparse_initializers`].
    SparseInitializer(usize),
    /// Output `slot` of node `node`.
    Node { node: usize, slot: usize },
}

/// The complete computation graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    name: String,
    doc_string: String,
    nodes: Vec<Node>,
    inputs: Vec<ValueInfo>,
    outputs: Vec<ValueInfo>,
    initializers: Vec<Initializer>,
    value_info: Vec<ValueInfo>,
    sparse_initializers: Vec<SparseTensorProto>,
    quantization_annotation: Vec<TensorAnnotation>,
    producers: HashMap<String, Producer>,
    order: Vec<usize>,
}

impl Graph {
    /// Starts building a graph with the given name.
    pub fn builder(name: impl Into<String>) -> GraphBuilder {
        GraphBuilder {
            name: name.into(),
            ..GraphBuilder::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc_string(&self) -> &str {
        &self.doc_string
    }

    /// Nodes in file order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Declared inputs, in order.
    pub fn inputs(&self) -> &[ValueInfo] {
        &self.inputs
    }

    /// Declared outputs, in order.
    pub fn outputs(&self) -> &[ValueInfo] {
        &self.outputs
    }

    pub fn initializers(&self) -> &[Initializer] {
        &self.initializers
    }

    /// Intermediate value types (declared in the file or attached by inference).
    pub fn value_info(&self) -> &[ValueInfo] {
        &self.value_info
    }

    /// Sparse constants, carried as decoded.
    pub fn sparse_initializers(&self) -> &[SparseTensorProto] {
        &self.sparse_initializers
    }

    pub fn quantization_annotation(&self) -> &[TensorAnnotation] {
        &self.quantization_annotation
    }

    /// O(1) lookup of whatever produces `name`.
    ///
    /// When a name is both an initializer and a declared input, the
    /// initializer wins.
    pub fn producer(&self, name: &str) -> Option<Producer> {
        self.producers.get(name).copied()
    }

    pub fn initializer(&self, name: &str) -> Option<&Initializer> {
        match self.producer(name)? {
            Producer::Initializer(i) => self.initializers.get(i),
            _ => None,
        }
    }

    pub fn is_initializer(&self, name: &str) -> bool {
        matches!(self.producer(name), Some(Producer::Initializer(_)))
    }

    /// Node indices in an order where every producer precedes its consumers.
    pub fn topological_order(&self) -> &[usize] {
        &self.order
    }

    /// Iterates over `(index, node)` in topological order.
    pub fn iter_topological(&self) -> impl Iterator<Item = (usize, &Node)> {
        self.order.iter().map(move |&i| (i, &self.nodes[i]))
    }

    /// Best known type of a value: declared input/output or recorded
    /// value-info first, then initializer metadata.
    pub fn value_type(&self, name: &str) -> Option<TensorType> {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .chain(&self.value_info)
            .find(|vi| vi.name == name)
            .map(|vi| vi.ty.clone())
            .or_else(|| match self.producer(name)? {
                Producer::Initializer(i) => self.initializers.get(i).map(Initializer::ty),
                Producer::SparseInitializer(i) => self.sparse_initializers.get(i).map(sparse_type),
                _ => None,
            })
    }

    /// Keeps only the declared inputs for which `keep` returns `true`,
    /// preserving their relative order. Returns the number removed.
    ///
    /// Removed names that are not also initializers drop out of the
    /// producer index, so consumers of them become dangling references
    /// that the validator reports.
    pub fn retain_inputs<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&ValueInfo) -> bool,
    {
        let before = self.inputs.len();
        let mut removed = Vec::new();
        self.inputs.retain(|vi| {
            let k = keep(vi);
            if !k {
                removed.push(vi.name.clone());
            }
            k
        });
        for name in removed {
            if self.producers.get(&name) == Some(&Producer::Input)
                && !self.inputs.iter().any(|vi| vi.name == name)
            {
                self.producers.remove(&name);
            }
        }
        before - self.inputs.len()
    }

    /// Attaches an inferred type to a value.
    ///
    /// Declared outputs are refined in place; any other non-input value is
    /// recorded in the intermediate value-info list (replacing an earlier
    /// entry of the same name). Declared inputs and values declared with a
    /// non-tensor type are never touched.
    pub fn record_value_info(&mut self, info: ValueInfo) {
        if self.inputs.iter().any(|vi| vi.name == info.name) {
            return;
        }
        let existing = self
            .outputs
            .iter_mut()
            .chain(self.value_info.iter_mut())
            .find(|vi| vi.name == info.name);
        match existing {
            Some(vi) if vi.opaque_type.is_some() => {}
            Some(vi) => vi.ty = info.ty,
            None => self.value_info.push(info),
        }
    }

    /// Returns a one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Graph '{}': {} nodes, {} inputs, {} outputs, {} initializers",
            self.name,
            self.nodes.len(),
            self.inputs.len(),
            self.outputs.len(),
            self.initializers.len(),
        )
    }

    /// Decomposes the graph back into a builder (used by serialization).
    pub fn to_builder(&self) -> GraphBuilder {
        GraphBuilder {
            name: self.name.clone(),
            doc_string: self.doc_string.clone(),
            nodes: self.nodes.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            initializers: self.initializers.clone(),
            value_info: self.value_info.clone(),
            sparse_initializers: self.sparse_initializers.clone(),
            quantization_annotation: self.quantization_annotation.clone(),
        }
    }
}

/// Declared type of a sparse constant: `values` element type, `dims` shape.
fn sparse_type(sparse: &SparseTensorProto) -> TensorType {
    let elem_type = sparse
        .values
        .as_ref()
        .and_then(|v| ElemType::from_code(v.data_type));
    let shape = sparse
        .dims
        .iter()
        .map(|&d| u64::try_from(d).ok())
        .collect::<Option<Vec<_>>>()
        .map(|dims| Shape::known(&dims));
    TensorType { elem_type, shape }
}

/// Value name of a sparse constant.
pub(crate) fn sparse_name(sparse: &SparseTensorProto) -> &str {
    sparse.values.as_ref().map_or("", |v| v.name.as_str())
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for (i, node) in self.iter_topological() {
            writeln!(f, "  [{i}] {}", node.summary())?;
        }
        Ok(())
    }
}

/// Accumulates graph parts before resolution.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    pub name: String,
    pub doc_string: String,
    pub nodes: Vec<Node>,
    pub inputs: Vec<ValueInfo>,
    pub outputs: Vec<ValueInfo>,
    pub initializers: Vec<Initializer>,
    pub value_info: Vec<ValueInfo>,
    pub sparse_initializers: Vec<SparseTensorProto>,
    pub quantization_annotation: Vec<TensorAnnotation>,
}

impl GraphBuilder {
    pub fn input(mut self, info: ValueInfo) -> Self {
        self.inputs.push(info);
        self
    }

    pub fn output(mut self, info: ValueInfo) -> Self {
        self.outputs.push(info);
        self
    }

    pub fn initializer(mut self, init: Initializer) -> Self {
        self.initializers.push(init);
        self
    }

    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn value_info(mut self, info: ValueInfo) -> Self {
        self.value_info.push(info);
        self
    }

    pub fn sparse_initializer(mut self, sparse: SparseTensorProto) -> Self {
        self.sparse_initializers.push(sparse);
        self
    }

    pub fn quantization_annotation(mut self, annotation: TensorAnnotation) -> Self {
        self.quantization_annotation.push(annotation);
        self
    }

    pub fn doc_string(mut self, doc: impl Into<String>) -> Self {
        self.doc_string = doc.into();
        self
    }

    /// Resolves references and orders the nodes.
    pub fn build(self) -> Result<Graph, ModelError> {
        let (producers, order) = resolve(
            &self.nodes,
            &self.inputs,
            &self.initializers,
            &self.sparse_initializers,
            &self.outputs,
        )?;
        tracing::debug!(
            "graph '{}' resolved: {} nodes, {} named values",
            self.name,
            self.nodes.len(),
            producers.len(),
        );
        Ok(Graph {
            name: self.name,
            doc_string: self.doc_string,
            nodes: self.nodes,
            inputs: self.inputs,
            outputs: self.outputs,
            initializers: self.initializers,
            value_info: self.value_info,
            sparse_initializers: self.sparse_initializers,
            quantization_annotation: self.quantization_annotation,
            producers,
            order,
        })
    }
}

/// Builds the producer index, checks that every reference resolves, and
/// computes a topological order.
///
/// First producer wins on name collisions (initializers, then sparse
/// initializers, then inputs, then node outputs in file order); collisions
/// themselves are a validation concern.
pub(crate) fn resolve(
    nodes: &[Node],
    inputs: &[ValueInfo],
    initializers: &[Initializer],
    sparse_initializers: &[SparseTensorProto],
    outputs: &[ValueInfo],
) -> Result<(HashMap<String, Producer>, Vec<usize>), ModelError> {
    let mut producers = HashMap::with_capacity(initializers.len() + inputs.len() + nodes.len());
    for (i, init) in initializers.iter().enumerate() {
        producers
            .entry(init.name.clone())
            .or_insert(Producer::Initializer(i));
    }
    for (i, sparse) in sparse_initializers.iter().enumerate() {
        let name = sparse_name(sparse);
        if !name.is_empty() {
            producers
                .entry(name.to_string())
                .or_insert(Producer::SparseInitializer(i));
        }
    }
    for vi in inputs {
        producers.entry(vi.name.clone()).or_insert(Producer::Input);
    }
    for (n, node) in nodes.iter().enumerate() {
        for (slot, out) in node.outputs.iter().enumerate() {
            if !out.is_empty() {
                producers
                    .entry(out.clone())
                    .or_insert(Producer::Node { node: n, slot });
            }
        }
    }

    // Dependencies of each node: (producer node, value name).
    let mut deps: Vec<Vec<(usize, &str)>> = Vec::with_capacity(nodes.len());
    for node in nodes {
        let mut d = Vec::new();
        for name in node.present_inputs() {
            match producers.get(name) {
                Some(Producer::Node { node: p, .. }) => d.push((*p, name)),
                Some(_) => {}
                None => {
                    return Err(ModelError::UnresolvedReference {
                        node: node.label().to_string(),
                        value: name.to_string(),
                    })
                }
            }
        }
        deps.push(d);
    }
    for vi in outputs {
        if !producers.contains_key(&vi.name) {
            return Err(ModelError::UnresolvedReference {
                node: "<graph output>".to_string(),
                value: vi.name.clone(),
            });
        }
    }

    let order = topological_sort(&deps)?;
    Ok((producers, order))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    Visiting,
    Done,
}

/// Iterative post-order DFS. A dependency found in the `Visiting` state
/// closes a cycle.
fn topological_sort(deps: &[Vec<(usize, &str)>]) -> Result<Vec<usize>, ModelError> {
    let mut color = vec![Color::Unvisited; deps.len()];
    let mut order = Vec::with_capacity(deps.len());
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..deps.len() {
        if color[start] != Color::Unvisited {
            continue;
        }
        color[start] = Color::Visiting;
        stack.push((start, 0));

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            if let Some(&(dep, value)) = deps[node].get(next) {
                frame.1 += 1;
                match color[dep] {
                    Color::Unvisited => {
                        color[dep] = Color::Visiting;
                        stack.push((dep, 0));
                    }
                    Color::Visiting => {
                        return Err(ModelError::CyclicGraph {
                            value: value.to_string(),
                        })
                    }
                    Color::Done => {}
                }
            } else {
                color[node] = Color::Done;
                order.push(node);
                stack.pop();
            }
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_meta::{Dim, ElemType};

    fn input(name: &str) -> ValueInfo {
        ValueInfo::tensor(name, ElemType::Float, vec![Dim::Known(1), Dim::Known(3)])
    }

    #[test]
    fn test_build_chain() {
        let graph = Graph::builder("chain")
            .input(input("x"))
            .node(Node::new("Relu", &["x"], &["a"]))
            .node(Node::new("Sigmoid", &["a"], &["y"]))
            .output(ValueInfo::untyped("y"))
            .build()
            .unwrap();
        assert_eq!(graph.topological_order(), &[0, 1]);
        assert_eq!(graph.producer("x"), Some(Producer::Input));
        assert_eq!(graph.producer("y"), Some(Producer::Node { node: 1, slot: 0 }));
    }

    #[test]
    fn test_topological_order_reorders_file_order() {
        // Consumer listed before its producer.
        let graph = Graph::builder("reordered")
            .input(input("x"))
            .node(Node::new("Sigmoid", &["a"], &["y"]))
            .node(Node::new("Relu", &["x"], &["a"]))
            .output(ValueInfo::untyped("y"))
            .build()
            .unwrap();
        assert_eq!(graph.topological_order(), &[1, 0]);
        let ops: Vec<_> = graph.iter_topological().map(|(_, n)| n.op_type.as_str()).collect();
        assert_eq!(ops, vec!["Relu", "Sigmoid"]);
    }

    #[test]
    fn test_two_node_cycle_rejected() {
        let result = Graph::builder("cycle")
            .node(Node::new("Relu", &["b"], &["a"]).with_name("A"))
            .node(Node::new("Relu", &["a"], &["b"]).with_name("B"))
            .build();
        assert!(matches!(result, Err(ModelError::CyclicGraph { .. })));
    }

    #[test]
    fn test_self_loop_rejected() {
        let result = Graph::builder("self")
            .input(input("x"))
            .node(Node::new("Add", &["x", "y"], &["y"]))
            .build();
        match result {
            Err(ModelError::CyclicGraph { value }) => assert_eq!(value, "y"),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_reference() {
        let result = Graph::builder("dangling")
            .input(input("x"))
            .node(Node::new("Add", &["x", "missing"], &["y"]).with_name("add"))
            .build();
        match result {
            Err(ModelError::UnresolvedReference { node, value }) => {
                assert_eq!(node, "add");
                assert_eq!(value, "missing");
            }
            other => panic!("expected unresolved reference, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_graph_output() {
        let result = Graph::builder("dangling-out")
            .input(input("x"))
            .output(ValueInfo::untyped("nowhere"))
            .build();
        assert!(matches!(result, Err(ModelError::UnresolvedReference { .. })));
    }

    #[test]
    fn test_optional_input_not_resolved() {
        let graph = Graph::builder("optional")
            .input(input("x"))
            .node(Node::new("Clip", &["x", "", ""], &["y"]))
            .build();
        assert!(graph.is_ok());
    }

    #[test]
    fn test_initializer_wins_over_input() {
        let graph = Graph::builder("shadow")
            .input(input("x"))
            .input(input("w"))
            .initializer(Initializer::from_f32("w", vec![1, 3], vec![0.0; 3]))
            .node(Node::new("Add", &["x", "w"], &["y"]))
            .build()
            .unwrap();
        assert_eq!(graph.producer("w"), Some(Producer::Initializer(0)));
        assert!(graph.is_initializer("w"));
        assert!(graph.initializer("x").is_none());
    }

    #[test]
    fn test_retain_inputs_preserves_order() {
        let mut graph = Graph::builder("retain")
            .input(input("a"))
            .input(input("w"))
            .input(input("b"))
            .initializer(Initializer::from_f32("w", vec![1, 3], vec![0.0; 3]))
            .build()
            .unwrap();
        let removed = graph.retain_inputs(|vi| !graph_is_w(vi));
        assert_eq!(removed, 1);
        let names: Vec<_> = graph.inputs().iter().map(|vi| vi.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(graph.is_initializer("w"));
    }

    fn graph_is_w(vi: &ValueInfo) -> bool {
        vi.name == "w"
    }

    #[test]
    fn test_record_value_info() {
        let mut graph = Graph::builder("record")
            .input(input("x"))
            .node(Node::new("Relu", &["x"], &["a"]))
            .node(Node::new("Relu", &["a"], &["y"]))
            .output(ValueInfo::untyped("y"))
            .build()
            .unwrap();
        let ty = input("ignored").ty;
        graph.record_value_info(ValueInfo::new("a", ty.clone()));
        graph.record_value_info(ValueInfo::new("y", ty.clone()));
        graph.record_value_info(ValueInfo::new("x", TensorType::unknown()));

        assert_eq!(graph.value_info().len(), 1);
        assert_eq!(graph.outputs()[0].ty, ty);
        assert_eq!(graph.inputs()[0].ty, ty);
        assert_eq!(graph.value_type("a"), Some(ty));
    }

    #[test]
    fn test_display_lists_nodes() {
        let graph = Graph::builder("disp")
            .input(input("x"))
            .node(Node::new("Relu", &["x"], &["y"]).with_name("r"))
            .build()
            .unwrap();
        let s = format!("{graph}");
        assert!(s.contains("Graph 'disp'"));
        assert!(s.contains("r (Relu)"));
    }
}
