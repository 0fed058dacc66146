// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Input normalization: embedded constants are not graph inputs.

use model_ir::Graph;
use std::collections::HashSet;

/// Removes every declared input that names an initializer, preserving the
/// order of the rest. Returns the number of inputs removed.
///
/// Idempotent: a second call always returns 0.
pub fn normalize_inputs(graph: &mut Graph) -> usize {
    let constants: HashSet<String> = graph
        .initializers()
        .iter()
        .map(|init| init.name.clone())
        .collect();
    if constants.is_empty() {
        return 0;
    }
    let removed = graph.retain_inputs(|vi| !constants.contains(&vi.name));
    if removed > 0 {
        tracing::debug!("removed {removed} initializer(s) from the input list of '{}'", graph.name());
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{Initializer, Node, ValueInfo};
    use proptest::prelude::*;
    use tensor_meta::{Dim, ElemType};

    fn input(name: &str) -> ValueInfo {
        ValueInfo::tensor(name, ElemType::Float, vec![Dim::Known(4)])
    }

    #[test]
    fn test_removes_constants_keeps_order() {
        let mut graph = Graph::builder("g")
            .input(input("x"))
            .input(input("w"))
            .input(input("z"))
            .input(input("b"))
            .initializer(Initializer::from_f32("w", vec![4], vec![0.0; 4]))
            .initializer(Initializer::from_f32("b", vec![4], vec![0.0; 4]))
            .node(Node::new("Sum", &["x", "w", "z", "b"], &["y"]))
            .output(ValueInfo::untyped("y"))
            .build()
            .unwrap();

        assert_eq!(normalize_inputs(&mut graph), 2);
        let names: Vec<&str> = graph.inputs().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["x", "z"]);
        // The weights still resolve through the initializer list.
        assert!(graph.is_initializer("w"));
        assert_eq!(normalize_inputs(&mut graph), 0);
    }

    #[test]
    fn test_no_initializers() {
        let mut graph = Graph::builder("g")
            .input(input("x"))
            .node(Node::new("Relu", &["x"], &["y"]))
            .output(ValueInfo::untyped("y"))
            .build()
            .unwrap();
        assert_eq!(normalize_inputs(&mut graph), 0);
        assert_eq!(graph.inputs().len(), 1);
    }

    /// A graph with `n` inputs where the ones flagged in `constant` are
    /// also initializers, all summed into one output.
    fn graph_from_flags(constant: &[bool]) -> Graph {
        let names: Vec<String> = (0..constant.len()).map(|i| format!("v{i}")).collect();
        let mut builder = Graph::builder("prop");
        for (name, &is_const) in names.iter().zip(constant) {
            builder = builder.input(input(name));
            if is_const {
                builder = builder.initializer(Initializer::from_f32(name, vec![4], vec![1.0; 4]));
            }
        }
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        builder
            .node(Node::new("Sum", &refs, &["y"]))
            .output(ValueInfo::untyped("y"))
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(flags in proptest::collection::vec(any::<bool>(), 1..12)) {
            let mut once = graph_from_flags(&flags);
            let removed = normalize_inputs(&mut once);
            prop_assert_eq!(removed, flags.iter().filter(|&&c| c).count());

            let mut twice = once.clone();
            prop_assert_eq!(normalize_inputs(&mut twice), 0);
            prop_assert_eq!(&twice, &once);

            for vi in once.inputs() {
                prop_assert!(!once.is_initializer(&vi.name));
            }
        }
    }
}
