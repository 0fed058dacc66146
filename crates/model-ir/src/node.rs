// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator nodes.
//!
//! A [`Node`] references its operands and results by *name*; the owning
//! [`crate::Graph`] resolves those names to producers. Once placed in a
//! graph a node is never mutated: passes only attach type information to
//! the values it produces.

use crate::{AttributeValue, Attributes, Initializer};

/// Domain aliases that denote the default ONNX operator set.
const DEFAULT_DOMAIN_ALIAS: &str = "ai.onnx";

/// Maps `"ai.onnx"` to the canonical empty default domain.
pub fn canonical_domain(domain: &str) -> &str {
    if domain == DEFAULT_DOMAIN_ALIAS {
        ""
    } else {
        domain
    }
}

/// A single operator invocation in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Optional node name; may be empty.
    pub name: String,
    /// Operator type (e.g. `"Conv"`).
    pub op_type: String,
    /// Operator set domain; empty for the default domain.
    pub domain: String,
    /// Input value names. An empty string marks an omitted optional input.
    pub inputs: Vec<String>,
    /// Output value names. An empty string marks an unused optional output.
    pub outputs: Vec<String>,
    pub attributes: Attributes,
    pub doc_string: String,
}

impl Node {
    /// Creates a default-domain node with no attributes.
    pub fn new(op_type: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            name: String::new(),
            op_type: op_type.to_string(),
            domain: String::new(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            attributes: Attributes::new(),
            doc_string: String::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_string();
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Returns `true` if the node belongs to the default operator set.
    pub fn is_default_domain(&self) -> bool {
        canonical_domain(&self.domain).is_empty()
    }

    /// The node name, falling back to its op type when unnamed.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.op_type
        } else {
            &self.name
        }
    }

    /// Returns the `i`-th input name, or `None` if absent or omitted.
    pub fn input(&self, i: usize) -> Option<&str> {
        self.inputs
            .get(i)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Iterates over the inputs actually supplied (non-empty names).
    pub fn present_inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Iterates over the outputs actually produced (non-empty names).
    pub fn present_outputs(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn attr(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn attr_int(&self, name: &str) -> Option<i64> {
        self.attr(name).and_then(AttributeValue::as_int)
    }

    pub fn attr_float(&self, name: &str) -> Option<f32> {
        self.attr(name).and_then(AttributeValue::as_float)
    }

    pub fn attr_ints(&self, name: &str) -> Option<&[i64]> {
        self.attr(name).and_then(AttributeValue::as_ints)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(AttributeValue::as_str)
    }

    pub fn attr_tensor(&self, name: &str) -> Option<&Initializer> {
        self.attr(name).and_then(AttributeValue::as_tensor)
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}) [{}] -> [{}]",
            self.label(),
            self.op_type,
            self.inputs.join(", "),
            self.outputs.join(", "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_inputs() {
        let node = Node::new("Clip", &["x", "", "max"], &["y"]);
        assert_eq!(node.input(0), Some("x"));
        assert_eq!(node.input(1), None);
        assert_eq!(node.input(2), Some("max"));
        assert_eq!(node.input(3), None);
        assert_eq!(node.present_inputs().collect::<Vec<_>>(), vec!["x", "max"]);
    }

    #[test]
    fn test_attributes() {
        let node = Node::new("Conv", &["x", "w"], &["y"])
            .with_attr("strides", vec![2i64, 2])
            .with_attr("group", 1i64)
            .with_attr("auto_pad", "SAME_UPPER");
        assert_eq!(node.attr_ints("strides"), Some(&[2i64, 2][..]));
        assert_eq!(node.attr_int("group"), Some(1));
        assert_eq!(node.attr_str("auto_pad"), Some("SAME_UPPER"));
        assert_eq!(node.attr_int("strides"), None);
        assert!(node.attr("pads").is_none());
    }

    #[test]
    fn test_label_and_domain() {
        let unnamed = Node::new("Relu", &["x"], &["y"]);
        assert_eq!(unnamed.label(), "Relu");
        assert!(unnamed.is_default_domain());

        let named = Node::new("Relu", &["x"], &["y"])
            .with_name("relu_1")
            .with_domain("ai.onnx");
        assert_eq!(named.label(), "relu_1");
        assert!(named.is_default_domain());

        let custom = Node::new("Foo", &[], &["y"]).with_domain("com.example");
        assert!(!custom.is_default_domain());
    }

    #[test]
    fn test_summary() {
        let node = Node::new("Add", &["a", "b"], &["c"]).with_name("add0");
        assert_eq!(node.summary(), "add0 (Add) [a, b] -> [c]");
    }
}
