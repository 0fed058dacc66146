// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator signatures for the default ONNX domain.
//!
//! Each entry gives the allowed input/output counts and the attributes that
//! must be present. Operators without an entry (custom domains, rare ops)
//! are accepted without signature checks.

use crate::Node;

const VARIADIC: usize = usize::MAX;

/// Arity bounds and mandatory attributes of one operator.
#[derive(Debug, Clone, Copy)]
pub struct OpSchema {
    pub op_type: &'static str,
    /// Inclusive `(min, max)` input count.
    pub inputs: (usize, usize),
    /// Inclusive `(min, max)` output count.
    pub outputs: (usize, usize),
    pub required_attributes: &'static [&'static str],
    /// Input slots below the minimum that may still be left empty.
    pub optional_inputs: &'static [usize],
}

const fn op(
    op_type: &'static str,
    inputs: (usize, usize),
    outputs: (usize, usize),
    required_attributes: &'static [&'static str],
) -> OpSchema {
    OpSchema {
        op_type,
        inputs,
        outputs,
        required_attributes,
        optional_inputs: &[],
    }
}

impl OpSchema {
    const fn with_optional_inputs(mut self, slots: &'static [usize]) -> Self {
        self.optional_inputs = slots;
        self
    }
}

const UNARY: (usize, usize) = (1, 1);
const BINARY: (usize, usize) = (2, 2);
const ONE: (usize, usize) = (1, 1);

static SCHEMAS: &[OpSchema] = &[
    // Elementwise unary
    op("Abs", UNARY, ONE, &[]),
    op("Neg", UNARY, ONE, &[]),
    op("Relu", UNARY, ONE, &[]),
    op("LeakyRelu", UNARY, ONE, &[]),
    op("Elu", UNARY, ONE, &[]),
    op("Selu", UNARY, ONE, &[]),
    op("Sigmoid", UNARY, ONE, &[]),
    op("HardSigmoid", UNARY, ONE, &[]),
    op("HardSwish", UNARY, ONE, &[]),
    op("Tanh", UNARY, ONE, &[]),
    op("Exp", UNARY, ONE, &[]),
    op("Log", UNARY, ONE, &[]),
    op("Sqrt", UNARY, ONE, &[]),
    op("Reciprocal", UNARY, ONE, &[]),
    op("Floor", UNARY, ONE, &[]),
    op("Ceil", UNARY, ONE, &[]),
    op("Round", UNARY, ONE, &[]),
    op("Sign", UNARY, ONE, &[]),
    op("Erf", UNARY, ONE, &[]),
    op("Sin", UNARY, ONE, &[]),
    op("Cos", UNARY, ONE, &[]),
    op("Softplus", UNARY, ONE, &[]),
    op("Softsign", UNARY, ONE, &[]),
    op("Gelu", UNARY, ONE, &[]),
    op("Not", UNARY, ONE, &[]),
    op("IsNaN", UNARY, ONE, &[]),
    op("Identity", UNARY, ONE, &[]),
    op("Softmax", UNARY, ONE, &[]),
    op("LogSoftmax", UNARY, ONE, &[]),
    op("Clip", (1, 3), ONE, &[]),
    op("Cast", UNARY, ONE, &["to"]),
    op("CastLike", BINARY, ONE, &[]),
    // Elementwise binary / variadic
    op("Add", BINARY, ONE, &[]),
    op("Sub", BINARY, ONE, &[]),
    op("Mul", BINARY, ONE, &[]),
    op("Div", BINARY, ONE, &[]),
    op("Pow", BINARY, ONE, &[]),
    op("Mod", BINARY, ONE, &[]),
    op("PRelu", BINARY, ONE, &[]),
    op("And", BINARY, ONE, &[]),
    op("Or", BINARY, ONE, &[]),
    op("Xor", BINARY, ONE, &[]),
    op("Equal", BINARY, ONE, &[]),
    op("Greater", BINARY, ONE, &[]),
    op("GreaterOrEqual", BINARY, ONE, &[]),
    op("Less", BINARY, ONE, &[]),
    op("LessOrEqual", BINARY, ONE, &[]),
    op("Sum", (1, VARIADIC), ONE, &[]),
    op("Max", (1, VARIADIC), ONE, &[]),
    op("Min", (1, VARIADIC), ONE, &[]),
    op("Mean", (1, VARIADIC), ONE, &[]),
    op("Where", (3, 3), ONE, &[]),
    // Shape manipulation
    op("Reshape", (1, 2), ONE, &[]),
    op("Transpose", UNARY, ONE, &[]),
    op("Flatten", UNARY, ONE, &[]),
    op("Squeeze", (1, 2), ONE, &[]),
    op("Unsqueeze", (1, 2), ONE, &[]),
    op("Concat", (1, VARIADIC), ONE, &["axis"]),
    op("Split", (1, 2), (1, VARIADIC), &[]),
    op("Slice", (1, 5), ONE, &[]),
    op("Gather", BINARY, ONE, &[]),
    op("Pad", (1, 4), ONE, &[]),
    op("Resize", (1, 4), ONE, &[]),
    op("Upsample", (1, 2), ONE, &[]),
    op("Expand", BINARY, ONE, &[]),
    op("Tile", BINARY, ONE, &[]),
    op("Shape", UNARY, ONE, &[]),
    op("Size", UNARY, ONE, &[]),
    op("Constant", (0, 0), ONE, &[]),
    op("ConstantOfShape", UNARY, ONE, &[]),
    op("Range", (3, 3), ONE, &[]),
    op("DepthToSpace", UNARY, ONE, &["blocksize"]),
    op("SpaceToDepth", UNARY, ONE, &["blocksize"]),
    // Linear algebra
    op("MatMul", BINARY, ONE, &[]),
    op("Gemm", (2, 3), ONE, &[]),
    op("Einsum", (1, VARIADIC), ONE, &["equation"]),
    // Spatial
    op("Conv", (2, 3), ONE, &[]),
    op("ConvTranspose", (2, 3), ONE, &[]),
    op("MaxPool", UNARY, (1, 2), &["kernel_shape"]),
    op("AveragePool", UNARY, ONE, &["kernel_shape"]),
    op("GlobalAveragePool", UNARY, ONE, &[]),
    op("GlobalMaxPool", UNARY, ONE, &[]),
    op("LRN", UNARY, ONE, &["size"]),
    // Normalization
    op("BatchNormalization", (5, 5), (1, 5), &[]),
    op("InstanceNormalization", (3, 3), ONE, &[]),
    op("LayerNormalization", (2, 3), (1, 3), &[]),
    op("Dropout", (1, 3), (1, 2), &[]),
    // Reductions
    op("ReduceMean", (1, 2), ONE, &[]),
    op("ReduceSum", (1, 2), ONE, &[]),
    op("ReduceMax", (1, 2), ONE, &[]),
    op("ReduceMin", (1, 2), ONE, &[]),
    op("ReduceProd", (1, 2), ONE, &[]),
    op("ArgMax", UNARY, ONE, &[]),
    op("ArgMin", UNARY, ONE, &[]),
    op("TopK", (1, 2), (2, 2), &[]),
    op("NonZero", UNARY, ONE, &[]),
    // Quantization
    op("QuantizeLinear", (2, 3), ONE, &[]),
    op("DequantizeLinear", (2, 3), ONE, &[]),
    // Control flow
    op("If", UNARY, (1, VARIADIC), &["then_branch", "else_branch"]),
    // Trip count `M` and `cond` may both be omitted.
    op("Loop", (2, VARIADIC), (1, VARIADIC), &["body"]).with_optional_inputs(&[0, 1]),
];

/// Looks up the signature of a default-domain operator.
pub fn lookup(op_type: &str) -> Option<&'static OpSchema> {
    SCHEMAS.iter().find(|s| s.op_type == op_type)
}

impl OpSchema {
    /// Checks `node` against this signature, returning a description of the
    /// first mismatch.
    ///
    /// Trailing empty names (omitted optional slots) do not count toward
    /// the maximum. The first `min` slots must be non-empty unless listed
    /// in `optional_inputs`.
    pub fn check(&self, node: &Node) -> Result<(), String> {
        check_arity("input", &node.inputs, self.inputs, self.optional_inputs)?;
        check_arity("output", &node.outputs, self.outputs, &[])?;
        for attr in self.required_attributes {
            if node.attr(attr).is_none() {
                return Err(format!("missing required attribute '{attr}'"));
            }
        }
        Ok(())
    }
}

fn check_arity(
    kind: &str,
    names: &[String],
    (min, max): (usize, usize),
    optional: &[usize],
) -> Result<(), String> {
    let used = names
        .iter()
        .rposition(|n| !n.is_empty())
        .map_or(0, |i| i + 1);
    if used > max {
        return Err(format!("expected at most {max} {kind}s, found {used}"));
    }
    if names.len() < min {
        let range = if max == VARIADIC {
            format!("at least {min}")
        } else if min == max {
            format!("exactly {min}")
        } else {
            format!("{min} to {max}")
        };
        return Err(format!("expected {range} {kind}s, found {used}"));
    }
    if let Some(slot) = (0..min).find(|&i| names[i].is_empty() && !optional.contains(&i)) {
        return Err(format!("{kind} {slot} is required but empty"));
    }
    Ok(())
}
