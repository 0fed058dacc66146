// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Elementwise operators: the output shape is the input shape, or the
//! numpy broadcast of all input shapes.

use crate::{InferError, NodeContext, RuleRegistry};
use model_ir::TensorType;
use tensor_meta::{ElemType, Shape};

type Output = Result<Vec<TensorType>, InferError>;

const UNARY: &[&str] = &[
    "Abs", "Neg", "Relu", "LeakyRelu", "Elu", "Selu", "Sigmoid", "HardSigmoid", "HardSwish",
    "Tanh", "Exp", "Log", "Sqrt", "Reciprocal", "Floor", "Ceil", "Round", "Sign", "Erf", "Sin",
    "Cos", "Softplus", "Softsign", "Gelu", "Softmax", "LogSoftmax", "Clip", "LRN",
    "BatchNormalization", "InstanceNormalization", "LayerNormalization",
];

const BROADCAST: &[&str] = &[
    "Add", "Sub", "Mul", "Div", "Pow", "Mod", "PRelu", "And", "Or", "Xor", "Sum", "Max", "Min",
    "Mean", "BitShift",
];

const COMPARISON: &[&str] = &["Equal", "Greater", "GreaterOrEqual", "Less", "LessOrEqual"];

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry.register_many(UNARY, unary);
    registry.register_many(BROADCAST, broadcast);
    registry.register_many(COMPARISON, comparison);
    registry.register_many(&["Not", "IsNaN", "IsInf"], predicate);
    registry.register("Where", where_select);
    registry.register("Cast", cast);
    registry.register("CastLike", cast_like);
    registry.register("Dropout", dropout);
    registry.register("QuantizeLinear", quantize);
    registry.register("DequantizeLinear", dequantize);
}

/// Output 0 has exactly the type of input 0.
pub fn unary(ctx: &NodeContext<'_>) -> Output {
    let ty = ctx.input_type(0)?.clone();
    NodeContext::single(ty)
}

/// Broadcast of every supplied input's shape.
fn broadcast_shape(ctx: &NodeContext<'_>, inputs: &[usize]) -> Result<Shape, InferError> {
    let shapes = inputs
        .iter()
        .map(|&i| ctx.input_shape(i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Shape::broadcast_all(shapes)?)
}

fn present(ctx: &NodeContext<'_>) -> Vec<usize> {
    ctx.present_inputs().map(|(i, _)| i).collect()
}

/// First known element type among the inputs.
fn first_elem(ctx: &NodeContext<'_>, inputs: &[usize]) -> Option<ElemType> {
    inputs.iter().find_map(|&i| ctx.input_elem(i))
}

pub fn broadcast(ctx: &NodeContext<'_>) -> Output {
    let inputs = present(ctx);
    if inputs.is_empty() {
        return Err(InferError::MissingInput { index: 0 });
    }
    // Pow and BitShift keep the base's element type.
    let elem = ctx.input_elem(0).or_else(|| first_elem(ctx, &inputs));
    NodeContext::single(TensorType {
        elem_type: elem,
        shape: Some(broadcast_shape(ctx, &inputs)?),
    })
}

pub fn comparison(ctx: &NodeContext<'_>) -> Output {
    NodeContext::single(TensorType::new(
        ElemType::Bool,
        broadcast_shape(ctx, &[0, 1])?,
    ))
}

pub fn predicate(ctx: &NodeContext<'_>) -> Output {
    NodeContext::single(TensorType::new(ElemType::Bool, ctx.input_shape(0)?.clone()))
}

pub fn where_select(ctx: &NodeContext<'_>) -> Output {
    NodeContext::single(TensorType {
        elem_type: first_elem(ctx, &[1, 2]),
        shape: Some(broadcast_shape(ctx, &[0, 1, 2])?),
    })
}

pub fn cast(ctx: &NodeContext<'_>) -> Output {
    let to = ctx
        .node
        .attr_int("to")
        .ok_or(InferError::MissingAttribute("to"))?;
    let code = i32::try_from(to).map_err(|_| InferError::invalid("to", to.to_string()))?;
    let elem = ElemType::from_code(code)
        .ok_or_else(|| InferError::invalid("to", format!("unknown element type {to}")))?;
    NodeContext::single(TensorType {
        elem_type: Some(elem),
        shape: ctx.input_type(0)?.shape.clone(),
    })
}

pub fn cast_like(ctx: &NodeContext<'_>) -> Output {
    NodeContext::single(TensorType {
        elem_type: ctx.input_elem(1),
        shape: ctx.input_type(0)?.shape.clone(),
    })
}

/// Output plus an optional boolean mask of the same shape.
pub fn dropout(ctx: &NodeContext<'_>) -> Output {
    let ty = ctx.input_type(0)?.clone();
    let mask = TensorType {
        elem_type: Some(ElemType::Bool),
        shape: ty.shape.clone(),
    };
    Ok(vec![ty, mask])
}

/// Same shape as the input. The element type is the zero point's; without
/// one it is `output_dtype` (opset 21) or `uint8`.
pub fn quantize(ctx: &NodeContext<'_>) -> Output {
    let shape = ctx.input_type(0)?.shape.clone();
    let elem_type = match ctx.input_elem(2) {
        Some(t) => t,
        None if ctx.has_input(2) => {
            return NodeContext::single(TensorType {
                elem_type: None,
                shape,
            })
        }
        None => match ctx.attr_int("output_dtype", 0) {
            0 => ElemType::Uint8,
            code => i32::try_from(code)
                .ok()
                .and_then(ElemType::from_code)
                .ok_or_else(|| InferError::invalid("output_dtype", code.to_string()))?,
        },
    };
    NodeContext::single(TensorType {
        elem_type: Some(elem_type),
        shape,
    })
}

/// Same shape as the quantized input. Values are `float32` before opset
/// 19 and take the scale's type from then on.
pub fn dequantize(ctx: &NodeContext<'_>) -> Output {
    let elem_type = if ctx.opset >= 19 {
        ctx.input_elem(1)
    } else {
        Some(ElemType::Float)
    };
    NodeContext::single(TensorType {
        elem_type,
        shape: ctx.input_type(0)?.shape.clone(),
    })
}
