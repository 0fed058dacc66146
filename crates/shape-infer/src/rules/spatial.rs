// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Convolution and pooling over `[N, C, D1, ..., Dn]` tensors.
//!
//! Per spatial axis, with kernel `k`, stride `s`, dilation `d` and pads
//! `pb`/`pe`:
//!
//! ```text
//! NOTSET      out = floor((in + pb + pe - d*(k-1) - 1) / s) + 1   (ceil with ceil_mode)
//! VALID       out = ceil((in - d*(k-1)) / s)
//! SAME_*      out = ceil(in / s)
//! transposed  out = s*(in-1) + output_padding + d*(k-1) + 1 - pb - pe
//! ```

use crate::{InferError, NodeContext, RuleRegistry};
use model_ir::TensorType;
use tensor_meta::{Dim, ElemType, Shape};

type Output = Result<Vec<TensorType>, InferError>;

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry.register("Conv", conv);
    registry.register("ConvTranspose", conv_transpose);
    registry.register_many(&["MaxPool", "AveragePool", "LpPool"], pool);
    registry.register_many(&["GlobalAveragePool", "GlobalMaxPool", "GlobalLpPool"], global_pool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AutoPad {
    NotSet,
    Valid,
    Same,
}

/// Window parameters of one node, resolved to one entry per spatial axis.
#[derive(Debug)]
struct Window {
    kernel: Vec<u64>,
    strides: Vec<u64>,
    dilations: Vec<u64>,
    /// Begin pads followed by end pads.
    pads: Vec<i64>,
    auto_pad: AutoPad,
}

impl Window {
    fn from_node(ctx: &NodeContext<'_>, kernel: Vec<u64>) -> Result<Self, InferError> {
        let n = kernel.len();
        let per_axis = |name: &'static str, default: u64| -> Result<Vec<u64>, InferError> {
            match ctx.node.attr_ints(name) {
                None => Ok(vec![default; n]),
                Some(v) if v.len() == n && v.iter().all(|&x| x >= 1) => {
                    Ok(v.iter().map(|&x| x as u64).collect())
                }
                Some(v) => Err(InferError::invalid(name, format!("{v:?} for {n} spatial axes"))),
            }
        };
        let strides = per_axis("strides", 1)?;
        let dilations = per_axis("dilations", 1)?;

        let pads = match ctx.node.attr_ints("pads") {
            None => vec![0; 2 * n],
            Some(p) if p.len() == 2 * n => p.to_vec(),
            Some(p) => return Err(InferError::invalid("pads", format!("{p:?} for {n} spatial axes"))),
        };
        let auto_pad = match ctx.node.attr_str("auto_pad").unwrap_or("NOTSET") {
            "NOTSET" => AutoPad::NotSet,
            "VALID" => AutoPad::Valid,
            "SAME_UPPER" | "SAME_LOWER" => AutoPad::Same,
            other => return Err(InferError::invalid("auto_pad", other)),
        };

        Ok(Self {
            kernel,
            strides,
            dilations,
            pads,
            auto_pad,
        })
    }

    fn effective_kernel(&self, axis: usize) -> i128 {
        i128::from(self.dilations[axis]) * (i128::from(self.kernel[axis]) - 1) + 1
    }

    /// Output extent of spatial `axis` for a forward window.
    fn forward(&self, axis: usize, input: &Dim, ceil_mode: bool) -> Result<Dim, InferError> {
        let Some(size) = input.value() else {
            return Ok(Dim::Unknown);
        };
        let size = i128::from(size);
        let stride = i128::from(self.strides[axis]);
        let k = self.effective_kernel(axis);
        let n = self.kernel.len();

        let out = match self.auto_pad {
            AutoPad::Same => (size + stride - 1) / stride,
            AutoPad::Valid => (size - k + stride).div_euclid(stride),
            AutoPad::NotSet => {
                let span = size + i128::from(self.pads[axis]) + i128::from(self.pads[axis + n]) - k;
                if span < 0 {
                    -1
                } else if ceil_mode {
                    (span + stride - 1) / stride + 1
                } else {
                    span / stride + 1
                }
            }
        };
        if out < 1 {
            return Err(InferError::invalid(
                "kernel_shape",
                format!("window {k} does not fit axis of extent {size}"),
            ));
        }
        Ok(u64::try_from(out).map_or(Dim::Unknown, Dim::Known))
    }
}

fn kernel_from_attr(ctx: &NodeContext<'_>) -> Result<Option<Vec<u64>>, InferError> {
    match ctx.node.attr_ints("kernel_shape") {
        None => Ok(None),
        Some(k) if k.iter().all(|&x| x >= 1) => Ok(Some(k.iter().map(|&x| x as u64).collect())),
        Some(k) => Err(InferError::invalid("kernel_shape", format!("{k:?}"))),
    }
}

/// `[N, C, spatial...]` input; rank must be at least 3.
fn image_input<'c>(ctx: &'c NodeContext<'_>) -> Result<&'c Shape, InferError> {
    let x = ctx.input_shape(0)?;
    if x.rank() < 3 {
        return Err(InferError::invalid("X", format!("rank {} has no spatial axes", x.rank())));
    }
    Ok(x)
}

pub fn conv(ctx: &NodeContext<'_>) -> Output {
    let x = image_input(ctx)?;
    let w = ctx.input_shape(1)?;
    let spatial = x.rank() - 2;
    if w.rank() != x.rank() {
        return Err(InferError::invalid("W", format!("rank {} for input rank {}", w.rank(), x.rank())));
    }

    let kernel = match kernel_from_attr(ctx)? {
        Some(k) => k,
        None => w.dims()[2..]
            .iter()
            .map(Dim::value)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| InferError::invalid("kernel_shape", "weight spatial dims are unknown"))?,
    };
    if kernel.len() != spatial {
        return Err(InferError::invalid("kernel_shape", format!("{} axes for {spatial} spatial axes", kernel.len())));
    }
    let window = Window::from_node(ctx, kernel)?;

    let mut dims = vec![x.dims()[0].clone(), w.dims()[0].clone()];
    for (axis, d) in x.dims()[2..].iter().enumerate() {
        dims.push(window.forward(axis, d, false)?);
    }
    NodeContext::single(TensorType {
        elem_type: ctx.input_elem(0),
        shape: Some(Shape::new(dims)),
    })
}

pub fn conv_transpose(ctx: &NodeContext<'_>) -> Output {
    let x = image_input(ctx)?;
    let w = ctx.input_shape(1)?;
    let spatial = x.rank() - 2;
    if w.rank() != x.rank() {
        return Err(InferError::invalid("W", format!("rank {} for input rank {}", w.rank(), x.rank())));
    }

    let group = ctx.attr_int("group", 1).max(1) as u64;
    let channels = match w.dims()[1].value() {
        Some(c) => c.checked_mul(group).map_or(Dim::Unknown, Dim::Known),
        None => Dim::Unknown,
    };
    let mut dims = vec![x.dims()[0].clone(), channels];

    if let Some(explicit) = ctx.node.attr_ints("output_shape") {
        if explicit.len() != spatial {
            return Err(InferError::invalid("output_shape", format!("{explicit:?}")));
        }
        for &e in explicit {
            dims.push(Dim::Known(u64::try_from(e).map_err(|_| InferError::invalid("output_shape", e.to_string()))?));
        }
        return NodeContext::single(TensorType {
            elem_type: ctx.input_elem(0),
            shape: Some(Shape::new(dims)),
        });
    }

    let kernel = match kernel_from_attr(ctx)? {
        Some(k) => k,
        None => w.dims()[2..]
            .iter()
            .map(Dim::value)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| InferError::invalid("kernel_shape", "weight spatial dims are unknown"))?,
    };
    if kernel.len() != spatial {
        return Err(InferError::invalid("kernel_shape", format!("{} axes for {spatial} spatial axes", kernel.len())));
    }
    let window = Window::from_node(ctx, kernel)?;
    let output_padding = ctx
        .node
        .attr_ints("output_padding")
        .map(<[i64]>::to_vec)
        .unwrap_or_else(|| vec![0; spatial]);

    for (axis, d) in x.dims()[2..].iter().enumerate() {
        let Some(size) = d.value() else {
            dims.push(Dim::Unknown);
            continue;
        };
        let size = i128::from(size);
        let stride = i128::from(window.strides[axis]);
        let out = if window.auto_pad == AutoPad::Same {
            size * stride
        } else {
            let pads = i128::from(window.pads[axis]) + i128::from(window.pads[axis + spatial]);
            let extra = i128::from(output_padding.get(axis).copied().unwrap_or(0));
            stride * (size - 1) + extra + window.effective_kernel(axis) - pads
        };
        if out < 1 {
            return Err(InferError::invalid("pads", format!("output extent {out} on axis {axis}")));
        }
        dims.push(u64::try_from(out).map_or(Dim::Unknown, Dim::Known));
    }
    NodeContext::single(TensorType {
        elem_type: ctx.input_elem(0),
        shape: Some(Shape::new(dims)),
    })
}

/// `MaxPool` / `AveragePool`; `MaxPool` also yields `int64` indices.
pub fn pool(ctx: &NodeContext<'_>) -> Output {
    let x = image_input(ctx)?;
    let kernel = kernel_from_attr(ctx)?.ok_or(InferError::MissingAttribute("kernel_shape"))?;
    if kernel.len() != x.rank() - 2 {
        return Err(InferError::invalid("kernel_shape", format!("{} axes for input rank {}", kernel.len(), x.rank())));
    }
    let window = Window::from_node(ctx, kernel)?;
    let ceil_mode = ctx.attr_int("ceil_mode", 0) != 0;

    let mut dims = x.dims()[..2].to_vec();
    for (axis, d) in x.dims()[2..].iter().enumerate() {
        dims.push(window.forward(axis, d, ceil_mode)?);
    }
    let shape = Shape::new(dims);
    let out = TensorType {
        elem_type: ctx.input_elem(0),
        shape: Some(shape.clone()),
    };
    if ctx.node.op_type == "MaxPool" {
        Ok(vec![out, TensorType::new(ElemType::Int64, shape)])
    } else {
        NodeContext::single(out)
    }
}

pub fn global_pool(ctx: &NodeContext<'_>) -> Output {
    let x = image_input(ctx)?;
    let mut dims = x.dims()[..2].to_vec();
    dims.resize(x.rank(), Dim::Known(1));
    NodeContext::single(TensorType {
        elem_type: ctx.input_elem(0),
        shape: Some(Shape::new(dims)),
    })
}
