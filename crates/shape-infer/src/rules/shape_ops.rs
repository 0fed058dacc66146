// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shape-transforming operators.
//!
//! Output dimensions come from attributes, constant inputs and whatever
//! input dimensions are known. A dimension that cannot be derived becomes
//! [`Dim::Unknown`]; only contradictions are errors.
//!
//! Exporters usually compute reshape targets at runtime
//! (`Shape → Gather → Unsqueeze → Concat → Reshape`). The rules on that
//! path also fold small `int64` tensors so the final `Reshape` sees a
//! constant target.

use super::elementwise::unary;
use super::product;
use crate::{InferError, InferenceRule, NodeContext, RuleRegistry};
use model_ir::{AttributeValue, Initializer, TensorData, TensorType};
use tensor_meta::{normalize_axis, Dim, ElemType, Shape, ShapeError};

type Output = Result<Vec<TensorType>, InferError>;
type RuleFn = fn(&NodeContext<'_>) -> Output;

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry.register("Reshape", Relayout(reshape));
    registry.register("Flatten", Relayout(flatten));
    registry.register("Squeeze", Relayout(squeeze));
    registry.register("Unsqueeze", Relayout(unsqueeze));
    registry.register("Identity", Relayout(unary));
    registry.register("Transpose", transpose);
    registry.register("Concat", Concat);
    registry.register("Gather", Gather);
    registry.register("Shape", ShapeOf);
    registry.register("Constant", ConstantRule);
    registry.register("ConstantOfShape", constant_of_shape);
    registry.register("Expand", expand);
    registry.register("Pad", pad);
    registry.register_many(&["Resize", "Upsample"], resize);
    registry.register("Slice", slice);
    registry.register("Split", split);
    registry.register_many(
        &["ReduceMean", "ReduceSum", "ReduceMax", "ReduceMin", "ReduceProd", "ReduceL2"],
        reduce,
    );
    registry.register_many(&["ArgMax", "ArgMin"], arg_reduce);
}

fn with_elem(ctx: &NodeContext<'_>, i: usize, shape: Shape) -> TensorType {
    TensorType {
        elem_type: ctx.input_elem(i),
        shape: Some(shape),
    }
}

fn known_extent(v: i64, name: &'static str) -> Result<Dim, InferError> {
    u64::try_from(v)
        .map(Dim::Known)
        .map_err(|_| InferError::invalid(name, format!("negative extent {v}")))
}

/// Integer values of constant input `i`, if it is an `int64` constant.
fn int64_constant(ctx: &NodeContext<'_>, i: usize) -> Option<Vec<i64>> {
    let c = ctx.constant(i)?;
    (c.elem_type == Some(ElemType::Int64)).then(|| c.to_i64_vec())?
}

fn folded(dims: Vec<u64>, values: Vec<i64>) -> Option<Vec<Option<Initializer>>> {
    Some(vec![Some(Initializer::from_i64("", dims, values))])
}

// ── Reshape family ─────────────────────────────────────────────────

/// Wraps a rule that only rearranges dimensions; folds `int64` constants
/// by carrying their values over to the new shape.
struct Relayout(RuleFn);

impl InferenceRule for Relayout {
    fn infer(&self, ctx: &NodeContext<'_>) -> Output {
        (self.0)(ctx)
    }

    fn fold(&self, ctx: &NodeContext<'_>) -> Option<Vec<Option<Initializer>>> {
        let values = int64_constant(ctx, 0)?;
        let out = (self.0)(ctx).ok()?;
        let dims = out.first()?.shape.as_ref()?.known_dims()?;
        folded(dims, values)
    }
}

pub fn reshape(ctx: &NodeContext<'_>) -> Output {
    let data = ctx.input_type(0)?;
    let target = if ctx.opset >= 5 || ctx.has_input(1) {
        ctx.constant_ints(1)
    } else {
        ctx.node.attr_ints("shape").map(<[i64]>::to_vec)
    };

    let Some(target) = target else {
        // Non-constant target: the rank is still the target's length.
        let rank = ctx
            .input(1)
            .and_then(|v| v.ty.shape.as_ref())
            .filter(|s| s.rank() == 1)
            .and_then(|s| s.dims()[0].value());
        return match rank {
            Some(r) => NodeContext::single(with_elem(ctx, 0, Shape::unknown(r as usize))),
            None => Err(InferError::invalid("shape", "target shape is not constant")),
        };
    };

    let allow_zero = ctx.attr_int("allowzero", 0) != 0;
    let input = data.shape.as_ref();
    let mut dims = Vec::with_capacity(target.len());
    let mut infer_at = None;
    for (i, &t) in target.iter().enumerate() {
        let d = match t {
            -1 => {
                if infer_at.replace(i).is_some() {
                    return Err(InferError::invalid("shape", "more than one -1"));
                }
                Dim::Unknown
            }
            0 if !allow_zero => match input {
                Some(s) => s
                    .dim(i)
                    .cloned()
                    .ok_or_else(|| InferError::invalid("shape", format!("0 at {i} exceeds input rank {}", s.rank())))?,
                None => Dim::Unknown,
            },
            t => known_extent(t, "shape")?,
        };
        dims.push(d);
    }

    if let Some(at) = infer_at {
        let rest: Vec<Dim> = dims
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != at)
            .map(|(_, d)| d.clone())
            .collect();
        if let (Some(total), Dim::Known(rest)) = (input.and_then(Shape::num_elements), product(&rest)) {
            if rest == 0 || total % rest != 0 {
                return Err(InferError::invalid(
                    "shape",
                    format!("cannot reshape {total} elements into {target:?}"),
                ));
            }
            dims[at] = Dim::Known(total / rest);
        }
    }

    NodeContext::single(with_elem(ctx, 0, Shape::new(dims)))
}

pub fn flatten(ctx: &NodeContext<'_>) -> Output {
    let shape = ctx.input_shape(0)?;
    let rank = shape.rank();
    let axis = ctx.attr_int("axis", 1);
    let resolved = if axis < 0 { axis + rank as i64 } else { axis };
    if !(0..=rank as i64).contains(&resolved) {
        return Err(ShapeError::AxisOutOfRange { axis, rank }.into());
    }
    let (outer, inner) = shape.dims().split_at(resolved as usize);
    NodeContext::single(with_elem(ctx, 0, Shape::new(vec![product(outer), product(inner)])))
}

pub fn squeeze(ctx: &NodeContext<'_>) -> Output {
    let shape = ctx.input_shape(0)?;
    let remove: Vec<usize> = match ctx.ints_operand("axes", 1, 13)? {
        Some(axes) => axes
            .iter()
            .map(|&a| shape.normalize_axis(a))
            .collect::<Result<_, _>>()?,
        None => {
            if !shape.is_fully_known() {
                return Err(InferError::invalid(
                    "axes",
                    "cannot squeeze dimensions of unknown extent",
                ));
            }
            (0..shape.rank()).filter(|&i| shape.dims()[i].is(1)).collect()
        }
    };
    for &i in &remove {
        if let Dim::Known(v) = shape.dims()[i] {
            if v != 1 {
                return Err(InferError::invalid(
                    "axes",
                    format!("dimension {i} has extent {v}"),
                ));
            }
        }
    }
    let dims = shape
        .dims()
        .iter()
        .enumerate()
        .filter(|(i, _)| !remove.contains(i))
        .map(|(_, d)| d.clone())
        .collect();
    NodeContext::single(with_elem(ctx, 0, dims))
}

pub fn unsqueeze(ctx: &NodeContext<'_>) -> Output {
    let shape = ctx.input_shape(0)?;
    let axes = ctx
        .ints_operand("axes", 1, 13)?
        .ok_or(InferError::MissingAttribute("axes"))?;
    let out_rank = shape.rank() + axes.len();
    let mut positions = axes
        .iter()
        .map(|&a| normalize_axis(a, out_rank))
        .collect::<Result<Vec<_>, _>>()?;
    positions.sort_unstable();
    if positions.windows(2).any(|w| w[0] == w[1]) {
        return Err(InferError::invalid("axes", "repeated axis"));
    }

    let mut src = shape.dims().iter();
    let dims = (0..out_rank)
        .map(|i| {
            if positions.binary_search(&i).is_ok() {
                Dim::Known(1)
            } else {
                src.next().cloned().unwrap_or(Dim::Unknown)
            }
        })
        .collect();
    NodeContext::single(with_elem(ctx, 0, dims))
}

pub fn transpose(ctx: &NodeContext<'_>) -> Output {
    let shape = ctx.input_shape(0)?;
    let rank = shape.rank();
    let perm: Vec<usize> = match ctx.node.attr_ints("perm") {
        Some(perm) => {
            let perm = perm
                .iter()
                .map(|&p| normalize_axis(p, rank))
                .collect::<Result<Vec<_>, _>>()?;
            let mut seen = vec![false; rank];
            for &p in &perm {
                if std::mem::replace(&mut seen[p], true) {
                    return Err(InferError::invalid("perm", format!("{perm:?} is not a permutation")));
                }
            }
            if perm.len() != rank {
                return Err(InferError::invalid("perm", format!("length {} for rank {rank}", perm.len())));
            }
            perm
        }
        None => (0..rank).rev().collect(),
    };
    let dims = perm.iter().map(|&p| shape.dims()[p].clone()).collect();
    NodeContext::single(with_elem(ctx, 0, dims))
}

// ── Concat / Gather ────────────────────────────────────────────────

struct Concat;

impl InferenceRule for Concat {
    fn infer(&self, ctx: &NodeContext<'_>) -> Output {
        let axis = ctx
            .node
            .attr_int("axis")
            .ok_or(InferError::MissingAttribute("axis"))?;
        let shapes = ctx
            .present_inputs()
            .map(|(i, _)| ctx.input_shape(i))
            .collect::<Result<Vec<_>, _>>()?;
        let first = *shapes.first().ok_or(InferError::MissingInput { index: 0 })?;
        let rank = first.rank();
        let ax = normalize_axis(axis, rank)?;

        let mut dims = first.dims().to_vec();
        for s in &shapes[1..] {
            let mismatch = || ShapeError::Incompatible {
                op: "concat",
                lhs: first.clone(),
                rhs: (*s).clone(),
            };
            if s.rank() != rank {
                return Err(mismatch().into());
            }
            for (j, d) in s.dims().iter().enumerate() {
                dims[j] = if j == ax {
                    match (&dims[j], d) {
                        (Dim::Known(a), Dim::Known(b)) => a.checked_add(*b).map_or(Dim::Unknown, Dim::Known),
                        _ => Dim::Unknown,
                    }
                } else {
                    dims[j].merge(d).ok_or_else(mismatch)?
                };
            }
        }

        let elem = ctx.present_inputs().find_map(|(_, v)| v.ty.elem_type);
        NodeContext::single(TensorType {
            elem_type: elem,
            shape: Some(Shape::new(dims)),
        })
    }

    /// Concatenation of 1-D `int64` constants.
    fn fold(&self, ctx: &NodeContext<'_>) -> Option<Vec<Option<Initializer>>> {
        let mut values = Vec::new();
        for (i, _) in ctx.present_inputs() {
            if ctx.constant(i)?.dims.len() != 1 {
                return None;
            }
            values.extend(int64_constant(ctx, i)?);
        }
        let len = values.len() as u64;
        folded(vec![len], values)
    }
}

struct Gather;

impl InferenceRule for Gather {
    fn infer(&self, ctx: &NodeContext<'_>) -> Output {
        let data = ctx.input_shape(0)?;
        let indices = ctx.input_shape(1)?;
        let axis = data.normalize_axis(ctx.attr_int("axis", 0))?;
        let dims: Vec<Dim> = data.dims()[..axis]
            .iter()
            .chain(indices.dims())
            .chain(&data.dims()[axis + 1..])
            .cloned()
            .collect();
        NodeContext::single(with_elem(ctx, 0, Shape::new(dims)))
    }

    /// Indexing into a 1-D `int64` constant.
    fn fold(&self, ctx: &NodeContext<'_>) -> Option<Vec<Option<Initializer>>> {
        let data = ctx.constant(0)?;
        if data.dims.len() != 1 {
            return None;
        }
        let values = int64_constant(ctx, 0)?;
        let indices = ctx.constant(1)?;
        let picked = indices
            .to_i64_vec()?
            .into_iter()
            .map(|i| {
                let n = values.len() as i64;
                let i = if i < 0 { i + n } else { i };
                usize::try_from(i).ok().and_then(|i| values.get(i).copied())
            })
            .collect::<Option<Vec<_>>>()?;
        folded(indices.dims.clone(), picked)
    }
}

// ── Shape / Constant ───────────────────────────────────────────────

struct ShapeOf;

impl ShapeOf {
    /// The `[start, end)` range of dimensions reported, clamped to the rank.
    fn range(ctx: &NodeContext<'_>, rank: usize) -> (usize, usize) {
        let r = rank as i64;
        let clamp = |v: i64| (if v < 0 { v + r } else { v }).clamp(0, r) as usize;
        let start = clamp(ctx.attr_int("start", 0));
        let end = clamp(ctx.attr_int("end", r));
        (start, end.max(start))
    }
}

impl InferenceRule for ShapeOf {
    fn infer(&self, ctx: &NodeContext<'_>) -> Output {
        let shape = ctx.input_shape(0)?;
        let (start, end) = Self::range(ctx, shape.rank());
        NodeContext::single(TensorType::new(
            ElemType::Int64,
            Shape::known(&[(end - start) as u64]),
        ))
    }

    fn fold(&self, ctx: &NodeContext<'_>) -> Option<Vec<Option<Initializer>>> {
        let shape = ctx.input_shape(0).ok()?;
        let (start, end) = Self::range(ctx, shape.rank());
        let values = shape.dims()[start..end]
            .iter()
            .map(|d| d.value().and_then(|v| i64::try_from(v).ok()))
            .collect::<Option<Vec<_>>>()?;
        folded(vec![values.len() as u64], values)
    }
}

struct ConstantRule;

impl ConstantRule {
    fn value(ctx: &NodeContext<'_>) -> Result<Initializer, InferError> {
        let node = ctx.node;
        let init = if let Some(t) = node.attr_tensor("value") {
            t.clone()
        } else if let Some(v) = node.attr_float("value_float") {
            Initializer::from_f32("", vec![], vec![v])
        } else if let Some(AttributeValue::Floats(v)) = node.attr("value_floats") {
            Initializer::from_f32("", vec![v.len() as u64], v.clone())
        } else if let Some(v) = node.attr_int("value_int") {
            Initializer::from_i64("", vec![], vec![v])
        } else if let Some(v) = node.attr_ints("value_ints") {
            Initializer::from_i64("", vec![v.len() as u64], v.to_vec())
        } else if let Some(s) = node.attr_str("value_string") {
            Initializer::new(
                "",
                ElemType::String,
                vec![],
                TensorData::Strings(vec![s.as_bytes().to_vec()]),
            )
        } else if let Some(AttributeValue::Strings(v)) = node.attr("value_strings") {
            Initializer::new(
                "",
                ElemType::String,
                vec![v.len() as u64],
                TensorData::Strings(v.iter().map(|s| s.as_bytes().to_vec()).collect()),
            )
        } else {
            return Err(InferError::MissingAttribute("value"));
        };
        Ok(init)
    }
}

impl InferenceRule for ConstantRule {
    fn infer(&self, ctx: &NodeContext<'_>) -> Output {
        NodeContext::single(Self::value(ctx)?.ty())
    }

    fn fold(&self, ctx: &NodeContext<'_>) -> Option<Vec<Option<Initializer>>> {
        Self::value(ctx).ok().map(|init| vec![Some(init)])
    }
}

pub fn constant_of_shape(ctx: &NodeContext<'_>) -> Output {
    let elem = ctx
        .node
        .attr_tensor("value")
        .and_then(|t| t.elem_type)
        .unwrap_or(ElemType::Float);
    let shape = match ctx.constant_ints(0) {
        Some(dims) => dims
            .into_iter()
            .map(|d| known_extent(d, "input"))
            .collect::<Result<Shape, _>>()?,
        None => {
            let len = ctx
                .input_shape(0)?
                .dims()
                .first()
                .and_then(Dim::value)
                .ok_or_else(|| InferError::invalid("input", "length of the shape is unknown"))?;
            Shape::unknown(len as usize)
        }
    };
    NodeContext::single(TensorType::new(elem, shape))
}

pub fn expand(ctx: &NodeContext<'_>) -> Output {
    let input = ctx.input_shape(0)?;
    let target = ctx
        .constant_ints(1)
        .ok_or_else(|| InferError::invalid("shape", "target shape is not constant"))?
        .into_iter()
        .map(|d| known_extent(d, "shape"))
        .collect::<Result<Shape, _>>()?;
    NodeContext::single(with_elem(ctx, 0, input.broadcast(&target)?))
}

// ── Pad / Resize / Slice / Split ───────────────────────────────────

pub fn pad(ctx: &NodeContext<'_>) -> Output {
    let shape = ctx.input_shape(0)?;
    let rank = shape.rank();
    let pads = match ctx.ints_operand("pads", 1, 11) {
        Ok(Some(p)) => p,
        Ok(None) => match ctx.node.attr_ints("paddings") {
            Some(p) => p.to_vec(),
            None => return Err(InferError::MissingAttribute("pads")),
        },
        // Runtime pads: only the rank survives.
        Err(_) => return NodeContext::single(with_elem(ctx, 0, Shape::unknown(rank))),
    };

    let axes: Vec<usize> = match ctx.constant_ints(3) {
        Some(axes) => axes
            .iter()
            .map(|&a| normalize_axis(a, rank))
            .collect::<Result<_, _>>()?,
        None => (0..rank).collect(),
    };
    if pads.len() != 2 * axes.len() {
        return Err(InferError::invalid(
            "pads",
            format!("expected {} values, found {}", 2 * axes.len(), pads.len()),
        ));
    }

    let mut dims = shape.dims().to_vec();
    for (k, &ax) in axes.iter().enumerate() {
        let delta = i128::from(pads[k]) + i128::from(pads[k + axes.len()]);
        dims[ax] = match &dims[ax] {
            Dim::Known(d) => {
                let extent = i128::from(*d) + delta;
                if extent < 0 {
                    return Err(InferError::invalid("pads", format!("negative extent {extent}")));
                }
                u64::try_from(extent).map_or(Dim::Unknown, Dim::Known)
            }
            d if delta == 0 => d.clone(),
            _ => Dim::Unknown,
        };
    }
    NodeContext::single(with_elem(ctx, 0, Shape::new(dims)))
}

/// `Resize` and `Upsample`: explicit sizes win over scales.
pub fn resize(ctx: &NodeContext<'_>) -> Output {
    let shape = ctx.input_shape(0)?;
    let rank = shape.rank();
    let upsample = ctx.node.op_type == "Upsample";

    let (scales_at, sizes_at) = if upsample || ctx.opset == 10 {
        (1, None)
    } else {
        (2, Some(3))
    };
    let axes: Vec<usize> = match ctx.node.attr_ints("axes") {
        Some(axes) => axes
            .iter()
            .map(|&a| normalize_axis(a, rank))
            .collect::<Result<_, _>>()?,
        None => (0..rank).collect(),
    };

    let mut dims = shape.dims().to_vec();
    let sizes = sizes_at.and_then(|i| ctx.constant_ints(i)).filter(|s| !s.is_empty());
    let scales = if upsample && ctx.opset < 9 && ctx.opset != 0 {
        ctx.node
            .attr("scales")
            .and_then(AttributeValue::as_floats)
            .map(<[f32]>::to_vec)
    } else {
        ctx.constant_floats(scales_at)
    }
    .filter(|s| !s.is_empty());

    if let Some(sizes) = sizes {
        if sizes.len() != axes.len() {
            return Err(InferError::invalid("sizes", format!("{} values for {} axes", sizes.len(), axes.len())));
        }
        for (&ax, &s) in axes.iter().zip(&sizes) {
            dims[ax] = known_extent(s, "sizes")?;
        }
    } else if let Some(scales) = scales {
        if scales.len() != axes.len() {
            return Err(InferError::invalid("scales", format!("{} values for {} axes", scales.len(), axes.len())));
        }
        for (&ax, &s) in axes.iter().zip(&scales) {
            dims[ax] = match dims[ax].value() {
                Some(d) => Dim::Known((d as f64 * f64::from(s)).floor() as u64),
                None if s == 1.0 => dims[ax].clone(),
                None => Dim::Unknown,
            };
        }
    } else {
        dims = vec![Dim::Unknown; rank];
    }
    NodeContext::single(with_elem(ctx, 0, Shape::new(dims)))
}

fn slice_extent(d: u64, start: i64, end: i64, step: i64) -> u64 {
    if d == 0 {
        return 0;
    }
    let d = i128::from(d);
    let (start, end, step) = (i128::from(start), i128::from(end), i128::from(step));
    let wrap = |v: i128| if v < 0 { v + d } else { v };
    let (start, end) = (wrap(start), wrap(end));
    let len = if step > 0 {
        let (s, e) = (start.clamp(0, d), end.clamp(0, d));
        (e - s + step - 1).div_euclid(step)
    } else {
        let (s, e) = (start.clamp(0, d - 1), end.clamp(-1, d - 1));
        (s - e - step - 1).div_euclid(-step)
    };
    u64::try_from(len.max(0)).unwrap_or(u64::MAX)
}

pub fn slice(ctx: &NodeContext<'_>) -> Output {
    let shape = ctx.input_shape(0)?;
    let rank = shape.rank();

    let operands = if ctx.opset >= 10 || ctx.has_input(1) {
        ctx.constant_ints(1).zip(ctx.constant_ints(2)).map(|(s, e)| {
            let axes = if ctx.has_input(3) { ctx.constant_ints(3) } else { None };
            let steps = if ctx.has_input(4) { ctx.constant_ints(4) } else { None };
            (s, e, axes, steps, ctx.has_input(3), ctx.has_input(4))
        })
    } else {
        let attr = |n| ctx.node.attr_ints(n).map(<[i64]>::to_vec);
        attr("starts").zip(attr("ends")).map(|(s, e)| (s, e, attr("axes"), None, false, false))
    };
    let Some((starts, ends, axes, steps, axes_given, steps_given)) = operands else {
        return NodeContext::single(with_elem(ctx, 0, Shape::unknown(rank)));
    };
    if (axes_given && axes.is_none()) || (steps_given && steps.is_none()) {
        return NodeContext::single(with_elem(ctx, 0, Shape::unknown(rank)));
    }

    let axes: Vec<usize> = match axes {
        Some(a) => a
            .iter()
            .map(|&a| normalize_axis(a, rank))
            .collect::<Result<_, _>>()?,
        None => (0..starts.len()).collect(),
    };
    let steps = steps.unwrap_or_else(|| vec![1; axes.len()]);
    if starts.len() != axes.len() || ends.len() != axes.len() || steps.len() != axes.len() {
        return Err(InferError::invalid("starts", "starts, ends, axes and steps differ in length"));
    }

    let mut dims = shape.dims().to_vec();
    for (k, &ax) in axes.iter().enumerate() {
        if steps[k] == 0 {
            return Err(InferError::invalid("steps", "step is zero"));
        }
        dims[ax] = match dims[ax].value() {
            Some(d) => Dim::Known(slice_extent(d, starts[k], ends[k], steps[k])),
            None => Dim::Unknown,
        };
    }
    NodeContext::single(with_elem(ctx, 0, Shape::new(dims)))
}

pub fn split(ctx: &NodeContext<'_>) -> Output {
    let shape = ctx.input_shape(0)?;
    let axis = shape.normalize_axis(ctx.attr_int("axis", 0))?;
    let outputs = ctx.node.outputs.len();
    if outputs == 0 {
        return Ok(Vec::new());
    }

    let parts: Vec<Dim> = match ctx.ints_operand("split", 1, 13) {
        Ok(Some(sizes)) => {
            if sizes.len() != outputs {
                return Err(InferError::invalid("split", format!("{} sizes for {outputs} outputs", sizes.len())));
            }
            sizes
                .into_iter()
                .map(|s| known_extent(s, "split"))
                .collect::<Result<_, _>>()?
        }
        Ok(None) => match shape.dims()[axis].value() {
            Some(d) => {
                let n = outputs as u64;
                let chunk = d.div_ceil(n);
                (0..n)
                    .map(|i| Dim::Known(chunk.min(d.saturating_sub(i * chunk))))
                    .collect()
            }
            None => vec![Dim::Unknown; outputs],
        },
        Err(_) => vec![Dim::Unknown; outputs],
    };

    Ok(parts
        .into_iter()
        .map(|p| {
            let mut dims = shape.dims().to_vec();
            dims[axis] = p;
            with_elem(ctx, 0, Shape::new(dims))
        })
        .collect())
}

// ── Reductions ─────────────────────────────────────────────────────

pub fn reduce(ctx: &NodeContext<'_>) -> Output {
    let shape = ctx.input_shape(0)?;
    let rank = shape.rank();
    let keep = ctx.attr_int("keepdims", 1) != 0;
    let since = if ctx.node.op_type == "ReduceSum" { 13 } else { 18 };

    let axes = match ctx.ints_operand("axes", 1, since) {
        Ok(axes) => axes,
        Err(_) if keep => return NodeContext::single(with_elem(ctx, 0, Shape::unknown(rank))),
        Err(e) => return Err(e),
    };
    let axes: Vec<usize> = match axes {
        Some(a) if !a.is_empty() => a
            .iter()
            .map(|&a| normalize_axis(a, rank))
            .collect::<Result<_, _>>()?,
        _ if ctx.attr_int("noop_with_empty_axes", 0) != 0 => return unary(ctx),
        _ => (0..rank).collect(),
    };

    let dims = reduced(shape, &axes, keep);
    NodeContext::single(with_elem(ctx, 0, dims))
}

pub fn arg_reduce(ctx: &NodeContext<'_>) -> Output {
    let shape = ctx.input_shape(0)?;
    let axis = shape.normalize_axis(ctx.attr_int("axis", 0))?;
    let keep = ctx.attr_int("keepdims", 1) != 0;
    NodeContext::single(TensorType::new(ElemType::Int64, reduced(shape, &[axis], keep)))
}

fn reduced(shape: &Shape, axes: &[usize], keep: bool) -> Shape {
    shape
        .dims()
        .iter()
        .enumerate()
        .filter_map(|(i, d)| match (axes.contains(&i), keep) {
            (false, _) => Some(d.clone()),
            (true, true) => Some(Dim::Known(1)),
            (true, false) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{constant, ctx, float, known, shape_of, view};
    use model_ir::Node;

    fn dims(d: &[u64]) -> Vec<Dim> {
        d.iter().map(|&v| Dim::Known(v)).collect()
    }

    #[test]
    fn test_reshape_zero_and_minus_one() {
        let node = Node::new("Reshape", &["x", "s"], &["y"]);
        let s = Initializer::from_i64("s", vec![3], vec![0, -1, 4]);
        let out = reshape(&ctx(&node, vec![view("x", known(&[2, 3, 8])), constant(&s)])).unwrap();
        assert_eq!(shape_of(&out[0]), dims(&[2, 6, 4]));
    }

    #[test]
    fn test_reshape_unknown_input_dim() {
        let node = Node::new("Reshape", &["x", "s"], &["y"]);
        let s = Initializer::from_i64("s", vec![2], vec![-1, 768]);
        let x = float(&[Dim::from("N"), Dim::Known(12), Dim::Known(64)]);
        let out = reshape(&ctx(&node, vec![view("x", x), constant(&s)])).unwrap();
        assert_eq!(shape_of(&out[0]), vec![Dim::Unknown, Dim::Known(768)]);
    }

    #[test]
    fn test_reshape_indivisible() {
        let node = Node::new("Reshape", &["x", "s"], &["y"]);
        let s = Initializer::from_i64("s", vec![2], vec![-1, 5]);
        assert!(reshape(&ctx(&node, vec![view("x", known(&[2, 3])), constant(&s)])).is_err());
    }

    #[test]
    fn test_reshape_runtime_target_keeps_rank() {
        let node = Node::new("Reshape", &["x", "s"], &["y"]);
        let s = TensorType::new(ElemType::Int64, Shape::known(&[3]));
        let out = reshape(&ctx(&node, vec![view("x", known(&[6])), view("s", s)])).unwrap();
        assert_eq!(shape_of(&out[0]), vec![Dim::Unknown; 3]);
    }

    #[test]
    fn test_transpose_default_and_perm() {
        let node = Node::new("Transpose", &["x"], &["y"]);
        let out = transpose(&ctx(&node, vec![view("x", known(&[1, 2, 3]))])).unwrap();
        assert_eq!(shape_of(&out[0]), dims(&[3, 2, 1]));

        let node = node.with_attr("perm", vec![0i64, 2, 3, 1]);
        let out = transpose(&ctx(&node, vec![view("x", known(&[1, 3, 224, 224]))])).unwrap();
        assert_eq!(shape_of(&out[0]), dims(&[1, 224, 224, 3]));
    }

    #[test]
    fn test_transpose_bad_perm() {
        let node = Node::new("Transpose", &["x"], &["y"]).with_attr("perm", vec![0i64, 0]);
        assert!(transpose(&ctx(&node, vec![view("x", known(&[1, 2]))])).is_err());
    }

    #[test]
    fn test_flatten() {
        let node = Node::new("Flatten", &["x"], &["y"]);
        let out = flatten(&ctx(&node, vec![view("x", known(&[2, 3, 4]))])).unwrap();
        assert_eq!(shape_of(&out[0]), dims(&[2, 12]));

        let node = Node::new("Flatten", &["x"], &["y"]).with_attr("axis", 0i64);
        let out = flatten(&ctx(&node, vec![view("x", known(&[2, 3, 4]))])).unwrap();
        assert_eq!(shape_of(&out[0]), dims(&[1, 24]));
    }

    #[test]
    fn test_flatten_product_overflow() {
        let node = Node::new("Flatten", &["x"], &["y"]).with_attr("axis", 0i64);
        let out = flatten(&ctx(&node, vec![view("x", known(&[1 << 32, 1 << 32]))])).unwrap();
        assert_eq!(shape_of(&out[0]), vec![Dim::Known(1), Dim::Unknown]);
    }

    #[test]
    fn test_concat_extent_overflow() {
        let node = Node::new("Concat", &["a", "b"], &["y"]).with_attr("axis", 0i64);
        let out = Concat
            .infer(&ctx(&node, vec![view("a", known(&[u64::MAX])), view("b", known(&[1]))]))
            .unwrap();
        assert_eq!(shape_of(&out[0]), vec![Dim::Unknown]);
    }

    #[test]
    fn test_slice_extent_extreme_bounds() {
        assert_eq!(slice_extent(10, 0, i64::MAX, i64::MAX), 1);
        assert_eq!(slice_extent(10, i64::MIN, i64::MAX, 1), 10);
        assert_eq!(slice_extent(10, -1, i64::MIN, i64::MIN), 1);
    }

    #[test]
    fn test_squeeze_unsqueeze() {
        let node = Node::new("Squeeze", &["x", "a"], &["y"]);
        let axes = Initializer::from_i64("a", vec![1], vec![1]);
        let out = squeeze(&ctx(&node, vec![view("x", known(&[2, 1, 3])), constant(&axes)])).unwrap();
        assert_eq!(shape_of(&out[0]), dims(&[2, 3]));

        let node = Node::new("Unsqueeze", &["x", "a"], &["y"]);
        let axes = Initializer::from_i64("a", vec![2], vec![0, -1]);
        let out = unsqueeze(&ctx(&node, vec![view("x", known(&[2, 3])), constant(&axes)])).unwrap();
        assert_eq!(shape_of(&out[0]), dims(&[1, 2, 3, 1]));
    }

    #[test]
    fn test_squeeze_non_unit_axis() {
        let node = Node::new("Squeeze", &["x", "a"], &["y"]);
        let axes = Initializer::from_i64("a", vec![1], vec![0]);
        assert!(squeeze(&ctx(&node, vec![view("x", known(&[2, 1])), constant(&axes)])).is_err());
    }

    #[test]
    fn test_concat() {
        let node = Node::new("Concat", &["a", "b"], &["y"]).with_attr("axis", 1i64);
        let b = float(&[Dim::Known(2), Dim::Unknown]);
        let out = Concat
            .infer(&ctx(&node, vec![view("a", known(&[2, 3])), view("b", b)]))
            .unwrap();
        assert_eq!(shape_of(&out[0]), vec![Dim::Known(2), Dim::Unknown]);

        let out = Concat
            .infer(&ctx(&node, vec![view("a", known(&[2, 3])), view("b", known(&[2, 5]))]))
            .unwrap();
        assert_eq!(shape_of(&out[0]), dims(&[2, 8]));

        let bad = Concat.infer(&ctx(&node, vec![view("a", known(&[2, 3])), view("b", known(&[4, 5]))]));
        assert!(bad.is_err());
    }

    #[test]
    fn test_gather() {
        let node = Node::new("Gather", &["d", "i"], &["y"]).with_attr("axis", 1i64);
        let idx = TensorType::new(ElemType::Int64, Shape::known(&[4, 5]));
        let out = Gather
            .infer(&ctx(&node, vec![view("d", known(&[2, 3, 7])), view("i", idx)]))
            .unwrap();
        assert_eq!(shape_of(&out[0]), dims(&[2, 4, 5, 7]));
    }

    #[test]
    fn test_shape_fold_chain() {
        let x = float(&[Dim::Known(1), Dim::Known(3), Dim::from("H")]);
        let full = Node::new("Shape", &["x"], &["s"]);
        let c = ctx(&full, vec![view("x", x.clone())]);
        assert_eq!(
            ShapeOf.infer(&c).unwrap()[0],
            TensorType::new(ElemType::Int64, Shape::known(&[3]))
        );
        assert!(ShapeOf.fold(&c).is_none());

        let head = Node::new("Shape", &["x"], &["s"]).with_attr("end", 2i64);
        let folded = ShapeOf.fold(&ctx(&head, vec![view("x", x)])).unwrap();
        assert_eq!(folded[0].as_ref().unwrap().to_i64_vec(), Some(vec![1, 3]));

        let data = Initializer::from_i64("s", vec![3], vec![1, 3, 224]);
        let index = Initializer::from_i64("i", vec![], vec![-1]);
        let node = Node::new("Gather", &["s", "i"], &["g"]);
        let g = Gather.fold(&ctx(&node, vec![constant(&data), constant(&index)])).unwrap();
        let g = g[0].as_ref().unwrap();
        assert_eq!(g.to_i64_vec(), Some(vec![224]));
        assert!(g.dims.is_empty());
    }

    #[test]
    fn test_constant_attributes() {
        let node = Node::new("Constant", &[], &["c"]).with_attr("value_ints", vec![1i64, 2, 3]);
        let c = ctx(&node, vec![]);
        assert_eq!(
            ConstantRule.infer(&c).unwrap()[0],
            TensorType::new(ElemType::Int64, Shape::known(&[3]))
        );
        let folded = ConstantRule.fold(&c).unwrap();
        assert_eq!(folded[0].as_ref().unwrap().to_i64_vec(), Some(vec![1, 2, 3]));

        let none = Node::new("Constant", &[], &["c"]);
        assert!(ConstantRule.infer(&ctx(&none, vec![])).is_err());
    }

    #[test]
    fn test_pad() {
        let node = Node::new("Pad", &["x", "p"], &["y"]);
        let p = Initializer::from_i64("p", vec![8], vec![0, 0, 1, 2, 0, 0, 3, 4]);
        let x = float(&[Dim::from("N"), Dim::Known(3), Dim::Known(10), Dim::Known(10)]);
        let out = pad(&ctx(&node, vec![view("x", x), constant(&p)])).unwrap();
        assert_eq!(
            shape_of(&out[0]),
            vec![Dim::from("N"), Dim::Known(3), Dim::Known(14), Dim::Known(16)]
        );
    }

    #[test]
    fn test_pad_extreme_values() {
        let node = Node::new("Pad", &["x", "p"], &["y"]);
        let p = Initializer::from_i64("p", vec![2], vec![i64::MAX, i64::MAX]);
        let out = pad(&ctx(&node, vec![view("x", known(&[u64::MAX])), constant(&p)])).unwrap();
        assert_eq!(shape_of(&out[0]), vec![Dim::Unknown]);

        let p = Initializer::from_i64("p", vec![2], vec![i64::MIN, i64::MIN]);
        assert!(pad(&ctx(&node, vec![view("x", known(&[4])), constant(&p)])).is_err());
    }

    #[test]
    fn test_resize_scales_and_sizes() {
        let node = Node::new("Resize", &["x", "", "s"], &["y"]);
        let s = Initializer::from_f32("s", vec![4], vec![1.0, 1.0, 2.0, 2.0]);
        let x = float(&[Dim::from("N"), Dim::Known(3), Dim::Known(16), Dim::Known(20)]);
        let out = resize(&ctx(&node, vec![view("x", x.clone()), None, constant(&s)])).unwrap();
        assert_eq!(
            shape_of(&out[0]),
            vec![Dim::from("N"), Dim::Known(3), Dim::Known(32), Dim::Known(40)]
        );

        let node = Node::new("Resize", &["x", "", "", "z"], &["y"]);
        let z = Initializer::from_i64("z", vec![4], vec![1, 3, 64, 64]);
        let out = resize(&ctx(&node, vec![view("x", x), None, None, constant(&z)])).unwrap();
        assert_eq!(shape_of(&out[0]), dims(&[1, 3, 64, 64]));
    }

    #[test]
    fn test_slice() {
        assert_eq!(slice_extent(10, 0, i64::MAX, 1), 10);
        assert_eq!(slice_extent(10, -3, i64::MAX, 1), 3);
        assert_eq!(slice_extent(10, 1, 9, 2), 4);
        assert_eq!(slice_extent(10, -1, i64::MIN, -1), 10);
        assert_eq!(slice_extent(10, 5, 2, 1), 0);

        let node = Node::new("Slice", &["x", "s", "e", "a"], &["y"]);
        let s = Initializer::from_i64("s", vec![1], vec![1]);
        let e = Initializer::from_i64("e", vec![1], vec![3]);
        let a = Initializer::from_i64("a", vec![1], vec![-1]);
        let out = slice(&ctx(
            &node,
            vec![view("x", known(&[4, 5])), constant(&s), constant(&e), constant(&a)],
        ))
        .unwrap();
        assert_eq!(shape_of(&out[0]), dims(&[4, 2]));
    }

    #[test]
    fn test_split_even() {
        let node = Node::new("Split", &["x"], &["a", "b", "c"]).with_attr("axis", 1i64);
        let out = split(&ctx(&node, vec![view("x", known(&[2, 7]))])).unwrap();
        let widths: Vec<_> = out.iter().map(|t| shape_of(t)[1].clone()).collect();
        assert_eq!(widths, dims(&[3, 3, 1]));
    }

    #[test]
    fn test_reduce_mean_keepdims() {
        let keep = Node::new("ReduceMean", &["x"], &["y"]).with_attr("axes", vec![2i64, 3]);
        let drop = keep.clone().with_attr("keepdims", 0i64);
        for (node, expected) in [(&keep, dims(&[1, 8, 1, 1])), (&drop, dims(&[1, 8]))] {
            let c = NodeContext::new(node, vec![view("x", known(&[1, 8, 7, 7]))], 13);
            assert_eq!(shape_of(&reduce(&c).unwrap()[0]), expected);
        }
    }
}
