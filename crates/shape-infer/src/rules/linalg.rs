// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matrix products.

use crate::{InferError, NodeContext, RuleRegistry};
use model_ir::TensorType;
use tensor_meta::{Dim, Shape, ShapeError};

type Output = Result<Vec<TensorType>, InferError>;

pub(crate) fn register(registry: &mut RuleRegistry) {
    registry.register("MatMul", matmul);
    registry.register("Gemm", gemm);
}

fn contraction_mismatch(a: &Shape, b: &Shape, op: &'static str) -> InferError {
    ShapeError::Incompatible {
        op,
        lhs: a.clone(),
        rhs: b.clone(),
    }
    .into()
}

/// Numpy `matmul`: 1-D operands are promoted and the added axis removed
/// again; leading batch dimensions broadcast.
pub fn matmul(ctx: &NodeContext<'_>) -> Output {
    let a = ctx.input_shape(0)?;
    let b = ctx.input_shape(1)?;
    if a.rank() == 0 || b.rank() == 0 {
        return Err(contraction_mismatch(a, b, "matmul"));
    }

    let mut ad = a.dims().to_vec();
    let mut bd = b.dims().to_vec();
    let a_vec = ad.len() == 1;
    let b_vec = bd.len() == 1;
    if a_vec {
        ad.insert(0, Dim::Known(1));
    }
    if b_vec {
        bd.push(Dim::Known(1));
    }

    let (a_batch, a_mat) = ad.split_at(ad.len() - 2);
    let (b_batch, b_mat) = bd.split_at(bd.len() - 2);
    if a_mat[1].merge(&b_mat[0]).is_none() {
        return Err(contraction_mismatch(a, b, "matmul"));
    }

    let batch = Shape::new(a_batch.to_vec()).broadcast(&Shape::new(b_batch.to_vec()))?;
    let mut dims = batch.into_dims();
    if !a_vec {
        dims.push(a_mat[0].clone());
    }
    if !b_vec {
        dims.push(b_mat[1].clone());
    }

    NodeContext::single(TensorType {
        elem_type: ctx.input_elem(0).or_else(|| ctx.input_elem(1)),
        shape: Some(Shape::new(dims)),
    })
}

/// `Y = alpha * A' * B' + beta * C` with optional transposes.
pub fn gemm(ctx: &NodeContext<'_>) -> Output {
    let a = ctx.input_shape(0)?;
    let b = ctx.input_shape(1)?;
    if a.rank() != 2 || b.rank() != 2 {
        return Err(contraction_mismatch(a, b, "gemm"));
    }
    let (m, ka) = if ctx.attr_int("transA", 0) != 0 {
        (&a.dims()[1], &a.dims()[0])
    } else {
        (&a.dims()[0], &a.dims()[1])
    };
    let (kb, n) = if ctx.attr_int("transB", 0) != 0 {
        (&b.dims()[1], &b.dims()[0])
    } else {
        (&b.dims()[0], &b.dims()[1])
    };
    if ka.merge(kb).is_none() {
        return Err(contraction_mismatch(a, b, "gemm"));
    }

    NodeContext::single(TensorType {
        elem_type: ctx.input_elem(0),
        shape: Some(Shape::new(vec![m.clone(), n.clone()])),
    })
}
