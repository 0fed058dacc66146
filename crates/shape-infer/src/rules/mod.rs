// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Built-in inference rules.
//!
//! | Module | Operators |
//! |---|---|
//! | [`elementwise`] | unary, broadcasting binary/variadic, comparison, `Cast`, normalization |
//! | [`shape_ops`] | `Reshape`, `Transpose`, `Flatten`, `Squeeze`/`Unsqueeze`, `Concat`, `Gather`, `Pad`, `Resize`/`Upsample`, `Shape`, `Constant`, reductions |
//! | [`linalg`] | `MatMul`, `Gemm` |
//! | [`spatial`] | `Conv`, `ConvTranspose`, pooling |

pub mod elementwise;
pub mod linalg;
pub mod shape_ops;
pub mod spatial;

use crate::RuleRegistry;
use tensor_meta::Dim;

/// Loads every built-in rule into `registry`.
pub fn register_defaults(registry: &mut RuleRegistry) {
    elementwise::register(registry);
    shape_ops::register(registry);
    linalg::register(registry);
    spatial::register(registry);
}

/// Product of a run of dimensions; unknown if any factor is or if the
/// product does not fit in `u64`.
pub(crate) fn product(dims: &[Dim]) -> Dim {
    dims.iter()
        .try_fold(1u64, |acc, d| d.value().and_then(|v| acc.checked_mul(v)))
        .map_or(Dim::Unknown, Dim::Known)
}
