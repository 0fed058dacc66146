// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for shape arithmetic.

use crate::Shape;

/// Errors that can occur while combining or indexing shapes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    /// Two shapes cannot be combined by the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    Incompatible {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// An axis lies outside `[-rank, rank)`.
    #[error("axis {axis} out of range for rank {rank}")]
    AxisOutOfRange { axis: i64, rank: usize },
}
