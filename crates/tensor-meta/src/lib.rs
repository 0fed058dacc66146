// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-meta
//!
//! Tensor *metadata* for graph edges: what a value looks like, not what it
//! holds.
//!
//! This crate provides:
//! - [`ElemType`] — element types, numbered as in the ONNX wire format.
//! - [`Dim`] — a concrete, symbolic, or unknown dimension.
//! - [`Shape`] — a partial shape with numpy-style broadcasting and merging.
//!
//! Errors are reported through [`ShapeError`].

mod dtype;
mod error;
mod shape;

pub use dtype::ElemType;
pub use error::ShapeError;
pub use shape::{normalize_axis, Dim, Shape};
