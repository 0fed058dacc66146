// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! What a rule sees of one node: its inputs' best known types, any constant
//! values, attributes and the active opset.

use crate::InferError;
use model_ir::{Initializer, Node, TensorType};
use tensor_meta::{ElemType, Shape};

/// One supplied input of the node being inferred.
#[derive(Debug, Clone)]
pub struct InputView<'a> {
    pub name: &'a str,
    /// Best known type; [`TensorType::unknown`] if nothing is known yet.
    pub ty: TensorType,
    /// Value of the input when it is an initializer or a folded constant.
    pub constant: Option<&'a Initializer>,
}

/// Read-only inputs to an [`crate::InferenceRule`].
#[derive(Debug, Clone)]
pub struct NodeContext<'a> {
    pub node: &'a Node,
    /// One entry per input slot; `None` for omitted optional inputs.
    pub inputs: Vec<Option<InputView<'a>>>,
    /// Imported version of the default domain.
    pub opset: i64,
}

impl<'a> NodeContext<'a> {
    pub fn new(node: &'a Node, inputs: Vec<Option<InputView<'a>>>, opset: i64) -> Self {
        Self {
            node,
            inputs,
            opset,
        }
    }

    /// Returns the `i`-th input if it was supplied.
    pub fn input(&self, i: usize) -> Option<&InputView<'a>> {
        self.inputs.get(i).and_then(Option::as_ref)
    }

    /// Iterates over the supplied inputs, skipping omitted slots.
    pub fn present_inputs(&self) -> impl Iterator<Item = (usize, &InputView<'a>)> {
        self.inputs
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (i, v)))
    }

    pub fn has_input(&self, i: usize) -> bool {
        self.input(i).is_some()
    }

    pub fn input_type(&self, i: usize) -> Result<&TensorType, InferError> {
        self.input(i)
            .map(|v| &v.ty)
            .ok_or(InferError::MissingInput { index: i })
    }

    /// Shape of input `i`; fails if the input is absent or its rank unknown.
    pub fn input_shape(&self, i: usize) -> Result<&Shape, InferError> {
        self.input_type(i)?
            .shape
            .as_ref()
            .ok_or(InferError::UnknownRank { index: i })
    }

    pub fn input_elem(&self, i: usize) -> Option<ElemType> {
        self.input(i).and_then(|v| v.ty.elem_type)
    }

    pub fn constant(&self, i: usize) -> Option<&'a Initializer> {
        self.input(i).and_then(|v| v.constant)
    }

    /// Integer payload of constant input `i`.
    pub fn constant_ints(&self, i: usize) -> Option<Vec<i64>> {
        self.constant(i).and_then(Initializer::to_i64_vec)
    }

    /// Floating payload of constant input `i`.
    pub fn constant_floats(&self, i: usize) -> Option<Vec<f32>> {
        self.constant(i).and_then(Initializer::to_f32_vec)
    }

    pub fn attr_int(&self, name: &str, default: i64) -> i64 {
        self.node.attr_int(name).unwrap_or(default)
    }

    /// Integer list that moved from an attribute to input `input` at opset
    /// `since`.
    ///
    /// Returns `Ok(None)` when the operand is simply not given, and an error
    /// when it is given as a non-constant input.
    pub fn ints_operand(
        &self,
        attr: &'static str,
        input: usize,
        since: i64,
    ) -> Result<Option<Vec<i64>>, InferError> {
        if self.opset >= since || (self.opset == 0 && self.has_input(input)) {
            if !self.has_input(input) {
                return Ok(None);
            }
            return self
                .constant_ints(input)
                .map(Some)
                .ok_or_else(|| InferError::invalid(attr, "not a constant"));
        }
        Ok(self.node.attr_ints(attr).map(<[i64]>::to_vec))
    }

    /// Shorthand for a single inferred output.
    pub fn single(ty: TensorType) -> Result<Vec<TensorType>, InferError> {
        Ok(vec![ty])
    }
}
