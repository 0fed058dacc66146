// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Node attributes as a tagged union.

use crate::proto::GraphProto;
use crate::Initializer;
use std::collections::BTreeMap;

/// A single attribute value.
///
/// Subgraph attributes (`If`/`Loop`/`Scan` bodies) are carried as raw
/// protobuf so they survive a load/save round trip untouched; no pass in
/// this crate descends into them.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Int(i64),
    Float(f32),
    Ints(Vec<i64>),
    Floats(Vec<f32>),
    String(String),
    Strings(Vec<String>),
    Tensor(Initializer),
    Tensors(Vec<Initializer>),
    Graph(GraphProto),
    Graphs(Vec<GraphProto>),
}

/// Attributes keyed by name, in sorted order.
pub type Attributes = BTreeMap<String, AttributeValue>;

impl AttributeValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Self::Ints(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            Self::Floats(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&Initializer> {
        match self {
            Self::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Ints(_) => "ints",
            Self::Floats(_) => "floats",
            Self::String(_) => "string",
            Self::Strings(_) => "strings",
            Self::Tensor(_) => "tensor",
            Self::Tensors(_) => "tensors",
            Self::Graph(_) => "graph",
            Self::Graphs(_) => "graphs",
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for AttributeValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(v: Vec<i64>) -> Self {
        Self::Ints(v)
    }
}

impl From<Vec<f32>> for AttributeValue {
    fn from(v: Vec<f32>) -> Self {
        Self::Floats(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Initializer> for AttributeValue {
    fn from(v: Initializer) -> Self {
        Self::Tensor(v)
    }
}
