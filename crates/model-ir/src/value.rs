// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Value descriptions: typed edges ([`ValueInfo`]) and embedded constants
//! ([`Initializer`]).

use crate::proto::TypeProto;
use std::fmt;
use tensor_meta::{Dim, ElemType, Shape, ShapeError};

/// The (possibly partial) type of a tensor-valued edge.
///
/// `shape == None` means even the rank is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TensorType {
    pub elem_type: Option<ElemType>,
    pub shape: Option<Shape>,
}

impl TensorType {
    pub fn new(elem_type: ElemType, shape: Shape) -> Self {
        Self {
            elem_type: Some(elem_type),
            shape: Some(shape),
        }
    }

    /// A type about which nothing is known.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Returns `true` if neither element type nor shape is known.
    pub fn is_unknown(&self) -> bool {
        self.elem_type.is_none() && self.shape.is_none()
    }

    /// Returns the rank, if known.
    pub fn rank(&self) -> Option<usize> {
        self.shape.as_ref().map(Shape::rank)
    }

    /// Combines two descriptions of the same value, keeping whatever is
    /// most specific in either. Fails on disagreement.
    pub fn merge(&self, other: &TensorType) -> Result<TensorType, TypeConflict> {
        let elem_type = match (self.elem_type, other.elem_type) {
            (Some(a), Some(b)) if a != b => {
                return Err(TypeConflict::ElemType {
                    declared: a,
                    inferred: b,
                })
            }
            (a, b) => a.or(b),
        };
        let shape = match (&self.shape, &other.shape) {
            (Some(a), Some(b)) => Some(a.merge(b).map_err(TypeConflict::Shape)?),
            (a, b) => a.clone().or_else(|| b.clone()),
        };
        Ok(TensorType { elem_type, shape })
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.elem_type {
            Some(t) => write!(f, "{t}")?,
            None => f.write_str("?")?,
        }
        match &self.shape {
            Some(s) => write!(f, "{s}"),
            None => f.write_str("[..]"),
        }
    }
}

/// Two descriptions of the same value disagree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeConflict {
    #[error("element type {declared} conflicts with {inferred}")]
    ElemType {
        declared: ElemType,
        inferred: ElemType,
    },
    #[error(transparent)]
    Shape(ShapeError),
}

/// A declared or inferred `(name, element type, shape)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueInfo {
    pub name: String,
    pub ty: TensorType,
    pub doc_string: String,
    /// Declared type that `ty` cannot express (sequence, map, optional,
    /// sparse, or an element code this build does not know). Written back
    /// unchanged; `ty` stays unknown.
    pub opaque_type: Option<TypeProto>,
}

impl ValueInfo {
    pub fn new(name: impl Into<String>, ty: TensorType) -> Self {
        Self {
            name: name.into(),
            ty,
            doc_string: String::new(),
            opaque_type: None,
        }
    }

    /// A fully typed tensor value.
    pub fn tensor(name: impl Into<String>, elem_type: ElemType, dims: Vec<Dim>) -> Self {
        Self::new(name, TensorType::new(elem_type, Shape::new(dims)))
    }

    /// A value with no type information.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::new(name, TensorType::unknown())
    }

    pub fn elem_type(&self) -> Option<ElemType> {
        self.ty.elem_type
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.ty.shape.as_ref()
    }
}

impl fmt::Display for ValueInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// Storage of an initializer's payload, kept in whatever form the file used.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    /// Little-endian packed bytes (`raw_data`).
    Raw(Vec<u8>),
    Float(Vec<f32>),
    /// Also carries the narrow integer, bool and 16-bit float types.
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Double(Vec<f64>),
    /// Also carries `uint32`.
    Uint64(Vec<u64>),
    Strings(Vec<Vec<u8>>),
    /// Payload lives in a side file; key/value pairs as in `external_data`.
    External(Vec<(String, String)>),
    Empty,
}

/// A named constant tensor embedded in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Initializer {
    pub name: String,
    pub elem_type: Option<ElemType>,
    pub dims: Vec<u64>,
    pub data: TensorData,
    pub doc_string: String,
    /// Wire code of an element type this build does not know, kept so the
    /// tensor is written back with the same `data_type`.
    pub unrecognized_elem: Option<i32>,
}

impl Initializer {
    pub fn new(
        name: impl Into<String>,
        elem_type: ElemType,
        dims: Vec<u64>,
        data: TensorData,
    ) -> Self {
        Self {
            name: name.into(),
            elem_type: Some(elem_type),
            dims,
            data,
            doc_string: String::new(),
            unrecognized_elem: None,
        }
    }

    /// Creates a `float32` initializer backed by typed storage.
    pub fn from_f32(name: impl Into<String>, dims: Vec<u64>, values: Vec<f32>) -> Self {
        Self::new(name, ElemType::Float, dims, TensorData::Float(values))
    }

    /// Creates an `int64` initializer backed by typed storage.
    pub fn from_i64(name: impl Into<String>, dims: Vec<u64>, values: Vec<i64>) -> Self {
        Self::new(name, ElemType::Int64, dims, TensorData::Int64(values))
    }

    pub fn shape(&self) -> Shape {
        Shape::known(&self.dims)
    }

    pub fn ty(&self) -> TensorType {
        TensorType {
            elem_type: self.elem_type,
            shape: Some(self.shape()),
        }
    }

    /// Element count; `None` if it does not fit in `u64`.
    pub fn num_elements(&self) -> Option<u64> {
        self.dims.iter().try_fold(1u64, |acc, &d| acc.checked_mul(d))
    }

    /// Decodes the payload as signed integers.
    ///
    /// Supports `int64`/`int32`-family storage and little-endian raw bytes.
    /// Returns `None` for floating or external payloads.
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        match (&self.data, self.elem_type?) {
            (TensorData::Int64(v), _) => Some(v.clone()),
            (TensorData::Int32(v), ElemType::Int32 | ElemType::Int16 | ElemType::Int8) => {
                Some(v.iter().map(|&x| i64::from(x)).collect())
            }
            (TensorData::Uint64(v), ElemType::Uint64 | ElemType::Uint32) => {
                v.iter().map(|&x| i64::try_from(x).ok()).collect()
            }
            (TensorData::Raw(bytes), ElemType::Int64) => Some(
                bytes
                    .chunks_exact(8)
                    .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
            (TensorData::Raw(bytes), ElemType::Int32) => Some(
                bytes
                    .chunks_exact(4)
                    .map(|c| i64::from(i32::from_le_bytes([c[0], c[1], c[2], c[3]])))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Decodes the payload as `f32` values.
    ///
    /// Supports `float`/`double` storage and little-endian raw bytes.
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        match (&self.data, self.elem_type?) {
            (TensorData::Float(v), _) => Some(v.clone()),
            (TensorData::Double(v), _) => Some(v.iter().map(|&x| x as f32).collect()),
            (TensorData::Raw(bytes), ElemType::Float) => Some(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            (TensorData::Raw(bytes), ElemType::Double) => Some(
                bytes
                    .chunks_exact(8)
                    .map(|c| {
                        f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Size of the stored payload in bytes, where it can be known.
    pub fn payload_bytes(&self) -> Option<usize> {
        match &self.data {
            TensorData::Raw(b) => Some(b.len()),
            TensorData::Float(v) => Some(v.len() * 4),
            TensorData::Int32(v) => Some(v.len() * 4),
            TensorData::Int64(v) => Some(v.len() * 8),
            TensorData::Double(v) => Some(v.len() * 8),
            TensorData::Uint64(v) => Some(v.len() * 8),
            TensorData::Strings(v) => Some(v.iter().map(Vec::len).sum()),
            TensorData::External(_) => None,
            TensorData::Empty => Some(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_fills_gaps() {
        let declared = TensorType {
            elem_type: Some(ElemType::Float),
            shape: None,
        };
        let inferred = TensorType {
            elem_type: None,
            shape: Some(Shape::known(&[1, 3])),
        };
        let merged = declared.merge(&inferred).unwrap();
        assert_eq!(merged, TensorType::new(ElemType::Float, Shape::known(&[1, 3])));
    }

    #[test]
    fn test_merge_elem_conflict() {
        let a = TensorType::new(ElemType::Float, Shape::scalar());
        let b = TensorType::new(ElemType::Int64, Shape::scalar());
        assert!(matches!(a.merge(&b), Err(TypeConflict::ElemType { .. })));
    }

    #[test]
    fn test_raw_i64_decode() {
        let mut bytes = Vec::new();
        for v in [1i64, -1, 224] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let init = Initializer::new("shape", ElemType::Int64, vec![3], TensorData::Raw(bytes));
        assert_eq!(init.to_i64_vec(), Some(vec![1, -1, 224]));
    }

    #[test]
    fn test_raw_f32_decode() {
        let bytes: Vec<u8> = [0.5f32, 2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        let init = Initializer::new("scales", ElemType::Float, vec![2], TensorData::Raw(bytes));
        assert_eq!(init.to_f32_vec(), Some(vec![0.5, 2.0]));
        assert_eq!(init.to_i64_vec(), None);
    }

    #[test]
    fn test_initializer_type() {
        let init = Initializer::from_f32("w", vec![8, 3, 3, 3], vec![0.0; 216]);
        assert_eq!(init.num_elements(), Some(216));
        assert_eq!(init.payload_bytes(), Some(864));
        assert_eq!(format!("{}", init.ty()), "float32[8, 3, 3, 3]");
    }

    #[test]
    fn test_num_elements_overflow() {
        let init = Initializer::new("huge", ElemType::Float, vec![1 << 32, 1 << 32], TensorData::Raw(Vec::new()));
        assert_eq!(init.num_elements(), None);
    }

    #[test]
    fn test_value_info_display() {
        let vi = ValueInfo::tensor("x", ElemType::Float, vec![Dim::from("N"), Dim::Known(3)]);
        assert_eq!(format!("{vi}"), "x: float32[N, 3]");
        assert_eq!(format!("{}", ValueInfo::untyped("y")), "y: ?[..]");
    }
}
