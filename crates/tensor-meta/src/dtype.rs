// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor element types as encoded in the ONNX wire format.

use std::fmt;

/// Enumerates the element types a tensor-valued edge can carry.
///
/// Discriminants are the `TensorProto.DataType` codes, so conversion to and
/// from the wire format is a plain integer cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElemType {
    Float = 1,
    Uint8 = 2,
    Int8 = 3,
    Uint16 = 4,
    Int16 = 5,
    Int32 = 6,
    Int64 = 7,
    String = 8,
    Bool = 9,
    Float16 = 10,
    Double = 11,
    Uint32 = 12,
    Uint64 = 13,
    Complex64 = 14,
    Complex128 = 15,
    Bfloat16 = 16,
    Float8e4m3fn = 17,
    Float8e4m3fnuz = 18,
    Float8e5m2 = 19,
    Float8e5m2fnuz = 20,
    Uint4 = 21,
    Int4 = 22,
    Float4e2m1 = 23,
    Float8e8m0 = 24,
    Uint2 = 25,
    Int2 = 26,
}

impl ElemType {
    /// Parses a wire-format data type code.
    ///
    /// Returns `None` for `0` (`UNDEFINED`) and for codes this build does
    /// not know about.
    pub fn from_code(code: i32) -> Option<Self> {
        let ty = match code {
            1 => Self::Float,
            2 => Self::Uint8,
            3 => Self::Int8,
            4 => Self::Uint16,
            5 => Self::Int16,
            6 => Self::Int32,
            7 => Self::Int64,
            8 => Self::String,
            9 => Self::Bool,
            10 => Self::Float16,
            11 => Self::Double,
            12 => Self::Uint32,
            13 => Self::Uint64,
            14 => Self::Complex64,
            15 => Self::Complex128,
            16 => Self::Bfloat16,
            17 => Self::Float8e4m3fn,
            18 => Self::Float8e4m3fnuz,
            19 => Self::Float8e5m2,
            20 => Self::Float8e5m2fnuz,
            21 => Self::Uint4,
            22 => Self::Int4,
            23 => Self::Float4e2m1,
            24 => Self::Float8e8m0,
            25 => Self::Uint2,
            26 => Self::Int2,
            _ => return None,
        };
        Some(ty)
    }

    /// Returns the wire-format data type code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Size of a single element in bits, or `None` for variable-length strings.
    pub fn size_bits(self) -> Option<usize> {
        let bits = match self {
            Self::Uint2 | Self::Int2 => 2,
            Self::Uint4 | Self::Int4 | Self::Float4e2m1 => 4,
            Self::Bool
            | Self::Uint8
            | Self::Int8
            | Self::Float8e4m3fn
            | Self::Float8e4m3fnuz
            | Self::Float8e5m2
            | Self::Float8e5m2fnuz
            | Self::Float8e8m0 => 8,
            Self::Uint16 | Self::Int16 | Self::Float16 | Self::Bfloat16 => 16,
            Self::Float | Self::Int32 | Self::Uint32 => 32,
            Self::Double | Self::Int64 | Self::Uint64 | Self::Complex64 => 64,
            Self::Complex128 => 128,
            Self::String => return None,
        };
        Some(bits)
    }

    /// Returns `true` for floating-point element types (including 8-bit floats).
    pub fn is_float(self) -> bool {
        matches!(
            self,
            Self::Float
                | Self::Float16
                | Self::Bfloat16
                | Self::Double
                | Self::Float8e4m3fn
                | Self::Float8e4m3fnuz
                | Self::Float8e5m2
                | Self::Float8e5m2fnuz
                | Self::Float8e8m0
                | Self::Float4e2m1
        )
    }

    /// Returns a human-readable label for this element type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Float => "float32",
            Self::Uint8 => "uint8",
            Self::Int8 => "int8",
            Self::Uint16 => "uint16",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Float16 => "float16",
            Self::Double => "float64",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
            Self::Bfloat16 => "bfloat16",
            Self::Float8e4m3fn => "float8e4m3fn",
            Self::Float8e4m3fnuz => "float8e4m3fnuz",
            Self::Float8e5m2 => "float8e5m2",
            Self::Float8e5m2fnuz => "float8e5m2fnuz",
            Self::Uint4 => "uint4",
            Self::Int4 => "int4",
            Self::Float4e2m1 => "float4e2m1",
            Self::Float8e8m0 => "float8e8m0",
            Self::Uint2 => "uint2",
            Self::Int2 => "int2",
        }
    }
}

impl fmt::Display for ElemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in 1..=26 {
            let ty = ElemType::from_code(code).unwrap();
            assert_eq!(ty.code(), code);
        }
    }

    #[test]
    fn test_undefined_and_unknown_codes() {
        assert_eq!(ElemType::from_code(0), None);
        assert_eq!(ElemType::from_code(99), None);
        assert_eq!(ElemType::from_code(-1), None);
    }

    #[test]
    fn test_size_bits() {
        assert_eq!(ElemType::Float.size_bits(), Some(32));
        assert_eq!(ElemType::Float16.size_bits(), Some(16));
        assert_eq!(ElemType::Int64.size_bits(), Some(64));
        assert_eq!(ElemType::Int4.size_bits(), Some(4));
        assert_eq!(ElemType::Uint2.size_bits(), Some(2));
        assert_eq!(ElemType::String.size_bits(), None);
    }

    #[test]
    fn test_is_float() {
        assert!(ElemType::Float.is_float());
        assert!(ElemType::Bfloat16.is_float());
        assert!(!ElemType::Int64.is_float());
        assert!(!ElemType::Bool.is_float());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ElemType::Float), "float32");
        assert_eq!(format!("{}", ElemType::Double), "float64");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ElemType::Float16).unwrap();
        assert_eq!(json, "\"float16\"");
    }
}
