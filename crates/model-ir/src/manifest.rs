// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Primary-input manifest extraction.
//!
//! A [`ManifestEntry`] describes how a model expects its first input:
//! layout, spatial size and element type, plus the model's versioning.
//!
//! # JSON format
//! ```json
//! {
//!   "input": "images",
//!   "layout": "NCHW",
//!   "H": 224,
//!   "W": 224,
//!   "dtype": "1",
//!   "ir_version": 7,
//!   "opset": 13
//! }
//! ```
//!
//! `dtype` is the numeric element-type code rendered as a string; unknown
//! spatial dimensions are `null`.

use crate::model::ModelState;
use crate::ModelDescriptor;
use std::fmt;
use tensor_meta::{Dim, ElemType};

/// Channel count that identifies the channel axis of an image input.
const IMAGE_CHANNELS: u64 = 3;

/// Axis ordering of a 4-D image tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Layout {
    #[serde(rename = "NCHW")]
    Nchw,
    #[serde(rename = "NHWC")]
    Nhwc,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Nchw => "NCHW",
            Layout::Nhwc => "NHWC",
            Layout::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical description of a model's primary input.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ManifestEntry {
    /// Name of the first declared input; empty if the graph has none.
    #[serde(rename = "input")]
    pub input_name: String,
    pub layout: Layout,
    #[serde(rename = "H")]
    pub height: Option<u64>,
    #[serde(rename = "W")]
    pub width: Option<u64>,
    #[serde(rename = "dtype", with = "elem_code")]
    pub elem_type: Option<ElemType>,
    pub ir_version: i64,
    /// Version of the first opset import.
    pub opset: Option<i64>,
}

/// Reads the first declared input and classifies its layout.
///
/// Never fails: missing data yields `unknown` / absent fields. A symbolic
/// or unknown dimension never compares equal to a number.
pub fn extract_manifest<S: ModelState>(model: &ModelDescriptor<S>) -> ManifestEntry {
    let first = model.graph().inputs().first();

    let dims: Option<Vec<Option<u64>>> = first
        .and_then(|vi| vi.shape())
        .map(|s| s.dims().iter().map(Dim::value).collect());

    let (layout, height, width) = match dims.as_deref() {
        Some(&[_, Some(IMAGE_CHANNELS), h, w]) => (Layout::Nchw, h, w),
        Some(&[_, h, w, Some(IMAGE_CHANNELS)]) => (Layout::Nhwc, h, w),
        _ => (Layout::Unknown, None, None),
    };

    ManifestEntry {
        input_name: first.map(|vi| vi.name.clone()).unwrap_or_default(),
        layout,
        height,
        width,
        elem_type: first.and_then(|vi| vi.elem_type()),
        ir_version: model.ir_version(),
        opset: model.opset_import().first().map(|op| op.version),
    }
}

/// Serializes `Option<ElemType>` as its numeric code string (`"0"` when
/// unknown).
mod elem_code {
    use serde::{Deserialize, Deserializer, Serializer};
    use tensor_meta::ElemType;

    pub fn serialize<S: Serializer>(value: &Option<ElemType>, s: S) -> Result<S::Ok, S::Error> {
        let code = value.map_or(0, ElemType::code);
        s.serialize_str(&code.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ElemType>, D::Error> {
        let raw = String::deserialize(d)?;
        let code: i32 = raw.parse().map_err(serde::de::Error::custom)?;
        Ok(ElemType::from_code(code))
    }
}
