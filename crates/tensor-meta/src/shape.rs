// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Symbolic tensor shapes and dimension utilities.
//!
//! Unlike a runtime tensor, a graph edge may only be partially described:
//! some dimensions are concrete integers, some carry a symbolic name
//! (e.g. `"batch"`), and some are not known at all. [`Dim`] models that,
//! and [`Shape`] provides broadcasting and merging over such dimensions.

use crate::ShapeError;
use std::fmt;

/// A single dimension of a tensor shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dim {
    /// A concrete, non-negative extent.
    Known(u64),
    /// A symbolic extent identified by name (`dim_param` on the wire).
    Param(String),
    /// Nothing is known about this extent.
    Unknown,
}

impl Dim {
    /// Returns the concrete extent, or `None` if the dimension is symbolic or unknown.
    pub fn value(&self) -> Option<u64> {
        match self {
            Dim::Known(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns `true` if the extent is a concrete integer.
    pub fn is_known(&self) -> bool {
        matches!(self, Dim::Known(_))
    }

    /// Returns `true` if this dimension is exactly the concrete value `v`.
    ///
    /// Symbolic and unknown dimensions never compare equal to a number.
    pub fn is(&self, v: u64) -> bool {
        self.value() == Some(v)
    }

    /// Combines two descriptions of the *same* dimension, keeping the most
    /// specific one. Fails if both are concrete and disagree.
    pub fn merge(&self, other: &Dim) -> Option<Dim> {
        match (self, other) {
            (Dim::Known(a), Dim::Known(b)) => (a == b).then(|| Dim::Known(*a)),
            (Dim::Known(a), _) | (_, Dim::Known(a)) => Some(Dim::Known(*a)),
            (Dim::Param(p), _) | (_, Dim::Param(p)) => Some(Dim::Param(p.clone())),
            (Dim::Unknown, Dim::Unknown) => Some(Dim::Unknown),
        }
    }

    /// Broadcasts two aligned dimensions following numpy semantics.
    ///
    /// A concrete `1` stretches to the other side. A concrete extent other
    /// than `1` pins an unknown sibling. Two unknowns stay unknown unless
    /// they share the same symbolic name.
    fn broadcast(&self, other: &Dim) -> Option<Dim> {
        match (self, other) {
            (Dim::Known(a), Dim::Known(b)) => {
                if a == b || *b == 1 {
                    Some(Dim::Known(*a))
                } else if *a == 1 {
                    Some(Dim::Known(*b))
                } else {
                    None
                }
            }
            (Dim::Known(1), d) | (d, Dim::Known(1)) => Some(d.clone()),
            (Dim::Known(a), _) | (_, Dim::Known(a)) => Some(Dim::Known(*a)),
            (Dim::Param(p), Dim::Param(q)) if p == q => Some(Dim::Param(p.clone())),
            _ => Some(Dim::Unknown),
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Known(v) => write!(f, "{v}"),
            Dim::Param(p) => f.write_str(p),
            Dim::Unknown => f.write_str("?"),
        }
    }
}

impl From<u64> for Dim {
    fn from(v: u64) -> Self {
        Dim::Known(v)
    }
}

impl From<&str> for Dim {
    fn from(p: &str) -> Self {
        Dim::Param(p.to_string())
    }
}

/// The (possibly partial) shape of a tensor-valued edge.
///
/// The rank is always known; individual dimensions may not be. A value
/// whose rank is unknown is represented by the *absence* of a `Shape`
/// (see `model_ir::TensorType`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<Dim>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_meta::{Dim, Shape};
    /// let s = Shape::new(vec![Dim::from("N"), Dim::Known(3), Dim::Known(224), Dim::Known(224)]);
    /// assert_eq!(s.rank(), 4);
    /// assert_eq!(s.num_elements(), None);
    /// ```
    pub fn new(dims: Vec<Dim>) -> Self {
        Self { dims }
    }

    /// Creates a shape whose dimensions are all concrete.
    pub fn known(dims: &[u64]) -> Self {
        Self {
            dims: dims.iter().map(|&d| Dim::Known(d)).collect(),
        }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Creates a shape of the given rank with every dimension unknown.
    pub fn unknown(rank: usize) -> Self {
        Self {
            dims: vec![Dim::Unknown; rank],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    /// Consumes the shape and returns its dimensions.
    pub fn into_dims(self) -> Vec<Dim> {
        self.dims
    }

    /// Returns a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<&Dim> {
        self.dims.get(index)
    }

    /// Returns every dimension as a concrete value, or `None` if any is not known.
    pub fn known_dims(&self) -> Option<Vec<u64>> {
        self.dims.iter().map(Dim::value).collect()
    }

    /// Returns `true` if every dimension is concrete.
    pub fn is_fully_known(&self) -> bool {
        self.dims.iter().all(Dim::is_known)
    }

    /// Returns the total number of elements, if every dimension is concrete.
    ///
    /// For a scalar shape (rank 0), returns 1.
    pub fn num_elements(&self) -> Option<u64> {
        self.dims
            .iter()
            .try_fold(1u64, |acc, d| d.value().and_then(|v| acc.checked_mul(v)))
    }

    /// Resolves a possibly-negative axis against this shape's rank.
    pub fn normalize_axis(&self, axis: i64) -> Result<usize, ShapeError> {
        normalize_axis(axis, self.rank())
    }

    /// Computes the multidirectional broadcast of two shapes.
    ///
    /// Dimensions are aligned from the right; the shorter shape is padded
    /// with leading `1`s.
    pub fn broadcast(&self, other: &Shape) -> Result<Shape, ShapeError> {
        let rank = self.rank().max(other.rank());
        let lhs_pad = rank - self.rank();
        let rhs_pad = rank - other.rank();
        let one = Dim::Known(1);

        let mut dims = Vec::with_capacity(rank);
        for i in 0..rank {
            let a = if i < lhs_pad { &one } else { &self.dims[i - lhs_pad] };
            let b = if i < rhs_pad { &one } else { &other.dims[i - rhs_pad] };
            let d = a.broadcast(b).ok_or_else(|| ShapeError::Incompatible {
                op: "broadcast",
                lhs: self.clone(),
                rhs: other.clone(),
            })?;
            dims.push(d);
        }
        Ok(Shape { dims })
    }

    /// Broadcasts an arbitrary number of shapes together.
    pub fn broadcast_all<'a, I>(shapes: I) -> Result<Shape, ShapeError>
    where
        I: IntoIterator<Item = &'a Shape>,
    {
        shapes
            .into_iter()
            .try_fold(Shape::scalar(), |acc, s| acc.broadcast(s))
    }

    /// Combines two descriptions of the same value, keeping the most
    /// specific dimension at each position.
    ///
    /// Fails when ranks differ or two concrete dimensions disagree.
    pub fn merge(&self, other: &Shape) -> Result<Shape, ShapeError> {
        let conflict = || ShapeError::Incompatible {
            op: "merge",
            lhs: self.clone(),
            rhs: other.clone(),
        };
        if self.rank() != other.rank() {
            return Err(conflict());
        }
        let dims = self
            .dims
            .iter()
            .zip(&other.dims)
            .map(|(a, b)| a.merge(b))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(conflict)?;
        Ok(Shape { dims })
    }
}

/// Resolves a possibly-negative axis against `rank`.
pub fn normalize_axis(axis: i64, rank: usize) -> Result<usize, ShapeError> {
    let r = rank as i64;
    let resolved = if axis < 0 { axis + r } else { axis };
    if (0..r).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(ShapeError::AxisOutOfRange { axis, rank })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<Vec<Dim>> for Shape {
    fn from(dims: Vec<Dim>) -> Self {
        Self::new(dims)
    }
}

impl From<&[u64]> for Shape {
    fn from(dims: &[u64]) -> Self {
        Self::known(dims)
    }
}

impl FromIterator<Dim> for Shape {
    fn from_iter<I: IntoIterator<Item = Dim>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
