//! Sub-element transformations.
//!
//! Refining an element splits its reference domain into sons, each selected by a small integer
//! *label*. A [`TransformPath`] is a sequence of labels: the first label selects a son of the
//! element, the second a son of that son and so on. Points given in the reference coordinates
//! of the innermost sub-element are mapped back to the element's reference domain by applying
//! the son maps from the innermost label outwards.
//!
//! Triangle labels `0..3` are the corner sons at vertex `k`, label `3` the middle (reflected)
//! son. Quad labels `0..4` are the corner sons at vertex `k`; labels `4..8` are the
//! bisections (lower, upper, left and right half).
use crate::mesh::ElementMode;
use nalgebra::{Matrix2, Point2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagonal affine son map `x -> scale * x + shift`, per label.
const TRIANGLE_SONS: [([f64; 2], [f64; 2]); 4] = [
    ([0.5, 0.5], [-0.5, -0.5]),
    ([0.5, 0.5], [0.5, -0.5]),
    ([0.5, 0.5], [-0.5, 0.5]),
    ([-0.5, -0.5], [-0.5, -0.5]),
];

const QUAD_SONS: [([f64; 2], [f64; 2]); 8] = [
    ([0.5, 0.5], [-0.5, -0.5]),
    ([0.5, 0.5], [0.5, -0.5]),
    ([0.5, 0.5], [0.5, 0.5]),
    ([0.5, 0.5], [-0.5, 0.5]),
    ([1.0, 0.5], [0.0, -0.5]),
    ([1.0, 0.5], [0.0, 0.5]),
    ([0.5, 1.0], [-0.5, 0.0]),
    ([0.5, 1.0], [0.5, 0.0]),
];

/// Edge whose first half (starting at the edge's first vertex) is covered by the son with
/// the given label.
pub const TRIANGLE_FIRST_HALF_EDGE: [usize; 3] = [0, 1, 2];
/// Edge whose second half is covered by the son with the given label.
pub const TRIANGLE_SECOND_HALF_EDGE: [usize; 3] = [2, 0, 1];

/// Quad counterpart of [`TRIANGLE_FIRST_HALF_EDGE`], including the bisection labels.
pub const QUAD_FIRST_HALF_EDGE: [usize; 8] = [0, 1, 2, 3, 1, 3, 0, 2];
/// Quad counterpart of [`TRIANGLE_SECOND_HALF_EDGE`], including the bisection labels.
pub const QUAD_SECOND_HALF_EDGE: [usize; 8] = [3, 0, 1, 2, 3, 1, 2, 0];

/// Which half of an edge a son covers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EdgeHalf {
    First,
    Second,
}

fn son_map(mode: ElementMode, label: u8) -> ([f64; 2], [f64; 2]) {
    match mode {
        ElementMode::Triangle => TRIANGLE_SONS[label as usize],
        ElementMode::Quad => QUAD_SONS[label as usize],
    }
}

/// Number of labels that describe a son of an isotropically refined element.
pub fn num_sons(_mode: ElementMode) -> usize {
    4
}

/// Returns which half of `edge` the son `label` covers, if any.
pub fn edge_half(mode: ElementMode, label: u8, edge: usize) -> Option<EdgeHalf> {
    let label = label as usize;
    let (first, second): (&[usize], &[usize]) = match mode {
        ElementMode::Triangle => (&TRIANGLE_FIRST_HALF_EDGE, &TRIANGLE_SECOND_HALF_EDGE),
        ElementMode::Quad => (&QUAD_FIRST_HALF_EDGE, &QUAD_SECOND_HALF_EDGE),
    };
    if first.get(label) == Some(&edge) {
        Some(EdgeHalf::First)
    } else if second.get(label) == Some(&edge) {
        Some(EdgeHalf::Second)
    } else {
        None
    }
}

/// The isotropic son covering the given half of `edge`.
pub fn half_label(mode: ElementMode, edge: usize, half: EdgeHalf) -> u8 {
    let n = mode.num_edges();
    match half {
        EdgeHalf::First => edge as u8,
        EdgeHalf::Second => ((edge + 1) % n) as u8,
    }
}

/// Maps a label that selects part of the central element's `active_edge` to the label that
/// selects the matching part of the neighbor across that edge.
///
/// `neighbor_edge` is the neighbor's local edge and `same_direction` tells whether it runs in
/// the same direction as the central edge.
pub fn neighbor_label(
    central_mode: ElementMode,
    active_edge: usize,
    label: u8,
    neighbor_mode: ElementMode,
    neighbor_edge: usize,
    same_direction: bool,
) -> u8 {
    let first_half = matches!(edge_half(central_mode, label, active_edge), Some(EdgeHalf::First));
    if first_half == same_direction {
        half_label(neighbor_mode, neighbor_edge, EdgeHalf::First)
    } else {
        half_label(neighbor_mode, neighbor_edge, EdgeHalf::Second)
    }
}

/// For a son whose `edge` lies in the interior of its parent, returns the sibling across that
/// edge together with the sibling's local edge. The shared edge runs in opposite directions.
pub fn interior_sibling(mode: ElementMode, label: u8, edge: usize) -> Option<(u8, usize)> {
    let label = label as usize;
    match mode {
        ElementMode::Triangle => match label {
            3 => Some((((edge + 2) % 3) as u8, edge)),
            0..=2 if edge == (label + 1) % 3 => Some((3, edge)),
            _ => None,
        },
        ElementMode::Quad => match label {
            0..=3 if edge == (label + 1) % 4 => Some((((label + 1) % 4) as u8, (label + 3) % 4)),
            0..=3 if edge == (label + 2) % 4 => Some((((label + 3) % 4) as u8, label)),
            _ => None,
        },
    }
}

/// A sequence of sub-element labels, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransformPath(Vec<u8>);

impl TransformPath {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_labels(labels: impl Into<Vec<u8>>) -> Self {
        Self(labels.into())
    }

    pub fn labels(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, label: u8) {
        self.0.push(label);
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.0.pop()
    }

    /// A copy of this path with `label` appended.
    pub fn with(&self, label: u8) -> Self {
        let mut path = self.clone();
        path.push(label);
        path
    }

    /// This path followed by `labels`.
    pub fn joined(&self, labels: &[u8]) -> Self {
        let mut path = self.clone();
        path.0.extend_from_slice(labels);
        path
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }

    /// Maps a point from the innermost sub-element's reference domain to the reference domain
    /// of the element the path starts from.
    pub fn apply(&self, mode: ElementMode, xi: &Point2<f64>) -> Point2<f64> {
        self.0.iter().rev().fold(*xi, |p, &label| {
            let (scale, shift) = son_map(mode, label);
            Point2::new(scale[0] * p.x + shift[0], scale[1] * p.y + shift[1])
        })
    }

    /// Jacobian of [`apply`](Self::apply), which is constant.
    pub fn jacobian(&self, mode: ElementMode) -> Matrix2<f64> {
        let (sx, sy) = self.0.iter().fold((1.0, 1.0), |(sx, sy), &label| {
            let (scale, _) = son_map(mode, label);
            (sx * scale[0], sy * scale[1])
        });
        Matrix2::new(sx, 0.0, 0.0, sy)
    }
}

impl fmt::Display for TransformPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Vec<u8>> for TransformPath {
    fn from(labels: Vec<u8>) -> Self {
        Self(labels)
    }
}
