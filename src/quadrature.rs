//! Order-indexed quadrature tables for volume and edge integration.
use crate::mesh::ElementMode;
use crate::refmap::reference_edge_point;
use discretize_quadrature::{simplex, tensor, univariate};
use nalgebra::Point2;

pub use discretize_quadrature::Error as QuadratureError;

/// Quadrature points and weights on a reference domain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuadratureRule {
    pub weights: Vec<f64>,
    pub points: Vec<Point2<f64>>,
}

impl QuadratureRule {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Quadrature rules on the reference line, triangle and quadrilateral for every polynomial
/// order up to a maximum.
///
/// Edge rules carry points on the reference edge in element reference coordinates; their
/// weights are the weights of the line rule in the edge parameter `t` in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct Quad2d {
    max_order: usize,
    triangle: Vec<QuadratureRule>,
    quad: Vec<QuadratureRule>,
    line: Vec<(Vec<f64>, Vec<f64>)>,
}

impl Quad2d {
    pub fn new(max_order: usize) -> Result<Self, QuadratureError> {
        let mut triangle = Vec::with_capacity(max_order + 1);
        let mut quad = Vec::with_capacity(max_order + 1);
        let mut line = Vec::with_capacity(max_order + 1);
        for order in 0..=max_order {
            triangle.push(to_rule(simplex::triangle_for_order(order)?));
            quad.push(to_rule(tensor::quadrilateral_for_order(order)?));
            let (weights, points) = univariate::gauss_for_order(order)?;
            line.push((weights, points.into_iter().map(|[t]| t).collect()));
        }
        Ok(Self {
            max_order,
            triangle,
            quad,
            line,
        })
    }

    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Clamps `order` to the supported range.
    pub fn limit_order(&self, order: usize) -> usize {
        order.min(self.max_order)
    }

    pub fn volume(&self, mode: ElementMode, order: usize) -> &QuadratureRule {
        let order = self.limit_order(order);
        match mode {
            ElementMode::Triangle => &self.triangle[order],
            ElementMode::Quad => &self.quad[order],
        }
    }

    /// Gauss points and weights in the edge parameter `t`.
    pub fn line(&self, order: usize) -> (&[f64], &[f64]) {
        let (weights, points) = &self.line[self.limit_order(order)];
        (weights.as_slice(), points.as_slice())
    }

    /// Edge rule on reference edge `edge`. When `reversed`, the edge is traversed from its last
    /// vertex to its first, so that point `k` matches point `k` of the opposite orientation.
    pub fn edge(&self, mode: ElementMode, edge: usize, order: usize, reversed: bool) -> QuadratureRule {
        let (weights, params) = self.line(order);
        let sign = if reversed { -1.0 } else { 1.0 };
        QuadratureRule {
            weights: weights.to_vec(),
            points: params
                .iter()
                .map(|&t| reference_edge_point(mode, edge, sign * t))
                .collect(),
        }
    }
}

fn to_rule((weights, points): discretize_quadrature::Rule2d) -> QuadratureRule {
    QuadratureRule {
        weights,
        points: points.into_iter().map(|[x, y]| Point2::new(x, y)).collect(),
    }
}
