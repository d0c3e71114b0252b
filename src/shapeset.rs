//! Shape functions on the reference elements.
use crate::mesh::ElementMode;
use nalgebra::{Point2, Vector2};
use std::fmt::Debug;

/// A family of shape functions defined on the reference triangle and quadrilateral.
pub trait Shapeset: Debug + Send + Sync {
    /// Identifies the family. Distinct families must use distinct ids.
    fn id(&self) -> u32;

    fn value(&self, mode: ElementMode, index: usize, xi: &Point2<f64>) -> f64;

    /// Gradient with respect to the reference coordinates.
    fn gradient(&self, mode: ElementMode, index: usize, xi: &Point2<f64>) -> Vector2<f64>;

    /// Polynomial order of the shape function, as used by order inference.
    fn order(&self, mode: ElementMode, index: usize) -> u32;

    /// Order in the horizontal and vertical reference directions.
    fn directional_order(&self, mode: ElementMode, index: usize) -> [u32; 2] {
        let order = self.order(mode, index);
        [order, order]
    }
}

/// Vertex ("hat") functions of the lowest-order continuous space. Index `k` belongs to vertex `k`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LinearShapeset;

impl Shapeset for LinearShapeset {
    fn id(&self) -> u32 {
        0
    }

    fn value(&self, mode: ElementMode, index: usize, xi: &Point2<f64>) -> f64 {
        let (x, y) = (xi.x, xi.y);
        match (mode, index) {
            (ElementMode::Triangle, 0) => -0.5 * (x + y),
            (ElementMode::Triangle, 1) => 0.5 * (1.0 + x),
            (ElementMode::Triangle, 2) => 0.5 * (1.0 + y),
            (ElementMode::Quad, 0) => 0.25 * (1.0 - x) * (1.0 - y),
            (ElementMode::Quad, 1) => 0.25 * (1.0 + x) * (1.0 - y),
            (ElementMode::Quad, 2) => 0.25 * (1.0 + x) * (1.0 + y),
            (ElementMode::Quad, 3) => 0.25 * (1.0 - x) * (1.0 + y),
            _ => 0.0,
        }
    }

    fn gradient(&self, mode: ElementMode, index: usize, xi: &Point2<f64>) -> Vector2<f64> {
        let (x, y) = (xi.x, xi.y);
        match (mode, index) {
            (ElementMode::Triangle, 0) => Vector2::new(-0.5, -0.5),
            (ElementMode::Triangle, 1) => Vector2::new(0.5, 0.0),
            (ElementMode::Triangle, 2) => Vector2::new(0.0, 0.5),
            (ElementMode::Quad, 0) => Vector2::new(-0.25 * (1.0 - y), -0.25 * (1.0 - x)),
            (ElementMode::Quad, 1) => Vector2::new(0.25 * (1.0 - y), -0.25 * (1.0 + x)),
            (ElementMode::Quad, 2) => Vector2::new(0.25 * (1.0 + y), 0.25 * (1.0 + x)),
            (ElementMode::Quad, 3) => Vector2::new(-0.25 * (1.0 + y), 0.25 * (1.0 - x)),
            _ => Vector2::zeros(),
        }
    }

    fn order(&self, _mode: ElementMode, _index: usize) -> u32 {
        1
    }
}

/// Highest per-direction polynomial degree supported by [`LegendreShapeset`].
pub const MAX_LEGENDRE_ORDER: usize = 10;

/// Products `P_i(x) P_j(y)` of Legendre polynomials, for discontinuous spaces.
///
/// The shape index of `(i, j)` is `i + j * (MAX_LEGENDRE_ORDER + 1)`. Quadrilaterals of order `p`
/// use all `i, j <= p`, triangles all `i + j <= p`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LegendreShapeset;

impl LegendreShapeset {
    pub fn index(i: usize, j: usize) -> usize {
        i + j * (MAX_LEGENDRE_ORDER + 1)
    }

    pub fn degrees(index: usize) -> (usize, usize) {
        (index % (MAX_LEGENDRE_ORDER + 1), index / (MAX_LEGENDRE_ORDER + 1))
    }

    /// Shape indices of a complete element of the given order.
    pub fn indices(mode: ElementMode, order: usize) -> Vec<usize> {
        let order = order.min(MAX_LEGENDRE_ORDER);
        let mut indices = Vec::new();
        for j in 0..=order {
            for i in 0..=order {
                if mode == ElementMode::Quad || i + j <= order {
                    indices.push(Self::index(i, j));
                }
            }
        }
        indices
    }
}

impl Shapeset for LegendreShapeset {
    fn id(&self) -> u32 {
        1
    }

    fn value(&self, _mode: ElementMode, index: usize, xi: &Point2<f64>) -> f64 {
        let (i, j) = Self::degrees(index);
        legendre(i, xi.x).0 * legendre(j, xi.y).0
    }

    fn gradient(&self, _mode: ElementMode, index: usize, xi: &Point2<f64>) -> Vector2<f64> {
        let (i, j) = Self::degrees(index);
        let (px, dpx) = legendre(i, xi.x);
        let (py, dpy) = legendre(j, xi.y);
        Vector2::new(dpx * py, px * dpy)
    }

    fn order(&self, mode: ElementMode, index: usize) -> u32 {
        let (i, j) = Self::degrees(index);
        match mode {
            ElementMode::Triangle => (i + j) as u32,
            ElementMode::Quad => i.max(j) as u32,
        }
    }

    fn directional_order(&self, mode: ElementMode, index: usize) -> [u32; 2] {
        let (i, j) = Self::degrees(index);
        match mode {
            ElementMode::Triangle => [(i + j) as u32; 2],
            ElementMode::Quad => [i as u32, j as u32],
        }
    }
}

/// Value and derivative of the Legendre polynomial of degree `n` at `x`.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    let (mut p_prev, mut p) = (0.0, 1.0);
    let (mut dp_prev, mut dp) = (0.0, 0.0);
    for k in 0..n {
        let k = k as f64;
        let p_next = ((2.0 * k + 1.0) * x * p - k * p_prev) / (k + 1.0);
        let dp_next = ((2.0 * k + 1.0) * (p + x * dp) - k * dp_prev) / (k + 1.0);
        p_prev = p;
        p = p_next;
        dp_prev = dp;
        dp = dp_next;
    }
    (p, dp)
}
