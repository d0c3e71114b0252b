//! Quadrature rules for the reference domains used by `discretize`.
//!
//! Reference domains:
//!
//! - the interval `[-1, 1]`,
//! - the quadrilateral `[-1, 1]^2`,
//! - the triangle with vertices `(-1, -1)`, `(1, -1)` and `(-1, 1)`.
//!
//! Rules are addressed either by number of points or by the polynomial *order* they must
//! integrate exactly, which is how the assembly engine requests them.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod simplex;
pub mod tensor;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable { order: usize, max_order: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable { order, max_order } => {
                write!(
                    f,
                    "no quadrature rule of order {order} available (maximum supported order is {max_order})"
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// Highest polynomial order for which order-indexed rules are provided.
pub const MAX_ORDER: usize = 48;

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A two-dimensional point.
pub type Point2 = Point<2>;

/// A D-dimensional rule, stored as `(weights, points)`.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A one-dimensional quadrature rule.
pub type Rule1d = Rule<1>;

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights
        .iter()
        .zip(points)
        .map(|(w, x)| w * f(x))
        .sum()
}

/// Number of Gauss points needed to integrate univariate polynomials of the given order exactly.
pub fn gauss_points_for_order(order: usize) -> usize {
    order / 2 + 1
}

fn check_order(order: usize) -> Result<(), Error> {
    if order > MAX_ORDER {
        Err(Error::NoRuleAvailable {
            order,
            max_order: MAX_ORDER,
        })
    } else {
        Ok(())
    }
}
