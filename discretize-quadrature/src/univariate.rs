//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::{check_order, gauss_points_for_order, Error, Rule};
use std::f64::consts::PI;

const MAX_NEWTON_ITERATIONS: usize = 100;

/// Legendre polynomial `P_n` and its predecessor `P_{n-1}` evaluated at a point.
///
/// The derivative formula divides by `x^2 - 1`, so it is only usable in the open interval.
#[derive(Debug, Clone, Copy)]
struct Legendre {
    degree: usize,
    x: f64,
    current: f64,
    previous: f64,
}

impl Legendre {
    fn at(degree: usize, x: f64) -> Self {
        // Bonnet's recursion: m P_m = (2m - 1) x P_{m-1} - (m - 1) P_{m-2}
        let (mut current, mut previous) = (1.0, 0.0);
        for m in 1..=degree {
            let m = m as f64;
            let next = ((2.0 * m - 1.0) * x * current - (m - 1.0) * previous) / m;
            previous = current;
            current = next;
        }
        Self {
            degree,
            x,
            current,
            previous,
        }
    }

    fn derivative(&self) -> f64 {
        let n = self.degree as f64;
        n * (self.x * self.current - self.previous) / (self.x * self.x - 1.0)
    }
}

/// Gauss–Legendre quadrature on `[-1, 1]` with the given number of points.
///
/// A rule with `n` points integrates polynomials up to degree `2n - 1` exactly. Points are
/// returned in descending order, symmetric about the origin.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    let half = (n + 1) / 2;
    let mut points = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);

    for i in 0..half {
        // Tricomi's initial guess, refined by Newton's method
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut legendre = Legendre::at(n, x);
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let dx = -legendre.current / legendre.derivative();
            x += dx;
            legendre = Legendre::at(n, x);
            if dx.abs() <= 1e-15 {
                break;
            }
        }
        let dp = legendre.derivative();
        points.push([x]);
        weights.push(2.0 / ((1.0 - x * x) * dp * dp));
    }

    for i in half..n {
        let mirror = n - i - 1;
        points.push([-points[mirror][0]]);
        weights.push(weights[mirror]);
    }

    (weights, points)
}

/// The smallest Gauss rule that integrates polynomials of the given order exactly.
pub fn gauss_for_order(order: usize) -> Result<Rule<1>, Error> {
    check_order(order)?;
    Ok(gauss(gauss_points_for_order(order)))
}
