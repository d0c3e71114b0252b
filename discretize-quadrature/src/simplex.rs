//! Rules for the reference triangle with vertices `(-1, -1)`, `(1, -1)` and `(-1, 1)`.
//!
//! The rules are obtained by collapsing the reference quadrilateral onto the triangle
//! (the Duffy transformation)
//!
//! ```text
//! x = (1 + s)(1 - t) / 2 - 1,    y = t,
//! ```
//!
//! whose Jacobian determinant `(1 - t) / 2` raises the degree in `t` by one.

use crate::univariate::gauss;
use crate::{check_order, gauss_points_for_order, Error, Rule};

/// A collapsed Gauss rule with `n` points along each collapsed direction.
///
/// Integrates polynomials of total degree up to `2n - 2` exactly.
pub fn triangle_collapsed_gauss(num_points_per_dim: usize) -> Rule<2> {
    let (weights_1d, points_1d) = gauss(num_points_per_dim);
    let n = weights_1d.len();
    let mut weights = Vec::with_capacity(n * n);
    let mut points = Vec::with_capacity(n * n);

    for (wt, [t]) in weights_1d.iter().zip(&points_1d) {
        let jacobian = 0.5 * (1.0 - t);
        for (ws, [s]) in weights_1d.iter().zip(&points_1d) {
            let x = 0.5 * (1.0 + s) * (1.0 - t) - 1.0;
            weights.push(ws * wt * jacobian);
            points.push([x, *t]);
        }
    }

    (weights, points)
}

/// The smallest collapsed rule exact for total degree `order`.
pub fn triangle_for_order(order: usize) -> Result<Rule<2>, Error> {
    check_order(order)?;
    Ok(triangle_collapsed_gauss(gauss_points_for_order(order + 1)))
}
