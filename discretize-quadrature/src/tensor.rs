//! Tensor-product rules for the reference quadrilateral `[-1, 1]^2`.

use crate::univariate::gauss;
use crate::{check_order, gauss_points_for_order, Error, Rule};

/// A Gauss rule for the reference quadrilateral with `n` points per dimension.
///
/// Integrates monomials `x^a y^b` exactly for `a, b <= 2n - 1`.
pub fn quadrilateral_gauss(num_points_per_dim: usize) -> Rule<2> {
    let (weights_1d, points_1d) = gauss(num_points_per_dim);
    let n = weights_1d.len();
    let mut weights = Vec::with_capacity(n * n);
    let mut points = Vec::with_capacity(n * n);

    for (wy, [y]) in weights_1d.iter().zip(&points_1d) {
        for (wx, [x]) in weights_1d.iter().zip(&points_1d) {
            weights.push(wx * wy);
            points.push([*x, *y]);
        }
    }

    (weights, points)
}

/// The smallest tensor Gauss rule exact for per-direction polynomial degree `order`.
pub fn quadrilateral_for_order(order: usize) -> Result<Rule<2>, Error> {
    check_order(order)?;
    Ok(quadrilateral_gauss(gauss_points_for_order(order)))
}
