use discretize_quadrature::univariate::{gauss, gauss_for_order};
use discretize_quadrature::{integrate, Error, MAX_ORDER};

use matrixcompare::assert_scalar_eq;

fn monomial_integral_1d(alpha: i32) -> f64 {
    (1.0 - (-1.0f64).powi(alpha + 1)) / (alpha as f64 + 1.0)
}

#[test]
fn gauss_rules_satisfy_expected_accuracy() {
    for n in 1..=30 {
        let expected_polynomial_degree = 2 * n - 1;
        let rule = gauss(n);

        assert_eq!(rule.0.len(), n);
        assert!(rule.0.iter().all(|&w| w > 0.0));

        for alpha in 0..=expected_polynomial_degree as i32 {
            let estimated_integral = integrate(&rule, |&[x]| x.powi(alpha));
            assert_scalar_eq!(estimated_integral, monomial_integral_1d(alpha), comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn gauss_points_are_symmetric() {
    for n in 1..=12 {
        let (weights, points) = gauss(n);
        for i in 0..n {
            let mirror = n - 1 - i;
            assert_scalar_eq!(points[i][0], -points[mirror][0], comp = abs, tol = 1e-15);
            assert_scalar_eq!(weights[i], weights[mirror], comp = abs, tol = 1e-15);
        }
    }
}

#[test]
fn gauss_for_order_is_exact_for_requested_order() {
    for order in 0..=24 {
        let rule = gauss_for_order(order).unwrap();
        let estimated_integral = integrate(&rule, |&[x]| x.powi(order as i32));
        assert_scalar_eq!(estimated_integral, monomial_integral_1d(order as i32), comp = abs, tol = 1e-13);
    }
}

#[test]
fn gauss_for_order_rejects_unsupported_orders() {
    let err = gauss_for_order(MAX_ORDER + 1).unwrap_err();
    assert_eq!(
        err,
        Error::NoRuleAvailable {
            order: MAX_ORDER + 1,
            max_order: MAX_ORDER
        }
    );
}
