use discretize_quadrature::integrate;
use discretize_quadrature::simplex::{triangle_collapsed_gauss, triangle_for_order};
use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;

/// Exact integral of `x^a y^b` over the reference triangle, computed by integrating the
/// inner variable analytically and the outer one with a high-order Gauss rule.
fn reference_monomial_integral(a: i32, b: i32) -> f64 {
    // Map to the unit triangle u = (x + 1) / 2, v = (y + 1) / 2, dx dy = 4 du dv.
    // Expand (2u - 1)^a (2v - 1)^b and integrate u^i v^j over the unit triangle
    // using i! j! / (i + j + 2)!.
    fn factorial(n: i32) -> f64 {
        (1..=n).map(|k| k as f64).product()
    }
    fn binomial(n: i32, k: i32) -> f64 {
        factorial(n) / (factorial(k) * factorial(n - k))
    }
    let mut total = 0.0;
    for i in 0..=a {
        for j in 0..=b {
            let coefficient = binomial(a, i)
                * binomial(b, j)
                * 2f64.powi(i + j)
                * (-1f64).powi(a - i + b - j);
            total += coefficient * factorial(i) * factorial(j) / factorial(i + j + 2);
        }
    }
    4.0 * total
}

#[test]
fn triangle_rules_integrate_constant_to_area() {
    for n in 1..=10 {
        let rule = triangle_collapsed_gauss(n);
        assert_scalar_eq!(rule.0.iter().sum::<f64>(), 2.0, comp = abs, tol = 1e-13);
    }
}

#[test]
fn triangle_points_lie_inside_reference_triangle() {
    for n in 1..=10 {
        let (_, points) = triangle_collapsed_gauss(n);
        for [x, y] in points {
            assert!(x > -1.0 && y > -1.0 && x + y < 0.0);
        }
    }
}

proptest! {
    #[test]
    fn triangle_for_order_is_exact_for_total_degree(order in 0usize..=16, split in 0usize..=16) {
        let a = split.min(order) as i32;
        let b = order as i32 - a;
        let rule = triangle_for_order(order).unwrap();
        let estimated = integrate(&rule, |&[x, y]| x.powi(a) * y.powi(b));
        let expected = reference_monomial_integral(a, b);
        prop_assert!((estimated - expected).abs() <= 1e-11 * (1.0 + expected.abs()));
    }
}
