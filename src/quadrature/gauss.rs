//! Gauss-Legendre rules and collapsed rules on the reference triangle.
use crate::quadrature::types::{QuadratureError, QuadratureRule};

const NEWTON_TOLERANCE: f64 = 1e-15;
const NEWTON_MAX_ITERATIONS: usize = 100;

/// Gauss-Legendre points and weights on the interval [0, 1].
///
/// The weights sum to 1 and the rule integrates polynomials of degree `2 * npoints - 1`
/// exactly. The roots of the Legendre polynomial are found by Newton iteration started from
/// the Chebyshev-like initial guesses.
pub fn gauss_legendre(npoints: usize) -> Result<(Vec<f64>, Vec<f64>), QuadratureError> {
    if npoints == 0 {
        return Err(QuadratureError::RuleNotFound(npoints));
    }
    let n = npoints as f64;
    let mut points = vec![0.0; npoints];
    let mut weights = vec![0.0; npoints];

    for i in 0..npoints.div_ceil(2) {
        let mut x = f64::cos(std::f64::consts::PI * (i as f64 + 0.75) / (n + 0.5));
        for _ in 0..NEWTON_MAX_ITERATIONS {
            let (value, derivative) = legendre(npoints, x);
            let step = value / derivative;
            x -= step;
            if step.abs() < NEWTON_TOLERANCE {
                break;
            }
        }
        let derivative = legendre(npoints, x).1;
        let w = 2.0 / ((1.0 - x * x) * derivative * derivative);

        // Map from [-1, 1] to [0, 1]
        points[i] = 0.5 * (1.0 - x);
        points[npoints - 1 - i] = 0.5 * (1.0 + x);
        weights[i] = 0.5 * w;
        weights[npoints - 1 - i] = 0.5 * w;
    }
    Ok((points, weights))
}

/// Value and derivative of the Legendre polynomial of degree `n` at `x`.
fn legendre(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }
    let mut p0 = 1.0;
    let mut p1 = x;
    for k in 2..=n {
        let k = k as f64;
        let p2 = ((2.0 * k - 1.0) * x * p1 - (k - 1.0) * p0) / k;
        p0 = p1;
        p1 = p2;
    }
    let n = n as f64;
    (p1, n * (x * p1 - p0) / (x * x - 1.0))
}

/// A collapsed Gauss rule on the reference triangle (0, 0), (1, 0), (0, 1).
///
/// Uses `npoints` Gauss-Legendre points in each direction of the square and the map
/// `(u, v) -> (u, v (1 - u))`, so the rule has `npoints^2` points and is exact for polynomials
/// of total degree `2 * npoints - 2`.
pub fn triangle_rule(npoints: usize) -> Result<QuadratureRule, QuadratureError> {
    let (points, weights) = gauss_legendre(npoints)?;
    let mut rule = QuadratureRule {
        points: Vec::with_capacity(npoints * npoints),
        weights: Vec::with_capacity(npoints * npoints),
    };
    for (u, wu) in points.iter().zip(&weights) {
        for (v, wv) in points.iter().zip(&weights) {
            rule.points.push([*u, v * (1.0 - u)]);
            rule.weights.push(wu * wv * (1.0 - u));
        }
    }
    Ok(rule)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use paste::paste;

    #[test]
    fn test_zero_points() {
        assert_eq!(gauss_legendre(0), Err(QuadratureError::RuleNotFound(0)));
    }

    #[test]
    fn test_three_point_nodes() {
        let (points, weights) = gauss_legendre(3).unwrap();
        let offset = 0.5 * f64::sqrt(0.6);
        assert_relative_eq!(points[0], 0.5 - offset, epsilon = 1e-14);
        assert_relative_eq!(points[1], 0.5, epsilon = 1e-14);
        assert_relative_eq!(points[2], 0.5 + offset, epsilon = 1e-14);
        assert_relative_eq!(weights[0], 5.0 / 18.0, epsilon = 1e-14);
        assert_relative_eq!(weights[1], 8.0 / 18.0, epsilon = 1e-14);
    }

    macro_rules! test_interval {
        ($($n:literal),+) => {
            $(
                paste! {
                    #[test]
                    fn [<test_interval_ $n>]() {
                        let (points, weights) = gauss_legendre($n).unwrap();
                        for degree in 0..2 * $n {
                            let integral = points
                                .iter()
                                .zip(&weights)
                                .map(|(x, w)| w * x.powi(degree as i32))
                                .sum::<f64>();
                            assert_relative_eq!(integral, 1.0 / (degree as f64 + 1.0), epsilon = 1e-13);
                        }
                    }
                }
            )*
        };
    }

    macro_rules! test_triangle {
        ($($n:literal),+) => {
            $(
                paste! {
                    #[test]
                    fn [<test_triangle_ $n>]() {
                        let rule = triangle_rule($n).unwrap();
                        assert_eq!(rule.npoints(), $n * $n);
                        // Integral of x^a y^b over the triangle is a! b! / (a + b + 2)!
                        let factorial = |k: usize| (1..=k).product::<usize>() as f64;
                        for a in 0..2 * $n - 1 {
                            for b in 0..2 * $n - 1 - a {
                                let integral = rule
                                    .points
                                    .iter()
                                    .zip(&rule.weights)
                                    .map(|(p, w)| w * p[0].powi(a as i32) * p[1].powi(b as i32))
                                    .sum::<f64>();
                                let expected = factorial(a) * factorial(b) / factorial(a + b + 2);
                                assert_relative_eq!(integral, expected, epsilon = 1e-13);
                            }
                        }
                    }
                }
            )*
        };
    }

    test_interval!(1, 2, 3, 4, 7, 12);
    test_triangle!(1, 2, 3, 4, 6);
}
