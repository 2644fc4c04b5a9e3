//! Laplace Green's function
use std::f64::consts::FRAC_1_PI;

const M_INV_4PI: f64 = 0.25 * FRAC_1_PI;

/// Evaluate `1 / (4 pi |x - y|)`.
///
/// Returns zero for coincident points.
pub fn laplace_green(x: &[f64; 3], y: &[f64; 3]) -> f64 {
    let diff_norm = distance(x, y);
    if diff_norm == 0.0 {
        0.0
    } else {
        M_INV_4PI / diff_norm
    }
}

/// Evaluate the Green's function and its gradient with respect to the source point `y`.
///
/// The result is `[G, dG/dy_0, dG/dy_1, dG/dy_2]` where `dG/dy = (x - y) / (4 pi |x - y|^3)`.
pub fn laplace_green_with_derivative(x: &[f64; 3], y: &[f64; 3]) -> [f64; 4] {
    let diff_norm = distance(x, y);
    if diff_norm == 0.0 {
        return [0.0; 4];
    }
    let inv_diff_norm = 1.0 / diff_norm;
    let value = M_INV_4PI * inv_diff_norm;
    let scale = value * inv_diff_norm * inv_diff_norm;
    [
        value,
        (x[0] - y[0]) * scale,
        (x[1] - y[1]) * scale,
        (x[2] - y[2]) * scale,
    ]
}

fn distance(x: &[f64; 3], y: &[f64; 3]) -> f64 {
    ((x[0] - y[0]) * (x[0] - y[0]) + (x[1] - y[1]) * (x[1] - y[1]) + (x[2] - y[2]) * (x[2] - y[2]))
        .sqrt()
}
