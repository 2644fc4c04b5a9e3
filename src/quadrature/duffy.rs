//! Duffy rules for pairs of touching triangles.
//!
//! The rules follow the regularising transformations of Sauter and Schwab. Each rule is first
//! built on the Duffy reference triangle (0, 0), (1, 0), (1, 1) and then mapped onto the
//! reference triangle (0, 0), (1, 0), (0, 1) so that the shared vertices of test and trial
//! cell land on the same reference vertices.
use crate::quadrature::{
    gauss::gauss_legendre,
    types::{CellToCellConnectivity, QuadratureError, TestTrialQuadratureRule},
};

/// Accumulates the point pairs of a Duffy rule.
struct RuleBuilder {
    rule: TestTrialQuadratureRule,
}

impl RuleBuilder {
    fn with_capacity(n: usize) -> Self {
        Self {
            rule: TestTrialQuadratureRule {
                test_points: Vec::with_capacity(n),
                trial_points: Vec::with_capacity(n),
                weights: Vec::with_capacity(n),
            },
        }
    }

    fn push(&mut self, test: [f64; 2], trial: [f64; 2], weight: f64) {
        self.rule.test_points.push(test);
        self.rule.trial_points.push(trial);
        self.rule.weights.push(weight);
    }

    fn finish(
        mut self,
        test_map: impl Fn([f64; 2]) -> [f64; 2],
        trial_map: impl Fn([f64; 2]) -> [f64; 2],
    ) -> TestTrialQuadratureRule {
        for p in self.rule.test_points.iter_mut() {
            *p = test_map(*p);
        }
        for p in self.rule.trial_points.iter_mut() {
            *p = trial_map(*p);
        }
        self.rule
    }
}

/// Reference coordinates of a vertex of the reference triangle.
fn reference_vertex(index: usize) -> [f64; 2] {
    match index {
        0 => [0.0, 0.0],
        1 => [1.0, 0.0],
        _ => [0.0, 1.0],
    }
}

/// The affine map taking the Duffy triangle onto the reference triangle.
///
/// It sends (0, 0) to vertex `v0`, (1, 0) to vertex `v1` and (1, 1) to the remaining vertex.
pub(crate) fn triangle_mapper(v0: usize, v1: usize) -> impl Fn([f64; 2]) -> [f64; 2] {
    let p0 = reference_vertex(v0);
    let p1 = reference_vertex(v1);
    let p2 = reference_vertex(3 - v0 - v1);
    let col0 = [p1[0] - p0[0], p1[1] - p0[1]];
    let col1 = [p2[0] - p1[0], p2[1] - p1[1]];
    move |p: [f64; 2]| {
        [
            p0[0] + col0[0] * p[0] + col1[0] * p[1],
            p0[1] + col0[1] * p[0] + col1[1] * p[1],
        ]
    }
}

/// The next vertex of the reference triangle in anticlockwise order.
fn next_vertex(index: usize) -> usize {
    (index + 1) % 3
}

/// Iterate over the four dimensional tensor Gauss rule.
fn for_each_tensor_point(points: &[f64], weights: &[f64], mut f: impl FnMut([f64; 4], f64)) {
    for (eta1, w1) in points.iter().zip(weights) {
        for (eta2, w2) in points.iter().zip(weights) {
            for (eta3, w3) in points.iter().zip(weights) {
                for (xi, w4) in points.iter().zip(weights) {
                    f([*eta1, *eta2, *eta3, *xi], w1 * w2 * w3 * w4);
                }
            }
        }
    }
}

fn identical_triangles(points: &[f64], weights: &[f64]) -> TestTrialQuadratureRule {
    let n = points.len();
    let mut builder = RuleBuilder::with_capacity(6 * n * n * n * n);
    for_each_tensor_point(points, weights, |[eta1, eta2, eta3, xi], w| {
        let eta12 = eta1 * eta2;
        let eta123 = eta12 * eta3;
        let weight = w * xi * xi * xi * eta1 * eta1 * eta2;

        builder.push(
            [xi, xi * (1.0 - eta1 + eta12)],
            [xi * (1.0 - eta123), xi * (1.0 - eta1)],
            weight,
        );
        builder.push(
            [xi * (1.0 - eta123), xi * (1.0 - eta1)],
            [xi, xi * (1.0 - eta1 + eta12)],
            weight,
        );
        builder.push(
            [xi, xi * (eta1 - eta12 + eta123)],
            [xi * (1.0 - eta12), xi * (eta1 - eta12)],
            weight,
        );
        builder.push(
            [xi * (1.0 - eta12), xi * (eta1 - eta12)],
            [xi, xi * (eta1 - eta12 + eta123)],
            weight,
        );
        builder.push(
            [xi * (1.0 - eta123), xi * (eta1 - eta123)],
            [xi, xi * (eta1 - eta12)],
            weight,
        );
        builder.push(
            [xi, xi * (eta1 - eta12)],
            [xi * (1.0 - eta123), xi * (eta1 - eta123)],
            weight,
        );
    });
    builder.finish(triangle_mapper(0, 1), triangle_mapper(0, 1))
}

fn edge_adjacent_triangles(
    points: &[f64],
    weights: &[f64],
    test_edge: (usize, usize),
    trial_edge: (usize, usize),
) -> TestTrialQuadratureRule {
    let n = points.len();
    let mut builder = RuleBuilder::with_capacity(5 * n * n * n * n);
    for_each_tensor_point(points, weights, |[eta1, eta2, eta3, xi], w| {
        let eta12 = eta1 * eta2;
        let eta123 = eta12 * eta3;
        let weight = w * xi * xi * xi * eta1 * eta1;

        builder.push(
            [xi, xi * eta1 * eta3],
            [xi * (1.0 - eta12), xi * (eta1 - eta12)],
            weight,
        );
        builder.push(
            [xi, xi * eta1],
            [xi * (1.0 - eta123), xi * (eta12 - eta123)],
            eta2 * weight,
        );
        builder.push(
            [xi * (1.0 - eta12), xi * (eta1 - eta12)],
            [xi, xi * eta123],
            eta2 * weight,
        );
        builder.push(
            [xi * (1.0 - eta123), xi * (eta12 - eta123)],
            [xi, xi * eta1],
            eta2 * weight,
        );
        builder.push(
            [xi * (1.0 - eta123), xi * (eta1 - eta123)],
            [xi, xi * eta12],
            eta2 * weight,
        );
    });
    builder.finish(
        triangle_mapper(test_edge.0, test_edge.1),
        triangle_mapper(trial_edge.0, trial_edge.1),
    )
}

fn vertex_adjacent_triangles(
    points: &[f64],
    weights: &[f64],
    test_vertex: usize,
    trial_vertex: usize,
) -> TestTrialQuadratureRule {
    let n = points.len();
    let mut builder = RuleBuilder::with_capacity(2 * n * n * n * n);
    for_each_tensor_point(points, weights, |[eta1, eta2, eta3, xi], w| {
        let weight = w * xi * xi * xi * eta2;
        builder.push([xi, xi * eta1], [xi * eta2, xi * eta2 * eta3], weight);
        builder.push([xi * eta2, xi * eta2 * eta3], [xi, xi * eta1], weight);
    });
    builder.finish(
        triangle_mapper(test_vertex, next_vertex(test_vertex)),
        triangle_mapper(trial_vertex, next_vertex(trial_vertex)),
    )
}

/// Create a Duffy rule for a pair of touching triangles.
///
/// `npoints` is the number of Gauss-Legendre points in each of the four directions of the
/// underlying tensor rule.
pub fn triangle_duffy(
    connectivity: &CellToCellConnectivity,
    npoints: usize,
) -> Result<TestTrialQuadratureRule, QuadratureError> {
    let (points, weights) = gauss_legendre(npoints)?;
    let pairs = &connectivity.local_indices;
    let error = || QuadratureError::ConnectivityError {
        dimension: connectivity.connectivity_dimension,
        pairs: pairs.len(),
    };

    match connectivity.connectivity_dimension {
        2 => Ok(identical_triangles(&points, &weights)),
        1 => {
            if pairs.len() != 2 {
                return Err(error());
            }
            Ok(edge_adjacent_triangles(
                &points,
                &weights,
                (pairs[0].0, pairs[1].0),
                (pairs[0].1, pairs[1].1),
            ))
        }
        0 => {
            if pairs.len() != 1 {
                return Err(error());
            }
            Ok(vertex_adjacent_triangles(
                &points,
                &weights,
                pairs[0].0,
                pairs[0].1,
            ))
        }
        _ => Err(error()),
    }
}
