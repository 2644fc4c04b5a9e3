//! Integrands
use crate::grid::flat_triangle_grid::dot;
use crate::grid::CellGeometry;

/// A basis function evaluated at a quadrature point.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasisPoint {
    /// Value
    pub value: f64,
    /// Surface curl
    pub curl: [f64; 3],
}

/// The integrand of a boundary operator.
///
/// `k` holds the Green's function and its gradient with respect to the trial point, as computed
/// by [`laplace_green_with_derivative`](crate::assembly::kernels::laplace_green_with_derivative).
pub trait BoundaryIntegrand: Sync {
    /// Evaluate the integrand for one test and one trial basis function
    fn evaluate(
        &self,
        k: &[f64; 4],
        test: &BasisPoint,
        trial: &BasisPoint,
        test_geometry: &CellGeometry,
        trial_geometry: &CellGeometry,
    ) -> f64;
}

/// Single layer integrand
pub struct SingleLayerBoundaryIntegrand;

impl BoundaryIntegrand for SingleLayerBoundaryIntegrand {
    fn evaluate(
        &self,
        k: &[f64; 4],
        test: &BasisPoint,
        trial: &BasisPoint,
        _test_geometry: &CellGeometry,
        _trial_geometry: &CellGeometry,
    ) -> f64 {
        k[0] * test.value * trial.value
    }
}

/// Double layer integrand
pub struct DoubleLayerBoundaryIntegrand;

impl BoundaryIntegrand for DoubleLayerBoundaryIntegrand {
    fn evaluate(
        &self,
        k: &[f64; 4],
        test: &BasisPoint,
        trial: &BasisPoint,
        _test_geometry: &CellGeometry,
        trial_geometry: &CellGeometry,
    ) -> f64 {
        let n = &trial_geometry.normal;
        (k[1] * n[0] + k[2] * n[1] + k[3] * n[2]) * test.value * trial.value
    }
}

/// Adjoint double layer integrand
pub struct AdjointDoubleLayerBoundaryIntegrand;

impl BoundaryIntegrand for AdjointDoubleLayerBoundaryIntegrand {
    fn evaluate(
        &self,
        k: &[f64; 4],
        test: &BasisPoint,
        trial: &BasisPoint,
        test_geometry: &CellGeometry,
        _trial_geometry: &CellGeometry,
    ) -> f64 {
        let n = &test_geometry.normal;
        -(k[1] * n[0] + k[2] * n[1] + k[3] * n[2]) * test.value * trial.value
    }
}

/// Hypersingular integrand in the integrated by parts form `G curl u . curl v`
pub struct HypersingularCurlCurlBoundaryIntegrand;

impl BoundaryIntegrand for HypersingularCurlCurlBoundaryIntegrand {
    fn evaluate(
        &self,
        k: &[f64; 4],
        test: &BasisPoint,
        trial: &BasisPoint,
        _test_geometry: &CellGeometry,
        _trial_geometry: &CellGeometry,
    ) -> f64 {
        k[0] * dot(&test.curl, &trial.curl)
    }
}
