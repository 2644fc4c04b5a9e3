//! Quadrature rule definitions.

/// Quadrature error
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuadratureError {
    /// No rule exists for the requested number of points
    #[error("no quadrature rule with {0} points")]
    RuleNotFound(usize),
    /// The cell-to-cell connectivity is inconsistent
    #[error("invalid connectivity: dimension {dimension} with {pairs} shared vertex pairs")]
    ConnectivityError {
        /// Connectivity dimension
        dimension: usize,
        /// Number of shared vertex pairs
        pairs: usize,
    },
}

/// A quadrature rule on a single reference cell.
#[derive(Debug, Clone)]
pub struct QuadratureRule {
    /// Points on the reference cell
    pub points: Vec<[f64; 2]>,
    /// Weights, summing to the reference cell volume
    pub weights: Vec<f64>,
}

impl QuadratureRule {
    /// Number of points
    pub fn npoints(&self) -> usize {
        self.weights.len()
    }
}

/// A rule for double integrals over a pair of reference triangles.
///
/// Point `i` of the rule is the pair `(test_points[i], trial_points[i])`. These rules are used
/// when the integral cannot be written as a tensor product of two single cell rules, as for
/// the weakly singular integrals over touching cells.
#[derive(Debug, Clone)]
pub struct TestTrialQuadratureRule {
    /// Points on the test cell
    pub test_points: Vec<[f64; 2]>,
    /// Points on the trial cell
    pub trial_points: Vec<[f64; 2]>,
    /// Weights
    pub weights: Vec<f64>,
}

impl TestTrialQuadratureRule {
    /// Number of point pairs
    pub fn npoints(&self) -> usize {
        self.weights.len()
    }
}

/// How a test cell touches a trial cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellToCellConnectivity {
    /// Dimension of the shared entity: 0 for a vertex, 1 for an edge, 2 for the same cell
    pub connectivity_dimension: usize,
    /// Pairs `(test_local_vertex, trial_local_vertex)` of shared vertices
    pub local_indices: Vec<(usize, usize)>,
}

impl CellToCellConnectivity {
    /// Build the connectivity from the shared vertex pairs of two triangles.
    ///
    /// Returns `None` if the cells do not touch.
    pub fn from_pairs(pairs: Vec<(usize, usize)>) -> Option<Self> {
        match pairs.len() {
            0 => None,
            n => Some(Self {
                connectivity_dimension: n - 1,
                local_indices: pairs,
            }),
        }
    }
}
