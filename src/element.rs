//! Finite elements
mod lagrange;

pub use lagrange::LagrangeElement;

/// Continuity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Continuity {
    /// The element has standard continuity between cells
    Continuous,
    /// The element is discontinuous between cells
    Discontinuous,
}

/// Basis function values and reference derivatives tabulated at a set of points.
#[derive(Debug, Clone)]
pub struct Table {
    dim: usize,
    values: Vec<f64>,
    derivatives: Vec<[f64; 2]>,
}

impl Table {
    /// Value of basis function `basis` at point `point`
    pub fn value(&self, point: usize, basis: usize) -> f64 {
        self.values[point * self.dim + basis]
    }

    /// Reference derivative of basis function `basis` at point `point`
    pub fn derivative(&self, point: usize, basis: usize) -> [f64; 2] {
        self.derivatives[point * self.dim + basis]
    }

    /// Number of basis functions
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of points
    pub fn npoints(&self) -> usize {
        self.values.len() / self.dim
    }
}
