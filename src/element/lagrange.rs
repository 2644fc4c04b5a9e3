//! Lagrange elements on the reference triangle
use crate::element::{Continuity, Table};
use crate::grid::TRIANGLE_EDGES;
use crate::types::{Error, Result};

const VERTICES: [[f64; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
const BARYCENTRIC_GRADIENTS: [[f64; 2]; 3] = [[-1.0, -1.0], [1.0, 0.0], [0.0, 1.0]];

/// A Lagrange element of degree 0, 1 or 2 on the reference triangle (0, 0), (1, 0), (0, 1).
///
/// The basis functions are the nodal functions of the interpolation points: the centroid for
/// degree 0, the vertices for degree 1, and the vertices followed by the midpoints of the
/// three local edges for degree 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LagrangeElement {
    degree: usize,
    continuity: Continuity,
}

impl LagrangeElement {
    /// Create a Lagrange element
    pub fn create(degree: usize, continuity: Continuity) -> Result<Self> {
        if degree > 2 {
            return Err(Error::InvalidSpace(format!(
                "Lagrange elements of degree {degree} are not supported"
            )));
        }
        if degree == 0 && continuity == Continuity::Continuous {
            return Err(Error::InvalidSpace(
                "cannot create a continuous degree 0 Lagrange element".into(),
            ));
        }
        Ok(Self { degree, continuity })
    }

    /// The polynomial degree
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// The continuity
    pub fn continuity(&self) -> Continuity {
        self.continuity
    }

    /// The number of basis functions
    pub fn dim(&self) -> usize {
        (self.degree + 1) * (self.degree + 2) / 2
    }

    /// The interpolation point of each basis function
    pub fn points(&self) -> Vec<[f64; 2]> {
        match self.degree {
            0 => vec![[1.0 / 3.0, 1.0 / 3.0]],
            1 => VERTICES.to_vec(),
            _ => {
                let mut points = VERTICES.to_vec();
                for [a, b] in TRIANGLE_EDGES {
                    points.push([
                        0.5 * (VERTICES[a][0] + VERTICES[b][0]),
                        0.5 * (VERTICES[a][1] + VERTICES[b][1]),
                    ]);
                }
                points
            }
        }
    }

    /// The sub-entity `(dimension, local index)` of the reference triangle on whose interior
    /// the interpolation point of a basis function lies.
    pub fn reference_entity(&self, dof: usize) -> (usize, usize) {
        match (self.degree, dof) {
            (0, _) => (2, 0),
            (_, 0..=2) => (0, dof),
            _ => (1, dof - 3),
        }
    }

    /// The basis functions associated with a sub-entity.
    ///
    /// For discontinuous elements all basis functions belong to the cell interior so that no
    /// dof is shared between cells.
    pub fn entity_dofs(&self, dim: usize, index: usize) -> Vec<usize> {
        match self.continuity {
            Continuity::Discontinuous => {
                if dim == 2 {
                    (0..self.dim()).collect()
                } else {
                    vec![]
                }
            }
            Continuity::Continuous => (0..self.dim())
                .filter(|dof| self.reference_entity(*dof) == (dim, index))
                .collect(),
        }
    }

    /// Evaluate the basis functions and their reference derivatives at a point.
    pub fn evaluate(&self, point: [f64; 2], values: &mut [f64], derivatives: &mut [[f64; 2]]) {
        debug_assert!(values.len() >= self.dim() && derivatives.len() >= self.dim());
        let lambda = [1.0 - point[0] - point[1], point[0], point[1]];
        let grad = BARYCENTRIC_GRADIENTS;
        match self.degree {
            0 => {
                values[0] = 1.0;
                derivatives[0] = [0.0, 0.0];
            }
            1 => {
                values[..3].copy_from_slice(&lambda);
                derivatives[..3].copy_from_slice(&grad);
            }
            _ => {
                for i in 0..3 {
                    values[i] = lambda[i] * (2.0 * lambda[i] - 1.0);
                    let s = 4.0 * lambda[i] - 1.0;
                    derivatives[i] = [s * grad[i][0], s * grad[i][1]];
                }
                for (e, [a, b]) in TRIANGLE_EDGES.iter().enumerate() {
                    values[3 + e] = 4.0 * lambda[*a] * lambda[*b];
                    derivatives[3 + e] = [0, 1].map(|k| {
                        4.0 * (lambda[*b] * grad[*a][k] + lambda[*a] * grad[*b][k])
                    });
                }
            }
        }
    }

    /// Tabulate the basis functions and their derivatives at a set of points
    pub fn tabulate(&self, points: &[[f64; 2]]) -> Table {
        let dim = self.dim();
        let mut table = Table {
            dim,
            values: vec![0.0; dim * points.len()],
            derivatives: vec![[0.0; 2]; dim * points.len()],
        };
        for (i, p) in points.iter().enumerate() {
            self.evaluate(
                *p,
                &mut table.values[i * dim..(i + 1) * dim],
                &mut table.derivatives[i * dim..(i + 1) * dim],
            );
        }
        table
    }
}
