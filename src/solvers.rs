//! Iterative solvers
mod cg;
mod gmres;

pub use cg::{cg, CgOptions, CgSolution};
pub use gmres::{gmres, GmresOptions, GmresSolution};

use crate::assembly::CsrMatrix;
use crate::types::{check_dimension, Error, Result};
use rlst::{rlst_array_from_slice1, rlst_array_from_slice_mut1, DynamicArray, MultInto, Shape};

/// Whether a system is solved in its weak (Galerkin matrix) form or in its strong form, where
/// every row is multiplied by the inverse of the mass matrix of its range and dual spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveForm {
    /// Solve with the Galerkin matrix
    #[default]
    Weak,
    /// Solve with the mass-matrix preconditioned operator
    Strong,
}

/// A linear map between coefficient vectors.
pub trait LinearOperator: Sync {
    /// The shape `[rows, columns]`
    fn shape(&self) -> [usize; 2];

    /// Compute `y = A x`
    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<()>;

    /// Compute and return `A x`
    fn matvec(&self, x: &[f64]) -> Result<Vec<f64>> {
        let mut y = vec![0.0; self.shape()[0]];
        self.apply(x, &mut y)?;
        Ok(y)
    }
}

impl LinearOperator for CsrMatrix {
    fn shape(&self) -> [usize; 2] {
        Shape::shape(self)
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        let [rows, cols] = Shape::shape(self);
        check_dimension(cols, x.len())?;
        check_dimension(rows, y.len())?;
        self.matmul(1.0, x, 0.0, y);
        Ok(())
    }
}

impl LinearOperator for DynamicArray<f64, 2> {
    fn shape(&self) -> [usize; 2] {
        Shape::shape(self)
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        let [rows, cols] = Shape::shape(self);
        check_dimension(cols, x.len())?;
        check_dimension(rows, y.len())?;
        if rows == 0 || cols == 0 {
            y.iter_mut().for_each(|v| *v = 0.0);
            return Ok(());
        }
        rlst_array_from_slice_mut1!(y, [rows])
            .simple_mult_into(self.view(), rlst_array_from_slice1!(x, [cols]));
        Ok(())
    }
}

/// The composition `A B` of two operators.
pub struct ProductOperator<'o, A: LinearOperator, B: LinearOperator> {
    left: &'o A,
    right: &'o B,
}

impl<'o, A: LinearOperator, B: LinearOperator> ProductOperator<'o, A, B> {
    /// Compose two operators
    pub fn new(left: &'o A, right: &'o B) -> Result<Self> {
        check_dimension(left.shape()[1], right.shape()[0])?;
        Ok(Self { left, right })
    }
}

impl<'o, A: LinearOperator, B: LinearOperator> LinearOperator for ProductOperator<'o, A, B> {
    fn shape(&self) -> [usize; 2] {
        [self.left.shape()[0], self.right.shape()[1]]
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        let z = self.right.matvec(x)?;
        self.left.apply(&z, y)
    }
}

/// Solve a mass matrix system.
///
/// Symmetric systems (a space paired with itself) use CG, all others GMRES. A solve that does
/// not reach its tolerance is an error.
pub(crate) fn solve_mass_system(
    mass: &CsrMatrix,
    rhs: &[f64],
    symmetric: bool,
) -> Result<Vec<f64>> {
    let [rows, cols] = Shape::shape(mass);
    if rows != cols {
        return Err(Error::IncompatibleSpaces(format!(
            "cannot invert a {rows} x {cols} mass matrix"
        )));
    }
    let (x, iterations, residual, converged) = if symmetric {
        let s = cg(mass, rhs, &CgOptions::default())?;
        (s.x, s.iterations, s.residual, s.converged)
    } else {
        let options = GmresOptions::default()
            .tolerance(1e-11)
            .restart(rows.clamp(1, 200))
            .max_iterations(10 * rows.max(100));
        let s = gmres(mass, rhs, &options)?;
        (s.x, s.iterations, s.residual, s.converged)
    };
    if converged {
        Ok(x)
    } else {
        Err(Error::MassSolve {
            iterations,
            residual,
        })
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

pub(crate) fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::assembly::SparseMatrixData;
    use rlst::{rlst_dynamic_array2, RawAccessMut};

    #[test]
    fn test_dense_matvec() {
        let mut a = rlst_dynamic_array2!(f64, [2, 3]);
        // column major: [[1, 2, 3], [4, 5, 6]]
        a.data_mut().copy_from_slice(&[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        let y = LinearOperator::matvec(&a, &[1.0, 0.0, -1.0]).unwrap();
        assert_eq!(y, vec![-2.0, -2.0]);
        assert!(LinearOperator::matvec(&a, &[1.0]).is_err());
    }

    #[test]
    fn test_product() {
        let mut a = SparseMatrixData::new([2, 2]);
        a.push(0, 1, 1.0);
        a.push(1, 0, 2.0);
        let a = a.to_csr().unwrap();
        let product = ProductOperator::new(&a, &a).unwrap();
        assert_eq!(product.matvec(&[1.0, 3.0]).unwrap(), vec![2.0, 6.0]);
    }

    #[test]
    fn test_dense_matvec_without_columns() {
        let a = rlst_dynamic_array2!(f64, [2, 0]);
        let y = LinearOperator::matvec(&a, &[]).unwrap();
        assert_eq!(y, vec![0.0, 0.0]);
    }

    #[test]
    fn test_mass_system() {
        let mut m = SparseMatrixData::new([2, 2]);
        m.push(0, 0, 2.0);
        m.push(1, 1, 4.0);
        let m = m.to_csr().unwrap();
        for symmetric in [true, false] {
            let x = solve_mass_system(&m, &[2.0, 2.0], symmetric).unwrap();
            assert!((x[0] - 1.0).abs() < 1e-10);
            assert!((x[1] - 0.5).abs() < 1e-10);
        }
    }

    #[test]
    fn test_singular_mass_system_fails() {
        let mut m = SparseMatrixData::new([2, 2]);
        m.push(0, 0, 1.0);
        let m = m.to_csr().unwrap();
        for symmetric in [true, false] {
            assert!(matches!(
                solve_mass_system(&m, &[1.0, 1.0], symmetric),
                Err(Error::MassSolve { .. })
            ));
        }
    }
}
