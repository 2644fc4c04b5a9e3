//! Restarted GMRES
use crate::solvers::{axpy, dot, norm, LinearOperator, SolveForm};
use crate::types::{check_dimension, Result};
use log::{debug, info, warn};

const BREAKDOWN_TOLERANCE: f64 = 1e-14;

/// GMRES options
#[derive(Debug, Clone, PartialEq)]
pub struct GmresOptions {
    /// Relative residual at which the iteration stops
    pub tolerance: f64,
    /// Number of inner iterations before a restart
    pub restart: usize,
    /// Maximum total number of iterations
    pub max_iterations: usize,
    /// Form of the system handed to the solver by block operators
    pub form: SolveForm,
}

impl Default for GmresOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            restart: 50,
            max_iterations: 500,
            form: SolveForm::Weak,
        }
    }
}

impl GmresOptions {
    /// Set the tolerance
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the restart length
    pub fn restart(mut self, restart: usize) -> Self {
        self.restart = restart.max(1);
        self
    }

    /// Set the maximum number of iterations
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the form
    pub fn form(mut self, form: SolveForm) -> Self {
        self.form = form;
        self
    }
}

/// GMRES result
///
/// A solve that does not reach the tolerance still returns its best iterate, with `converged`
/// set to false.
#[derive(Debug, Clone)]
pub struct GmresSolution {
    /// Solution vector
    pub x: Vec<f64>,
    /// Total number of iterations
    pub iterations: usize,
    /// Final relative residual
    pub residual: f64,
    /// Whether the tolerance was reached
    pub converged: bool,
}

fn givens_rotation(a: f64, b: f64) -> (f64, f64) {
    if b == 0.0 {
        return (1.0, 0.0);
    }
    if a == 0.0 {
        return (0.0, 1.0);
    }
    let r = a.hypot(b);
    (a / r, b / r)
}

/// Solve the upper triangular system `H[..k, ..k] y = g[..k]`.
fn solve_upper_triangular(h: &[Vec<f64>], g: &[f64], k: usize) -> Vec<f64> {
    let mut y = vec![0.0; k];
    for i in (0..k).rev() {
        let mut sum = g[i];
        for j in (i + 1)..k {
            sum -= h[j][i] * y[j];
        }
        if h[i][i].abs() > 1e-300 {
            y[i] = sum / h[i][i];
        }
    }
    y
}

/// Solve `A x = b` with restarted GMRES starting from zero.
///
/// The Arnoldi basis is orthogonalised with modified Gram-Schmidt and the least squares problem
/// is updated with Givens rotations. `max_iterations` bounds the total number of inner
/// iterations across restarts.
pub fn gmres(
    operator: &impl LinearOperator,
    rhs: &[f64],
    options: &GmresOptions,
) -> Result<GmresSolution> {
    let [rows, cols] = operator.shape();
    check_dimension(rows, cols)?;
    check_dimension(rows, rhs.len())?;
    let n = rhs.len();
    let m = options.restart.max(1);
    let mut x = vec![0.0; n];

    let b_norm = norm(rhs);
    if b_norm == 0.0 {
        return Ok(GmresSolution {
            x,
            iterations: 0,
            residual: 0.0,
            converged: true,
        });
    }

    let mut iterations = 0;
    let mut r = vec![0.0; n];
    while iterations < options.max_iterations {
        operator.apply(&x, &mut r)?;
        for (ri, bi) in r.iter_mut().zip(rhs) {
            *ri = bi - *ri;
        }
        let beta = norm(&r);
        if beta / b_norm < options.tolerance {
            break;
        }

        let mut v = vec![r.iter().map(|ri| ri / beta).collect::<Vec<_>>()];
        // Column j of the Hessenberg matrix is h[j]
        let mut h: Vec<Vec<f64>> = Vec::with_capacity(m);
        let mut cs: Vec<f64> = Vec::with_capacity(m);
        let mut sn: Vec<f64> = Vec::with_capacity(m);
        let mut g = vec![0.0; m + 1];
        g[0] = beta;

        let mut steps = 0;
        let mut breakdown = false;
        for j in 0..m {
            if iterations == options.max_iterations {
                break;
            }
            iterations += 1;
            steps = j + 1;

            let mut w = operator.matvec(&v[j])?;
            let mut column = vec![0.0; j + 2];
            for (i, vi) in v.iter().enumerate().take(j + 1) {
                column[i] = dot(vi, &w);
                axpy(-column[i], vi, &mut w);
            }
            let w_norm = norm(&w);
            column[j + 1] = w_norm;
            if w_norm < BREAKDOWN_TOLERANCE * beta {
                breakdown = true;
            } else {
                v.push(w.iter().map(|wi| wi / w_norm).collect());
            }

            for i in 0..j {
                let temp = cs[i] * column[i] + sn[i] * column[i + 1];
                column[i + 1] = -sn[i] * column[i] + cs[i] * column[i + 1];
                column[i] = temp;
            }
            let (c, s) = givens_rotation(column[j], column[j + 1]);
            cs.push(c);
            sn.push(s);
            column[j] = c * column[j] + s * column[j + 1];
            column[j + 1] = 0.0;
            g[j + 1] = -s * g[j];
            g[j] *= c;
            h.push(column);

            let residual = g[j + 1].abs() / b_norm;
            debug!("GMRES iteration {iterations}: relative residual {residual:.3e}");
            if residual < options.tolerance || breakdown {
                break;
            }
        }

        let y = solve_upper_triangular(&h, &g, steps);
        for (yi, vi) in y.iter().zip(&v) {
            axpy(*yi, vi, &mut x);
        }
        // the next cycle starts from the true residual and stops there if it is small enough
    }

    operator.apply(&x, &mut r)?;
    for (ri, bi) in r.iter_mut().zip(rhs) {
        *ri = bi - *ri;
    }
    let residual = norm(&r) / b_norm;
    let converged = residual < options.tolerance;
    if converged {
        info!("GMRES converged in {iterations} iterations, relative residual {residual:.3e}");
    } else {
        warn!(
            "GMRES did not converge in {iterations} iterations, relative residual {residual:.3e}"
        );
    }
    Ok(GmresSolution {
        x,
        iterations,
        residual,
        converged,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::assembly::SparseMatrixData;
    use approx::assert_relative_eq;
    use rand::prelude::*;
    use rlst::{rlst_dynamic_array2, RawAccessMut};

    #[test]
    fn test_gmres_simple() {
        let mut a = SparseMatrixData::new([2, 2]);
        a.push(0, 0, 4.0);
        a.push(0, 1, 1.0);
        a.push(1, 0, 1.0);
        a.push(1, 1, 3.0);
        let a = a.to_csr().unwrap();
        let b = [1.0, 2.0];
        let solution = gmres(&a, &b, &GmresOptions::default().tolerance(1e-12)).unwrap();
        assert!(solution.converged);
        assert!(solution.iterations <= 2);
        assert_relative_eq!(solution.x[0], 1.0 / 11.0, epsilon = 1e-10);
        assert_relative_eq!(solution.x[1], 7.0 / 11.0, epsilon = 1e-10);
    }

    #[test]
    fn test_gmres_restarted() {
        let n = 40;
        let mut rng = StdRng::seed_from_u64(0);
        let mut a = rlst_dynamic_array2!(f64, [n, n]);
        for (k, value) in a.data_mut().iter_mut().enumerate() {
            let (i, j) = (k % n, k / n);
            *value = if i == j { 4.0 } else { 0.0 } + 0.5 * rng.gen::<f64>() / n as f64;
            if j == i + 1 {
                *value += 1.0;
            }
        }
        let b = (0..n).map(|_| rng.gen::<f64>()).collect::<Vec<_>>();
        let options = GmresOptions::default().tolerance(1e-10).restart(5);
        let solution = gmres(&a, &b, &options).unwrap();
        assert!(solution.converged);
        let ax = LinearOperator::matvec(&a, &solution.x).unwrap();
        for (ai, bi) in ax.iter().zip(&b) {
            assert_relative_eq!(ai, bi, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_gmres_not_converged() {
        let n = 30;
        let mut a = SparseMatrixData::new([n, n]);
        // Cyclic shift: GMRES makes no progress before iteration n
        for i in 0..n {
            a.push((i + 1) % n, i, 1.0);
        }
        let a = a.to_csr().unwrap();
        let mut b = vec![0.0; n];
        b[0] = 1.0;
        let solution = gmres(&a, &b, &GmresOptions::default().max_iterations(5)).unwrap();
        assert!(!solution.converged);
        assert_eq!(solution.iterations, 5);
        assert_relative_eq!(solution.residual, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_rhs_and_shapes() {
        let mut a = SparseMatrixData::new([2, 2]);
        a.push(0, 0, 1.0);
        let a = a.to_csr().unwrap();
        let solution = gmres(&a, &[0.0, 0.0], &GmresOptions::default()).unwrap();
        assert!(solution.converged);
        assert_eq!(solution.iterations, 0);
        assert!(gmres(&a, &[1.0], &GmresOptions::default()).is_err());
    }
}
