//! Conjugate gradients for symmetric positive definite systems
use crate::solvers::{axpy, dot, norm, LinearOperator};
use crate::types::{check_dimension, Result};
use log::{debug, warn};

/// CG options
#[derive(Debug, Clone, PartialEq)]
pub struct CgOptions {
    /// Relative residual at which the iteration stops
    pub tolerance: f64,
    /// Maximum number of iterations
    pub max_iterations: usize,
}

impl Default for CgOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 1000,
        }
    }
}

/// CG result
#[derive(Debug, Clone)]
pub struct CgSolution {
    /// Solution vector
    pub x: Vec<f64>,
    /// Number of iterations
    pub iterations: usize,
    /// Final relative residual
    pub residual: f64,
    /// Whether the tolerance was reached
    pub converged: bool,
}

/// Solve `A x = b` for a symmetric positive definite `A`.
pub fn cg(operator: &impl LinearOperator, rhs: &[f64], options: &CgOptions) -> Result<CgSolution> {
    let [rows, cols] = operator.shape();
    check_dimension(rows, cols)?;
    check_dimension(rows, rhs.len())?;
    let mut x = vec![0.0; rhs.len()];
    let b_norm = norm(rhs);
    if b_norm == 0.0 {
        return Ok(CgSolution {
            x,
            iterations: 0,
            residual: 0.0,
            converged: true,
        });
    }

    let mut r = rhs.to_vec();
    let mut p = r.clone();
    let mut q = vec![0.0; rhs.len()];
    let mut rho = dot(&r, &r);
    let mut residual = 1.0;
    let mut iterations = 0;
    while iterations < options.max_iterations {
        operator.apply(&p, &mut q)?;
        let pq = dot(&p, &q);
        if pq <= 0.0 {
            break;
        }
        let alpha = rho / pq;
        axpy(alpha, &p, &mut x);
        axpy(-alpha, &q, &mut r);
        iterations += 1;

        let rho_new = dot(&r, &r);
        residual = rho_new.sqrt() / b_norm;
        if residual < options.tolerance {
            break;
        }
        let beta = rho_new / rho;
        rho = rho_new;
        for (pi, ri) in p.iter_mut().zip(&r) {
            *pi = ri + beta * *pi;
        }
    }

    let converged = residual < options.tolerance;
    if converged {
        debug!("CG converged in {iterations} iterations, relative residual {residual:.3e}");
    } else {
        warn!("CG did not converge in {iterations} iterations, relative residual {residual:.3e}");
    }
    Ok(CgSolution {
        x,
        iterations,
        residual,
        converged,
    })
}
