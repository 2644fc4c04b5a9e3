//! Capacity of a conductor
//!
//! The surface charge `phi` of a conductor held at unit potential solves `V phi = 1`, and the
//! capacity is its total charge `∫ phi`. In strong form the system is preconditioned with the
//! regularised hypersingular operator, which is singular on constants without the rank one
//! term: the solver is applied to `D̃ V phi = D̃ 1`.
use crate::assembly::AssemblyOptions;
use crate::element::Continuity;
use crate::estimator::{ErrorEstimate, ErrorEstimator};
use crate::function::{FunctionSpace, GridFunction};
use crate::grid::{barycentric_refinement, FlatTriangleGrid};
use crate::laplace::{hypersingular, single_layer};
use crate::operator::{regularize, LinearCombination, OperatorAssembler};
use crate::solvers::{gmres, GmresOptions, LinearOperator, ProductOperator, SolveForm};
use crate::types::Result;
use log::{info, warn};

/// Options for [`CapacityProblem::solve`]
#[derive(Debug, Clone)]
pub struct CapacityOptions {
    /// Assembly options
    pub assembly: AssemblyOptions,
    /// Solver options. The strong form is the preconditioned system.
    pub solver: GmresOptions,
}

impl Default for CapacityOptions {
    fn default() -> Self {
        Self {
            assembly: AssemblyOptions::default(),
            solver: GmresOptions::default().form(SolveForm::Strong),
        }
    }
}

/// The solution of a capacity problem
#[derive(Debug)]
pub struct CapacitySolution<'a> {
    /// The surface charge
    pub density: GridFunction<'a>,
    /// The capacity `∫ phi`
    pub capacity: f64,
    /// Number of GMRES iterations
    pub iterations: usize,
    /// Final relative residual
    pub residual: f64,
    /// Whether the solver converged
    pub converged: bool,
}

/// The capacity problem on a closed grid, discretised with continuous piecewise linears
pub struct CapacityProblem<'g> {
    space: FunctionSpace<'g>,
}

impl<'g> CapacityProblem<'g> {
    /// Build the space
    pub fn new(grid: &'g FlatTriangleGrid) -> Result<Self> {
        if !grid.is_closed() {
            warn!("The capacity problem is posed on a grid that is not closed");
        }
        Ok(Self {
            space: FunctionSpace::new(grid, 1, Continuity::Continuous)?,
        })
    }

    /// The space of the density
    pub fn space(&self) -> &FunctionSpace<'g> {
        &self.space
    }

    /// Solve for the surface charge
    pub fn solve<'s>(&'s self, options: &CapacityOptions) -> Result<CapacitySolution<'s>> {
        let space = &self.space;
        let mut assembler = OperatorAssembler::new(options.assembly.clone());
        let slp = LinearCombination::from(single_layer(space, space, space)?);
        let solution = match options.solver.form {
            SolveForm::Weak => {
                let rhs = space.basis_integrals();
                gmres(&slp.assemble(&mut assembler)?, &rhs, &options.solver)?
            }
            SolveForm::Strong => {
                let preconditioner = regularize(hypersingular(space, space, space)?)?;
                let preconditioner = preconditioner.strong_form(&mut assembler)?;
                let slp = slp.strong_form(&mut assembler)?;
                let rhs = preconditioner.matvec(&vec![1.0; space.local_size()])?;
                let system = ProductOperator::new(&preconditioner, &slp)?;
                gmres(&system, &rhs, &options.solver)?
            }
        };
        if !solution.converged {
            warn!("Capacity problem did not converge, using the last iterate");
        }
        let density = GridFunction::from_coefficients(space, solution.x)?;
        let capacity = density.integrate();
        info!(
            "Capacity {capacity:.6} after {} iterations in {:?} form",
            solution.iterations, options.solver.form
        );
        Ok(CapacitySolution {
            density,
            capacity,
            iterations: solution.iterations,
            residual: solution.residual,
            converged: solution.converged,
        })
    }

    /// Estimate the error of a solution on the barycentric refinement of the grid
    pub fn estimate_error(
        &self,
        solution: &CapacitySolution,
        options: &AssemblyOptions,
    ) -> Result<ErrorEstimate> {
        let refined = barycentric_refinement(self.space.grid());
        ErrorEstimator::new(&refined, options)?.estimate(&solution.density)
    }
}
