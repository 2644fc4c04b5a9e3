//! Mixed Dirichlet-Neumann problems
//!
//! The boundary is split into a Dirichlet part, where the trace `u` is known, and a Neumann
//! part, where the normal derivative `t` is known. With `u = g_D + u_N` and `t = t_D + t_N`
//! the unknowns are `t_D` on the Dirichlet part and `u_N` on the Neumann part, and the
//! Calderón identities give the block system
//!
//! ```text
//! [  V   -K ] [ t_D ]   [ (1/2 + K) g_D - V t_N        ]
//! [  K'   W ] [ u_N ] = [ -W g_D + (1/2 - K') t_N      ]
//! ```
//!
//! tested with the piecewise linear discontinuous space of the Dirichlet part in the first row
//! and the quadratic space of the Neumann part in the second.
use crate::assembly::AssemblyOptions;
use crate::element::Continuity;
use crate::function::{recombine, FunctionSpace, GridFunction, SegmentOptions};
use crate::grid::FlatTriangleGrid;
use crate::laplace::{adjoint_double_layer, double_layer, hypersingular, identity, single_layer};
use crate::operator::{BlockOperator, LinearCombination, OperatorAssembler};
use crate::solvers::GmresOptions;
use crate::types::{Error, Result};
use log::{info, warn};

/// Options for [`MixedProblem::solve`]
#[derive(Debug, Clone, Default)]
pub struct MixedOptions {
    /// Assembly options
    pub assembly: AssemblyOptions,
    /// Solver options; the form also selects the form of the right-hand side
    pub solver: GmresOptions,
}

/// The segment spaces of a mixed problem
pub struct MixedProblem<'g> {
    neumann_on_dirichlet: FunctionSpace<'g>,
    neumann_on_neumann: FunctionSpace<'g>,
    dirichlet_on_dirichlet: FunctionSpace<'g>,
    dirichlet_on_neumann: FunctionSpace<'g>,
    dual_dirichlet: FunctionSpace<'g>,
    global_dirichlet: FunctionSpace<'g>,
    global_neumann: FunctionSpace<'g>,
}

/// The solution of a mixed problem
#[derive(Debug)]
pub struct MixedSolution<'a> {
    /// The full trace `u`
    pub dirichlet: GridFunction<'a>,
    /// The full normal derivative `t`
    pub neumann: GridFunction<'a>,
    /// The given trace on the Dirichlet part
    pub dirichlet_data: GridFunction<'a>,
    /// The given normal derivative on the Neumann part
    pub neumann_data: GridFunction<'a>,
    /// The computed trace on the Neumann part
    pub solved_dirichlet: GridFunction<'a>,
    /// The computed normal derivative on the Dirichlet part
    pub solved_neumann: GridFunction<'a>,
    /// Number of GMRES iterations
    pub iterations: usize,
    /// Final relative residual
    pub residual: f64,
    /// Whether the solver converged
    pub converged: bool,
}

impl<'g> MixedProblem<'g> {
    /// Build the spaces for a boundary split into Dirichlet and Neumann segments
    pub fn new(
        grid: &'g FlatTriangleGrid,
        dirichlet_segments: &[usize],
        neumann_segments: &[usize],
    ) -> Result<Self> {
        if let Some(id) = dirichlet_segments
            .iter()
            .find(|id| neumann_segments.contains(id))
        {
            return Err(Error::InvalidSpace(format!(
                "segment {id} is both a Dirichlet and a Neumann segment"
            )));
        }
        let on_segment = |degree, continuity, ids: &[usize], options| {
            FunctionSpace::on_segment(grid, degree, continuity, ids, options)
        };
        let discontinuous = Continuity::Discontinuous;
        let continuous = Continuity::Continuous;
        Ok(Self {
            neumann_on_dirichlet: on_segment(
                1,
                discontinuous,
                dirichlet_segments,
                SegmentOptions::closed().element_on_segment(true),
            )?,
            neumann_on_neumann: on_segment(
                1,
                discontinuous,
                neumann_segments,
                SegmentOptions::open()
                    .element_on_segment(true)
                    .reference_point_on_segment(false),
            )?,
            dirichlet_on_dirichlet: on_segment(
                2,
                continuous,
                dirichlet_segments,
                SegmentOptions::closed(),
            )?,
            dirichlet_on_neumann: on_segment(
                2,
                continuous,
                neumann_segments,
                SegmentOptions::open(),
            )?,
            dual_dirichlet: on_segment(
                2,
                continuous,
                dirichlet_segments,
                SegmentOptions::closed().strictly_on_segment(true),
            )?,
            global_dirichlet: FunctionSpace::new(grid, 2, continuous)?,
            global_neumann: FunctionSpace::new(grid, 1, discontinuous)?,
        })
    }

    /// Piecewise linear space for the unknown normal derivative on the Dirichlet part
    pub fn neumann_on_dirichlet(&self) -> &FunctionSpace<'g> {
        &self.neumann_on_dirichlet
    }

    /// Piecewise linear space for the given normal derivative on the Neumann part
    pub fn neumann_on_neumann(&self) -> &FunctionSpace<'g> {
        &self.neumann_on_neumann
    }

    /// Quadratic space for the given trace, closed on the Dirichlet part
    pub fn dirichlet_on_dirichlet(&self) -> &FunctionSpace<'g> {
        &self.dirichlet_on_dirichlet
    }

    /// Quadratic space for the unknown trace, open on the Neumann part
    pub fn dirichlet_on_neumann(&self) -> &FunctionSpace<'g> {
        &self.dirichlet_on_neumann
    }

    /// The global quadratic space
    pub fn global_dirichlet(&self) -> &FunctionSpace<'g> {
        &self.global_dirichlet
    }

    /// The global piecewise linear space
    pub fn global_neumann(&self) -> &FunctionSpace<'g> {
        &self.global_neumann
    }

    /// The system matrix of the unknowns `[t_D, u_N]`
    pub fn system<'s>(&'s self) -> Result<BlockOperator<'s>> {
        let (nd, dd) = (&self.neumann_on_dirichlet, &self.dirichlet_on_dirichlet);
        let (nn, dn) = (&self.neumann_on_neumann, &self.dirichlet_on_neumann);
        let mut block = BlockOperator::new(2, 2);
        block.set(0, 0, single_layer(nd, dd, nd)?)?;
        block.set(0, 1, -LinearCombination::from(double_layer(dn, dd, nd)?))?;
        block.set(1, 0, adjoint_double_layer(nd, nn, dn)?)?;
        block.set(1, 1, hypersingular(dn, nn, dn)?)?;
        Ok(block)
    }

    /// The operator mapping the known data `[g_D, t_N]` to the right-hand side
    pub fn rhs_operator<'s>(&'s self) -> Result<BlockOperator<'s>> {
        let (nd, dd) = (&self.neumann_on_dirichlet, &self.dirichlet_on_dirichlet);
        let (nn, dn) = (&self.neumann_on_neumann, &self.dirichlet_on_neumann);
        let mut block = BlockOperator::new(2, 2);
        block.set(
            0,
            0,
            LinearCombination::term(0.5, identity(dd, dd, nd)?)
                .add(1.0, double_layer(dd, dd, nd)?)?,
        )?;
        block.set(0, 1, LinearCombination::term(-1.0, single_layer(nn, dd, nd)?))?;
        block.set(1, 0, LinearCombination::term(-1.0, hypersingular(dd, nn, dn)?))?;
        block.set(
            1,
            1,
            LinearCombination::term(0.5, identity(nn, nn, dn)?)
                .add(-1.0, adjoint_double_layer(nn, nn, dn)?)?,
        )?;
        Ok(block)
    }

    /// Solve for boundary data given as callables `f(point, normal, domain_index)`.
    ///
    /// The Dirichlet data is projected against the quadratic space truncated to the Dirichlet
    /// part, the Neumann data against its own space.
    pub fn solve<'s, F, G>(
        &'s self,
        dirichlet_data: F,
        neumann_data: G,
        options: &MixedOptions,
    ) -> Result<MixedSolution<'s>>
    where
        F: Fn(&[f64; 3], &[f64; 3], usize) -> f64 + Sync,
        G: Fn(&[f64; 3], &[f64; 3], usize) -> f64 + Sync,
    {
        let dirichlet_data = GridFunction::from_function(
            &self.dirichlet_on_dirichlet,
            &self.dual_dirichlet,
            dirichlet_data,
        )?;
        let neumann_data = GridFunction::from_function(
            &self.neumann_on_neumann,
            &self.neumann_on_neumann,
            neumann_data,
        )?;

        let mut assembler = OperatorAssembler::new(options.assembly.clone());
        let system = self.system()?;
        let rhs = self.rhs_operator()?.apply(
            &mut assembler,
            &[&dirichlet_data, &neumann_data],
            options.solver.form,
        )?;
        let solution = system.solve(&mut assembler, &rhs, &options.solver)?;
        if !solution.converged {
            warn!("Mixed problem did not converge, using the last iterate");
        }
        let mut functions = solution.functions.into_iter();
        let (Some(solved_neumann), Some(solved_dirichlet)) = (functions.next(), functions.next())
        else {
            return Err(Error::BlockShape("expected two solution blocks".into()));
        };

        let dirichlet = recombine(&[&dirichlet_data, &solved_dirichlet], &self.global_dirichlet)?;
        let neumann = recombine(&[&neumann_data, &solved_neumann], &self.global_neumann)?;
        info!(
            "Mixed problem solved with {} unknowns, {} operators assembled",
            rhs.len(),
            assembler.len()
        );
        Ok(MixedSolution {
            dirichlet,
            neumann,
            dirichlet_data,
            neumann_data,
            solved_dirichlet,
            solved_neumann,
            iterations: solution.iterations,
            residual: solution.residual,
            converged: solution.converged,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shapes::cube;

    #[test]
    fn test_spaces_partition() {
        let grid = cube(0.5);
        let problem = MixedProblem::new(&grid, &[1, 3], &[2, 4, 5, 6]).unwrap();
        let dirichlet_sizes = [
            problem.dirichlet_on_dirichlet().local_size(),
            problem.dirichlet_on_neumann().local_size(),
        ];
        let neumann_sizes = [
            problem.neumann_on_dirichlet().local_size(),
            problem.neumann_on_neumann().local_size(),
        ];
        assert_eq!(
            dirichlet_sizes.iter().sum::<usize>(),
            problem.global_dirichlet().local_size()
        );
        assert_eq!(
            neumann_sizes.iter().sum::<usize>(),
            problem.global_neumann().local_size()
        );
        // 16 cells on the Dirichlet faces
        assert_eq!(problem.neumann_on_dirichlet().local_size(), 48);
        assert!(matches!(
            MixedProblem::new(&grid, &[1, 3], &[3, 4]),
            Err(Error::InvalidSpace(_))
        ));
        assert!(matches!(
            MixedProblem::new(&grid, &[7], &[1]),
            Err(Error::UnknownSegment { .. })
        ));
    }

    #[test]
    fn test_system_shape() {
        let grid = cube(0.5);
        let problem = MixedProblem::new(&grid, &[1, 3], &[2, 4, 5, 6]).unwrap();
        let system = problem.system().unwrap();
        let rows = system.row_spaces().unwrap();
        let cols = system.domain_spaces().unwrap();
        for (row, col) in rows.iter().zip(&cols) {
            assert!(std::ptr::eq(row.1, *col));
        }
        let rhs = problem.rhs_operator().unwrap();
        assert_eq!(rhs.domain_spaces().unwrap().len(), 2);
    }
}
