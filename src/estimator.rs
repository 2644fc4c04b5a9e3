//! A posteriori error estimation on the barycentric refinement
//!
//! For a density `phi` solving `V phi = g`, the potential `w = V phi` is represented in the
//! piecewise linear discontinuous space on the barycentric refinement of the grid. The squared
//! indicator of a fine cell `T` is `diam(T) ||grad_Γ w||^2_{L2(T)}`, and the indicators of the
//! six children of a coarse cell are summed to give its squared error.
use crate::assembly::{
    assemble_dense, assemble_mass, assemble_refinement_mass, boundary::SingleLayerBoundaryIntegrand,
    AssemblyOptions, CsrMatrix,
};
use crate::element::Continuity;
use crate::function::{FunctionSpace, GridFunction};
use crate::grid::{BarycentricMap, RefinedGrid};
use crate::solvers::{solve_mass_system, LinearOperator};
use crate::types::{check_dimension, Result};
use log::{debug, info};
use rayon::prelude::*;
use rlst::DynamicArray;

/// The estimated error of a solution
#[derive(Debug, Clone)]
pub struct ErrorEstimate {
    /// Squared indicators of the fine cells
    pub local_errors_squared: Vec<f64>,
    /// Squared errors of the coarse cells
    pub element_errors_squared: Vec<f64>,
    /// Errors of the coarse cells
    pub element_errors: Vec<f64>,
    /// The squared global estimate
    pub total_squared: f64,
    /// The global estimate
    pub total: f64,
}

/// Sum fine cell values over the children of every coarse cell
pub fn aggregate(map: &BarycentricMap, local: &[f64]) -> Result<Vec<f64>> {
    check_dimension(map.number_of_fine_cells(), local.len())?;
    Ok((0..map.number_of_coarse_cells())
        .into_par_iter()
        .map(|coarse| map.children(coarse).iter().map(|fine| local[*fine]).sum())
        .collect())
}

/// Residual error estimator for single layer solutions.
///
/// Holds the single layer and mass matrices of the fine piecewise linear space, so one
/// estimator can be applied to several densities on the same grid.
pub struct ErrorEstimator<'a> {
    refined: &'a RefinedGrid<'a>,
    space: FunctionSpace<'a>,
    single_layer: DynamicArray<f64, 2>,
    mass: CsrMatrix,
}

impl<'a> ErrorEstimator<'a> {
    /// Assemble the fine single layer operator
    pub fn new(refined: &'a RefinedGrid<'a>, options: &AssemblyOptions) -> Result<Self> {
        let space = FunctionSpace::new(refined.fine(), 1, Continuity::Discontinuous)?;
        let single_layer = assemble_dense(&SingleLayerBoundaryIntegrand, &space, &space, options)?;
        let mass = assemble_mass(&space, &space)?;
        info!(
            "Error estimator on {} fine cells with {} dofs",
            refined.fine().number_of_cells(),
            space.local_size()
        );
        Ok(Self {
            refined,
            space,
            single_layer,
            mass,
        })
    }

    /// The fine piecewise linear space
    pub fn space(&self) -> &FunctionSpace<'a> {
        &self.space
    }

    /// Represent a coarse function in the fine piecewise linear space.
    ///
    /// This is exact for piecewise linear coarse functions.
    pub fn embed(&self, density: &GridFunction) -> Result<Vec<f64>> {
        let transfer = assemble_refinement_mass(density.space(), &self.space, self.refined)?;
        let mut projections = vec![0.0; self.space.local_size()];
        transfer.apply(density.coefficients(), &mut projections)?;
        solve_mass_system(&self.mass, &projections, true)
    }

    /// The fine representation of the potential `V phi`
    pub fn potential(&self, density: &GridFunction) -> Result<Vec<f64>> {
        let fine_density = self.embed(density)?;
        let projections = LinearOperator::matvec(&self.single_layer, &fine_density)?;
        solve_mass_system(&self.mass, &projections, true)
    }

    /// Estimate the error of a density on the coarse grid
    pub fn estimate(&self, density: &GridFunction) -> Result<ErrorEstimate> {
        let potential = GridFunction::from_coefficients(&self.space, self.potential(density)?)?;
        let fine = self.refined.fine();
        let local_errors_squared = potential
            .surface_gradient_norms()
            .into_par_iter()
            .enumerate()
            .map(|(cell, norm)| fine.cell_geometry(cell).diameter * norm * norm)
            .collect::<Vec<_>>();
        let element_errors_squared = aggregate(self.refined.map(), &local_errors_squared)?;
        let element_errors = element_errors_squared.iter().map(|e| e.sqrt()).collect();
        let total_squared = element_errors_squared.iter().sum::<f64>();
        debug!(
            "Largest squared cell error {:e}",
            element_errors_squared.iter().cloned().fold(0.0, f64::max)
        );
        Ok(ErrorEstimate {
            local_errors_squared,
            element_errors_squared,
            element_errors,
            total_squared,
            total: total_squared.sqrt(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::barycentric_refinement;
    use crate::shapes::{cube, regular_sphere};
    use approx::assert_relative_eq;
    use rand::prelude::*;

    #[test]
    fn test_aggregate() {
        let grid = cube(0.5);
        let refined = barycentric_refinement(&grid);
        let map = refined.map();
        let mut rng = StdRng::seed_from_u64(3);
        let local = (0..map.number_of_fine_cells())
            .map(|_| rng.gen::<f64>())
            .collect::<Vec<_>>();
        let coarse = aggregate(map, &local).unwrap();
        assert_eq!(coarse.len(), grid.number_of_cells());
        assert_relative_eq!(
            coarse.iter().sum::<f64>(),
            local.iter().sum::<f64>(),
            max_relative = 1e-12
        );
        let first = map.children(0).iter().map(|c| local[*c]).sum::<f64>();
        assert_relative_eq!(coarse[0], first);
        assert!(aggregate(map, &local[1..]).is_err());
    }

    #[test]
    fn test_embedding_is_exact() {
        let grid = cube(0.5);
        let refined = barycentric_refinement(&grid);
        let estimator = ErrorEstimator::new(&refined, &AssemblyOptions::default()).unwrap();
        let p1 = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        let coefficients = (0..p1.local_size())
            .map(|d| {
                let p = p1.reference_point(d);
                p[0] + 2.0 * p[1] - p[2]
            })
            .collect();
        let fun = GridFunction::from_coefficients(&p1, coefficients).unwrap();
        let embedded = estimator.embed(&fun).unwrap();
        let fine = GridFunction::from_coefficients(estimator.space(), embedded).unwrap();
        for cell in 0..refined.fine().number_of_cells() {
            let point = [0.2, 0.7];
            let x = refined.fine().reference_to_physical(cell, point);
            assert_relative_eq!(
                fine.evaluate(cell, point),
                x[0] + 2.0 * x[1] - x[2],
                epsilon = 1e-8
            );
        }
        assert_relative_eq!(fine.integrate(), fun.integrate(), max_relative = 1e-10);
    }

    #[test]
    fn test_estimate_of_exact_density() {
        // the exact density for a unit potential on the unit sphere is constant, so the
        // potential is almost constant and the estimate is small next to that of a perturbed
        // density
        let grid = regular_sphere(1);
        let refined = barycentric_refinement(&grid);
        let estimator = ErrorEstimator::new(&refined, &AssemblyOptions::default()).unwrap();
        let dp0 = FunctionSpace::new(&grid, 0, Continuity::Discontinuous).unwrap();
        let exact = GridFunction::from_coefficients(&dp0, vec![1.0; dp0.local_size()]).unwrap();
        let perturbed = GridFunction::from_coefficients(
            &dp0,
            (0..dp0.local_size())
                .map(|c| 1.0 + grid.cell_geometry(c).midpoint[2])
                .collect(),
        )
        .unwrap();
        let small = estimator.estimate(&exact).unwrap();
        let large = estimator.estimate(&perturbed).unwrap();
        assert_eq!(small.element_errors.len(), grid.number_of_cells());
        assert_eq!(
            small.local_errors_squared.len(),
            refined.fine().number_of_cells()
        );
        assert_relative_eq!(
            small.total_squared,
            small.local_errors_squared.iter().sum::<f64>(),
            max_relative = 1e-12
        );
        assert_relative_eq!(small.total * small.total, small.total_squared, max_relative = 1e-12);
        assert!(small.total < large.total);
    }
}
