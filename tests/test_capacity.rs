extern crate blas_src;
extern crate lapack_src;

use approx::assert_relative_eq;
use bempp_segments::assembly::AssemblyOptions;
use bempp_segments::capacity::{CapacityOptions, CapacityProblem};
use bempp_segments::estimator::{aggregate, ErrorEstimator};
use bempp_segments::grid::barycentric_refinement;
use bempp_segments::shapes::{cube, reentrant_cube};
use bempp_segments::solvers::{GmresOptions, SolveForm};

#[test]
fn test_capacity_of_reentrant_cube() {
    let grid = reentrant_cube(0.5, 0.5);
    let problem = CapacityProblem::new(&grid).unwrap();
    let solution = problem.solve(&CapacityOptions::default()).unwrap();
    assert!(solution.converged);
    assert!(solution.iterations < 10);
    // the unit cube has capacity about 8.3 in these units
    assert!(solution.capacity > 5.0 && solution.capacity < 10.0);
    assert!(solution.density.coefficients().iter().all(|c| c.is_finite()));

    let estimate = problem
        .estimate_error(&solution, &AssemblyOptions::default())
        .unwrap();
    assert_eq!(estimate.element_errors.len(), grid.number_of_cells());
    assert!(estimate.total.is_finite() && estimate.total > 0.0);
    assert_relative_eq!(
        estimate.element_errors_squared.iter().sum::<f64>(),
        estimate.local_errors_squared.iter().sum::<f64>(),
        max_relative = 1e-12
    );
    for (e, e2) in estimate
        .element_errors
        .iter()
        .zip(&estimate.element_errors_squared)
    {
        assert_relative_eq!(e * e, *e2, max_relative = 1e-12);
    }
}

#[test]
fn test_forms_agree_on_cube() {
    let grid = cube(0.25);
    let problem = CapacityProblem::new(&grid).unwrap();
    let solve = |form| {
        problem
            .solve(&CapacityOptions {
                solver: GmresOptions::default().tolerance(1e-6).form(form),
                ..Default::default()
            })
            .unwrap()
    };
    let strong = solve(SolveForm::Strong);
    let weak = solve(SolveForm::Weak);
    assert!(strong.converged && weak.converged);
    assert!(strong.iterations < 10);
    assert_relative_eq!(strong.capacity, weak.capacity, max_relative = 1e-3);
}

#[test]
fn test_estimator_aggregation() {
    let grid = reentrant_cube(0.5, 0.5);
    let refined = barycentric_refinement(&grid);
    let problem = CapacityProblem::new(&grid).unwrap();
    let solution = problem.solve(&CapacityOptions::default()).unwrap();
    let estimator = ErrorEstimator::new(&refined, &AssemblyOptions::default()).unwrap();
    let estimate = estimator.estimate(&solution.density).unwrap();
    let again = aggregate(refined.map(), &estimate.local_errors_squared).unwrap();
    assert_eq!(again, estimate.element_errors_squared);
    for (coarse, value) in again.iter().enumerate() {
        let children = refined.map().children(coarse);
        let sum = children
            .iter()
            .map(|c| estimate.local_errors_squared[*c])
            .sum::<f64>();
        assert_relative_eq!(*value, sum, max_relative = 1e-14);
    }
}
