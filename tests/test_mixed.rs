extern crate blas_src;
extern crate lapack_src;

use approx::assert_relative_eq;
use bempp_segments::mixed::{MixedOptions, MixedProblem};
use bempp_segments::shapes::cube;
use bempp_segments::solvers::{GmresOptions, SolveForm};
use bempp_segments::types::Error;

fn options() -> MixedOptions {
    MixedOptions {
        solver: GmresOptions::default()
            .tolerance(1e-8)
            .restart(200)
            .max_iterations(400),
        ..Default::default()
    }
}

#[test]
fn test_mixed_cube() {
    // u = 1 on the x = 0 and y = 0 faces and du/dn = 0 elsewhere has the solution u = 1
    let grid = cube(0.5);
    let problem = MixedProblem::new(&grid, &[1, 3], &[2, 4, 5, 6]).unwrap();
    let solution = problem.solve(|_, _, _| 1.0, |_, _, _| 0.0, &options()).unwrap();
    assert!(solution.converged);
    assert!(solution.residual <= 1e-8);

    assert_eq!(
        solution.dirichlet.coefficients().len(),
        problem.global_dirichlet().local_size()
    );
    for c in solution.dirichlet.coefficients() {
        assert_relative_eq!(*c, 1.0, epsilon = 5e-2);
    }
    for c in solution.neumann.coefficients() {
        assert!(c.is_finite());
        assert!(c.abs() < 0.5);
    }
}

#[test]
fn test_mixed_linear_harmonic() {
    // u = x + 2y - z is harmonic, so the trace on the whole cube is recovered from its values
    // on two faces and its normal derivative on the other four
    let grid = cube(0.25);
    let problem = MixedProblem::new(&grid, &[1, 3], &[2, 4, 5, 6]).unwrap();
    let exact = |p: &[f64; 3]| p[0] + 2.0 * p[1] - p[2];
    let solution = problem
        .solve(
            |p, _, _| exact(p),
            |_, n, _| n[0] + 2.0 * n[1] - n[2],
            &options(),
        )
        .unwrap();
    assert!(solution.converged);

    let global = problem.global_dirichlet();
    for (dof, value) in solution.dirichlet.coefficients().iter().enumerate() {
        assert_relative_eq!(*value, exact(&global.reference_point(dof)), epsilon = 5e-3);
    }
}

#[test]
fn test_mixed_recombination() {
    let grid = cube(0.5);
    let problem = MixedProblem::new(&grid, &[1, 3], &[2, 4, 5, 6]).unwrap();
    let solution = problem
        .solve(|_, _, _| 1.0, |p, _, _| p[2], &options())
        .unwrap();
    let global = problem.global_dirichlet();

    // every global dof takes its value from exactly one of the two parts
    let known = &solution.dirichlet_data;
    let solved = &solution.solved_dirichlet;
    for (dof, value) in solution.dirichlet.coefficients().iter().enumerate() {
        let global_dof = global.global_dof_index(dof);
        match (
            known.space().local_dof_index(global_dof),
            solved.space().local_dof_index(global_dof),
        ) {
            (Some(i), None) => assert_eq!(*value, known.coefficients()[i]),
            (None, Some(i)) => assert_eq!(*value, solved.coefficients()[i]),
            _ => panic!("dof {global_dof} is not owned by exactly one part"),
        }
    }
    // the given Dirichlet data is reproduced exactly
    for c in known.coefficients() {
        assert_relative_eq!(*c, 1.0, epsilon = 1e-8);
    }

    let global = problem.global_neumann();
    let known = &solution.neumann_data;
    for (i, value) in known.coefficients().iter().enumerate() {
        let dof = global
            .local_dof_index(known.space().global_dof_index(i))
            .unwrap();
        assert_eq!(solution.neumann.coefficients()[dof], *value);
    }
}

#[test]
fn test_mixed_strong_form_needs_square_rows() {
    // the first row maps into the quadratic space but is tested with the piecewise linear
    // space, so it has no strong form
    let grid = cube(0.5);
    let problem = MixedProblem::new(&grid, &[1, 3], &[2, 4, 5, 6]).unwrap();
    let mut options = options();
    options.solver = options.solver.form(SolveForm::Strong);
    assert!(matches!(
        problem.solve(|_, _, _| 1.0, |_, _, _| 0.0, &options),
        Err(Error::IncompatibleSpaces(_))
    ));
}
