//! Sparse assembly of mass matrices
use crate::assembly::common::{CsrMatrix, SparseMatrixData};
use crate::function::FunctionSpace;
use crate::grid::{equal_grids, RefinedGrid};
use crate::quadrature::triangle_rule;
use crate::types::{Error, Result};
use log::debug;

/// Number of collapsed Gauss points per direction that integrate the product of two basis
/// functions exactly.
fn mass_rule_points(domain: &FunctionSpace, dual: &FunctionSpace) -> usize {
    (domain.element().degree() + dual.element().degree() + 3) / 2
}

/// Assemble the mass matrix `M[i, j] = int psi_i phi_j` of a dual and a domain space.
///
/// Rows follow the dofs of `dual`, columns the dofs of `domain`.
pub fn assemble_mass(domain: &FunctionSpace, dual: &FunctionSpace) -> Result<CsrMatrix> {
    if !equal_grids(domain.grid(), dual.grid()) {
        return Err(Error::IncompatibleSpaces(
            "mass matrices need domain and dual spaces on the same grid".into(),
        ));
    }
    let grid = domain.grid();
    let rule = triangle_rule(mass_rule_points(domain, dual))?;
    let test_table = dual.element().tabulate(&rule.points);
    let trial_table = domain.element().tabulate(&rule.points);
    let shape = [dual.local_size(), domain.local_size()];
    let mut out = SparseMatrixData::new(shape);

    for cell in 0..grid.number_of_cells() {
        let jdet = grid.cell_geometry(cell).integration_element();
        for (i, row) in dual.cell_dofs(cell).iter().enumerate() {
            let Some(row) = row else { continue };
            for (j, col) in domain.cell_dofs(cell).iter().enumerate() {
                let Some(col) = col else { continue };
                let value = rule
                    .weights
                    .iter()
                    .enumerate()
                    .map(|(q, w)| w * test_table.value(q, i) * trial_table.value(q, j))
                    .sum::<f64>();
                out.push(*row, *col, jdet * value);
            }
        }
    }
    let matrix = out.to_csr()?;
    debug!(
        "Assembled {} x {} mass matrix with {} entries",
        shape[0],
        shape[1],
        matrix.data().len()
    );
    Ok(matrix)
}

/// Assemble the mixed mass matrix between a space on a grid and a space on its barycentric
/// refinement.
///
/// Entry `[i, j]` is the integral over the fine grid of fine dual basis function `i` times
/// coarse domain basis function `j`.
pub fn assemble_refinement_mass(
    coarse_domain: &FunctionSpace,
    fine_dual: &FunctionSpace,
    refined: &RefinedGrid,
) -> Result<CsrMatrix> {
    if !equal_grids(coarse_domain.grid(), refined.coarse())
        || !equal_grids(fine_dual.grid(), refined.fine())
    {
        return Err(Error::IncompatibleSpaces(
            "spaces do not live on the coarse and fine grids of the refinement".into(),
        ));
    }
    let fine = refined.fine();
    let map = refined.map();
    let rule = triangle_rule(mass_rule_points(coarse_domain, fine_dual))?;
    let test_table = fine_dual.element().tabulate(&rule.points);
    let shape = [fine_dual.local_size(), coarse_domain.local_size()];
    let mut out = SparseMatrixData::new(shape);

    for fine_cell in 0..fine.number_of_cells() {
        let coarse_cell = map.parent(fine_cell);
        if !fine_dual.has_support(fine_cell) || !coarse_domain.has_support(coarse_cell) {
            continue;
        }
        let coarse_points = rule
            .points
            .iter()
            .map(|p| map.fine_to_coarse_reference(fine_cell, *p))
            .collect::<Vec<_>>();
        let trial_table = coarse_domain.element().tabulate(&coarse_points);
        let jdet = fine.cell_geometry(fine_cell).integration_element();
        for (i, row) in fine_dual.cell_dofs(fine_cell).iter().enumerate() {
            let Some(row) = row else { continue };
            for (j, col) in coarse_domain.cell_dofs(coarse_cell).iter().enumerate() {
                let Some(col) = col else { continue };
                let value = rule
                    .weights
                    .iter()
                    .enumerate()
                    .map(|(q, w)| w * test_table.value(q, i) * trial_table.value(q, j))
                    .sum::<f64>();
                out.push(*row, *col, jdet * value);
            }
        }
    }
    out.to_csr()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::Continuity;
    use crate::function::SegmentOptions;
    use crate::grid::barycentric_refinement;
    use crate::shapes::{cube, screen_triangles};
    use approx::assert_relative_eq;
    use rlst::{AijIterator, Shape};
    use std::collections::HashMap;

    #[test]
    fn test_mass_total() {
        let grid = cube(0.5);
        for (degree, continuity) in [
            (0, Continuity::Discontinuous),
            (1, Continuity::Continuous),
            (2, Continuity::Continuous),
        ] {
            let space = FunctionSpace::new(&grid, degree, continuity).unwrap();
            let mass = assemble_mass(&space, &space).unwrap();
            let total = mass.iter_aij().map(|(_, _, v)| v).sum::<f64>();
            assert_relative_eq!(total, 6.0, max_relative = 1e-12);
            let entries = mass
                .iter_aij()
                .map(|(i, j, v)| ((i, j), v))
                .collect::<HashMap<_, _>>();
            for ((i, j), v) in &entries {
                assert_relative_eq!(*v, entries[&(*j, *i)], max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_mixed_mass_shape() {
        let grid = screen_triangles(2);
        let p1 = FunctionSpace::on_segment(
            &grid,
            1,
            Continuity::Continuous,
            &[1],
            SegmentOptions::closed(),
        )
        .unwrap();
        let dp0 = FunctionSpace::new(&grid, 0, Continuity::Discontinuous).unwrap();
        let mass = assemble_mass(&p1, &dp0).unwrap();
        assert_eq!(Shape::shape(&mass), [dp0.local_size(), p1.local_size()]);
        // The closed P1 space covers the left column and extends into the right column
        let total = mass.iter_aij().map(|(_, _, v)| v).sum::<f64>();
        assert!(total > 0.5);
    }

    #[test]
    fn test_refinement_mass() {
        let grid = cube(0.5);
        let refined = barycentric_refinement(&grid);
        let coarse = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        let fine = FunctionSpace::new(refined.fine(), 1, Continuity::Discontinuous).unwrap();
        let mass = assemble_refinement_mass(&coarse, &fine, &refined).unwrap();
        assert_eq!(Shape::shape(&mass), [fine.local_size(), coarse.local_size()]);
        let total = mass.iter_aij().map(|(_, _, v)| v).sum::<f64>();
        assert_relative_eq!(total, 6.0, max_relative = 1e-12);

        assert!(matches!(
            assemble_refinement_mass(&fine, &coarse, &refined),
            Err(Error::IncompatibleSpaces(_))
        ));
    }
}
