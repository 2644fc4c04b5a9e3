//! Dense assembly of boundary operators
mod integrands;

pub use integrands::{
    AdjointDoubleLayerBoundaryIntegrand, BasisPoint, BoundaryIntegrand,
    DoubleLayerBoundaryIntegrand, HypersingularCurlCurlBoundaryIntegrand,
    SingleLayerBoundaryIntegrand,
};

use crate::assembly::common::AssemblyOptions;
use crate::assembly::kernels::laplace_green_with_derivative;
use crate::element::Table;
use crate::function::FunctionSpace;
use crate::grid::{equal_grids, CellGeometry, FlatTriangleGrid};
use crate::quadrature::{
    triangle_duffy, triangle_rule, CellToCellConnectivity, TestTrialQuadratureRule,
};
use crate::types::{Error, Result};
use log::debug;
use rayon::prelude::*;
use rlst::{rlst_dynamic_array2, DynamicArray, RawAccessMut};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Basis data of every supported cell of a space at the points of a single cell rule.
struct CellTables {
    // Indexed by cell, then point * dim + basis
    data: Vec<Vec<BasisPoint>>,
    points: Vec<Vec<[f64; 3]>>,
}

impl CellTables {
    fn new(space: &FunctionSpace, cells: &[usize], reference_points: &[[f64; 2]]) -> Self {
        let ncells = space.grid().number_of_cells();
        let table = space.element().tabulate(reference_points);
        let mut data = vec![vec![]; ncells];
        let mut points = vec![vec![]; ncells];
        for cell in cells {
            let geometry = space.grid().cell_geometry(*cell);
            data[*cell] = basis_points(&table, geometry);
            points[*cell] = reference_points
                .iter()
                .map(|p| geometry.reference_to_physical(*p))
                .collect();
        }
        Self { data, points }
    }
}

fn basis_points(table: &Table, geometry: &CellGeometry) -> Vec<BasisPoint> {
    let npoints = table.npoints();
    let dim = table.dim();
    let mut out = Vec::with_capacity(npoints * dim);
    for q in 0..npoints {
        for basis in 0..dim {
            out.push(BasisPoint {
                value: table.value(q, basis),
                curl: geometry.surface_curl(table.derivative(q, basis)),
            });
        }
    }
    out
}

/// Pairs `(test_local, trial_local)` of vertices shared by two cells, ordered by test index.
fn shared_vertices(
    grid: &FlatTriangleGrid,
    test_cell: usize,
    trial_cell: usize,
) -> Vec<(usize, usize)> {
    let trial_vertices = grid.cell_vertices(trial_cell);
    grid.cell_vertices(test_cell)
        .iter()
        .enumerate()
        .filter_map(|(test_i, v)| {
            trial_vertices
                .iter()
                .position(|w| w == v)
                .map(|trial_i| (test_i, trial_i))
        })
        .collect()
}

/// A Duffy rule with the basis functions tabulated at its points.
struct SingularRule {
    rule: TestTrialQuadratureRule,
    test_table: Table,
    trial_table: Table,
}

/// Assemble the weak form of a boundary operator into a dense matrix.
///
/// Row `i` corresponds to dof `i` of `dual` and column `j` to dof `j` of `domain`. Pairs of
/// cells sharing at least one vertex are integrated with Duffy rules, all others with the
/// tensor product of two collapsed Gauss rules.
pub fn assemble_dense(
    integrand: &impl BoundaryIntegrand,
    domain: &FunctionSpace,
    dual: &FunctionSpace,
    options: &AssemblyOptions,
) -> Result<DynamicArray<f64, 2>> {
    if !equal_grids(domain.grid(), dual.grid()) {
        return Err(Error::IncompatibleSpaces(
            "boundary operators need domain and dual spaces on the same grid".into(),
        ));
    }
    let grid = domain.grid();
    let shape = [dual.local_size(), domain.local_size()];

    let test_cells = (0..grid.number_of_cells())
        .filter(|c| dual.has_support(*c))
        .collect::<Vec<_>>();
    let trial_cells = (0..grid.number_of_cells())
        .filter(|c| domain.has_support(*c))
        .collect::<Vec<_>>();

    let regular = triangle_rule(options.quadrature_degree)?;
    let test_data = CellTables::new(dual, &test_cells, &regular.points);
    let trial_data = CellTables::new(domain, &trial_cells, &regular.points);

    let mut singular_rules = HashMap::new();
    let mut nsingular = 0;
    for test_cell in &test_cells {
        for trial_cell in &trial_cells {
            let pairs = shared_vertices(grid, *test_cell, *trial_cell);
            if pairs.is_empty() {
                continue;
            }
            nsingular += 1;
            if singular_rules.contains_key(&pairs) {
                continue;
            }
            if let Some(connectivity) = CellToCellConnectivity::from_pairs(pairs.clone()) {
                let rule = triangle_duffy(&connectivity, options.singular_quadrature_degree)?;
                let test_table = dual.element().tabulate(&rule.test_points);
                let trial_table = domain.element().tabulate(&rule.trial_points);
                singular_rules.insert(
                    pairs,
                    SingularRule {
                        rule,
                        test_table,
                        trial_table,
                    },
                );
            }
        }
    }
    debug!(
        "Assembling {} x {} matrix: {} cell pairs, {} singular, {} distinct singular rules",
        shape[0],
        shape[1],
        test_cells.len() * trial_cells.len(),
        nsingular,
        singular_rules.len()
    );

    let test_dim = dual.element().dim();
    let trial_dim = domain.element().dim();
    let output = Mutex::new(rlst_dynamic_array2!(f64, shape));
    test_cells
        .par_chunks(options.batch_size.max(1))
        .for_each(|chunk| {
            // Rows of the output touched by this batch; the batch block stores these rows of
            // every column
            let mut rows = chunk
                .iter()
                .flat_map(|c| dual.cell_dofs(*c).iter().flatten().copied())
                .collect::<Vec<_>>();
            rows.sort_unstable();
            rows.dedup();
            if rows.is_empty() {
                return;
            }
            let nrows = rows.len();
            let mut block = vec![0.0; nrows * shape[1]];
            let mut local = vec![0.0; test_dim * trial_dim];
            for test_cell in chunk {
                let test_geometry = grid.cell_geometry(*test_cell);
                for trial_cell in &trial_cells {
                    let trial_geometry = grid.cell_geometry(*trial_cell);
                    local.iter_mut().for_each(|v| *v = 0.0);
                    let pairs = shared_vertices(grid, *test_cell, *trial_cell);
                    if let Some(singular) = singular_rules.get(&pairs) {
                        integrate_singular(
                            integrand,
                            singular,
                            test_geometry,
                            trial_geometry,
                            test_dim,
                            trial_dim,
                            &mut local,
                        );
                    } else {
                        integrate_regular(
                            integrand,
                            &regular.weights,
                            (&test_data.data[*test_cell], &test_data.points[*test_cell]),
                            (&trial_data.data[*trial_cell], &trial_data.points[*trial_cell]),
                            test_geometry,
                            trial_geometry,
                            test_dim,
                            trial_dim,
                            &mut local,
                        );
                    }
                    let jacobians =
                        test_geometry.integration_element() * trial_geometry.integration_element();
                    for (i, row) in dual.cell_dofs(*test_cell).iter().enumerate() {
                        let Some(Ok(row)) = row.map(|r| rows.binary_search(&r)) else {
                            continue;
                        };
                        for (j, col) in domain.cell_dofs(*trial_cell).iter().enumerate() {
                            if let Some(col) = col {
                                block[row + nrows * col] += jacobians * local[i * trial_dim + j];
                            }
                        }
                    }
                }
            }

            let mut output = output.lock().unwrap_or_else(PoisonError::into_inner);
            let data = output.data_mut();
            for (col, values) in block.chunks_exact(nrows).enumerate() {
                for (row, value) in rows.iter().zip(values) {
                    data[row + shape[0] * col] += value;
                }
            }
        });

    Ok(output.into_inner().unwrap_or_else(PoisonError::into_inner))
}

#[allow(clippy::too_many_arguments)]
fn integrate_regular(
    integrand: &impl BoundaryIntegrand,
    weights: &[f64],
    (test_data, test_points): (&[BasisPoint], &[[f64; 3]]),
    (trial_data, trial_points): (&[BasisPoint], &[[f64; 3]]),
    test_geometry: &CellGeometry,
    trial_geometry: &CellGeometry,
    test_dim: usize,
    trial_dim: usize,
    local: &mut [f64],
) {
    for (p, (x, wx)) in test_points.iter().zip(weights).enumerate() {
        for (q, (y, wy)) in trial_points.iter().zip(weights).enumerate() {
            let k = laplace_green_with_derivative(x, y);
            let w = wx * wy;
            for i in 0..test_dim {
                let test = &test_data[p * test_dim + i];
                for j in 0..trial_dim {
                    let trial = &trial_data[q * trial_dim + j];
                    local[i * trial_dim + j] +=
                        w * integrand.evaluate(&k, test, trial, test_geometry, trial_geometry);
                }
            }
        }
    }
}

fn integrate_singular(
    integrand: &impl BoundaryIntegrand,
    singular: &SingularRule,
    test_geometry: &CellGeometry,
    trial_geometry: &CellGeometry,
    test_dim: usize,
    trial_dim: usize,
    local: &mut [f64],
) {
    let rule = &singular.rule;
    let mut test = vec![BasisPoint::default(); test_dim];
    let mut trial = vec![BasisPoint::default(); trial_dim];
    for (q, w) in rule.weights.iter().enumerate() {
        let x = test_geometry.reference_to_physical(rule.test_points[q]);
        let y = trial_geometry.reference_to_physical(rule.trial_points[q]);
        let k = laplace_green_with_derivative(&x, &y);
        for (i, t) in test.iter_mut().enumerate() {
            t.value = singular.test_table.value(q, i);
            t.curl = test_geometry.surface_curl(singular.test_table.derivative(q, i));
        }
        for (j, t) in trial.iter_mut().enumerate() {
            t.value = singular.trial_table.value(q, j);
            t.curl = trial_geometry.surface_curl(singular.trial_table.derivative(q, j));
        }
        for (i, test) in test.iter().enumerate() {
            for (j, trial) in trial.iter().enumerate() {
                local[i * trial_dim + j] +=
                    w * integrand.evaluate(&k, test, trial, test_geometry, trial_geometry);
            }
        }
    }
}
