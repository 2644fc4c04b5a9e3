//! Functions in a function space
use crate::assembly::assemble_mass;
use crate::element::Table;
use crate::function::FunctionSpace;
use crate::grid::flat_triangle_grid::dot;
use crate::quadrature::{triangle_rule, QuadratureRule};
use crate::solvers::{solve_mass_system, LinearOperator};
use crate::types::{check_dimension, Error, Result};
use rayon::prelude::*;

/// A function given by its coefficients in a function space.
#[derive(Clone)]
pub struct GridFunction<'a> {
    space: &'a FunctionSpace<'a>,
    coefficients: Vec<f64>,
}

impl std::fmt::Debug for GridFunction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridFunction")
            .field("size", &self.coefficients.len())
            .field("segment", &self.space.segment().map(|s| s.ids()))
            .finish()
    }
}

impl<'a> GridFunction<'a> {
    /// Create a function from its coefficients
    pub fn from_coefficients(
        space: &'a FunctionSpace<'a>,
        coefficients: Vec<f64>,
    ) -> Result<Self> {
        check_dimension(space.local_size(), coefficients.len())?;
        Ok(Self {
            space,
            coefficients,
        })
    }

    /// The zero function
    pub fn zero(space: &'a FunctionSpace<'a>) -> Self {
        Self {
            space,
            coefficients: vec![0.0; space.local_size()],
        }
    }

    /// Create a function from its projections `p_i = <f, psi_i>` onto the basis of a dual
    /// space, by solving the mass matrix system of `space` and `dual`.
    pub fn from_projections(
        space: &'a FunctionSpace<'a>,
        dual: &FunctionSpace,
        projections: &[f64],
    ) -> Result<Self> {
        check_dimension(dual.local_size(), projections.len())?;
        if space.local_size() != dual.local_size() {
            return Err(Error::IncompatibleSpaces(format!(
                "a space with {} dofs cannot be recovered from {} projections",
                space.local_size(),
                dual.local_size()
            )));
        }
        let mass = assemble_mass(space, dual)?;
        let coefficients = solve_mass_system(&mass, projections, same_space(space, dual))?;
        Self::from_coefficients(space, coefficients)
    }

    /// Create the L2 projection of a callable `f(point, normal, domain_index)`.
    ///
    /// The projections are taken against the basis of `dual`, which must have as many dofs as
    /// `space`.
    pub fn from_function<F>(
        space: &'a FunctionSpace<'a>,
        dual: &FunctionSpace,
        f: F,
    ) -> Result<Self>
    where
        F: Fn(&[f64; 3], &[f64; 3], usize) -> f64 + Sync,
    {
        let projections = function_projections(dual, &f)?;
        Self::from_projections(space, dual, &projections)
    }

    /// The space
    pub fn space(&self) -> &'a FunctionSpace<'a> {
        self.space
    }

    /// The coefficients
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Take the coefficients
    pub fn into_coefficients(self) -> Vec<f64> {
        self.coefficients
    }

    /// The projections `<self, psi_i>` onto the basis of a dual space
    pub fn projections(&self, dual: &FunctionSpace) -> Result<Vec<f64>> {
        let mass = assemble_mass(self.space, dual)?;
        let mut out = vec![0.0; dual.local_size()];
        mass.apply(&self.coefficients, &mut out)?;
        Ok(out)
    }

    /// Evaluate at a point given by reference coordinates on a cell
    pub fn evaluate(&self, cell: usize, point: [f64; 2]) -> f64 {
        let table = self.space.element().tabulate(&[point]);
        self.space
            .cell_dofs(cell)
            .iter()
            .enumerate()
            .filter_map(|(basis, dof)| dof.map(|d| self.coefficients[d] * table.value(0, basis)))
            .sum()
    }

    /// The surface gradient at a point given by reference coordinates on a cell
    pub fn surface_gradient(&self, cell: usize, point: [f64; 2]) -> [f64; 3] {
        let table = self.space.element().tabulate(&[point]);
        self.cell_gradient(cell, &table, 0)
    }

    fn cell_gradient(&self, cell: usize, table: &Table, point: usize) -> [f64; 3] {
        let mut reference = [0.0; 2];
        for (basis, dof) in self.space.cell_dofs(cell).iter().enumerate() {
            if let Some(dof) = dof {
                let d = table.derivative(point, basis);
                reference[0] += self.coefficients[*dof] * d[0];
                reference[1] += self.coefficients[*dof] * d[1];
            }
        }
        self.space
            .grid()
            .cell_geometry(cell)
            .surface_gradient(reference)
    }

    /// The L2 norm of the surface gradient on every cell, `||grad f||_{L2(T)}`
    pub fn surface_gradient_norms(&self) -> Vec<f64> {
        let rule = exact_rule(2 * self.space.element().degree());
        let table = self.space.element().tabulate(&rule.points);
        (0..self.space.grid().number_of_cells())
            .into_par_iter()
            .map(|cell| {
                let jdet = self.space.grid().cell_geometry(cell).integration_element();
                let squared = rule
                    .weights
                    .iter()
                    .enumerate()
                    .map(|(q, w)| {
                        let g = self.cell_gradient(cell, &table, q);
                        w * dot(&g, &g)
                    })
                    .sum::<f64>();
                (jdet * squared).sqrt()
            })
            .collect()
    }

    /// The integral over the grid
    pub fn integrate(&self) -> f64 {
        self.space
            .basis_integrals()
            .iter()
            .zip(&self.coefficients)
            .map(|(a, b)| a * b)
            .sum()
    }

    /// The L2 norm over the grid
    pub fn l2_norm(&self) -> f64 {
        let rule = exact_rule(2 * self.space.element().degree());
        let table = self.space.element().tabulate(&rule.points);
        let grid = self.space.grid();
        let squared = (0..grid.number_of_cells())
            .map(|cell| {
                let jdet = grid.cell_geometry(cell).integration_element();
                let dofs = self.space.cell_dofs(cell);
                jdet * rule
                    .weights
                    .iter()
                    .enumerate()
                    .map(|(q, w)| {
                        let value = dofs
                            .iter()
                            .enumerate()
                            .filter_map(|(b, d)| {
                                d.map(|d| self.coefficients[d] * table.value(q, b))
                            })
                            .sum::<f64>();
                        w * value * value
                    })
                    .sum::<f64>()
            })
            .sum::<f64>();
        squared.sqrt()
    }

    /// Multiply by a scalar
    pub fn scale(&mut self, alpha: f64) {
        self.coefficients.iter_mut().for_each(|c| *c *= alpha);
    }

    /// Add `alpha * other`, which must be in the same space
    pub fn axpy(&mut self, alpha: f64, other: &GridFunction) -> Result<()> {
        if !std::ptr::eq(self.space, other.space) {
            return Err(Error::IncompatibleSpaces(
                "grid functions can only be added within the same space".into(),
            ));
        }
        for (a, b) in self.coefficients.iter_mut().zip(&other.coefficients) {
            *a += alpha * b;
        }
        Ok(())
    }

    /// The sum of two functions in the same space
    pub fn sum(&self, other: &GridFunction) -> Result<GridFunction<'a>> {
        let mut out = self.clone();
        out.axpy(1.0, other)?;
        Ok(out)
    }
}

/// Whether two space references point to the same space
pub(crate) fn same_space(a: &FunctionSpace, b: &FunctionSpace) -> bool {
    std::ptr::eq(a, b)
}

/// A collapsed Gauss rule exact for polynomials of the given degree
fn exact_rule(degree: usize) -> QuadratureRule {
    let npoints = degree / 2 + 1;
    triangle_rule(npoints).unwrap_or(QuadratureRule {
        points: vec![[1.0 / 3.0, 1.0 / 3.0]],
        weights: vec![0.5],
    })
}

/// The projections `int f psi_i` of a callable onto the basis of a space
fn function_projections<F>(dual: &FunctionSpace, f: &F) -> Result<Vec<f64>>
where
    F: Fn(&[f64; 3], &[f64; 3], usize) -> f64 + Sync,
{
    let rule = triangle_rule(dual.element().degree() + 3)?;
    let table = dual.element().tabulate(&rule.points);
    let grid = dual.grid();
    let contributions = (0..grid.number_of_cells())
        .into_par_iter()
        .filter(|cell| dual.has_support(*cell))
        .map(|cell| {
            let geometry = grid.cell_geometry(cell);
            let jdet = geometry.integration_element();
            let values = rule
                .points
                .iter()
                .map(|p| {
                    let point = geometry.reference_to_physical(*p);
                    f(&point, &geometry.normal, grid.domain_index(cell))
                })
                .collect::<Vec<_>>();
            dual.cell_dofs(cell)
                .iter()
                .enumerate()
                .filter_map(|(basis, dof)| {
                    dof.map(|dof| {
                        let value = rule
                            .weights
                            .iter()
                            .zip(&values)
                            .enumerate()
                            .map(|(q, (w, v))| w * v * table.value(q, basis))
                            .sum::<f64>();
                        (dof, jdet * value)
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let mut projections = vec![0.0; dual.local_size()];
    for (dof, value) in contributions.into_iter().flatten() {
        projections[dof] += value;
    }
    Ok(projections)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::Continuity;
    use crate::function::SegmentOptions;
    use crate::shapes::{cube, screen_triangles};
    use approx::assert_relative_eq;

    #[test]
    fn test_from_function_reproduces_polynomials() {
        let grid = cube(0.5);
        let p2 = FunctionSpace::new(&grid, 2, Continuity::Continuous).unwrap();
        let f = |p: &[f64; 3], _: &[f64; 3], _: usize| p[0] * p[1] + 2.0 * p[2];
        let fun = GridFunction::from_function(&p2, &p2, f).unwrap();
        for dof in 0..p2.local_size() {
            let p = p2.reference_point(dof);
            assert_relative_eq!(fun.coefficients()[dof], f(&p, &[0.0; 3], 0), epsilon = 1e-8);
        }
        // x y integrates to 3/2 over the surface and 2 z to 6
        let expected = 1.5 + 6.0;
        assert_relative_eq!(fun.integrate(), expected, epsilon = 1e-8);
    }

    #[test]
    fn test_constant_function() {
        let grid = cube(0.5);
        let dp0 = FunctionSpace::new(&grid, 0, Continuity::Discontinuous).unwrap();
        let one = GridFunction::from_function(&dp0, &dp0, |_, _, _| 1.0).unwrap();
        assert_relative_eq!(one.integrate(), 6.0, max_relative = 1e-10);
        assert_relative_eq!(one.l2_norm(), 6.0f64.sqrt(), max_relative = 1e-10);
        assert!(one.surface_gradient_norms().iter().all(|g| *g == 0.0));
        let projections = one.projections(&dp0).unwrap();
        assert_relative_eq!(projections.iter().sum::<f64>(), 6.0, max_relative = 1e-12);
    }

    #[test]
    fn test_gradient() {
        let grid = cube(0.5);
        let p1 = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        let coefficients = (0..p1.local_size())
            .map(|d| p1.reference_point(d)[0])
            .collect();
        let fun = GridFunction::from_coefficients(&p1, coefficients).unwrap();
        // f = x: the surface gradient is e_x on faces parallel to the x axis and 0 on x faces
        for cell in 0..grid.number_of_cells() {
            let g = fun.surface_gradient(cell, [0.2, 0.3]);
            let expected = if grid.domain_index(cell) <= 2 { 0.0 } else { 1.0 };
            assert_relative_eq!(g[0], expected, epsilon = 1e-12);
            let centre = fun.evaluate(cell, [1.0 / 3.0, 1.0 / 3.0]);
            assert_relative_eq!(centre, grid.cell_geometry(cell).midpoint[0], epsilon = 1e-12);
        }
        let norms = fun.surface_gradient_norms();
        let total = norms.iter().map(|n| n * n).sum::<f64>();
        assert_relative_eq!(total, 4.0, max_relative = 1e-12);
    }

    #[test]
    fn test_linear_algebra() {
        let grid = cube(0.5);
        let p1 = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        let other = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        let mut a = GridFunction::from_coefficients(&p1, vec![1.0; p1.local_size()]).unwrap();
        let b = GridFunction::from_coefficients(&p1, vec![2.0; p1.local_size()]).unwrap();
        a.axpy(0.5, &b).unwrap();
        a.scale(2.0);
        assert!(a.coefficients().iter().all(|c| *c == 4.0));
        assert_eq!(a.sum(&b).unwrap().coefficients()[0], 6.0);
        let c = GridFunction::zero(&other);
        assert!(matches!(a.axpy(1.0, &c), Err(Error::IncompatibleSpaces(_))));
        assert!(GridFunction::from_coefficients(&p1, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_truncated_dual() {
        let grid = screen_triangles(2);
        let closed = FunctionSpace::on_segment(
            &grid,
            1,
            Continuity::Continuous,
            &[1],
            SegmentOptions::closed(),
        )
        .unwrap();
        let strict = FunctionSpace::on_segment(
            &grid,
            1,
            Continuity::Continuous,
            &[1],
            SegmentOptions::closed().strictly_on_segment(true),
        )
        .unwrap();
        let one = GridFunction::from_function(&closed, &strict, |_, _, _| 1.0).unwrap();
        for c in one.coefficients() {
            assert_relative_eq!(*c, 1.0, epsilon = 1e-8);
        }
        let dp0 = FunctionSpace::new(&grid, 0, Continuity::Discontinuous).unwrap();
        assert!(matches!(
            GridFunction::from_function(&closed, &dp0, |_, _, _| 1.0),
            Err(Error::IncompatibleSpaces(_))
        ));
    }
}
