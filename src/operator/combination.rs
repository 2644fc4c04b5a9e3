//! Linear combinations of operators and their strong forms
use crate::assembly::{assemble_mass, CsrMatrix};
use crate::function::{same_space, FunctionSpace, GridFunction};
use crate::operator::{BoundaryOperator, DiscreteOperator, OperatorAssembler, OperatorKind};
use crate::solvers::{axpy, solve_mass_system, LinearOperator};
use crate::types::{check_dimension, Error, Result};
use std::sync::Arc;

/// A sum `c_1 A_1 + c_2 A_2 + ...` of declared operators that all act between the same
/// domain, range and dual spaces.
#[derive(Debug, Clone)]
pub struct LinearCombination<'a> {
    terms: Vec<(f64, BoundaryOperator<'a>)>,
}

impl<'a> From<BoundaryOperator<'a>> for LinearCombination<'a> {
    fn from(op: BoundaryOperator<'a>) -> Self {
        Self::term(1.0, op)
    }
}

impl std::ops::Neg for LinearCombination<'_> {
    type Output = Self;

    fn neg(self) -> Self {
        self.scale(-1.0)
    }
}

impl<'a> LinearCombination<'a> {
    /// The single term `coefficient * op`
    pub fn term(coefficient: f64, op: BoundaryOperator<'a>) -> Self {
        Self {
            terms: vec![(coefficient, op)],
        }
    }

    /// Add `coefficient * op`, which must act between the same spaces.
    pub fn add(mut self, coefficient: f64, op: BoundaryOperator<'a>) -> Result<Self> {
        if !self.terms[0].1.same_spaces(&op) {
            return Err(Error::IncompatibleSpaces(format!(
                "cannot add a {:?} operator to a combination on different spaces",
                op.kind()
            )));
        }
        self.terms.push((coefficient, op));
        Ok(self)
    }

    /// Multiply every coefficient by `alpha`
    pub fn scale(mut self, alpha: f64) -> Self {
        self.terms.iter_mut().for_each(|(c, _)| *c *= alpha);
        self
    }

    /// The terms
    pub fn terms(&self) -> &[(f64, BoundaryOperator<'a>)] {
        &self.terms
    }

    /// The domain space
    pub fn domain(&self) -> &'a FunctionSpace<'a> {
        self.terms[0].1.domain()
    }

    /// The range space
    pub fn range(&self) -> &'a FunctionSpace<'a> {
        self.terms[0].1.range()
    }

    /// The dual space
    pub fn dual(&self) -> &'a FunctionSpace<'a> {
        self.terms[0].1.dual()
    }

    /// Assemble the weak form of every term
    pub fn assemble(&self, assembler: &mut OperatorAssembler<'a>) -> Result<AssembledCombination> {
        let terms = self
            .terms
            .iter()
            .map(|(c, op)| Ok((*c, assembler.assemble(op)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(AssembledCombination {
            shape: [self.dual().local_size(), self.domain().local_size()],
            terms,
        })
    }

    /// The projections of the image of `fun` onto the basis of the dual space
    pub fn weak_apply(
        &self,
        assembler: &mut OperatorAssembler<'a>,
        fun: &GridFunction,
    ) -> Result<Vec<f64>> {
        if !same_space(fun.space(), self.domain()) {
            return Err(Error::IncompatibleSpaces(
                "the function is not in the domain of the operator".into(),
            ));
        }
        self.assemble(assembler)?.matvec(fun.coefficients())
    }

    /// The image of `fun` as a function in the range space.
    ///
    /// Needs range and dual spaces of equal size.
    pub fn apply(
        &self,
        assembler: &mut OperatorAssembler<'a>,
        fun: &GridFunction,
    ) -> Result<GridFunction<'a>> {
        let inverse = MassInverse::new(self.range(), self.dual())?;
        let projections = self.weak_apply(assembler, fun)?;
        GridFunction::from_coefficients(self.range(), inverse.matvec(&projections)?)
    }

    /// The strong form, the weak form premultiplied by the inverse mass matrix of range and dual
    pub fn strong_form(&self, assembler: &mut OperatorAssembler<'a>) -> Result<StrongForm> {
        let inverse = MassInverse::new(self.range(), self.dual())?;
        Ok(StrongForm {
            weak: self.assemble(assembler)?,
            inverse,
        })
    }
}

/// Add the rank one operator `<u, 1> <v, 1>` to an operator that is singular on constants
pub fn regularize<'a>(op: impl Into<LinearCombination<'a>>) -> Result<LinearCombination<'a>> {
    let op = op.into();
    let rank_one =
        BoundaryOperator::new(OperatorKind::RankOne, op.domain(), op.range(), op.dual())?;
    op.add(1.0, rank_one)
}

/// The weak form of a [`LinearCombination`]
pub struct AssembledCombination {
    shape: [usize; 2],
    terms: Vec<(f64, Arc<DiscreteOperator>)>,
}

impl LinearOperator for AssembledCombination {
    fn shape(&self) -> [usize; 2] {
        self.shape
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        check_dimension(self.shape[1], x.len())?;
        check_dimension(self.shape[0], y.len())?;
        y.iter_mut().for_each(|v| *v = 0.0);
        let mut work = vec![0.0; y.len()];
        for (coefficient, op) in &self.terms {
            op.apply(x, &mut work)?;
            axpy(*coefficient, &work, y);
        }
        Ok(())
    }
}

/// The inverse of the mass matrix between a range space and its dual.
///
/// Maps projections onto the dual basis to coefficients in the range space.
pub struct MassInverse {
    mass: CsrMatrix,
    symmetric: bool,
}

impl MassInverse {
    /// Assemble the mass matrix; the spaces must have the same number of dofs
    pub fn new(range: &FunctionSpace, dual: &FunctionSpace) -> Result<Self> {
        if range.local_size() != dual.local_size() {
            return Err(Error::IncompatibleSpaces(format!(
                "no strong form for a range space with {} dofs and a dual space with {}",
                range.local_size(),
                dual.local_size()
            )));
        }
        Ok(Self {
            mass: assemble_mass(range, dual)?,
            symmetric: same_space(range, dual),
        })
    }
}

impl LinearOperator for MassInverse {
    fn shape(&self) -> [usize; 2] {
        let n = LinearOperator::shape(&self.mass)[0];
        [n, n]
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        check_dimension(LinearOperator::shape(&self.mass)[0], y.len())?;
        let solution = solve_mass_system(&self.mass, x, self.symmetric)?;
        y.copy_from_slice(&solution);
        Ok(())
    }
}

/// The strong form of a [`LinearCombination`]
pub struct StrongForm {
    weak: AssembledCombination,
    inverse: MassInverse,
}

impl LinearOperator for StrongForm {
    fn shape(&self) -> [usize; 2] {
        self.weak.shape()
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        let projections = self.weak.matvec(x)?;
        self.inverse.apply(&projections, y)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::assembly::AssemblyOptions;
    use crate::element::Continuity;
    use crate::shapes::regular_sphere;
    use approx::assert_relative_eq;

    #[test]
    fn test_combination_algebra() {
        let grid = regular_sphere(1);
        let p1 = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        let dp0 = FunctionSpace::new(&grid, 0, Continuity::Discontinuous).unwrap();
        let mut assembler = OperatorAssembler::new(AssemblyOptions::default());
        let id = BoundaryOperator::new(OperatorKind::Identity, &p1, &p1, &p1).unwrap();
        let dlp = BoundaryOperator::new(OperatorKind::DoubleLayer, &p1, &p1, &p1).unwrap();
        let other = BoundaryOperator::new(OperatorKind::Identity, &p1, &p1, &dp0).unwrap();

        let combination = -LinearCombination::term(0.5, id).add(1.0, dlp).unwrap();
        assert_eq!(combination.terms().len(), 2);
        assert_eq!(combination.terms()[0].0, -0.5);
        assert!(matches!(
            combination.clone().add(1.0, other),
            Err(Error::IncompatibleSpaces(_))
        ));

        // (-1/2 I - K) 1 = 0 on a closed surface
        let one = GridFunction::from_coefficients(&p1, vec![1.0; p1.local_size()]).unwrap();
        let image = combination.apply(&mut assembler, &one).unwrap();
        assert!(image.integrate().abs() < 0.05 * grid.area());
        let identity = LinearCombination::from(id).apply(&mut assembler, &one).unwrap();
        for c in identity.coefficients() {
            assert_relative_eq!(*c, 1.0, epsilon = 1e-8);
        }
        assert_eq!(assembler.len(), 2);
    }

    #[test]
    fn test_regularize() {
        let grid = regular_sphere(1);
        let p1 = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        let mut assembler = OperatorAssembler::new(AssemblyOptions::default());
        let hyp = BoundaryOperator::new(OperatorKind::Hypersingular, &p1, &p1, &p1).unwrap();
        let regularized = regularize(hyp).unwrap();
        let one = GridFunction::from_coefficients(&p1, vec![1.0; p1.local_size()]).unwrap();
        let singular = LinearCombination::from(hyp)
            .weak_apply(&mut assembler, &one)
            .unwrap();
        let regular = regularized.weak_apply(&mut assembler, &one).unwrap();
        let area = grid.area();
        for ((s, r), b) in singular.iter().zip(&regular).zip(p1.basis_integrals()) {
            assert!(s.abs() < 1e-8);
            assert_relative_eq!(*r, area * b, max_relative = 1e-8);
        }
    }

    #[test]
    fn test_strong_form_needs_square_mass() {
        let grid = regular_sphere(0);
        let p1 = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        let dp0 = FunctionSpace::new(&grid, 0, Continuity::Discontinuous).unwrap();
        let mut assembler = OperatorAssembler::new(AssemblyOptions::default());
        let slp = BoundaryOperator::new(OperatorKind::SingleLayer, &p1, &p1, &dp0).unwrap();
        assert!(matches!(
            LinearCombination::from(slp).strong_form(&mut assembler),
            Err(Error::IncompatibleSpaces(_))
        ));
        let fun = GridFunction::zero(&dp0);
        assert!(LinearCombination::from(slp)
            .weak_apply(&mut assembler, &fun)
            .is_err());
    }
}
