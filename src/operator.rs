//! Boundary operators
//!
//! An operator is first declared as a [`BoundaryOperator`]: a kind together with its domain,
//! range and dual spaces. Its weak form is materialised by an [`OperatorAssembler`], which
//! memoises the discrete operator of every distinct declaration.
mod assembler;
mod block;
mod combination;

pub use assembler::OperatorAssembler;
pub use block::{AssembledBlock, BlockOperator, BlockSolution, StrongBlock};
pub use combination::{
    regularize, AssembledCombination, LinearCombination, MassInverse, StrongForm,
};

use crate::assembly::{
    assemble_dense, assemble_mass,
    boundary::{
        AdjointDoubleLayerBoundaryIntegrand, DoubleLayerBoundaryIntegrand,
        HypersingularCurlCurlBoundaryIntegrand, SingleLayerBoundaryIntegrand,
    },
    AssemblyOptions, CsrMatrix,
};
use crate::element::Continuity;
use crate::function::FunctionSpace;
use crate::grid::equal_grids;
use crate::solvers::{dot, LinearOperator};
use crate::types::{check_dimension, Error, Result};
use rlst::DynamicArray;

/// Operator kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    /// Single layer
    SingleLayer,
    /// Double layer
    DoubleLayer,
    /// Adjoint double layer
    AdjointDoubleLayer,
    /// Hypersingular
    Hypersingular,
    /// Identity, whose weak form is the mass matrix
    Identity,
    /// The rank one operator `<u, 1> <v, 1>`
    RankOne,
}

/// A declared boundary operator, not yet assembled.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryOperator<'a> {
    kind: OperatorKind,
    domain: &'a FunctionSpace<'a>,
    range: &'a FunctionSpace<'a>,
    dual: &'a FunctionSpace<'a>,
}

impl<'a> BoundaryOperator<'a> {
    /// Declare an operator from `domain` to `range`, tested against `dual`.
    pub fn new(
        kind: OperatorKind,
        domain: &'a FunctionSpace<'a>,
        range: &'a FunctionSpace<'a>,
        dual: &'a FunctionSpace<'a>,
    ) -> Result<Self> {
        if !equal_grids(domain.grid(), range.grid()) || !equal_grids(domain.grid(), dual.grid()) {
            return Err(Error::IncompatibleSpaces(
                "domain, range and dual spaces must be defined on the same grid".into(),
            ));
        }
        if kind == OperatorKind::Hypersingular
            && (domain.element().continuity() != Continuity::Continuous
                || dual.element().continuity() != Continuity::Continuous)
        {
            return Err(Error::IncompatibleSpaces(
                "the hypersingular operator needs continuous domain and dual spaces".into(),
            ));
        }
        Ok(Self {
            kind,
            domain,
            range,
            dual,
        })
    }

    /// The kind
    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    /// The domain space
    pub fn domain(&self) -> &'a FunctionSpace<'a> {
        self.domain
    }

    /// The range space
    pub fn range(&self) -> &'a FunctionSpace<'a> {
        self.range
    }

    /// The dual space
    pub fn dual(&self) -> &'a FunctionSpace<'a> {
        self.dual
    }

    /// Whether two operators act between the same spaces
    pub fn same_spaces(&self, other: &BoundaryOperator) -> bool {
        std::ptr::eq(self.domain, other.domain)
            && std::ptr::eq(self.range, other.range)
            && std::ptr::eq(self.dual, other.dual)
    }

    /// Assemble the weak form.
    ///
    /// This does not memoise; use an [`OperatorAssembler`] to share assembled operators.
    pub fn weak_form(&self, options: &AssemblyOptions) -> Result<DiscreteOperator> {
        let (domain, dual) = (self.domain, self.dual);
        Ok(match self.kind {
            OperatorKind::SingleLayer => DiscreteOperator::Dense(assemble_dense(
                &SingleLayerBoundaryIntegrand,
                domain,
                dual,
                options,
            )?),
            OperatorKind::DoubleLayer => DiscreteOperator::Dense(assemble_dense(
                &DoubleLayerBoundaryIntegrand,
                domain,
                dual,
                options,
            )?),
            OperatorKind::AdjointDoubleLayer => DiscreteOperator::Dense(assemble_dense(
                &AdjointDoubleLayerBoundaryIntegrand,
                domain,
                dual,
                options,
            )?),
            OperatorKind::Hypersingular => DiscreteOperator::Dense(assemble_dense(
                &HypersingularCurlCurlBoundaryIntegrand,
                domain,
                dual,
                options,
            )?),
            OperatorKind::Identity => DiscreteOperator::Sparse(assemble_mass(domain, dual)?),
            OperatorKind::RankOne => DiscreteOperator::RankOne {
                test: dual.basis_integrals(),
                trial: domain.basis_integrals(),
            },
        })
    }
}

/// The weak form of an operator
pub enum DiscreteOperator {
    /// A dense matrix
    Dense(DynamicArray<f64, 2>),
    /// A sparse matrix
    Sparse(CsrMatrix),
    /// The outer product `test trial^T`
    RankOne {
        /// Column vector
        test: Vec<f64>,
        /// Row vector
        trial: Vec<f64>,
    },
}

impl LinearOperator for DiscreteOperator {
    fn shape(&self) -> [usize; 2] {
        match self {
            Self::Dense(matrix) => LinearOperator::shape(matrix),
            Self::Sparse(matrix) => LinearOperator::shape(matrix),
            Self::RankOne { test, trial } => [test.len(), trial.len()],
        }
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        match self {
            Self::Dense(matrix) => LinearOperator::apply(matrix, x, y),
            Self::Sparse(matrix) => LinearOperator::apply(matrix, x, y),
            Self::RankOne { test, trial } => {
                check_dimension(trial.len(), x.len())?;
                check_dimension(test.len(), y.len())?;
                let scale = dot(trial, x);
                for (yi, ti) in y.iter_mut().zip(test) {
                    *yi = scale * ti;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shapes::regular_sphere;

    #[test]
    fn test_declaration_checks() {
        let grid = regular_sphere(0);
        let other_grid = regular_sphere(0);
        let dp0 = FunctionSpace::new(&grid, 0, Continuity::Discontinuous).unwrap();
        let p1 = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        let other = FunctionSpace::new(&other_grid, 1, Continuity::Continuous).unwrap();
        assert!(BoundaryOperator::new(OperatorKind::SingleLayer, &dp0, &p1, &dp0).is_ok());
        assert!(matches!(
            BoundaryOperator::new(OperatorKind::Hypersingular, &dp0, &p1, &p1),
            Err(Error::IncompatibleSpaces(_))
        ));
        assert!(matches!(
            BoundaryOperator::new(OperatorKind::SingleLayer, &p1, &other, &p1),
            Err(Error::IncompatibleSpaces(_))
        ));
    }

    #[test]
    fn test_rank_one() {
        let grid = regular_sphere(1);
        let p1 = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        let op = BoundaryOperator::new(OperatorKind::RankOne, &p1, &p1, &p1).unwrap();
        let discrete = op.weak_form(&AssemblyOptions::default()).unwrap();
        assert_eq!(discrete.shape(), [p1.local_size(); 2]);
        let ones = vec![1.0; p1.local_size()];
        let y = discrete.matvec(&ones).unwrap();
        let area = grid.area();
        let integrals = p1.basis_integrals();
        for (yi, bi) in y.iter().zip(&integrals) {
            approx::assert_relative_eq!(*yi, area * bi, max_relative = 1e-12);
        }
    }
}
