//! Laplace boundary operators
//!
//! Every constructor declares an operator from `domain` to `range`, tested against `dual`.
//! Nothing is assembled until the operator is passed to an
//! [`OperatorAssembler`](crate::operator::OperatorAssembler).
use crate::function::FunctionSpace;
use crate::operator::{BoundaryOperator, OperatorKind};
use crate::types::Result;

/// The single layer operator `V`
pub fn single_layer<'a>(
    domain: &'a FunctionSpace<'a>,
    range: &'a FunctionSpace<'a>,
    dual: &'a FunctionSpace<'a>,
) -> Result<BoundaryOperator<'a>> {
    BoundaryOperator::new(OperatorKind::SingleLayer, domain, range, dual)
}

/// The double layer operator `K`
pub fn double_layer<'a>(
    domain: &'a FunctionSpace<'a>,
    range: &'a FunctionSpace<'a>,
    dual: &'a FunctionSpace<'a>,
) -> Result<BoundaryOperator<'a>> {
    BoundaryOperator::new(OperatorKind::DoubleLayer, domain, range, dual)
}

/// The adjoint double layer operator `K'`
pub fn adjoint_double_layer<'a>(
    domain: &'a FunctionSpace<'a>,
    range: &'a FunctionSpace<'a>,
    dual: &'a FunctionSpace<'a>,
) -> Result<BoundaryOperator<'a>> {
    BoundaryOperator::new(OperatorKind::AdjointDoubleLayer, domain, range, dual)
}

/// The hypersingular operator `W`.
///
/// Assembled in curl-curl form, so the domain and dual spaces must be continuous.
pub fn hypersingular<'a>(
    domain: &'a FunctionSpace<'a>,
    range: &'a FunctionSpace<'a>,
    dual: &'a FunctionSpace<'a>,
) -> Result<BoundaryOperator<'a>> {
    BoundaryOperator::new(OperatorKind::Hypersingular, domain, range, dual)
}

/// The identity operator
pub fn identity<'a>(
    domain: &'a FunctionSpace<'a>,
    range: &'a FunctionSpace<'a>,
    dual: &'a FunctionSpace<'a>,
) -> Result<BoundaryOperator<'a>> {
    BoundaryOperator::new(OperatorKind::Identity, domain, range, dual)
}

/// The rank one operator `<u, 1> <v, 1>`
pub fn rank_one<'a>(
    domain: &'a FunctionSpace<'a>,
    range: &'a FunctionSpace<'a>,
    dual: &'a FunctionSpace<'a>,
) -> Result<BoundaryOperator<'a>> {
    BoundaryOperator::new(OperatorKind::RankOne, domain, range, dual)
}
