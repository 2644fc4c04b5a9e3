//! Segmented function spaces and blocked boundary operators for Laplace problems
//!
//! Function spaces can be restricted to segments of a grid, given as sets of domain indices,
//! with precise rules for the dofs shared by neighbouring segments. Operators between such
//! spaces are declared, assembled through a memoising [`operator::OperatorAssembler`] and
//! combined into [`operator::BlockOperator`]s, whose solutions are recombined into functions on
//! the whole grid. The [`mixed`] and [`capacity`] modules solve complete problems, and
//! [`estimator`] computes a posteriori error indicators on the barycentric refinement.
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

pub mod assembly;
pub mod capacity;
pub mod element;
pub mod estimator;
pub mod function;
pub mod grid;
pub mod laplace;
pub mod mixed;
pub mod operator;
pub mod quadrature;
pub mod shapes;
pub mod solvers;
pub mod types;

#[cfg(test)]
mod test {
    extern crate blas_src;
    extern crate lapack_src;
}
