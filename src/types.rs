//! Error types
use crate::quadrature::QuadratureError;

/// Errors raised while building spaces, operators and block systems.
///
/// Most of these are configuration errors detected when a value is constructed. Failure of the
/// outer iterative solve to converge is not an error and is reported on the solution instead,
/// but a mass matrix solve that does not converge is.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// None of the requested segment ids is a domain index of the grid
    #[error("segments {requested:?} do not intersect the grid domain indices {available:?}")]
    UnknownSegment {
        /// Requested segment ids
        requested: Vec<usize>,
        /// Domain indices present in the grid
        available: Vec<usize>,
    },
    /// Invalid degree, continuity or segment option combination
    #[error("invalid function space: {0}")]
    InvalidSpace(String),
    /// Spaces that cannot be combined in an operator, embedding or projection
    #[error("incompatible spaces: {0}")]
    IncompatibleSpaces(String),
    /// Row or column mismatch in a block operator
    #[error("block operator shape error: {0}")]
    BlockShape(String),
    /// A vector does not have the length required by a space or operator
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },
    /// Invalid grid input
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    /// A mass matrix system did not reach its tolerance
    #[error("mass matrix solve stopped after {iterations} iterations at residual {residual:.3e}")]
    MassSolve {
        /// Iterations used
        iterations: usize,
        /// Final relative residual
        residual: f64,
    },
    /// Sparse matrix construction error
    #[error(transparent)]
    Linalg(#[from] rlst::RlstError),
    /// Quadrature error
    #[error(transparent)]
    Quadrature(#[from] QuadratureError),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Check that a vector has the expected length.
pub(crate) fn check_dimension(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected, actual })
    }
}
