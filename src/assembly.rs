//! Assembly of boundary operators and mass matrices
pub mod boundary;
pub mod common;
pub mod kernels;
pub mod mass;

pub use boundary::assemble_dense;
pub use common::{AssemblyOptions, CsrMatrix, SparseMatrixData};
pub use mass::{assemble_mass, assemble_refinement_mass};
