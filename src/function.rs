//! Function spaces and grid functions
mod embedding;
mod function_space;
mod grid_function;
mod segment;

pub use embedding::{embed, embedding_matrix, recombine};
pub use function_space::FunctionSpace;
pub use grid_function::GridFunction;
pub(crate) use grid_function::same_space;
pub use segment::{Segment, SegmentOptions};
