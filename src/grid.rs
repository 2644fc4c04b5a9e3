//! Grids
mod builder;
pub(crate) mod flat_triangle_grid;
mod refinement;

pub use builder::FlatTriangleGridBuilder;
pub use flat_triangle_grid::{CellGeometry, FlatTriangleGrid, TRIANGLE_EDGES};
pub use refinement::{barycentric_refinement, BarycentricMap, RefinedGrid};

/// A (cell, local index) pair
///
/// The local index is the index of a sub-entity (vertex or edge) within the cell as it is
/// numbered on the reference triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLocalIndexPair {
    /// The cell's index
    pub cell: usize,
    /// The local index of the sub-entity
    pub local_index: usize,
}

impl CellLocalIndexPair {
    /// Create a (cell, local index) pair
    pub fn new(cell: usize, local_index: usize) -> Self {
        Self { cell, local_index }
    }
}

/// Check whether two grid references point to the same grid.
pub(crate) fn equal_grids(a: &FlatTriangleGrid, b: &FlatTriangleGrid) -> bool {
    std::ptr::eq(a, b)
}
