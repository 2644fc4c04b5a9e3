//! Grid builder
use crate::grid::FlatTriangleGrid;
use crate::types::{Error, Result};
use rlst::{rlst_dynamic_array2, RawAccessMut};
use std::collections::HashMap;

/// Builder for a flat triangle grid.
///
/// Points and cells are added by id. Cells carry the domain index used to define segments.
#[derive(Default)]
pub struct FlatTriangleGridBuilder {
    points: Vec<f64>,
    point_indices_to_ids: Vec<usize>,
    point_ids_to_indices: HashMap<usize, usize>,
    cells: Vec<[usize; 3]>,
    domain_indices: Vec<usize>,
    cell_indices_to_ids: Vec<usize>,
}

impl FlatTriangleGridBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder with space reserved for the given number of points and cells
    pub fn new_with_capacity(npoints: usize, ncells: usize) -> Self {
        Self {
            points: Vec::with_capacity(3 * npoints),
            point_indices_to_ids: Vec::with_capacity(npoints),
            point_ids_to_indices: HashMap::with_capacity(npoints),
            cells: Vec::with_capacity(ncells),
            domain_indices: Vec::with_capacity(ncells),
            cell_indices_to_ids: Vec::with_capacity(ncells),
        }
    }

    /// Add a point
    pub fn add_point(&mut self, id: usize, point: [f64; 3]) {
        self.point_ids_to_indices
            .insert(id, self.point_indices_to_ids.len());
        self.point_indices_to_ids.push(id);
        self.points.extend_from_slice(&point);
    }

    /// Add a cell given by the ids of its three points
    pub fn add_cell(&mut self, id: usize, point_ids: [usize; 3], domain_index: usize) {
        self.cell_indices_to_ids.push(id);
        self.cells.push(point_ids);
        self.domain_indices.push(domain_index);
    }

    /// Create the grid.
    ///
    /// Fails if a cell refers to an unknown point, repeats a point, or if ids are duplicated.
    pub fn create_grid(self) -> Result<FlatTriangleGrid> {
        let npoints = self.point_indices_to_ids.len();
        if self.point_ids_to_indices.len() != npoints {
            return Err(Error::InvalidGrid("duplicate point ids".into()));
        }
        if self.cells.is_empty() {
            return Err(Error::InvalidGrid("grid has no cells".into()));
        }
        let mut cell_ids = self.cell_indices_to_ids.clone();
        cell_ids.sort_unstable();
        cell_ids.dedup();
        if cell_ids.len() != self.cells.len() {
            return Err(Error::InvalidGrid("duplicate cell ids".into()));
        }

        let cells = self
            .cells
            .iter()
            .zip(&self.cell_indices_to_ids)
            .map(|(point_ids, cell_id)| {
                let mut cell = [0; 3];
                for (c, id) in cell.iter_mut().zip(point_ids) {
                    *c = *self.point_ids_to_indices.get(id).ok_or_else(|| {
                        Error::InvalidGrid(format!("cell {cell_id} uses unknown point {id}"))
                    })?;
                }
                if cell[0] == cell[1] || cell[1] == cell[2] || cell[0] == cell[2] {
                    return Err(Error::InvalidGrid(format!(
                        "cell {cell_id} repeats a point"
                    )));
                }
                Ok(cell)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut vertices = rlst_dynamic_array2!(f64, [3, npoints]);
        vertices.data_mut().copy_from_slice(&self.points);

        Ok(FlatTriangleGrid::new(
            vertices,
            cells,
            self.domain_indices,
            self.point_indices_to_ids,
            self.cell_indices_to_ids,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unknown_point() {
        let mut b = FlatTriangleGridBuilder::new();
        b.add_point(0, [0.0, 0.0, 0.0]);
        b.add_point(1, [1.0, 0.0, 0.0]);
        b.add_cell(0, [0, 1, 7], 1);
        assert!(matches!(b.create_grid(), Err(Error::InvalidGrid(_))));
    }

    #[test]
    fn test_repeated_point() {
        let mut b = FlatTriangleGridBuilder::new_with_capacity(3, 1);
        b.add_point(0, [0.0, 0.0, 0.0]);
        b.add_point(1, [1.0, 0.0, 0.0]);
        b.add_cell(0, [0, 1, 1], 1);
        assert!(b.create_grid().is_err());
    }

    #[test]
    fn test_empty() {
        assert!(FlatTriangleGridBuilder::new().create_grid().is_err());
    }

    #[test]
    fn test_ids() {
        let mut b = FlatTriangleGridBuilder::new();
        b.add_point(5, [0.0, 0.0, 0.0]);
        b.add_point(3, [1.0, 0.0, 0.0]);
        b.add_point(9, [0.0, 0.0, 1.0]);
        b.add_cell(42, [5, 3, 9], 4);
        let grid = b.create_grid().unwrap();
        assert_eq!(grid.cell_vertices(0), &[0, 1, 2]);
        assert_eq!(grid.cell_id(0), 42);
        assert_eq!(grid.cell_index_from_id(42), Some(0));
        assert_eq!(grid.vertex_id(2), 9);
        assert_eq!(grid.domain_index(0), 4);
        assert_eq!(grid.vertex(2), [0.0, 0.0, 1.0]);
    }
}
