//! Barycentric refinement
use crate::grid::{FlatTriangleGrid, TRIANGLE_EDGES};
use rlst::{rlst_dynamic_array2, RawAccessMut};

/// Corners of the six children of the reference triangle, in reference coordinates.
///
/// Child `k` is built from a vertex, an edge midpoint and the centroid, going round the
/// triangle anticlockwise so that every child inherits the orientation of its parent.
const CHILD_VERTICES: [[[f64; 2]; 3]; 6] = {
    const V0: [f64; 2] = [0.0, 0.0];
    const V1: [f64; 2] = [1.0, 0.0];
    const V2: [f64; 2] = [0.0, 1.0];
    const M01: [f64; 2] = [0.5, 0.0];
    const M12: [f64; 2] = [0.5, 0.5];
    const M20: [f64; 2] = [0.0, 0.5];
    const C: [f64; 2] = [1.0 / 3.0, 1.0 / 3.0];
    [
        [V0, M01, C],
        [M01, V1, C],
        [V1, M12, C],
        [M12, V2, C],
        [V2, M20, C],
        [M20, V0, C],
    ]
};

/// The relation between the cells of a grid and the cells of its barycentric refinement.
#[derive(Debug, Clone)]
pub struct BarycentricMap {
    children: Vec<[usize; 6]>,
    parents: Vec<usize>,
    child_positions: Vec<usize>,
}

impl BarycentricMap {
    /// The six fine cells a coarse cell is split into
    pub fn children(&self, coarse_cell: usize) -> &[usize; 6] {
        &self.children[coarse_cell]
    }

    /// The coarse cell containing a fine cell
    pub fn parent(&self, fine_cell: usize) -> usize {
        self.parents[fine_cell]
    }

    /// Number of coarse cells
    pub fn number_of_coarse_cells(&self) -> usize {
        self.children.len()
    }

    /// Number of fine cells
    pub fn number_of_fine_cells(&self) -> usize {
        self.parents.len()
    }

    /// Map reference coordinates on a fine cell to reference coordinates on its parent.
    pub fn fine_to_coarse_reference(&self, fine_cell: usize, point: [f64; 2]) -> [f64; 2] {
        let [p0, p1, p2] = CHILD_VERTICES[self.child_positions[fine_cell]];
        [
            p0[0] + (p1[0] - p0[0]) * point[0] + (p2[0] - p0[0]) * point[1],
            p0[1] + (p1[1] - p0[1]) * point[0] + (p2[1] - p0[1]) * point[1],
        ]
    }
}

/// A grid together with its barycentric refinement.
pub struct RefinedGrid<'a> {
    coarse: &'a FlatTriangleGrid,
    fine: FlatTriangleGrid,
    map: BarycentricMap,
}

impl<'a> RefinedGrid<'a> {
    /// The original grid
    pub fn coarse(&self) -> &'a FlatTriangleGrid {
        self.coarse
    }

    /// The refined grid
    pub fn fine(&self) -> &FlatTriangleGrid {
        &self.fine
    }

    /// The coarse to fine cell relation
    pub fn map(&self) -> &BarycentricMap {
        &self.map
    }
}

/// Split every cell of a grid into six triangles.
///
/// The new vertices are the edge midpoints and the cell centroids. Fine vertices are numbered
/// coarse vertices first, then edge midpoints in edge order, then centroids in cell order.
/// The children of coarse cell `c` are the fine cells `6c..6c + 6` and inherit its domain
/// index.
pub fn barycentric_refinement(grid: &FlatTriangleGrid) -> RefinedGrid<'_> {
    let nvertices = grid.number_of_vertices();
    let nedges = grid.number_of_edges();
    let ncells = grid.number_of_cells();
    let nfine_vertices = nvertices + nedges + ncells;

    let mut vertices = rlst_dynamic_array2!(f64, [3, nfine_vertices]);
    {
        let data = vertices.data_mut();
        for v in 0..nvertices {
            data[3 * v..3 * v + 3].copy_from_slice(&grid.vertex(v));
        }
        for e in 0..nedges {
            let [a, b] = grid.edge_vertices(e).map(|v| grid.vertex(v));
            let index = nvertices + e;
            for k in 0..3 {
                data[3 * index + k] = 0.5 * (a[k] + b[k]);
            }
        }
        for c in 0..ncells {
            let index = nvertices + nedges + c;
            data[3 * index..3 * index + 3].copy_from_slice(&grid.cell_geometry(c).midpoint);
        }
    }

    let mut cells = Vec::with_capacity(6 * ncells);
    let mut domain_indices = Vec::with_capacity(6 * ncells);
    let mut children = Vec::with_capacity(ncells);
    let mut parents = Vec::with_capacity(6 * ncells);
    let mut child_positions = Vec::with_capacity(6 * ncells);

    for c in 0..ncells {
        let [v0, v1, v2] = *grid.cell_vertices(c);
        let edges = grid.cell_edges(c);
        debug_assert_eq!(TRIANGLE_EDGES[2], [0, 1]);
        let m01 = nvertices + edges[2];
        let m12 = nvertices + edges[0];
        let m20 = nvertices + edges[1];
        let centroid = nvertices + nedges + c;
        let first = cells.len();
        for cell in [
            [v0, m01, centroid],
            [m01, v1, centroid],
            [v1, m12, centroid],
            [m12, v2, centroid],
            [v2, m20, centroid],
            [m20, v0, centroid],
        ] {
            child_positions.push(cells.len() - first);
            cells.push(cell);
            domain_indices.push(grid.domain_index(c));
            parents.push(c);
        }
        children.push([0, 1, 2, 3, 4, 5].map(|k| first + k));
    }

    let ids = (0..cells.len()).collect();
    let fine = FlatTriangleGrid::new(
        vertices,
        cells,
        domain_indices,
        (0..nfine_vertices).collect(),
        ids,
    );

    RefinedGrid {
        coarse: grid,
        fine,
        map: BarycentricMap {
            children,
            parents,
            child_positions,
        },
    }
}
