//! Flat triangle grid
use crate::grid::CellLocalIndexPair;
use log::warn;
use rlst::{DynamicArray, RawAccess, Shape};
use std::collections::HashMap;

/// Vertex pairs of the three local edges of a triangle.
///
/// Local edge `i` is opposite local vertex `i`.
pub const TRIANGLE_EDGES: [[usize; 2]; 3] = [[1, 2], [0, 2], [0, 1]];

fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn norm(a: &[f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// Geometry of a single flat triangle.
#[derive(Debug, Clone)]
pub struct CellGeometry {
    /// Corner coordinates
    pub vertices: [[f64; 3]; 3],
    /// The two columns of the jacobian of the reference map, `v1 - v0` and `v2 - v0`
    pub jacobian: [[f64; 3]; 2],
    /// Unit normal, oriented by the vertex order
    pub normal: [f64; 3],
    /// Area
    pub volume: f64,
    /// Maximum distance between two vertices
    pub diameter: f64,
    /// Centroid
    pub midpoint: [f64; 3],
    // Inverse of the metric tensor J^T J
    inverse_metric: [[f64; 2]; 2],
}

impl CellGeometry {
    /// Compute the geometry of the triangle with the given corners.
    pub fn new(vertices: [[f64; 3]; 3]) -> Self {
        let a = sub(&vertices[1], &vertices[0]);
        let b = sub(&vertices[2], &vertices[0]);
        let n = cross(&a, &b);
        let jdet = norm(&n);
        let normal = if jdet > 0.0 {
            [n[0] / jdet, n[1] / jdet, n[2] / jdet]
        } else {
            [0.0; 3]
        };
        let (aa, ab, bb) = (dot(&a, &a), dot(&a, &b), dot(&b, &b));
        let det = aa * bb - ab * ab;
        let inverse_metric = if det > 0.0 {
            [[bb / det, -ab / det], [-ab / det, aa / det]]
        } else {
            [[0.0; 2]; 2]
        };
        let diameter = [(0, 1), (1, 2), (0, 2)]
            .iter()
            .map(|(i, j)| norm(&sub(&vertices[*i], &vertices[*j])))
            .fold(0.0, f64::max);
        let midpoint = [0, 1, 2].map(|k| (vertices[0][k] + vertices[1][k] + vertices[2][k]) / 3.0);
        Self {
            vertices,
            jacobian: [a, b],
            normal,
            volume: 0.5 * jdet,
            diameter,
            midpoint,
            inverse_metric,
        }
    }

    /// The integration element `|det J|` of the reference map.
    pub fn integration_element(&self) -> f64 {
        2.0 * self.volume
    }

    /// Map a point on the reference triangle to the physical triangle.
    pub fn reference_to_physical(&self, point: [f64; 2]) -> [f64; 3] {
        let [a, b] = &self.jacobian;
        [0, 1, 2].map(|k| self.vertices[0][k] + a[k] * point[0] + b[k] * point[1])
    }

    /// Surface gradient of a function with the given reference gradient.
    ///
    /// This is `J (J^T J)^{-1} d`.
    pub fn surface_gradient(&self, reference_gradient: [f64; 2]) -> [f64; 3] {
        let g = &self.inverse_metric;
        let c0 = g[0][0] * reference_gradient[0] + g[0][1] * reference_gradient[1];
        let c1 = g[1][0] * reference_gradient[0] + g[1][1] * reference_gradient[1];
        let [a, b] = &self.jacobian;
        [0, 1, 2].map(|k| a[k] * c0 + b[k] * c1)
    }

    /// Surface curl `n x grad` of a function with the given reference gradient.
    pub fn surface_curl(&self, reference_gradient: [f64; 2]) -> [f64; 3] {
        let jdet = self.integration_element();
        let [a, b] = &self.jacobian;
        [0, 1, 2].map(|k| (b[k] * reference_gradient[0] - a[k] * reference_gradient[1]) / jdet)
    }
}

/// A grid of flat triangles in 3D.
///
/// Every cell carries a domain index. Sets of domain indices define the segments that
/// function spaces can be restricted to.
pub struct FlatTriangleGrid {
    // Geometry
    vertices: DynamicArray<f64, 2>,
    cells: Vec<[usize; 3]>,
    geometry: Vec<CellGeometry>,
    domain_indices: Vec<usize>,

    // Topology
    cells_to_edges: Vec<[usize; 3]>,
    edges_to_vertices: Vec<[usize; 2]>,
    edges_to_cells: Vec<Vec<CellLocalIndexPair>>,
    vertices_to_cells: Vec<Vec<CellLocalIndexPair>>,

    // Ids
    vertex_indices_to_ids: Vec<usize>,
    vertex_ids_to_indices: HashMap<usize, usize>,
    cell_indices_to_ids: Vec<usize>,
    cell_ids_to_indices: HashMap<usize, usize>,
}

impl FlatTriangleGrid {
    /// Create a grid.
    ///
    /// `vertices` has shape `[3, nvertices]`. Cells refer to vertices by index. Use
    /// [`FlatTriangleGridBuilder`](crate::grid::FlatTriangleGridBuilder) to build a grid from ids.
    pub(crate) fn new(
        vertices: DynamicArray<f64, 2>,
        cells: Vec<[usize; 3]>,
        domain_indices: Vec<usize>,
        vertex_indices_to_ids: Vec<usize>,
        cell_indices_to_ids: Vec<usize>,
    ) -> Self {
        let nvertices = vertices.shape()[1];
        debug_assert_eq!(cells.len(), domain_indices.len());
        debug_assert_eq!(cells.len(), cell_indices_to_ids.len());
        debug_assert_eq!(nvertices, vertex_indices_to_ids.len());

        let point = |v: usize| -> [f64; 3] {
            let data = vertices.data();
            [data[3 * v], data[3 * v + 1], data[3 * v + 2]]
        };

        let geometry = cells
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                let g = CellGeometry::new(cell.map(point));
                if g.volume <= 0.0 {
                    warn!("Cell {index} of the grid has zero area");
                }
                g
            })
            .collect::<Vec<_>>();

        let mut edge_indices = HashMap::<(usize, usize), usize>::new();
        let mut cells_to_edges = vec![[0; 3]; cells.len()];
        let mut edges_to_vertices = vec![];
        let mut edges_to_cells: Vec<Vec<CellLocalIndexPair>> = vec![];
        let mut vertices_to_cells = vec![vec![]; nvertices];

        for (cell_index, cell) in cells.iter().enumerate() {
            for (local_index, vertex) in cell.iter().enumerate() {
                vertices_to_cells[*vertex].push(CellLocalIndexPair::new(cell_index, local_index));
            }
            for (local_index, e) in TRIANGLE_EDGES.iter().enumerate() {
                let first = usize::min(cell[e[0]], cell[e[1]]);
                let second = usize::max(cell[e[0]], cell[e[1]]);
                let edge_index = *edge_indices.entry((first, second)).or_insert_with(|| {
                    edges_to_vertices.push([first, second]);
                    edges_to_cells.push(vec![]);
                    edges_to_vertices.len() - 1
                });
                edges_to_cells[edge_index].push(CellLocalIndexPair::new(cell_index, local_index));
                cells_to_edges[cell_index][local_index] = edge_index;
            }
        }

        let vertex_ids_to_indices = vertex_indices_to_ids
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();
        let cell_ids_to_indices = cell_indices_to_ids
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();

        Self {
            vertices,
            cells,
            geometry,
            domain_indices,
            cells_to_edges,
            edges_to_vertices,
            edges_to_cells,
            vertices_to_cells,
            vertex_indices_to_ids,
            vertex_ids_to_indices,
            cell_indices_to_ids,
            cell_ids_to_indices,
        }
    }

    /// Number of vertices
    pub fn number_of_vertices(&self) -> usize {
        self.vertices.shape()[1]
    }

    /// Number of edges
    pub fn number_of_edges(&self) -> usize {
        self.edges_to_vertices.len()
    }

    /// Number of cells
    pub fn number_of_cells(&self) -> usize {
        self.cells.len()
    }

    /// Coordinates of a vertex
    pub fn vertex(&self, index: usize) -> [f64; 3] {
        let data = self.vertices.data();
        [data[3 * index], data[3 * index + 1], data[3 * index + 2]]
    }

    /// The vertices of a cell
    pub fn cell_vertices(&self, cell: usize) -> &[usize; 3] {
        &self.cells[cell]
    }

    /// The edges of a cell, in local edge order
    pub fn cell_edges(&self, cell: usize) -> &[usize; 3] {
        &self.cells_to_edges[cell]
    }

    /// The two vertices of an edge
    pub fn edge_vertices(&self, edge: usize) -> &[usize; 2] {
        &self.edges_to_vertices[edge]
    }

    /// The cells adjacent to an edge
    pub fn edge_cells(&self, edge: usize) -> &[CellLocalIndexPair] {
        &self.edges_to_cells[edge]
    }

    /// The cells adjacent to a vertex
    pub fn vertex_cells(&self, vertex: usize) -> &[CellLocalIndexPair] {
        &self.vertices_to_cells[vertex]
    }

    /// The cells adjacent to a sub-entity of the given dimension.
    pub fn entity_cells(&self, dim: usize, index: usize) -> Vec<usize> {
        match dim {
            0 => self.vertices_to_cells[index].iter().map(|p| p.cell).collect(),
            1 => self.edges_to_cells[index].iter().map(|p| p.cell).collect(),
            _ => vec![index],
        }
    }

    /// The domain index (segment tag) of a cell
    pub fn domain_index(&self, cell: usize) -> usize {
        self.domain_indices[cell]
    }

    /// The sorted set of domain indices used by the cells of the grid
    pub fn domain_indices(&self) -> Vec<usize> {
        let mut indices = self.domain_indices.clone();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The geometry of a cell
    pub fn cell_geometry(&self, cell: usize) -> &CellGeometry {
        &self.geometry[cell]
    }

    /// Map a point on the reference triangle into a cell
    pub fn reference_to_physical(&self, cell: usize, point: [f64; 2]) -> [f64; 3] {
        self.geometry[cell].reference_to_physical(point)
    }

    /// The total surface area
    pub fn area(&self) -> f64 {
        self.geometry.iter().map(|g| g.volume).sum()
    }

    /// Whether every edge is shared by exactly two cells
    pub fn is_closed(&self) -> bool {
        self.edges_to_cells.iter().all(|cells| cells.len() == 2)
    }

    /// The id of a vertex
    pub fn vertex_id(&self, index: usize) -> usize {
        self.vertex_indices_to_ids[index]
    }

    /// The index of the vertex with the given id
    pub fn vertex_index_from_id(&self, id: usize) -> Option<usize> {
        self.vertex_ids_to_indices.get(&id).copied()
    }

    /// The id of a cell
    pub fn cell_id(&self, index: usize) -> usize {
        self.cell_indices_to_ids[index]
    }

    /// The index of the cell with the given id
    pub fn cell_index_from_id(&self, id: usize) -> Option<usize> {
        self.cell_ids_to_indices.get(&id).copied()
    }
}
