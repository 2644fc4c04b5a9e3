//! Definition of various test shapes.
use crate::grid::FlatTriangleGrid;
use rlst::{rlst_dynamic_array2, RawAccessMut};
use std::collections::HashMap;

/// Collects points and cells, numbering points in order of first use.
struct ShapeBuilder {
    points: Vec<[f64; 3]>,
    point_indices: HashMap<usize, usize>,
    cells: Vec<[usize; 3]>,
    domain_indices: Vec<usize>,
}

impl ShapeBuilder {
    fn new() -> Self {
        Self {
            points: vec![],
            point_indices: HashMap::new(),
            cells: vec![],
            domain_indices: vec![],
        }
    }

    fn point(&mut self, key: usize, coordinates: impl FnOnce() -> [f64; 3]) -> usize {
        *self.point_indices.entry(key).or_insert_with(|| {
            self.points.push(coordinates());
            self.points.len() - 1
        })
    }

    fn finish(self) -> FlatTriangleGrid {
        let npoints = self.points.len();
        let mut vertices = rlst_dynamic_array2!(f64, [3, npoints]);
        for (chunk, p) in vertices.data_mut().chunks_exact_mut(3).zip(&self.points) {
            chunk.copy_from_slice(p);
        }
        let ncells = self.cells.len();
        FlatTriangleGrid::new(
            vertices,
            self.cells,
            self.domain_indices,
            (0..npoints).collect(),
            (0..ncells).collect(),
        )
    }
}

/// Triangulate the boundary of a union of voxels of the unit cube.
///
/// The unit cube is split into `m^3` voxels and `inside(i, j, k)` selects the voxels of the
/// solid. Every voxel face between the solid and the outside becomes two triangles, oriented
/// with the normal pointing out of the solid. Faces are tagged by their outward normal:
/// -x: 1, +x: 2, -y: 3, +y: 4, -z: 5, +z: 6.
fn voxel_surface(m: usize, inside: impl Fn([usize; 3]) -> bool) -> FlatTriangleGrid {
    let mut builder = ShapeBuilder::new();
    let h = 1.0 / m as f64;
    let is_solid = |v: [isize; 3]| {
        v.iter().all(|c| *c >= 0 && (*c as usize) < m) && inside(v.map(|c| c as usize))
    };

    for k in 0..m {
        for j in 0..m {
            for i in 0..m {
                let voxel = [i, j, k];
                if !inside(voxel) {
                    continue;
                }
                for axis in 0..3 {
                    let (b, c) = ((axis + 1) % 3, (axis + 2) % 3);
                    for side in 0..2 {
                        let mut neighbour = voxel.map(|x| x as isize);
                        neighbour[axis] += 2 * side as isize - 1;
                        if is_solid(neighbour) {
                            continue;
                        }
                        let mut corner = voxel;
                        corner[axis] += side;
                        let mut point = |db: usize, dc: usize| {
                            let mut p = corner;
                            p[b] += db;
                            p[c] += dc;
                            let key = p[0] + (m + 1) * (p[1] + (m + 1) * p[2]);
                            builder.point(key, || p.map(|x| x as f64 * h))
                        };
                        let p00 = point(0, 0);
                        let p10 = point(1, 0);
                        let p01 = point(0, 1);
                        let p11 = point(1, 1);
                        let domain = 2 * axis + 1 + side;
                        if side == 1 {
                            builder.cells.push([p00, p10, p11]);
                            builder.cells.push([p00, p11, p01]);
                        } else {
                            builder.cells.push([p00, p11, p10]);
                            builder.cells.push([p00, p01, p11]);
                        }
                        builder.domain_indices.extend([domain, domain]);
                    }
                }
            }
        }
    }
    builder.finish()
}

/// Create the surface of the unit cube `[0, 1]^3`.
///
/// Each face is split into squares of side at most `h`, and each square into two triangles.
/// The faces are tagged x=0: 1, x=1: 2, y=0: 3, y=1: 4, z=0: 5, z=1: 6.
pub fn cube(h: f64) -> FlatTriangleGrid {
    let m = usize::max(1, f64::ceil(1.0 / h) as usize);
    voxel_surface(m, |_| true)
}

/// Create the surface of the unit cube with the corner `[0.5, 1] x [0.5, 1] x [z, 1]` removed.
///
/// The mesh size is at most `h`, adjusted so that the planes x=0.5, y=0.5 and z lie on the
/// mesh; `z` is rounded to the nearest mesh plane strictly inside the cube. Cells are tagged
/// by their outward normal as in [`cube`].
pub fn reentrant_cube(h: f64, z: f64) -> FlatTriangleGrid {
    let mut m = usize::max(2, f64::ceil(1.0 / h) as usize);
    m += m % 2;
    let kz = (f64::round(z * m as f64) as usize).clamp(1, m - 1);
    voxel_surface(m, |[i, j, k]| !(2 * i >= m && 2 * j >= m && k >= kz))
}

/// Create a regular sphere
///
/// A regular sphere is created by starting with a regular octahedron. The shape is then
/// refined `refinement_level` times. Each time the grid is refined, each triangle is split
/// into four triangles (by adding lines connecting the midpoints of each edge). The new points
/// are then scaled so that they are a distance of 1 from the origin. Cells are tagged 1 to 8
/// by the octahedron face they come from.
pub fn regular_sphere(refinement_level: u32) -> FlatTriangleGrid {
    let mut points = vec![
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [-1.0, 0.0, 0.0],
        [0.0, -1.0, 0.0],
        [0.0, 0.0, -1.0],
    ];
    let mut cells = vec![
        [0, 1, 2],
        [0, 2, 3],
        [0, 3, 4],
        [0, 4, 1],
        [5, 2, 1],
        [5, 3, 2],
        [5, 4, 3],
        [5, 1, 4],
    ];
    let mut domains = (1..=8).collect::<Vec<_>>();

    for _ in 0..refinement_level {
        let mut edge_points = HashMap::new();
        let mut new_cells = Vec::with_capacity(4 * cells.len());
        let mut new_domains = Vec::with_capacity(4 * cells.len());
        for (c, domain) in cells.iter().zip(&domains) {
            let edges = [[1, 2], [0, 2], [0, 1]].map(|[i, j]| {
                let key = (usize::min(c[i], c[j]), usize::max(c[i], c[j]));
                *edge_points.entry(key).or_insert_with(|| {
                    let mid = [0, 1, 2].map(|k| 0.5 * (points[c[i]][k] + points[c[j]][k]));
                    let size = mid.iter().map(|x| x * x).sum::<f64>().sqrt();
                    points.push(mid.map(|x| x / size));
                    points.len() - 1
                })
            });
            new_cells.push([c[0], edges[2], edges[1]]);
            new_cells.push([c[1], edges[0], edges[2]]);
            new_cells.push([c[2], edges[1], edges[0]]);
            new_cells.push([edges[0], edges[1], edges[2]]);
            new_domains.extend([*domain; 4]);
        }
        cells = new_cells;
        domains = new_domains;
    }

    let mut builder = ShapeBuilder::new();
    for (index, p) in points.iter().enumerate() {
        builder.point(index, || *p);
    }
    builder.cells = cells;
    builder.domain_indices = domains;
    builder.finish()
}

/// Create a flat screen: the unit square in the plane z = 0.
///
/// The square is split into `n x n` squares and each square into two triangles. Cells in the
/// half x < 0.5 are tagged 1, the others 2.
pub fn screen_triangles(n: usize) -> FlatTriangleGrid {
    let mut builder = ShapeBuilder::new();
    let h = 1.0 / n as f64;
    for j in 0..n {
        for i in 0..n {
            let mut point = |di: usize, dj: usize| {
                let (x, y) = (i + di, j + dj);
                builder.point(x + (n + 1) * y, || [x as f64 * h, y as f64 * h, 0.0])
            };
            let p00 = point(0, 0);
            let p10 = point(1, 0);
            let p01 = point(0, 1);
            let p11 = point(1, 1);
            let domain = if 2 * i < n { 1 } else { 2 };
            builder.cells.push([p00, p10, p11]);
            builder.cells.push([p00, p11, p01]);
            builder.domain_indices.extend([domain, domain]);
        }
    }
    builder.finish()
}
