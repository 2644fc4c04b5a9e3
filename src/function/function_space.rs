//! Function spaces on the whole grid or on a segment of it
use crate::element::{Continuity, LagrangeElement};
use crate::function::segment::{Segment, SegmentClassifier, SegmentOptions};
use crate::grid::FlatTriangleGrid;
use crate::quadrature::triangle_rule;
use crate::types::{Error, Result};
use log::info;

/// Dof numbering of the unrestricted space.
struct DofMap {
    cell_dofs: Vec<Vec<usize>>,
    size: usize,
    // Sub-entity (dimension, index) holding the reference point of each dof
    entities: Vec<(usize, usize)>,
    // (cell, local index) pairs of every dof
    owners: Vec<Vec<(usize, usize)>>,
}

impl DofMap {
    /// Number the dofs cell by cell, giving dofs attached to shared sub-entities a single
    /// number.
    fn new(grid: &FlatTriangleGrid, element: &LagrangeElement) -> Self {
        let ncells = grid.number_of_cells();
        let mut cell_dofs = vec![vec![0; element.dim()]; ncells];
        let mut entity_dofs: [Vec<Vec<usize>>; 3] = [
            vec![vec![]; grid.number_of_vertices()],
            vec![vec![]; grid.number_of_edges()],
            vec![vec![]; ncells],
        ];
        let mut size = 0;
        for (cell, dofs) in cell_dofs.iter_mut().enumerate() {
            for dim in 0..3 {
                let entities: Vec<usize> = match dim {
                    0 => grid.cell_vertices(cell).to_vec(),
                    1 => grid.cell_edges(cell).to_vec(),
                    _ => vec![cell],
                };
                for (local, entity) in entities.iter().enumerate() {
                    let local_dofs = element.entity_dofs(dim, local);
                    if local_dofs.is_empty() {
                        continue;
                    }
                    if entity_dofs[dim][*entity].is_empty() {
                        entity_dofs[dim][*entity] = (size..size + local_dofs.len()).collect();
                        size += local_dofs.len();
                    }
                    for (local_dof, dof) in local_dofs.iter().zip(&entity_dofs[dim][*entity]) {
                        dofs[*local_dof] = *dof;
                    }
                }
            }
        }

        let mut entities = vec![(0, 0); size];
        let mut owners = vec![vec![]; size];
        for (cell, dofs) in cell_dofs.iter().enumerate() {
            for (local, dof) in dofs.iter().enumerate() {
                let (dim, index) = element.reference_entity(local);
                entities[*dof] = match dim {
                    0 => (0, grid.cell_vertices(cell)[index]),
                    1 => (1, grid.cell_edges(cell)[index]),
                    _ => (2, cell),
                };
                owners[*dof].push((cell, local));
            }
        }

        Self {
            cell_dofs,
            size,
            entities,
            owners,
        }
    }
}

/// A space of piecewise polynomial functions on a grid.
///
/// A space is either defined on the whole grid or restricted to a segment. A restricted space
/// keeps a subset of the dofs of the unrestricted space with the same grid, degree and
/// continuity, numbered in increasing order of their global number. Two spaces on the same
/// grid with the same element therefore agree on the identity of every dof they share.
pub struct FunctionSpace<'a> {
    grid: &'a FlatTriangleGrid,
    element: LagrangeElement,
    cell_dofs: Vec<Vec<Option<usize>>>,
    global_dof_numbers: Vec<usize>,
    global_size: usize,
    dof_cells: Vec<Vec<usize>>,
    reference_points: Vec<[f64; 3]>,
    segment: Option<Segment>,
}

impl<'a> FunctionSpace<'a> {
    /// Create a space on the whole grid
    pub fn new(grid: &'a FlatTriangleGrid, degree: usize, continuity: Continuity) -> Result<Self> {
        let element = LagrangeElement::create(degree, continuity)?;
        let map = DofMap::new(grid, &element);
        let points = element.points();
        let space = Self {
            grid,
            element,
            cell_dofs: map
                .cell_dofs
                .iter()
                .map(|dofs| dofs.iter().map(|d| Some(*d)).collect())
                .collect(),
            global_dof_numbers: (0..map.size).collect(),
            global_size: map.size,
            dof_cells: map
                .owners
                .iter()
                .map(|owners| owners.iter().map(|(c, _)| *c).collect())
                .collect(),
            reference_points: map
                .owners
                .iter()
                .map(|owners| {
                    let (cell, local) = owners[0];
                    grid.reference_to_physical(cell, points[local])
                })
                .collect(),
            segment: None,
        };
        info!(
            "Created {} space of degree {} with {} dofs",
            continuity_name(continuity),
            degree,
            space.local_size()
        );
        Ok(space)
    }

    /// Create a space restricted to the cells whose domain index is in `segment_ids`.
    ///
    /// A dof of the unrestricted space is kept if one of its owning cells is a candidate cell
    /// and its reference point is inside the segment, on the segment boundary of a closed
    /// segment, or anywhere when `reference_point_on_segment` is false.
    pub fn on_segment(
        grid: &'a FlatTriangleGrid,
        degree: usize,
        continuity: Continuity,
        segment_ids: &[usize],
        options: SegmentOptions,
    ) -> Result<Self> {
        let element = LagrangeElement::create(degree, continuity)?;
        if options.strictly_on_segment && continuity == Continuity::Discontinuous {
            return Err(Error::InvalidSpace(
                "strictly_on_segment requires a continuous space".into(),
            ));
        }
        let classifier = SegmentClassifier::new(grid, segment_ids, options)?;
        let candidates = classifier.candidate_cells();
        let map = DofMap::new(grid, &element);
        let points = element.points();

        let mut local_numbers = vec![None; map.size];
        let mut global_dof_numbers = vec![];
        for (dof, number) in local_numbers.iter_mut().enumerate() {
            let eligible = map.owners[dof].iter().any(|(c, _)| candidates[*c]);
            let (dim, index) = map.entities[dof];
            if eligible && classifier.includes(classifier.location(dim, index)) {
                *number = Some(global_dof_numbers.len());
                global_dof_numbers.push(dof);
            }
        }

        let truncate = options.strictly_on_segment;
        let cell_dofs = map
            .cell_dofs
            .iter()
            .enumerate()
            .map(|(cell, dofs)| {
                if truncate && !classifier.contains(cell) {
                    vec![None; dofs.len()]
                } else {
                    dofs.iter().map(|d| local_numbers[*d]).collect()
                }
            })
            .collect::<Vec<Vec<_>>>();

        let mut dof_cells = vec![vec![]; global_dof_numbers.len()];
        for (cell, dofs) in cell_dofs.iter().enumerate() {
            for dof in dofs.iter().flatten() {
                dof_cells[*dof].push(cell);
            }
        }
        let reference_points = global_dof_numbers
            .iter()
            .map(|dof| {
                let (cell, local) = map.owners[*dof][0];
                grid.reference_to_physical(cell, points[local])
            })
            .collect();

        let segment = classifier.into_segment();
        info!(
            "Created {} space of degree {} on segments {:?} ({}): {} of {} dofs",
            continuity_name(continuity),
            degree,
            segment.ids(),
            if options.closed { "closed" } else { "open" },
            global_dof_numbers.len(),
            map.size
        );

        Ok(Self {
            grid,
            element,
            cell_dofs,
            global_dof_numbers,
            global_size: map.size,
            dof_cells,
            reference_points,
            segment: Some(segment),
        })
    }

    /// The grid
    pub fn grid(&self) -> &'a FlatTriangleGrid {
        self.grid
    }

    /// The element
    pub fn element(&self) -> &LagrangeElement {
        &self.element
    }

    /// The number of dofs of this space
    pub fn local_size(&self) -> usize {
        self.global_dof_numbers.len()
    }

    /// The number of dofs of the unrestricted space with the same element
    pub fn global_size(&self) -> usize {
        self.global_size
    }

    /// The dofs of this space on a cell, indexed by local basis function.
    ///
    /// `None` marks basis functions that are not part of the space.
    pub fn cell_dofs(&self, cell: usize) -> &[Option<usize>] {
        &self.cell_dofs[cell]
    }

    /// Whether any basis function of the space is supported on a cell
    pub fn has_support(&self, cell: usize) -> bool {
        self.cell_dofs[cell].iter().any(|d| d.is_some())
    }

    /// The cells in the support of a dof
    pub fn dof_cells(&self, dof: usize) -> &[usize] {
        &self.dof_cells[dof]
    }

    /// The number of a dof in the unrestricted space
    pub fn global_dof_index(&self, local_dof_index: usize) -> usize {
        self.global_dof_numbers[local_dof_index]
    }

    /// The global numbers of all dofs, in increasing order
    pub fn global_dof_numbers(&self) -> &[usize] {
        &self.global_dof_numbers
    }

    /// The local number of a dof of the unrestricted space, if the dof is part of this space
    pub fn local_dof_index(&self, global_dof_index: usize) -> Option<usize> {
        self.global_dof_numbers.binary_search(&global_dof_index).ok()
    }

    /// The physical location of the interpolation point of a dof
    pub fn reference_point(&self, dof: usize) -> [f64; 3] {
        self.reference_points[dof]
    }

    /// The segment the space is restricted to
    pub fn segment(&self) -> Option<&Segment> {
        self.segment.as_ref()
    }

    /// Whether the space is restricted to a segment
    pub fn is_restricted(&self) -> bool {
        self.segment.is_some()
    }

    /// Whether basis functions are cut off at the segment boundary
    pub fn is_truncated(&self) -> bool {
        self.segment
            .as_ref()
            .map(|s| s.options().strictly_on_segment)
            .unwrap_or(false)
    }

    /// Whether two spaces use the same grid and element, so that their dofs can be compared
    pub fn is_compatible_with(&self, other: &FunctionSpace) -> bool {
        std::ptr::eq(self.grid, other.grid) && self.element == other.element
    }

    /// The integral of every basis function over the grid
    pub fn basis_integrals(&self) -> Vec<f64> {
        let mut integrals = vec![0.0; self.local_size()];
        let rule = match triangle_rule(self.element.degree() + 1) {
            Ok(rule) => rule,
            Err(_) => return integrals,
        };
        let table = self.element.tabulate(&rule.points);
        for (cell, dofs) in self.cell_dofs.iter().enumerate() {
            let jdet = self.grid.cell_geometry(cell).integration_element();
            for (basis, dof) in dofs.iter().enumerate() {
                if let Some(dof) = dof {
                    integrals[*dof] += jdet
                        * rule
                            .weights
                            .iter()
                            .enumerate()
                            .map(|(q, w)| w * table.value(q, basis))
                            .sum::<f64>();
                }
            }
        }
        integrals
    }
}

impl std::fmt::Debug for FunctionSpace<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionSpace")
            .field("element", &self.element)
            .field("size", &self.local_size())
            .field("segment", &self.segment)
            .finish()
    }
}

fn continuity_name(continuity: Continuity) -> &'static str {
    match continuity {
        Continuity::Continuous => "continuous",
        Continuity::Discontinuous => "discontinuous",
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shapes::{cube, regular_sphere, screen_triangles};
    use approx::assert_relative_eq;

    #[test]
    fn test_dp0() {
        let grid = regular_sphere(2);
        let space = FunctionSpace::new(&grid, 0, Continuity::Discontinuous).unwrap();
        assert_eq!(space.local_size(), grid.number_of_cells());
        assert_eq!(space.global_size(), space.local_size());
        assert!(!space.is_restricted());
    }

    #[test]
    fn test_dp1() {
        let grid = regular_sphere(2);
        let space = FunctionSpace::new(&grid, 1, Continuity::Discontinuous).unwrap();
        assert_eq!(space.local_size(), 3 * grid.number_of_cells());
        assert_eq!(space.cell_dofs(1), &[Some(3), Some(4), Some(5)]);
    }

    #[test]
    fn test_p1() {
        let grid = regular_sphere(2);
        let space = FunctionSpace::new(&grid, 1, Continuity::Continuous).unwrap();
        assert_eq!(space.local_size(), grid.number_of_vertices());
        for cell in 0..grid.number_of_cells() {
            for (local, vertex) in grid.cell_vertices(cell).iter().enumerate() {
                let dof = space.cell_dofs(cell)[local].unwrap();
                assert_eq!(space.reference_point(dof), grid.vertex(*vertex));
            }
        }
    }

    #[test]
    fn test_p2() {
        let grid = regular_sphere(2);
        let space = FunctionSpace::new(&grid, 2, Continuity::Continuous).unwrap();
        assert_eq!(
            space.local_size(),
            grid.number_of_vertices() + grid.number_of_edges()
        );
        for dof in 0..space.local_size() {
            assert!(space.dof_cells(dof).len() >= 2);
        }
    }

    #[test]
    fn test_basis_integrals_sum_to_area() {
        let grid = cube(0.5);
        for (degree, continuity) in [
            (0, Continuity::Discontinuous),
            (1, Continuity::Continuous),
            (1, Continuity::Discontinuous),
            (2, Continuity::Continuous),
        ] {
            let space = FunctionSpace::new(&grid, degree, continuity).unwrap();
            let total = space.basis_integrals().iter().sum::<f64>();
            assert_relative_eq!(total, 6.0, max_relative = 1e-13);
        }
    }

    #[test]
    fn test_p1_segment() {
        // 2 x 2 squares, tag 1 on the left column; vertices on x = 0, 0.5, 1
        let grid = screen_triangles(2);
        let space = |options| {
            FunctionSpace::on_segment(&grid, 1, Continuity::Continuous, &[1], options).unwrap()
        };
        let closed = space(SegmentOptions::closed());
        let open = space(SegmentOptions::open());
        assert_eq!(closed.local_size(), 6);
        assert_eq!(open.local_size(), 3);
        assert_eq!(closed.global_size(), 9);
        for dof in 0..open.local_size() {
            assert_relative_eq!(open.reference_point(dof)[0], 0.0);
        }
        for w in closed.global_dof_numbers().windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn test_strictly_on_segment() {
        let grid = screen_triangles(2);
        let full = FunctionSpace::on_segment(
            &grid,
            1,
            Continuity::Continuous,
            &[1],
            SegmentOptions::closed(),
        )
        .unwrap();
        let strict = FunctionSpace::on_segment(
            &grid,
            1,
            Continuity::Continuous,
            &[1],
            SegmentOptions::closed().strictly_on_segment(true),
        )
        .unwrap();
        assert_eq!(full.global_dof_numbers(), strict.global_dof_numbers());
        assert!(strict.is_truncated());
        for cell in 0..grid.number_of_cells() {
            if grid.domain_index(cell) == 2 {
                assert!(!strict.has_support(cell));
            }
        }
        assert!((0..grid.number_of_cells())
            .any(|c| grid.domain_index(c) == 2 && full.has_support(c)));
        let integral = strict.basis_integrals().iter().sum::<f64>();
        assert_relative_eq!(integral, 0.5, max_relative = 1e-13);
    }

    #[test]
    fn test_invalid_options() {
        let grid = screen_triangles(2);
        assert!(matches!(
            FunctionSpace::on_segment(
                &grid,
                1,
                Continuity::Discontinuous,
                &[1],
                SegmentOptions::closed().strictly_on_segment(true)
            ),
            Err(Error::InvalidSpace(_))
        ));
        assert!(matches!(
            FunctionSpace::on_segment(
                &grid,
                1,
                Continuity::Continuous,
                &[3],
                SegmentOptions::closed()
            ),
            Err(Error::UnknownSegment { .. })
        ));
        assert!(FunctionSpace::new(&grid, 0, Continuity::Continuous).is_err());
    }
}
