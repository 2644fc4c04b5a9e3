//! Segments of a grid and the rules deciding which dofs belong to them
use crate::grid::FlatTriangleGrid;
use crate::types::{Error, Result};

/// Options controlling how a function space is restricted to a segment.
///
/// The fields are
/// - `closed`: dofs whose reference point lies on the boundary of the segment are included.
/// - `element_on_segment`: only cells of the segment are candidates for owning a dof. When
///   false and the segment is closed, cells touching the segment boundary are candidates too.
/// - `reference_point_on_segment`: when false, every dof owned by a candidate cell is
///   included, wherever its reference point lies.
/// - `strictly_on_segment`: for continuous spaces, basis functions are cut off at the
///   segment boundary instead of extending into the neighbouring cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentOptions {
    /// Include the dofs on the segment boundary
    pub closed: bool,
    /// Restrict dof ownership to cells of the segment
    pub element_on_segment: bool,
    /// Require the dof reference point to be inside the segment
    pub reference_point_on_segment: bool,
    /// Truncate continuous basis functions at the segment boundary
    pub strictly_on_segment: bool,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            closed: true,
            element_on_segment: false,
            reference_point_on_segment: true,
            strictly_on_segment: false,
        }
    }
}

impl SegmentOptions {
    /// Default options for a closed segment
    pub fn closed() -> Self {
        Self::default()
    }

    /// Default options for an open segment
    pub fn open() -> Self {
        Self {
            closed: false,
            ..Self::default()
        }
    }

    /// Set `element_on_segment`
    pub fn element_on_segment(mut self, value: bool) -> Self {
        self.element_on_segment = value;
        self
    }

    /// Set `reference_point_on_segment`
    pub fn reference_point_on_segment(mut self, value: bool) -> Self {
        self.reference_point_on_segment = value;
        self
    }

    /// Set `strictly_on_segment`
    pub fn strictly_on_segment(mut self, value: bool) -> Self {
        self.strictly_on_segment = value;
        self
    }
}

/// A set of domain indices of a grid and the options used to restrict a space to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    ids: Vec<usize>,
    options: SegmentOptions,
}

impl Segment {
    /// The sorted domain indices of the segment
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// The options
    pub fn options(&self) -> &SegmentOptions {
        &self.options
    }
}

/// Where a sub-entity lies relative to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Location {
    /// All adjacent cells are in the segment
    Interior,
    /// Adjacent cells are both in and out of the segment
    Boundary,
    /// No adjacent cell is in the segment
    Exterior,
}

/// Classifies the cells and sub-entities of a grid against a segment.
pub(crate) struct SegmentClassifier<'g> {
    grid: &'g FlatTriangleGrid,
    segment: Segment,
    in_segment: Vec<bool>,
}

impl<'g> SegmentClassifier<'g> {
    pub(crate) fn new(
        grid: &'g FlatTriangleGrid,
        segment_ids: &[usize],
        options: SegmentOptions,
    ) -> Result<Self> {
        let available = grid.domain_indices();
        let mut ids = segment_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if !ids.iter().any(|id| available.binary_search(id).is_ok()) {
            return Err(Error::UnknownSegment {
                requested: ids,
                available,
            });
        }
        let in_segment = (0..grid.number_of_cells())
            .map(|c| ids.binary_search(&grid.domain_index(c)).is_ok())
            .collect();
        Ok(Self {
            grid,
            segment: Segment { ids, options },
            in_segment,
        })
    }

    pub(crate) fn into_segment(self) -> Segment {
        self.segment
    }

    pub(crate) fn contains(&self, cell: usize) -> bool {
        self.in_segment[cell]
    }

    pub(crate) fn location(&self, dim: usize, index: usize) -> Location {
        let cells = self.grid.entity_cells(dim, index);
        let inside = cells.iter().filter(|c| self.in_segment[**c]).count();
        if inside == 0 {
            Location::Exterior
        } else if inside == cells.len() {
            Location::Interior
        } else {
            Location::Boundary
        }
    }

    /// Cells that may own dofs of the restricted space.
    pub(crate) fn candidate_cells(&self) -> Vec<bool> {
        let options = &self.segment.options;
        let mut candidates = self.in_segment.clone();
        if !options.element_on_segment && options.closed {
            for (cell, candidate) in candidates.iter_mut().enumerate() {
                if *candidate {
                    continue;
                }
                let on_vertex = self
                    .grid
                    .cell_vertices(cell)
                    .iter()
                    .any(|v| self.location(0, *v) == Location::Boundary);
                let on_edge = self
                    .grid
                    .cell_edges(cell)
                    .iter()
                    .any(|e| self.location(1, *e) == Location::Boundary);
                *candidate = on_vertex || on_edge;
            }
        }
        candidates
    }

    /// Decide whether a candidate dof with a reference point on the given entity is included.
    pub(crate) fn includes(&self, location: Location) -> bool {
        let options = &self.segment.options;
        location == Location::Interior
            || (options.closed && location == Location::Boundary)
            || !options.reference_point_on_segment
    }
}
