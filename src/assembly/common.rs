//! Common assembly types
use crate::types::Result;

/// Options for operator assembly.
///
/// The options are passed explicitly into every assembly call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOptions {
    /// Gauss points per direction of the collapsed triangle rule used for non-singular integrals
    pub quadrature_degree: usize,
    /// Gauss points per direction of the Duffy rules used for singular integrals
    pub singular_quadrature_degree: usize,
    /// Maximum number of test cells in each batch sent to a thread
    pub batch_size: usize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            quadrature_degree: 4,
            singular_quadrature_degree: 4,
            batch_size: 128,
        }
    }
}

impl AssemblyOptions {
    /// Set the quadrature degree for non-singular integrals
    pub fn quadrature_degree(&mut self, degree: usize) -> &mut Self {
        self.quadrature_degree = degree;
        self
    }

    /// Set the quadrature degree for singular integrals
    pub fn singular_quadrature_degree(&mut self, degree: usize) -> &mut Self {
        self.singular_quadrature_degree = degree;
        self
    }

    /// Set the maximum size of a batch of cells to send to an assembly function
    pub fn batch_size(&mut self, size: usize) -> &mut Self {
        self.batch_size = usize::max(1, size);
        self
    }
}

/// Data for a sparse matrix in coordinate format
///
/// Repeated entries are summed when the matrix is converted.
#[derive(Debug, Clone)]
pub struct SparseMatrixData {
    /// Data
    pub data: Vec<f64>,
    /// Rows
    pub rows: Vec<usize>,
    /// Columns
    pub cols: Vec<usize>,
    /// Shape of the matrix
    pub shape: [usize; 2],
}

impl SparseMatrixData {
    /// Create new sparse matrix
    pub fn new(shape: [usize; 2]) -> Self {
        Self {
            data: vec![],
            rows: vec![],
            cols: vec![],
            shape,
        }
    }

    /// Create new sparse matrix with a known size
    pub fn new_known_size(shape: [usize; 2], size: usize) -> Self {
        Self {
            data: Vec::with_capacity(size),
            rows: Vec::with_capacity(size),
            cols: Vec::with_capacity(size),
            shape,
        }
    }

    /// Add an entry
    pub fn push(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.shape[0] && col < self.shape[1]);
        self.rows.push(row);
        self.cols.push(col);
        self.data.push(value);
    }

    /// Convert to compressed sparse row format
    ///
    /// Entries that sum to zero are dropped.
    pub fn to_csr(&self) -> Result<CsrMatrix> {
        if self.data.iter().all(|v| *v == 0.0) {
            return Ok(CsrMatrix::new(
                self.shape,
                vec![],
                vec![0; self.shape[0] + 1],
                vec![],
            ));
        }
        Ok(CsrMatrix::from_aij(
            self.shape,
            &self.rows,
            &self.cols,
            &self.data,
        )?)
    }
}

/// A sparse matrix in compressed sparse row format
pub type CsrMatrix = rlst::CsrMatrix<f64>;
