//! Block operators
use crate::function::{FunctionSpace, GridFunction};
use crate::operator::{AssembledCombination, LinearCombination, MassInverse, OperatorAssembler};
use crate::solvers::{gmres, GmresOptions, LinearOperator, SolveForm};
use crate::types::{check_dimension, Error, Result};
use log::info;

type RowSpaces<'a> = (&'a FunctionSpace<'a>, &'a FunctionSpace<'a>);

/// A fixed-size grid of operators.
///
/// Every operator in a row shares its range and dual spaces, every operator in a column its
/// domain space. Cells that are never set are zero.
pub struct BlockOperator<'a> {
    rows: usize,
    cols: usize,
    cells: Vec<Option<LinearCombination<'a>>>,
    row_spaces: Vec<Option<RowSpaces<'a>>>,
    col_spaces: Vec<Option<&'a FunctionSpace<'a>>>,
}

impl<'a> BlockOperator<'a> {
    /// Create an empty block operator
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
            row_spaces: vec![None; rows],
            col_spaces: vec![None; cols],
        }
    }

    /// Number of block rows and columns
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Set a cell.
    ///
    /// Fails if the operator's spaces differ from those already fixed for its row or column.
    pub fn set(
        &mut self,
        row: usize,
        col: usize,
        op: impl Into<LinearCombination<'a>>,
    ) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(Error::BlockShape(format!(
                "cell ({row}, {col}) is outside a {} x {} block operator",
                self.rows, self.cols
            )));
        }
        let op = op.into();
        if let Some((range, dual)) = self.row_spaces[row] {
            if !std::ptr::eq(range, op.range()) || !std::ptr::eq(dual, op.dual()) {
                return Err(Error::BlockShape(format!(
                    "cell ({row}, {col}) differs from the range or dual space of its row"
                )));
            }
        }
        if let Some(domain) = self.col_spaces[col] {
            if !std::ptr::eq(domain, op.domain()) {
                return Err(Error::BlockShape(format!(
                    "cell ({row}, {col}) differs from the domain space of its column"
                )));
            }
        }
        self.row_spaces[row] = Some((op.range(), op.dual()));
        self.col_spaces[col] = Some(op.domain());
        self.cells[row * self.cols + col] = Some(op);
        Ok(())
    }

    /// A cell, `None` if it is zero
    pub fn get(&self, row: usize, col: usize) -> Option<&LinearCombination<'a>> {
        if row < self.rows && col < self.cols {
            self.cells[row * self.cols + col].as_ref()
        } else {
            None
        }
    }

    /// The domain spaces of the columns
    pub fn domain_spaces(&self) -> Result<Vec<&'a FunctionSpace<'a>>> {
        self.col_spaces
            .iter()
            .enumerate()
            .map(|(col, s)| {
                s.ok_or_else(|| Error::BlockShape(format!("column {col} has no operator")))
            })
            .collect()
    }

    /// The range and dual spaces of the rows
    pub fn row_spaces(&self) -> Result<Vec<RowSpaces<'a>>> {
        self.row_spaces
            .iter()
            .enumerate()
            .map(|(row, s)| {
                s.ok_or_else(|| Error::BlockShape(format!("row {row} has no operator")))
            })
            .collect()
    }

    /// Assemble the weak form; cells are assembled in parallel
    pub fn weak_form(&self, assembler: &mut OperatorAssembler<'a>) -> Result<AssembledBlock> {
        let rows = self.row_spaces()?;
        let cols = self.domain_spaces()?;
        let declared = self
            .cells
            .iter()
            .flatten()
            .flat_map(|c| c.terms().iter().map(|(_, op)| *op))
            .collect::<Vec<_>>();
        assembler.assemble_all(&declared)?;
        let mut cells = Vec::with_capacity(self.cells.len());
        for cell in &self.cells {
            cells.push(match cell {
                Some(c) => Some(c.assemble(assembler)?),
                None => None,
            });
        }
        Ok(AssembledBlock {
            row_offsets: offsets(rows.iter().map(|(_, dual)| dual.local_size())),
            col_offsets: offsets(cols.iter().map(|d| d.local_size())),
            cols: self.cols,
            cells,
        })
    }

    /// Assemble the strong form, every row premultiplied by its inverse mass matrix
    pub fn strong_form(&self, assembler: &mut OperatorAssembler<'a>) -> Result<StrongBlock> {
        let inverses = self
            .row_spaces()?
            .into_iter()
            .map(|(range, dual)| MassInverse::new(range, dual))
            .collect::<Result<Vec<_>>>()?;
        Ok(StrongBlock {
            weak: self.weak_form(assembler)?,
            inverses,
        })
    }

    /// Apply to one function per column and stack the rows.
    ///
    /// In weak form a row holds projections onto its dual basis, in strong form coefficients in
    /// its range space.
    pub fn apply(
        &self,
        assembler: &mut OperatorAssembler<'a>,
        functions: &[&GridFunction],
        form: SolveForm,
    ) -> Result<Vec<f64>> {
        if functions.len() != self.cols {
            return Err(Error::BlockShape(format!(
                "{} functions given to a block operator with {} columns",
                functions.len(),
                self.cols
            )));
        }
        let mut out = Vec::new();
        for (row, (range, dual)) in self.row_spaces()?.into_iter().enumerate() {
            let mut projections = vec![0.0; dual.local_size()];
            for (col, fun) in functions.iter().enumerate() {
                if let Some(cell) = self.get(row, col) {
                    let image = cell.weak_apply(assembler, fun)?;
                    projections.iter_mut().zip(image).for_each(|(p, v)| *p += v);
                }
            }
            match form {
                SolveForm::Weak => out.extend(projections),
                SolveForm::Strong => {
                    out.extend(MassInverse::new(range, dual)?.matvec(&projections)?)
                }
            }
        }
        Ok(out)
    }

    /// Split a stacked coefficient vector into one function per column
    pub fn split(&self, x: &[f64]) -> Result<Vec<GridFunction<'a>>> {
        let spaces = self.domain_spaces()?;
        check_dimension(spaces.iter().map(|s| s.local_size()).sum(), x.len())?;
        let mut start = 0;
        spaces
            .into_iter()
            .map(|space| {
                let end = start + space.local_size();
                let fun = GridFunction::from_coefficients(space, x[start..end].to_vec());
                start = end;
                fun
            })
            .collect()
    }

    /// Solve `A x = rhs` with GMRES in the form given by the options.
    ///
    /// The right-hand side must be in the same form, see [`BlockOperator::apply`].
    pub fn solve(
        &self,
        assembler: &mut OperatorAssembler<'a>,
        rhs: &[f64],
        options: &GmresOptions,
    ) -> Result<BlockSolution<'a>> {
        let solution = match options.form {
            SolveForm::Weak => gmres(&self.weak_form(assembler)?, rhs, options)?,
            SolveForm::Strong => gmres(&self.strong_form(assembler)?, rhs, options)?,
        };
        info!(
            "Block system solved in {:?} form: {} iterations, residual {:e}",
            options.form, solution.iterations, solution.residual
        );
        Ok(BlockSolution {
            functions: self.split(&solution.x)?,
            iterations: solution.iterations,
            residual: solution.residual,
            converged: solution.converged,
        })
    }
}

fn offsets(sizes: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut out = vec![0];
    for size in sizes {
        out.push(out[out.len() - 1] + size);
    }
    out
}

/// The solution of a block system
#[derive(Debug)]
pub struct BlockSolution<'a> {
    /// One function per block column
    pub functions: Vec<GridFunction<'a>>,
    /// Number of GMRES iterations
    pub iterations: usize,
    /// Final relative residual
    pub residual: f64,
    /// Whether the tolerance was reached
    pub converged: bool,
}

/// The weak form of a [`BlockOperator`]
pub struct AssembledBlock {
    row_offsets: Vec<usize>,
    col_offsets: Vec<usize>,
    cols: usize,
    cells: Vec<Option<AssembledCombination>>,
}

impl LinearOperator for AssembledBlock {
    fn shape(&self) -> [usize; 2] {
        [
            self.row_offsets[self.row_offsets.len() - 1],
            self.col_offsets[self.col_offsets.len() - 1],
        ]
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        let [rows, cols] = self.shape();
        check_dimension(cols, x.len())?;
        check_dimension(rows, y.len())?;
        y.iter_mut().for_each(|v| *v = 0.0);
        for (index, cell) in self.cells.iter().enumerate() {
            if let Some(cell) = cell {
                let (row, col) = (index / self.cols, index % self.cols);
                let x_block = &x[self.col_offsets[col]..self.col_offsets[col + 1]];
                let image = cell.matvec(x_block)?;
                let y_block = &mut y[self.row_offsets[row]..self.row_offsets[row + 1]];
                y_block.iter_mut().zip(image).for_each(|(yi, v)| *yi += v);
            }
        }
        Ok(())
    }
}

/// The strong form of a [`BlockOperator`]
pub struct StrongBlock {
    weak: AssembledBlock,
    inverses: Vec<MassInverse>,
}

impl LinearOperator for StrongBlock {
    fn shape(&self) -> [usize; 2] {
        self.weak.shape()
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) -> Result<()> {
        let projections = self.weak.matvec(x)?;
        check_dimension(projections.len(), y.len())?;
        let offsets = &self.weak.row_offsets;
        for (row, inverse) in self.inverses.iter().enumerate() {
            let range = offsets[row]..offsets[row + 1];
            inverse.apply(&projections[range.clone()], &mut y[range])?;
        }
        Ok(())
    }
}
