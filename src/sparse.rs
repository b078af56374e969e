//! Row-compressed sparse matrix used as the input to the decomposition.

use crate::error::{DiscoveryError, Result};
use crate::{Matrix, Vector};
use sprs::{CsMat, TriMat};
use std::collections::BTreeMap;

/// Immutable sparse matrix in CSR layout.
///
/// Rows are patterns and columns entity pairs in the relation-discovery
/// setting, but nothing here depends on that interpretation.
#[derive(Clone, Debug)]
pub struct SparseMatrix {
    inner: CsMat<f64>,
}

impl SparseMatrix {
    pub fn builder(num_rows: usize, num_cols: usize) -> SparseMatrixBuilder {
        SparseMatrixBuilder::new(num_rows, num_cols)
    }

    /// Copies every non-zero cell of a dense matrix.
    pub fn from_dense(x: &Matrix) -> Self {
        let mut triplets = TriMat::new((x.nrows(), x.ncols()));
        for ((row, col), &value) in x.indexed_iter() {
            if value != 0.0 {
                triplets.add_triplet(row, col, value);
            }
        }
        Self {
            inner: triplets.to_csr(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.inner.rows()
    }

    pub fn ncols(&self) -> usize {
        self.inner.cols()
    }

    pub fn nnz(&self) -> usize {
        self.inner.nnz()
    }

    /// `A * v`
    pub fn times(&self, v: &Vector) -> Result<Vector> {
        self.check_len(v, self.ncols())?;
        let mut out = Vector::zeros(self.nrows());
        for (row, row_vec) in self.inner.outer_iterator().enumerate() {
            out[row] = row_vec.iter().map(|(col, &value)| value * v[col]).sum();
        }
        Ok(out)
    }

    /// `A^T * u`
    pub fn transpose_times(&self, u: &Vector) -> Result<Vector> {
        self.check_len(u, self.nrows())?;
        let mut out = Vector::zeros(self.ncols());
        for (row, row_vec) in self.inner.outer_iterator().enumerate() {
            let scale = u[row];
            if scale == 0.0 {
                continue;
            }
            for (col, &value) in row_vec.iter() {
                out[col] += scale * value;
            }
        }
        Ok(out)
    }

    /// `A^T * (A * v)`, the Gram operator, without materialising `A^T A`.
    pub fn times_squared(&self, v: &Vector) -> Result<Vector> {
        self.check_len(v, self.ncols())?;
        let mut out = Vector::zeros(self.ncols());
        for row_vec in self.inner.outer_iterator() {
            let dot: f64 = row_vec.iter().map(|(col, &value)| value * v[col]).sum();
            if dot == 0.0 {
                continue;
            }
            for (col, &value) in row_vec.iter() {
                out[col] += dot * value;
            }
        }
        Ok(out)
    }

    /// Inner product of row `row` with a dense vector of length `ncols`.
    pub fn row_dot(&self, row: usize, v: &Vector) -> Result<f64> {
        self.check_len(v, self.ncols())?;
        let row_vec = self.inner.outer_view(row).ok_or(DiscoveryError::IndexOutOfBounds {
            what: "row",
            index: row,
            bound: self.nrows(),
            line: None,
        })?;
        Ok(row_vec.iter().map(|(col, &value)| value * v[col]).sum())
    }

    pub fn row_to_dense(&self, row: usize) -> Result<Vector> {
        let row_vec = self.inner.outer_view(row).ok_or(DiscoveryError::IndexOutOfBounds {
            what: "row",
            index: row,
            bound: self.nrows(),
            line: None,
        })?;
        let mut out = Vector::zeros(self.ncols());
        for (col, &value) in row_vec.iter() {
            out[col] = value;
        }
        Ok(out)
    }

    pub fn to_dense(&self) -> Matrix {
        let mut out = Matrix::zeros((self.nrows(), self.ncols()));
        for (row, row_vec) in self.inner.outer_iterator().enumerate() {
            for (col, &value) in row_vec.iter() {
                out[[row, col]] = value;
            }
        }
        out
    }

    fn check_len(&self, v: &Vector, expected: usize) -> Result<()> {
        if v.len() != expected {
            return Err(DiscoveryError::DimensionMismatch {
                expected,
                found: v.len(),
            });
        }
        Ok(())
    }
}

/// Collects cells before freezing them into a [`SparseMatrix`].
///
/// Setting the same cell twice keeps the last value. Zero values are not stored.
#[derive(Clone, Debug)]
pub struct SparseMatrixBuilder {
    num_rows: usize,
    num_cols: usize,
    cells: BTreeMap<(usize, usize), f64>,
}

impl SparseMatrixBuilder {
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Self {
            num_rows,
            num_cols,
            cells: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.num_rows {
            return Err(DiscoveryError::IndexOutOfBounds {
                what: "row",
                index: row,
                bound: self.num_rows,
                line: None,
            });
        }
        if col >= self.num_cols {
            return Err(DiscoveryError::IndexOutOfBounds {
                what: "column",
                index: col,
                bound: self.num_cols,
                line: None,
            });
        }
        if value == 0.0 {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
        Ok(())
    }

    pub fn build(self) -> SparseMatrix {
        let mut triplets = TriMat::with_capacity((self.num_rows, self.num_cols), self.cells.len());
        for ((row, col), value) in self.cells {
            triplets.add_triplet(row, col, value);
        }
        SparseMatrix {
            inner: triplets.to_csr(),
        }
    }
}
