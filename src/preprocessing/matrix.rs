//! Row-major sparse feature matrix (CSR)
//!
//! One-of-k blocks are mostly zeros and `product_id` alone contributes one
//! column per machine, so transformed data is kept compressed. Numeric
//! features are always stored explicitly.

use crate::error::{PredMaintError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Compressed sparse row matrix of `f64`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
}

/// Borrowed view of one row
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    pub indices: &'a [usize],
    pub values: &'a [f64],
}

impl<'a> RowView<'a> {
    /// Value at `col`, zero when not stored
    pub fn get(&self, col: usize) -> f64 {
        match self.indices.binary_search(&col) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn dot(&self, weights: &Array1<f64>) -> f64 {
        self.iter().map(|(j, v)| v * weights[j]).sum()
    }
}

impl FeatureMatrix {
    /// Empty matrix with `n_cols` columns
    pub fn new(n_cols: usize) -> Self {
        Self {
            n_cols,
            indptr: vec![0],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn with_capacity(n_cols: usize, n_rows: usize, nnz: usize) -> Self {
        let mut indptr = Vec::with_capacity(n_rows + 1);
        indptr.push(0);
        Self {
            n_cols,
            indptr,
            indices: Vec::with_capacity(nnz),
            values: Vec::with_capacity(nnz),
        }
    }

    /// Append a row given as `(column, value)` pairs in ascending column order
    pub fn push_row<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let row_start = self.indices.len();
        for (col, value) in entries {
            let ordered = self.indices.len() == row_start
                || self.indices.last().map_or(true, |&last| last < col);
            if col >= self.n_cols || !ordered {
                self.indices.truncate(row_start);
                self.values.truncate(row_start);
                return Err(PredMaintError::ShapeError {
                    expected: format!("ascending column index < {}", self.n_cols),
                    actual: format!("column {}", col),
                });
            }
            self.indices.push(col);
            self.values.push(value);
        }
        self.indptr.push(self.indices.len());
        Ok(())
    }

    /// Compress a dense matrix, dropping exact zeros
    pub fn from_dense(dense: &Array2<f64>) -> Self {
        let mut matrix = Self::with_capacity(dense.ncols(), dense.nrows(), dense.len());
        for row in dense.rows() {
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    matrix.indices.push(j);
                    matrix.values.push(v);
                }
            }
            matrix.indptr.push(matrix.indices.len());
        }
        matrix
    }

    pub fn nrows(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn ncols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row(&self, i: usize) -> RowView<'_> {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        RowView {
            indices: &self.indices[start..end],
            values: &self.values[start..end],
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        (0..self.nrows()).map(move |i| self.row(i))
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.row(row).get(col)
    }

    /// Matrix-vector product
    pub fn dot(&self, weights: &Array1<f64>) -> Result<Array1<f64>> {
        if weights.len() != self.n_cols {
            return Err(PredMaintError::ShapeError {
                expected: format!("weights of length {}", self.n_cols),
                actual: format!("length {}", weights.len()),
            });
        }
        Ok(self.rows().map(|row| row.dot(weights)).collect())
    }

    /// Transposed product `Xᵀ v`
    pub fn t_dot(&self, v: &Array1<f64>) -> Result<Array1<f64>> {
        if v.len() != self.nrows() {
            return Err(PredMaintError::ShapeError {
                expected: format!("vector of length {}", self.nrows()),
                actual: format!("length {}", v.len()),
            });
        }
        let mut out = Array1::zeros(self.n_cols);
        for (row, &scale) in self.rows().zip(v.iter()) {
            if scale == 0.0 {
                continue;
            }
            for (j, x) in row.iter() {
                out[j] += x * scale;
            }
        }
        Ok(out)
    }

    /// New matrix holding the given rows, in the given order
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let nnz = rows.iter().map(|&i| self.indptr[i + 1] - self.indptr[i]).sum();
        let mut out = Self::with_capacity(self.n_cols, rows.len(), nnz);
        for &i in rows {
            let row = self.row(i);
            out.indices.extend_from_slice(row.indices);
            out.values.extend_from_slice(row.values);
            out.indptr.push(out.indices.len());
        }
        out
    }

    /// Column-major copy of the stored entries: `columns[j]` lists
    /// `(row, value)` in ascending row order.
    pub fn to_columns(&self) -> Vec<Vec<(usize, f64)>> {
        let mut columns = vec![Vec::new(); self.n_cols];
        for (i, row) in self.rows().enumerate() {
            for (j, v) in row.iter() {
                columns[j].push((i, v));
            }
        }
        columns
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.nrows(), self.n_cols));
        for (i, row) in self.rows().enumerate() {
            for (j, v) in row.iter() {
                dense[[i, j]] = v;
            }
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_dense_round_trip() {
        let dense = array![[1.0, 0.0, 2.0], [0.0, 0.0, 3.0]];
        let sparse = FeatureMatrix::from_dense(&dense);

        assert_eq!(sparse.nrows(), 2);
        assert_eq!(sparse.nnz(), 3);
        assert_eq!(sparse.get(1, 2), 3.0);
        assert_eq!(sparse.get(1, 0), 0.0);
        assert_eq!(sparse.to_dense(), dense);
    }

    #[test]
    fn test_push_row_rejects_unordered_columns() {
        let mut m = FeatureMatrix::new(3);
        assert!(m.push_row(vec![(2, 1.0), (1, 1.0)]).is_err());
        assert!(m.push_row(vec![(3, 1.0)]).is_err());
        assert_eq!(m.nrows(), 0);
        assert_eq!(m.nnz(), 0);
    }

    #[test]
    fn test_dot_products() {
        let m = FeatureMatrix::from_dense(&array![[1.0, 2.0], [0.0, 3.0]]);
        let w = array![1.0, 1.0];

        assert_eq!(m.dot(&w).unwrap(), array![3.0, 3.0]);
        assert_eq!(m.t_dot(&w).unwrap(), array![1.0, 5.0]);
        assert!(m.dot(&array![1.0]).is_err());
    }

    #[test]
    fn test_select_rows_and_columns() {
        let m = FeatureMatrix::from_dense(&array![[1.0, 0.0], [0.0, 2.0], [3.0, 0.0]]);
        let picked = m.select_rows(&[2, 0]);
        assert_eq!(picked.to_dense(), array![[3.0, 0.0], [1.0, 0.0]]);

        let columns = m.to_columns();
        assert_eq!(columns[0], vec![(0, 1.0), (2, 3.0)]);
        assert_eq!(columns[1], vec![(1, 2.0)]);
    }
}
