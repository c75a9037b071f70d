use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Compressed-sparse-row matrix of `f32` values.
///
/// Rows are sample-aligned with the table slice the matrix was built from;
/// columns belong to whichever vectorizer produced them. Column indices
/// within each row are stored in ascending order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f32>,
}

impl CsrMatrix {
    /// Build from (row, col, value) triplets. Duplicate coordinates are
    /// summed; explicit zeros are dropped.
    pub fn from_triplets(
        rows: usize,
        cols: usize,
        triplets: &[(usize, usize, f32)],
    ) -> Result<Self, IndexError> {
        let mut per_row: Vec<Vec<(usize, f32)>> = vec![Vec::new(); rows];
        for &(r, c, v) in triplets {
            if r >= rows || c >= cols {
                return Err(IndexError {
                    row: r,
                    col: c,
                    rows,
                    cols,
                });
            }
            per_row[r].push((c, v));
        }

        let mut indptr = Vec::with_capacity(rows + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        indptr.push(0);
        let mut merged: Vec<(usize, f32)> = Vec::new();
        for row in per_row.iter_mut() {
            row.sort_by_key(|&(c, _)| c);
            merged.clear();
            for &(c, v) in row.iter() {
                match merged.last_mut() {
                    Some(last) if last.0 == c => last.1 += v,
                    _ => merged.push((c, v)),
                }
            }
            for &(c, v) in merged.iter().filter(|&&(_, v)| v != 0.0) {
                indices.push(c);
                values.push(v);
            }
            indptr.push(indices.len());
        }

        Ok(Self {
            rows,
            cols,
            indptr,
            indices,
            values,
        })
    }

    /// Build from a dense row-major buffer, skipping zeros.
    pub fn from_dense(rows: usize, cols: usize, data: &[f32]) -> Result<Self, ShapeError> {
        if data.len() != rows * cols {
            return Err(ShapeError {
                rows,
                cols,
                len: data.len(),
            });
        }
        let mut indptr = Vec::with_capacity(rows + 1);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        indptr.push(0);
        for r in 0..rows {
            for c in 0..cols {
                let v = data[r * cols + c];
                if v != 0.0 {
                    indices.push(c);
                    values.push(v);
                }
            }
            indptr.push(indices.len());
        }
        Ok(Self {
            rows,
            cols,
            indptr,
            indices,
            values,
        })
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Non-zero entries of one row as `(col, value)` pairs, ascending by col.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        assert!(row < self.rows, "row index out of bounds");
        let start = self.indptr[row];
        let end = self.indptr[row + 1];
        self.indices[start..end]
            .iter()
            .zip(&self.values[start..end])
            .map(|(&c, &v)| (c, v))
    }

    /// Densify one row into `buf` (must be `ncols` long, zeroed by this call).
    pub fn densify_row_into(&self, row: usize, buf: &mut [f32]) {
        assert_eq!(buf.len(), self.cols, "densify buffer has wrong width");
        buf.fill(0.0);
        for (c, v) in self.row(row) {
            buf[c] = v;
        }
    }

    /// Densify the whole matrix into a row-major buffer.
    pub fn to_dense(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.rows * self.cols];
        for r in 0..self.rows {
            for (c, v) in self.row(r) {
                out[r * self.cols + c] = v;
            }
        }
        out
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(col < self.cols, "column index out of bounds");
        self.row(row)
            .find(|&(c, _)| c == col)
            .map(|(_, v)| v)
            .unwrap_or(0.0)
    }

    /// Horizontally concatenate blocks in order. Every block must have the
    /// same row count; a mismatch is the fatal shape error the assembler
    /// propagates.
    pub fn hstack(blocks: &[CsrMatrix]) -> Result<CsrMatrix, PipelineError> {
        let first = blocks.first().ok_or(PipelineError::ShapeMismatch {
            context: "hstack of zero blocks",
            expected: 1,
            found: 0,
        })?;
        let rows = first.rows;
        for block in blocks {
            if block.rows != rows {
                return Err(PipelineError::ShapeMismatch {
                    context: "horizontal stack",
                    expected: rows,
                    found: block.rows,
                });
            }
        }

        let cols = blocks.iter().map(|b| b.cols).sum();
        let nnz = blocks.iter().map(|b| b.nnz()).sum();
        let mut indptr = Vec::with_capacity(rows + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        indptr.push(0);
        for r in 0..rows {
            let mut offset = 0;
            for block in blocks {
                for (c, v) in block.row(r) {
                    indices.push(offset + c);
                    values.push(v);
                }
                offset += block.cols;
            }
            indptr.push(indices.len());
        }

        Ok(CsrMatrix {
            rows,
            cols,
            indptr,
            indices,
            values,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ShapeError {
    rows: usize,
    cols: usize,
    len: usize,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid shape ({}, {}) for buffer of length {}",
            self.rows, self.cols, self.len
        )
    }
}

impl Error for ShapeError {}

#[derive(Debug, Clone)]
pub struct IndexError {
    row: usize,
    col: usize,
    rows: usize,
    cols: usize,
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "triplet ({}, {}) outside matrix of shape ({}, {})",
            self.row, self.col, self.rows, self.cols
        )
    }
}

impl Error for IndexError {}
