//! Row-major point matrix storage.
//!
//! The tree owns its points through a [`Matrix`] built with a defensive copy,
//! so callers never observe tree-internal permutation or layout. Constructors
//! validate shape and finiteness once; everything downstream relies on those
//! invariants instead of re-checking.

use crate::error::{ArborError, Result};

/// Immutable row-major matrix of `f64` point coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Copies `rows` into an owned matrix, validating shape and finiteness.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::EmptyPointSet`] when no rows are given,
    /// [`ArborError::JaggedRow`] when row lengths differ, and
    /// [`ArborError::NonFinite`] when any coordinate is NaN or infinite.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(ArborError::EmptyPointSet);
        };
        let cols = first.len();
        if cols == 0 {
            return Err(ArborError::JaggedRow {
                row: 0,
                expected: 1,
                got: 0,
            });
        }

        let mut data = Vec::with_capacity(rows.len() * cols);
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(ArborError::JaggedRow {
                    row: row_index,
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }

        Self::from_flat(rows.len(), cols, data)
    }

    /// Builds a matrix from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::ShapeMismatch`] when `data.len() != rows * cols`,
    /// [`ArborError::EmptyPointSet`] when `rows == 0`, and
    /// [`ArborError::NonFinite`] when any value is NaN or infinite.
    pub fn from_flat(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows == 0 {
            return Err(ArborError::EmptyPointSet);
        }
        if cols == 0 || data.len() != rows * cols {
            return Err(ArborError::ShapeMismatch {
                rows,
                cols,
                len: data.len(),
            });
        }

        for (index, value) in data.iter().enumerate() {
            if !value.is_finite() {
                return Err(ArborError::NonFinite {
                    row: index / cols,
                    col: index % cols,
                    value: *value,
                });
            }
        }

        Ok(Self { data, rows, cols })
    }

    /// Returns the number of rows (points).
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns (dimensions).
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the coordinates of the point at `row`.
    ///
    /// # Panics
    ///
    /// Panics when `row >= self.rows()`.
    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }
}
