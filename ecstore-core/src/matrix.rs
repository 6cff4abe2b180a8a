//! Dense matrices over GF(2^8)
//!
//! Only what the coding engine needs: construction, multiplication,
//! row selection and Gauss-Jordan inversion.

use crate::error::{EcStoreError, Result};
use crate::galois;
use std::fmt;

/// Row-major matrix over GF(2^8)
#[derive(Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl Matrix {
    /// Zero matrix
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0u8; rows * cols],
        }
    }

    /// Build from explicit rows. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(EcStoreError::InvalidInput(
                "matrix rows must have equal length".to_string(),
            ));
        }
        let row_count = rows.len();
        Ok(Self {
            rows: row_count,
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Identity matrix of size `n`
    pub fn identity(n: usize) -> Self {
        let mut m = Self::new(n, n);
        for i in 0..n {
            m.set(i, i, 1);
        }
        m
    }

    /// Vandermonde matrix: `a[r][c] = r^c`.
    ///
    /// Any `cols` distinct rows are linearly independent as long as
    /// `rows <= 256`.
    pub fn vandermonde(rows: usize, cols: usize) -> Self {
        let mut m = Self::new(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                m.set(r, c, galois::exp(r as u8, c));
            }
        }
        m
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> u8 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: u8) {
        self.data[r * self.cols + c] = value;
    }

    /// Borrow one row
    pub fn row(&self, r: usize) -> &[u8] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Matrix product `self * rhs`
    pub fn multiply(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(EcStoreError::InvalidInput(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )));
        }
        let mut out = Matrix::new(self.rows, rhs.cols);
        for r in 0..self.rows {
            for c in 0..rhs.cols {
                let mut acc = 0u8;
                for i in 0..self.cols {
                    acc ^= galois::mul(self.get(r, i), rhs.get(i, c));
                }
                out.set(r, c, acc);
            }
        }
        Ok(out)
    }

    /// Concatenate `rhs` to the right of `self`
    pub fn augment(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.rows != rhs.rows {
            return Err(EcStoreError::InvalidInput(format!(
                "cannot augment {} rows with {} rows",
                self.rows, rhs.rows
            )));
        }
        let mut out = Matrix::new(self.rows, self.cols + rhs.cols);
        for r in 0..self.rows {
            let start = r * out.cols;
            out.data[start..start + self.cols].copy_from_slice(self.row(r));
            out.data[start + self.cols..start + out.cols].copy_from_slice(rhs.row(r));
        }
        Ok(out)
    }

    /// Copy of the half-open region `[rmin, rmax) x [cmin, cmax)`
    pub fn sub_matrix(&self, rmin: usize, cmin: usize, rmax: usize, cmax: usize) -> Matrix {
        let mut out = Matrix::new(rmax - rmin, cmax - cmin);
        for r in rmin..rmax {
            for c in cmin..cmax {
                out.set(r - rmin, c - cmin, self.get(r, c));
            }
        }
        out
    }

    /// New matrix made of the given rows, in the given order
    pub fn select_rows(&self, rows: &[usize]) -> Matrix {
        let mut out = Matrix::new(rows.len(), self.cols);
        for (i, &r) in rows.iter().enumerate() {
            out.data[i * self.cols..(i + 1) * self.cols].copy_from_slice(self.row(r));
        }
        out
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    /// Inverse via Gauss-Jordan elimination on `[self | I]`
    pub fn invert(&self) -> Result<Matrix> {
        if !self.is_square() {
            return Err(EcStoreError::InvalidInput(format!(
                "only square matrices can be inverted, got {}x{}",
                self.rows, self.cols
            )));
        }
        let n = self.rows;
        let mut work = self.augment(&Matrix::identity(n))?;

        for r in 0..n {
            if work.get(r, r) == 0 {
                let pivot_row = (r + 1..n)
                    .find(|&below| work.get(below, r) != 0)
                    .ok_or(EcStoreError::SingularMatrix)?;
                work.swap_rows(r, pivot_row);
            }

            let pivot = work.get(r, r);
            if pivot != 1 {
                let scale = galois::inv(pivot);
                for c in 0..work.cols {
                    let v = work.get(r, c);
                    work.set(r, c, galois::mul(v, scale));
                }
            }

            let pivot_row = work.row(r).to_vec();
            for other in 0..n {
                if other == r {
                    continue;
                }
                let factor = work.get(other, r);
                if factor != 0 {
                    let start = other * work.cols;
                    galois::mul_slice_add(
                        factor,
                        &pivot_row,
                        &mut work.data[start..start + work.cols],
                    );
                }
            }
        }

        Ok(work.sub_matrix(0, n, n, 2 * n))
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix({}x{})", self.rows, self.cols)?;
        for r in 0..self.rows {
            writeln!(f, "  {:?}", self.row(r))?;
        }
        Ok(())
    }
}
