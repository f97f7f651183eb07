// src/core/csr.rs

use num_complex::Complex;
use num_traits::{One, Zero};
use std::fmt;

use super::buffer::{Buffer, BufferRead, ExportedView};
use super::constants::qdx_tolerances::DEFAULT_SPARSE_TOLERANCE;
use super::dense::Dense;
use super::error::DataError;
use super::shape::Shape;
use crate::validation::{check_csr_layout, check_matmul_shapes, check_same_shape, check_square};

/// Compressed-sparse-row matrix: three parallel buffers (stored values,
/// their column indices, and per-row offsets into both) plus a shape.
///
/// Layout invariants are checked once at construction: the offset array has
/// `rows + 1` monotonically non-decreasing entries starting at 0 and ending
/// at the stored element count, and column indices are in bounds and
/// strictly increasing within each row. A successfully built `Csr` never
/// violates them.
#[derive(Debug)]
pub struct Csr {
    shape: Shape,
    values: Buffer<Complex<f64>>,
    col_indices: Buffer<usize>,
    row_offsets: Buffer<usize>,
}

impl Csr {
    /// Builds a CSR matrix by adopting the three parallel arrays directly.
    /// Fails with [`DataError::InvalidBuffer`] on any layout violation.
    pub fn from_parts(
        values: Vec<Complex<f64>>,
        col_indices: Vec<usize>,
        row_offsets: Vec<usize>,
        shape: Shape,
    ) -> Result<Self, DataError> {
        check_csr_layout(values.len(), &col_indices, &row_offsets, shape)?;
        Ok(Self {
            shape,
            values: Buffer::owned(values),
            col_indices: Buffer::owned(col_indices),
            row_offsets: Buffer::owned(row_offsets),
        })
    }

    /// Compresses a dense matrix, dropping elements whose magnitude falls
    /// below the default sparse tolerance.
    pub fn from_dense(dense: &Dense) -> Self {
        let shape = dense.shape();
        let cells = dense.values();
        let mut values = Vec::new();
        let mut col_indices = Vec::new();
        let mut row_offsets = Vec::with_capacity(shape.rows + 1);
        row_offsets.push(0);
        for row in 0..shape.rows {
            for col in 0..shape.cols {
                let v = cells[row * shape.cols + col];
                if v.norm() > DEFAULT_SPARSE_TOLERANCE {
                    values.push(v);
                    col_indices.push(col);
                }
            }
            row_offsets.push(values.len());
        }
        Self {
            shape,
            values: Buffer::owned(values),
            col_indices: Buffer::owned(col_indices),
            row_offsets: Buffer::owned(row_offsets),
        }
    }

    /// All-zero matrix of the given shape (no stored elements).
    pub fn zeros(shape: Shape) -> Self {
        Self {
            shape,
            values: Buffer::owned(Vec::new()),
            col_indices: Buffer::owned(Vec::new()),
            row_offsets: Buffer::owned(vec![0; shape.rows + 1]),
        }
    }

    /// Identity matrix of dimension `n`.
    pub fn identity(n: usize) -> Self {
        Self {
            shape: Shape::new(n, n),
            values: Buffer::owned(vec![Complex::one(); n]),
            col_indices: Buffer::owned((0..n).collect()),
            row_offsets: Buffer::owned((0..=n).collect()),
        }
    }

    /// Shape of this matrix.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of stored elements.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Element at `(row, col)`: the stored value, zero for an unstored
    /// in-bounds position, `None` out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<Complex<f64>> {
        if row >= self.shape.rows || col >= self.shape.cols {
            return None;
        }
        let offsets = self.row_offsets.read();
        let cols = self.col_indices.read();
        let (start, end) = (offsets[row], offsets[row + 1]);
        match cols[start..end].binary_search(&col) {
            Ok(i) => Some(self.values.read()[start + i]),
            Err(_) => Some(Complex::zero()),
        }
    }

    /// Read access to the stored values.
    pub fn values(&self) -> BufferRead<'_, Complex<f64>> {
        self.values.read()
    }

    /// Read access to the column-index array.
    pub fn col_indices(&self) -> BufferRead<'_, usize> {
        self.col_indices.read()
    }

    /// Read access to the row-offset array.
    pub fn row_offsets(&self) -> BufferRead<'_, usize> {
        self.row_offsets.read()
    }

    /// Exports an external window onto the numeric payload (the stored
    /// values array). Index and offset arrays are never exported: external
    /// mutation of those would break the layout invariants outright rather
    /// than merely staling cached quantities.
    pub fn export_view(
        &mut self,
        writable: bool,
    ) -> Result<ExportedView<Complex<f64>>, DataError> {
        self.values.export_view(writable)
    }

    /// Explicit deep copy.
    pub fn deep_copy(&self) -> Self {
        Self {
            shape: self.shape,
            values: self.values.deep_copy(),
            col_indices: self.col_indices.deep_copy(),
            row_offsets: self.row_offsets.deep_copy(),
        }
    }

    /// Expansion back to the dense reference layout.
    pub fn to_dense(&self) -> Dense {
        let mut cells = vec![Complex::zero(); self.shape.len()];
        let values = self.values.read();
        let cols = self.col_indices.read();
        let offsets = self.row_offsets.read();
        for row in 0..self.shape.rows {
            for idx in offsets[row]..offsets[row + 1] {
                cells[row * self.shape.cols + cols[idx]] = values[idx];
            }
        }
        Dense::from_owned(cells, self.shape)
    }

    /// Scalar multiplication. The sparsity pattern is preserved.
    pub fn scale(&self, factor: Complex<f64>) -> Self {
        Self {
            shape: self.shape,
            values: Buffer::owned(self.values.read().iter().map(|v| v * factor).collect()),
            col_indices: self.col_indices.deep_copy(),
            row_offsets: self.row_offsets.deep_copy(),
        }
    }

    /// Additive inverse.
    pub fn neg(&self) -> Self {
        self.scale(Complex::new(-1.0, 0.0))
    }

    /// Element-wise addition by merging the two row patterns. Shapes must
    /// match.
    pub fn add(&self, other: &Csr) -> Result<Self, DataError> {
        check_same_shape(self.shape, other.shape, "add")?;
        let (a_vals, a_cols, a_offs) = (
            self.values.read(),
            self.col_indices.read(),
            self.row_offsets.read(),
        );
        let (b_vals, b_cols, b_offs) = (
            other.values.read(),
            other.col_indices.read(),
            other.row_offsets.read(),
        );
        let mut values = Vec::with_capacity(a_vals.len() + b_vals.len());
        let mut col_indices = Vec::with_capacity(a_vals.len() + b_vals.len());
        let mut row_offsets = Vec::with_capacity(self.shape.rows + 1);
        row_offsets.push(0);
        for row in 0..self.shape.rows {
            let (mut i, a_end) = (a_offs[row], a_offs[row + 1]);
            let (mut j, b_end) = (b_offs[row], b_offs[row + 1]);
            while i < a_end || j < b_end {
                let a_col = if i < a_end { Some(a_cols[i]) } else { None };
                let b_col = if j < b_end { Some(b_cols[j]) } else { None };
                match (a_col, b_col) {
                    (Some(ac), Some(bc)) if ac == bc => {
                        values.push(a_vals[i] + b_vals[j]);
                        col_indices.push(ac);
                        i += 1;
                        j += 1;
                    }
                    (Some(ac), Some(bc)) if ac < bc => {
                        values.push(a_vals[i]);
                        col_indices.push(ac);
                        i += 1;
                    }
                    (Some(_), Some(bc)) => {
                        values.push(b_vals[j]);
                        col_indices.push(bc);
                        j += 1;
                    }
                    (Some(ac), None) => {
                        values.push(a_vals[i]);
                        col_indices.push(ac);
                        i += 1;
                    }
                    (None, Some(bc)) => {
                        values.push(b_vals[j]);
                        col_indices.push(bc);
                        j += 1;
                    }
                    (None, None) => unreachable!("loop condition guarantees one side remains"),
                }
            }
            row_offsets.push(values.len());
        }
        Ok(Self {
            shape: self.shape,
            values: Buffer::owned(values),
            col_indices: Buffer::owned(col_indices),
            row_offsets: Buffer::owned(row_offsets),
        })
    }

    /// Element-wise subtraction. Shapes must match.
    pub fn sub(&self, other: &Csr) -> Result<Self, DataError> {
        check_same_shape(self.shape, other.shape, "sub")?;
        self.add(&other.neg())
    }

    /// Sparse matrix product `self * other` with a dense per-row
    /// accumulator. Inner dimensions must agree.
    pub fn matmul(&self, other: &Csr) -> Result<Self, DataError> {
        let out_shape = check_matmul_shapes(self.shape, other.shape, "matmul")?;
        let (a_vals, a_cols, a_offs) = (
            self.values.read(),
            self.col_indices.read(),
            self.row_offsets.read(),
        );
        let (b_vals, b_cols, b_offs) = (
            other.values.read(),
            other.col_indices.read(),
            other.row_offsets.read(),
        );
        let n = out_shape.cols;
        let mut values = Vec::new();
        let mut col_indices = Vec::new();
        let mut row_offsets = Vec::with_capacity(out_shape.rows + 1);
        row_offsets.push(0);

        let mut accumulator = vec![Complex::zero(); n];
        let mut occupied = vec![false; n];
        let mut touched: Vec<usize> = Vec::new();
        for row in 0..out_shape.rows {
            for idx in a_offs[row]..a_offs[row + 1] {
                let mid = a_cols[idx];
                let a_v = a_vals[idx];
                for jdx in b_offs[mid]..b_offs[mid + 1] {
                    let col = b_cols[jdx];
                    accumulator[col] += a_v * b_vals[jdx];
                    if !occupied[col] {
                        occupied[col] = true;
                        touched.push(col);
                    }
                }
            }
            touched.sort_unstable();
            for &col in &touched {
                values.push(accumulator[col]);
                col_indices.push(col);
                accumulator[col] = Complex::zero();
                occupied[col] = false;
            }
            touched.clear();
            row_offsets.push(values.len());
        }
        Ok(Self {
            shape: out_shape,
            values: Buffer::owned(values),
            col_indices: Buffer::owned(col_indices),
            row_offsets: Buffer::owned(row_offsets),
        })
    }

    /// Sum of diagonal elements. Requires a square shape.
    pub fn trace(&self) -> Result<Complex<f64>, DataError> {
        check_square(self.shape, "trace")?;
        let values = self.values.read();
        let cols = self.col_indices.read();
        let offsets = self.row_offsets.read();
        let mut sum = Complex::zero();
        for row in 0..self.shape.rows {
            let (start, end) = (offsets[row], offsets[row + 1]);
            if let Ok(i) = cols[start..end].binary_search(&row) {
                sum += values[start + i];
            }
        }
        Ok(sum)
    }

    /// Matrix transpose by counting sort over column indices. Keeps the
    /// output in canonical (sorted-columns) form.
    pub fn transpose(&self) -> Self {
        let values = self.values.read();
        let cols = self.col_indices.read();
        let offsets = self.row_offsets.read();
        let out_rows = self.shape.cols;
        let nnz = values.len();

        let mut out_offsets = vec![0usize; out_rows + 1];
        for &col in cols.iter() {
            out_offsets[col + 1] += 1;
        }
        for i in 0..out_rows {
            out_offsets[i + 1] += out_offsets[i];
        }

        let mut out_values = vec![Complex::zero(); nnz];
        let mut out_cols = vec![0usize; nnz];
        let mut insert_at = out_offsets.clone();
        for row in 0..self.shape.rows {
            for idx in offsets[row]..offsets[row + 1] {
                let col = cols[idx];
                let slot = insert_at[col];
                out_values[slot] = values[idx];
                out_cols[slot] = row;
                insert_at[col] += 1;
            }
        }
        Self {
            shape: Shape::new(self.shape.cols, self.shape.rows),
            values: Buffer::owned(out_values),
            col_indices: Buffer::owned(out_cols),
            row_offsets: Buffer::owned(out_offsets),
        }
    }

    /// Element-wise complex conjugate. The sparsity pattern is preserved.
    pub fn conj(&self) -> Self {
        Self {
            shape: self.shape,
            values: Buffer::owned(self.values.read().iter().map(|v| v.conj()).collect()),
            col_indices: self.col_indices.deep_copy(),
            row_offsets: self.row_offsets.deep_copy(),
        }
    }

    /// Conjugate transpose (Hermitian adjoint).
    pub fn adjoint(&self) -> Self {
        self.conj().transpose()
    }

    /// Element-wise approximate equality within `tolerance`, walking both
    /// row patterns in lockstep. Explicitly stored zeros and absent entries
    /// compare equal; differing shapes are unequal, never an error.
    pub fn approx_eq(&self, other: &Csr, tolerance: f64) -> bool {
        if self.shape != other.shape {
            return false;
        }
        let (a_vals, a_cols, a_offs) = (
            self.values.read(),
            self.col_indices.read(),
            self.row_offsets.read(),
        );
        let (b_vals, b_cols, b_offs) = (
            other.values.read(),
            other.col_indices.read(),
            other.row_offsets.read(),
        );
        for row in 0..self.shape.rows {
            let (mut i, a_end) = (a_offs[row], a_offs[row + 1]);
            let (mut j, b_end) = (b_offs[row], b_offs[row + 1]);
            while i < a_end || j < b_end {
                let a_col = if i < a_end { Some(a_cols[i]) } else { None };
                let b_col = if j < b_end { Some(b_cols[j]) } else { None };
                let delta = match (a_col, b_col) {
                    (Some(ac), Some(bc)) if ac == bc => {
                        let d = (a_vals[i] - b_vals[j]).norm();
                        i += 1;
                        j += 1;
                        d
                    }
                    (Some(ac), Some(bc)) if ac < bc => {
                        let d = a_vals[i].norm();
                        i += 1;
                        d
                    }
                    (Some(_), Some(_)) => {
                        let d = b_vals[j].norm();
                        j += 1;
                        d
                    }
                    (Some(_), None) => {
                        let d = a_vals[i].norm();
                        i += 1;
                        d
                    }
                    (None, Some(_)) => {
                        let d = b_vals[j].norm();
                        j += 1;
                        d
                    }
                    (None, None) => unreachable!("loop condition guarantees one side remains"),
                };
                if delta > tolerance {
                    return false;
                }
            }
        }
        true
    }
}

impl fmt::Display for Csr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Csr[{}, nnz={}]", self.shape, self.nnz())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn re(x: f64) -> Complex<f64> {
        Complex::new(x, 0.0)
    }

    #[test]
    fn offsets_of_wrong_length_fail_construction() {
        // 2 rows require 3 offsets.
        let result = Csr::from_parts(
            vec![re(1.0), re(1.0)],
            vec![0, 1],
            vec![0, 2],
            Shape::new(2, 2),
        );
        assert!(matches!(result, Err(DataError::InvalidBuffer { .. })));
    }

    #[test]
    fn identity_round_trips_through_dense() {
        let eye = Csr::identity(3);
        let back = Csr::from_dense(&eye.to_dense());
        assert!(eye.approx_eq(&back, 1e-12));
    }

    #[test]
    fn add_merges_disjoint_patterns() -> Result<(), DataError> {
        let upper = Csr::from_parts(vec![re(2.0)], vec![1], vec![0, 1, 1], Shape::new(2, 2))?;
        let lower = Csr::from_parts(vec![re(3.0)], vec![0], vec![0, 0, 1], Shape::new(2, 2))?;
        let sum = upper.add(&lower)?;
        assert_eq!(sum.nnz(), 2);
        assert_eq!(sum.get(0, 1), Some(re(2.0)));
        assert_eq!(sum.get(1, 0), Some(re(3.0)));
        Ok(())
    }

    #[test]
    fn matmul_against_identity_is_neutral() -> Result<(), DataError> {
        let a = Csr::from_parts(
            vec![re(1.0), re(2.0), re(3.0)],
            vec![0, 1, 0],
            vec![0, 2, 3],
            Shape::new(2, 2),
        )?;
        let product = a.matmul(&Csr::identity(2))?;
        assert!(product.approx_eq(&a, 1e-12));
        Ok(())
    }

    #[test]
    fn transpose_moves_entries_and_stays_canonical() -> Result<(), DataError> {
        let a = Csr::from_parts(
            vec![re(1.0), re(2.0)],
            vec![1, 0],
            vec![0, 1, 2],
            Shape::new(2, 3),
        )?;
        let t = a.transpose();
        assert_eq!(t.shape(), Shape::new(3, 2));
        assert_eq!(t.get(1, 0), Some(re(1.0)));
        assert_eq!(t.get(0, 1), Some(re(2.0)));
        // Canonical layout survives transposition.
        let offs = t.row_offsets();
        assert_eq!(&offs[..], &[0, 1, 2, 2]);
        Ok(())
    }

    #[test]
    fn trace_sums_stored_diagonal() -> Result<(), DataError> {
        let a = Csr::from_parts(
            vec![re(1.0), re(5.0), re(2.0)],
            vec![0, 1, 1],
            vec![0, 2, 3],
            Shape::new(2, 2),
        )?;
        assert_eq!(a.trace()?, re(3.0));
        Ok(())
    }

    #[test]
    fn approx_eq_ignores_explicit_zeros() -> Result<(), DataError> {
        let with_zero = Csr::from_parts(
            vec![re(1.0), re(0.0)],
            vec![0, 1],
            vec![0, 2, 2],
            Shape::new(2, 2),
        )?;
        let without = Csr::from_parts(vec![re(1.0)], vec![0], vec![0, 1, 1], Shape::new(2, 2))?;
        assert!(with_zero.approx_eq(&without, 1e-12));
        Ok(())
    }
}
