// src/core/dense.rs

use num_complex::Complex;
use num_traits::{One, Zero};
use std::fmt;

use super::buffer::{Buffer, BufferRead, ExportedView};
use super::constants::qdx_tolerances::DEFAULT_EQ_TOLERANCE;
use super::error::DataError;
use super::shape::Shape;
use crate::validation::{check_matmul_shapes, check_same_shape, check_square};

/// Maximum number of Taylor terms accumulated by `expm` before squaring.
/// With the operand scaled to 1-norm <= 0.5 the series converges to machine
/// precision well inside this bound.
const EXPM_MAX_TERMS: usize = 32;
const EXPM_TERM_TOLERANCE: f64 = 1e-16;

/// Row-major dense matrix: one contiguous buffer of `rows * cols` complex
/// elements plus a shape.
///
/// `Dense` is the **reference variant** of the data layer: every operation
/// the crate defines has a complete implementation here, and the dispatcher's
/// fallback path reduces all other variants to this one. Correctness of the
/// whole system therefore rests on these kernels staying complete and
/// correct, even where they are not the fastest choice.
#[derive(Debug)]
pub struct Dense {
    shape: Shape,
    values: Buffer<Complex<f64>>,
}

impl Dense {
    /// Builds a dense matrix by adopting `values` (row-major) directly.
    /// Fails with [`DataError::InvalidBuffer`] when the element count does
    /// not match the shape.
    pub fn from_vec(values: Vec<Complex<f64>>, shape: Shape) -> Result<Self, DataError> {
        let values = Buffer::adopted(values, shape.len())?;
        Ok(Self { shape, values })
    }

    /// Builds a dense matrix by copying `values` (row-major).
    pub fn from_slice(values: &[Complex<f64>], shape: Shape) -> Result<Self, DataError> {
        let values = Buffer::copied(values, shape.len())?;
        Ok(Self { shape, values })
    }

    /// Builds a dense matrix from nested row vectors. All rows must have the
    /// same length.
    pub fn from_nested(rows: &[Vec<Complex<f64>>]) -> Result<Self, DataError> {
        let row_count = rows.len();
        let col_count = rows.first().map(Vec::len).unwrap_or(0);
        let mut values = Vec::with_capacity(row_count * col_count);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != col_count {
                return Err(DataError::InvalidBuffer {
                    message: format!(
                        "row {} holds {} element(s), expected {}",
                        i,
                        row.len(),
                        col_count
                    ),
                });
            }
            values.extend_from_slice(row);
        }
        Self::from_vec(values, Shape::new(row_count, col_count))
    }

    /// Wraps storage produced inside the crate, whose length is already
    /// consistent with `shape`.
    pub(crate) fn from_owned(values: Vec<Complex<f64>>, shape: Shape) -> Self {
        Self {
            shape,
            values: Buffer::owned(values),
        }
    }

    /// All-zero matrix of the given shape.
    pub fn zeros(shape: Shape) -> Self {
        Self {
            shape,
            values: Buffer::owned(vec![Complex::zero(); shape.len()]),
        }
    }

    /// Identity matrix of dimension `n`.
    pub fn identity(n: usize) -> Self {
        let mut values = vec![Complex::zero(); n * n];
        for i in 0..n {
            values[i * n + i] = Complex::one();
        }
        Self {
            shape: Shape::new(n, n),
            values: Buffer::owned(values),
        }
    }

    /// Shape of this matrix.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Element at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<Complex<f64>> {
        if row >= self.shape.rows || col >= self.shape.cols {
            return None;
        }
        Some(self.values.read()[row * self.shape.cols + col])
    }

    /// Read access to the row-major element storage.
    pub fn values(&self) -> BufferRead<'_, Complex<f64>> {
        self.values.read()
    }

    /// Copies the row-major element storage out into a plain vector.
    pub fn to_vec(&self) -> Vec<Complex<f64>> {
        self.values.to_vec()
    }

    /// Exports an external window onto the element storage.
    /// See [`Buffer::export_view`] for the ownership hand-off rules.
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
        }
    }

    /// Scalar multiplication.
    pub fn scale(&self, factor: Complex<f64>) -> Self {
        let values: Vec<Complex<f64>> = self.values.read().iter().map(|v| v * factor).collect();
        Self {
            shape: self.shape,
            values: Buffer::owned(values),
        }
    }

    /// Additive inverse.
    pub fn neg(&self) -> Self {
        self.scale(Complex::new(-1.0, 0.0))
    }

    /// Element-wise addition. Shapes must match.
    pub fn add(&self, other: &Dense) -> Result<Self, DataError> {
        check_same_shape(self.shape, other.shape, "add")?;
        let a = self.values.read();
        let b = other.values.read();
        let values: Vec<Complex<f64>> = a.iter().zip(b.iter()).map(|(x, y)| x + y).collect();
        Self::from_vec(values, self.shape)
    }

    /// Element-wise subtraction. Shapes must match.
    pub fn sub(&self, other: &Dense) -> Result<Self, DataError> {
        check_same_shape(self.shape, other.shape, "sub")?;
        let a = self.values.read();
        let b = other.values.read();
        let values: Vec<Complex<f64>> = a.iter().zip(b.iter()).map(|(x, y)| x - y).collect();
        Self::from_vec(values, self.shape)
    }

    /// Matrix product `self * other`. Inner dimensions must agree.
    pub fn matmul(&self, other: &Dense) -> Result<Self, DataError> {
        let out_shape = check_matmul_shapes(self.shape, other.shape, "matmul")?;
        let m = self.shape.rows;
        let k = self.shape.cols;
        let n = other.shape.cols;
        let a = self.values.read();
        let b = other.values.read();
        let mut values = vec![Complex::zero(); m * n];
        for i in 0..m {
            for p in 0..k {
                let a_ip = a[i * k + p];
                if a_ip.is_zero() {
                    continue;
                }
                for j in 0..n {
                    values[i * n + j] += a_ip * b[p * n + j];
                }
            }
        }
        Self::from_vec(values, out_shape)
    }

    /// Kronecker (tensor) product. Composite quantum systems are built this
    /// way from their parts.
    pub fn kron(&self, other: &Dense) -> Self {
        let (ar, ac) = (self.shape.rows, self.shape.cols);
        let (br, bc) = (other.shape.rows, other.shape.cols);
        let out_shape = Shape::new(ar * br, ac * bc);
        let a = self.values.read();
        let b = other.values.read();
        let mut values = vec![Complex::zero(); out_shape.len()];
        for i in 0..ar {
            for j in 0..ac {
                let a_ij = a[i * ac + j];
                if a_ij.is_zero() {
                    continue;
                }
                for p in 0..br {
                    for q in 0..bc {
                        values[(i * br + p) * out_shape.cols + (j * bc + q)] = a_ij * b[p * bc + q];
                    }
                }
            }
        }
        Self {
            shape: out_shape,
            values: Buffer::owned(values),
        }
    }

    /// Sum of diagonal elements. Requires a square shape.
    pub fn trace(&self) -> Result<Complex<f64>, DataError> {
        check_square(self.shape, "trace")?;
        let n = self.shape.rows;
        let values = self.values.read();
        let mut sum = Complex::zero();
        for i in 0..n {
            sum += values[i * n + i];
        }
        Ok(sum)
    }

    /// Matrix transpose.
    pub fn transpose(&self) -> Self {
        let (r, c) = (self.shape.rows, self.shape.cols);
        let values = self.values.read();
        let mut out = vec![Complex::zero(); r * c];
        for i in 0..r {
            for j in 0..c {
                out[j * r + i] = values[i * c + j];
            }
        }
        Self {
            shape: Shape::new(c, r),
            values: Buffer::owned(out),
        }
    }

    /// Element-wise complex conjugate.
    pub fn conj(&self) -> Self {
        let values: Vec<Complex<f64>> = self.values.read().iter().map(|v| v.conj()).collect();
        Self {
            shape: self.shape,
            values: Buffer::owned(values),
        }
    }

    /// Conjugate transpose (Hermitian adjoint).
    pub fn adjoint(&self) -> Self {
        self.conj().transpose()
    }

    /// Matrix exponential via scaling-and-squaring around a truncated Taylor
    /// series. The operand is scaled so its 1-norm drops below 0.5, the
    /// series is summed until terms fall under machine precision, and the
    /// result is squared back up.
    pub fn expm(&self) -> Result<Self, DataError> {
        check_square(self.shape, "expm")?;
        let n = self.shape.rows;
        if n == 0 {
            return Ok(self.deep_copy());
        }

        let norm = self.one_norm();
        let squarings = if norm > 0.5 {
            (norm / 0.5).log2().ceil() as i32
        } else {
            0
        };
        let scaled = self.scale(Complex::new(0.5_f64.powi(squarings), 0.0));

        let mut result = Dense::identity(n);
        let mut term = Dense::identity(n);
        for k in 1..=EXPM_MAX_TERMS {
            term = term
                .matmul(&scaled)?
                .scale(Complex::new(1.0 / k as f64, 0.0));
            result = result.add(&term)?;
            if term.one_norm() < EXPM_TERM_TOLERANCE {
                break;
            }
        }

        for _ in 0..squarings {
            result = result.matmul(&result)?;
        }
        Ok(result)
    }

    /// Element-wise approximate equality within `tolerance`. Shapes must
    /// match exactly; differing shapes are unequal, never an error.
    pub fn approx_eq(&self, other: &Dense, tolerance: f64) -> bool {
        if self.shape != other.shape {
            return false;
        }
        let a = self.values.read();
        let b = other.values.read();
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).norm() <= tolerance)
    }

    /// Maximum absolute column sum. Used by `expm` to pick a scaling factor.
    pub(crate) fn one_norm(&self) -> f64 {
        let (r, c) = (self.shape.rows, self.shape.cols);
        let values = self.values.read();
        let mut max_sum = 0.0_f64;
        for j in 0..c {
            let mut col_sum = 0.0;
            for i in 0..r {
                col_sum += values[i * c + j].norm();
            }
            if col_sum > max_sum {
                max_sum = col_sum;
            }
        }
        max_sum
    }
}

impl PartialEq for Dense {
    fn eq(&self, other: &Self) -> bool {
        self.approx_eq(other, DEFAULT_EQ_TOLERANCE)
    }
}

impl fmt::Display for Dense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dense[{}]", self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn re(x: f64) -> Complex<f64> {
        Complex::new(x, 0.0)
    }

    #[test]
    fn from_vec_rejects_element_count_mismatch() {
        let result = Dense::from_vec(vec![re(1.0); 3], Shape::new(2, 2));
        assert!(matches!(result, Err(DataError::InvalidBuffer { .. })));
    }

    #[test]
    fn matmul_identity_is_neutral() -> Result<(), DataError> {
        let a = Dense::from_nested(&[
            vec![re(1.0), re(2.0)],
            vec![re(3.0), re(4.0)],
        ])?;
        let product = a.matmul(&Dense::identity(2))?;
        assert!(product.approx_eq(&a, 1e-12));
        Ok(())
    }

    #[test]
    fn trace_requires_square() {
        let rect = Dense::zeros(Shape::new(2, 3));
        assert!(matches!(rect.trace(), Err(DataError::ShapeMismatch { .. })));
    }

    #[test]
    fn adjoint_conjugates_and_transposes() -> Result<(), DataError> {
        let a = Dense::from_nested(&[
            vec![Complex::new(1.0, 1.0), Complex::new(0.0, 2.0)],
            vec![Complex::new(3.0, 0.0), Complex::new(0.0, -4.0)],
        ])?;
        let dag = a.adjoint();
        assert_eq!(dag.get(0, 1), Some(Complex::new(3.0, 0.0)));
        assert_eq!(dag.get(1, 0), Some(Complex::new(0.0, -2.0)));
        Ok(())
    }

    #[test]
    fn expm_of_zero_is_identity() -> Result<(), DataError> {
        let zero = Dense::zeros(Shape::new(3, 3));
        let exp = zero.expm()?;
        assert!(exp.approx_eq(&Dense::identity(3), 1e-12));
        Ok(())
    }

    #[test]
    fn expm_of_nilpotent_matches_closed_form() -> Result<(), DataError> {
        // exp([[0, 1], [0, 0]]) = [[1, 1], [0, 1]]
        let a = Dense::from_nested(&[
            vec![re(0.0), re(1.0)],
            vec![re(0.0), re(0.0)],
        ])?;
        let expected = Dense::from_nested(&[
            vec![re(1.0), re(1.0)],
            vec![re(0.0), re(1.0)],
        ])?;
        assert!(a.expm()?.approx_eq(&expected, 1e-10));
        Ok(())
    }

    #[test]
    fn expm_of_diagonal_exponentiates_entries() -> Result<(), DataError> {
        let a = Dense::from_nested(&[
            vec![re(1.0), re(0.0)],
            vec![re(0.0), re(2.0)],
        ])?;
        let exp = a.expm()?;
        assert!((exp.get(0, 0).unwrap().re - 1.0_f64.exp()).abs() < 1e-10);
        assert!((exp.get(1, 1).unwrap().re - 2.0_f64.exp()).abs() < 1e-10);
        assert!(exp.get(0, 1).unwrap().norm() < 1e-12);
        Ok(())
    }

    #[test]
    fn kron_of_identities_is_identity() {
        let k = Dense::identity(2).kron(&Dense::identity(3));
        assert!(k.approx_eq(&Dense::identity(6), 1e-12));
    }
}
