// src/validation/mod.rs

//! Layout and consistency checks shared by constructors and kernels.
//!
//! Every check returns `Ok(())` (or the derived output shape) on success and
//! a [`DataError`] describing the violation otherwise. Constructors run these
//! before adopting storage, so a successfully built representation always
//! satisfies its layout invariants.

use crate::core::{DataError, Shape};

/// Checks that two operand shapes are identical, for element-wise operations.
pub fn check_same_shape(a: Shape, b: Shape, operation: &str) -> Result<(), DataError> {
    if a != b {
        return Err(DataError::ShapeMismatch {
            message: format!("{}: operand shapes {} and {} differ", operation, a, b),
        });
    }
    Ok(())
}

/// Checks that `a * b` is well-formed and returns the product shape.
pub fn check_matmul_shapes(a: Shape, b: Shape, operation: &str) -> Result<Shape, DataError> {
    if a.cols != b.rows {
        return Err(DataError::ShapeMismatch {
            message: format!(
                "{}: inner dimensions disagree ({} vs {})",
                operation, a, b
            ),
        });
    }
    Ok(Shape::new(a.rows, b.cols))
}

/// Checks that a shape is square. Trace and matrix exponential require this.
pub fn check_square(shape: Shape, operation: &str) -> Result<(), DataError> {
    if !shape.is_square() {
        return Err(DataError::ShapeMismatch {
            message: format!("{}: requires a square matrix, got {}", operation, shape),
        });
    }
    Ok(())
}

/// Checks the full compressed-sparse-row layout contract:
/// - offsets length is `rows + 1`, starting at 0 and ending at the stored
///   element count,
/// - offsets are monotonically non-decreasing,
/// - values and column indices are parallel arrays,
/// - every column index is in bounds and strictly increasing within its row.
pub fn check_csr_layout(
    values_len: usize,
    col_indices: &[usize],
    row_offsets: &[usize],
    shape: Shape,
) -> Result<(), DataError> {
    if row_offsets.len() != shape.rows + 1 {
        return Err(DataError::InvalidBuffer {
            message: format!(
                "csr offset array holds {} entries, expected rows + 1 = {}",
                row_offsets.len(),
                shape.rows + 1
            ),
        });
    }
    if row_offsets[0] != 0 {
        return Err(DataError::InvalidBuffer {
            message: format!("csr offset array must start at 0, found {}", row_offsets[0]),
        });
    }
    if values_len != col_indices.len() {
        return Err(DataError::InvalidBuffer {
            message: format!(
                "csr values ({}) and column indices ({}) are not parallel",
                values_len,
                col_indices.len()
            ),
        });
    }
    let nnz = row_offsets[shape.rows];
    if nnz != values_len {
        return Err(DataError::InvalidBuffer {
            message: format!(
                "csr offset array ends at {} but {} element(s) are stored",
                nnz, values_len
            ),
        });
    }
    for row in 0..shape.rows {
        let (start, end) = (row_offsets[row], row_offsets[row + 1]);
        if start > end {
            return Err(DataError::InvalidBuffer {
                message: format!("csr offsets decrease at row {} ({} > {})", row, start, end),
            });
        }
        if end > values_len {
            return Err(DataError::InvalidBuffer {
                message: format!(
                    "csr offset {} at row {} exceeds stored element count {}",
                    end, row, values_len
                ),
            });
        }
        let mut previous: Option<usize> = None;
        for &col in &col_indices[start..end] {
            if col >= shape.cols {
                return Err(DataError::InvalidBuffer {
                    message: format!(
                        "csr column index {} out of bounds for {} column(s) in row {}",
                        col, shape.cols, row
                    ),
                });
            }
            if let Some(prev) = previous {
                if col <= prev {
                    return Err(DataError::InvalidBuffer {
                        message: format!(
                            "csr column indices must strictly increase within row {} ({} after {})",
                            row, col, prev
                        ),
                    });
                }
            }
            previous = Some(col);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csr_layout_accepts_canonical_identity() {
        // 2x2 identity in CSR form.
        let result = check_csr_layout(2, &[0, 1], &[0, 1, 2], Shape::new(2, 2));
        assert!(result.is_ok());
    }

    #[test]
    fn csr_layout_rejects_short_offsets() {
        let result = check_csr_layout(2, &[0, 1], &[0, 2], Shape::new(2, 2));
        assert!(matches!(result, Err(DataError::InvalidBuffer { .. })));
    }

    #[test]
    fn csr_layout_rejects_unsorted_columns() {
        let result = check_csr_layout(2, &[1, 0], &[0, 2, 2], Shape::new(2, 2));
        assert!(matches!(result, Err(DataError::InvalidBuffer { .. })));
    }

    #[test]
    fn csr_layout_rejects_column_out_of_bounds() {
        let result = check_csr_layout(1, &[5], &[0, 1], Shape::new(1, 3));
        assert!(matches!(result, Err(DataError::InvalidBuffer { .. })));
    }

    #[test]
    fn matmul_shape_check_reports_inner_mismatch() {
        let result = check_matmul_shapes(Shape::new(2, 3), Shape::new(2, 2), "matmul");
        assert!(matches!(result, Err(DataError::ShapeMismatch { .. })));
    }
}
