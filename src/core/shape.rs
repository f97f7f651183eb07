// src/core/shape.rs

use std::fmt;

/// Matrix shape metadata: a row count and a column count.
/// Immutable after construction; every representation variant pairs one
/// `Shape` with its storage, and the element count addressable through the
/// shape must match the storage layout of the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl Shape {
    /// Creates a new shape.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Total number of addressable elements (`rows * cols`).
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// True when the shape addresses no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for square shapes. Trace and matrix exponential require this.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}
