//! Numerical tolerances shared across representations.

/// Default tolerances used by data-layer comparisons and conversions
pub mod qdx_tolerances {
    /// Element-wise tolerance for approximate equality between matrices.
    pub const DEFAULT_EQ_TOLERANCE: f64 = 1e-12;
    /// Magnitude below which an element is treated as structurally zero
    /// when compressing dense data into a sparse layout.
    pub const DEFAULT_SPARSE_TOLERANCE: f64 = 1e-14;
}
