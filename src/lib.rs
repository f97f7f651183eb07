// src/lib.rs

//! `qdx` - A polymorphic numerical data layer for quantum simulation
//!
//! This library provides the storage, dispatch, and conversion machinery a
//! quantum-mechanics simulation stack builds on: concrete matrix
//! representations over owned contiguous buffers, a process-wide operation
//! registry keyed by representation kind, a cast layer between
//! representations, and a variant-agnostic facade object.

pub mod config;
pub mod convert;
pub mod core;
pub mod dispatch;
pub mod qobj;
pub mod validation;

// Re-export the most common types for easier top-level use
pub use core::{Buffer, Csr, Data, DataError, DataKind, Dense, ExportedView, ExtensionData, Shape};
pub use config::{OutputPolicy, Settings};
pub use convert::cast;
pub use dispatch::{OpImpl, OpValue, fallback_count, invoke, op, register};
pub use qobj::Qobj;

// Example 1: Variant-agnostic arithmetic through the facade
// Demonstrates building a dense object, casting it to the sparse
// representation, and running the same dispatched operations over both.
/// ```
/// use num_complex::Complex;
/// use qdx::{DataError, DataKind, Qobj};
///
/// fn re(x: f64) -> Complex<f64> { Complex::new(x, 0.0) }
///
/// # fn main() -> Result<(), DataError> {
/// // A 2x2 Pauli-X matrix, dense-backed.
/// let x = Qobj::from_nested(&[
///     vec![re(0.0), re(1.0)],
///     vec![re(1.0), re(0.0)],
/// ])?;
///
/// // Cast to the compressed-sparse-row representation.
/// let x_sparse = x.cast_to(DataKind::Csr)?;
/// assert_eq!(x_sparse.kind(), DataKind::Csr);
///
/// // X * X = I, whichever representation carries the data. The facade
/// // forwards to the dispatcher; it never branches on the concrete kind.
/// let dense_square = x.matmul(&x)?;
/// let sparse_square = x_sparse.matmul(&x_sparse)?;
/// assert_eq!(dense_square.trace()?, re(2.0));
/// assert_eq!(sparse_square.trace()?, re(2.0));
/// assert!(dense_square.approx_eq(&sparse_square.cast_to(DataKind::Dense)?, 1e-12)?);
/// # Ok(())
/// # }
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item

// Example 2: The fallback guarantee
// Demonstrates that an operation with no accelerated implementation for an
// operand pairing still succeeds by reducing through the reference variant.
/// ```
/// use num_complex::Complex;
/// use qdx::{DataError, DataKind, Qobj};
///
/// fn re(x: f64) -> Complex<f64> { Complex::new(x, 0.0) }
///
/// # fn main() -> Result<(), DataError> {
/// let dense = Qobj::from_nested(&[
///     vec![re(1.0), re(0.0)],
///     vec![re(0.0), re(1.0)],
/// ])?;
/// let sparse = dense.cast_to(DataKind::Csr)?;
///
/// // No dense-by-csr matmul is registered; dispatch falls back through the
/// // reference variant and still produces the correct product.
/// let product = dense.matmul(&sparse)?;
/// assert_eq!(product.trace()?, re(2.0));
/// # Ok(())
/// # }
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item
