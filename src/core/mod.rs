// src/core/mod.rs

//! Core data structures and types

// Declare modules within core
pub mod buffer;
pub mod csr;
pub mod dense;
pub mod error;
pub mod repr;
pub mod shape;

// Re-export public types for convenient access via `qdx::core::TypeName`
pub use buffer::{Buffer, BufferRead, ExportedView, ViewReadGuard, ViewWriteGuard};
pub use csr::Csr;
pub use dense::Dense;
pub use error::{DataError, DataKind};
pub use repr::{Data, ExtensionData};
pub use shape::Shape;

pub mod constants;
pub use constants::qdx_tolerances::{DEFAULT_EQ_TOLERANCE, DEFAULT_SPARSE_TOLERANCE}; // Re-export
