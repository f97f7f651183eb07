//! Error handling logic

use std::fmt;

/// Identifies a concrete data representation variant.
/// The `Dense` and `Csr` kinds are built in; `Extension` names a
/// representation registered from outside the crate. `DataKind` tuples
/// form the lookup key of the dispatch registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataKind {
    /// Row-major dense matrix storage. This is the reference variant:
    /// every operation has a complete implementation for it.
    Dense,
    /// Compressed-sparse-row matrix storage.
    Csr,
    /// An externally registered representation, identified by name.
    Extension(&'static str),
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Dense => write!(f, "dense"),
            DataKind::Csr => write!(f, "csr"),
            DataKind::Extension(name) => write!(f, "{}", name),
        }
    }
}

/// Error types for data-layer failures.
/// All errors are local and synchronous: an operation either produces a
/// correct result (possibly via the fallback path) or fails immediately.
#[derive(Debug, Clone, PartialEq, Eq)] // Eq useful for testing error variants
pub enum DataError {
    /// Storage handed to a constructor is inconsistent with the declared
    /// shape or layout (e.g. empty storage against a non-zero shape, or a
    /// CSR offset array of the wrong length).
    InvalidBuffer {
        /// InvalidBuffer failure message
        message: String,
    },

    /// An operand's representation cannot satisfy the requested operation,
    /// e.g. a same-type kernel was handed a value of a different concrete type.
    UnsupportedType {
        /// Kind of the offending operand
        kind: DataKind,
        /// UnsupportedType failure message
        message: String,
    },

    /// The operation has no reference implementation registered, so even the
    /// fallback path cannot run. This is a programming error, not a data error.
    NoDefaultImplementation {
        /// Name of the operation missing its reference implementation
        operation: String,
    },

    /// A conversion produced a value whose shape differs from its input.
    /// Internal-consistency failure; never tolerated.
    ConversionInvariant {
        /// ConversionInvariant failure message
        message: String,
    },

    /// Operand shapes are incompatible for the requested operation.
    ShapeMismatch {
        /// ShapeMismatch failure message
        message: String,
    },

    /// A writable view was requested or used while the process settings
    /// forbid in-place mutation through exported views.
    ViewAccess {
        /// ViewAccess failure message
        message: String,
    },

    /// The operation requires a scalar parameter that was not supplied.
    MissingParameter {
        /// Name of the operation missing its parameter
        operation: String,
    },
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::InvalidBuffer { message } => write!(f, "Invalid Buffer: {}", message),
            DataError::UnsupportedType { kind, message } => {
                write!(f, "Unsupported Type ({}): {}", kind, message)
            }
            DataError::NoDefaultImplementation { operation } => {
                write!(f, "No Default Implementation: operation '{}' has no reference-variant implementation", operation)
            }
            DataError::ConversionInvariant { message } => {
                write!(f, "Conversion Invariant Violation: {}", message)
            }
            DataError::ShapeMismatch { message } => write!(f, "Shape Mismatch: {}", message),
            DataError::ViewAccess { message } => write!(f, "View Access Violation: {}", message),
            DataError::MissingParameter { operation } => {
                write!(f, "Missing Parameter: operation '{}' requires a scalar parameter", operation)
            }
        }
    }
}

// Implement the standard Error trait to allow for easy integration with Rust error handling.
impl std::error::Error for DataError {}
