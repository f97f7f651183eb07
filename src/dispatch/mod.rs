// src/dispatch/mod.rs

//! Operation dispatch over concrete representation variants.
//!
//! The registry maps `(operation name, ordered operand-kind tuple)` to an
//! implementation. `invoke` looks the exact key up and calls the hit
//! directly; on a miss it emits one efficiency diagnostic, reduces every
//! operand to the reference variant through the mandatory interface, runs
//! the reference implementation, and casts a matrix-valued result back to
//! the caller's requested output kind. An operation therefore **always
//! succeeds**, possibly slowly, for operands satisfying the mandatory
//! interface, as long as its reference implementation exists; a missing
//! reference implementation is a programming error
//! ([`DataError::NoDefaultImplementation`]).
//!
//! The registry is process-wide state populated from the built-in tables on
//! first use. Additional registrations follow the init-then-freeze
//! discipline: complete them at startup, before operations flow. Duplicate
//! registration for one key is last-write-wins; that is documented behavior,
//! not an accident of ordering.

pub(crate) mod registry;

use std::sync::atomic::{AtomicU64, Ordering};

use num_complex::Complex;
use tracing::debug;

use crate::config::{self, OutputPolicy};
use crate::convert;
use crate::core::{Data, DataError, DataKind};

/// Operation names carrying built-in reference implementations.
pub mod op {
    /// Element-wise addition.
    pub const ADD: &str = "add";
    /// Element-wise subtraction.
    pub const SUB: &str = "sub";
    /// Matrix product.
    pub const MATMUL: &str = "matmul";
    /// Kronecker (tensor) product.
    pub const KRON: &str = "kron";
    /// Scalar multiplication; takes one scalar parameter.
    pub const SCALE: &str = "scale";
    /// Additive inverse.
    pub const NEG: &str = "neg";
    /// Sum of diagonal elements; scalar-valued.
    pub const TRACE: &str = "trace";
    /// Matrix transpose.
    pub const TRANSPOSE: &str = "transpose";
    /// Element-wise complex conjugate.
    pub const CONJ: &str = "conj";
    /// Conjugate transpose.
    pub const ADJOINT: &str = "adjoint";
    /// Matrix exponential.
    pub const EXPM: &str = "expm";
    /// Approximate equality; flag-valued, takes an optional tolerance
    /// parameter (real part, defaulting to the crate tolerance).
    pub const EQ: &str = "eq";
}

/// Result of a dispatched operation: matrix-valued, scalar-valued (trace),
/// or flag-valued (equality).
#[derive(Debug)]
pub enum OpValue {
    /// A matrix result, in whatever variant the implementation produced.
    Data(Data),
    /// A scalar result.
    Scalar(Complex<f64>),
    /// A boolean result.
    Flag(bool),
}

impl OpValue {
    /// Unwraps a matrix result. A non-matrix value here means an
    /// implementation was registered under the wrong operation, which is an
    /// internal bug and reported as such.
    pub fn into_data(self, operation: &str) -> Result<Data, DataError> {
        match self {
            OpValue::Data(data) => Ok(data),
            other => Err(internal_value_mismatch(operation, "matrix", &other)),
        }
    }

    /// Unwraps a scalar result.
    pub fn into_scalar(self, operation: &str) -> Result<Complex<f64>, DataError> {
        match self {
            OpValue::Scalar(value) => Ok(value),
            other => Err(internal_value_mismatch(operation, "scalar", &other)),
        }
    }

    /// Unwraps a flag result.
    pub fn into_flag(self, operation: &str) -> Result<bool, DataError> {
        match self {
            OpValue::Flag(value) => Ok(value),
            other => Err(internal_value_mismatch(operation, "flag", &other)),
        }
    }
}

/// Signature shared by every registered operation implementation.
pub type OpImpl = fn(&[&Data], &[Complex<f64>]) -> Result<OpValue, DataError>;

static FALLBACKS: AtomicU64 = AtomicU64::new(0);

/// Number of efficiency diagnostics emitted by the fallback path since
/// process start. Diagnostics are informational; this counter lets callers
/// and tests observe them without installing a tracing subscriber.
pub fn fallback_count() -> u64 {
    FALLBACKS.load(Ordering::Relaxed)
}

/// Registers `implementation` for `(operation, kinds)`. Last write wins on
/// duplicate keys.
pub fn register(operation: &str, kinds: &[DataKind], implementation: OpImpl) {
    registry::insert(operation, kinds, implementation);
}

/// Dispatches `operation` over `operands`.
///
/// `params` carries scalar parameters (e.g. the factor for
/// [`op::SCALE`]). `output` optionally requests the variant of a
/// matrix-valued result; when `None` the process-wide output policy applies,
/// defaulting to the first operand's own variant.
pub fn invoke(
    operation: &str,
    operands: &[&Data],
    params: &[Complex<f64>],
    output: Option<DataKind>,
) -> Result<OpValue, DataError> {
    let kinds: Vec<DataKind> = operands.iter().map(|data| data.kind()).collect();
    let origin = kinds.first().copied();

    if let Some(implementation) = registry::lookup(operation, &kinds) {
        let value = implementation(operands, params)?;
        return deliver(value, output, origin);
    }

    // No accelerated implementation: reduce to the reference variant.
    note_fallback(operation, &kinds);
    let reference_kinds = vec![DataKind::Dense; operands.len()];
    let implementation = registry::lookup(operation, &reference_kinds).ok_or_else(|| {
        DataError::NoDefaultImplementation {
            operation: operation.to_string(),
        }
    })?;
    let reference_operands: Vec<Data> = operands
        .iter()
        .map(|data| data.to_reference().map(Data::Dense))
        .collect::<Result<_, _>>()?;
    let reference_refs: Vec<&Data> = reference_operands.iter().collect();
    let value = implementation(&reference_refs, params)?;
    deliver(value, output, origin)
}

/// Casts a matrix-valued result to the kind the caller asked for (or the
/// one the output policy selects). Scalar and flag results pass through.
fn deliver(
    value: OpValue,
    requested: Option<DataKind>,
    origin: Option<DataKind>,
) -> Result<OpValue, DataError> {
    let OpValue::Data(data) = value else {
        return Ok(value);
    };
    let target = requested.or_else(|| match config::current().default_output {
        OutputPolicy::Operand => origin,
        OutputPolicy::Fixed(kind) => Some(kind),
    });
    match target {
        Some(kind) if data.kind() != kind => Ok(OpValue::Data(convert::cast(&data, kind)?)),
        _ => Ok(OpValue::Data(data)),
    }
}

fn note_fallback(operation: &str, kinds: &[DataKind]) {
    if !config::current().fallback_diagnostics {
        return;
    }
    FALLBACKS.fetch_add(1, Ordering::Relaxed);
    let signature = kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    debug!(
        operation,
        operands = %signature,
        "no accelerated implementation registered; falling back via the reference variant"
    );
}

fn internal_value_mismatch(operation: &str, expected: &str, actual: &OpValue) -> DataError {
    let actual = match actual {
        OpValue::Data(_) => "matrix",
        OpValue::Scalar(_) => "scalar",
        OpValue::Flag(_) => "flag",
    };
    DataError::ConversionInvariant {
        message: format!(
            "operation '{}' produced a {} value where a {} was expected",
            operation, actual, expected
        ),
    }
}
