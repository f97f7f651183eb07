// src/convert/mod.rs

//! Bidirectional conversion between concrete representations.
//!
//! A cast first looks for a direct conversion registered for the exact
//! (from, to) pair; when none exists it goes two-hop through the reference
//! variant: convert-to-reference on the source, then the target's
//! registered import from the reference. Casting a value to its own kind is
//! idempotent and returns a deep copy, matching the deep-copy contract.
//!
//! Shape is preserved exactly. A conversion that changes shape (or produces
//! the wrong kind) is an internal-consistency failure and surfaces as
//! [`DataError::ConversionInvariant`]; it is never silently tolerated.

use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use crate::core::{Csr, Data, DataError, DataKind, Dense};

/// A direct, accelerated conversion for one exact (from, to) pair.
pub type DirectCastFn = fn(&Data) -> Result<Data, DataError>;

/// Conversion from the reference variant into one target kind; the
/// second hop of the fallback path.
pub type ImportFn = fn(&Dense) -> Result<Data, DataError>;

struct CastTable {
    direct: HashMap<(DataKind, DataKind), DirectCastFn>,
    importers: HashMap<DataKind, ImportFn>,
}

impl CastTable {
    fn with_builtins() -> Self {
        let mut table = Self {
            direct: HashMap::new(),
            importers: HashMap::new(),
        };
        table
            .direct
            .insert((DataKind::Dense, DataKind::Csr), dense_to_csr);
        table
            .direct
            .insert((DataKind::Csr, DataKind::Dense), csr_to_dense);
        table.importers.insert(DataKind::Dense, import_dense);
        table.importers.insert(DataKind::Csr, import_csr);
        table
    }
}

static CASTS: LazyLock<RwLock<CastTable>> = LazyLock::new(|| RwLock::new(CastTable::with_builtins()));

/// Registers a direct conversion for an exact (from, to) pair.
/// Later registrations for the same pair overwrite earlier ones.
pub fn register_direct(from: DataKind, to: DataKind, implementation: DirectCastFn) {
    let mut table = CASTS.write().unwrap_or_else(|e| e.into_inner());
    table.direct.insert((from, to), implementation);
}

/// Registers the from-reference import for a target kind, enabling two-hop
/// casts into that kind. Later registrations overwrite earlier ones.
pub fn register_importer(kind: DataKind, implementation: ImportFn) {
    let mut table = CASTS.write().unwrap_or_else(|e| e.into_inner());
    table.importers.insert(kind, implementation);
}

/// Converts `value` to the `target` kind, preserving its mathematical value
/// and exact shape.
pub fn cast(value: &Data, target: DataKind) -> Result<Data, DataError> {
    let source = value.kind();
    if source == target {
        return Ok(value.deep_copy());
    }

    let direct = {
        let table = CASTS.read().unwrap_or_else(|e| e.into_inner());
        table.direct.get(&(source, target)).copied()
    };
    let result = match direct {
        Some(implementation) => implementation(value)?,
        None => {
            let reference = value.to_reference()?;
            if target == DataKind::Dense {
                Data::Dense(reference)
            } else {
                let importer = {
                    let table = CASTS.read().unwrap_or_else(|e| e.into_inner());
                    table.importers.get(&target).copied()
                }
                .ok_or_else(|| DataError::UnsupportedType {
                    kind: target,
                    message: "no conversion from the reference variant is registered for this kind"
                        .to_string(),
                })?;
                importer(&reference)?
            }
        }
    };

    if result.kind() != target {
        return Err(DataError::ConversionInvariant {
            message: format!(
                "cast {} -> {} produced a {} value",
                source,
                target,
                result.kind()
            ),
        });
    }
    if result.shape() != value.shape() {
        return Err(DataError::ConversionInvariant {
            message: format!(
                "cast {} -> {} changed shape {} -> {}",
                source,
                target,
                value.shape(),
                result.shape()
            ),
        });
    }
    Ok(result)
}

fn dense_to_csr(value: &Data) -> Result<Data, DataError> {
    let dense = value.as_dense().ok_or_else(|| DataError::UnsupportedType {
        kind: value.kind(),
        message: "dense-to-csr conversion received a non-dense value".to_string(),
    })?;
    Ok(Data::Csr(Csr::from_dense(dense)))
}

fn csr_to_dense(value: &Data) -> Result<Data, DataError> {
    let csr = value.as_csr().ok_or_else(|| DataError::UnsupportedType {
        kind: value.kind(),
        message: "csr-to-dense conversion received a non-csr value".to_string(),
    })?;
    Ok(Data::Dense(csr.to_dense()))
}

fn import_dense(reference: &Dense) -> Result<Data, DataError> {
    Ok(Data::Dense(reference.deep_copy()))
}

fn import_csr(reference: &Dense) -> Result<Data, DataError> {
    Ok(Data::Csr(Csr::from_dense(reference)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Shape;
    use num_complex::Complex;

    fn re(x: f64) -> Complex<f64> {
        Complex::new(x, 0.0)
    }

    #[test]
    fn cast_to_own_kind_is_a_deep_copy() -> Result<(), DataError> {
        let original = Data::Dense(Dense::identity(2));
        let copy = cast(&original, DataKind::Dense)?;
        assert_eq!(copy.kind(), DataKind::Dense);
        assert!(original.approx_eq_same(&copy, 1e-12)?);
        Ok(())
    }

    #[test]
    fn dense_csr_dense_round_trip_preserves_values() -> Result<(), DataError> {
        let dense = Data::Dense(Dense::from_nested(&[
            vec![re(1.0), re(0.0), re(2.5)],
            vec![re(0.0), re(0.0), re(0.0)],
            vec![re(-3.0), re(4.0), re(0.0)],
        ])?);
        let sparse = cast(&dense, DataKind::Csr)?;
        assert_eq!(sparse.shape(), dense.shape());
        let back = cast(&sparse, DataKind::Dense)?;
        assert!(dense.approx_eq_same(&back, 1e-12)?);
        Ok(())
    }

    #[test]
    fn cast_preserves_empty_shapes() -> Result<(), DataError> {
        let empty = Data::Dense(Dense::zeros(Shape::new(0, 0)));
        let sparse = cast(&empty, DataKind::Csr)?;
        assert_eq!(sparse.shape(), Shape::new(0, 0));
        Ok(())
    }

    #[test]
    fn cast_to_unknown_extension_kind_fails() {
        let dense = Data::Dense(Dense::identity(2));
        let result = cast(&dense, DataKind::Extension("nowhere"));
        assert!(matches!(result, Err(DataError::UnsupportedType { .. })));
    }
}
