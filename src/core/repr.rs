// src/core/repr.rs

//! The tagged union over concrete representation variants, and the mandatory
//! interface an externally defined variant must satisfy.

use num_complex::Complex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::csr::Csr;
use super::dense::Dense;
use super::error::{DataError, DataKind};
use super::shape::Shape;

/// The mandatory minimal interface for representations defined outside this
/// crate.
///
/// This set is deliberately small: a type implementing it is usable
/// everywhere in the system, because every other operation is acquired for
/// free through the dispatcher's cast-through-reference fallback. Every
/// addition here raises the cost of writing a new representation, so the set
/// grows only as an extensibility trade-off, never as a convenience.
///
/// The same-type binary operations receive their partner as `&dyn
/// ExtensionData` and are expected to downcast via [`ExtensionData::as_any`];
/// a partner of a different concrete type fails with
/// [`DataError::UnsupportedType`].
pub trait ExtensionData: fmt::Debug + Send + Sync {
    /// Stable name identifying this variant; becomes
    /// `DataKind::Extension(name)` in dispatch keys.
    fn kind_name(&self) -> &'static str;

    /// Shape of the represented matrix.
    fn shape(&self) -> Shape;

    /// Conversion to the reference variant.
    fn to_reference(&self) -> Result<Dense, DataError>;

    /// Conversion from the reference variant, producing a value of this
    /// variant. Instance-based so the registry needs no separate constructor
    /// table; any value of the variant serves as the prototype.
    fn from_reference(&self, reference: &Dense) -> Result<Arc<dyn ExtensionData>, DataError>;

    /// Explicit deep copy.
    fn deep_copy(&self) -> Arc<dyn ExtensionData>;

    /// Scalar multiplication.
    fn scale(&self, factor: Complex<f64>) -> Result<Arc<dyn ExtensionData>, DataError>;

    /// Same-type matrix multiplication.
    fn matmul_same(&self, other: &dyn ExtensionData) -> Result<Arc<dyn ExtensionData>, DataError>;

    /// Same-type addition.
    fn add_same(&self, other: &dyn ExtensionData) -> Result<Arc<dyn ExtensionData>, DataError>;

    /// Same-type approximate equality within `tolerance`.
    fn approx_eq_same(&self, other: &dyn ExtensionData, tolerance: f64)
    -> Result<bool, DataError>;

    /// Downcast support for the same-type operations.
    fn as_any(&self) -> &dyn Any;
}

/// A concrete data representation: the value type flowing through dispatch.
///
/// `Dense` and `Csr` are the built-in variants; `Extension` carries an
/// externally defined representation behind the mandatory interface. The
/// union itself satisfies the mandatory interface, delegating per variant,
/// which is what the dispatcher's fallback path relies on.
#[derive(Debug)]
pub enum Data {
    /// Row-major dense storage (the reference variant).
    Dense(Dense),
    /// Compressed-sparse-row storage.
    Csr(Csr),
    /// Externally defined representation.
    Extension(Arc<dyn ExtensionData>),
}

impl Data {
    /// Kind tag of the held variant; one component of every dispatch key.
    pub fn kind(&self) -> DataKind {
        match self {
            Data::Dense(_) => DataKind::Dense,
            Data::Csr(_) => DataKind::Csr,
            Data::Extension(ext) => DataKind::Extension(ext.kind_name()),
        }
    }

    /// Shape of the held matrix.
    pub fn shape(&self) -> Shape {
        match self {
            Data::Dense(dense) => dense.shape(),
            Data::Csr(csr) => csr.shape(),
            Data::Extension(ext) => ext.shape(),
        }
    }

    /// Conversion to the reference variant (mandatory interface).
    pub fn to_reference(&self) -> Result<Dense, DataError> {
        match self {
            Data::Dense(dense) => Ok(dense.deep_copy()),
            Data::Csr(csr) => Ok(csr.to_dense()),
            Data::Extension(ext) => ext.to_reference(),
        }
    }

    /// Explicit deep copy (mandatory interface).
    pub fn deep_copy(&self) -> Data {
        match self {
            Data::Dense(dense) => Data::Dense(dense.deep_copy()),
            Data::Csr(csr) => Data::Csr(csr.deep_copy()),
            Data::Extension(ext) => Data::Extension(ext.deep_copy()),
        }
    }

    /// Scalar multiplication (mandatory interface).
    pub fn scale(&self, factor: Complex<f64>) -> Result<Data, DataError> {
        match self {
            Data::Dense(dense) => Ok(Data::Dense(dense.scale(factor))),
            Data::Csr(csr) => Ok(Data::Csr(csr.scale(factor))),
            Data::Extension(ext) => Ok(Data::Extension(ext.scale(factor)?)),
        }
    }

    /// Same-type matrix multiplication (mandatory interface).
    pub fn matmul_same(&self, other: &Data) -> Result<Data, DataError> {
        match (self, other) {
            (Data::Dense(a), Data::Dense(b)) => Ok(Data::Dense(a.matmul(b)?)),
            (Data::Csr(a), Data::Csr(b)) => Ok(Data::Csr(a.matmul(b)?)),
            (Data::Extension(a), Data::Extension(b)) if a.kind_name() == b.kind_name() => {
                Ok(Data::Extension(a.matmul_same(b.as_ref())?))
            }
            _ => Err(kind_mismatch("matmul", self, other)),
        }
    }

    /// Same-type addition (mandatory interface).
    pub fn add_same(&self, other: &Data) -> Result<Data, DataError> {
        match (self, other) {
            (Data::Dense(a), Data::Dense(b)) => Ok(Data::Dense(a.add(b)?)),
            (Data::Csr(a), Data::Csr(b)) => Ok(Data::Csr(a.add(b)?)),
            (Data::Extension(a), Data::Extension(b)) if a.kind_name() == b.kind_name() => {
                Ok(Data::Extension(a.add_same(b.as_ref())?))
            }
            _ => Err(kind_mismatch("add", self, other)),
        }
    }

    /// Same-type approximate equality (mandatory interface).
    pub fn approx_eq_same(&self, other: &Data, tolerance: f64) -> Result<bool, DataError> {
        match (self, other) {
            (Data::Dense(a), Data::Dense(b)) => Ok(a.approx_eq(b, tolerance)),
            (Data::Csr(a), Data::Csr(b)) => Ok(a.approx_eq(b, tolerance)),
            (Data::Extension(a), Data::Extension(b)) if a.kind_name() == b.kind_name() => {
                a.approx_eq_same(b.as_ref(), tolerance)
            }
            _ => Err(kind_mismatch("eq", self, other)),
        }
    }

    /// The held dense value, when this is the dense variant.
    pub fn as_dense(&self) -> Option<&Dense> {
        match self {
            Data::Dense(dense) => Some(dense),
            _ => None,
        }
    }

    /// The held CSR value, when this is the CSR variant.
    pub fn as_csr(&self) -> Option<&Csr> {
        match self {
            Data::Csr(csr) => Some(csr),
            _ => None,
        }
    }

    /// The held extension value, when this is an extension variant.
    pub fn as_extension(&self) -> Option<&Arc<dyn ExtensionData>> {
        match self {
            Data::Extension(ext) => Some(ext),
            _ => None,
        }
    }
}

impl From<Dense> for Data {
    fn from(dense: Dense) -> Self {
        Data::Dense(dense)
    }
}

impl From<Csr> for Data {
    fn from(csr: Csr) -> Self {
        Data::Csr(csr)
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind(), self.shape())
    }
}

fn kind_mismatch(operation: &str, a: &Data, b: &Data) -> DataError {
    DataError::UnsupportedType {
        kind: b.kind(),
        message: format!(
            "same-type {} received mismatched operand kinds {} and {}",
            operation,
            a.kind(),
            b.kind()
        ),
    }
}
