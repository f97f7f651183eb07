// src/qobj/mod.rs

//! The variant-agnostic quantum-object facade.
//!
//! A `Qobj` owns exactly one [`Data`] value and forwards every mathematical
//! method to the dispatcher, keyed by the concrete variant of the data it
//! happens to hold. It never inspects or branches on that variant beyond
//! passing it along. This is the decoupling point that keeps all
//! higher-level logic representation-agnostic. Each method has an `_as` form taking an explicit
//! output-variant request; the plain form defers to the process-wide output
//! policy.

use num_complex::Complex;
use std::fmt;

use crate::convert;
use crate::core::{Data, DataError, DataKind, Dense, Shape};
use crate::dispatch::{self, op};

/// High-level handle over one data representation.
#[derive(Debug)]
pub struct Qobj {
    data: Data,
}

impl Qobj {
    /// Wraps an existing representation.
    pub fn new(data: Data) -> Self {
        Self { data }
    }

    /// Builds a dense-backed object from nested row vectors.
    pub fn from_nested(rows: &[Vec<Complex<f64>>]) -> Result<Self, DataError> {
        Ok(Self::new(Data::Dense(Dense::from_nested(rows)?)))
    }

    /// Read access to the held representation.
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Consumes the facade, yielding its representation.
    pub fn into_data(self) -> Data {
        self.data
    }

    /// Swaps in a new representation, returning the previous one.
    pub fn replace_data(&mut self, data: Data) -> Data {
        std::mem::replace(&mut self.data, data)
    }

    /// Kind of the held representation.
    pub fn kind(&self) -> DataKind {
        self.data.kind()
    }

    /// Shape of the held matrix.
    pub fn shape(&self) -> Shape {
        self.data.shape()
    }

    /// Explicit deep copy.
    pub fn copied(&self) -> Self {
        Self::new(self.data.deep_copy())
    }

    /// Converts the held representation to `kind` through the cast layer.
    pub fn cast_to(&self, kind: DataKind) -> Result<Self, DataError> {
        Ok(Self::new(convert::cast(&self.data, kind)?))
    }

    /// Element-wise sum.
    pub fn add(&self, other: &Qobj) -> Result<Self, DataError> {
        self.add_as(other, None)
    }

    /// Element-wise sum with an explicit output variant.
    pub fn add_as(&self, other: &Qobj, output: Option<DataKind>) -> Result<Self, DataError> {
        self.matrix_op(op::ADD, &[other], &[], output)
    }

    /// Element-wise difference.
    pub fn sub(&self, other: &Qobj) -> Result<Self, DataError> {
        self.sub_as(other, None)
    }

    /// Element-wise difference with an explicit output variant.
    pub fn sub_as(&self, other: &Qobj, output: Option<DataKind>) -> Result<Self, DataError> {
        self.matrix_op(op::SUB, &[other], &[], output)
    }

    /// Matrix product.
    pub fn matmul(&self, other: &Qobj) -> Result<Self, DataError> {
        self.matmul_as(other, None)
    }

    /// Matrix product with an explicit output variant.
    pub fn matmul_as(&self, other: &Qobj, output: Option<DataKind>) -> Result<Self, DataError> {
        self.matrix_op(op::MATMUL, &[other], &[], output)
    }

    /// Kronecker (tensor) product.
    pub fn kron(&self, other: &Qobj) -> Result<Self, DataError> {
        self.kron_as(other, None)
    }

    /// Kronecker product with an explicit output variant.
    pub fn kron_as(&self, other: &Qobj, output: Option<DataKind>) -> Result<Self, DataError> {
        self.matrix_op(op::KRON, &[other], &[], output)
    }

    /// Scalar multiple.
    pub fn scale(&self, factor: Complex<f64>) -> Result<Self, DataError> {
        self.scale_as(factor, None)
    }

    /// Scalar multiple with an explicit output variant.
    pub fn scale_as(
        &self,
        factor: Complex<f64>,
        output: Option<DataKind>,
    ) -> Result<Self, DataError> {
        self.matrix_op(op::SCALE, &[], &[factor], output)
    }

    /// Additive inverse.
    pub fn neg(&self) -> Result<Self, DataError> {
        self.matrix_op(op::NEG, &[], &[], None)
    }

    /// Matrix transpose.
    pub fn transpose(&self) -> Result<Self, DataError> {
        self.matrix_op(op::TRANSPOSE, &[], &[], None)
    }

    /// Element-wise complex conjugate.
    pub fn conj(&self) -> Result<Self, DataError> {
        self.matrix_op(op::CONJ, &[], &[], None)
    }

    /// Conjugate transpose (Hermitian adjoint).
    pub fn adjoint(&self) -> Result<Self, DataError> {
        self.matrix_op(op::ADJOINT, &[], &[], None)
    }

    /// Matrix exponential.
    pub fn expm(&self) -> Result<Self, DataError> {
        self.matrix_op(op::EXPM, &[], &[], None)
    }

    /// Sum of diagonal elements.
    pub fn trace(&self) -> Result<Complex<f64>, DataError> {
        dispatch::invoke(op::TRACE, &[&self.data], &[], None)?.into_scalar(op::TRACE)
    }

    /// Approximate equality within `tolerance`.
    pub fn approx_eq(&self, other: &Qobj, tolerance: f64) -> Result<bool, DataError> {
        dispatch::invoke(
            op::EQ,
            &[&self.data, &other.data],
            &[Complex::new(tolerance, 0.0)],
            None,
        )?
        .into_flag(op::EQ)
    }

    fn matrix_op(
        &self,
        operation: &str,
        others: &[&Qobj],
        params: &[Complex<f64>],
        output: Option<DataKind>,
    ) -> Result<Self, DataError> {
        let mut operands: Vec<&Data> = Vec::with_capacity(others.len() + 1);
        operands.push(&self.data);
        operands.extend(others.iter().map(|q| &q.data));
        let value = dispatch::invoke(operation, &operands, params, output)?;
        Ok(Self::new(value.into_data(operation)?))
    }
}

impl From<Dense> for Qobj {
    fn from(dense: Dense) -> Self {
        Self::new(Data::Dense(dense))
    }
}

impl fmt::Display for Qobj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Qobj({})", self.data)
    }
}
