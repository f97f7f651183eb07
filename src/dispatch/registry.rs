// src/dispatch/registry.rs

//! The process-wide dispatch table and its built-in registrations.
//!
//! Built-ins cover two tiers: complete reference implementations over the
//! dense variant for every operation name the crate defines, and accelerated
//! CSR implementations where the sparse layout admits one. The mixed
//! dense-by-sparse cases are intentionally left to the fallback path.
//!
//! Registered closures are thin adapters from the shared dispatch signature
//! onto the inherent kernels of the concrete types; kernels call each other
//! directly, without re-entering dispatch.

use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use num_complex::Complex;

use super::{OpImpl, OpValue, op};
use crate::core::{Csr, Data, DataError, DataKind, Dense, DEFAULT_EQ_TOLERANCE};

struct Registry {
    table: HashMap<(String, Vec<DataKind>), OpImpl>,
}

impl Registry {
    fn with_builtins() -> Self {
        let mut registry = Self {
            table: HashMap::new(),
        };
        registry.register_dense_reference();
        registry.register_csr_accelerated();
        registry
    }

    fn insert(&mut self, operation: &str, kinds: &[DataKind], implementation: OpImpl) {
        self.table
            .insert((operation.to_string(), kinds.to_vec()), implementation);
    }

    fn register_dense_reference(&mut self) {
        use DataKind::Dense as D;
        self.insert(op::ADD, &[D, D], dense_add);
        self.insert(op::SUB, &[D, D], dense_sub);
        self.insert(op::MATMUL, &[D, D], dense_matmul);
        self.insert(op::KRON, &[D, D], dense_kron);
        self.insert(op::SCALE, &[D], dense_scale);
        self.insert(op::NEG, &[D], dense_neg);
        self.insert(op::TRACE, &[D], dense_trace);
        self.insert(op::TRANSPOSE, &[D], dense_transpose);
        self.insert(op::CONJ, &[D], dense_conj);
        self.insert(op::ADJOINT, &[D], dense_adjoint);
        self.insert(op::EXPM, &[D], dense_expm);
        self.insert(op::EQ, &[D, D], dense_eq);
    }

    fn register_csr_accelerated(&mut self) {
        use DataKind::Csr as S;
        self.insert(op::ADD, &[S, S], csr_add);
        self.insert(op::SUB, &[S, S], csr_sub);
        self.insert(op::MATMUL, &[S, S], csr_matmul);
        self.insert(op::SCALE, &[S], csr_scale);
        self.insert(op::NEG, &[S], csr_neg);
        self.insert(op::TRACE, &[S], csr_trace);
        self.insert(op::TRANSPOSE, &[S], csr_transpose);
        self.insert(op::CONJ, &[S], csr_conj);
        self.insert(op::ADJOINT, &[S], csr_adjoint);
        self.insert(op::EQ, &[S, S], csr_eq);
    }
}

static REGISTRY: LazyLock<RwLock<Registry>> =
    LazyLock::new(|| RwLock::new(Registry::with_builtins()));

pub(crate) fn insert(operation: &str, kinds: &[DataKind], implementation: OpImpl) {
    let mut registry = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    registry.insert(operation, kinds, implementation);
}

pub(crate) fn lookup(operation: &str, kinds: &[DataKind]) -> Option<OpImpl> {
    let registry = REGISTRY.read().unwrap_or_else(|e| e.into_inner());
    registry
        .table
        .get(&(operation.to_string(), kinds.to_vec()))
        .copied()
}

// --- Operand and parameter adapters ---

fn unary<'a>(operands: &[&'a Data], operation: &str) -> Result<&'a Data, DataError> {
    match operands {
        &[only] => Ok(only),
        _ => Err(arity_mismatch(operation, 1, operands)),
    }
}

fn binary<'a>(operands: &[&'a Data], operation: &str) -> Result<(&'a Data, &'a Data), DataError> {
    match operands {
        &[first, second] => Ok((first, second)),
        _ => Err(arity_mismatch(operation, 2, operands)),
    }
}

fn arity_mismatch(operation: &str, expected: usize, operands: &[&Data]) -> DataError {
    DataError::UnsupportedType {
        kind: operands
            .first()
            .map(|data| data.kind())
            .unwrap_or(DataKind::Dense),
        message: format!(
            "{} expects {} operand(s), received {}",
            operation,
            expected,
            operands.len()
        ),
    }
}

fn expect_dense<'a>(data: &'a Data, operation: &str) -> Result<&'a Dense, DataError> {
    data.as_dense().ok_or_else(|| DataError::UnsupportedType {
        kind: data.kind(),
        message: format!("{} implementation for dense operands received another kind", operation),
    })
}

fn expect_csr<'a>(data: &'a Data, operation: &str) -> Result<&'a Csr, DataError> {
    data.as_csr().ok_or_else(|| DataError::UnsupportedType {
        kind: data.kind(),
        message: format!("{} implementation for csr operands received another kind", operation),
    })
}

fn scalar_param(params: &[Complex<f64>], operation: &str) -> Result<Complex<f64>, DataError> {
    params
        .first()
        .copied()
        .ok_or_else(|| DataError::MissingParameter {
            operation: operation.to_string(),
        })
}

fn tolerance_param(params: &[Complex<f64>]) -> f64 {
    params.first().map(|c| c.re).unwrap_or(DEFAULT_EQ_TOLERANCE)
}

// --- Dense reference implementations ---

fn dense_add(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let (a, b) = binary(operands, op::ADD)?;
    let result = expect_dense(a, op::ADD)?.add(expect_dense(b, op::ADD)?)?;
    Ok(OpValue::Data(Data::Dense(result)))
}

fn dense_sub(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let (a, b) = binary(operands, op::SUB)?;
    let result = expect_dense(a, op::SUB)?.sub(expect_dense(b, op::SUB)?)?;
    Ok(OpValue::Data(Data::Dense(result)))
}

fn dense_matmul(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let (a, b) = binary(operands, op::MATMUL)?;
    let result = expect_dense(a, op::MATMUL)?.matmul(expect_dense(b, op::MATMUL)?)?;
    Ok(OpValue::Data(Data::Dense(result)))
}

fn dense_kron(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let (a, b) = binary(operands, op::KRON)?;
    let result = expect_dense(a, op::KRON)?.kron(expect_dense(b, op::KRON)?);
    Ok(OpValue::Data(Data::Dense(result)))
}

fn dense_scale(operands: &[&Data], params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::SCALE)?;
    let factor = scalar_param(params, op::SCALE)?;
    Ok(OpValue::Data(Data::Dense(expect_dense(a, op::SCALE)?.scale(factor))))
}

fn dense_neg(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::NEG)?;
    Ok(OpValue::Data(Data::Dense(expect_dense(a, op::NEG)?.neg())))
}

fn dense_trace(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::TRACE)?;
    Ok(OpValue::Scalar(expect_dense(a, op::TRACE)?.trace()?))
}

fn dense_transpose(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::TRANSPOSE)?;
    Ok(OpValue::Data(Data::Dense(
        expect_dense(a, op::TRANSPOSE)?.transpose(),
    )))
}

fn dense_conj(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::CONJ)?;
    Ok(OpValue::Data(Data::Dense(expect_dense(a, op::CONJ)?.conj())))
}

fn dense_adjoint(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::ADJOINT)?;
    Ok(OpValue::Data(Data::Dense(
        expect_dense(a, op::ADJOINT)?.adjoint(),
    )))
}

fn dense_expm(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::EXPM)?;
    Ok(OpValue::Data(Data::Dense(expect_dense(a, op::EXPM)?.expm()?)))
}

fn dense_eq(operands: &[&Data], params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let (a, b) = binary(operands, op::EQ)?;
    let tolerance = tolerance_param(params);
    Ok(OpValue::Flag(
        expect_dense(a, op::EQ)?.approx_eq(expect_dense(b, op::EQ)?, tolerance),
    ))
}

// --- CSR accelerated implementations ---

fn csr_add(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let (a, b) = binary(operands, op::ADD)?;
    let result = expect_csr(a, op::ADD)?.add(expect_csr(b, op::ADD)?)?;
    Ok(OpValue::Data(Data::Csr(result)))
}

fn csr_sub(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let (a, b) = binary(operands, op::SUB)?;
    let result = expect_csr(a, op::SUB)?.sub(expect_csr(b, op::SUB)?)?;
    Ok(OpValue::Data(Data::Csr(result)))
}

fn csr_matmul(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let (a, b) = binary(operands, op::MATMUL)?;
    let result = expect_csr(a, op::MATMUL)?.matmul(expect_csr(b, op::MATMUL)?)?;
    Ok(OpValue::Data(Data::Csr(result)))
}

fn csr_scale(operands: &[&Data], params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::SCALE)?;
    let factor = scalar_param(params, op::SCALE)?;
    Ok(OpValue::Data(Data::Csr(expect_csr(a, op::SCALE)?.scale(factor))))
}

fn csr_neg(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::NEG)?;
    Ok(OpValue::Data(Data::Csr(expect_csr(a, op::NEG)?.neg())))
}

fn csr_trace(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::TRACE)?;
    Ok(OpValue::Scalar(expect_csr(a, op::TRACE)?.trace()?))
}

fn csr_transpose(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::TRANSPOSE)?;
    Ok(OpValue::Data(Data::Csr(
        expect_csr(a, op::TRANSPOSE)?.transpose(),
    )))
}

fn csr_conj(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::CONJ)?;
    Ok(OpValue::Data(Data::Csr(expect_csr(a, op::CONJ)?.conj())))
}

fn csr_adjoint(operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let a = unary(operands, op::ADJOINT)?;
    Ok(OpValue::Data(Data::Csr(expect_csr(a, op::ADJOINT)?.adjoint())))
}

fn csr_eq(operands: &[&Data], params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    let (a, b) = binary(operands, op::EQ)?;
    let tolerance = tolerance_param(params);
    Ok(OpValue::Flag(
        expect_csr(a, op::EQ)?.approx_eq(expect_csr(b, op::EQ)?, tolerance),
    ))
}
