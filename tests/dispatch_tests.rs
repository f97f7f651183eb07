// tests/dispatch_tests.rs

// Import necessary types from the qdx crate
use qdx::{
    Data, DataError, DataKind, Dense, ExtensionData, OpValue, Qobj, Shape, convert, dispatch,
    fallback_count, invoke, op, register,
};

use num_complex::Complex;
use num_traits::Zero;
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};

// The registry, the settings, and the fallback counter are process-wide.
// Tests in this file serialize on one lock so registrations and counter
// readings never interleave.
static LOCK: Mutex<()> = Mutex::new(());

fn guard() -> MutexGuard<'static, ()> {
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

// Helper function to build a real-valued complex scalar
fn re(x: f64) -> Complex<f64> {
    Complex::new(x, 0.0)
}

// --- A coordinate-list test variant implementing only the mandatory interface ---

/// Coordinate-list matrix used to exercise the fallback path: it registers
/// no accelerated implementations, so every extended operation must arrive
/// through cast-to-reference.
#[derive(Debug)]
struct CooData {
    shape: Shape,
    entries: Vec<(usize, usize, Complex<f64>)>,
}

impl CooData {
    fn from_dense(dense: &Dense) -> Self {
        let shape = dense.shape();
        let mut entries = Vec::new();
        for row in 0..shape.rows {
            for col in 0..shape.cols {
                if let Some(v) = dense.get(row, col) {
                    if v.norm() > 1e-14 {
                        entries.push((row, col, v));
                    }
                }
            }
        }
        Self { shape, entries }
    }

    fn to_dense(&self) -> Result<Dense, DataError> {
        let mut cells = vec![Complex::zero(); self.shape.len()];
        for &(row, col, v) in &self.entries {
            cells[row * self.shape.cols + col] = v;
        }
        Dense::from_vec(cells, self.shape)
    }

    fn expect_same<'a>(&self, other: &'a dyn ExtensionData) -> Result<&'a CooData, DataError> {
        other
            .as_any()
            .downcast_ref::<CooData>()
            .ok_or_else(|| DataError::UnsupportedType {
                kind: DataKind::Extension(other.kind_name()),
                message: "same-type coo operation received a foreign extension".to_string(),
            })
    }
}

impl ExtensionData for CooData {
    fn kind_name(&self) -> &'static str {
        "coo"
    }

    fn shape(&self) -> Shape {
        self.shape
    }

    fn to_reference(&self) -> Result<Dense, DataError> {
        self.to_dense()
    }

    fn from_reference(&self, reference: &Dense) -> Result<Arc<dyn ExtensionData>, DataError> {
        Ok(Arc::new(CooData::from_dense(reference)))
    }

    fn deep_copy(&self) -> Arc<dyn ExtensionData> {
        Arc::new(CooData {
            shape: self.shape,
            entries: self.entries.clone(),
        })
    }

    fn scale(&self, factor: Complex<f64>) -> Result<Arc<dyn ExtensionData>, DataError> {
        Ok(Arc::new(CooData {
            shape: self.shape,
            entries: self
                .entries
                .iter()
                .map(|&(r, c, v)| (r, c, v * factor))
                .collect(),
        }))
    }

    fn matmul_same(&self, other: &dyn ExtensionData) -> Result<Arc<dyn ExtensionData>, DataError> {
        let other = self.expect_same(other)?;
        let product = self.to_dense()?.matmul(&other.to_dense()?)?;
        Ok(Arc::new(CooData::from_dense(&product)))
    }

    fn add_same(&self, other: &dyn ExtensionData) -> Result<Arc<dyn ExtensionData>, DataError> {
        let other = self.expect_same(other)?;
        let sum = self.to_dense()?.add(&other.to_dense()?)?;
        Ok(Arc::new(CooData::from_dense(&sum)))
    }

    fn approx_eq_same(
        &self,
        other: &dyn ExtensionData,
        tolerance: f64,
    ) -> Result<bool, DataError> {
        let other = self.expect_same(other)?;
        Ok(self.to_dense()?.approx_eq(&other.to_dense()?, tolerance))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn import_coo(reference: &Dense) -> Result<Data, DataError> {
    Ok(Data::Extension(Arc::new(CooData::from_dense(reference))))
}

fn coo_from_nested(rows: &[Vec<Complex<f64>>]) -> Result<Data, DataError> {
    Ok(Data::Extension(Arc::new(CooData::from_dense(
        &Dense::from_nested(rows)?,
    ))))
}

// --- Fallback path ---

#[test]
fn trace_on_mandatory_only_variant_falls_back_once() -> Result<(), DataError> {
    let _guard = guard();

    let coo = coo_from_nested(&[
        vec![re(1.0), re(0.0), re(7.0)],
        vec![re(0.0), re(2.0), re(0.0)],
        vec![re(0.0), re(0.0), re(4.0)],
    ])?;

    let before = fallback_count();
    let trace = invoke(op::TRACE, &[&coo], &[], None)?.into_scalar(op::TRACE)?;
    assert_eq!(trace, re(7.0));
    assert_eq!(
        fallback_count() - before,
        1,
        "exactly one efficiency diagnostic for one fallback dispatch"
    );
    Ok(())
}

#[test]
fn fallback_equals_reference_composition() -> Result<(), DataError> {
    let _guard = guard();
    convert::register_importer(DataKind::Extension("coo"), import_coo);

    let coo = coo_from_nested(&[
        vec![re(1.0), re(2.0)],
        vec![re(3.0), re(4.0)],
    ])?;

    // Dispatched transpose of a mandatory-only variant...
    let transposed = invoke(op::TRANSPOSE, &[&coo], &[], None)?.into_data(op::TRANSPOSE)?;
    // ...must equal from-reference(reference-op(to-reference(v))).
    let by_hand = import_coo(&coo.to_reference()?.transpose())?;
    assert_eq!(transposed.kind(), DataKind::Extension("coo"));
    assert!(transposed.approx_eq_same(&by_hand, 1e-12)?);
    Ok(())
}

#[test]
fn mixed_dense_csr_matmul_falls_back_to_correct_product() -> Result<(), DataError> {
    let _guard = guard();

    let identity = Qobj::from_nested(&[
        vec![re(1.0), re(0.0)],
        vec![re(0.0), re(1.0)],
    ])?;
    let sparse = Qobj::from_nested(&[
        vec![re(0.0), re(5.0)],
        vec![re(-1.0), re(0.0)],
    ])?
    .cast_to(DataKind::Csr)?;

    // No dense-by-csr matmul registration exists; the product still lands.
    let product = identity.matmul(&sparse)?;
    assert_eq!(product.kind(), DataKind::Dense);
    let expected = sparse.cast_to(DataKind::Dense)?;
    assert!(product.approx_eq(&expected, 1e-12)?);
    Ok(())
}

#[test]
fn disabled_diagnostics_suppress_the_counter() -> Result<(), DataError> {
    let _guard = guard();

    let coo = coo_from_nested(&[vec![re(3.0)]])?;
    qdx::config::configure(|s| s.fallback_diagnostics = false);
    let before = fallback_count();
    let trace = invoke(op::TRACE, &[&coo], &[], None)?.into_scalar(op::TRACE)?;
    qdx::config::configure(|s| s.fallback_diagnostics = true);

    assert_eq!(trace, re(3.0));
    assert_eq!(
        fallback_count(),
        before,
        "suppressed diagnostics must not count, while the fallback still runs"
    );
    Ok(())
}

// --- Registration semantics ---

fn norm_one_stub(_operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    Ok(OpValue::Scalar(re(1.0)))
}

fn norm_two_stub(_operands: &[&Data], _params: &[Complex<f64>]) -> Result<OpValue, DataError> {
    Ok(OpValue::Scalar(re(2.0)))
}

#[test]
fn later_registration_wins_for_one_key() -> Result<(), DataError> {
    let _guard = guard();

    let dense = Data::Dense(Dense::identity(2));
    register("stub-norm", &[DataKind::Dense], norm_one_stub);
    register("stub-norm", &[DataKind::Dense], norm_two_stub);

    let value = invoke("stub-norm", &[&dense], &[], None)?.into_scalar("stub-norm")?;
    assert_eq!(value, re(2.0), "last registration must be the active one");
    Ok(())
}

#[test]
fn missing_reference_implementation_is_reported() {
    let _guard = guard();

    let sparse = Data::Csr(qdx::Csr::identity(2));
    // "purity" has an accelerated registration nowhere, reference included.
    let result = invoke("purity", &[&sparse], &[], None);
    assert!(matches!(
        result,
        Err(DataError::NoDefaultImplementation { .. })
    ));
}

#[test]
fn same_type_kernel_rejects_foreign_operand() -> Result<(), DataError> {
    let dense = Data::Dense(Dense::identity(2));
    let sparse = Data::Csr(qdx::Csr::identity(2));
    let result = dense.matmul_same(&sparse);
    assert!(matches!(result, Err(DataError::UnsupportedType { .. })));
    Ok(())
}

// --- Mandatory-interface round trips ---

#[test]
fn csr_round_trips_through_the_reference_variant() -> Result<(), DataError> {
    let _guard = guard();

    let sparse = Qobj::from_nested(&[
        vec![re(0.0), re(1.5), re(0.0)],
        vec![re(2.0), re(0.0), re(0.0)],
    ])?
    .cast_to(DataKind::Csr)?;

    let round_tripped = sparse
        .cast_to(DataKind::Dense)?
        .cast_to(DataKind::Csr)?;
    assert!(sparse.approx_eq(&round_tripped, 1e-12)?);
    Ok(())
}

#[test]
fn extension_round_trips_through_the_reference_variant() -> Result<(), DataError> {
    let _guard = guard();

    let coo = coo_from_nested(&[
        vec![re(0.0), Complex::new(0.0, 2.0)],
        vec![re(4.0), re(0.0)],
    ])?;
    let reference = coo.to_reference()?;
    let back = import_coo(&reference)?;
    assert!(coo.approx_eq_same(&back, 1e-12)?);
    Ok(())
}

// --- Output-variant selection ---

#[test]
fn requested_output_kind_applies_to_fallback_results() -> Result<(), DataError> {
    let _guard = guard();

    let dense = Qobj::from_nested(&[
        vec![re(1.0), re(2.0)],
        vec![re(0.0), re(1.0)],
    ])?;
    let sparse = dense.cast_to(DataKind::Csr)?;

    // Mixed kron has no accelerated registration; the fallback computes in
    // the reference variant and the requested kind shapes the delivery.
    let product = dense.kron_as(&sparse, Some(DataKind::Csr))?;
    assert_eq!(product.kind(), DataKind::Csr);
    assert_eq!(product.shape(), Shape::new(4, 4));
    Ok(())
}

#[test]
fn fixed_output_policy_applies_when_no_kind_is_requested() -> Result<(), DataError> {
    let _guard = guard();

    let sparse = Qobj::from_nested(&[
        vec![re(1.0), re(0.0)],
        vec![re(0.0), re(1.0)],
    ])?
    .cast_to(DataKind::Csr)?;

    qdx::config::configure(|s| s.default_output = qdx::OutputPolicy::Fixed(DataKind::Dense));
    let result = sparse.add(&sparse);
    qdx::config::configure(|s| s.default_output = qdx::OutputPolicy::Operand);

    assert_eq!(result?.kind(), DataKind::Dense);
    Ok(())
}

// --- Accelerated and fallback paths agree ---

#[test]
fn accelerated_csr_matmul_agrees_with_reference() -> Result<(), DataError> {
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};

    let _guard = guard();

    let mut rng = StdRng::seed_from_u64(7);
    let mut rows_a = Vec::new();
    let mut rows_b = Vec::new();
    for _ in 0..8 {
        // Roughly one element in three is populated.
        rows_a.push(
            (0..8)
                .map(|_| {
                    if rng.random::<f64>() < 0.3 {
                        Complex::new(rng.random::<f64>() - 0.5, rng.random::<f64>() - 0.5)
                    } else {
                        Complex::zero()
                    }
                })
                .collect::<Vec<_>>(),
        );
        rows_b.push(
            (0..8)
                .map(|_| {
                    if rng.random::<f64>() < 0.3 {
                        Complex::new(rng.random::<f64>() - 0.5, rng.random::<f64>() - 0.5)
                    } else {
                        Complex::zero()
                    }
                })
                .collect::<Vec<_>>(),
        );
    }
    let a = Qobj::from_nested(&rows_a)?;
    let b = Qobj::from_nested(&rows_b)?;

    let reference = a.matmul(&b)?;
    let accelerated = a
        .cast_to(DataKind::Csr)?
        .matmul(&b.cast_to(DataKind::Csr)?)?;
    assert_eq!(accelerated.kind(), DataKind::Csr);
    assert!(reference.approx_eq(&accelerated.cast_to(DataKind::Dense)?, 1e-10)?);
    Ok(())
}

#[test]
fn dispatched_expm_reaches_sparse_operands_via_fallback() -> Result<(), DataError> {
    let _guard = guard();

    // expm is only implemented for the reference variant.
    let generator = Qobj::from_nested(&[
        vec![re(0.0), re(1.0)],
        vec![re(0.0), re(0.0)],
    ])?
    .cast_to(DataKind::Csr)?;

    let exponential = generator.expm()?;
    assert_eq!(exponential.kind(), DataKind::Csr, "operand-kind delivery");
    let expected = Qobj::from_nested(&[
        vec![re(1.0), re(1.0)],
        vec![re(0.0), re(1.0)],
    ])?;
    assert!(exponential.approx_eq(&expected, 1e-10)?);
    Ok(())
}

#[test]
fn scale_requires_its_scalar_parameter() {
    let _guard = guard();

    let dense = Data::Dense(Dense::identity(2));
    let result = dispatch::invoke(op::SCALE, &[&dense], &[], None);
    assert!(matches!(result, Err(DataError::MissingParameter { .. })));
}
