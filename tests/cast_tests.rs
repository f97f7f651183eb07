// tests/cast_tests.rs

// Import necessary types from the qdx crate
use qdx::{DataError, DataKind, Dense, Qobj, Shape, cast, core::Csr, core::Data};

use num_complex::Complex;

// Helper function to build a real-valued complex scalar
fn re(x: f64) -> Complex<f64> {
    Complex::new(x, 0.0)
}

#[test]
fn identity_survives_dense_csr_dense_round_trip() -> Result<(), DataError> {
    // 3x3 identity, dense -> csr -> dense, element-wise equal to the original.
    let original = Qobj::from_nested(&[
        vec![re(1.0), re(0.0), re(0.0)],
        vec![re(0.0), re(1.0), re(0.0)],
        vec![re(0.0), re(0.0), re(1.0)],
    ])?;

    let sparse = original.cast_to(DataKind::Csr)?;
    assert_eq!(sparse.kind(), DataKind::Csr);
    assert_eq!(sparse.shape(), Shape::new(3, 3));

    let back = sparse.cast_to(DataKind::Dense)?;
    assert_eq!(back.kind(), DataKind::Dense);
    assert!(original.approx_eq(&back, 1e-12)?);
    Ok(())
}

#[test]
fn cast_to_own_kind_is_idempotent_and_deep() -> Result<(), DataError> {
    let sparse = Data::Csr(Csr::identity(4));
    let copy = cast(&sparse, DataKind::Csr)?;
    assert_eq!(copy.kind(), DataKind::Csr);
    assert_eq!(copy.shape(), sparse.shape());
    assert!(sparse.approx_eq_same(&copy, 1e-12)?);
    Ok(())
}

#[test]
fn cast_preserves_shape_for_rectangular_data() -> Result<(), DataError> {
    let dense = Qobj::from_nested(&[
        vec![re(1.0), re(0.0), re(2.0), re(0.0)],
        vec![re(0.0), re(0.0), re(0.0), re(-1.0)],
    ])?;
    let sparse = dense.cast_to(DataKind::Csr)?;
    assert_eq!(sparse.shape(), Shape::new(2, 4));
    let back = sparse.cast_to(DataKind::Dense)?;
    assert_eq!(back.shape(), Shape::new(2, 4));
    assert!(dense.approx_eq(&back, 1e-12)?);
    Ok(())
}

#[test]
fn csr_offsets_of_wrong_length_fail_at_construction() {
    // A 3-row matrix requires 4 offsets.
    let result = Csr::from_parts(
        vec![re(1.0)],
        vec![0],
        vec![0, 1, 1],
        Shape::new(3, 3),
    );
    assert!(matches!(result, Err(DataError::InvalidBuffer { .. })));
}

#[test]
fn adopting_empty_storage_against_nonzero_shape_fails() {
    let result = Dense::from_vec(Vec::new(), Shape::new(2, 2));
    assert!(matches!(result, Err(DataError::InvalidBuffer { .. })));
}

#[test]
fn exporting_twice_returns_one_backing_store() -> Result<(), DataError> {
    let mut dense = Dense::from_nested(&[
        vec![re(1.0), re(2.0)],
        vec![re(3.0), re(4.0)],
    ])?;

    let first = dense.export_view(false)?;
    let second = dense.export_view(false)?;
    assert!(
        first.same_store(&second),
        "repeated exports must alias the first export's store"
    );
    assert_eq!(first.read()[3], re(4.0));
    Ok(())
}

#[test]
fn casting_keeps_complex_phases_intact() -> Result<(), DataError> {
    let dense = Qobj::from_nested(&[
        vec![Complex::new(0.0, 1.0), re(0.0)],
        vec![re(0.0), Complex::new(0.0, -1.0)],
    ])?;
    let round_tripped = dense
        .cast_to(DataKind::Csr)?
        .cast_to(DataKind::Dense)?;
    assert!(dense.approx_eq(&round_tripped, 1e-12)?);
    assert_eq!(round_tripped.trace()?, re(0.0));
    Ok(())
}

#[test]
fn sparse_zero_matrix_round_trips() -> Result<(), DataError> {
    let zero = Data::Csr(Csr::zeros(Shape::new(3, 2)));
    let dense = cast(&zero, DataKind::Dense)?;
    assert_eq!(dense.shape(), Shape::new(3, 2));
    let back = cast(&dense, DataKind::Csr)?;
    assert!(zero.approx_eq_same(&back, 1e-12)?);
    Ok(())
}
