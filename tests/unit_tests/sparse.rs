use discretize::error::AssemblyError;
use discretize::sparse::{CsrBackend, DenseVector, SparseMatrix, Vector};
use nalgebra::{DMatrix, DVector};

fn allocated(size: usize, entries: &[(usize, usize)]) -> CsrBackend {
    let mut backend = CsrBackend::new();
    backend.prealloc(size);
    for &(row, col) in entries {
        backend.pre_add(row, col);
    }
    backend.alloc().unwrap();
    backend
}

#[test]
fn csr_backend_deduplicates_registered_entries() {
    let backend = allocated(3, &[(2, 0), (0, 1), (0, 1), (1, 1), (2, 0)]);
    assert_eq!(backend.size(), 3);
    assert_eq!(backend.nnz(), 3);

    let pattern = backend.pattern().unwrap();
    assert_eq!(pattern.major_offsets(), &[0, 1, 2, 3]);
    assert_eq!(pattern.minor_indices(), &[1, 1, 0]);
}

#[test]
fn csr_backend_accumulates_values() {
    let mut backend = allocated(2, &[(0, 0), (0, 1), (1, 1)]);
    backend.add(0, 1, 1.5).unwrap();
    backend.add(0, 1, 0.5).unwrap();
    backend.add(1, 1, -1.0).unwrap();
    assert_eq!(backend.get(0, 1), 2.0);
    assert_eq!(backend.get(1, 1), -1.0);
    assert_eq!(backend.get(0, 0), 0.0);
    // Outside the pattern reads as zero
    assert_eq!(backend.get(1, 0), 0.0);

    backend.zero();
    assert_eq!(backend.get(0, 1), 0.0);
    assert_eq!(backend.nnz(), 3);
}

#[test]
fn csr_backend_adds_blocks_skipping_fixed_rows_and_columns() {
    let mut backend = allocated(2, &[(0, 0), (0, 1), (1, 0), (1, 1)]);
    let block = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    backend.add_block(&[Some(1), None], &[None, Some(0)], &block).unwrap();
    assert_eq!(backend.get(1, 0), 2.0);
    assert_eq!(backend.get(0, 0), 0.0);
    assert_eq!(backend.get(1, 1), 0.0);
}

#[test]
fn csr_backend_rejects_entries_outside_pattern() {
    let mut backend = allocated(2, &[(0, 0)]);
    let err = backend.add(1, 0, 1.0).unwrap_err();
    assert_eq!(
        err.downcast_ref::<AssemblyError>(),
        Some(&AssemblyError::EntryOutsidePattern { row: 1, col: 0 })
    );
    let err = backend.add(5, 0, 1.0).unwrap_err();
    assert_eq!(
        err.downcast_ref::<AssemblyError>(),
        Some(&AssemblyError::EntryOutsidePattern { row: 5, col: 0 })
    );
}

#[test]
fn csr_backend_rejects_registered_entries_outside_matrix() {
    let mut backend = CsrBackend::new();
    backend.prealloc(2);
    backend.pre_add(0, 2);
    assert!(backend.alloc().is_err());
}

#[test]
fn csr_backend_must_be_allocated_before_adding() {
    let mut backend = CsrBackend::new();
    let err = backend.add(0, 0, 1.0).unwrap_err();
    assert_eq!(err.downcast_ref::<AssemblyError>(), Some(&AssemblyError::BackendNotAllocated));

    let mut backend = allocated(1, &[(0, 0)]);
    backend.free();
    assert_eq!(backend.size(), 0);
    assert!(backend.matrix().is_none());
    let err = backend.add(0, 0, 1.0).unwrap_err();
    assert_eq!(err.downcast_ref::<AssemblyError>(), Some(&AssemblyError::BackendNotAllocated));
}

#[test]
fn csr_backend_with_empty_rows() {
    let backend = allocated(4, &[(1, 3)]);
    let pattern = backend.pattern().unwrap();
    assert_eq!(pattern.major_offsets(), &[0, 0, 1, 1, 1]);
}

#[test]
fn dense_vector_accumulates() {
    let mut vector = DenseVector::new();
    assert!(vector.is_empty());
    vector.alloc(3);
    vector.add(1, 2.0);
    vector.add(1, 0.5);
    vector.add(2, -1.0);
    assert_eq!(vector.values(), &DVector::from_vec(vec![0.0, 2.5, -1.0]));

    vector.zero();
    assert_eq!(vector.len(), 3);
    assert_eq!(vector.into_values(), DVector::zeros(3));
}
