//! Sinks for assembled matrices and vectors.
//!
//! Assembly first registers every nonzero position with [`SparseMatrix::pre_add`], then
//! allocates storage once and only adds values afterwards.
use crate::error::AssemblyError;
use eyre::eyre;
use log::debug;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;

pub trait SparseMatrix {
    /// Number of rows (and columns).
    fn size(&self) -> usize;

    /// Discards any previous structure and starts registering nonzeros of a `size x size` matrix.
    fn prealloc(&mut self, size: usize);

    /// Registers a nonzero position.
    fn pre_add(&mut self, row: usize, col: usize);

    /// Allocates storage for all registered positions. Values start at zero.
    fn alloc(&mut self) -> eyre::Result<()>;

    fn zero(&mut self);

    /// Adds to an entry. The position must have been registered.
    fn add(&mut self, row: usize, col: usize, value: f64) -> eyre::Result<()>;

    /// Adds a dense block. Rows and columns without index are skipped.
    fn add_block(&mut self, rows: &[Option<usize>], cols: &[Option<usize>], block: &DMatrix<f64>) -> eyre::Result<()> {
        for (i, row) in rows.iter().enumerate() {
            let Some(row) = *row else { continue };
            for (j, col) in cols.iter().enumerate() {
                let Some(col) = *col else { continue };
                self.add(row, col, block[(i, j)])?;
            }
        }
        Ok(())
    }

    /// Called once all values of a pass have been added.
    fn finish(&mut self) {}

    /// Releases structure and values.
    fn free(&mut self);
}

pub trait Vector {
    fn alloc(&mut self, len: usize);

    fn zero(&mut self);

    fn add(&mut self, index: usize, value: f64);

    fn finish(&mut self) {}

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Matrix backend producing a [`CsrMatrix`].
#[derive(Debug, Clone, Default)]
pub struct CsrBackend {
    size: usize,
    pending: Vec<(usize, usize)>,
    matrix: Option<CsrMatrix<f64>>,
}

impl CsrBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matrix(&self) -> Option<&CsrMatrix<f64>> {
        self.matrix.as_ref()
    }

    pub fn into_matrix(self) -> Option<CsrMatrix<f64>> {
        self.matrix
    }

    pub fn pattern(&self) -> Option<&SparsityPattern> {
        self.matrix.as_ref().map(CsrMatrix::pattern)
    }

    pub fn nnz(&self) -> usize {
        self.matrix.as_ref().map_or(0, CsrMatrix::nnz)
    }

    /// Value at `(row, col)`, zero outside the pattern.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix
            .as_ref()
            .and_then(|m| m.get_entry(row, col))
            .map_or(0.0, |entry| entry.into_value())
    }
}

impl SparseMatrix for CsrBackend {
    fn size(&self) -> usize {
        self.size
    }

    fn prealloc(&mut self, size: usize) {
        self.size = size;
        self.pending.clear();
        self.matrix = None;
    }

    fn pre_add(&mut self, row: usize, col: usize) {
        self.pending.push((row, col));
    }

    fn alloc(&mut self) -> eyre::Result<()> {
        let mut coordinates = std::mem::take(&mut self.pending);
        coordinates.par_sort_unstable();
        coordinates.dedup();

        let num_rows = self.size;
        let mut row_offsets = Vec::with_capacity(num_rows + 1);
        let mut column_indices = Vec::with_capacity(coordinates.len());
        row_offsets.push(0);
        let mut current_row = 0;
        for (i, j) in coordinates {
            if i >= num_rows || j >= num_rows {
                return Err(eyre!("entry ({i}, {j}) lies outside a {num_rows}x{num_rows} matrix"));
            }
            while i > current_row {
                row_offsets.push(column_indices.len());
                current_row += 1;
            }
            column_indices.push(j);
        }
        while row_offsets.len() < num_rows + 1 {
            row_offsets.push(column_indices.len());
        }

        let pattern = SparsityPattern::try_from_offsets_and_indices(num_rows, num_rows, row_offsets, column_indices)
            .map_err(|e| eyre!("invalid sparsity pattern: {e}"))?;
        let nnz = pattern.nnz();
        debug!("Allocated {num_rows}x{num_rows} CSR matrix with {nnz} nonzeros");
        let matrix = CsrMatrix::try_from_pattern_and_values(pattern, vec![0.0; nnz])
            .map_err(|e| eyre!("invalid CSR matrix: {e}"))?;
        self.matrix = Some(matrix);
        Ok(())
    }

    fn zero(&mut self) {
        if let Some(matrix) = &mut self.matrix {
            matrix.values_mut().fill(0.0);
        }
    }

    fn add(&mut self, row: usize, col: usize, value: f64) -> eyre::Result<()> {
        let matrix = self.matrix.as_mut().ok_or(AssemblyError::BackendNotAllocated)?;
        let (offsets, columns, values) = matrix.csr_data_mut();
        let outside = AssemblyError::EntryOutsidePattern { row, col };
        if row + 1 >= offsets.len() {
            return Err(outside.into());
        }
        let (begin, end) = (offsets[row], offsets[row + 1]);
        let k = columns[begin..end].binary_search(&col).map_err(|_| outside)?;
        values[begin + k] += value;
        Ok(())
    }

    fn free(&mut self) {
        self.size = 0;
        self.pending = Vec::new();
        self.matrix = None;
    }
}

/// Dense load vector.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseVector {
    values: DVector<f64>,
}

impl Default for DenseVector {
    fn default() -> Self {
        Self {
            values: DVector::zeros(0),
        }
    }
}

impl DenseVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    pub fn into_values(self) -> DVector<f64> {
        self.values
    }
}

impl Vector for DenseVector {
    fn alloc(&mut self, len: usize) {
        self.values = DVector::zeros(len);
    }

    fn zero(&mut self) {
        self.values.fill(0.0);
    }

    fn add(&mut self, index: usize, value: f64) {
        self.values[index] += value;
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}
