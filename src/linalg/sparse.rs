//! Scalar CSR matrix whose pattern is the edge graph plus the diagonal.
//!
//! The pattern is fixed at construction; only values change between
//! iterations. Column indices are sorted per row so lookups are a binary
//! search.

use crate::topology::mesh::DualMesh;
use crate::topology::point::PointId;

/// Sparsity pattern in compressed-row form.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrPattern {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
}

impl CsrPattern {
    /// One row per local point; entries for the diagonal and both
    /// orientations of every edge.
    pub fn from_mesh(mesh: &DualMesh) -> Self {
        let n = mesh.n_points();
        let mut rows: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        for edge in mesh.edges() {
            let (i, j) = (edge.tail().index(), edge.head().index());
            rows[i].push(j);
            rows[j].push(i);
        }

        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);
        for mut cols in rows {
            cols.sort_unstable();
            cols.dedup();
            col_idx.extend(cols);
            row_ptr.push(col_idx.len());
        }
        Self { row_ptr, col_idx }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.row_ptr.len() - 1
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    #[inline]
    pub fn row_indices(&self, row: usize) -> &[usize] {
        &self.col_idx[self.row_ptr[row]..self.row_ptr[row + 1]]
    }

    /// Position of `(row, col)` in the value array.
    pub fn find_index(&self, row: usize, col: usize) -> Option<usize> {
        let start = self.row_ptr[row];
        self.row_indices(row)
            .binary_search(&col)
            .ok()
            .map(|local| start + local)
    }
}

/// Square scalar matrix over the local points of a partition.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseMatrix {
    pattern: CsrPattern,
    values: Vec<f64>,
}

impl SparseMatrix {
    pub fn from_mesh(mesh: &DualMesh) -> Self {
        let pattern = CsrPattern::from_mesh(mesh);
        let values = vec![0.0; pattern.nnz()];
        Self { pattern, values }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.pattern.n_rows()
    }

    #[inline]
    pub fn pattern(&self) -> &CsrPattern {
        &self.pattern
    }

    pub fn set_zero(&mut self) {
        self.values.fill(0.0);
    }

    /// `A[row, col] += value`; returns `false` if the entry is not in the pattern.
    pub fn add_block(&mut self, row: PointId, col: PointId, value: f64) -> bool {
        match self.pattern.find_index(row.index(), col.index()) {
            Some(k) => {
                self.values[k] += value;
                true
            }
            None => false,
        }
    }

    /// `A[row, col] -= value`; returns `false` if the entry is not in the pattern.
    pub fn subtract_block(&mut self, row: PointId, col: PointId, value: f64) -> bool {
        self.add_block(row, col, -value)
    }

    pub fn add_val_to_diag(&mut self, row: PointId, value: f64) {
        self.add_block(row, row, value);
    }

    /// Stored value, or zero outside the pattern.
    pub fn get(&self, row: PointId, col: PointId) -> f64 {
        self.pattern
            .find_index(row.index(), col.index())
            .map_or(0.0, |k| self.values[k])
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n_rows())
            .map(|i| {
                self.pattern
                    .find_index(i, i)
                    .map_or(0.0, |k| self.values[k])
            })
            .collect()
    }

    /// Replace `row` by the identity row.
    pub fn set_identity_row(&mut self, row: PointId) {
        let r = row.index();
        let (start, end) = (self.pattern.row_ptr[r], self.pattern.row_ptr[r + 1]);
        for k in start..end {
            self.values[k] = if self.pattern.col_idx[k] == r { 1.0 } else { 0.0 };
        }
    }

    /// `y = A·x`.
    ///
    /// # Panics
    /// Panics if `x` or `y` do not have one entry per row.
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_rows(), "x length must match the row count");
        assert_eq!(y.len(), self.n_rows(), "y length must match the row count");
        for (row, out) in y.iter_mut().enumerate() {
            let (start, end) = (self.pattern.row_ptr[row], self.pattern.row_ptr[row + 1]);
            *out = (start..end)
                .map(|k| self.values[k] * x[self.pattern.col_idx[k]])
                .sum();
        }
    }
}
