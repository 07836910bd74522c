//! Sparse backend: CSC matrices with a structural pattern fixed at construction.
//!
//! [`SparseMat`] wraps [`nalgebra_sparse::CscMatrix`]. Shape copies
//! ([`ReprMatrix::zeros_like`]) keep the pattern, so every field of a sparse
//! [`GausRepr`](crate::GausRepr) built from one template is structurally equal
//! and the elementwise kernels run directly over the value arrays.
//!
//! Operands with a different pattern are read positionally at the entries of
//! the working pattern; values outside it are ignored and missing entries
//! read as zero.

use std::borrow::Cow;

use nalgebra::DMatrix;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::backend::ReprMatrix;
use crate::error::ReprError;
use crate::Float;

fn check_dims(rows: usize, cols: usize) -> Result<(), ReprError> {
    if rows == 0 || cols == 0 {
        return Err(ReprError::EmptyShape { rows, cols });
    }
    Ok(())
}

/// Sparse matrix in CSC layout.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMat<F> {
    csc: CscMatrix<F>,
}

impl<F> From<CscMatrix<F>> for SparseMat<F> {
    fn from(csc: CscMatrix<F>) -> Self {
        SparseMat { csc }
    }
}

impl<F: Float> SparseMat<F> {
    /// Build from `(row, col, value)` triplets. Duplicate positions are summed.
    ///
    /// Every listed position becomes a structural entry, including explicit zeros.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, F)],
    ) -> Result<Self, ReprError> {
        check_dims(nrows, ncols)?;
        let coo = CooMatrix::try_from_triplets(
            nrows,
            ncols,
            triplets.iter().map(|t| t.0).collect(),
            triplets.iter().map(|t| t.1).collect(),
            triplets.iter().map(|t| t.2).collect(),
        )?;
        Ok(SparseMat {
            csc: CscMatrix::from(&coo),
        })
    }

    /// Build from raw CSC arrays, validating their consistency.
    pub fn from_csc(
        nrows: usize,
        ncols: usize,
        col_ptr: Vec<usize>,
        row_idx: Vec<usize>,
        values: Vec<F>,
    ) -> Result<Self, ReprError> {
        check_dims(nrows, ncols)?;
        // try_from_csc_data slices each column before it checks offset order.
        if col_ptr.windows(2).any(|w| w[0] > w[1])
            || col_ptr.last().is_some_and(|&end| end > row_idx.len())
        {
            return Err(ReprError::InvalidStructure(format!(
                "column offsets {col_ptr:?} are not non-decreasing within 0..={}",
                row_idx.len()
            )));
        }
        let csc = CscMatrix::try_from_csc_data(nrows, ncols, col_ptr, row_idx, values)?;
        Ok(SparseMat { csc })
    }

    /// Dense-equivalent sparse copy: every cell of `dense` becomes a structural entry.
    pub fn from_dense(dense: &DMatrix<F>) -> Result<Self, ReprError> {
        let (n, m) = dense.shape();
        Self::from_csc(
            n,
            m,
            (0..=m).map(|j| j * n).collect(),
            (0..m).flat_map(|_| 0..n).collect(),
            dense.as_slice().to_vec(),
        )
    }

    /// The `n × n` identity with a diagonal pattern.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn identity(n: usize) -> Self {
        assert!(n > 0, "{}", ReprError::EmptyShape { rows: n, cols: n });
        SparseMat {
            csc: CscMatrix::identity(n),
        }
    }

    /// Underlying `nalgebra_sparse` matrix.
    pub fn as_csc(&self) -> &CscMatrix<F> {
        &self.csc
    }

    /// Structural pattern.
    pub fn pattern(&self) -> &SparsityPattern {
        self.csc.pattern()
    }

    /// Number of structural entries.
    pub fn nnz(&self) -> usize {
        self.csc.nnz()
    }

    /// Stored values in column-major storage order.
    pub fn values(&self) -> &[F] {
        self.csc.values()
    }

    /// Value at `(i, j)`; zero when the entry is not structural or out of range.
    pub fn get(&self, i: usize, j: usize) -> F {
        self.csc
            .get_entry(i, j)
            .map_or_else(F::zero, |entry| entry.into_value())
    }

    /// Whether both matrices have the same structural pattern.
    pub fn same_structure(&self, other: &Self) -> bool {
        self.csc.pattern() == other.csc.pattern()
    }

    /// Elementwise map over the stored values, keeping the structure.
    pub fn map<G: FnMut(F) -> F>(&self, mut f: G) -> Self {
        let mut out = self.clone();
        for v in out.csc.values_mut() {
            *v = f(*v);
        }
        out
    }

    /// Dense copy.
    pub fn to_dense(&self) -> DMatrix<F> {
        DMatrix::from(&self.csc)
    }
}

/// Values of `other` read at the entries of `pattern`.
fn aligned<'a, F: Float>(pattern: &SparsityPattern, other: &'a SparseMat<F>) -> Cow<'a, [F]> {
    if pattern == other.pattern() {
        Cow::Borrowed(other.values())
    } else {
        Cow::Owned(
            (0..pattern.major_dim())
                .flat_map(|j| pattern.lane(j).iter().map(move |&i| other.get(i, j)))
                .collect(),
        )
    }
}

impl<F: Float> ReprMatrix for SparseMat<F> {
    type Scalar = F;

    fn nrows(&self) -> usize {
        self.csc.nrows()
    }

    fn ncols(&self) -> usize {
        self.csc.ncols()
    }

    fn zeros_like(&self) -> Self {
        self.map(|_| F::zero())
    }

    fn fill(&mut self, value: F) {
        self.csc.values_mut().fill(value);
    }

    fn fill_with<G: FnMut() -> F>(&mut self, draw: G) {
        self.csc.values_mut().fill_with(draw);
    }

    fn assign(&mut self, src: &Self) {
        let src = aligned(self.csc.pattern(), src);
        self.csc.values_mut().copy_from_slice(&src);
    }

    fn assign_owned(&mut self, src: Self) {
        if self.same_structure(&src) {
            *self = src;
        } else {
            self.assign(&src);
        }
    }

    fn zip_apply<G: FnMut(F, F) -> F>(&mut self, b: &Self, mut f: G) {
        let b = aligned(self.csc.pattern(), b);
        for (x, &y) in self.csc.values_mut().iter_mut().zip(b.iter()) {
            *x = f(*x, y);
        }
    }

    fn zip_zip_apply<G: FnMut(F, F, F) -> F>(&mut self, b: &Self, c: &Self, mut f: G) {
        let b = aligned(self.csc.pattern(), b);
        let c = aligned(self.csc.pattern(), c);
        for ((x, &y), &z) in self.csc.values_mut().iter_mut().zip(b.iter()).zip(c.iter()) {
            *x = f(*x, y, z);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseMat<f64> {
        // [1 0 4]
        // [0 3 0]
        // [2 0 5]
        SparseMat::from_triplets(
            3,
            3,
            &[(0, 0, 1.0), (2, 0, 2.0), (1, 1, 3.0), (0, 2, 4.0), (2, 2, 5.0)],
        )
        .unwrap()
    }

    #[test]
    fn triplets_are_stored_column_major() {
        let a = SparseMat::from_triplets(2, 2, &[(1, 1, 4.0), (0, 0, 1.0), (1, 0, 2.0)]).unwrap();
        assert_eq!(a.pattern().major_offsets(), &[0, 2, 3]);
        assert_eq!(a.pattern().minor_indices(), &[0, 1, 1]);
        assert_eq!(a.values(), &[1.0, 2.0, 4.0]);
    }

    #[test]
    fn duplicate_triplets_are_summed() {
        let a = SparseMat::from_triplets(2, 2, &[(0, 1, 1.5), (0, 1, 2.0)]).unwrap();
        assert_eq!(a.nnz(), 1);
        assert_eq!(a.get(0, 1), 3.5);
    }

    #[test]
    fn out_of_bounds_triplet_is_rejected() {
        let err = SparseMat::from_triplets(2, 2, &[(2, 0, 1.0)]).unwrap_err();
        assert!(matches!(err, ReprError::InvalidStructure(_)));
    }

    #[test]
    fn empty_shape_is_rejected() {
        let err = SparseMat::<f64>::from_triplets(0, 3, &[]).unwrap_err();
        assert_eq!(err, ReprError::EmptyShape { rows: 0, cols: 3 });

        let err = SparseMat::from_dense(&DMatrix::<f64>::zeros(2, 0)).unwrap_err();
        assert_eq!(err, ReprError::EmptyShape { rows: 2, cols: 0 });
    }

    #[test]
    fn malformed_csc_is_rejected() {
        let err = SparseMat::from_csc(2, 2, vec![0, 1], vec![0], vec![1.0]).unwrap_err();
        assert!(matches!(err, ReprError::InvalidStructure(_)));

        let err = SparseMat::from_csc(2, 1, vec![0, 2], vec![1, 0], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, ReprError::InvalidStructure(_)));
    }

    #[test]
    fn decreasing_column_offsets_are_rejected() {
        let err = SparseMat::from_csc(6, 2, vec![0, 5, 2], vec![0, 1], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, ReprError::InvalidStructure(_)));
    }

    #[test]
    fn get_reads_zero_outside_pattern() {
        let a = sample();
        assert_eq!(a.get(2, 0), 2.0);
        assert_eq!(a.get(1, 0), 0.0);
        assert_eq!(a.get(5, 5), 0.0);
    }

    #[test]
    fn shape_copies_keep_the_pattern() {
        let a = sample();
        let z = a.zeros_like();
        assert!(a.same_structure(&z));
        assert!(z.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn assign_projects_foreign_pattern() {
        let mut diag = SparseMat::<f64>::identity(3).zeros_like();
        diag.assign(&sample());
        assert_eq!(diag.values(), &[1.0, 3.0, 5.0]);
    }

    #[test]
    fn zip_apply_reads_missing_entries_as_zero() {
        let mut diag = SparseMat::<f64>::identity(2);
        let off = SparseMat::from_triplets(2, 2, &[(0, 1, 7.0), (1, 1, 2.0)]).unwrap();
        diag.zip_apply(&off, |a, b| a + b);
        assert_eq!(diag.values(), &[1.0, 3.0]);
    }

    #[test]
    fn dense_equivalent_pattern_covers_every_cell() {
        let d = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 3.0, 4.0, 5.0, 0.0]);
        let s = SparseMat::from_dense(&d).unwrap();
        assert_eq!(s.nnz(), 6);
        assert_eq!(s.to_dense(), d);
    }
}
