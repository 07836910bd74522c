//! Matrix backends behind a [`GausRepr`](crate::GausRepr).
//!
//! The representation only needs a handful of elementwise primitives from its
//! storage: structural zero copies, constant fill, per-cell draws, assignment
//! and two fused zip forms. [`ReprMatrix`] names them once so the sampling and
//! accumulation code is written a single time for both the dense
//! (`nalgebra::DMatrix`) and the sparse ([`SparseMat`](crate::SparseMat))
//! backend.
//!
//! All zip operations visit cells in column-major order, so a sparse matrix
//! whose pattern covers every cell produces bit-identical results to the
//! dense backend.

use std::fmt::Debug;

use nalgebra::DMatrix;

use crate::Float;

/// Elementwise storage contract for the Gaussian representation.
///
/// Implementations may assume the caller has already checked that every
/// operand has the same `(rows, cols)` shape as `self`.
pub trait ReprMatrix: Clone + Debug {
    /// Element type.
    type Scalar: Float;

    /// Number of rows.
    fn nrows(&self) -> usize;

    /// Number of columns.
    fn ncols(&self) -> usize;

    /// `(rows, cols)`.
    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    /// A zero-valued matrix with the same shape and structure as `self`.
    fn zeros_like(&self) -> Self;

    /// Set every stored cell to `value`.
    fn fill(&mut self, value: Self::Scalar);

    /// Overwrite every stored cell, column-major, with successive calls to `draw`.
    fn fill_with<G: FnMut() -> Self::Scalar>(&mut self, draw: G);

    /// Copy `src` into `self`, keeping the structure of `self`.
    fn assign(&mut self, src: &Self);

    /// Replace `self` by `src`, keeping the structure of `self`.
    ///
    /// Backends that can adopt the buffer outright override this.
    fn assign_owned(&mut self, src: Self) {
        self.assign(&src);
    }

    /// `self[c] = f(self[c], b[c])` for every stored cell `c`.
    fn zip_apply<G: FnMut(Self::Scalar, Self::Scalar) -> Self::Scalar>(&mut self, b: &Self, f: G);

    /// `self[c] = f(self[c], b[c], c[c])` for every stored cell `c`.
    fn zip_zip_apply<G>(&mut self, b: &Self, c: &Self, f: G)
    where
        G: FnMut(Self::Scalar, Self::Scalar, Self::Scalar) -> Self::Scalar;
}

impl<F: Float> ReprMatrix for DMatrix<F> {
    type Scalar = F;

    #[inline]
    fn nrows(&self) -> usize {
        self.shape().0
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.shape().1
    }

    fn zeros_like(&self) -> Self {
        let (n, m) = self.shape();
        DMatrix::zeros(n, m)
    }

    fn fill(&mut self, value: F) {
        DMatrix::fill(self, value);
    }

    fn fill_with<G: FnMut() -> F>(&mut self, mut draw: G) {
        self.iter_mut().for_each(|x| *x = draw());
    }

    fn assign(&mut self, src: &Self) {
        self.as_mut_slice().copy_from_slice(src.as_slice());
    }

    fn assign_owned(&mut self, src: Self) {
        *self = src;
    }

    fn zip_apply<G: FnMut(F, F) -> F>(&mut self, b: &Self, mut f: G) {
        for (x, &y) in self.as_mut_slice().iter_mut().zip(b.as_slice()) {
            *x = f(*x, y);
        }
    }

    fn zip_zip_apply<G: FnMut(F, F, F) -> F>(&mut self, b: &Self, c: &Self, mut f: G) {
        for ((x, &y), &z) in self
            .as_mut_slice()
            .iter_mut()
            .zip(b.as_slice())
            .zip(c.as_slice())
        {
            *x = f(*x, y, z);
        }
    }
}
