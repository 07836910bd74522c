//! Optional linear transforms applied to the noise matrix before scaling.
//!
//! Sampling computes `Eps <- L * Eps * R` to induce correlation across rows
//! (`L`, `n × n`) and columns (`R`, `m × m`). Either side may be absent:
//! [`Rotation::Identity`] skips the product entirely instead of multiplying by
//! an identity matrix, so an unrotated draw is never touched.

use nalgebra::DMatrix;

use crate::sparse::SparseMat;
use crate::Float;

/// A linear operator that can multiply a noise matrix of type `M` from either side.
pub trait RotationOperator<M> {
    /// `self * operand`.
    fn rotate_left(&self, operand: &M) -> M;

    /// `operand * self`.
    fn rotate_right(&self, operand: &M) -> M;
}

/// One side of a sampling rotation: absent, or a borrowed operator.
#[derive(Debug)]
pub enum Rotation<'a, R: ?Sized> {
    /// No transform on this side.
    Identity,
    /// Multiply by the borrowed operator.
    Operator(&'a R),
}

impl<R: ?Sized> Clone for Rotation<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: ?Sized> Copy for Rotation<'_, R> {}

impl<R: ?Sized> Default for Rotation<'_, R> {
    fn default() -> Self {
        Rotation::Identity
    }
}

impl<'a, R: ?Sized> From<&'a R> for Rotation<'a, R> {
    fn from(op: &'a R) -> Self {
        Rotation::Operator(op)
    }
}

impl<'a, R: ?Sized> From<Option<&'a R>> for Rotation<'a, R> {
    fn from(op: Option<&'a R>) -> Self {
        op.map_or(Rotation::Identity, Rotation::Operator)
    }
}

impl<R: ?Sized> Rotation<'_, R> {
    /// Whether this side is the no-op.
    pub fn is_identity(&self) -> bool {
        matches!(self, Rotation::Identity)
    }
}

/// Operator type for a side that is always [`Rotation::Identity`].
///
/// Use [`NO_ROTATION`] where a rotation argument has no operator to infer its
/// type from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoRotation;

/// The absent rotation, usable on either side of any representation.
pub const NO_ROTATION: Rotation<'static, NoRotation> = Rotation::Identity;

impl<M: Clone> RotationOperator<M> for NoRotation {
    fn rotate_left(&self, operand: &M) -> M {
        operand.clone()
    }

    fn rotate_right(&self, operand: &M) -> M {
        operand.clone()
    }
}

impl<F: Float> RotationOperator<DMatrix<F>> for DMatrix<F> {
    fn rotate_left(&self, operand: &DMatrix<F>) -> DMatrix<F> {
        self * operand
    }

    fn rotate_right(&self, operand: &DMatrix<F>) -> DMatrix<F> {
        operand * self
    }
}

impl<F: Float> RotationOperator<DMatrix<F>> for SparseMat<F> {
    fn rotate_left(&self, operand: &DMatrix<F>) -> DMatrix<F> {
        self.as_csc() * operand
    }

    // operand * self == (selfᵀ * operandᵀ)ᵀ
    fn rotate_right(&self, operand: &DMatrix<F>) -> DMatrix<F> {
        (&self.as_csc().transpose() * &operand.transpose()).transpose()
    }
}

/// Sparse noise is rotated by sparse products; the caller writes the result
/// back onto the working pattern of the noise matrix.
impl<F: Float> RotationOperator<SparseMat<F>> for SparseMat<F> {
    fn rotate_left(&self, operand: &SparseMat<F>) -> SparseMat<F> {
        SparseMat::from(self.as_csc() * operand.as_csc())
    }

    fn rotate_right(&self, operand: &SparseMat<F>) -> SparseMat<F> {
        SparseMat::from(operand.as_csc() * self.as_csc())
    }
}
