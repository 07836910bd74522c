//! Control-variate stochastic gradients for diagonal Gaussians.
//!
//! A [`GausRepr`] holds the mean and variance of an `n × m` grid of
//! independent Gaussians, draws reparameterized samples
//! `Eta = Mean + Eps ⊙ sqrt(Var)`, and accumulates a caller-supplied
//! per-cell statistic `F` evaluated at each sample into low-variance
//! estimates of the gradients with respect to the mean and the variance.
//!
//! Storage is either dense ([`nalgebra::DMatrix`]) or sparse ([`SparseMat`],
//! a `nalgebra_sparse` CSC matrix whose structural pattern every field keeps).
//!
//! ```
//! use gausrepr::DenseRepr;
//! use nalgebra::DMatrix;
//!
//! let mut repr = DenseRepr::<f64>::dense(2, 2);
//! repr.update_var(&DMatrix::from_element(2, 2, 1.0));
//!
//! let draws = [0.3, -1.2, 0.8, 0.1, -0.4, 1.5, -0.9, 0.2];
//! let mut next = draws.iter().copied().cycle();
//! for _ in 0..2 {
//!     let eta = repr.sample(|| next.next().unwrap_or(0.0)).clone();
//!     let f = eta.map(|x| -0.5 * x * x);
//!     repr.accumulate_gradient(&f);
//! }
//!
//! let g1 = repr.gradient_mean();
//! assert_eq!(g1.shape(), (2, 2));
//! assert_eq!(repr.pending_observations(), 0);
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod float;
pub mod repr;
pub mod rotation;
pub mod sparse;

pub use backend::ReprMatrix;
pub use config::ReprConfig;
pub use error::ReprError;
pub use float::Float;
pub use repr::{DenseRepr, GausRepr, SparseRepr};
pub use rotation::{NoRotation, Rotation, RotationOperator, NO_ROTATION};
pub use sparse::SparseMat;
