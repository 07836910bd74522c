//! Gaussian representation: sampling and control-variate gradient accumulation.
//!
//! # Estimator
//!
//! For `Eta = Mean + Eps ⊙ Sd` with `Eps ~ N(0, 1)` elementwise, the gradients
//! of `E[f(Eta)]` with respect to the mean and the variance are
//!
//! ```text
//! G1 = E[ F · Eps / Sd ]
//! G2 = 1/2 · E[ F · (Eps² − 1) / Var ]
//! ```
//!
//! where `F` is the per-cell statistic evaluated at the sampled value. Both
//! score terms have zero expectation, so the sample mean of `F` can be used as
//! a control variate. Over `N` observations:
//!
//! ```text
//! G1 = mean_s(Eps_s / Sd · F_s)              − mean_s(F_s) · mean_s(Eps_s / Sd)
//! G2 = 1/2 · mean_s((Eps_s² − 1) / Var · F_s) − 1/2 · mean_s(F_s) · mean_s((Eps_s² − 1) / Var)
//! ```
//!
//! The accumulator keeps the five running sums this needs and turns them into
//! `G1` / `G2` on the first gradient read after a change.
//!
//! # Protocol
//!
//! One owner drives the cycle `sample → accumulate_gradient (× N) → read
//! gradients → update_mean / update_var`. [`GausRepr::accumulate_gradient`]
//! uses the noise of the most recent [`GausRepr::sample`] call, so the
//! statistic must be computed from that sample before the next draw.
//!
//! Reading gradients consumes the accumulated window. A read with no new
//! observations returns the previous estimate unchanged;
//! [`GausRepr::has_fresh_gradient`] tells the two cases apart.

use nalgebra::DMatrix;
use num_traits::{Float as _, One, Zero};
use tracing::{debug, trace};

use crate::backend::ReprMatrix;
use crate::config::ReprConfig;
use crate::error::{check_shape, ReprError};
use crate::rotation::{NoRotation, Rotation, RotationOperator};
use crate::sparse::SparseMat;
use crate::Float;

/// Dense-backed representation.
pub type DenseRepr<F> = GausRepr<DMatrix<F>>;

/// Sparse-backed representation.
pub type SparseRepr<F> = GausRepr<SparseMat<F>>;

/// Observation count as a scalar.
#[inline]
fn count<F: Float>(n: usize) -> F {
    F::from_usize(n).unwrap_or_else(F::infinity)
}

/// `eps / sqrt(var + floor)`.
#[inline]
fn eps_over_sd<F: Float>(eps: F, var: F, floor: F) -> F {
    eps / (floor + var).sqrt()
}

/// `(eps² − 1) / (var + floor)`.
#[inline]
fn eps_sq_over_var<F: Float>(eps: F, var: F, floor: F) -> F {
    (eps * eps - F::one()) / (floor + var)
}

/// Accumulator state for an `n × m` grid of independent Gaussians.
#[derive(Debug, Clone)]
pub struct GausRepr<M: ReprMatrix> {
    n: usize,
    m: usize,
    config: ReprConfig<M::Scalar>,

    /// Stochastic gradient w.r.t. the mean.
    g1: M,
    /// Stochastic gradient w.r.t. the variance.
    g2: M,
    /// `mean + eps ⊙ sqrt(var)`.
    eta: M,
    eps: M,
    mean: M,
    var: M,

    f_cum: M,
    /// Σ F ⊙ eps / sd
    f_eps_sd_cum: M,
    /// Σ F ⊙ (eps² − 1) / var
    f_eps1_var_cum: M,
    /// Σ eps / sd
    eps_sd_cum: M,
    /// Σ (eps² − 1) / var
    eps1_var_cum: M,

    // scratch for the current observation
    eps_sd: M,
    eps1_var: M,

    summarized: bool,
    /// `g1`/`g2` were computed from observations, not carried over by a stale read.
    fresh: bool,
    n_add_sgd: usize,
}

impl<F: Float> GausRepr<DMatrix<F>> {
    /// Zeroed dense representation of shape `n × m`.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0` or `m == 0`.
    pub fn dense(n: usize, m: usize) -> Self {
        Self::dense_with_config(n, m, ReprConfig::default())
    }

    /// Like [`dense`](Self::dense) with explicit numeric settings.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0` or `m == 0`.
    pub fn dense_with_config(n: usize, m: usize, config: ReprConfig<F>) -> Self {
        assert!(
            n > 0 && m > 0,
            "{}",
            ReprError::EmptyShape { rows: n, cols: m }
        );
        Self::like_with_config(&DMatrix::zeros(n, m), config)
    }
}

impl<F: Float> GausRepr<SparseMat<F>> {
    /// Zeroed sparse representation whose fields all take the structural
    /// pattern of `template`.
    pub fn from_pattern(template: &SparseMat<F>) -> Self {
        Self::like(template)
    }
}

impl<M: ReprMatrix> GausRepr<M> {
    /// Zeroed representation with the shape (and, for sparse storage, the
    /// structure) of `template`. The template's values are ignored.
    pub fn like(template: &M) -> Self {
        Self::like_with_config(template, ReprConfig::default())
    }

    /// Like [`like`](Self::like) with explicit numeric settings.
    pub fn like_with_config(template: &M, config: ReprConfig<M::Scalar>) -> Self {
        let zero = template.zeros_like();
        let (n, m) = zero.shape();
        GausRepr {
            n,
            m,
            config,
            g1: zero.clone(),
            g2: zero.clone(),
            eta: zero.clone(),
            eps: zero.clone(),
            mean: zero.clone(),
            var: zero.clone(),
            f_cum: zero.clone(),
            f_eps_sd_cum: zero.clone(),
            f_eps1_var_cum: zero.clone(),
            eps_sd_cum: zero.clone(),
            eps1_var_cum: zero.clone(),
            eps_sd: zero.clone(),
            eps1_var: zero,
            summarized: false,
            fresh: false,
            n_add_sgd: 0,
        }
    }

    /// Zero every field and counter in place, keeping shape and structure.
    pub fn reset(&mut self) {
        let zero = M::Scalar::zero();
        for x in [
            &mut self.g1,
            &mut self.g2,
            &mut self.eta,
            &mut self.eps,
            &mut self.mean,
            &mut self.var,
            &mut self.f_cum,
            &mut self.f_eps_sd_cum,
            &mut self.f_eps1_var_cum,
            &mut self.eps_sd_cum,
            &mut self.eps1_var_cum,
            &mut self.eps_sd,
            &mut self.eps1_var,
        ] {
            x.fill(zero);
        }
        self.n_add_sgd = 0;
        self.summarized = false;
        self.fresh = false;
        debug!(rows = self.n, cols = self.m, "gaussian representation reset");
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.n
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.m
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.n, self.m)
    }

    /// Numeric settings in use.
    pub fn config(&self) -> &ReprConfig<M::Scalar> {
        &self.config
    }

    /// Current mean.
    pub fn mean(&self) -> &M {
        &self.mean
    }

    /// Current variance.
    pub fn var(&self) -> &M {
        &self.var
    }

    /// Noise of the latest draw, after rotation.
    pub fn noise(&self) -> &M {
        &self.eps
    }

    /// Value produced by the latest [`sample`](Self::sample) call.
    pub fn sampled_value(&self) -> &M {
        &self.eta
    }

    /// Observations accumulated since the gradients were last read.
    pub fn pending_observations(&self) -> usize {
        self.n_add_sgd
    }

    /// Whether the cached gradients reflect the current state.
    pub fn is_summarized(&self) -> bool {
        self.summarized
    }

    /// Whether a gradient read now yields an estimate built from observations
    /// made since the last reset or stale read, rather than a carried-over one.
    pub fn has_fresh_gradient(&self) -> bool {
        self.n_add_sgd > 0 || (self.summarized && self.fresh)
    }

    /// Gradient estimate with respect to the mean.
    pub fn gradient_mean(&mut self) -> &M {
        if !self.summarized {
            self.summarize();
        }
        &self.g1
    }

    /// Gradient estimate with respect to the variance.
    pub fn gradient_var(&mut self) -> &M {
        if !self.summarized {
            self.summarize();
        }
        &self.g2
    }

    /// Both gradient estimates, `(mean, variance)`.
    pub fn gradients(&mut self) -> (&M, &M) {
        if !self.summarized {
            self.summarize();
        }
        (&self.g1, &self.g2)
    }

    fn summarize(&mut self) {
        if self.n_add_sgd > 0 {
            let n: M::Scalar = count(self.n_add_sgd);
            let half = M::Scalar::one() / (M::Scalar::one() + M::Scalar::one());

            self.g1.assign(&self.f_eps_sd_cum);
            self.g1
                .zip_zip_apply(&self.eps_sd_cum, &self.f_cum, |acc, score, f| {
                    (acc - score * (f / n)) / n
                });

            self.g2.assign(&self.f_eps1_var_cum);
            self.g2
                .zip_zip_apply(&self.eps1_var_cum, &self.f_cum, |acc, score, f| {
                    half * (acc - score * (f / n)) / n
                });

            self.fresh = true;
            trace!(observations = self.n_add_sgd, "summarized stochastic gradients");
        } else {
            self.fresh = false;
            debug!("no observations since the last read, keeping cached gradients");
        }
        self.summarized = true;
        self.n_add_sgd = 0;
    }

    // ── Sampler ──

    /// Draw fresh noise and return `mean + eps ⊙ sqrt(var)`.
    ///
    /// `rnorm` is called once per stored cell, column-major.
    pub fn sample<G>(&mut self, rnorm: G) -> &M
    where
        G: FnMut() -> M::Scalar,
    {
        self.sample_rotated::<NoRotation, NoRotation, G>(
            Rotation::Identity,
            Rotation::Identity,
            rnorm,
        )
    }

    /// Draw fresh noise, rotate it to `left * eps * right`, and return
    /// `mean + eps ⊙ sqrt(var)`.
    ///
    /// A [`Rotation::Identity`] side is skipped without any multiplication.
    /// For sparse storage the rotated noise is written back onto the working
    /// structural pattern; product entries outside it are dropped.
    ///
    /// Negative variances are not checked and yield NaN.
    ///
    /// # Panics
    ///
    /// Panics if the rotated noise is not `n × m`, i.e. `left` is not
    /// `n × n` or `right` is not `m × m`.
    pub fn sample_rotated<L, R, G>(
        &mut self,
        left: Rotation<'_, L>,
        right: Rotation<'_, R>,
        mut rnorm: G,
    ) -> &M
    where
        L: RotationOperator<M> + ?Sized,
        R: RotationOperator<M> + ?Sized,
        G: FnMut() -> M::Scalar,
    {
        self.eps.fill_with(&mut rnorm);

        let rotated = match (left, right) {
            (Rotation::Identity, Rotation::Identity) => None,
            (Rotation::Operator(l), Rotation::Identity) => Some(l.rotate_left(&self.eps)),
            (Rotation::Identity, Rotation::Operator(r)) => Some(r.rotate_right(&self.eps)),
            (Rotation::Operator(l), Rotation::Operator(r)) => {
                Some(r.rotate_right(&l.rotate_left(&self.eps)))
            }
        };
        if let Some(rotated) = rotated {
            if let Err(e) = check_shape("rotated noise", (self.n, self.m), rotated.shape()) {
                panic!("{e}");
            }
            self.eps.assign_owned(rotated);
        }

        self.eta.assign(&self.mean);
        self.eta
            .zip_zip_apply(&self.eps, &self.var, |mean, eps, var| mean + eps * var.sqrt());
        &self.eta
    }

    // ── Accumulator ──

    /// Fold the statistic `f` of the latest sample into the running sums.
    ///
    /// # Panics
    ///
    /// Panics if `f` is not `n × m`.
    pub fn accumulate_gradient(&mut self, f: &M) {
        if let Err(e) = self.try_accumulate_gradient(f) {
            panic!("{e}");
        }
    }

    /// Fallible form of [`accumulate_gradient`](Self::accumulate_gradient).
    pub fn try_accumulate_gradient(&mut self, f: &M) -> Result<(), ReprError> {
        check_shape("statistic", (self.n, self.m), f.shape())?;
        let floor = self.config.var_floor;

        self.eps_sd.assign(&self.eps);
        self.eps_sd
            .zip_apply(&self.var, |eps, var| eps_over_sd(eps, var, floor));
        self.eps1_var.assign(&self.eps);
        self.eps1_var
            .zip_apply(&self.var, |eps, var| eps_sq_over_var(eps, var, floor));

        if self.n_add_sgd == 0 {
            self.f_cum.assign(f);
            self.eps_sd_cum.assign(&self.eps_sd);
            self.eps1_var_cum.assign(&self.eps1_var);
            self.f_eps_sd_cum.assign(f);
            self.f_eps_sd_cum.zip_apply(&self.eps_sd, |f, s| f * s);
            self.f_eps1_var_cum.assign(f);
            self.f_eps1_var_cum.zip_apply(&self.eps1_var, |f, s| f * s);
        } else {
            self.f_cum.zip_apply(f, |acc, f| acc + f);
            self.eps_sd_cum.zip_apply(&self.eps_sd, |acc, s| acc + s);
            self.eps1_var_cum.zip_apply(&self.eps1_var, |acc, s| acc + s);
            self.f_eps_sd_cum
                .zip_zip_apply(f, &self.eps_sd, |acc, f, s| acc + f * s);
            self.f_eps1_var_cum
                .zip_zip_apply(f, &self.eps1_var, |acc, f, s| acc + f * s);
        }

        self.n_add_sgd += 1;
        self.summarized = false;
        Ok(())
    }

    /// Overwrite the mean.
    ///
    /// # Panics
    ///
    /// Panics if `mean` is not `n × m`.
    pub fn update_mean(&mut self, mean: &M) {
        if let Err(e) = self.try_update_mean(mean) {
            panic!("{e}");
        }
    }

    /// Fallible form of [`update_mean`](Self::update_mean).
    pub fn try_update_mean(&mut self, mean: &M) -> Result<(), ReprError> {
        check_shape("mean", (self.n, self.m), mean.shape())?;
        self.mean.assign(mean);
        self.summarized = false;
        Ok(())
    }

    /// Overwrite the variance. Values are not checked for negativity.
    ///
    /// # Panics
    ///
    /// Panics if `var` is not `n × m`.
    pub fn update_var(&mut self, var: &M) {
        if let Err(e) = self.try_update_var(var) {
            panic!("{e}");
        }
    }

    /// Fallible form of [`update_var`](Self::update_var).
    pub fn try_update_var(&mut self, var: &M) -> Result<(), ReprError> {
        check_shape("variance", (self.n, self.m), var.shape())?;
        self.var.assign(var);
        self.summarized = false;
        Ok(())
    }

    /// Fold the pending observations of `other` into `self`.
    ///
    /// The running sums are plain additions, so accumulating a window across
    /// several representations and merging gives the same estimate as
    /// accumulating it in one. `other` is left untouched.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn merge(&mut self, other: &Self) {
        if let Err(e) = self.try_merge(other) {
            panic!("{e}");
        }
    }

    /// Fallible form of [`merge`](Self::merge).
    pub fn try_merge(&mut self, other: &Self) -> Result<(), ReprError> {
        check_shape("merged representation", (self.n, self.m), other.shape())?;
        if other.n_add_sgd == 0 {
            return Ok(());
        }

        let sums = [
            (&mut self.f_cum, &other.f_cum),
            (&mut self.f_eps_sd_cum, &other.f_eps_sd_cum),
            (&mut self.f_eps1_var_cum, &other.f_eps1_var_cum),
            (&mut self.eps_sd_cum, &other.eps_sd_cum),
            (&mut self.eps1_var_cum, &other.eps1_var_cum),
        ];
        if self.n_add_sgd == 0 {
            for (dst, src) in sums {
                dst.assign(src);
            }
        } else {
            for (dst, src) in sums {
                dst.zip_apply(src, |a, b| a + b);
            }
        }

        self.n_add_sgd += other.n_add_sgd;
        self.summarized = false;
        debug!(
            merged = other.n_add_sgd,
            pending = self.n_add_sgd,
            "merged gradient accumulators"
        );
        Ok(())
    }
}
