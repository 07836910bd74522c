use crate::Float;

/// Numeric settings for a [`GausRepr`](crate::GausRepr).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReprConfig<F> {
    /// Additive floor applied to the variance before dividing by it or its
    /// square root when forming the score terms (default: 1e-8).
    pub var_floor: F,
}

impl<F: Float> Default for ReprConfig<F> {
    fn default() -> Self {
        ReprConfig {
            var_floor: F::from_f64(1e-8).unwrap_or_else(F::epsilon),
        }
    }
}
