use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FloatConst, FromPrimitive, NumAssign};

/// Marker trait for base floating-point types (`f32`, `f64`).
///
/// Bundles the numeric and utility traits needed throughout gausrepr,
/// including the compound-assignment operators nalgebra requires for
/// dense matrix products.
pub trait Float:
    NumFloat
    + NumAssign
    + FloatConst
    + FromPrimitive
    + Copy
    + Send
    + Sync
    + Default
    + Debug
    + Display
    + 'static
{
}

impl Float for f32 {}
impl Float for f64 {}

