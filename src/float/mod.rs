//! Generic [Float] type which acts as a stand-in for `f32` or `f64`.
use rustfft::num_traits::float::FloatCore as NumFloatCore;
use rustfft::FftNum;
use std::fmt::{Debug, Display};

/// Signals are processed as arrays of [Float]s. A [Float] is normally `f32` or `f64`.
///
/// The bound on [FftNum] lets the same sample type feed the FFT path of the
/// difference function.
pub trait Float: Display + Debug + NumFloatCore + FftNum + std::iter::Sum {
    /// Convert a configuration constant (always stored as `f64`) into `Self`.
    fn from_config(value: f64) -> Self {
        Self::from_f64(value).unwrap_or_else(Self::nan)
    }

    /// Convert a lag or sample rate into `Self`.
    fn from_count(value: usize) -> Self {
        Self::from_usize(value).unwrap_or_else(Self::nan)
    }
}

impl Float for f64 {}
impl Float for f32 {}
