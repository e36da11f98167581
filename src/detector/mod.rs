use crate::detector::internals::Pitch;
use crate::float::Float;

pub mod autocorrelation;
pub mod internals;
pub mod yin;

/// A monophonic pitch estimator.
///
/// `get_pitch` never fails: degenerate input, silence and numerical trouble all
/// resolve to [Pitch::none]. Detectors hold only their configuration, so calling
/// `get_pitch` twice on the same buffer gives bit-identical results, and a
/// detector can be shared across threads.
pub trait PitchDetector<T>
where
    T: Float,
{
    fn get_pitch(&self, signal: &[T], sample_rate: usize) -> Pitch<T>;
}
