//! # Pitch Estimation
//! *pitch_estimation* estimates the fundamental frequency of a mono block of
//! audio samples, together with a confidence score.
//!
//! # Detectors
//! Two independent detectors share the [PitchDetector][detector::PitchDetector] trait and
//! the [Pitch] result:
//!
//!   * [YINDetector][detector::yin] - precise. Decimated YIN difference function over
//!     50-1000 Hz with threshold dip search and sub-sample refinement.
//!   * [AutocorrelationDetector][detector::autocorrelation] - fast. Normalized
//!     autocorrelation of at most 4096 samples over 80-800 Hz.
//!
//! Neither detector returns an error. When no pitch can be found, including for silence
//! or malformed input, the result is [Pitch::none], i.e. a frequency and probability of zero.
//! The reason is logged through the [log] facade at `debug` level.
//!
//! # Examples
//! ```
//! use pitch_estimation::detector::yin::{YINConfig, YINDetector};
//! use pitch_estimation::detector::PitchDetector;
//!
//! fn main() {
//!     const SAMPLE_RATE: usize = 44100;
//!     const SIZE: usize = 4096;
//!
//!     // Signal coming from some source (microphone, generated, etc...)
//!     let dt = 1.0 / SAMPLE_RATE as f64;
//!     let freq = 300.0;
//!     let signal: Vec<f64> = (0..SIZE)
//!         .map(|x| (2.0 * std::f64::consts::PI * x as f64 * dt * freq).sin())
//!         .collect();
//!
//!     let detector = YINDetector::new(YINConfig::default());
//!     let pitch = detector.get_pitch(&signal, SAMPLE_RATE);
//!
//!     println!("Frequency: {}, Probability: {}", pitch.frequency, pitch.probability);
//!     assert!((pitch.frequency - freq).abs() < 3.0);
//! }
//! ```

pub use detector::internals::Pitch;

pub mod detector;
mod error;
pub mod float;
pub mod utils;
