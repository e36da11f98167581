//! Windowed autocorrelation pitch detection, the fast estimator of the crate.
//!
//! Only the first [AutocorrelationConfig::window_cap] samples are analyzed and the lag range
//! is narrower than the [YIN][crate::detector::yin] default (80 Hz to 800 Hz). The mean lagged
//! product is normalized by its zero-lag value and the first local maximum above
//! [AutocorrelationConfig::early_accept] is taken as the period. Failing that, the
//! highest local maximum above [AutocorrelationConfig::peak_floor] is used.

use crate::detector::internals::{
    mean_autocorrelation, normalize_to_zero_lag, resolve, validate_samples, LagRange, Pitch,
};
use crate::detector::PitchDetector;
use crate::error::{EstimationError, Result};
use crate::float::Float;
use crate::utils::peak::first_strong_peak;

/// Tuning constants of the [AutocorrelationDetector].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct AutocorrelationConfig {
    /// Lowest detectable frequency in Hz. Default 80.
    pub min_frequency: f64,
    /// Highest detectable frequency in Hz. Default 800.
    pub max_frequency: f64,
    /// Longest analysis window. Longer signals are truncated, never padded. Default 4096.
    pub window_cap: usize,
    /// Step between the products averaged for each lag. Default 4; 0 behaves like 1.
    pub stride: usize,
    /// Local maxima at or below this normalized value are ignored. Default 0.5.
    pub peak_floor: f64,
    /// The scan stops at the first local maximum above this value. Default 0.9.
    pub early_accept: f64,
}

impl Default for AutocorrelationConfig {
    fn default() -> Self {
        AutocorrelationConfig {
            min_frequency: 80.0,
            max_frequency: 800.0,
            window_cap: 4096,
            stride: 4,
            peak_floor: 0.5,
            early_accept: 0.9,
        }
    }
}

impl AutocorrelationConfig {
    pub fn with_frequency_range(mut self, min_frequency: f64, max_frequency: f64) -> Self {
        self.min_frequency = min_frequency;
        self.max_frequency = max_frequency;
        self
    }

    pub fn with_window_cap(mut self, window_cap: usize) -> Self {
        self.window_cap = window_cap;
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_peak_floor(mut self, peak_floor: f64) -> Self {
        self.peak_floor = peak_floor;
        self
    }

    pub fn with_early_accept(mut self, early_accept: f64) -> Self {
        self.early_accept = early_accept;
        self
    }
}

/// Low-latency pitch detection from the first strong peak of the normalized autocorrelation.
#[derive(Debug, Clone, Default)]
pub struct AutocorrelationDetector {
    config: AutocorrelationConfig,
}

impl AutocorrelationDetector {
    pub fn new(config: AutocorrelationConfig) -> Self {
        AutocorrelationDetector { config }
    }

    pub fn config(&self) -> &AutocorrelationConfig {
        &self.config
    }

    fn estimate<T: Float>(&self, signal: &[T], sample_rate: usize) -> Result<Pitch<T>> {
        let config = &self.config;
        let window = &signal[..signal.len().min(config.window_cap)];
        validate_samples(window)?;

        let lags = LagRange::from_frequencies(
            sample_rate,
            config.min_frequency,
            config.max_frequency,
        )?;

        // Lags past the end of the window have no overlap and stay zero, so one
        // of them is enough to close the peak search.
        let len = lags.max.min(window.len() + 1);
        let mut acf = mean_autocorrelation(window, len, config.stride);
        normalize_to_zero_lag(&mut acf);

        let search = first_strong_peak(
            &acf,
            LagRange::new(lags.min, len),
            T::from_config(config.peak_floor),
            T::from_config(config.early_accept),
        );
        log::trace!(
            "autocorrelation: {:?} after {} of {} lags",
            search.peak,
            search.lags_scanned,
            lags.len()
        );

        let (tau, value) = search.peak.ok_or(EstimationError::NoPeriod)?;
        Ok(Pitch {
            frequency: T::from_count(sample_rate) / T::from_count(tau),
            probability: value,
        })
    }
}

impl<T> PitchDetector<T> for AutocorrelationDetector
where
    T: Float,
{
    fn get_pitch(&self, signal: &[T], sample_rate: usize) -> Pitch<T> {
        resolve("autocorrelation", self.estimate(signal, sample_rate))
    }
}
