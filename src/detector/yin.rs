//! The YIN pitch detection algorithm is based on the algorithm from the paper
//! *[YIN, a fundamental frequency estimator for speech and music](http://recherche.ircam.fr/equipes/pcm/cheveign/ps/2002_JASA_YIN_proof.pdf)*.
//! This is the precise estimator of the crate: it scans a wide lag range
//! (50 Hz to 1000 Hz by default) at a cost of _O(n · lags / stride)_.
//!
//! Let $S=(s_0,s_1,\ldots,s_N)$ be a discrete signal. The *square difference function* at lag $t$
//! is defined by
//! $$ d(t) = \sum_{i=0}^{N-t} (s_i-s_{i+t})^2. $$
//! This function is close to zero when the signal "lines up" with itself. However, *close* is a relative term,
//! and the value of $d(t)$ depends on volume, which should not affect the pitch of the signal. For this
//! reason, the signal is normalized. The YIN algorithm computes the *cumulative mean normalized difference function*,
//! $$ d\'(t) = \begin{cases}1&\text{if }t=0\\\\ d(t) / \left[ \tfrac{1}{t}\sum_{i=1}^t d(i) \right] & \text{otherwise}\end{cases}. $$
//! Then, it searches for the first local minimum of $d\'(t)$ below a given threshold.
//!
//! ## Implementation
//! The sum defining $d(t)$ only visits every `stride`-th index, trading accuracy for latency.
//! Setting [YINConfig::fft] computes the full sum with an FFT instead.
//!
//! After a candidate lag is found, quadratic interpolation is applied to further refine the estimate.
//!
//! There is a single supported search strategy. A plain global-minimum scan without decimation
//! or refinement is not offered as a mode.

use crate::detector::internals::{
    difference_function, fft_difference_function, resolve, validate_samples,
    yin_normalize_square_error, LagRange, Pitch,
};
use crate::detector::PitchDetector;
use crate::error::{EstimationError, Result};
use crate::float::Float;
use crate::utils::buffer::square_sum;
use crate::utils::peak::{absolute_threshold_dip, parabolic_offset};

/// Tuning constants of the [YINDetector].
///
/// ```
/// use pitch_estimation::detector::yin::YINConfig;
///
/// let config = YINConfig::default().with_threshold(0.15).with_stride(4);
/// assert_eq!(config.stride, 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct YINConfig {
    /// Lowest detectable frequency in Hz. Sets the longest lag. Default 50.
    pub min_frequency: f64,
    /// Highest detectable frequency in Hz. Sets the shortest lag. Default 1000.
    pub max_frequency: f64,
    /// Absolute threshold on the normalized difference. The YIN paper uses 0.1.
    pub threshold: f64,
    /// Only every `stride`-th sample enters the difference sum. Larger values are
    /// faster and less accurate. Default 8; 0 behaves like 1.
    pub stride: usize,
    /// Once a dip below `threshold` is found, the scan looks at most this many lags
    /// past the lowest value seen so far. The window slides with the best lag rather
    /// than staying anchored at the first one below `threshold`, so long periods are
    /// followed to the bottom of their dip. Default 10.
    pub refine_window: usize,
    /// The local scan stops once a value exceeds `escape_ratio` times the best one. Default 1.2.
    pub escape_ratio: f64,
    /// Compute the undecimated difference function with an FFT; `stride` is ignored.
    pub fft: bool,
    /// Signals whose square sum is at or below this value are treated as silence. Default 0.
    pub power_threshold: f64,
}

impl Default for YINConfig {
    fn default() -> Self {
        YINConfig {
            min_frequency: 50.0,
            max_frequency: 1000.0,
            threshold: 0.1,
            stride: 8,
            refine_window: 10,
            escape_ratio: 1.2,
            fft: false,
            power_threshold: 0.0,
        }
    }
}

impl YINConfig {
    pub fn with_frequency_range(mut self, min_frequency: f64, max_frequency: f64) -> Self {
        self.min_frequency = min_frequency;
        self.max_frequency = max_frequency;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_refine_window(mut self, refine_window: usize) -> Self {
        self.refine_window = refine_window;
        self
    }

    pub fn with_escape_ratio(mut self, escape_ratio: f64) -> Self {
        self.escape_ratio = escape_ratio;
        self
    }

    pub fn with_fft(mut self, fft: bool) -> Self {
        self.fft = fft;
        self
    }

    pub fn with_power_threshold(mut self, power_threshold: f64) -> Self {
        self.power_threshold = power_threshold;
        self
    }
}

/// Pitch detection based on the YIN algorithm. See <http://recherche.ircam.fr/equipes/pcm/cheveign/ps/2002_JASA_YIN_proof.pdf>
#[derive(Debug, Clone, Default)]
pub struct YINDetector {
    config: YINConfig,
}

impl YINDetector {
    pub fn new(config: YINConfig) -> Self {
        YINDetector { config }
    }

    pub fn config(&self) -> &YINConfig {
        &self.config
    }

    /// Like [PitchDetector::get_pitch], but `progress` receives a percentage in `0..=100`
    /// every [PROGRESS_INTERVAL](crate::detector::internals::PROGRESS_INTERVAL) lags
    /// while the difference function is computed. A final call with 100 is not guaranteed.
    pub fn get_pitch_with_progress<T, F>(
        &self,
        signal: &[T],
        sample_rate: usize,
        mut progress: F,
    ) -> Pitch<T>
    where
        T: Float,
        F: FnMut(u8),
    {
        resolve("yin", self.estimate(signal, sample_rate, &mut progress))
    }

    fn estimate<T, F>(&self, signal: &[T], sample_rate: usize, progress: &mut F) -> Result<Pitch<T>>
    where
        T: Float,
        F: FnMut(u8),
    {
        let config = &self.config;
        validate_samples(signal)?;

        // STEP 1: Derive the lag range.
        let lags = LagRange::from_frequencies(
            sample_rate,
            config.min_frequency,
            config.max_frequency,
        )?;
        if signal.len() <= lags.max {
            return Err(EstimationError::SignalTooShort {
                len: signal.len(),
                required: lags.max,
            });
        }
        if square_sum(signal) <= T::from_config(config.power_threshold) {
            return Err(EstimationError::Silent);
        }

        // STEP 2: Calculate the difference function, d_t.
        let mut cmndf = if config.fft {
            fft_difference_function(signal, lags, progress)
        } else {
            difference_function(signal, lags, config.stride, progress)
        };
        if cmndf.iter().all(|d| *d == T::zero()) {
            return Err(EstimationError::Silent);
        }

        // STEP 3: Calculate the cumulative mean normalized difference function, d_t'.
        yin_normalize_square_error(&mut cmndf);

        // STEP 4: The absolute threshold. We want the first dip below `threshold`,
        // refined to the bottom of that dip.
        let tau = absolute_threshold_dip(
            &cmndf,
            lags,
            T::from_config(config.threshold),
            config.refine_window,
            T::from_config(config.escape_ratio),
        )
        .ok_or(EstimationError::NoPeriod)?;

        // STEP 5: Quadratic interpolation to fine-tune the lag.
        let lag = refine_lag(&cmndf, tau, lags);
        log::trace!("yin: lag {} refined to {}, d' = {}", tau, lag, cmndf[tau]);

        Ok(Pitch {
            frequency: T::from_count(sample_rate) / lag,
            probability: T::one() - cmndf[tau],
        })
    }
}

/// Fractional lag from the parabola through `tau` and its neighbours. Lags whose
/// neighbours were not both computed are returned unchanged.
fn refine_lag<T: Float>(cmndf: &[T], tau: usize, lags: LagRange) -> T {
    let lag = T::from_count(tau);
    // d'(0) is fixed at 1, and nothing exists at `lags.max`.
    if tau < 2 || tau + 1 >= lags.max {
        return lag;
    }
    match parabolic_offset(cmndf[tau - 1], cmndf[tau], cmndf[tau + 1]) {
        Some(offset) => lag + offset,
        None => lag,
    }
}

impl<T> PitchDetector<T> for YINDetector
where
    T: Float,
{
    fn get_pitch(&self, signal: &[T], sample_rate: usize) -> Pitch<T> {
        self.get_pitch_with_progress(signal, sample_rate, |_| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, size: usize, sample_rate: usize) -> Vec<f64> {
        let dx = 2.0 * std::f64::consts::PI * freq / sample_rate as f64;
        (0..size).map(|i| (i as f64 * dx).sin()).collect()
    }

    #[test]
    fn refine_lag_stays_inside_range() {
        let cmndf = vec![1.0f64, 0.5, 0.2, 0.1, 0.3];
        let lags = LagRange::new(1, 5);
        assert_eq!(refine_lag(&cmndf, 1, lags), 1.);
        assert_eq!(refine_lag(&cmndf, 4, lags), 4.);
        let refined = refine_lag(&cmndf, 3, lags);
        assert!(refined > 2.5 && refined < 3.5);
        assert_ne!(refined, 3.);

        // The shortest lag of the range still has a computed left neighbour.
        let refined = refine_lag(&cmndf, 3, LagRange::new(3, 5));
        assert!(refined > 2.5 && refined < 3.);
    }

    #[test]
    fn top_of_band_is_not_an_octave_low() {
        let detector = YINDetector::default();
        for sample_rate in [16000, 44100, 48000] {
            for freq in [900., 950., 990., 1000.] {
                let signal = sine(freq, 4096, sample_rate);
                let pitch = detector.get_pitch(&signal, sample_rate);
                assert!(
                    (pitch.frequency - freq).abs() < 0.01 * freq,
                    "{} Hz at {} Hz: {:?}",
                    freq,
                    sample_rate,
                    pitch
                );
            }
        }
    }

    #[test]
    fn short_signal_is_rejected() {
        let detector = YINDetector::default();
        let signal = sine(440., 882, 44100);
        assert_eq!(
            detector.estimate(&signal, 44100, &mut |_| {}),
            Err(EstimationError::SignalTooShort {
                len: 882,
                required: 882
            })
        );
    }

    #[test]
    fn silence_is_not_an_estimate() {
        let detector = YINDetector::default();
        assert_eq!(
            detector.estimate(&vec![0.0f64; 4096], 44100, &mut |_| {}),
            Err(EstimationError::Silent)
        );
        // DC has energy but no periodic structure.
        assert_eq!(
            detector.estimate(&vec![0.25f64; 4096], 44100, &mut |_| {}),
            Err(EstimationError::Silent)
        );
    }

    #[test]
    fn power_gate() {
        let quiet: Vec<f64> = sine(440., 4096, 44100).iter().map(|s| s * 1e-3).collect();
        let gated = YINDetector::new(YINConfig::default().with_power_threshold(1.0));
        assert_eq!(
            gated.estimate(&quiet, 44100, &mut |_| {}),
            Err(EstimationError::Silent)
        );
        assert!(YINDetector::default().get_pitch(&quiet, 44100).is_detected());
    }

    #[test]
    fn invalid_input() {
        let detector = YINDetector::default();
        let mut signal = sine(440., 4096, 44100);
        assert_eq!(
            detector.estimate(&signal, 0, &mut |_| {}),
            Err(EstimationError::InvalidSampleRate)
        );
        assert_eq!(
            detector.estimate::<f64, _>(&[], 44100, &mut |_| {}),
            Err(EstimationError::EmptySignal)
        );
        signal[100] = f64::NAN;
        assert_eq!(
            detector.estimate(&signal, 44100, &mut |_| {}),
            Err(EstimationError::NonFiniteSample(100))
        );
    }

    #[test]
    fn fft_agrees_with_undecimated_sum() {
        let signal = sine(261.63, 4096, 44100);
        let direct = YINDetector::new(YINConfig::default().with_stride(1)).get_pitch(&signal, 44100);
        let fft = YINDetector::new(YINConfig::default().with_fft(true)).get_pitch(&signal, 44100);
        assert!((direct.frequency - fft.frequency).abs() < 1e-6);
        assert!((direct.probability - fft.probability).abs() < 1e-6);
    }

    #[test]
    fn progress_reports() {
        let detector = YINDetector::default();
        let signal = sine(220., 4096, 44100);
        let mut reports = Vec::new();
        let pitch = detector.get_pitch_with_progress(&signal, 44100, |p| reports.push(p));
        // 838 lags between 44 and 882.
        assert_eq!(reports, vec![0, 11, 23, 35, 47, 59, 71, 83, 95]);
        assert_eq!(pitch, detector.get_pitch(&signal, 44100));
    }
}
