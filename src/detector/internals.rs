use rustfft::FftPlanner;

use crate::error::{EstimationError, Result};
use crate::float::Float;
use crate::utils::buffer::{
    copy_complex_to_real, copy_real_to_complex, modulus_squared, new_complex_buffer,
    new_real_buffer, prefix_energy,
};

/// Lags between two progress notifications while the difference function is built.
pub const PROGRESS_INTERVAL: usize = 100;

/// A pitch estimate. `frequency` is in Hz; `probability` is the detector's
/// confidence in it.
///
/// A `frequency` of zero means no pitch was detected, whatever `probability`
/// holds. [Pitch::none] is the canonical form of that result.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Pitch<T>
where
    T: Float,
{
    pub frequency: T,
    pub probability: T,
}

impl<T: Float> Pitch<T> {
    /// The "no pitch detected" sentinel, `{ frequency: 0, probability: 0 }`.
    pub fn none() -> Self {
        Pitch {
            frequency: T::zero(),
            probability: T::zero(),
        }
    }

    pub fn is_detected(&self) -> bool {
        self.frequency > T::zero()
    }
}

impl<T: Float> Default for Pitch<T> {
    fn default() -> Self {
        Self::none()
    }
}

/// Half-open range of candidate periods `[min, max)`, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagRange {
    pub min: usize,
    pub max: usize,
}

impl LagRange {
    pub fn new(min: usize, max: usize) -> Self {
        LagRange { min, max }
    }

    /// Lags covering `min_frequency..=max_frequency` at `sample_rate`:
    /// `min = floor(sample_rate / max_frequency)`, `max = floor(sample_rate / min_frequency)`.
    pub(crate) fn from_frequencies(
        sample_rate: usize,
        min_frequency: f64,
        max_frequency: f64,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(EstimationError::InvalidSampleRate);
        }
        let rate = sample_rate as f64;
        let longest = rate / min_frequency;
        let shortest = rate / max_frequency;
        if !(longest.is_finite() && shortest.is_finite() && shortest >= 0.0) {
            return Err(EstimationError::EmptyLagRange {
                min: 0,
                max: 0,
                sample_rate,
            });
        }

        let lags = LagRange::new(shortest.floor() as usize, longest.floor() as usize);
        if lags.is_empty() {
            return Err(EstimationError::EmptyLagRange {
                min: lags.min,
                max: lags.max,
                sample_rate,
            });
        }
        Ok(lags)
    }

    pub fn len(&self) -> usize {
        self.max.saturating_sub(self.min)
    }

    pub fn is_empty(&self) -> bool {
        self.min >= self.max
    }
}

/// Reject empty signals and signals carrying NaN or infinite samples.
pub(crate) fn validate_samples<T: Float>(signal: &[T]) -> Result<()> {
    if signal.is_empty() {
        return Err(EstimationError::EmptySignal);
    }
    match signal.iter().position(|s| !s.is_finite()) {
        Some(idx) => Err(EstimationError::NonFiniteSample(idx)),
        None => Ok(()),
    }
}

/// Turn the outcome of an estimation into what the caller sees. Failures and
/// unusable numbers collapse to [Pitch::none]; the cause is only logged.
pub(crate) fn resolve<T: Float>(detector: &str, estimate: Result<Pitch<T>>) -> Pitch<T> {
    match estimate.and_then(check_estimate) {
        Ok(pitch) => pitch,
        Err(err) => {
            log::debug!("{detector}: no pitch ({err})");
            Pitch::none()
        }
    }
}

fn check_estimate<T: Float>(pitch: Pitch<T>) -> Result<Pitch<T>> {
    if pitch.frequency.is_finite() && pitch.probability.is_finite() && pitch.frequency > T::zero()
    {
        Ok(pitch)
    } else {
        Err(EstimationError::NonFiniteEstimate {
            frequency: pitch.frequency.to_f64().unwrap_or(f64::NAN),
            probability: pitch.probability.to_f64().unwrap_or(f64::NAN),
        })
    }
}

fn report_progress<F: FnMut(u8)>(tau: usize, lags: LagRange, progress: &mut F) {
    if tau < lags.min {
        return;
    }
    let done = tau - lags.min;
    if done % PROGRESS_INTERVAL == 0 {
        progress((done * 100 / lags.len()).min(100) as u8);
    }
}

/// Compute the square difference function, _d(t)_, of `signal` for every lag in `lags`.
/// With a decimation stride _s_ and a signal _x=(x_0,x_1,...,x_{n-1})_ this is
///
///  > d(t) = sum_{k >= 0, ks < n-t} (x_{ks} - x_{ks+t})^2
///
/// The result is indexed by lag and has length `lags.max`. Every lag from 1 up is
/// filled, including those below `lags.min`, so the cumulative mean of
/// [yin_normalize_square_error] sees the whole function; progress only covers `lags`.
/// Entry 0 is zero. A stride of 0 is treated as 1.
pub fn difference_function<T, F>(
    signal: &[T],
    lags: LagRange,
    stride: usize,
    progress: &mut F,
) -> Vec<T>
where
    T: Float,
    F: FnMut(u8),
{
    let stride = stride.max(1);
    let mut result = new_real_buffer(lags.max);

    for tau in 1..lags.max {
        report_progress(tau, lags, progress);
        result[tau] = (0..signal.len().saturating_sub(tau))
            .step_by(stride)
            .map(|i| {
                let diff = signal[i] - signal[i + tau];
                diff * diff
            })
            .sum();
    }

    result
}

/// Compute the full (undecimated) square difference function with an FFT.
///
/// The square difference expands to
///
///  > d(t) = pow_0^{n-t} + pow_t^n - 2 r(t)
///
/// where pow_a^b is the energy of `signal[a..b]` and _r_ is the linear autocorrelation,
/// obtained from the zero-padded power spectrum. Layout matches [difference_function].
pub fn fft_difference_function<T, F>(signal: &[T], lags: LagRange, progress: &mut F) -> Vec<T>
where
    T: Float,
    F: FnMut(u8),
{
    let n = signal.len();
    let mut result = new_real_buffer(lags.max);
    if n == 0 {
        return result;
    }

    let autocorr = autocorrelation(signal);
    let energy = prefix_energy(signal);
    let two = T::one() + T::one();

    for tau in 1..lags.max {
        report_progress(tau, lags, progress);
        if tau >= n {
            continue;
        }
        let head = energy[n - tau];
        let tail = energy[n] - energy[tau];
        // FFT rounding can push an exact zero slightly negative.
        result[tau] = (head + tail - two * autocorr[tau]).max(T::zero());
    }

    result
}

/// Linear autocorrelation `r(t) = sum_i x_i x_{i+t}` for `t in 0..signal.len()`.
pub fn autocorrelation<T: Float>(signal: &[T]) -> Vec<T> {
    if signal.is_empty() {
        return Vec::new();
    }
    // Padding to twice the length keeps the circular correlation from wrapping.
    let size = 2 * signal.len();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(size);
    let inv_fft = planner.plan_fft_inverse(size);

    let mut spectrum = new_complex_buffer(size);
    let mut scratch = new_complex_buffer(
        fft.get_inplace_scratch_len()
            .max(inv_fft.get_inplace_scratch_len()),
    );

    copy_real_to_complex(signal, &mut spectrum);
    fft.process_with_scratch(&mut spectrum, &mut scratch);
    modulus_squared(&mut spectrum);
    inv_fft.process_with_scratch(&mut spectrum, &mut scratch);

    // rustfft doesn't normalize, so the round trip scales everything by `size`.
    let normalization_const = T::one() / T::from_count(size);
    let mut result = new_real_buffer(signal.len());
    copy_complex_to_real(&spectrum[..signal.len()], &mut result);
    result
        .iter_mut()
        .for_each(|r| *r = *r * normalization_const);
    result
}

/// Calculate the "cumulative mean normalized difference function" as
/// specified in the YIN paper. If _d(t)_ is the square error function,
/// compute _d'(0) = 1_ and for _t > 0_
///
///  > d'(t) = d(t) / [ (1/t) * sum_{i=1}^t d(i) ]
///
/// A zero running sum yields _d'(t) = 1_.
pub fn yin_normalize_square_error<T: Float>(square_error: &mut [T]) {
    let mut sum = T::zero();
    if let Some(first) = square_error.first_mut() {
        *first = T::one();
    }
    square_error
        .iter_mut()
        .enumerate()
        .skip(1)
        .for_each(|(tau, a)| {
            sum = sum + *a;
            *a = if sum == T::zero() {
                T::one()
            } else {
                *a * T::from_count(tau) / sum
            };
        });
}

/// Mean lagged product of `window` for lags `0..len`, sampling every `stride`-th
/// index of the overlap:
///
///  > r(t) = mean_{k >= 0, ks < n-t} x_{ks} x_{ks+t}
///
/// Lags with no overlap are zero.
pub fn mean_autocorrelation<T: Float>(window: &[T], len: usize, stride: usize) -> Vec<T> {
    let stride = stride.max(1);
    (0..len)
        .map(|tau| {
            let (sum, count) = (0..window.len().saturating_sub(tau))
                .step_by(stride)
                .fold((T::zero(), 0usize), |(sum, count), i| {
                    (sum + window[i] * window[i + tau], count + 1)
                });
            if count == 0 {
                T::zero()
            } else {
                sum / T::from_count(count)
            }
        })
        .collect()
}

/// Divide every entry by the zero-lag value. Left untouched when that value is zero.
pub fn normalize_to_zero_lag<T: Float>(acf: &mut [T]) {
    if let Some(&zero_lag) = acf.first() {
        if zero_lag != T::zero() {
            acf.iter_mut().for_each(|a| *a = *a / zero_lag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct_square_error(signal: &[f64], lags: LagRange, stride: usize) -> Vec<f64> {
        (0..lags.max)
            .map(|tau| {
                if tau == 0 {
                    return 0.;
                }
                signal
                    .iter()
                    .zip(signal[tau..].iter())
                    .step_by(stride)
                    .map(|(x_j, x_j_tau)| (x_j - x_j_tau) * (x_j - x_j_tau))
                    .sum::<f64>()
            })
            .collect()
    }

    #[test]
    fn lag_range_from_frequencies() {
        assert_eq!(
            LagRange::from_frequencies(44100, 50., 1000.),
            Ok(LagRange::new(44, 882))
        );
        assert_eq!(
            LagRange::from_frequencies(0, 50., 1000.),
            Err(EstimationError::InvalidSampleRate)
        );
        assert!(LagRange::from_frequencies(44100, 0., 1000.).is_err());
        assert!(LagRange::from_frequencies(40, 50., 1000.).is_err());
    }

    #[test]
    fn square_error_test() {
        let signal: Vec<f64> = vec![0., 1., 2., 0., -1., -2., 0.5, 1.5];
        let lags = LagRange::new(1, 5);

        let computed = difference_function(&signal, lags, 1, &mut |_| {});
        assert_eq!(computed, direct_square_error(&signal, lags, 1));
        assert_eq!(computed[0], 0.);
        assert_eq!(computed[1], 1. + 1. + 4. + 1. + 1. + 6.25 + 1.);

        let decimated = difference_function(&signal, lags, 3, &mut |_| {});
        assert_eq!(decimated, direct_square_error(&signal, lags, 3));
    }

    #[test]
    fn lags_below_range_are_filled() {
        let signal: Vec<f64> = (0..64).map(|i| (i as f64 * 0.4).sin()).collect();
        let lags = LagRange::new(10, 20);

        let computed = difference_function(&signal, lags, 1, &mut |_| {});
        assert_eq!(computed[0], 0.);
        assert!(computed[1..lags.min].iter().all(|&d| d > 0.));
        assert_eq!(computed, direct_square_error(&signal, lags, 1));

        let fft = fft_difference_function(&signal, lags, &mut |_| {});
        assert!(fft[1..lags.min].iter().all(|&d| d > 0.));
    }

    #[test]
    fn fft_square_error_test() {
        let signal: Vec<f64> = (0..300).map(|i| (i as f64 * 0.13).sin() + 0.25).collect();
        let lags = LagRange::new(3, 120);

        let expected = direct_square_error(&signal, lags, 1);
        let computed = fft_difference_function(&signal, lags, &mut |_| {});
        assert_eq!(computed.len(), expected.len());
        // Using an FFT loses precision; we don't care that much.
        for (c, e) in computed.iter().zip(expected.iter()) {
            assert!((c - e).abs() < 1e-8, "{} != {}", c, e);
        }
    }

    #[test]
    fn autocorrelation_test() {
        let signal: Vec<f64> = vec![0., 1., 2., 0., -1., -2.];
        let expected: Vec<f64> = (0..signal.len())
            .map(|t| signal.iter().zip(signal[t..].iter()).map(|(a, b)| a * b).sum::<f64>())
            .collect();

        let mut computed = autocorrelation(&signal);
        computed
            .iter_mut()
            .for_each(|x| *x = (*x * 100.).round() / 100.);

        assert_eq!(expected, computed);
    }

    #[test]
    fn progress_is_coarse_and_bounded() {
        let signal = vec![0.5f32; 1000];
        let lags = LagRange::new(20, 470);
        let mut reports = Vec::new();
        difference_function(&signal, lags, 8, &mut |p| reports.push(p));
        assert_eq!(reports, vec![0, 22, 44, 66, 88]);
    }

    #[test]
    fn yin_normalized_square_error_test() {
        let signal: &mut Vec<f64> = &mut vec![0., 6., 14.];
        let result = vec![1., 1., 2. * 14. / (6. + 14.)];

        yin_normalize_square_error(signal);

        assert_eq!(result, *signal);
    }

    #[test]
    fn yin_normalization_guards_zero_sum() {
        let signal: &mut Vec<f64> = &mut vec![0., 0., 0., 4., 2.];
        yin_normalize_square_error(signal);
        assert_eq!(*signal, vec![1., 1., 1., 3., 8. / 6.]);
    }

    #[test]
    fn mean_autocorrelation_test() {
        let window: Vec<f64> = vec![1., 2., 3., 4., 5.];
        let acf = mean_autocorrelation(&window, 7, 2);
        // t = 0: indices 0, 2, 4
        assert_eq!(acf[0], (1. + 9. + 25.) / 3.);
        // t = 1: indices 0, 2 of the 4-sample overlap
        assert_eq!(acf[1], (1. * 2. + 3. * 4.) / 2.);
        // t = 4: index 0 only
        assert_eq!(acf[4], 5.);
        assert_eq!(acf[5], 0.);
        assert_eq!(acf[6], 0.);
    }

    #[test]
    fn zero_lag_normalization() {
        let mut acf = vec![4.0f64, 2., -1.];
        normalize_to_zero_lag(&mut acf);
        assert_eq!(acf, vec![1., 0.5, -0.25]);

        let mut silent = vec![0.0f64, 0., 0.];
        normalize_to_zero_lag(&mut silent);
        assert_eq!(silent, vec![0., 0., 0.]);
    }

    #[test]
    fn sentinel_resolution() {
        let ok = resolve("test", Ok(Pitch { frequency: 440.0f64, probability: 0.9 }));
        assert_eq!(ok.frequency, 440.);

        let failed = resolve::<f64>("test", Err(EstimationError::Silent));
        assert_eq!(failed, Pitch::none());

        let nan = resolve("test", Ok(Pitch { frequency: f64::NAN, probability: 0.3 }));
        assert_eq!(nan, Pitch::none());
        assert!(!nan.is_detected());
    }

    #[test]
    fn rejects_bad_samples() {
        assert_eq!(validate_samples::<f32>(&[]), Err(EstimationError::EmptySignal));
        assert_eq!(
            validate_samples(&[0.0f32, f32::INFINITY]),
            Err(EstimationError::NonFiniteSample(1))
        );
        assert_eq!(validate_samples(&[0.0f64, -0.5]), Ok(()));
    }
}
