use crate::detector::internals::LagRange;
use crate::float::Float;

/// Outcome of [first_strong_peak]. `lags_scanned` counts the lags inspected
/// before the scan ended, which makes the early exit observable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakSearch<T> {
    pub peak: Option<(usize, T)>,
    pub lags_scanned: usize,
}

/// Find the lag of the first dip of `cmndf` below `threshold` inside `lags`.
///
/// Once a value below `threshold` is found, the scan follows the dip and keeps
/// the lowest lag, looking at most `refine_window` lags past the best one. It is
/// abandoned as soon as a value rises above `escape_ratio` times the best value.
/// When nothing drops below `threshold`, the global minimum over `lags` is
/// returned instead. Returns `None` only for an empty range.
pub fn absolute_threshold_dip<T: Float>(
    cmndf: &[T],
    lags: LagRange,
    threshold: T,
    refine_window: usize,
    escape_ratio: T,
) -> Option<usize> {
    let end = lags.max.min(cmndf.len());
    let first = (lags.min..end).find(|&tau| cmndf[tau] < threshold);

    match first {
        Some(start) => {
            let mut best = start;
            let mut tau = start + 1;
            while tau < end && tau <= best + refine_window {
                if cmndf[tau] < cmndf[best] {
                    best = tau;
                } else if cmndf[tau] > escape_ratio * cmndf[best] {
                    break;
                }
                tau += 1;
            }
            Some(best)
        }
        None => global_minimum(cmndf, LagRange::new(lags.min, end)),
    }
}

/// Index of the lowest value in `lags`; the earliest one wins ties.
pub fn global_minimum<T: Float>(values: &[T], lags: LagRange) -> Option<usize> {
    (lags.min..lags.max.min(values.len())).fold(None, |best, tau| match best {
        Some(b) if values[b] <= values[tau] => Some(b),
        _ => Some(tau),
    })
}

/// Scan `acf` over `lags` for local maxima above `floor`, keeping the highest.
/// The scan stops at the first qualifying peak above `accept`.
pub fn first_strong_peak<T: Float>(acf: &[T], lags: LagRange, floor: T, accept: T) -> PeakSearch<T> {
    let mut peak: Option<(usize, T)> = None;
    let mut lags_scanned = 0;

    // Both neighbours must exist.
    let start = lags.min.max(1);
    let stop = lags.max.min(acf.len()).saturating_sub(1);

    for tau in start..stop {
        lags_scanned += 1;
        let value = acf[tau];
        if value > acf[tau - 1] && value > acf[tau + 1] && value > floor {
            if peak.map_or(true, |(_, best)| value > best) {
                peak = Some((tau, value));
            }
            if value > accept {
                break;
            }
        }
    }

    PeakSearch { peak, lags_scanned }
}

/// Vertex offset of the parabola through `(-1, left)`, `(0, center)`, `(1, right)`.
///
/// `None` when the three points are collinear or the vertex lies a full sample
/// or more away from the center.
pub fn parabolic_offset<T: Float>(left: T, center: T, right: T) -> Option<T> {
    let two = T::one() + T::one();
    let curvature = left - two * center + right;
    if curvature == T::zero() {
        return None;
    }
    let offset = (left - right) / (two * curvature);
    if offset.abs() < T::one() {
        Some(offset)
    } else {
        None
    }
}
