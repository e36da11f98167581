//! Reasons an estimation call resolved to [`Pitch::none`](crate::Pitch::none).
//!
//! These never reach the caller: detectors log the cause at `debug` level and
//! return the sentinel.

use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, EstimationError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub(crate) enum EstimationError {
    #[error("signal is empty")]
    EmptySignal,

    #[error("sample rate must be positive")]
    InvalidSampleRate,

    #[error("lag range {min}..{max} is empty for sample rate {sample_rate}")]
    EmptyLagRange {
        min: usize,
        max: usize,
        sample_rate: usize,
    },

    #[error("signal of {len} samples is too short, need more than {required}")]
    SignalTooShort { len: usize, required: usize },

    #[error("signal contains a non-finite sample at index {0}")]
    NonFiniteSample(usize),

    #[error("signal is silent")]
    Silent,

    #[error("no lag qualified as a pitch period")]
    NoPeriod,

    #[error("estimate is not a usable number (frequency {frequency}, probability {probability})")]
    NonFiniteEstimate { frequency: f64, probability: f64 },
}
