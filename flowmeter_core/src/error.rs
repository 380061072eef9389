use thiserror::Error;

use crate::types::Channel;

/// Why a capture could not be turned into two usable series.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseIncomplete {
    #[error("trigger phrase {trigger:?} not found")]
    NoTrigger { trigger: String },
    #[error("{channel} series empty after dropping {warmup} warm-up samples ({raw_len} parsed)")]
    EmptyAfterTrim {
        channel: Channel,
        raw_len: usize,
        warmup: usize,
    },
}

/// Why the zero-phase filter could not be applied to a series.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterDegenerate {
    #[error("filter order must be >= 1")]
    ZeroOrder,
    #[error("cutoff {cutoff_hz} Hz outside (0, {nyquist_hz}) Hz")]
    Cutoff { cutoff_hz: f64, nyquist_hz: f64 },
    #[error("series of {len} samples is too short; need more than {padlen}")]
    TooShort { len: usize, padlen: usize },
    #[error("filter output is not finite")]
    NonFinite,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    #[error("incomplete capture: {0}")]
    ParseIncomplete(#[from] ParseIncomplete),
    #[error("filter degenerate on {channel} channel: {reason}")]
    FilterDegenerate {
        channel: Channel,
        reason: FilterDegenerate,
    },
    #[error("series time ranges do not overlap: upstream {upstream:?} s, downstream {downstream:?} s")]
    NoOverlap {
        upstream: (f64, f64),
        downstream: (f64, f64),
    },
    #[error("common time grid is degenerate ({points} points)")]
    DegenerateGrid { points: usize },
    #[error("{0} series is empty")]
    EmptySeries(Channel),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("temperature {celsius:.2} C outside reference table [{min}, {max}] C")]
    TemperatureOutOfRange { celsius: f64, min: f64, max: f64 },
    #[error("acquisition error: {0}")]
    Acquisition(String),
    #[error("timeout waiting for capture")]
    AcquisitionTimeout,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing pipe geometry")]
    MissingGeometry,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
