//! Cross-correlation lag estimation between the two conditioned traces.
//!
//! Both series are resampled onto a shared grid covering their overlap, then
//! fully cross-correlated. With downstream as the reference,
//! `c[k] = Σ_n us[n + k − (N−1)] · ds[n]` and the lag is
//! `(argmax c − (N−1)) × step`: positive when upstream is a delayed copy of
//! downstream. The first maximum wins ties.

use crate::error::FlowError;
use crate::types::{Channel, LagEstimate, SampleSeries};
use crate::util::{first_argmax, interp_linear, linspace};

/// Both traces' filtered voltage resampled onto one evenly spaced grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonGrid {
    pub times: Vec<f64>,
    pub upstream: Vec<f64>,
    pub downstream: Vec<f64>,
}

impl CommonGrid {
    /// Grid spacing in seconds. Grids always hold at least two points.
    pub fn step(&self) -> f64 {
        self.times[1] - self.times[0]
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Everything behind one lag estimate, kept for plotting and export.
#[derive(Debug, Clone, PartialEq)]
pub struct LagAnalysis {
    pub grid: CommonGrid,
    /// Full correlation, `2N − 1` values, index `N − 1` is zero lag.
    pub correlation: Vec<f64>,
    pub lag_index: i64,
    pub estimate: LagEstimate,
}

impl LagAnalysis {
    /// Lag in seconds for each correlation index, aligned with `correlation`.
    pub fn lag_axis(&self) -> Vec<f64> {
        let n = self.grid.len() as i64;
        let step = self.grid.step();
        (0..self.correlation.len() as i64)
            .map(|k| (k - (n - 1)) as f64 * step)
            .collect()
    }
}

fn extent(series: &SampleSeries, channel: Channel) -> Result<(f64, f64), FlowError> {
    series.time_range().ok_or(FlowError::EmptySeries(channel))
}

fn resample(series: &SampleSeries, grid: &[f64]) -> Vec<f64> {
    let xs = series.times();
    let ys = series.filtered();
    grid.iter()
        .map(|&t| interp_linear(&xs, &ys, t).unwrap_or(0.0))
        .collect()
}

/// Resample both series onto `min(len)` points spanning their overlap.
pub fn common_grid(upstream: &SampleSeries, downstream: &SampleSeries) -> Result<CommonGrid, FlowError> {
    let us_range = extent(upstream, Channel::Upstream)?;
    let ds_range = extent(downstream, Channel::Downstream)?;
    let start = us_range.0.max(ds_range.0);
    let stop = us_range.1.min(ds_range.1);
    if start > stop {
        return Err(FlowError::NoOverlap {
            upstream: us_range,
            downstream: ds_range,
        });
    }
    let points = upstream.len().min(downstream.len());
    if points < 2 || stop <= start {
        return Err(FlowError::DegenerateGrid { points });
    }
    let times = linspace(start, stop, points);
    let upstream = resample(upstream, &times);
    let downstream = resample(downstream, &times);
    Ok(CommonGrid {
        times,
        upstream,
        downstream,
    })
}

/// Full cross-correlation of `us` against the reference `ds`.
///
/// Output length is `us.len() + ds.len() − 1`; out-of-range terms count as
/// zero. Empty input yields an empty vector.
pub fn cross_correlate(us: &[f64], ds: &[f64]) -> Vec<f64> {
    if us.is_empty() || ds.is_empty() {
        return Vec::new();
    }
    let m = ds.len();
    let len = us.len() + m - 1;
    (0..len)
        .map(|k| {
            let lo = (m - 1).saturating_sub(k);
            let hi = m.min(len - k);
            (lo..hi).map(|n| us[n + k + 1 - m] * ds[n]).sum()
        })
        .collect()
}

/// Signed sample lag for a correlation of a reference with `reference_len`
/// samples: `argmax − (reference_len − 1)`.
pub fn lag_index_from_correlation(correlation: &[f64], reference_len: usize) -> Option<i64> {
    let peak = first_argmax(correlation)?;
    Some(peak as i64 - (reference_len as i64 - 1))
}

/// Resample, correlate and locate the peak.
pub fn analyze_lag(upstream: &SampleSeries, downstream: &SampleSeries) -> Result<LagAnalysis, FlowError> {
    let grid = common_grid(upstream, downstream)?;
    let correlation = cross_correlate(&grid.upstream, &grid.downstream);
    let lag_index = lag_index_from_correlation(&correlation, grid.len())
        .ok_or(FlowError::DegenerateGrid { points: grid.len() })?;
    let estimate = LagEstimate {
        time_lag_s: lag_index as f64 * grid.step(),
    };
    tracing::debug!(
        points = grid.len(),
        step_s = grid.step(),
        lag_index,
        time_lag_s = estimate.time_lag_s,
        "lag estimated"
    );
    Ok(LagAnalysis {
        grid,
        correlation,
        lag_index,
        estimate,
    })
}

pub fn estimate_lag(upstream: &SampleSeries, downstream: &SampleSeries) -> Result<LagEstimate, FlowError> {
    analyze_lag(upstream, downstream).map(|a| a.estimate)
}
