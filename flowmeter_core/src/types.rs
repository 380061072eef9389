//! Plain data carried between pipeline stages.

use std::fmt;

/// Which transducer a trace came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Upstream,
    Downstream,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Upstream => f.write_str("upstream"),
            Channel::Downstream => f.write_str("downstream"),
        }
    }
}

/// One `us`/`ds` line: hardware sample index and measured voltage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub index: f64,
    pub voltage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub time_s: f64,
    pub voltage: f64,
    pub filtered_voltage: f64,
}

/// Conditioned trace, monotonically increasing in `time_s`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleSeries {
    pub points: Vec<SamplePoint>,
}

impl SampleSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.time_s).collect()
    }

    pub fn voltages(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.voltage).collect()
    }

    pub fn filtered(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.filtered_voltage).collect()
    }

    /// `(first, last)` sample time, `None` when empty.
    pub fn time_range(&self) -> Option<(f64, f64)> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some((first.time_s, last.time_s))
    }
}

/// Signed time offset between the traces; positive when upstream lags
/// behind downstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagEstimate {
    pub time_lag_s: f64,
}

/// How the effective speed of sound was obtained for one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedOfSound {
    /// Configured medium speed used as-is.
    Direct(f64),
    /// Derived from the averaged time of flight.
    TransitCorrected {
        speed_mps: f64,
        average_tof_s: f64,
        wall_transit_s: f64,
        medium_transit_s: f64,
    },
}

impl SpeedOfSound {
    pub fn speed_mps(&self) -> f64 {
        match *self {
            SpeedOfSound::Direct(c) => c,
            SpeedOfSound::TransitCorrected { speed_mps, .. } => speed_mps,
        }
    }
}

/// Result of one successful iteration. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowMeasurement {
    pub flow_rate: f64,
    /// Fahrenheit, as printed by the rig.
    pub temperature: Option<f64>,
    pub lag: LagEstimate,
}
