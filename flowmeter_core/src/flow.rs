//! Lag → flow rate, and the effective speed of sound behind it.

use std::f64::consts::SQRT_2;

use crate::config::RunContext;
use crate::error::FlowError;
use crate::types::{Channel, SampleSeries, SpeedOfSound};
use crate::util::{first_argmax_by, mean};

/// `lag × speed² / (2 × distance)`.
#[inline]
pub fn flow_from_lag(time_lag_s: f64, characteristic_distance_m: f64, speed_of_sound_mps: f64) -> f64 {
    time_lag_s * speed_of_sound_mps.powi(2) / (2.0 * characteristic_distance_m)
}

fn peak_time(series: &SampleSeries, channel: Channel) -> Result<f64, FlowError> {
    let i = first_argmax_by(&series.points, |p| p.filtered_voltage.abs())
        .ok_or(FlowError::EmptySeries(channel))?;
    Ok(series.points[i].time_s)
}

/// Mean of the two traces' peak times, where a trace's peak is the first
/// sample with the largest `|filtered_voltage|`.
pub fn average_time_of_flight(upstream: &SampleSeries, downstream: &SampleSeries) -> Result<f64, FlowError> {
    let us = peak_time(upstream, Channel::Upstream)?;
    let ds = peak_time(downstream, Channel::Downstream)?;
    mean(&[us, ds]).ok_or(FlowError::EmptySeries(Channel::Upstream))
}

/// Pick the speed of sound for this iteration.
///
/// A configured, non-zero medium speed is used as-is. Otherwise the speed is
/// derived from the averaged time of flight less the rig offset and the
/// wall transit.
pub fn resolve_speed_of_sound(
    ctx: &RunContext,
    upstream: &SampleSeries,
    downstream: &SampleSeries,
) -> Result<SpeedOfSound, FlowError> {
    if let Some(c) = ctx.acoustic.direct_speed() {
        return Ok(SpeedOfSound::Direct(c));
    }
    let average_tof_s = average_time_of_flight(upstream, downstream)?;
    let wall_transit_s = ctx.wall_transit_time();
    let medium_transit_s = average_tof_s - ctx.acoustic.calibration_offset_s - wall_transit_s;
    // Evaluated left to right: (transit / √2) × inner diameter.
    let speed_mps = medium_transit_s / SQRT_2 * ctx.pipe.inner_diameter_m;
    tracing::debug!(
        average_tof_s,
        wall_transit_s,
        medium_transit_s,
        speed_mps,
        "speed of sound from transit time"
    );
    Ok(SpeedOfSound::TransitCorrected {
        speed_mps,
        average_tof_s,
        wall_transit_s,
        medium_transit_s,
    })
}
