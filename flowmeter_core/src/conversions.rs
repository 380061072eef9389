//! `From` implementations bridging `flowmeter_config` types to core types.

use std::time::Duration;

use crate::acoustics::SoundSpeedCurve;
use crate::config::{AcousticConfig, CaptureCfg, PipeGeometry, RunContext, SignalCfg};
use crate::error::FlowError;
use crate::worker::WorkerOptions;

// ── SignalCfg ────────────────────────────────────────────────────────────────

impl From<&flowmeter_config::SignalCfg> for SignalCfg {
    fn from(c: &flowmeter_config::SignalCfg) -> Self {
        Self {
            sampling_rate_hz: c.sampling_rate_hz,
            cutoff_hz: c.cutoff_hz,
            filter_order: c.filter_order,
            warmup_samples: c.warmup_samples,
        }
    }
}

// ── CaptureCfg ───────────────────────────────────────────────────────────────

impl From<&flowmeter_config::CaptureCfg> for CaptureCfg {
    fn from(c: &flowmeter_config::CaptureCfg) -> Self {
        Self {
            trigger_phrase: c.trigger_phrase.clone(),
            timeout: Duration::from_millis(c.timeout_ms),
        }
    }
}

// ── PipeGeometry ─────────────────────────────────────────────────────────────

impl From<&flowmeter_config::PipeCfg> for PipeGeometry {
    fn from(c: &flowmeter_config::PipeCfg) -> Self {
        Self {
            inner_diameter_m: c.inner_diameter_m,
            outer_diameter_m: c.outer_diameter_m,
            pipe_sound_speed_mps: c.sound_speed_mps,
        }
    }
}

// ── AcousticConfig ───────────────────────────────────────────────────────────

impl From<&flowmeter_config::AcousticCfg> for AcousticConfig {
    fn from(c: &flowmeter_config::AcousticCfg) -> Self {
        Self {
            medium_sound_speed_mps: c.medium_sound_speed_mps,
            calibration_offset_s: c.calibration_offset_s,
        }
    }
}

// ── RunContext ───────────────────────────────────────────────────────────────

impl From<&flowmeter_config::Config> for RunContext {
    fn from(c: &flowmeter_config::Config) -> Self {
        Self {
            signal: (&c.signal).into(),
            capture: (&c.capture).into(),
            pipe: (&c.pipe).into(),
            acoustic: (&c.acoustic).into(),
        }
    }
}

// ── WorkerOptions ────────────────────────────────────────────────────────────

impl From<&flowmeter_config::RunnerCfg> for WorkerOptions {
    fn from(c: &flowmeter_config::RunnerCfg) -> Self {
        Self {
            interval: Duration::from_millis(c.interval_ms),
            max_iterations: (c.max_iterations > 0).then_some(c.max_iterations),
            ..Self::default()
        }
    }
}

// ── SoundSpeedCurve ──────────────────────────────────────────────────────────

impl TryFrom<&flowmeter_config::SoundSpeedTable> for SoundSpeedCurve {
    type Error = FlowError;
    fn try_from(t: &flowmeter_config::SoundSpeedTable) -> Result<Self, Self::Error> {
        SoundSpeedCurve::from_table(&t.points)
    }
}
