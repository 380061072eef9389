//! Runtime configuration for the measurement pipeline.
//!
//! These are the structs the pipeline consumes. They are separate from the
//! TOML-deserialized config in `flowmeter_config`; see `conversions`.

use std::time::Duration;

use crate::error::FlowError;

pub use flowmeter_config::{DEFAULT_CALIBRATION_OFFSET_S, DEFAULT_TRIGGER_PHRASE};

/// Sampling and filtering parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalCfg {
    pub sampling_rate_hz: f64,
    pub cutoff_hz: f64,
    pub filter_order: usize,
    /// Leading samples dropped from each channel before conditioning.
    pub warmup_samples: usize,
}

impl Default for SignalCfg {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 50e6,
            cutoff_hz: 1e6,
            filter_order: 5,
            warmup_samples: 25,
        }
    }
}

/// Capture framing and acquisition timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureCfg {
    pub trigger_phrase: String,
    pub timeout: Duration,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            trigger_phrase: DEFAULT_TRIGGER_PHRASE.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Pipe dimensions in metres and the wall material's speed of sound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipeGeometry {
    pub inner_diameter_m: f64,
    pub outer_diameter_m: f64,
    pub pipe_sound_speed_mps: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcousticConfig {
    /// Speed of sound in the medium; `None` or `0` selects the
    /// transit-time correction.
    pub medium_sound_speed_mps: Option<f64>,
    pub calibration_offset_s: f64,
}

impl Default for AcousticConfig {
    fn default() -> Self {
        Self {
            medium_sound_speed_mps: None,
            calibration_offset_s: DEFAULT_CALIBRATION_OFFSET_S,
        }
    }
}

impl AcousticConfig {
    /// The configured medium speed, if it selects the direct branch.
    pub fn direct_speed(&self) -> Option<f64> {
        self.medium_sound_speed_mps.filter(|c| *c != 0.0)
    }
}

/// Everything one iteration needs. Immutable for the length of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub signal: SignalCfg,
    pub capture: CaptureCfg,
    pub pipe: PipeGeometry,
    pub acoustic: AcousticConfig,
}

fn positive_finite(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

fn invalid(msg: &str) -> FlowError {
    FlowError::InvalidConfig(msg.to_string())
}

impl RunContext {
    pub fn new(pipe: PipeGeometry) -> Self {
        Self {
            signal: SignalCfg::default(),
            capture: CaptureCfg::default(),
            pipe,
            acoustic: AcousticConfig::default(),
        }
    }

    /// `√2 × inner diameter`: acoustic path length across the pipe.
    pub fn characteristic_distance(&self) -> f64 {
        std::f64::consts::SQRT_2 * self.pipe.inner_diameter_m
    }

    /// Time spent crossing the pipe wall.
    pub fn wall_transit_time(&self) -> f64 {
        (self.pipe.outer_diameter_m - self.pipe.inner_diameter_m) / self.pipe.pipe_sound_speed_mps
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        let s = &self.signal;
        if !positive_finite(s.sampling_rate_hz) {
            return Err(invalid("sampling_rate_hz must be > 0"));
        }
        // Cutoff and order problems degrade to unfiltered series instead.
        if self.capture.trigger_phrase.trim().is_empty() {
            return Err(invalid("trigger_phrase must not be empty"));
        }

        let p = &self.pipe;
        if !positive_finite(p.inner_diameter_m) {
            return Err(invalid("inner_diameter_m must be > 0"));
        }
        if !positive_finite(p.outer_diameter_m) {
            return Err(invalid("outer_diameter_m must be > 0"));
        }
        if p.outer_diameter_m < p.inner_diameter_m {
            return Err(invalid("outer_diameter_m must be >= inner_diameter_m"));
        }
        if !positive_finite(p.pipe_sound_speed_mps) {
            return Err(invalid("pipe_sound_speed_mps must be > 0"));
        }

        let a = &self.acoustic;
        if let Some(c) = a.medium_sound_speed_mps
            && (!c.is_finite() || c < 0.0)
        {
            return Err(invalid("medium_sound_speed_mps must be >= 0"));
        }
        if !a.calibration_offset_s.is_finite() {
            return Err(invalid("calibration_offset_s must be finite"));
        }
        Ok(())
    }
}
