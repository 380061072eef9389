#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and reference-table parsing for the flow meter.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The speed-of-sound CSV loader enforces headers and strictly increasing
//!   temperatures so the table can back a cubic interpolant.
use serde::Deserialize;

pub use flowmeter_traits::DEFAULT_TRIGGER_PHRASE;

/// Fixed rig delay (seconds) subtracted from the averaged time of flight.
pub const DEFAULT_CALIBRATION_OFFSET_S: f64 = 0.000_032_208_014_25;

/// Speed-of-sound reference CSV schema.
///
/// Expected headers:
/// celsius,speed_mps
///
/// Example:
/// celsius,speed_mps
/// 0,1403
/// 5,1427
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct SoundSpeedRow {
    pub celsius: f64,
    pub speed_mps: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SignalCfg {
    /// ADC sampling rate of the rig in Hz.
    pub sampling_rate_hz: f64,
    /// Low-pass cutoff in Hz; must sit below Nyquist.
    pub cutoff_hz: f64,
    /// Butterworth order for the zero-phase filter.
    pub filter_order: usize,
    /// Leading samples dropped from each channel (hardware settling).
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CaptureCfg {
    /// Line prefix marking the start of valid data.
    pub trigger_phrase: String,
    /// Max time to wait for one capture from the acquisition side (ms).
    pub timeout_ms: u64,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            trigger_phrase: DEFAULT_TRIGGER_PHRASE.to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PipeCfg {
    pub inner_diameter_m: f64,
    pub outer_diameter_m: f64,
    /// Speed of sound in the pipe wall material.
    pub sound_speed_mps: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AcousticCfg {
    /// Speed of sound in the medium. Absent or 0 selects the transit-time
    /// correction branch.
    pub medium_sound_speed_mps: Option<f64>,
    pub calibration_offset_s: f64,
}

impl Default for AcousticCfg {
    fn default() -> Self {
        Self {
            medium_sound_speed_mps: None,
            calibration_offset_s: DEFAULT_CALIBRATION_OFFSET_S,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Pause between measurement iterations (ms).
    pub interval_ms: u64,
    /// Stop after this many iterations; 0 runs until interrupted.
    pub max_iterations: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            max_iterations: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub signal: SignalCfg,
    #[serde(default)]
    pub capture: CaptureCfg,
    pub pipe: PipeCfg,
    #[serde(default)]
    pub acoustic: AcousticCfg,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Validated (temperature, speed) reference pairs, strictly increasing in
/// temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundSpeedTable {
    pub points: Vec<(f64, f64)>,
}

impl SoundSpeedTable {
    /// Minimum number of knots for a not-a-knot cubic spline.
    pub const MIN_POINTS: usize = 4;

    pub fn from_rows(rows: Vec<SoundSpeedRow>) -> eyre::Result<Self> {
        if rows.len() < Self::MIN_POINTS {
            eyre::bail!(
                "sound speed table requires at least {} rows, got {}",
                Self::MIN_POINTS,
                rows.len()
            );
        }
        for (i, r) in rows.iter().enumerate() {
            if !r.celsius.is_finite() || !r.speed_mps.is_finite() {
                eyre::bail!("sound speed table row {} is not finite", i);
            }
            if r.speed_mps <= 0.0 {
                eyre::bail!("sound speed table row {} has non-positive speed", i);
            }
        }
        for i in 1..rows.len() {
            if rows[i].celsius <= rows[i - 1].celsius {
                eyre::bail!(
                    "sound speed table temperatures must be strictly increasing (rows {} and {})",
                    i - 1,
                    i
                );
            }
        }
        Ok(Self {
            points: rows.iter().map(|r| (r.celsius, r.speed_mps)).collect(),
        })
    }
}

impl TryFrom<Vec<SoundSpeedRow>> for SoundSpeedTable {
    type Error = eyre::Report;
    fn try_from(rows: Vec<SoundSpeedRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

pub fn load_sound_speed_csv(path: &std::path::Path) -> eyre::Result<SoundSpeedTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open sound speed CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["celsius", "speed_mps"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "sound speed CSV must have headers 'celsius,speed_mps', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<SoundSpeedRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    SoundSpeedTable::try_from(rows)
}

fn positive_finite(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Signal
        if !positive_finite(self.signal.sampling_rate_hz) {
            eyre::bail!("signal.sampling_rate_hz must be > 0");
        }
        if !positive_finite(self.signal.cutoff_hz) {
            eyre::bail!("signal.cutoff_hz must be > 0");
        }
        if self.signal.cutoff_hz >= self.signal.sampling_rate_hz / 2.0 {
            eyre::bail!("signal.cutoff_hz must be below Nyquist (sampling_rate_hz / 2)");
        }
        if self.signal.filter_order == 0 || self.signal.filter_order > 10 {
            eyre::bail!("signal.filter_order must be in [1, 10]");
        }

        // Capture
        if self.capture.trigger_phrase.trim().is_empty() {
            eyre::bail!("capture.trigger_phrase must not be empty");
        }
        if self.capture.timeout_ms == 0 {
            eyre::bail!("capture.timeout_ms must be >= 1");
        }

        // Pipe
        if !positive_finite(self.pipe.inner_diameter_m) {
            eyre::bail!("pipe.inner_diameter_m must be > 0");
        }
        if !positive_finite(self.pipe.outer_diameter_m) {
            eyre::bail!("pipe.outer_diameter_m must be > 0");
        }
        if self.pipe.outer_diameter_m < self.pipe.inner_diameter_m {
            eyre::bail!("pipe.outer_diameter_m must be >= pipe.inner_diameter_m");
        }
        if !positive_finite(self.pipe.sound_speed_mps) {
            eyre::bail!("pipe.sound_speed_mps must be > 0");
        }

        // Acoustic
        if let Some(c) = self.acoustic.medium_sound_speed_mps
            && (!c.is_finite() || c < 0.0)
        {
            eyre::bail!("acoustic.medium_sound_speed_mps must be >= 0");
        }
        if !self.acoustic.calibration_offset_s.is_finite() {
            eyre::bail!("acoustic.calibration_offset_s must be finite");
        }

        // Runner
        if self.runner.interval_ms > 60 * 60 * 1000 {
            eyre::bail!("runner.interval_ms is unreasonably large (>1h)");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
