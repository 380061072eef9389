//! Trace sources for the flow meter pipeline.
//!
//! The real rig dumps its terminal output into a text file; [`FileCapture`]
//! picks that file up. [`SimulatedCapture`] renders a synthetic capture with
//! a known upstream delay so the whole pipeline can run without hardware.
pub mod error;
pub mod util;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flowmeter_traits::{DEFAULT_TRIGGER_PHRASE, TraceSource};

use crate::error::{CaptureError, Result};

/// Reads the capture file written by the acquisition tool.
#[derive(Debug, Clone)]
pub struct FileCapture {
    path: PathBuf,
    poll_interval: Duration,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            poll_interval: Duration::from_millis(20),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the file to appear, then read it whole.
    pub fn read_capture(&self, timeout: Duration) -> Result<String> {
        let path = self.path.as_path();
        util::wait_until_ready_with_timeout(|| path.is_file(), timeout, self.poll_interval)
            .map_err(|e| match e {
                CaptureError::Timeout => CaptureError::NotReady(path.display().to_string()),
                other => other,
            })?;
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes).map_err(|e| CaptureError::Encoding(e.to_string()))?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "capture read");
        Ok(text)
    }
}

impl TraceSource for FileCapture {
    fn acquire(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.read_capture(timeout).map_err(Into::into)
    }
}

/// Parameters for a synthetic two-channel capture.
///
/// Both channels carry the same Gaussian-windowed tone burst; the upstream
/// copy is delayed by `shift_samples`.
#[derive(Debug, Clone)]
pub struct SimulatedTrace {
    pub trigger_phrase: String,
    pub sampling_rate_hz: f64,
    pub samples_per_channel: usize,
    /// Upstream delay relative to downstream, in samples (may be negative).
    pub shift_samples: i64,
    pub burst_center: f64,
    pub burst_width: f64,
    pub carrier_hz: f64,
    pub amplitude_v: f64,
    pub temperature_f: Option<f64>,
}

impl Default for SimulatedTrace {
    fn default() -> Self {
        Self {
            trigger_phrase: DEFAULT_TRIGGER_PHRASE.to_string(),
            sampling_rate_hz: 50e6,
            samples_per_channel: 2048,
            shift_samples: 4,
            burst_center: 1024.0,
            burst_width: 160.0,
            carrier_hz: 250e3,
            amplitude_v: 1.2,
            temperature_f: Some(68.0),
        }
    }
}

impl SimulatedTrace {
    fn voltage(&self, index: f64) -> f64 {
        let x = (index - self.burst_center) / self.burst_width;
        let phase = 2.0 * std::f64::consts::PI * self.carrier_hz * index / self.sampling_rate_hz;
        self.amplitude_v * (-x * x).exp() * phase.sin()
    }

    /// Render the capture text exactly as the rig terminal would print it.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.samples_per_channel * 2 * 20 + 128);
        // Boot chatter before the trigger is discarded by the parser.
        let _ = writeln!(out, "nios2-terminal: connected to hardware target");
        let _ = writeln!(out, "{}", self.trigger_phrase);
        let _ = writeln!(out, "== sampling ==");
        if let Some(t) = self.temperature_f {
            let _ = writeln!(out, "temperature: {t}");
        }
        for i in 0..self.samples_per_channel {
            let v = self.voltage(i as f64);
            let _ = writeln!(out, "ds {i} {v:.9}");
        }
        for i in 0..self.samples_per_channel {
            let v = self.voltage(i as f64 - self.shift_samples as f64);
            let _ = writeln!(out, "us {i} {v:.9}");
        }
        let _ = writeln!(out, "DONE");
        out
    }
}

/// Deterministic in-memory source returning a fresh rendering per call.
#[derive(Debug, Clone, Default)]
pub struct SimulatedCapture {
    trace: SimulatedTrace,
    acquisitions: u64,
}

impl SimulatedCapture {
    pub fn new(trace: SimulatedTrace) -> Self {
        Self {
            trace,
            acquisitions: 0,
        }
    }

    pub fn trace(&self) -> &SimulatedTrace {
        &self.trace
    }

    pub fn acquisitions(&self) -> u64 {
        self.acquisitions
    }
}

impl TraceSource for SimulatedCapture {
    fn acquire(
        &mut self,
        _timeout: Duration,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.acquisitions += 1;
        tracing::trace!(n = self.acquisitions, "simulated capture");
        Ok(self.trace.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_capture_is_framed() {
        let mut src = SimulatedCapture::new(SimulatedTrace {
            samples_per_channel: 8,
            ..SimulatedTrace::default()
        });
        let text = src.acquire(Duration::from_millis(10)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "== IT'S ALIVE ==");
        assert_eq!(lines[3], "temperature: 68");
        assert_eq!(lines.iter().filter(|l| l.starts_with("us ")).count(), 8);
        assert_eq!(lines.iter().filter(|l| l.starts_with("ds ")).count(), 8);
        assert_eq!(lines.last().copied(), Some("DONE"));
        assert_eq!(src.acquisitions(), 1);
    }

    #[test]
    fn upstream_is_delayed_copy() {
        let trace = SimulatedTrace::default();
        let text = trace.render();
        let value = |prefix: &str, idx: usize| -> String {
            let head = format!("{prefix} {idx} ");
            text.lines()
                .find_map(|l| l.strip_prefix(head.as_str()))
                .unwrap_or_default()
                .to_string()
        };
        let shift = trace.shift_samples as usize;
        for k in [900usize, 1000, 1024, 1100] {
            assert_eq!(value("ds", k), value("us", k + shift));
        }
        assert_ne!(value("ds", 1000), value("us", 1000));
    }

    #[test]
    fn file_capture_times_out_when_missing() {
        let mut src = FileCapture::new("/nonexistent/dir/readings.txt")
            .with_poll_interval(Duration::from_millis(1));
        let err = src.acquire(Duration::from_millis(5)).expect_err("no file");
        assert!(err.to_string().contains("not ready"));
    }
}
