//! One measurement iteration: capture text in, flow measurement out.
//!
//! [`Pipeline::builder`] is a type-state builder: `build()` only exists once
//! the pipe geometry is set. `try_build()` is always available and reports
//! what is missing at runtime.

use std::io::BufRead;
use std::marker::PhantomData;

use flowmeter_traits::TraceSource;

use crate::capture_error::map_capture_error;
use crate::conditioner::SignalConditioner;
use crate::config::{AcousticConfig, CaptureCfg, PipeGeometry, RunContext, SignalCfg};
use crate::error::{BuildError, FlowError, Result};
use crate::flow::{flow_from_lag, resolve_speed_of_sound};
use crate::lag::{LagAnalysis, analyze_lag};
use crate::parser::{ParsedCapture, ScanStats, parse_capture, parse_reader};
use crate::session::MeasurementSession;
use crate::types::{Channel, FlowMeasurement, SampleSeries, SpeedOfSound};

/// Everything produced by one successful iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    pub upstream: SampleSeries,
    pub downstream: SampleSeries,
    pub lag: LagAnalysis,
    pub speed: SpeedOfSound,
    pub measurement: FlowMeasurement,
    /// Non-fatal problems, e.g. a channel left unfiltered.
    pub warnings: Vec<FlowError>,
    pub stats: ScanStats,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    ctx: RunContext,
    conditioner: SignalConditioner,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder<Missing> {
        PipelineBuilder::default()
    }

    /// Validate `ctx` and design the filter.
    pub fn new(ctx: RunContext) -> Result<Self> {
        ctx.validate().map_err(eyre::Report::new)?;
        let conditioner = SignalConditioner::new(&ctx.signal);
        Ok(Self { ctx, conditioner })
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Pull one capture from `source`, honouring the configured timeout.
    pub fn acquire<S: TraceSource + ?Sized>(&self, source: &mut S) -> Result<String> {
        source
            .acquire(self.ctx.capture.timeout)
            .map_err(|e| eyre::Report::new(map_capture_error(&*e)))
    }

    pub fn run_iteration(&self, text: &str) -> Result<IterationReport> {
        let parsed = parse_capture(text, &self.ctx.capture.trigger_phrase);
        self.evaluate(parsed)
    }

    pub fn run_reader<R: BufRead>(&self, reader: R) -> Result<IterationReport> {
        let parsed = parse_reader(reader, &self.ctx.capture.trigger_phrase)
            .map_err(|e| eyre::Report::new(FlowError::Acquisition(e.to_string())))?;
        self.evaluate(parsed)
    }

    /// Run one iteration and append the result to `session`.
    ///
    /// A failed iteration leaves the session untouched.
    pub fn measure(&self, text: &str, session: &mut MeasurementSession) -> Result<FlowMeasurement> {
        let report = self.run_iteration(text)?;
        let average = session.append(report.measurement);
        tracing::debug!(average, n = session.len(), "session updated");
        Ok(report.measurement)
    }

    fn evaluate(&self, parsed: ParsedCapture) -> Result<IterationReport> {
        let stats = parsed.stats;
        if stats.malformed_lines > 0 {
            tracing::warn!(
                skipped = stats.malformed_lines,
                "malformed sample lines skipped"
            );
        }
        if stats.triggered && !stats.done_seen {
            tracing::debug!("capture ended without DONE");
        }

        let trimmed = parsed
            .into_trimmed(self.ctx.signal.warmup_samples, &self.ctx.capture.trigger_phrase)
            .map_err(|e| eyre::Report::new(FlowError::from(e)))?;

        let mut warnings = Vec::new();
        let us = self.conditioner.condition(Channel::Upstream, &trimmed.upstream);
        let ds = self.conditioner.condition(Channel::Downstream, &trimmed.downstream);
        for (channel, warning) in [
            (Channel::Upstream, us.filter_warning),
            (Channel::Downstream, ds.filter_warning),
        ] {
            if let Some(reason) = warning {
                warnings.push(FlowError::FilterDegenerate { channel, reason });
            }
        }
        let (upstream, downstream) = (us.series, ds.series);

        let lag = analyze_lag(&upstream, &downstream).map_err(eyre::Report::new)?;
        let speed =
            resolve_speed_of_sound(&self.ctx, &upstream, &downstream).map_err(eyre::Report::new)?;
        let flow_rate = flow_from_lag(
            lag.estimate.time_lag_s,
            self.ctx.characteristic_distance(),
            speed.speed_mps(),
        );
        let measurement = FlowMeasurement {
            flow_rate,
            temperature: trimmed.temperature,
            lag: lag.estimate,
        };
        tracing::info!(
            flow_rate,
            time_lag_s = lag.estimate.time_lag_s,
            speed_of_sound_mps = speed.speed_mps(),
            temperature_f = ?trimmed.temperature,
            upstream = upstream.len(),
            downstream = downstream.len(),
            "iteration complete"
        );

        Ok(IterationReport {
            upstream,
            downstream,
            lag,
            speed,
            measurement,
            warnings,
            stats,
        })
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for [`Pipeline`]. Unset sections fall back to their defaults.
pub struct PipelineBuilder<G> {
    pipe: Option<PipeGeometry>,
    signal: Option<SignalCfg>,
    capture: Option<CaptureCfg>,
    acoustic: Option<AcousticConfig>,
    _g: PhantomData<G>,
}

impl Default for PipelineBuilder<Missing> {
    fn default() -> Self {
        Self {
            pipe: None,
            signal: None,
            capture: None,
            acoustic: None,
            _g: PhantomData,
        }
    }
}

impl<G> PipelineBuilder<G> {
    pub fn with_signal(mut self, signal: SignalCfg) -> Self {
        self.signal = Some(signal);
        self
    }
    pub fn with_capture(mut self, capture: CaptureCfg) -> Self {
        self.capture = Some(capture);
        self
    }
    pub fn with_trigger_phrase(mut self, phrase: impl Into<String>) -> Self {
        let mut c = self.capture.unwrap_or_default();
        c.trigger_phrase = phrase.into();
        self.capture = Some(c);
        self
    }
    pub fn with_warmup(mut self, samples: usize) -> Self {
        let mut s = self.signal.unwrap_or_default();
        s.warmup_samples = samples;
        self.signal = Some(s);
        self
    }
    pub fn with_acoustic(mut self, acoustic: AcousticConfig) -> Self {
        self.acoustic = Some(acoustic);
        self
    }
    pub fn with_medium_sound_speed(mut self, speed_mps: f64) -> Self {
        let mut a = self.acoustic.unwrap_or_default();
        a.medium_sound_speed_mps = Some(speed_mps);
        self.acoustic = Some(a);
        self
    }

    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<Pipeline> {
        let pipe = self
            .pipe
            .ok_or_else(|| eyre::Report::new(BuildError::MissingGeometry))?;
        Pipeline::new(RunContext {
            signal: self.signal.unwrap_or_default(),
            capture: self.capture.unwrap_or_default(),
            pipe,
            acoustic: self.acoustic.unwrap_or_default(),
        })
    }
}

impl PipelineBuilder<Missing> {
    pub fn with_pipe(self, pipe: PipeGeometry) -> PipelineBuilder<Set> {
        PipelineBuilder {
            pipe: Some(pipe),
            signal: self.signal,
            capture: self.capture,
            acoustic: self.acoustic,
            _g: PhantomData,
        }
    }
}

impl PipelineBuilder<Set> {
    pub fn build(self) -> Result<Pipeline> {
        self.try_build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe() -> PipeGeometry {
        PipeGeometry {
            inner_diameter_m: 0.02,
            outer_diameter_m: 0.025,
            pipe_sound_speed_mps: 2500.0,
        }
    }

    #[test]
    fn missing_geometry_is_reported() {
        let err = Pipeline::builder().try_build().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::MissingGeometry)
        ));
    }

    #[test]
    fn invalid_context_is_rejected() {
        let err = Pipeline::builder()
            .with_pipe(PipeGeometry {
                outer_diameter_m: 0.01,
                ..pipe()
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FlowError>(),
            Some(FlowError::InvalidConfig(_))
        ));
    }

    #[test]
    fn setters_compose() {
        let p = Pipeline::builder()
            .with_trigger_phrase("GO")
            .with_warmup(3)
            .with_medium_sound_speed(1480.0)
            .with_pipe(pipe())
            .build()
            .unwrap();
        let ctx = p.context();
        assert_eq!(ctx.capture.trigger_phrase, "GO");
        assert_eq!(ctx.signal.warmup_samples, 3);
        assert_eq!(ctx.signal.sampling_rate_hz, 50e6);
        assert_eq!(ctx.acoustic.direct_speed(), Some(1480.0));
    }

    #[test]
    fn failed_iteration_does_not_touch_session() {
        let p = Pipeline::builder().with_pipe(pipe()).build().unwrap();
        let mut session = MeasurementSession::new();
        let err = p.measure("no trigger here\nus 0 1\n", &mut session).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FlowError>(),
            Some(FlowError::ParseIncomplete(_))
        ));
        assert!(session.is_empty());
    }
}
