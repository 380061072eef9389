//! Single-shot commands: one measurement, the speed-of-sound lookup and the
//! self-check.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use eyre::WrapErr;
use flowmeter_capture::{FileCapture, SimulatedTrace};
use flowmeter_config::Config;
use flowmeter_core::acoustics::fahrenheit_to_celsius;
use flowmeter_core::{IterationReport, Pipeline, RunContext, SoundSpeedCurve, SpeedOfSound};
use serde_json::json;

use crate::cli::json_mode;

/// Milliseconds since the Unix epoch; 0 if the system clock is before it.
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub fn pipeline_from_config(cfg: &Config) -> eyre::Result<Pipeline> {
    Pipeline::new(RunContext::from(cfg))
}

fn speed_source(speed: &SpeedOfSound) -> &'static str {
    match speed {
        SpeedOfSound::Direct(_) => "configured",
        SpeedOfSound::TransitCorrected { .. } => "transit_corrected",
    }
}

pub fn run_measure(cfg: &Config, capture: &Path, dump_series: Option<&Path>) -> eyre::Result<()> {
    let pipeline = pipeline_from_config(cfg)?;
    let mut source = FileCapture::new(capture);
    let text = pipeline.acquire(&mut source)?;
    let report = pipeline.run_iteration(&text)?;

    if let Some(dir) = dump_series {
        dump(dir, &report)?;
    }

    let m = report.measurement;
    if json_mode() {
        let warnings: Vec<String> = report.warnings.iter().map(ToString::to_string).collect();
        println!(
            "{}",
            json!({
                "timestamp": timestamp_ms(),
                "flow_rate": m.flow_rate,
                "time_lag_s": m.lag.time_lag_s,
                "lag_index": report.lag.lag_index,
                "temperature_f": m.temperature,
                "speed_of_sound_mps": report.speed.speed_mps(),
                "speed_source": speed_source(&report.speed),
                "upstream_samples": report.upstream.len(),
                "downstream_samples": report.downstream.len(),
                "skipped_lines": report.stats.malformed_lines,
                "warnings": warnings,
            })
        );
    } else {
        println!("Flow rate: {:.6}", m.flow_rate);
        println!(
            "Time lag: {:.3e} s ({} samples)",
            m.lag.time_lag_s, report.lag.lag_index
        );
        println!(
            "Speed of sound: {:.2} m/s ({})",
            report.speed.speed_mps(),
            speed_source(&report.speed)
        );
        match m.temperature {
            Some(t) => println!("Temperature: {t:.1} F"),
            None => println!("Temperature: n/a"),
        }
        for w in &report.warnings {
            println!("Warning: {w}");
        }
    }
    Ok(())
}

/// `upstream.csv`, `downstream.csv` and `correlation.csv` under `dir`.
fn dump(dir: &Path, report: &IterationReport) -> eyre::Result<()> {
    std::fs::create_dir_all(dir).wrap_err_with(|| format!("create {}", dir.display()))?;

    for (name, series) in [
        ("upstream.csv", &report.upstream),
        ("downstream.csv", &report.downstream),
    ] {
        let path = dir.join(name);
        let mut w = csv::Writer::from_path(&path)
            .wrap_err_with(|| format!("create {}", path.display()))?;
        w.write_record(["time_s", "voltage", "filtered_voltage"])?;
        for p in &series.points {
            w.write_record([
                p.time_s.to_string(),
                p.voltage.to_string(),
                p.filtered_voltage.to_string(),
            ])?;
        }
        w.flush()?;
    }

    let path = dir.join("correlation.csv");
    let mut w =
        csv::Writer::from_path(&path).wrap_err_with(|| format!("create {}", path.display()))?;
    w.write_record(["lag_s", "correlation"])?;
    for (lag, c) in report.lag.lag_axis().iter().zip(&report.lag.correlation) {
        w.write_record([lag.to_string(), c.to_string()])?;
    }
    w.flush()?;
    tracing::info!(dir = %dir.display(), "series dumped");
    Ok(())
}

pub fn sound_speed(fahrenheit: f64, table: Option<&Path>) -> eyre::Result<()> {
    let curve = match table {
        Some(path) => {
            let t = flowmeter_config::load_sound_speed_csv(path)?;
            SoundSpeedCurve::try_from(&t).map_err(eyre::Report::new)?
        }
        None => SoundSpeedCurve::water().map_err(eyre::Report::new)?,
    };
    let speed = curve
        .speed_at_fahrenheit(fahrenheit)
        .map_err(eyre::Report::new)?;
    let celsius = fahrenheit_to_celsius(fahrenheit);
    if json_mode() {
        println!(
            "{}",
            json!({
                "fahrenheit": fahrenheit,
                "celsius": celsius,
                "speed_mps": speed,
            })
        );
    } else {
        println!("Speed of sound at {fahrenheit:.2} F ({celsius:.2} C): {speed:.3} m/s");
    }
    Ok(())
}

/// Run one synthetic capture through the configured pipeline and check the
/// known delay comes back out.
pub fn self_check(cfg: &Config) -> eyre::Result<()> {
    let pipeline = pipeline_from_config(cfg)?;
    let signal = &pipeline.context().signal;
    let samples = (signal.warmup_samples + 1024).max(2048);
    let trace = SimulatedTrace {
        trigger_phrase: cfg.capture.trigger_phrase.clone(),
        sampling_rate_hz: signal.sampling_rate_hz,
        samples_per_channel: samples,
        burst_center: (signal.warmup_samples + samples) as f64 / 2.0,
        carrier_hz: signal.cutoff_hz / 4.0,
        ..SimulatedTrace::default()
    };
    let report = pipeline
        .run_iteration(&trace.render())
        .wrap_err("self-check iteration")?;
    if report.lag.lag_index != trace.shift_samples {
        eyre::bail!(
            "self-check recovered a lag of {} samples, expected {}",
            report.lag.lag_index,
            trace.shift_samples
        );
    }
    tracing::info!(
        lag_index = report.lag.lag_index,
        flow_rate = report.measurement.flow_rate,
        "self-check passed"
    );
    if json_mode() {
        println!(
            "{}",
            json!({ "ok": true, "lag_index": report.lag.lag_index, "flow_rate": report.measurement.flow_rate })
        );
    } else {
        println!("OK");
    }
    Ok(())
}
