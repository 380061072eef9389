//! Continuous measurement: background worker, Ctrl-C handling and history
//! export.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use flowmeter_capture::{FileCapture, SimulatedCapture, SimulatedTrace};
use flowmeter_config::Config;
use flowmeter_core::{
    IterationEvent, MeasurementSession, MeasurementWorker, SharedSession, WorkerOptions,
};
use flowmeter_traits::{MonotonicClock, TraceSource};
use serde_json::json;

use crate::cli::json_mode;
use crate::error_fmt::{humanize, reason_name};
use crate::measure::{pipeline_from_config, timestamp_ms};

/// How often the foreground loop wakes to check for Ctrl-C.
const POLL: Duration = Duration::from_millis(100);

pub struct RunArgs {
    pub capture: Option<PathBuf>,
    pub simulate: bool,
    pub iterations: Option<u64>,
    pub interval_ms: Option<u64>,
    pub export: Option<PathBuf>,
}

pub fn run_loop(cfg: &Config, args: RunArgs) -> eyre::Result<()> {
    let pipeline = pipeline_from_config(cfg)?;

    let source: Box<dyn TraceSource + Send> = match (&args.capture, args.simulate) {
        (Some(path), false) => Box::new(FileCapture::new(path)),
        _ => Box::new(SimulatedCapture::new(SimulatedTrace {
            trigger_phrase: cfg.capture.trigger_phrase.clone(),
            sampling_rate_hz: cfg.signal.sampling_rate_hz,
            ..SimulatedTrace::default()
        })),
    };

    let mut opts = WorkerOptions::from(&cfg.runner);
    if let Some(n) = args.iterations {
        opts.max_iterations = (n > 0).then_some(n);
    }
    if let Some(ms) = args.interval_ms {
        opts.interval = Duration::from_millis(ms);
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = interrupted.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    tracing::info!(
        interval_ms = opts.interval.as_millis() as u64,
        max_iterations = ?opts.max_iterations,
        simulate = args.simulate,
        "run start"
    );
    let worker = MeasurementWorker::spawn(
        pipeline,
        source,
        SharedSession::new(),
        opts,
        MonotonicClock::new(),
    );

    let mut stop_sent = false;
    let mut last_error: Option<eyre::Report> = None;
    loop {
        if !stop_sent && interrupted.load(Ordering::Relaxed) {
            tracing::info!("interrupted; finishing current iteration");
            worker.stop();
            stop_sent = true;
        }
        match worker.recv_timeout(POLL) {
            Some(IterationEvent::Measured {
                iteration,
                measurement,
                cumulative_average,
                warnings,
            }) => {
                if json_mode() {
                    println!(
                        "{}",
                        json!({
                            "timestamp": timestamp_ms(),
                            "iteration": iteration,
                            "flow_rate": measurement.flow_rate,
                            "cumulative_average": cumulative_average,
                            "time_lag_s": measurement.lag.time_lag_s,
                            "temperature_f": measurement.temperature,
                            "warnings": warnings.len(),
                        })
                    );
                } else {
                    println!(
                        "[{iteration}] flow rate {:.6} (average {cumulative_average:.6})",
                        measurement.flow_rate
                    );
                }
            }
            Some(IterationEvent::Failed { iteration, error }) => {
                tracing::warn!(iteration, error = %error, "iteration failed");
                if json_mode() {
                    println!(
                        "{}",
                        json!({
                            "timestamp": timestamp_ms(),
                            "iteration": iteration,
                            "error": reason_name(&error),
                            "message": error.to_string(),
                        })
                    );
                } else {
                    eprintln!("[{iteration}] failed: {}", humanize(&error));
                }
                last_error = Some(error);
            }
            Some(IterationEvent::Finished { iterations }) => {
                tracing::info!(iterations, "run finished");
                break;
            }
            None if worker.is_finished() => break,
            None => {}
        }
    }

    let session = worker.session().snapshot();
    if let Some(path) = args.export.as_deref() {
        export_history(path, &session)?;
    }
    if !json_mode() {
        match session.current_average() {
            Some(avg) => println!(
                "{} measurement(s), average flow rate {avg:.6}",
                session.len()
            ),
            None => println!("no successful measurements"),
        }
    }

    // A run that never produced a measurement reports why.
    match last_error {
        Some(err) if session.is_empty() => Err(err),
        _ => Ok(()),
    }
}

fn export_history(path: &Path, session: &MeasurementSession) -> eyre::Result<()> {
    let mut w =
        csv::Writer::from_path(path).wrap_err_with(|| format!("create {}", path.display()))?;
    w.write_record([
        "iteration",
        "flow_rate",
        "cumulative_average",
        "time_lag_s",
        "temperature_f",
    ])?;
    let history = session.history();
    for (i, (m, avg)) in session
        .measurements()
        .iter()
        .zip(&history.cumulative_average)
        .enumerate()
    {
        w.write_record([
            (i + 1).to_string(),
            m.flow_rate.to_string(),
            avg.to_string(),
            m.lag.time_lag_s.to_string(),
            m.temperature.map(|t| t.to_string()).unwrap_or_default(),
        ])?;
    }
    w.flush()?;
    tracing::info!(path = %path.display(), rows = session.len(), "history exported");
    Ok(())
}
