//! Background measurement loop.
//!
//! Spawns a thread that owns the `TraceSource`, runs one pipeline iteration
//! per acquisition, publishes successes into a [`SharedSession`] and reports
//! every outcome over a bounded channel.
//!
//! Each `MeasurementWorker` spawns exactly one thread, shut down and joined
//! when the worker is dropped. Shutdown is observed between iterations.
use crossbeam_channel as xch;
use flowmeter_traits::TraceSource;
use flowmeter_traits::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::error::FlowError;
use crate::pipeline::Pipeline;
use crate::session::SharedSession;
use crate::types::FlowMeasurement;

/// Longest uninterrupted sleep; bounds shutdown latency during pauses.
const PAUSE_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Pause between the end of one iteration and the next acquisition.
    pub interval: Duration,
    /// Stop after this many iterations; `None` runs until stopped.
    pub max_iterations: Option<u64>,
    pub channel_capacity: usize,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_iterations: None,
            channel_capacity: 16,
        }
    }
}

#[derive(Debug)]
pub enum IterationEvent {
    Measured {
        iteration: u64,
        measurement: FlowMeasurement,
        cumulative_average: f64,
        warnings: Vec<FlowError>,
    },
    Failed {
        iteration: u64,
        error: eyre::Report,
    },
    /// Last event; the worker thread exits right after sending it.
    Finished { iterations: u64 },
}

pub struct MeasurementWorker {
    rx: xch::Receiver<IterationEvent>,
    session: SharedSession,
    completed: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

fn pause<C: Clock>(clock: &C, total: Duration, shutdown: &AtomicBool) {
    let mut left = total;
    while !left.is_zero() && !shutdown.load(Ordering::Relaxed) {
        let step = left.min(PAUSE_SLICE);
        clock.sleep(step);
        left -= step;
    }
}

impl MeasurementWorker {
    pub fn spawn<S, C>(
        pipeline: Pipeline,
        mut source: S,
        session: SharedSession,
        opts: WorkerOptions,
        clock: C,
    ) -> Self
    where
        S: TraceSource + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded(opts.channel_capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let completed = Arc::new(AtomicU64::new(0));
        let completed_clone = completed.clone();
        let session_clone = session.clone();

        let join_handle = std::thread::spawn(move || {
            let mut iteration = 0u64;
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("measurement worker received shutdown signal");
                    break;
                }
                if opts.max_iterations.is_some_and(|max| iteration >= max) {
                    break;
                }
                iteration += 1;

                let outcome = pipeline
                    .acquire(&mut source)
                    .and_then(|text| pipeline.run_iteration(&text));
                let ev = match outcome {
                    Ok(report) => {
                        let cumulative_average = session_clone.append(report.measurement);
                        IterationEvent::Measured {
                            iteration,
                            measurement: report.measurement,
                            cumulative_average,
                            warnings: report.warnings,
                        }
                    }
                    Err(error) => {
                        tracing::warn!(iteration, error = %error, "iteration failed");
                        IterationEvent::Failed { iteration, error }
                    }
                };
                completed_clone.store(iteration, Ordering::Relaxed);

                // If send fails, consumer is gone; exit gracefully
                if tx.send(ev).is_err() {
                    tracing::debug!("measurement consumer gone, exiting worker");
                    break;
                }
                if opts.max_iterations.is_some_and(|max| iteration >= max) {
                    break;
                }
                pause(&clock, opts.interval, &shutdown_clone);
            }
            let _ = tx.send(IterationEvent::Finished {
                iterations: iteration,
            });
            tracing::trace!(iterations = iteration, "measurement worker exiting cleanly");
        });

        Self {
            rx,
            session,
            completed,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    pub fn events(&self) -> &xch::Receiver<IterationEvent> {
        &self.rx
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<IterationEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Iterations attempted so far, successful or not.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Ask the loop to stop after the current iteration. Events already
    /// produced, and the final `Finished`, are still delivered.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle.as_ref().is_none_or(|h| h.is_finished())
    }
}

impl Drop for MeasurementWorker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Disconnect first so a send blocked on a full channel fails
        // instead of waiting for a reader that will never come.
        drop(std::mem::replace(&mut self.rx, xch::never()));
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("measurement worker joined");
                }
                Err(e) => {
                    tracing::warn!(?e, "measurement worker panicked during shutdown");
                }
            }
        }
    }
}
