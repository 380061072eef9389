#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap,
    clippy::similar_names
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Transit-time ultrasonic flow measurement (acquisition-agnostic).
//!
//! This crate turns a text capture of two ultrasonic traces into a flow
//! rate. Captures arrive through `flowmeter_traits::TraceSource`; nothing
//! here talks to hardware.
//!
//! ## Pipeline
//!
//! - **Parsing**: trigger/`DONE` framing, `us`/`ds` samples, temperature (`parser`)
//! - **Conditioning**: index → seconds, zero-phase Butterworth low-pass (`conditioner`, `filter`)
//! - **Lag**: common grid, full cross-correlation, first-peak lag (`lag`)
//! - **Flow**: speed-of-sound selection and lag → flow (`flow`, `acoustics`)
//! - **Session**: history and cumulative averages (`session`)
//!
//! [`Pipeline`] runs one iteration; [`MeasurementWorker`] runs iterations
//! on a background thread.

pub mod acoustics;
pub mod capture_error;
pub mod conditioner;
pub mod config;
pub mod conversions;
pub mod error;
pub mod filter;
pub mod flow;
pub mod lag;
pub mod mocks;
pub mod parser;
pub mod pipeline;
pub mod session;
pub mod types;
pub mod util;
pub mod worker;

pub use acoustics::{SoundSpeedCurve, speed_of_sound_fahrenheit};
pub use config::{AcousticConfig, CaptureCfg, PipeGeometry, RunContext, SignalCfg};
pub use error::{BuildError, FlowError, Result};
pub use flow::{average_time_of_flight, flow_from_lag};
pub use lag::{LagAnalysis, estimate_lag};
pub use pipeline::{IterationReport, Pipeline, PipelineBuilder};
pub use session::{FlowrateHistory, MeasurementSession, SharedSession, flowrate_history};
pub use types::{Channel, FlowMeasurement, LagEstimate, SampleSeries, SpeedOfSound};
pub use worker::{IterationEvent, MeasurementWorker, WorkerOptions};
