//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "flowmeter", version, about = "Transit-time ultrasonic flow meter")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/flowmeter.toml")]
    pub config: PathBuf,

    /// Print results and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to
    /// [logging].level, then "info". RUST_LOG wins over both.
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one measurement iteration on a capture file
    Measure {
        /// Capture text file written by the rig terminal
        #[arg(long, value_name = "FILE")]
        capture: PathBuf,
        /// Write the conditioned series and correlation curve as CSV here
        #[arg(long, value_name = "DIR")]
        dump_series: Option<PathBuf>,
    },
    /// Measure repeatedly on a background worker until done or Ctrl-C
    Run {
        /// Re-read this capture file every iteration
        #[arg(
            long,
            value_name = "FILE",
            conflicts_with = "simulate",
            required_unless_present = "simulate"
        )]
        capture: Option<PathBuf>,
        /// Use a synthetic capture instead of a file
        #[arg(long, action = ArgAction::SetTrue)]
        simulate: bool,
        /// Stop after N iterations (overrides [runner].max_iterations; 0 = until Ctrl-C)
        #[arg(long, value_name = "N")]
        iterations: Option<u64>,
        /// Pause between iterations (overrides [runner].interval_ms)
        #[arg(long = "interval-ms", value_name = "MS")]
        interval_ms: Option<u64>,
        /// Export the flow history (with cumulative average) as CSV
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },
    /// Speed of sound in water at a Fahrenheit temperature
    SoundSpeed {
        #[arg(long, value_name = "F", allow_negative_numbers = true)]
        fahrenheit: f64,
        /// Reference table CSV with headers `celsius,speed_mps`
        #[arg(long, value_name = "FILE")]
        table: Option<PathBuf>,
    },
    /// Validate the config and run one simulated iteration
    SelfCheck,
}
