//! `flowmeter` binary: config loading, logging setup and command dispatch.

mod cli;
mod error_fmt;
mod measure;
mod run;

use clap::Parser;
use eyre::WrapErr;
use flowmeter_core::FlowError;
use std::path::Path;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "command failed");
        if cli::json_mode() {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    match cli.cmd {
        // The lookup needs no pipe config, so it runs without one.
        Commands::SoundSpeed { fahrenheit, table } => {
            init_tracing(cli.json, cli.log_level.as_deref(), None)?;
            measure::sound_speed(fahrenheit, table.as_deref())
        }
        cmd => {
            let cfg = load_config(&cli.config)?;
            init_tracing(cli.json, cli.log_level.as_deref(), Some(&cfg.logging))?;
            tracing::debug!(config = %cli.config.display(), "config loaded");
            match cmd {
                Commands::Measure {
                    capture,
                    dump_series,
                } => measure::run_measure(&cfg, &capture, dump_series.as_deref()),
                Commands::Run {
                    capture,
                    simulate,
                    iterations,
                    interval_ms,
                    export,
                } => run::run_loop(
                    &cfg,
                    run::RunArgs {
                        capture,
                        simulate,
                        iterations,
                        interval_ms,
                        export,
                    },
                ),
                Commands::SelfCheck => measure::self_check(&cfg),
                Commands::SoundSpeed { .. } => Ok(()),
            }
        }
    }
}

/// Read, parse and validate the TOML config. Every failure past reading the
/// file is reported as `InvalidConfig`.
fn load_config(path: &Path) -> eyre::Result<flowmeter_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = flowmeter_config::load_toml(&text)
        .map_err(|e| eyre::Report::new(FlowError::InvalidConfig(e.to_string())))?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(FlowError::InvalidConfig(e.to_string())))?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout stays clean for results. With
/// `[logging].file` set, JSON lines are also appended there.
fn init_tracing(
    json: bool,
    level: Option<&str>,
    logging: Option<&flowmeter_config::Logging>,
) -> eyre::Result<()> {
    let level = level
        .or_else(|| logging.and_then(|l| l.level.as_deref()))
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file_layer = match logging.and_then(|l| l.file.as_deref()) {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
            let appender = match logging.and_then(|l| l.rotation.as_deref()) {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
