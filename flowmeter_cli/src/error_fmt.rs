//! Human-readable error descriptions and structured JSON error formatting.

use flowmeter_core::error::{BuildError, FlowError, ParseIncomplete};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingGeometry => {
                "What happened: No pipe geometry was provided to the pipeline.\nLikely causes: The [pipe] section is missing or was not passed to the builder.\nHow to fix: Add [pipe] inner_diameter_m, outer_diameter_m and sound_speed_mps to the config.".to_string()
            }
        };
    }

    if let Some(fe) = err.downcast_ref::<FlowError>() {
        return match fe {
            FlowError::ParseIncomplete(ParseIncomplete::NoTrigger { trigger }) => format!(
                "What happened: The capture never printed the trigger line {trigger:?}.\nLikely causes: The rig was not armed, the capture was cut short, or [capture].trigger_phrase does not match the firmware.\nHow to fix: Check the capture file and the trigger phrase in the config."
            ),
            FlowError::ParseIncomplete(ParseIncomplete::EmptyAfterTrim {
                channel,
                raw_len,
                warmup,
            }) => format!(
                "What happened: The {channel} trace had {raw_len} samples, none left after dropping {warmup} warm-up samples.\nLikely causes: Truncated capture or a channel that did not fire.\nHow to fix: Re-capture, or lower [signal].warmup_samples."
            ),
            FlowError::NoOverlap { .. } => {
                "What happened: The upstream and downstream traces cover disjoint time ranges.\nLikely causes: Channels were captured in separate runs or sample indices were reset mid-capture.\nHow to fix: Re-capture both channels in one trigger.".to_string()
            }
            FlowError::DegenerateGrid { points } => format!(
                "What happened: Only {points} point(s) remain on the common time grid.\nLikely causes: The traces barely overlap or are too short.\nHow to fix: Capture longer traces."
            ),
            FlowError::EmptySeries(channel) => format!(
                "What happened: The {channel} series is empty.\nLikely causes: Truncated capture.\nHow to fix: Re-capture."
            ),
            FlowError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            FlowError::TemperatureOutOfRange { celsius, min, max } => format!(
                "What happened: {celsius:.2} C is outside the speed-of-sound table [{min}, {max}] C.\nLikely causes: Wrong units or a bad temperature reading.\nHow to fix: Pass the temperature in Fahrenheit, or supply a wider --table."
            ),
            FlowError::AcquisitionTimeout => {
                "What happened: No capture arrived within the configured timeout.\nLikely causes: The capture file was not written, the path is wrong, or the timeout is too low.\nHow to fix: Check the --capture path and consider increasing capture.timeout_ms in the config.".to_string()
            }
            FlowError::Acquisition(msg) => format!(
                "What happened: Reading the capture failed ({msg}).\nLikely causes: Permissions or an unreadable file.\nHow to fix: Check the capture file."
            ),
            // Warnings only; never returned as an error by the pipeline.
            FlowError::FilterDegenerate { .. } => format!(
                "What happened: {fe}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config or table loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("sound speed csv must have headers") {
        return "Invalid headers in sound speed CSV. Expected 'celsius,speed_mps'.".to_string();
    }

    if lower.contains("sound speed table") {
        return format!(
            "What happened: The speed-of-sound table was rejected ({msg}).\nLikely causes: Fewer than four rows, or temperatures not strictly increasing.\nHow to fix: Fix the CSV and try again."
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read ({msg}).\nLikely causes: Wrong --config path.\nHow to fix: Pass --config FILE or create etc/flowmeter.toml."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes per error kind; anything unrecognised is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 6;
    }
    match err.downcast_ref::<FlowError>() {
        Some(FlowError::ParseIncomplete(_)) => 3,
        Some(FlowError::NoOverlap { .. }) => 4,
        Some(FlowError::DegenerateGrid { .. } | FlowError::EmptySeries(_)) => 5,
        Some(FlowError::InvalidConfig(_)) => 6,
        Some(FlowError::Acquisition(_) | FlowError::AcquisitionTimeout) => 7,
        _ => 1,
    }
}

/// Short machine-readable name for the error kind.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(BuildError::MissingGeometry) = err.downcast_ref::<BuildError>() {
        return "MissingGeometry";
    }
    match err.downcast_ref::<FlowError>() {
        Some(FlowError::ParseIncomplete(ParseIncomplete::NoTrigger { .. })) => "NoTrigger",
        Some(FlowError::ParseIncomplete(ParseIncomplete::EmptyAfterTrim { .. })) => {
            "EmptyAfterTrim"
        }
        Some(FlowError::NoOverlap { .. }) => "NoOverlap",
        Some(FlowError::DegenerateGrid { .. }) => "DegenerateGrid",
        Some(FlowError::EmptySeries(_)) => "EmptySeries",
        Some(FlowError::InvalidConfig(_)) => "InvalidConfig",
        Some(FlowError::TemperatureOutOfRange { .. }) => "TemperatureOutOfRange",
        Some(FlowError::AcquisitionTimeout) => "AcquisitionTimeout",
        Some(FlowError::Acquisition(_)) => "Acquisition",
        Some(FlowError::FilterDegenerate { .. }) => "FilterDegenerate",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    });
    if let Some(FlowError::NoOverlap {
        upstream,
        downstream,
    }) = err.downcast_ref::<FlowError>()
    {
        obj["details"] = json!({
            "upstream_s": [upstream.0, upstream.1],
            "downstream_s": [downstream.0, downstream.1],
        });
    }
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowmeter_core::types::Channel;

    fn report(e: FlowError) -> eyre::Report {
        eyre::Report::new(e)
    }

    #[test]
    fn exit_codes_are_stable() {
        let cases = [
            (
                report(FlowError::ParseIncomplete(ParseIncomplete::NoTrigger {
                    trigger: "T".into(),
                })),
                3,
            ),
            (
                report(FlowError::NoOverlap {
                    upstream: (0.0, 1.0),
                    downstream: (2.0, 3.0),
                }),
                4,
            ),
            (report(FlowError::DegenerateGrid { points: 1 }), 5),
            (report(FlowError::EmptySeries(Channel::Upstream)), 5),
            (report(FlowError::InvalidConfig("x".into())), 6),
            (eyre::Report::new(BuildError::MissingGeometry), 6),
            (report(FlowError::AcquisitionTimeout), 7),
            (report(FlowError::Acquisition("io".into())), 7),
            (eyre::eyre!("plain"), 1),
        ];
        for (err, code) in &cases {
            assert_eq!(exit_code_for_error(err), *code, "{err}");
        }
    }

    #[test]
    fn missing_geometry_is_a_config_error() {
        let err = eyre::Report::new(BuildError::MissingGeometry);
        assert_eq!(reason_name(&err), "MissingGeometry");
        assert_eq!(exit_code_for_error(&err), 6);
        assert!(humanize(&err).contains("No pipe geometry"));
    }

    #[test]
    fn wrapped_context_keeps_the_code() {
        use eyre::WrapErr;
        let err: eyre::Result<()> = Err(report(FlowError::AcquisitionTimeout));
        let err = err.wrap_err("iteration 3").unwrap_err();
        assert_eq!(exit_code_for_error(&err), 7);
        assert!(humanize(&err).contains("No capture arrived"));
    }

    #[test]
    fn json_error_has_reason_and_details() {
        let err = report(FlowError::NoOverlap {
            upstream: (0.0, 1.0),
            downstream: (2.0, 3.0),
        });
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "NoOverlap");
        assert_eq!(v["exit_code"], 4);
        assert_eq!(v["details"]["downstream_s"][0], 2.0);
    }
}
