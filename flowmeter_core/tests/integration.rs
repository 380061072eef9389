//! End-to-end iterations over rendered rig captures.

use flowmeter_capture::{SimulatedCapture, SimulatedTrace};
use flowmeter_core::error::{FlowError, ParseIncomplete};
use flowmeter_core::{MeasurementSession, PipeGeometry, Pipeline, SpeedOfSound};
use rstest::rstest;

const FS: f64 = 50e6;

fn pipe() -> PipeGeometry {
    PipeGeometry {
        inner_diameter_m: 0.02,
        outer_diameter_m: 0.025,
        pipe_sound_speed_mps: 2500.0,
    }
}

fn direct_pipeline() -> Pipeline {
    Pipeline::builder()
        .with_pipe(pipe())
        .with_medium_sound_speed(1480.0)
        .build()
        .unwrap()
}

#[rstest]
#[case(4)]
#[case(0)]
#[case(-6)]
#[case(11)]
fn simulated_shift_is_recovered(#[case] shift: i64) {
    let text = SimulatedTrace {
        shift_samples: shift,
        ..SimulatedTrace::default()
    }
    .render();
    let report = direct_pipeline().run_iteration(&text).unwrap();

    let step = report.lag.grid.step();
    assert!((step - 1.0 / FS).abs() < 1e-15);
    assert_eq!(report.lag.lag_index, shift);
    let expected = shift as f64 / FS;
    assert!((report.measurement.lag.time_lag_s - expected).abs() <= step);
    assert!(report.warnings.is_empty());
}

#[test]
fn flow_follows_formula_with_configured_speed() {
    let text = SimulatedTrace::default().render();
    let report = direct_pipeline().run_iteration(&text).unwrap();

    assert_eq!(report.speed, SpeedOfSound::Direct(1480.0));
    assert_eq!(report.measurement.temperature, Some(68.0));
    // 2048 samples less the default 25 warm-up samples.
    assert_eq!(report.upstream.len(), 2023);
    assert_eq!(report.downstream.len(), 2023);
    assert_eq!(report.upstream.points[0].time_s, 25.0 / FS);

    let lag = report.measurement.lag.time_lag_s;
    let expected = lag * 1480.0 * 1480.0 / (2.0 * std::f64::consts::SQRT_2 * 0.02);
    assert!((report.measurement.flow_rate - expected).abs() < 1e-12);
    assert!(report.measurement.flow_rate > 0.0);
}

#[test]
fn absent_medium_speed_uses_transit_correction() {
    let p = Pipeline::builder().with_pipe(pipe()).build().unwrap();
    let report = p.run_iteration(&SimulatedTrace::default().render()).unwrap();
    match report.speed {
        SpeedOfSound::TransitCorrected {
            average_tof_s,
            wall_transit_s,
            ..
        } => {
            assert!((wall_transit_s - 2e-6).abs() < 1e-15);
            // Burst centred on sample 1024, upstream four samples later.
            assert!((average_tof_s - 1026.0 / FS).abs() < 120.0 / FS);
        }
        other => panic!("expected transit correction, got {other:?}"),
    }
}

#[test]
fn zero_lag_gives_zero_flow() {
    let text = SimulatedTrace {
        shift_samples: 0,
        ..SimulatedTrace::default()
    }
    .render();
    let m = direct_pipeline().run_iteration(&text).unwrap().measurement;
    assert_eq!(m.lag.time_lag_s, 0.0);
    assert_eq!(m.flow_rate, 0.0);
}

#[test]
fn short_series_run_unfiltered_with_warnings() {
    let text = SimulatedTrace {
        samples_per_channel: 40,
        burst_center: 20.0,
        burst_width: 5.0,
        ..SimulatedTrace::default()
    }
    .render();
    // 40 - 25 = 15 samples, below the 19 the order-5 filter needs.
    let report = direct_pipeline().run_iteration(&text).unwrap();
    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings.iter().all(|w| matches!(w, FlowError::FilterDegenerate { .. })));
    for p in &report.upstream.points {
        assert_eq!(p.filtered_voltage, p.voltage);
    }
}

#[test]
fn missing_trigger_and_over_trimmed_captures_are_incomplete() {
    let p = direct_pipeline();

    let err = p.run_iteration("us 0 1\nds 0 1\nDONE\n").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FlowError>(),
        Some(FlowError::ParseIncomplete(ParseIncomplete::NoTrigger { .. }))
    ));

    let text = SimulatedTrace {
        samples_per_channel: 25,
        ..SimulatedTrace::default()
    }
    .render();
    let err = p.run_iteration(&text).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FlowError>(),
        Some(FlowError::ParseIncomplete(ParseIncomplete::EmptyAfterTrim { warmup: 25, .. }))
    ));
}

#[test]
fn disjoint_channels_do_not_overlap() {
    let mut text = String::from("== IT'S ALIVE ==\n");
    for i in 0..40 {
        text.push_str(&format!("us {i} 0.5\n"));
    }
    for i in 1000..1040 {
        text.push_str(&format!("ds {i} 0.5\n"));
    }
    text.push_str("DONE\n");
    let p = Pipeline::builder()
        .with_pipe(pipe())
        .with_warmup(0)
        .with_medium_sound_speed(1480.0)
        .build()
        .unwrap();
    let err = p.run_iteration(&text).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<FlowError>(),
        Some(FlowError::NoOverlap { .. })
    ));
}

#[test]
fn reader_and_text_give_the_same_measurement() {
    let text = SimulatedTrace::default().render();
    let p = direct_pipeline();
    let a = p.run_iteration(&text).unwrap();
    let b = p.run_reader(std::io::Cursor::new(text.as_bytes())).unwrap();
    assert_eq!(a.measurement, b.measurement);
}

#[test]
fn session_accumulates_successes_only() {
    let p = direct_pipeline();
    let mut src = SimulatedCapture::default();
    let mut session = MeasurementSession::new();
    for _ in 0..2 {
        let text = p.acquire(&mut src).unwrap();
        p.measure(&text, &mut session).unwrap();
    }
    assert!(p.measure("garbage", &mut session).is_err());
    assert_eq!(session.len(), 2);
    let h = session.history();
    assert_eq!(h.values[0], h.values[1]);
    assert_eq!(h.cumulative_average[1], h.values[0]);
}

#[test]
fn defaults_agree_across_crates() {
    let ctx = flowmeter_core::RunContext::new(pipe());
    assert_eq!(
        ctx.capture.trigger_phrase,
        flowmeter_config::CaptureCfg::default().trigger_phrase
    );
    assert_eq!(SimulatedTrace::default().trigger_phrase, ctx.capture.trigger_phrase);
    assert_eq!(
        ctx.acoustic.calibration_offset_s,
        flowmeter_config::AcousticCfg::default().calibration_offset_s
    );
}
