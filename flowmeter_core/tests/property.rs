use flowmeter_core::lag::estimate_lag;
use flowmeter_core::parser::{parse_capture, trim_warmup};
use flowmeter_core::types::{RawSample, SamplePoint, SampleSeries};
use flowmeter_core::{FlowMeasurement, LagEstimate, MeasurementSession, flowrate_history};
use proptest::prelude::*;

const TRIGGER: &str = "== IT'S ALIVE ==";

prop_compose! {
    fn sample_strategy()(
        upstream in any::<bool>(),
        index in 0u16..5000,
        voltage in -10.0f64..10.0,
    ) -> (bool, RawSample) {
        (upstream, RawSample { index: f64::from(index), voltage })
    }
}

fn gaussian_series(n: usize, shift: i64) -> SampleSeries {
    let center = n as f64 / 2.0 + shift as f64;
    SampleSeries {
        points: (0..n)
            .map(|i| {
                let x = (i as f64 - center) / 8.0;
                let v = (-x * x).exp();
                SamplePoint {
                    time_s: i as f64 * 1e-6,
                    voltage: v,
                    filtered_voltage: v,
                }
            })
            .collect(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    // Property: exactly the well-formed sample lines between the trigger and
    // DONE are kept, whatever comes before or after.
    #[test]
    fn parser_framing(
        junk in proptest::collection::vec("[a-z ]{0,16}", 0..5),
        samples in proptest::collection::vec(sample_strategy(), 0..60),
        separators in proptest::collection::vec(any::<bool>(), 60),
        trailing in proptest::collection::vec(sample_strategy(), 0..5),
    ) {
        let mut text = String::new();
        for j in &junk {
            text.push_str(j);
            text.push('\n');
        }
        text.push_str("us 9999 1.0\n");
        text.push_str(TRIGGER);
        text.push('\n');
        for (i, (up, s)) in samples.iter().enumerate() {
            if separators[i] {
                text.push_str("== separator ==\n");
                text.push_str("us 1 2 3\n");
            }
            let prefix = if *up { "us" } else { "ds" };
            text.push_str(&format!("{prefix} {} {}\n", s.index, s.voltage));
        }
        text.push_str("DONE\n");
        for (up, s) in &trailing {
            let prefix = if *up { "us" } else { "ds" };
            text.push_str(&format!("{prefix} {} {}\n", s.index, s.voltage));
        }

        let parsed = parse_capture(&text, TRIGGER);
        let want_us: Vec<RawSample> = samples.iter().filter(|(u, _)| *u).map(|(_, s)| *s).collect();
        let want_ds: Vec<RawSample> = samples.iter().filter(|(u, _)| !*u).map(|(_, s)| *s).collect();
        prop_assert!(parsed.stats.triggered);
        prop_assert!(parsed.stats.done_seen);
        prop_assert_eq!(parsed.upstream, want_us);
        prop_assert_eq!(parsed.downstream, want_ds);
        let seps = separators.iter().take(samples.len()).filter(|s| **s).count();
        prop_assert_eq!(parsed.stats.malformed_lines, seps);
    }

    #[test]
    fn trim_keeps_the_tail(len in 0usize..200, warmup in 0usize..250) {
        let samples: Vec<RawSample> = (0..len)
            .map(|i| RawSample { index: i as f64, voltage: 0.0 })
            .collect();
        let trimmed = trim_warmup(samples, warmup);
        prop_assert_eq!(trimmed.len(), len.saturating_sub(warmup));
        if let Some(first) = trimmed.first() {
            prop_assert_eq!(first.index, warmup as f64);
        }
    }

    #[test]
    fn integer_shift_is_recovered(shift in -20i64..=20) {
        let us = gaussian_series(256, shift);
        let ds = gaussian_series(256, 0);
        let lag = estimate_lag(&us, &ds).unwrap();
        let expected = shift as f64 * 1e-6;
        prop_assert!((lag.time_lag_s - expected).abs() < 1e-6);
    }

    #[test]
    fn cumulative_average_tracks_prefix_means(
        values in proptest::collection::vec(-1e3f64..1e3, 0..50)
    ) {
        let h = flowrate_history(&values);
        prop_assert_eq!(h.cumulative_average.len(), values.len());
        let mut session = MeasurementSession::new();
        for (k, v) in values.iter().enumerate() {
            let avg = session.append(FlowMeasurement {
                flow_rate: *v,
                temperature: None,
                lag: LagEstimate { time_lag_s: 0.0 },
            });
            let mean = values[..=k].iter().sum::<f64>() / (k + 1) as f64;
            prop_assert!((avg - mean).abs() < 1e-9);
            prop_assert!((h.cumulative_average[k] - mean).abs() < 1e-9);
        }
        prop_assert_eq!(session.history().values, values);
    }
}
