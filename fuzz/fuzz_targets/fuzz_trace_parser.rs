#![no_main]
use flowmeter_core::parser::parse_capture;
use flowmeter_core::{PipeGeometry, Pipeline};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let parsed = parse_capture(data, "== IT'S ALIVE ==");
    assert!(parsed.stats.triggered || (parsed.upstream.is_empty() && parsed.downstream.is_empty()));

    // The whole iteration must fail cleanly on garbage, never panic.
    let pipeline = Pipeline::builder()
        .with_pipe(PipeGeometry {
            inner_diameter_m: 0.02,
            outer_diameter_m: 0.025,
            pipe_sound_speed_mps: 2500.0,
        })
        .with_warmup(0)
        .build();
    if let Ok(p) = pipeline {
        if data.len() < 4096 {
            let _ = p.run_iteration(data);
        }
    }
});
