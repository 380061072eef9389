#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not. A config that
    // validates must also convert into a run context the core accepts.
    if let Ok(cfg) = flowmeter_config::load_toml(data) {
        if cfg.validate().is_ok() {
            let ctx = flowmeter_core::RunContext::from(&cfg);
            let _ = ctx.validate();
        }
    }
});
