use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

const TOML: &str = r#"
[capture]
timeout_ms = 50

[pipe]
inner_diameter_m = 0.02
outer_diameter_m = 0.025
sound_speed_mps = 2500.0
"#;

#[rstest]
fn missing_capture_timeout_bubbles_to_cli() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, TOML).unwrap();

    let mut cmd = Command::cargo_bin("flowmeter_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("measure")
        .arg("--capture")
        .arg(dir.path().join("never-written.txt"));
    cmd.assert().code(7).stderr(predicate::str::contains(
        "What happened: No capture arrived",
    ));
}

#[rstest]
fn run_with_only_failures_reports_the_last_error() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, TOML).unwrap();

    let mut cmd = Command::cargo_bin("flowmeter_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--capture")
        .arg(dir.path().join("never-written.txt"))
        .arg("--iterations")
        .arg("2")
        .arg("--interval-ms")
        .arg("0");
    cmd.assert()
        .code(7)
        .stdout(predicate::str::contains("no successful measurements"))
        .stderr(predicate::str::contains("[2] failed"));
}
