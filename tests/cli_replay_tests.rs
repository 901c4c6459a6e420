//! Integration tests for the sensor-ledger replay binary
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const TRACE: &str = r#"{"events":[
    {"at_ms":1,"op":"register","subscriber":1,"kind":1337},
    {"at_ms":10,"op":"register","subscriber":1,"kind":23},
    {"at_ms":15,"op":"unregister","subscriber":1,"kind":23},
    {"at_ms":20,"op":"snapshot"}
]}"#;

const CATALOG: &str = r#"
[[sources]]
kind = 1337
name = "accelerometer"
power_ma = 10.0

[[sources]]
kind = 23
name = "gyroscope"
power_ma = 20.0
"#;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn bin() -> Command {
    Command::cargo_bin("sensor-ledger").unwrap()
}

#[test]
fn test_text_output_totals() {
    let trace = write_temp(TRACE);
    let catalog = write_temp(CATALOG);

    bin()
        .arg("--catalog")
        .arg(catalog.path())
        .arg(trace.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Sensor Ledger Replay ==="))
        .stdout(predicate::str::contains("[20 ms] total:"))
        .stdout(predicate::str::contains("active 24 ms"));
}

#[test]
fn test_text_output_by_kind_uses_names() {
    let trace = write_temp(TRACE);
    let catalog = write_temp(CATALOG);

    bin()
        .arg("-c")
        .arg(catalog.path())
        .arg("--attribution")
        .arg("--by-kind")
        .arg(trace.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("accelerometer:"))
        .stdout(predicate::str::contains("gyroscope:"))
        .stdout(predicate::str::contains("active 19 ms"))
        .stdout(predicate::str::contains("active 5 ms"));
}

#[test]
fn test_json_output_parses() {
    let trace = write_temp(TRACE);
    let catalog = write_temp(CATALOG);

    let output = bin()
        .arg("-c")
        .arg(catalog.path())
        .arg("-a")
        .arg("--format")
        .arg("json")
        .arg(trace.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let frames = parsed["frames"].as_array().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["at_ms"], 20);
    assert_eq!(frames[0]["metrics"]["total"]["active_time_ms"], 24);
    assert_eq!(frames[0]["metrics"]["sources"].as_array().unwrap().len(), 2);
}

#[test]
fn test_unknown_kind_fails() {
    let trace = write_temp(TRACE);

    bin()
        .arg(trace.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown source kind 1337"));
}

#[test]
fn test_invalid_catalog_fails() {
    let trace = write_temp(TRACE);
    let catalog = write_temp("[[sources]]\nkind = 1\npower_ma = -5.0\n");

    bin()
        .arg("-c")
        .arg(catalog.path())
        .arg(trace.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid power draw"));
}

#[test]
fn test_missing_trace_file_fails() {
    bin()
        .arg("/nonexistent/trace.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading trace"));
}
