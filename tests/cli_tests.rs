//! End-to-end tests of the `rideshare-solver` binary.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const BATCH: &str = r#"{
    "version": "1.0.0",
    "Driver": [
        {"id": "D1", "type": "driver", "route_start": "RG1 1AA", "Start_lat": 51.45, "Start_lon": -0.97,
         "route_end": "RG6 7BE", "End_lat": 51.50, "End_lon": -0.90,
         "departure_time": "2023-05-08 12:00:00", "seats": 2,
         "Pet": "NO", "Smoker": "NO", "Disable": "NO"},
        {"id": "D2", "type": "driver", "route_start": "RG30 2XX", "Start_lat": 51.60, "Start_lon": -1.20,
         "route_end": "OX1 1AA", "End_lat": 51.75, "End_lon": -1.25,
         "departure_time": "2023-05-08 18:00:00", "seats": 3,
         "Pet": "YES", "Smoker": "NO", "Disable": "NO"}
    ],
    "Rider": [
        {"id": "R1", "type": "rider", "route_start": "RG1 1AB", "Start_lat": 51.4510, "Start_lon": -0.9710,
         "route_end": "RG6 7BF", "End_lat": 51.5010, "End_lon": -0.9010,
         "departure_time": "2023-05-08 12:10:00", "seats": null,
         "Pet": "BOTH", "Smoker": "NO", "Disable": "NO"}
    ],
    "Shifter": []
}"#;

fn write_batch(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("batch.json");
    std::fs::write(&path, content).unwrap();
    path
}

fn solver() -> Command {
    Command::cargo_bin("rideshare-solver").unwrap()
}

fn run_json(args: &[&str], input: &Path) -> serde_json::Value {
    let output = solver()
        .args(args)
        .arg(input)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_solve_text() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_batch(&dir, BATCH);

    solver()
        .arg("solve")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Optimal solution found"))
        .stdout(predicate::str::contains("Driver D1 takes Rider R1"))
        .stdout(predicate::str::contains("Objective: 1"));
}

#[test]
fn test_solve_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_batch(&dir, BATCH);

    let json = run_json(&["solve"], &input);
    assert_eq!(json["report"]["status"], "Optimal");
    assert_eq!(json["report"]["objective"], 1);
    assert_eq!(json["report"]["matches"][0]["kind"], "DriverRider");
    assert_eq!(json["report"]["matches"][0]["offering"]["route_start"], "RG1 1AA");
    // D2 departs hours later and elsewhere
    assert_eq!(json["report"]["pools"]["drivers"], 1);
    assert_eq!(json["descriptions"][0], "Driver D1 takes Rider R1");
}

#[test]
fn test_solve_tsv() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_batch(&dir, BATCH);

    solver()
        .args(["solve", "--format", "tsv"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("kind\toffering_role"))
        .stdout(predicate::str::contains("DriverRider\tdriver\tD1\trider\tR1\t10"));
}

#[test]
fn test_solve_tight_tolerance_finds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_batch(&dir, BATCH);

    let json = run_json(&["solve", "--tolerance", "0.05"], &input);
    assert_eq!(json["report"]["status"], "Optimal");
    assert_eq!(json["report"]["objective"], 0);
}

#[test]
fn test_solve_without_filter() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_batch(&dir, BATCH);

    let json = run_json(&["solve", "--no-filter"], &input);
    assert!(json["report"]["filter"].is_null());
    assert_eq!(json["report"]["pools"]["drivers"], 2);
    assert_eq!(json["report"]["objective"], 1);
}

#[test]
fn test_filter_writes_verified_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_batch(&dir, BATCH);
    let out = dir.path().join("verified");

    solver()
        .arg("filter")
        .arg(&input)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Time window: 30 minutes, start radius: 1 km",
        ))
        .stdout(predicate::str::contains("Kept 2 of 3 participants (1 removed)"));

    let drivers = std::fs::read_to_string(out.join("Driver.csv")).unwrap();
    assert!(drivers.contains("D1"));
    assert!(!drivers.contains("D2"));
    assert!(out.join("Shifter.csv").is_file());

    // The verified directory is itself a valid input
    solver()
        .arg("solve")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Driver D1 takes Rider R1"));
}

#[test]
fn test_filter_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_batch(&dir, BATCH);
    let out = dir.path().join("verified.json");

    let json = run_json(&["filter", "--output", out.to_str().unwrap()], &input);
    assert_eq!(json["removed"], 1);
    assert_eq!(json["summary"]["after_time"]["drivers"], 1);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["version"], "1.0.0");
    assert_eq!(written["Driver"].as_array().unwrap().len(), 1);
}

#[test]
fn test_sweep_tsv() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_batch(&dir, BATCH);

    let output = solver()
        .args(["sweep", "--tolerances", "0.05,1,2", "--format", "tsv"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("tolerance_km\tstatus\tobjective"));
    assert!(lines[1].starts_with("0.05\toptimal\t0"));
    assert!(lines[2].starts_with("1\toptimal\t1"));
    assert!(lines[3].starts_with("2\toptimal\t1"));
}

#[test]
fn test_inspect() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_batch(&dir, BATCH);

    solver()
        .arg("inspect")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Dataset Summary"))
        .stdout(predicate::str::contains("Seats offered: 5"))
        .stdout(predicate::str::contains(
            "Departures: 2023-05-08 12:00:00 to 2023-05-08 18:00:00",
        ));

    let json = run_json(&["inspect", "--no-filter"], &input);
    assert_eq!(json["loaded"]["drivers"], 2);
    assert_eq!(json["model"]["variables"], 2);
    assert_eq!(json["model"]["open_variables"], 1);
}

#[test]
fn test_inspect_dual_shifter_roles() {
    let dir = tempfile::tempdir().unwrap();
    let shifters = r#""Shifter": [
        {"id": "S1", "type": "shifter", "route_start": "RG1 1AA", "Start_lat": 51.45, "Start_lon": -0.97,
         "route_end": "RG6 7BE", "End_lat": 51.50, "End_lon": -0.90,
         "departure_time": "2023-05-08 12:05:00", "seats": 2,
         "Pet": "NO", "Smoker": "NO", "Disable": "NO"},
        {"id": "S2", "type": "shifter", "route_start": "RG1 1AA", "Start_lat": 51.45, "Start_lon": -0.97,
         "route_end": "RG6 7BE", "End_lat": 51.50, "End_lon": -0.90,
         "departure_time": "2023-05-08 12:15:00", "seats": 1,
         "Pet": "NO", "Smoker": "NO", "Disable": "NO"}
    ]"#;
    let input = write_batch(&dir, &BATCH.replace(r#""Shifter": []"#, shifters));

    let strict = run_json(&["inspect"], &input);
    let dual = run_json(&["inspect", "--allow-dual-shifter-roles"], &input);
    assert_eq!(strict["model"]["variables"], dual["model"]["variables"]);
    assert!(
        strict["model"]["constraints"].as_u64().unwrap()
            > dual["model"]["constraints"].as_u64().unwrap()
    );

    // inspect sizes the same model solve builds
    let solved = run_json(&["solve", "--allow-dual-shifter-roles"], &input);
    assert_eq!(solved["report"]["model"], dual["model"]);
}

#[test]
fn test_invalid_record_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_batch(&dir, &BATCH.replace("\"seats\": 2", "\"seats\": 0"));

    solver()
        .arg("solve")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("seats"))
        .stderr(predicate::str::contains("D1"));
}

#[test]
fn test_driver_answering_both_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_batch(&dir, &BATCH.replacen("\"Pet\": \"NO\"", "\"Pet\": \"BOTH\"", 1));

    solver()
        .arg("inspect")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("BOTH"));
}

#[test]
fn test_unsupported_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("batch.xlsx");
    std::fs::write(&input, "not a dataset").unwrap();

    solver()
        .arg("solve")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported dataset format"));
}

#[test]
fn test_negative_tolerance_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_batch(&dir, BATCH);

    solver()
        .args(["solve", "--tolerance", "-1"])
        .arg(&input)
        .assert()
        .failure();
}
