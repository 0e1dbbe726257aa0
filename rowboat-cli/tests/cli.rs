//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn sample_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write sample");
    file
}

fn rowboat() -> Command {
    Command::cargo_bin("rowboat").expect("binary built")
}

#[test]
fn head_prints_aligned_rows() {
    let file = sample_file("name,age\nalice,30\nbob,41\ncarol,28\n");
    rowboat()
        .args(["head", "-n", "2"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("name"))
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("bob"))
        .stdout(predicate::str::contains("carol").not());
}

#[test]
fn schema_reports_types_and_nulls() {
    let file = sample_file("name,age,score\nalice,30,1.5\nbob,,2.0\n");
    rowboat()
        .arg("schema")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 rows x 3 columns"))
        .stdout(predicate::str::contains("name: str"))
        .stdout(predicate::str::contains("age: int64 (1 nulls)"))
        .stdout(predicate::str::contains("score: float64"));
}

#[test]
fn convert_emits_ndjson() {
    let file = sample_file("name,age\nalice,30\nbob,41\n");
    let output = rowboat()
        .arg("convert")
        .arg(file.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines: Vec<serde_json::Value> = String::from_utf8(output)
        .expect("utf8 output")
        .lines()
        .map(|l| serde_json::from_str(l).expect("valid json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["name"], "alice");
    assert_eq!(lines[1]["age"], 41);
}

#[test]
fn stats_json_includes_numeric_summary() {
    let file = sample_file("v\n1\n2\n3\n4\n");
    let output = rowboat()
        .args(["stats", "--json"])
        .arg(file.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stats: serde_json::Value =
        serde_json::from_slice(&output).expect("valid json stats");
    assert_eq!(stats[0]["name"], "v");
    assert_eq!(stats[0]["min"], 1.0);
    assert_eq!(stats[0]["max"], 4.0);
    assert_eq!(stats[0]["mean"], 2.5);
}

#[test]
fn max_rows_truncates_output() {
    let file = sample_file("v\n1\n2\n3\n4\n5\n");
    rowboat()
        .args(["schema", "--max-rows", "3"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("3 rows x 1 columns"));
}

#[test]
fn ragged_input_fails_without_permissive() {
    let file = sample_file("a,b\n1,2\n3\n");
    rowboat()
        .arg("schema")
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));

    rowboat()
        .args(["schema", "--permissive"])
        .arg(file.path())
        .assert()
        .success();
}

#[test]
fn tab_separator_flag() {
    let file = sample_file("x\ty\n1\t2\n");
    rowboat()
        .args(["head", "--sep", "tab", "--no-header"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("c0"))
        .stdout(predicate::str::contains("1"));
}

#[test]
fn missing_file_reports_error() {
    rowboat()
        .arg("schema")
        .arg("/nonexistent/rowboat-input.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}
