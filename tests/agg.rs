//! CLI tests for the timing aggregator binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn agg() -> Command {
    Command::cargo_bin("buildah-agg").unwrap()
}

const LOG: &str = r#"{"subcommand": "run", "duration": 1.0}
{"subcommand": "run", "duration": 3.0}
{"subcommand": "config", "duration": 0.25}
{"subcommand": "config", "duration": 0.75}
{"subcommand": "commit", "duration": 9.0}
"#;

#[test]
fn summarizes_groups_with_two_or_more_samples() {
    agg()
        .write_stdin(LOG)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("run")
                .and(predicate::str::contains("total 4.0000"))
                .and(predicate::str::contains("count 2"))
                .and(predicate::str::contains("mean 2.0000"))
                .and(predicate::str::contains("median 2.0000")),
        );
}

#[test]
fn omits_single_sample_groups() {
    agg()
        .write_stdin(LOG)
        .assert()
        .success()
        .stdout(predicate::str::contains("commit").not());
}

#[test]
fn reads_from_a_file_argument() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), LOG).unwrap();

    agg()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("config"));
}

#[test]
fn empty_input_produces_no_output() {
    agg().write_stdin("").assert().success().stdout("");
}

#[test]
fn malformed_records_fail_with_context() {
    agg()
        .write_stdin("not json\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed timing log"));
}

#[test]
fn missing_file_fails_with_its_path() {
    agg()
        .arg("/no/such/timing.log")
        .assert()
        .failure()
        .stderr(predicate::str::contains("/no/such/timing.log"));
}
