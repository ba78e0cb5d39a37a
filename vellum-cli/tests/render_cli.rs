//! CLI surface tests. Renders that would need a real browser point the
//! engine at a missing binary and assert on the failure mode instead.

use assert_cmd::Command;
use predicates::prelude::*;

fn vellum() -> Command {
    Command::cargo_bin("vellum").expect("binary built")
}

#[test]
fn help_lists_subcommands() {
    vellum()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("engines"));
}

#[test]
fn engines_lists_all_dialects() {
    vellum()
        .arg("engines")
        .assert()
        .success()
        .stdout(predicate::str::contains("html"))
        .stdout(predicate::str::contains("jsx"))
        .stdout(predicate::str::contains("vue"));
}

#[test]
fn unknown_engine_is_rejected_by_argument_parsing() {
    vellum()
        .args(["render", "--engine", "markdown"])
        .write_stdin("<p>hi</p>")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown template engine"));
}

#[test]
fn empty_stdin_fails_validation_before_any_engine_work() {
    vellum()
        .args(["render", "--browser", "/nonexistent/engine"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("template content is empty"));
}

#[test]
fn missing_engine_binary_reports_unavailability() {
    vellum()
        .args(["render", "--browser", "/nonexistent/engine"])
        .write_stdin("<p>hi</p>")
        .assert()
        .failure()
        .stderr(predicate::str::contains("rendering engine unavailable"));
}

#[test]
fn missing_content_file_is_reported_with_its_path() {
    vellum()
        .args(["render", "--content", "/nonexistent/template.html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/template.html"));
}

#[test]
fn data_context_must_be_a_json_object() {
    let dir = tempfile::tempdir().expect("dir");
    let data = dir.path().join("context.json");
    std::fs::write(&data, "[1, 2, 3]").expect("write data");

    vellum()
        .args([
            "render",
            "--browser",
            "/nonexistent/engine",
            "--data",
            data.to_str().expect("utf8 path"),
        ])
        .write_stdin("<p>hi</p>")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a JSON object"));
}
