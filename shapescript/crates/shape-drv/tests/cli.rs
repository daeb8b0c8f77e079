//! End-to-end tests of the `shapescript` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn shapescript() -> Command {
    Command::cargo_bin("shapescript").expect("binary builds")
}

fn write_shape(dir: &tempfile::TempDir, name: &str, source: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, source).expect("write source");
    path
}

#[test]
fn run_prints_the_scene_outline() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_shape(&dir, "scene.shape", "cube\nsphere { detail 8 }\n");
    shapescript()
        .arg("run")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("scene: 2 children"))
        .stdout(predicate::str::contains("polygons"));
}

#[test]
fn run_is_the_default_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_shape(&dir, "scene.shape", "cube\n");
    shapescript()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("scene: 1 children"));
}

#[test]
fn print_logs_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_shape(&dir, "log.shape", "print sum (1 2) (3 4 5 6) (7 8 9)\n");
    shapescript()
        .arg("run")
        .arg(&path)
        .arg("--quiet")
        .assert()
        .success()
        .stderr(predicate::str::contains("11 14 14 6"));
}

#[test]
fn syntax_errors_fail_with_a_snippet() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_shape(&dir, "bad.shape", "print 1 < 2 < 3\n");
    shapescript()
        .arg("run")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected token"))
        .stderr(predicate::str::contains("bad.shape:1:13"))
        .stderr(predicate::str::contains("print 1 < 2 < 3"));
}

#[test]
fn runtime_errors_fail_with_a_hint() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_shape(&dir, "typo.shape", "qube\n");
    shapescript()
        .arg("run")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown symbol 'qube'"))
        .stderr(predicate::str::contains("Did you mean 'cube'?"));
}

#[test]
fn misspelled_operators_suggest_replacements() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_shape(&dir, "ops.shape", "if a && b {\n    cube\n}\n");
    shapescript()
        .arg("parse")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Did you mean 'and'?"));
}

#[test]
fn parse_mode_reports_statement_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_shape(
        &dir,
        "count.shape",
        "define r 2\nfor i in 1 to 3 {\n    sphere { position i }\n}\n",
    );
    shapescript()
        .arg("parse")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("parsed 2 statements"));
}

#[test]
fn tokens_mode_dumps_the_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_shape(&dir, "tok.shape", "cube { size 1.5 }\n");
    shapescript()
        .arg("tokens")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("identifier 'cube'"))
        .stdout(predicate::str::contains("number 1.5"));
}

#[test]
fn imports_resolve_relative_to_the_program() {
    let dir = tempfile::tempdir().unwrap();
    write_shape(&dir, "lib.shape", "define unit 2\n");
    let path = write_shape(&dir, "main.shape", "import \"lib.shape\"\ncube { size unit }\n");
    shapescript()
        .arg("run")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("scene: 1 children"));
}

#[test]
fn missing_imports_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_shape(&dir, "main.shape", "import \"nope.shape\"\n");
    shapescript()
        .arg("run")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("file 'nope.shape' not found"));
}

#[test]
fn missing_input_is_a_usage_error() {
    shapescript()
        .assert()
        .failure()
        .stderr(predicate::str::contains("usage: shapescript"));
}

#[test]
fn unreadable_input_reports_the_path() {
    shapescript()
        .arg("run")
        .arg("does-not-exist.shape")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.shape"));
}
