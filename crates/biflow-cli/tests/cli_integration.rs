//! CLI integration tests for `biflow check` / `biflow parse`.
//!
//! These tests invoke the compiled binary to verify end-to-end behavior.

use std::path::PathBuf;
use std::process::{Command, Output};

fn biflow_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_biflow"))
}

fn write_source(dir: &tempfile::TempDir, name: &str, src: &str) -> PathBuf {
    let file = dir.path().join(name);
    std::fs::write(&file, src).expect("write source");
    file
}

fn run(args: &[&str]) -> Output {
    biflow_bin().args(args).output().expect("run binary")
}

#[test]
fn cli_check_prints_bindings() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = write_source(&dir, "ok.py", "x = 1\ny = x + 2\n");

    let output = run(&["check", file.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "biflow check should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout, "(Ln1 Col0) type(x)=int\n(Ln2 Col0) type(y)=float\n");
}

#[test]
fn cli_check_type_error_exits_nonzero() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = write_source(&dir, "bad.py", "x = 1\ny = x + 'a'\n");

    let output = run(&["check", file.to_str().unwrap()]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    // bindings made before the error are still reported
    assert!(stdout.contains("type(x)=int"), "stdout: {}", stdout);
    assert!(
        stderr.contains("Type error: (Ln2 Col4) str is not a subtype of float"),
        "stderr: {}",
        stderr
    );
}

#[test]
fn cli_check_json_format() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = write_source(&dir, "ok.py", "s = 'a'\n");

    let output = run(&["check", "--format", "json", file.to_str().unwrap()]);
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(value[0]["name"], "s");
    assert_eq!(value[0]["ty"], "str");
    assert_eq!(value[0]["line"], 1);
}

#[test]
fn cli_check_all_and_builtins() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = write_source(&dir, "ok.py", "x = 1\nx = 'a'\n");

    let output = run(&["check", "--all", file.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 2);

    let output = run(&["check", "--builtins", file.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next().unwrap_or_default();
    assert!(first.contains("type(print)="), "first line: {}", first);
    assert!(stdout.lines().last().unwrap_or_default().contains("type(x)=str"));
}

#[test]
fn cli_check_skip_print_input_flag_and_config() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = write_source(&dir, "io.py", "print(1, 2)\n");

    let output = run(&["check", file.to_str().unwrap()]);
    assert!(!output.status.success());

    let output = run(&["check", "--skip-print-input", file.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config = write_source(&dir, "biflow.json", r#"{"skip_print_and_input": true}"#);
    let output = run(&[
        "check",
        "--config",
        config.to_str().unwrap(),
        file.to_str().unwrap(),
    ]);
    assert!(output.status.success());
}

#[test]
fn cli_check_syntax_error() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = write_source(&dir, "broken.py", "x = (1\n");

    let output = run(&["check", file.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("Error: "), "stderr: {}", stderr);
}

#[test]
fn cli_check_missing_file() {
    let output = run(&["check", "/nonexistent/biflow/input.py"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read"), "stderr: {}", stderr);
}

#[test]
fn cli_parse_json_dump() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = write_source(&dir, "ok.py", "x = 1\n");

    let output = run(&["parse", "--format", "json", file.to_str().unwrap()]);
    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert!(value["body"][0]["Assign"].is_object(), "{}", value);
}

#[test]
fn cli_verbose_logs_to_stderr() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let file = write_source(&dir, "f.py", "def f(x):\n    return x\n");

    let output = run(&["-v", "check", file.to_str().unwrap()]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[DEBUG]"), "stderr: {}", stderr);
}
