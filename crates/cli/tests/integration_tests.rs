/// End-to-end tests for the DriftKV shell: spawn the real binary, pipe
/// commands through stdin, and assert on the printed responses.
use std::path::Path;
use tempfile::tempdir;

/// Runs the REPL binary against `dir`, feeding it `commands` followed by
/// `exit`, and returns everything it printed to stdout.
fn run_repl(dir: &Path, commands: &str) -> String {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = Command::new(env!("CARGO_BIN_EXE_cli"))
        .args(["--dir", dir.to_str().unwrap()])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn the shell");

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        stdin
            .write_all(commands.as_bytes())
            .expect("failed to write commands");
        stdin.write_all(b"exit\n").expect("failed to write exit");
    }

    let output = child.wait_with_output().expect("failed to read output");
    assert!(output.status.success(), "shell exited with failure");
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn put_then_get() {
    let dir = tempdir().unwrap();
    let output = run_repl(dir.path(), "put name alice\nget name\n");

    assert!(output.contains("ok"));
    assert!(output.contains("alice"));
}

#[test]
fn prompt_is_printed() {
    let dir = tempdir().unwrap();
    let output = run_repl(dir.path(), "");
    assert!(output.starts_with(">>> "));
}

#[test]
fn get_missing_key_prints_error_line() {
    let dir = tempdir().unwrap();
    let output = run_repl(dir.path(), "get nothing\n");
    assert!(output.contains("E key not found"));
}

#[test]
fn delete_then_get_reports_missing() {
    let dir = tempdir().unwrap();
    let output = run_repl(dir.path(), "put k v\ndelete k\nget k\n");

    assert!(output.contains("E key not found"));
}

#[test]
fn list_prints_every_key() {
    let dir = tempdir().unwrap();
    let output = run_repl(dir.path(), "put a 1\nput b 2\nput c 3\nlist\n");

    assert!(output.contains("a\n"));
    assert!(output.contains("b\n"));
    assert!(output.contains("c\n"));
}

#[test]
fn unknown_command_is_reported() {
    let dir = tempdir().unwrap();
    let output = run_repl(dir.path(), "frobnicate\n");
    assert!(output.contains("E unknown command: frobnicate"));
}

#[test]
fn wrong_arity_is_reported() {
    let dir = tempdir().unwrap();
    let output = run_repl(dir.path(), "put onlykey\n");
    assert!(output.contains("E put command requires 2 arguments"));
}

#[test]
fn empty_line_prints_empty_response() {
    let dir = tempdir().unwrap();
    let output = run_repl(dir.path(), "\n");
    // Prompt, then one empty response line, then the next prompt.
    assert!(output.contains(">>> \n>>> "));
}

#[test]
fn data_survives_across_sessions() {
    let dir = tempdir().unwrap();

    let first = run_repl(dir.path(), "put persistent value42\n");
    assert!(first.contains("ok"));

    let second = run_repl(dir.path(), "get persistent\n");
    assert!(second.contains("value42"));
}

#[test]
fn deletes_survive_across_sessions() {
    let dir = tempdir().unwrap();

    run_repl(dir.path(), "put k v\ndelete k\n");
    let output = run_repl(dir.path(), "get k\n");
    assert!(output.contains("E key not found"));
}

#[test]
fn overwrite_across_sessions_keeps_latest() {
    let dir = tempdir().unwrap();

    run_repl(dir.path(), "put k first\n");
    run_repl(dir.path(), "put k second\n");
    let output = run_repl(dir.path(), "get k\n");
    assert!(output.contains("second"));
    assert!(!output.contains("first"));
}
