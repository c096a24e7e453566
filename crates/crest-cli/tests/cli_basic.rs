use assert_cmd::Command;

fn crest_in(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("crest").expect("binary");
    cmd.current_dir(dir).arg("--no-banner");
    cmd
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn help_flag_documents_overrides() {
    let output = Command::cargo_bin("crest")
        .expect("binary")
        .arg("--help")
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("--endpoint"));
    assert!(stdout.contains("--model"));
}

#[test]
fn eof_on_empty_input_exits_cleanly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = crest_in(dir.path()).write_stdin("").output().expect("run");
    assert!(output.status.success());
}

#[test]
fn pwd_builtin_prints_working_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let canonical = std::fs::canonicalize(dir.path()).expect("canonicalize");
    let output = crest_in(dir.path())
        .write_stdin("pwd\nexit\n")
        .output()
        .expect("run");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains(&canonical.display().to_string()));
}

#[test]
fn echo_builtin_joins_arguments() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = crest_in(dir.path())
        .write_stdin("echo hello from crest\n")
        .output()
        .expect("run");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("hello from crest"));
}

#[test]
fn unknown_command_is_reported_and_shell_survives() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = crest_in(dir.path())
        .write_stdin("definitely-not-a-real-binary-xyz\necho still here\n")
        .output()
        .expect("run");
    assert!(output.status.success());
    assert!(stderr_of(&output).contains("command not found"));
    assert!(stdout_of(&output).contains("still here"));
}

#[test]
fn history_builtin_lists_dispatches_with_indices() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = crest_in(dir.path())
        .write_stdin("pwd\nhistory\n")
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains(" 1 pwd"));
    assert!(stdout.contains(" 2 history"));
}

#[test]
fn version_builtin_prints_fixed_string() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = crest_in(dir.path())
        .write_stdin("version\n")
        .output()
        .expect("run");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("Crest Shell version"));
}

#[test]
fn calc_builtin_handles_power_and_division_by_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = crest_in(dir.path())
        .write_stdin("calc 2 ^ 10\ncalc 10 / 0\n")
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("1024"));
    assert!(stdout.contains("Error: Division by zero"));
}

#[cfg(unix)]
#[test]
fn bg_builtin_returns_promptly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let started = std::time::Instant::now();
    let output = crest_in(dir.path())
        .write_stdin("bg sleep 1\necho prompt back\nexit\n")
        .output()
        .expect("run");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("prompt back"));
    // The shell must not have waited for the sleeping child before
    // reaching the next commands; only process teardown may take longer.
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}

#[test]
fn empty_lines_are_no_ops() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = crest_in(dir.path())
        .write_stdin("\n   \nhistory\n")
        .output()
        .expect("run");
    assert!(output.status.success());
    // Blank dispatches are not recorded; history itself is entry 1.
    assert!(stdout_of(&output).contains(" 1 history"));
}
