//! Integration tests for core CLI contract behavior.

use {predicates::prelude::*, std::fs, tempfile::tempdir};

fn cli_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("eeprog");
    // Keep tests independent of the developer's environment.
    cmd.env_remove("EEPROG_PORT")
        .env_remove("EEPROG_SIZE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_exits_zero_and_writes_stdout_only() {
    cli_cmd()
        .arg("--help")
        .assert()
        .success()
        .code(0)
        .stdout(predicate::str::contains("eeprog"))
        .stdout(predicate::str::contains("Usage"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn version_exits_zero_and_writes_stdout_only() {
    cli_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("eeprog"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn help_lists_every_subcommand() {
    let assert = cli_cmd()
        .arg("--help")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(
        &assert
            .get_output()
            .stdout,
    )
    .into_owned();
    for name in [
        "read",
        "write",
        "check",
        "ping",
        "read-addr",
        "write-addr",
        "list-ports",
        "shell",
        "completions",
    ] {
        assert!(stdout.contains(name), "help should mention {name}");
    }
}

#[test]
fn colors_disabled_when_not_tty() {
    let output = cli_cmd()
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .clone();
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    assert!(!stdout.contains("\x1b["));
}

#[test]
fn list_ports_json_is_a_clean_array() {
    let output = cli_cmd()
        .args(["list-ports", "--json"])
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("list-ports --json should print JSON");
    assert!(parsed.is_array());
    assert!(
        output
            .stderr
            .is_empty(),
        "JSON output should not be mixed with stderr"
    );
}

#[test]
fn completions_command_writes_to_stdout() {
    cli_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty())
        .stdout(predicate::str::contains("_eeprog()"));
}

#[test]
fn unknown_command_is_usage_error() {
    cli_cmd()
        .arg("unknown-command-xyz")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn unknown_command_suggests_similar() {
    cli_cmd()
        .arg("raed")
        .assert()
        .failure()
        .stderr(predicate::str::contains("read"));
}

#[test]
fn read_without_file_is_usage_error() {
    cli_cmd()
        .arg("read")
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::is_empty());
}

#[test]
fn invalid_size_is_usage_error() {
    cli_cmd()
        .args(["--size", "3k", "ping"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("memory size"));
}

#[test]
fn write_addr_rejects_byte_out_of_range() {
    cli_cmd()
        .args(["--port", "/dev/eeprog-missing", "write-addr", "0x10", "256"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Byte 256 must be between 0-255"));
}

#[test]
fn read_addr_rejects_bad_address() {
    cli_cmd()
        .args(["read-addr", "zz"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Addr zz is wrong"));
}

#[test]
fn check_missing_file_fails_before_opening_port() {
    let dir = tempdir().expect("tempdir should be created");
    let missing = dir
        .path()
        .join("missing.bin");

    cli_cmd()
        .args(["--port", "/dev/eeprog-missing", "check"])
        .arg(&missing)
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn read_with_missing_port_fails_with_error() {
    let dir = tempdir().expect("tempdir should be created");
    let out = dir
        .path()
        .join("dump.bin");

    cli_cmd()
        .current_dir(dir.path())
        .args(["--non-interactive", "--port", "/dev/eeprog-missing", "read"])
        .arg(&out)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("/dev/eeprog-missing"));

    assert!(!out.exists(), "nothing should be written when the port fails");
}

#[test]
fn invalid_config_warns_but_continues() {
    let dir = tempdir().expect("tempdir should be created");
    fs::write(dir.path().join("eeprog.toml"), "invalid toml [[[").expect("write invalid config");

    let output = cli_cmd()
        .current_dir(dir.path())
        .args(["completions", "zsh"])
        .output()
        .expect("command should execute");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TOML"), "should warn about invalid TOML");
}

#[test]
fn non_interactive_environment_variable_works() {
    cli_cmd()
        .env("EEPROG_NON_INTERACTIVE", "true")
        .arg("--version")
        .assert()
        .success();
}

#[test]
fn shell_reads_piped_commands() {
    let dir = tempdir().expect("tempdir should be created");
    fs::write(dir.path().join("hello.bin"), b"hello").expect("write sample");

    cli_cmd()
        .current_dir(dir.path())
        .args(["--port", "/dev/eeprog-missing", "--size", "8k", "shell"])
        .write_stdin("size\nserial\nshow hello.bin\nread\nwrite addr 1 300\nquit\nping\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("8192"))
        .stdout(predicate::str::contains("/dev/eeprog-missing"))
        .stdout(predicate::str::contains("|hello|"))
        .stdout(predicate::str::contains("filename?"))
        .stdout(predicate::str::contains("Byte 300 must be between 0-255"))
        // Nothing after quit runs, so the port is never opened.
        .stdout(predicate::str::contains("error:").not());
}

#[test]
fn shell_reports_operation_errors_and_continues() {
    cli_cmd()
        .args(["--port", "/dev/eeprog-missing", "shell"])
        .write_stdin("ping\nsize\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("error:"))
        .stdout(predicate::str::contains("32768"));
}
