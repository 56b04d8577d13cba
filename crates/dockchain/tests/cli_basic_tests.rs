use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper to create a test command isolated from the caller's environment
fn dockchain() -> Command {
    let mut cmd = Command::cargo_bin("dockchain").unwrap();
    cmd.env_remove("DOCKCHAIN_PROFILE")
        .env_remove("DOCKCHAIN_CONFIG_FILE")
        .env_remove("DOCKCHAIN_HOST")
        .env_remove("RUST_LOG");
    cmd
}

/// Command bound to a config file inside `dir`
fn with_config(dir: &TempDir) -> Command {
    let mut cmd = dockchain();
    cmd.arg("--config-file").arg(dir.path().join("config.toml"));
    cmd
}

#[test]
fn test_help_flag() {
    dockchain()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("single chain"))
        .stdout(predicate::str::contains("EXAMPLES:"));
}

#[test]
fn test_version_flag() {
    dockchain()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dockchain"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_args_shows_help() {
    dockchain()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_invalid_subcommand() {
    dockchain()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_run_help() {
    dockchain()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--keep"));
}

#[test]
fn test_profile_help() {
    dockchain()
        .args(["profile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile management"));
}

#[test]
fn test_invalid_output_format() {
    let dir = TempDir::new().unwrap();
    with_config(&dir)
        .args(["profile", "list", "-o", "invalid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_empty_profile_list() {
    let dir = TempDir::new().unwrap();
    with_config(&dir)
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No profiles configured"));
}

#[test]
fn test_profile_set_list_show_remove() {
    let dir = TempDir::new().unwrap();

    with_config(&dir)
        .args([
            "profile",
            "set",
            "build",
            "--endpoint",
            "http",
            "--url",
            "tcp://build-host:2375",
            "--timeout-secs",
            "30",
            "--default",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile 'build' saved"));

    with_config(&dir)
        .args(["profile", "list", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"build\""))
        .stdout(predicate::str::contains("\"is_default\": true"));

    with_config(&dir)
        .args(["profile", "show", "build", "-o", "yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tcp://build-host:2375"))
        .stdout(predicate::str::contains("timeout_secs: 30"));

    with_config(&dir)
        .args(["profile", "remove", "build"])
        .assert()
        .success();

    with_config(&dir)
        .args(["profile", "show", "build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Profile 'build' not found"));
}

#[test]
fn test_profile_set_unix_requires_path() {
    let dir = TempDir::new().unwrap();
    with_config(&dir)
        .args(["profile", "set", "sock", "--endpoint", "unix"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--path"));
}

#[test]
fn test_profile_remove_missing_profile() {
    let dir = TempDir::new().unwrap();
    with_config(&dir)
        .args(["profile", "remove", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_profile_path_uses_config_file() {
    let dir = TempDir::new().unwrap();
    with_config(&dir)
        .args(["profile", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_unknown_profile_for_engine_command() {
    let dir = TempDir::new().unwrap();
    with_config(&dir)
        .args(["-p", "ghost", "images"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Profile 'ghost' not found"));
}

#[test]
fn test_unsupported_host_scheme() {
    let dir = TempDir::new().unwrap();
    with_config(&dir)
        .args(["--host", "ssh://box", "images"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported host"));
}

#[test]
fn test_unreachable_engine_reports_connection_error() {
    let dir = TempDir::new().unwrap();
    with_config(&dir)
        .args(["--host", "tcp://127.0.0.1:1", "start", "abc"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Cannot reach docker engine"))
        .stderr(predicate::str::contains("tip"));
}

#[test]
#[ignore = "Requires Docker - run with --ignored"]
fn test_run_echo() {
    let dir = TempDir::new().unwrap();
    with_config(&dir)
        .args(["run", "--pull", "alpine", "--", "echo", "hello from chain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello from chain"));
}

#[test]
#[ignore = "Requires Docker - run with --ignored"]
fn test_run_propagates_exit_code() {
    let dir = TempDir::new().unwrap();
    with_config(&dir)
        .args(["run", "--pull", "alpine", "--", "sh", "-c", "exit 4"])
        .assert()
        .failure()
        .code(4);
}
