//! Integration tests for CLI configuration handling.
//!
//! These tests run the compiled binary with `--check-config` and the `scan`
//! subcommand against synthetic process roots.

use std::fs;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

/// Helper to get the binary path
fn binary_path() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_deleted-mapping-exporter"))
}

#[test]
fn test_default_config_is_valid() {
    let output = std::process::Command::new(binary_path())
        .args(["--no-config", "--check-config"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Configuration is valid"), "stdout: '{}'", stdout);
}

#[test]
fn test_relative_telemetry_path_rejected() {
    let output = std::process::Command::new(binary_path())
        .args(["--no-config", "--telemetry-path", "metrics", "--check-config"])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(
        stderr.contains("must start with '/'"),
        "Expected telemetry path error, got stderr: '{}'",
        stderr
    );
}

#[test]
fn test_listen_address_without_port_rejected() {
    let output = std::process::Command::new(binary_path())
        .args(["--no-config", "--listen-address", "localhost", "--check-config"])
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("has no port"), "stderr: '{}'", stderr);
}

#[test]
fn test_legacy_flag_names_accepted() {
    let output = std::process::Command::new(binary_path())
        .args([
            "--no-config",
            "--deletedmapping.listen-address",
            ":19040",
            "--deletedmapping.telemetry-path",
            "/probe",
            "--deletedmapping.proc-path",
            "/proc",
            "--check-config",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
}

#[test]
fn test_config_file_is_loaded() {
    let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
    writeln!(file, "listen_address: \"127.0.0.1:19041\"").unwrap();
    writeln!(file, "telemetry_path: /probe").unwrap();

    let output = std::process::Command::new(binary_path())
        .args(["--config", file.path().to_str().unwrap(), "--show-config", "--config-format", "json"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("\"listen_address\": \"127.0.0.1:19041\""), "stdout: '{}'", stdout);
    assert!(stdout.contains("\"telemetry_path\": \"/probe\""), "stdout: '{}'", stdout);
}

#[test]
fn test_scan_subcommand_reports_libraries() {
    let root = TempDir::new().unwrap();
    let pid_dir = root.path().join("4242");
    fs::create_dir(&pid_dir).unwrap();
    fs::write(
        pid_dir.join("maps"),
        "7f0e5c2a0000-7f0e5c2c6000 r-xp 00026000 fd:01 1835027 /lib/old.so (deleted)\n",
    )
    .unwrap();

    let output = std::process::Command::new(binary_path())
        .args([
            "--no-config",
            "--log-level",
            "off",
            "--proc-path",
            root.path().to_str().unwrap(),
            "scan",
            "--format",
            "json",
        ])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("\"success\": true"), "stdout: '{}'", stdout);
    assert!(stdout.contains("\"/lib/old.so\": 1"), "stdout: '{}'", stdout);
}
