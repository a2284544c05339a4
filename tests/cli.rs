//! Integration tests for the wattcast CLI.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

fn run_cli(args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("wattcast").expect("binary builds");
    cmd.args(args);
    cmd
}

/// Config pointing every output path into the given directory.
fn write_config(dir: &Path) -> String {
    let config_path = dir.join("config.yaml");
    let yaml = format!(
        r#"
training:
  batch_size: 16
  epochs: 2
  quiet_mode: true
  show_progress: false
logging:
  log_dir: "{log_dir}"
output_dir: "{out_dir}"
"#,
        log_dir = dir.join("runs").display(),
        out_dir = dir.join("outputs").display(),
    );
    fs::write(&config_path, yaml).expect("write test config");
    config_path.to_string_lossy().into_owned()
}

#[test]
fn init_then_validate_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wattcast.yaml");
    let path_str = path.to_string_lossy().into_owned();

    run_cli(&["init", "--path", &path_str]).assert().success();
    assert!(path.exists());

    let output = run_cli(&["validate", "--config", &path_str])
        .assert()
        .success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("Configuration is valid"));
    assert!(stdout.contains("Epochs: 50"));
}

#[test]
fn validate_rejects_missing_file() {
    run_cli(&["validate", "--config", "/nonexistent/wattcast.yaml"])
        .assert()
        .failure();
}

#[test]
fn validate_rejects_bad_values() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.yaml");
    fs::write(&config_path, "training:\n  batch_size: 0\n").unwrap();
    run_cli(&["validate", "--config", &config_path.to_string_lossy()])
        .assert()
        .failure();
}

#[test]
fn report_without_checkpoint_says_so() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let missing = dir.path().join("no-checkpoint");

    let output = run_cli(&[
        "report",
        "--config",
        &config,
        "--checkpoint",
        &missing.to_string_lossy(),
    ])
    .assert()
    .success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("No checkpoint found"));
}
