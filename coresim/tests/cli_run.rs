//! CLI tests for `coresim`.
//!
//! Spawns the binary in a temp directory and checks exit codes and output.

use std::fs;
use std::process::{Command, Output};

use coresim::exit_codes;
use coresim::io::config::{SimConfig, load_config, write_config};
use coresim::test_support::fast_config;

fn coresim(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_coresim"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("spawn coresim")
}

#[test]
fn init_writes_default_config_and_refuses_overwrite() {
    let temp = tempfile::tempdir().expect("tempdir");

    let first = coresim(temp.path(), &["init"]);
    assert_eq!(first.status.code(), Some(exit_codes::OK));
    let cfg = load_config(&temp.path().join("coresim.toml")).expect("load");
    assert_eq!(cfg, SimConfig::default());

    let second = coresim(temp.path(), &["init"]);
    assert_eq!(second.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&second.stderr).contains("--force"));

    let forced = coresim(temp.path(), &["init", "--force"]);
    assert_eq!(forced.status.code(), Some(exit_codes::OK));
}

#[test]
fn validate_rejects_bad_config() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("coresim.toml"), "fault_probability = 1.5\n").expect("write");

    let output = coresim(temp.path(), &["validate"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("fault_probability"));
}

#[test]
fn run_prints_json_summary() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("sim.toml");
    write_config(&path, &fast_config(3)).expect("write config");

    let output = coresim(
        temp.path(),
        &["run", "--config", "sim.toml", "--duration", "0.05", "--json"],
    );
    assert_eq!(
        output.status.code(),
        Some(exit_codes::OK),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json summary");
    assert_eq!(summary["seed"], 42);
    assert_eq!(summary["completions"].as_array().expect("completions").len(), 3);
    assert!(summary["average_successful_tasks"].is_f64());
}

#[test]
fn run_text_summary_lists_quarantined_cores() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_config(&temp.path().join("coresim.toml"), &fast_config(2)).expect("write config");

    let output = coresim(
        temp.path(),
        &["run", "--fault-probability", "1", "--duration", "0.1"],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("quarantined: 2 ["), "{stdout}");
    assert_eq!(stdout.matches("  quarantined").count(), 2);
    assert!(stdout.contains("average successful tasks: 0.00"));
}

#[test]
fn run_rejects_zero_cores() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = coresim(temp.path(), &["run", "--cores", "0"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("core_count"));
}
