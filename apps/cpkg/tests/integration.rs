//! Integration tests for the cpkg CLI

use std::path::Path;
use std::process::{Command, Output};

fn cpkg(config_dir: &Path, args: &[&str]) -> Output {
    let config = config_dir.join("config.toml");
    std::fs::write(
        &config,
        format!(
            "[paths]\ncache_path = {:?}\n\n[profile]\nos = \"Linux\"\narch = \"x86_64\"\ncompiler = \"gcc\"\n\"compiler.version\" = \"13\"\n\"compiler.libcxx\" = \"libstdc++11\"\nbuild_type = \"Release\"\n",
            config_dir.join("cache").display().to_string()
        ),
    )
    .unwrap();
    Command::new(env!("CARGO_BIN_EXE_cpkg"))
        .arg("--config")
        .arg(&config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute cpkg")
}

#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_cpkg"))
        .arg("--version")
        .output()
        .expect("Failed to execute cpkg");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cpkg"));
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_cpkg"))
        .arg("--help")
        .output()
        .expect("Failed to execute cpkg");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Build C and C++ packages from built-in recipes"));
    assert!(stdout.contains("inspect"));
    assert!(stdout.contains("validate"));
    assert!(stdout.contains("create"));
}

#[test]
fn test_cli_invalid_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_cpkg"))
        .arg("invalid-command")
        .output()
        .expect("Failed to execute cpkg");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_json_list() {
    let dir = tempfile::tempdir().unwrap();
    let output = cpkg(dir.path(), &["--json", "list"]);

    assert!(output.status.success());
    let recipes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = recipes
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["name"].as_str())
        .collect();
    assert!(names.contains(&"dlpack"));
    assert!(names.contains(&"ms-gsl"));
}

#[test]
fn test_validate_rejects_old_compiler() {
    let dir = tempfile::tempdir().unwrap();
    let output = cpkg(
        dir.path(),
        &["validate", "ms-gsl/4.0.0", "-s", "compiler.version=4.9"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration"), "{stderr}");
}

#[test]
fn test_validate_unknown_option() {
    let dir = tempfile::tempdir().unwrap();
    let output = cpkg(dir.path(), &["validate", "dlpack/0.8", "-o", "shared=True"]);

    assert!(!output.status.success());
}

#[test]
fn test_config_prints_profile() {
    let dir = tempfile::tempdir().unwrap();
    let output = cpkg(dir.path(), &["config"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[profile]"));
    assert!(stdout.contains("libstdc++11"));
}
