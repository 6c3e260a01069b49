//! Integration tests for config

use cpkg_config::*;
use cpkg_types::{ColorChoice, CompilerKind, OutputFormat, Os};
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Env var tests must not run concurrently
static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

#[tokio::test]
async fn load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(
        temp_file,
        r#"
[general]
default_output = "plain"
color = "never"

[build]
build_jobs = 4
keep_build = true

[network]
allow_downloads = false

[profile]
os = "Linux"
arch = "x86_64"
compiler = "clang"
"compiler.version" = "17"
"compiler.libcxx" = "libc++"
build_type = "Debug"
"#
    )
    .unwrap();

    let config = Config::load_from_file(temp_file.path()).await.unwrap();
    assert_eq!(config.general.default_output, OutputFormat::Plain);
    assert_eq!(config.general.color, ColorChoice::Never);
    assert_eq!(config.jobs(), 4);
    assert!(config.build.keep_build);
    assert!(!config.network.allow_downloads);
    assert_eq!(config.network.retries, 3);

    let settings = config.profile.to_settings().unwrap();
    assert_eq!(settings.os, Some(Os::Linux));
    assert_eq!(settings.compiler_kind(), Some(CompilerKind::Clang));
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load_from_file(&dir.path().join("absent.toml")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn rendered_config_reloads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut config = Config::default();
    config.build.build_jobs = 3;
    std::fs::write(&path, config.to_toml().unwrap()).unwrap();

    let loaded = Config::load_or_default(Some(&path)).await.unwrap();
    assert_eq!(loaded.build.build_jobs, 3);
    assert_eq!(loaded.profile, config.profile);
}

#[test]
fn merge_env() {
    let _guard = ENV_TEST_MUTEX.lock().unwrap();
    std::env::set_var("CPKG_OUTPUT", "json");
    std::env::set_var("CPKG_ALLOW_DOWNLOADS", "no");

    let mut config = Config::default();
    config.merge_env().unwrap();
    assert_eq!(config.general.default_output, OutputFormat::Json);
    assert!(!config.network.allow_downloads);

    std::env::remove_var("CPKG_OUTPUT");
    std::env::remove_var("CPKG_ALLOW_DOWNLOADS");
}

#[test]
fn invalid_env_value() {
    let _guard = ENV_TEST_MUTEX.lock().unwrap();
    std::env::set_var("CPKG_BUILD_JOBS", "many");

    let mut config = Config::default();
    assert!(config.merge_env().is_err());

    std::env::remove_var("CPKG_BUILD_JOBS");
}
