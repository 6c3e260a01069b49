#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for cpkg
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/cpkg/config.toml)
//! - Environment variables (`CPKG_*`)
//! - CLI flags, applied by the front end

pub mod profile;

pub use profile::ProfileConfig;

use cpkg_errors::{ConfigError, Error};
use cpkg_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub profile: ProfileConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

/// Path configuration; unset paths derive from the cache root
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub cache_path: Option<PathBuf>,
    pub build_path: Option<PathBuf>,
    pub downloads_path: Option<PathBuf>,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_build_jobs")]
    pub build_jobs: usize, // 0 = auto-detect
    /// Keep build folders after a successful commit
    #[serde(default)]
    pub keep_build: bool,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
    /// When false only `file://` and local sources are fetched
    #[serde(default = "default_allow_downloads")]
    pub allow_downloads: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build_jobs: 0,
            keep_build: false,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: 300, // 5 minutes
            retries: 3,
            retry_delay: 1,
            allow_downloads: true,
        }
    }
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_build_jobs() -> usize {
    0
}

fn default_timeout() -> u64 {
    300
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1
}

fn default_allow_downloads() -> bool {
    true
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}

impl NetworkConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("cpkg").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = match Self::default_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("no config directory, using defaults: {e}");
                return Ok(Self::default());
            }
        };

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Render the configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError {
                error: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(output) = std::env::var("CPKG_OUTPUT") {
            self.general.default_output = match output.as_str() {
                "plain" => OutputFormat::Plain,
                "tty" => OutputFormat::Tty,
                "json" => OutputFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "CPKG_OUTPUT".to_string(),
                        value: output,
                    }
                    .into())
                }
            };
        }

        if let Ok(color) = std::env::var("CPKG_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "CPKG_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        if let Ok(jobs) = std::env::var("CPKG_BUILD_JOBS") {
            self.build.build_jobs = jobs.parse().map_err(|_| ConfigError::InvalidValue {
                field: "CPKG_BUILD_JOBS".to_string(),
                value: jobs,
            })?;
        }

        if let Ok(keep) = std::env::var("CPKG_KEEP_BUILD") {
            self.build.keep_build = parse_bool("CPKG_KEEP_BUILD", keep)?;
        }

        if let Ok(allow) = std::env::var("CPKG_ALLOW_DOWNLOADS") {
            self.network.allow_downloads = parse_bool("CPKG_ALLOW_DOWNLOADS", allow)?;
        }

        if let Ok(cache) = std::env::var("CPKG_CACHE_PATH") {
            self.paths.cache_path = Some(PathBuf::from(cache));
        }

        Ok(())
    }

    /// Root of the package cache
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        if let Some(path) = &self.paths.cache_path {
            return path.clone();
        }
        if let Some(dir) = dirs::cache_dir() {
            dir.join("cpkg")
        } else {
            tracing::warn!("no cache directory on this system, using ./.cpkg");
            PathBuf::from(".cpkg")
        }
    }

    /// Scratch space for source and build folders
    #[must_use]
    pub fn build_path(&self) -> PathBuf {
        self.paths
            .build_path
            .clone()
            .unwrap_or_else(|| self.cache_path().join("builds"))
    }

    /// Verified source archives, keyed by checksum
    #[must_use]
    pub fn downloads_path(&self) -> PathBuf {
        self.paths
            .downloads_path
            .clone()
            .unwrap_or_else(|| self.cache_path().join("downloads"))
    }

    /// Effective parallel job count
    #[must_use]
    pub fn jobs(&self) -> usize {
        calculate_build_jobs(self.build.build_jobs)
    }
}

/// Calculate build jobs based on CPU count
#[must_use]
pub fn calculate_build_jobs(config_value: usize) -> usize {
    if config_value > 0 {
        config_value
    } else {
        // 75% of the CPUs, at least one
        (num_cpus::get() * 3 / 4).max(1)
    }
}
