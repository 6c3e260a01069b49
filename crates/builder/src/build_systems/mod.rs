//! Build system drivers
//!
//! A driver turns a recipe's [`ToolConfig`] into concrete tool invocations.
//! Drivers only describe commands; a [`CommandRunner`] executes them.

use crate::runner::{CommandOutput, CommandRunner, CommandSpec};
use async_trait::async_trait;
use cpkg_errors::{BuildError, Error};
use cpkg_recipe::ToolConfig;
use cpkg_types::{BuildType, Options, Settings};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

mod autotools;
mod cmake;
mod make;
mod msbuild;

pub use autotools::AutotoolsBuildSystem;
pub use cmake::CMakeBuildSystem;
pub use make::MakeBuildSystem;
pub use msbuild::MsBuildSystem;

/// Everything a driver needs to run its steps
#[derive(Clone)]
pub struct BuildSystemContext {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub generators_dir: PathBuf,
    /// Install destination; the staging package root
    pub package_dir: PathBuf,
    pub jobs: usize,
    pub settings: Settings,
    pub options: Options,
    /// Extra environment for tool invocations
    pub env: BTreeMap<String, String>,
    pub runner: Arc<dyn CommandRunner>,
}

impl fmt::Debug for BuildSystemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildSystemContext")
            .field("source_dir", &self.source_dir)
            .field("build_dir", &self.build_dir)
            .field("generators_dir", &self.generators_dir)
            .field("package_dir", &self.package_dir)
            .field("jobs", &self.jobs)
            .finish_non_exhaustive()
    }
}

impl BuildSystemContext {
    /// Build type name passed to multi-config tools
    #[must_use]
    pub fn configuration(&self) -> &'static str {
        self.settings.build_type.unwrap_or(BuildType::Release).as_str()
    }

    /// Run a command and map a non-zero exit to `fail`
    ///
    /// # Errors
    /// Returns the runner's error, or `fail` with the tail of stderr.
    pub async fn run_checked(
        &self,
        command: CommandSpec,
        fail: fn(String) -> BuildError,
    ) -> Result<CommandOutput, Error> {
        let output = self.runner.run(&command).await?;
        if output.success() {
            Ok(output)
        } else {
            let status = output
                .status
                .map_or_else(|| "a signal".to_string(), |code| format!("exit code {code}"));
            Err(fail(format!(
                "`{command}` failed with {status}\n{}",
                output.stderr_tail(20)
            ))
            .into())
        }
    }
}

pub(crate) fn configure_failed(message: String) -> BuildError {
    BuildError::ConfigureFailed { message }
}

pub(crate) fn compile_failed(message: String) -> BuildError {
    BuildError::CompileFailed { message }
}

pub(crate) fn install_failed(message: String) -> BuildError {
    BuildError::InstallFailed { message }
}

/// A build tool driver
#[async_trait]
pub trait BuildSystem: Send + Sync {
    fn name(&self) -> &'static str;

    /// Event tag for this driver
    fn kind(&self) -> cpkg_events::BuildSystem;

    /// Configure phase
    async fn configure(&self, ctx: &BuildSystemContext) -> Result<(), Error>;

    /// Build phase
    async fn build(&self, ctx: &BuildSystemContext) -> Result<(), Error>;

    /// Install into `ctx.package_dir`
    async fn install(&self, ctx: &BuildSystemContext) -> Result<(), Error>;
}

/// The driver for a tool configuration
#[must_use]
pub fn for_tool(tool: &ToolConfig) -> Box<dyn BuildSystem> {
    match tool {
        ToolConfig::CMake(config) => Box::new(CMakeBuildSystem::new(config.clone())),
        ToolConfig::Autotools(config) => Box::new(AutotoolsBuildSystem::new(config.clone())),
        ToolConfig::MsBuild(config) => Box::new(MsBuildSystem::new(config.clone())),
        ToolConfig::Make(config) => Box::new(MakeBuildSystem::new(config.clone())),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::runner::RecordingRunner;
    use std::path::Path;

    pub fn context(root: &Path, settings: Settings, options: Options) -> (BuildSystemContext, RecordingRunner) {
        let runner = RecordingRunner::new();
        let ctx = BuildSystemContext {
            source_dir: root.join("src"),
            build_dir: root.join("build"),
            generators_dir: root.join("build/generators"),
            package_dir: root.join("package"),
            jobs: 4,
            settings,
            options,
            env: BTreeMap::new(),
            runner: Arc::new(runner.clone()),
        };
        (ctx, runner)
    }
}
