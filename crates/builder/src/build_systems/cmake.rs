//! CMake build system implementation

use super::{compile_failed, configure_failed, install_failed, BuildSystem, BuildSystemContext};
use crate::generators::CMAKE_TOOLCHAIN;
use crate::runner::CommandSpec;
use async_trait::async_trait;
use cpkg_errors::Error;
use cpkg_recipe::CMakeBuild;

/// CMake build system
#[derive(Debug, Clone)]
pub struct CMakeBuildSystem {
    config: CMakeBuild,
}

impl CMakeBuildSystem {
    #[must_use]
    pub fn new(config: CMakeBuild) -> Self {
        Self { config }
    }

    fn configure_args(&self, ctx: &BuildSystemContext) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            ctx.source_dir.display().to_string(),
            "-B".to_string(),
            ctx.build_dir.display().to_string(),
            format!(
                "-DCMAKE_TOOLCHAIN_FILE={}",
                ctx.generators_dir.join(CMAKE_TOOLCHAIN).display()
            ),
            format!("-DCMAKE_INSTALL_PREFIX={}", ctx.package_dir.display()),
        ];
        args.extend(
            self.config
                .cache_variables
                .iter()
                .map(|(name, value)| format!("-D{name}={value}")),
        );
        args
    }
}

#[async_trait]
impl BuildSystem for CMakeBuildSystem {
    fn name(&self) -> &'static str {
        "cmake"
    }

    fn kind(&self) -> cpkg_events::BuildSystem {
        cpkg_events::BuildSystem::CMake
    }

    async fn configure(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        tokio::fs::create_dir_all(&ctx.build_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &ctx.build_dir))?;

        let command = CommandSpec::new("cmake", &ctx.build_dir)
            .args(self.configure_args(ctx))
            .envs(&ctx.env);
        ctx.run_checked(command, configure_failed).await?;
        Ok(())
    }

    async fn build(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        let mut command = CommandSpec::new("cmake", &ctx.build_dir)
            .arg("--build")
            .path_arg(&ctx.build_dir)
            .args(["--config", ctx.configuration()])
            .args(["--parallel".to_string(), ctx.jobs.to_string()])
            .envs(&ctx.env);
        if !self.config.targets.is_empty() {
            command = command.arg("--target").args(self.config.targets.iter().cloned());
        }
        ctx.run_checked(command, compile_failed).await?;
        Ok(())
    }

    async fn install(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        let command = CommandSpec::new("cmake", &ctx.build_dir)
            .arg("--install")
            .path_arg(&ctx.build_dir)
            .args(["--config", ctx.configuration()])
            .arg("--prefix")
            .path_arg(&ctx.package_dir)
            .envs(&ctx.env);
        ctx.run_checked(command, install_failed).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_systems::test_support::context;
    use crate::runner::{CommandOutput, RecordingRunner};
    use cpkg_errors::BuildError;
    use cpkg_types::{BuildType, Options, Settings};
    use std::sync::Arc;

    #[tokio::test]
    async fn configure_build_install() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, runner) = context(
            dir.path(),
            Settings::new().with_build_type(BuildType::Debug),
            Options::new(),
        );
        let cmake = CMakeBuildSystem::new(
            CMakeBuild::new()
                .cache_variable("CMAKE_POLICY_DEFAULT_CMP0077", "NEW")
                .target("hpdf"),
        );

        cmake.configure(&ctx).await.unwrap();
        cmake.build(&ctx).await.unwrap();
        cmake.install(&ctx).await.unwrap();

        let lines = runner.command_lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("-DCMAKE_TOOLCHAIN_FILE="));
        assert!(lines[0].contains("cpkg_toolchain.cmake"));
        assert!(lines[0].ends_with("-DCMAKE_POLICY_DEFAULT_CMP0077=NEW"));
        assert!(lines[1].contains("--config Debug --parallel 4 --target hpdf"));
        assert!(lines[2].starts_with("cmake --install"));
        assert!(ctx.build_dir.is_dir());
    }

    #[tokio::test]
    async fn failures_map_to_the_step() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctx, _) = context(dir.path(), Settings::new(), Options::new());
        ctx.runner = Arc::new(RecordingRunner::new().with_hook(|_| CommandOutput {
            status: Some(1),
            stdout: String::new(),
            stderr: "CMake Error: could not find zlib".into(),
        }));

        let cmake = CMakeBuildSystem::new(CMakeBuild::new());
        let err = cmake.configure(&ctx).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::ConfigureFailed { ref message }) if message.contains("could not find zlib")
        ));
        let err = cmake.build(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::CompileFailed { .. })));
    }
}
