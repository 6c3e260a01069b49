//! MSBuild build system implementation

use super::{compile_failed, configure_failed, install_failed, BuildSystem, BuildSystemContext};
use crate::generators::MSBUILD_TOOLCHAIN;
use crate::runner::CommandSpec;
use async_trait::async_trait;
use cpkg_errors::Error;
use cpkg_recipe::MsBuildProject;

/// Visual Studio solutions built with `msbuild`
#[derive(Debug, Clone)]
pub struct MsBuildSystem {
    config: MsBuildProject,
}

impl MsBuildSystem {
    #[must_use]
    pub fn new(config: MsBuildProject) -> Self {
        Self { config }
    }

    fn platform(&self, ctx: &BuildSystemContext) -> Result<&str, Error> {
        let arch = ctx.settings.arch.ok_or_else(|| {
            configure_failed("msbuild needs the arch setting to pick a platform".to_string())
        })?;
        self.config
            .platforms
            .get(&arch)
            .map(String::as_str)
            .ok_or_else(|| {
                configure_failed(format!(
                    "{} has no platform for arch {arch}",
                    self.config.solution.display()
                ))
                .into()
            })
    }
}

#[async_trait]
impl BuildSystem for MsBuildSystem {
    fn name(&self) -> &'static str {
        "msbuild"
    }

    fn kind(&self) -> cpkg_events::BuildSystem {
        cpkg_events::BuildSystem::MsBuild
    }

    async fn configure(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        // Solutions carry their own project setup; only check the platform
        self.platform(ctx)?;
        Ok(())
    }

    async fn build(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        let platform = self.platform(ctx)?;
        let mut properties = self.config.properties.clone();
        if self.config.whole_program_optimization_from_cflags {
            let cflags = ctx
                .env
                .get("CFLAGS")
                .cloned()
                .or_else(|| std::env::var("CFLAGS").ok())
                .unwrap_or_default();
            properties.insert(
                "WholeProgramOptimization".to_string(),
                requests_whole_program_optimization(&cflags).to_string(),
            );
        }
        let command = CommandSpec::new("msbuild", &ctx.source_dir)
            .path_arg(&ctx.source_dir.join(&self.config.solution))
            .arg(format!("/p:Configuration={}", ctx.configuration()))
            .arg(format!("/p:Platform={platform}"))
            .arg(format!("/m:{}", ctx.jobs))
            .arg(format!(
                "/p:ForceImportBeforeCppTargets={}",
                ctx.generators_dir.join(MSBUILD_TOOLCHAIN).display()
            ))
            .args(
                properties
                    .iter()
                    .map(|(name, value)| format!("/p:{name}={value}")),
            )
            .envs(&ctx.env);
        ctx.run_checked(command, compile_failed).await?;
        Ok(())
    }

    async fn install(&self, _ctx: &BuildSystemContext) -> Result<(), Error> {
        Err(install_failed(format!(
            "{} has no install target; copy outputs in the package step",
            self.config.solution.display()
        ))
        .into())
    }
}

/// Whether `cflags` holds `/GL` or `-GL` as a separate flag
fn requests_whole_program_optimization(cflags: &str) -> bool {
    cflags.split(' ').any(|flag| flag == "/GL" || flag == "-GL")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_systems::test_support::context;
    use cpkg_errors::BuildError;
    use cpkg_types::{Arch, BuildType, Options, Settings};

    fn project() -> MsBuildProject {
        MsBuildProject::new("win/libsass.sln")
            .platform(Arch::X86_64, "Win64")
            .property("LIBSASS_STATIC_LIB", "true")
    }

    #[tokio::test]
    async fn builds_the_solution_for_the_arch() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, runner) = context(
            dir.path(),
            Settings::new()
                .with_arch(Arch::X86_64)
                .with_build_type(BuildType::Release),
            Options::new(),
        );
        let msbuild = MsBuildSystem::new(project());

        msbuild.configure(&ctx).await.unwrap();
        msbuild.build(&ctx).await.unwrap();

        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        let args = &commands[0].args;
        assert!(args[0].ends_with("libsass.sln"));
        assert!(args.contains(&"/p:Configuration=Release".to_string()));
        assert!(args.contains(&"/p:Platform=Win64".to_string()));
        assert!(args.contains(&"/p:LIBSASS_STATIC_LIB=true".to_string()));
    }

    #[tokio::test]
    async fn unknown_platform_and_install_fail() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = context(
            dir.path(),
            Settings::new().with_arch(Arch::Ppc64le),
            Options::new(),
        );
        let msbuild = MsBuildSystem::new(project());

        let err = msbuild.configure(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::ConfigureFailed { .. })));
        let err = msbuild.install(&ctx).await.unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::InstallFailed { .. })));
    }

    #[test]
    fn whole_program_optimization_needs_a_standalone_flag() {
        assert!(requests_whole_program_optimization("/GL"));
        assert!(requests_whole_program_optimization("/O2 -GL /MD"));
        assert!(!requests_whole_program_optimization("/GLX /O2"));
        assert!(!requests_whole_program_optimization(""));
    }

    #[tokio::test]
    async fn whole_program_optimization_follows_cflags() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctx, runner) = context(
            dir.path(),
            Settings::new()
                .with_arch(Arch::X86_64)
                .with_build_type(BuildType::Release),
            Options::new(),
        );
        let msbuild = MsBuildSystem::new(project().whole_program_optimization_from_cflags());

        ctx.env.insert("CFLAGS".to_string(), "/O2 /GL".to_string());
        msbuild.build(&ctx).await.unwrap();
        ctx.env.insert("CFLAGS".to_string(), "/O2".to_string());
        msbuild.build(&ctx).await.unwrap();

        let commands = runner.commands();
        assert!(commands[0]
            .args
            .contains(&"/p:WholeProgramOptimization=true".to_string()));
        assert!(commands[1]
            .args
            .contains(&"/p:WholeProgramOptimization=false".to_string()));
    }
}
