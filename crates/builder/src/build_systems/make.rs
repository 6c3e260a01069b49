//! Plain makefile build system implementation

use super::{compile_failed, install_failed, BuildSystem, BuildSystemContext};
use crate::runner::CommandSpec;
use async_trait::async_trait;
use cpkg_errors::Error;
use cpkg_recipe::MakeBuild;

/// A hand-written makefile, no configure step
#[derive(Debug, Clone)]
pub struct MakeBuildSystem {
    config: MakeBuild,
}

impl MakeBuildSystem {
    #[must_use]
    pub fn new(config: MakeBuild) -> Self {
        Self { config }
    }

    fn command(&self, ctx: &BuildSystemContext) -> CommandSpec {
        let mut command = CommandSpec::new("make", ctx.source_dir.join(&self.config.directory));
        if let Some(makefile) = &self.config.makefile {
            command = command.arg("-f").arg(makefile.clone());
        }
        command
            .envs(&ctx.env)
            .envs(&self.config.env)
            .env("PREFIX", ctx.package_dir.display().to_string())
    }
}

#[async_trait]
impl BuildSystem for MakeBuildSystem {
    fn name(&self) -> &'static str {
        "make"
    }

    fn kind(&self) -> cpkg_events::BuildSystem {
        cpkg_events::BuildSystem::Make
    }

    async fn configure(&self, _ctx: &BuildSystemContext) -> Result<(), Error> {
        Ok(())
    }

    async fn build(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        let command = self
            .command(ctx)
            .arg(format!("-j{}", ctx.jobs))
            .args(self.config.args.iter().cloned());
        ctx.run_checked(command, compile_failed).await?;
        Ok(())
    }

    async fn install(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        if !self.config.install {
            return Err(install_failed(format!(
                "the makefile in {} is not installable; copy outputs in the package step",
                self.config.directory.display()
            ))
            .into());
        }
        let command = self
            .command(ctx)
            .arg("install")
            .arg(format!("PREFIX={}", ctx.package_dir.display()));
        ctx.run_checked(command, install_failed).await?;
        Ok(())
    }
}
