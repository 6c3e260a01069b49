//! GNU Autotools build system implementation

use super::{compile_failed, configure_failed, install_failed, BuildSystem, BuildSystemContext};
use crate::runner::CommandSpec;
use async_trait::async_trait;
use cpkg_errors::Error;
use cpkg_recipe::AutotoolsBuild;
use cpkg_types::OptionKey;
use std::path::PathBuf;

/// Autotools build system
#[derive(Debug, Clone)]
pub struct AutotoolsBuildSystem {
    config: AutotoolsBuild,
}

impl AutotoolsBuildSystem {
    #[must_use]
    pub fn new(config: AutotoolsBuild) -> Self {
        Self { config }
    }

    /// Where configure and make run
    fn work_dir(&self, ctx: &BuildSystemContext) -> PathBuf {
        if self.config.in_source {
            ctx.source_dir.clone()
        } else {
            ctx.build_dir.clone()
        }
    }

    fn configure_args(&self, ctx: &BuildSystemContext) -> Vec<String> {
        let mut args = vec!["--prefix=/".to_string()];
        match ctx.options.get_bool(&OptionKey::SHARED) {
            Some(true) => {
                args.push("--enable-shared".to_string());
                args.push("--disable-static".to_string());
            }
            Some(false) => {
                args.push("--disable-shared".to_string());
                args.push("--enable-static".to_string());
            }
            None => {}
        }
        args.extend(self.config.configure_args.iter().cloned());
        args
    }
}

#[async_trait]
impl BuildSystem for AutotoolsBuildSystem {
    fn name(&self) -> &'static str {
        "autotools"
    }

    fn kind(&self) -> cpkg_events::BuildSystem {
        cpkg_events::BuildSystem::Autotools
    }

    async fn configure(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        if self.config.autoreconf {
            let command = CommandSpec::new("autoreconf", &ctx.source_dir)
                .arg("-fiv")
                .envs(&ctx.env);
            ctx.run_checked(command, configure_failed).await?;
        }

        let work_dir = self.work_dir(ctx);
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &work_dir))?;

        let script = ctx.source_dir.join("configure");
        let command = CommandSpec::new(script.display().to_string(), &work_dir)
            .args(self.configure_args(ctx))
            .envs(&ctx.env);
        ctx.run_checked(command, configure_failed).await?;
        Ok(())
    }

    async fn build(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        let command = CommandSpec::new("make", self.work_dir(ctx))
            .arg(format!("-j{}", ctx.jobs))
            .args(self.config.make_args.iter().cloned())
            .envs(&ctx.env);
        ctx.run_checked(command, compile_failed).await?;
        Ok(())
    }

    async fn install(&self, ctx: &BuildSystemContext) -> Result<(), Error> {
        // configure used --prefix=/, so DESTDIR is the package root
        let command = CommandSpec::new("make", self.work_dir(ctx))
            .arg("install")
            .arg(format!("DESTDIR={}", ctx.package_dir.display()))
            .envs(&ctx.env);
        ctx.run_checked(command, install_failed).await?;
        Ok(())
    }
}
