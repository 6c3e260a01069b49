//! UPX executable packer, from the upstream release binaries

use cpkg_errors::RecipeError;
use cpkg_recipe::validate::invalid;
use cpkg_recipe::{
    Advisories, BuildStrategy, ConfValue, CopySpec, PackageInfo, PackagePlan, Recipe,
    RecipeContext, RecipeDescriptor, SourceTable,
};
use cpkg_types::{PackageType, SettingKey};

#[derive(Debug, Clone)]
pub struct Upx {
    descriptor: RecipeDescriptor,
    sources: SourceTable,
}

impl Upx {
    /// # Errors
    /// Returns an error if the embedded source table is invalid.
    pub fn new() -> Result<Self, RecipeError> {
        Ok(Self {
            descriptor: RecipeDescriptor::new("upx", PackageType::Application)
                .description("UPX - the Ultimate Packer for eXecutables ")
                .licenses(&[
                    "GPL-2.0-or-later",
                    "special-exception-for-compressed-executables",
                ])
                .homepage("https://upx.github.io/")
                .topics(&[
                    "packer",
                    "executable",
                    "compression",
                    "size",
                    "reduction",
                    "small",
                    "footprintt",
                ])
                .settings(&[SettingKey::Os, SettingKey::Arch]),
            sources: crate::sources("upx", include_str!("../data/upx.toml"))?,
        })
    }
}

fn executable(ctx: &RecipeContext) -> &'static str {
    if ctx.settings().is_windows() {
        "upx.exe"
    } else {
        "upx"
    }
}

impl Recipe for Upx {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn sources(&self) -> &SourceTable {
        &self.sources
    }

    fn validate(&self, ctx: &RecipeContext) -> Result<Advisories, RecipeError> {
        if self.sources.plan(ctx).is_err() {
            let os = ctx.settings().os.map_or("", |o| o.as_str());
            let arch = ctx.settings().arch.map_or("", |a| a.as_str());
            return Err(invalid(
                ctx,
                format!("This recipe has no upx binary for os/arch={os}/{arch}"),
            ));
        }
        Ok(Advisories::new())
    }

    fn strategy(&self, _ctx: &RecipeContext) -> BuildStrategy {
        BuildStrategy::Prebuilt
    }

    fn package(&self, ctx: &RecipeContext) -> PackagePlan {
        PackagePlan::new()
            .copy(CopySpec::new("LICENSE").to("licenses"))
            .copy(CopySpec::new("COPYING").to("licenses"))
            .copy(CopySpec::new(executable(ctx)).to("bin"))
    }

    fn package_info(&self, ctx: &RecipeContext) -> PackageInfo {
        let mut info = PackageInfo::application();
        let path = format!("bin/{}", executable(ctx));
        info.conf
            .insert("user.upx:upx".to_string(), ConfValue::Path(path.into()));
        info.append_path("bin");
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{apple_clang, gcc, msvc, resolve};
    use cpkg_types::Arch;

    #[test]
    fn platforms_without_binaries_are_rejected() {
        let recipe = Upx::new().unwrap();
        let ctx = resolve(&recipe, "upx/4.1.0", &apple_clang(), &[]).unwrap();
        let err = recipe.validate(&ctx).unwrap_err();
        assert!(err.to_string().contains("os/arch=Macos/armv8"));

        let ctx = resolve(&recipe, "upx/4.1.0", &msvc().with_arch(Arch::X86), &[]).unwrap();
        assert!(recipe.validate(&ctx).is_ok());
    }

    #[test]
    fn only_os_and_arch_matter() {
        let recipe = Upx::new().unwrap();
        let ctx = resolve(&recipe, "upx/4.1.0", &gcc("13"), &[]).unwrap();
        assert!(ctx.settings().compiler.is_none());
        assert!(ctx.settings().build_type.is_none());
    }

    #[test]
    fn executable_name_follows_the_os() {
        let recipe = Upx::new().unwrap();
        let ctx = resolve(&recipe, "upx/4.1.0", &msvc(), &[]).unwrap();
        let info = recipe.package_info(&ctx);
        assert_eq!(
            info.conf["user.upx:upx"],
            ConfValue::Path("bin/upx.exe".into())
        );
        assert!(info.cpp.libdirs.is_empty());

        let ctx = resolve(&recipe, "upx/4.1.0", &gcc("13"), &[]).unwrap();
        assert_eq!(
            recipe.package_info(&ctx).conf["user.upx:upx"],
            ConfValue::Path("bin/upx".into())
        );
    }
}
