//! CMake, repackaged from the upstream binary releases

use crate::is_apple_os;
use cpkg_errors::RecipeError;
use cpkg_recipe::validate::invalid;
use cpkg_recipe::{
    flat_layout, Advisories, BuildStrategy, CopySpec, Layout, Origin, PackageIdInfo, PackageInfo,
    PackagePlan, Recipe, RecipeContext, RecipeDescriptor, SourcePlan, SourceTable,
};
use cpkg_types::{Arch, Os, PackageType, SettingKey};

#[derive(Debug, Clone)]
pub struct CMake {
    descriptor: RecipeDescriptor,
    sources: SourceTable,
}

impl CMake {
    /// # Errors
    /// Returns an error if the embedded source table is invalid.
    pub fn new() -> Result<Self, RecipeError> {
        Ok(Self {
            descriptor: RecipeDescriptor::new("cmake", PackageType::Application)
                .description("CMake, the cross-platform, open-source build system.")
                .licenses(&["BSD-3-Clause"])
                .homepage("https://github.com/Kitware/CMake")
                .topics(&["build", "installer", "pre-built"]),
            sources: crate::sources("cmake", include_str!("../data/cmake.toml"))?,
        })
    }
}

/// Folder holding the executables, relative to the package root
fn bindir(ctx: &RecipeContext) -> &'static str {
    if is_apple_os(ctx) {
        "CMake.app/Contents/bin"
    } else {
        "bin"
    }
}

impl Recipe for CMake {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn sources(&self) -> &SourceTable {
        &self.sources
    }

    fn layout(&self, _ctx: &RecipeContext) -> Layout {
        flat_layout()
    }

    fn validate(&self, ctx: &RecipeContext) -> Result<Advisories, RecipeError> {
        let arch = ctx.settings().arch;
        if !matches!(arch, Some(Arch::X86_64 | Arch::Armv8)) {
            return Err(invalid(
                ctx,
                "CMake binaries are only provided for x86_64 and armv8 architectures",
            ));
        }
        if ctx.settings().os == Some(Os::Windows)
            && arch == Some(Arch::Armv8)
            && !ctx.version_at_least("3.24")
        {
            return Err(invalid(
                ctx,
                "CMake only supports ARM64 binaries on Windows starting from 3.24",
            ));
        }
        Ok(Advisories::new())
    }

    fn source(&self, ctx: &RecipeContext) -> Result<SourcePlan, RecipeError> {
        // macOS releases are universal binaries
        if is_apple_os(ctx) {
            self.sources.plan_for(ctx, "universal")
        } else {
            self.sources.plan(ctx)
        }
    }

    fn strategy(&self, _ctx: &RecipeContext) -> BuildStrategy {
        BuildStrategy::Prebuilt
    }

    fn package(&self, ctx: &RecipeContext) -> PackagePlan {
        let doc = if is_apple_os(ctx) {
            "CMake.app/Contents/doc/cmake"
        } else {
            "doc/cmake"
        };
        let plan = PackagePlan::new()
            .copy(CopySpec::new("*").from(Origin::Build, ""))
            .copy(
                CopySpec::new("Copyright.txt")
                    .from(Origin::Build, doc)
                    .to("licenses")
                    .flatten(),
            );
        if is_apple_os(ctx) {
            plan
        } else {
            plan.rmdir("doc").rmdir("man")
        }
    }

    fn package_info(&self, ctx: &RecipeContext) -> PackageInfo {
        let mut info = PackageInfo::application();
        info.cpp.bindirs = vec![bindir(ctx).into()];
        info.append_path(bindir(ctx));
        info
    }

    fn package_id(&self, _ctx: &RecipeContext, id: PackageIdInfo) -> PackageIdInfo {
        id.without_setting(SettingKey::Compiler)
            .without_setting(SettingKey::BuildType)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{apple_clang, gcc, msvc, resolve};
    use cpkg_recipe::EnvAction;
    use std::path::PathBuf;

    #[test]
    fn architectures() {
        let recipe = CMake::new().unwrap();
        let x86 = gcc("13").with_arch(Arch::X86);
        let ctx = resolve(&recipe, "cmake/3.27.7", &x86, &[]).unwrap();
        assert!(recipe.validate(&ctx).is_err());

        let ctx = resolve(&recipe, "cmake/3.27.7", &gcc("13"), &[]).unwrap();
        assert!(recipe.validate(&ctx).is_ok());
    }

    #[test]
    fn windows_arm64_needs_3_24() {
        let recipe = CMake::new().unwrap();
        let arm = msvc().with_arch(Arch::Armv8);

        let ctx = resolve(&recipe, "cmake/3.22.6", &arm, &[]).unwrap();
        let err = recipe.validate(&ctx).unwrap_err();
        assert!(err.to_string().contains("3.24"));

        let ctx = resolve(&recipe, "cmake/3.27.7", &arm, &[]).unwrap();
        assert!(recipe.validate(&ctx).is_ok());
        assert!(recipe.source(&ctx).unwrap().archive.urls[0].contains("windows-arm64"));
    }

    #[test]
    fn macos_uses_the_universal_archive() {
        let recipe = CMake::new().unwrap();
        let ctx = resolve(&recipe, "cmake/3.27.7", &apple_clang(), &[]).unwrap();
        let plan = recipe.source(&ctx).unwrap();
        assert!(plan.archive.urls[0].contains("macos-universal"));

        let info = recipe.package_info(&ctx);
        assert_eq!(info.cpp.bindirs, [PathBuf::from("CMake.app/Contents/bin")]);
        assert_eq!(
            info.env,
            [EnvAction::AppendPath {
                name: "PATH".to_string(),
                path: "CMake.app/Contents/bin".into(),
            }]
        );
    }

    #[test]
    fn one_binary_per_platform() {
        let recipe = CMake::new().unwrap();
        let id = |profile: &cpkg_types::Settings| {
            let ctx = resolve(&recipe, "cmake/3.27.7", profile, &[]).unwrap();
            recipe
                .package_id(&ctx, PackageIdInfo::new(ctx.settings(), ctx.options(), Vec::new()))
                .package_id()
        };
        assert_eq!(
            id(&gcc("11")),
            id(&gcc("13").with_build_type(cpkg_types::BuildType::Debug))
        );
        assert_ne!(id(&gcc("13")), id(&gcc("13").with_arch(Arch::Armv8)));
    }
}
