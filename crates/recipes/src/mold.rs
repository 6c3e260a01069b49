//! mold: a modern linker, shipped as an application

use crate::is_linux_or_freebsd;
use cpkg_errors::RecipeError;
use cpkg_recipe::validate::invalid;
use cpkg_recipe::{
    cmake_layout, Advisories, BuildStrategy, CMakeBuild, CompiledBuild, ConfValue, EnvAction,
    Layout, PackageIdInfo, PackageInfo, PackagePlan, Recipe, RecipeContext, RecipeDescriptor,
    Requirement, SourceTable, ToolConfig,
};
use cpkg_types::{
    Arch, BuildType, CompilerKind, LibCxx, OptionDef, OptionKey, OptionSchema, Os, PackageType,
    SettingKey, Version,
};

const WITH_MIMALLOC: OptionKey = OptionKey::new("with_mimalloc");

#[derive(Debug, Clone)]
pub struct Mold {
    descriptor: RecipeDescriptor,
    sources: SourceTable,
}

impl Mold {
    /// # Errors
    /// Returns an error if the embedded source table is invalid.
    pub fn new() -> Result<Self, RecipeError> {
        Ok(Self {
            descriptor: RecipeDescriptor::new("mold", PackageType::Application)
                .description(
                    "mold is a faster drop-in replacement for existing Unix linkers. \
                     It is several times faster than the LLVM lld linker.",
                )
                .licenses(&["AGPL-3.0"])
                .homepage("https://github.com/rui314/mold/")
                .topics(&["ld", "linkage", "compilation", "pre-built"])
                .options(OptionSchema::new(vec![OptionDef::boolean(
                    WITH_MIMALLOC,
                    false,
                )])?),
            sources: crate::sources("mold", include_str!("../data/mold.toml"))?,
        })
    }
}

fn older_than(version: &Version, minimum: &str) -> bool {
    Version::parse(minimum).is_ok_and(|m| *version < m)
}

impl Recipe for Mold {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn sources(&self) -> &SourceTable {
        &self.sources
    }

    fn layout(&self, ctx: &RecipeContext) -> Layout {
        cmake_layout(ctx, "src")
    }

    fn requirements(&self, ctx: &RecipeContext) -> Result<Vec<Requirement>, RecipeError> {
        let mut requires = vec![
            Requirement::host("zlib", "1.2.13")?,
            Requirement::host("openssl", "[>=1.1 <4]")?,
            Requirement::host("xxhash", "0.8.2")?,
            Requirement::host("onetbb", "2021.10.0")?,
        ];
        if ctx.options().is_enabled(&WITH_MIMALLOC) {
            requires.push(Requirement::host("mimalloc", "2.1.2")?);
        }
        Ok(requires)
    }

    fn validate(&self, ctx: &RecipeContext) -> Result<Advisories, RecipeError> {
        let settings = ctx.settings();
        if settings.build_type == Some(BuildType::Debug) {
            return Err(invalid(
                ctx,
                "mold is not built in Debug, consume the Release package instead",
            ));
        }
        if let Some(compiler) = settings.compiler.as_ref() {
            let needs_cxx11_abi = matches!(
                compiler.kind,
                CompilerKind::Gcc | CompilerKind::Clang | CompilerKind::IntelCc
            );
            if needs_cxx11_abi && compiler.libcxx != Some(LibCxx::Libstdcxx11) {
                return Err(invalid(ctx, "mold can only be built with libstdc++11"));
            }
        }
        if settings.os == Some(Os::Windows) {
            return Err(invalid(ctx, "mold can't be built on Windows"));
        }
        if let Some(compiler) = settings.compiler.as_ref() {
            match compiler.kind {
                CompilerKind::Gcc if older_than(&compiler.version, "10") => {
                    return Err(invalid(ctx, "GCC version 10 or higher required"));
                }
                CompilerKind::Clang | CompilerKind::AppleClang
                    if older_than(&compiler.version, "12") =>
                {
                    return Err(invalid(ctx, "Clang version 12 or higher required"));
                }
                CompilerKind::AppleClang if settings.arch == Some(Arch::Armv8) => {
                    return Err(invalid(ctx, "mold is not supported on armv8 Macs"));
                }
                _ => {}
            }
        }
        Ok(Advisories::new())
    }

    fn strategy(&self, ctx: &RecipeContext) -> BuildStrategy {
        CompiledBuild::new(ToolConfig::CMake(
            CMakeBuild::new()
                .variable(
                    "MOLD_USE_MIMALLOC",
                    ctx.options().is_enabled(&WITH_MIMALLOC),
                )
                .variable("MOLD_USE_SYSTEM_MIMALLOC", true)
                .variable("MOLD_USE_SYSTEM_TBB", true)
                .variable("CMAKE_INSTALL_LIBEXECDIR", "libexec"),
        ))
        .into()
    }

    fn package(&self, _ctx: &RecipeContext) -> PackagePlan {
        PackagePlan::new()
            .install()
            .license("LICENSE")
            .rmdir("lib/cmake")
            .rmdir("share")
    }

    fn package_info(&self, ctx: &RecipeContext) -> PackageInfo {
        let mut info = PackageInfo::application();
        if is_linux_or_freebsd(ctx) {
            info.cpp
                .system_libs
                .extend(["m", "pthread", "dl"].map(String::from));
        }
        info.conf.insert(
            "user.mold:mold".to_string(),
            ConfValue::Path("bin/mold".into()),
        );
        info.env.push(EnvAction::DefinePath {
            name: "MOLD_ROOT".to_string(),
            path: "bin".into(),
        });
        info.env.push(EnvAction::DefinePath {
            name: "LD".to_string(),
            path: "bin/mold".into(),
        });
        info.append_path("bin");
        info
    }

    fn package_id(&self, _ctx: &RecipeContext, id: PackageIdInfo) -> PackageIdInfo {
        id.without_setting(SettingKey::Compiler)
    }
}
