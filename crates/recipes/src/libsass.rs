//! libsass: the C/C++ port of the Sass engine
//!
//! Three build paths: the plain makefile under MinGW, the Visual Studio
//! solution under MSVC and autotools everywhere else.

use crate::{is_linux_or_freebsd, stdcpp_library};
use cpkg_errors::RecipeError;
use cpkg_recipe::{
    AutotoolsBuild, BuildStrategy, CompiledBuild, ConfigDelta, CopySpec, FileEdit, MakeBuild,
    MsBuildProject, Origin, PackageInfo, PackagePlan, Recipe, RecipeContext, RecipeDescriptor,
    Requirement, SourceTable, ToolConfig,
};
use cpkg_types::{Arch, CompilerKind, OptionSchema, PackageType};

#[derive(Debug, Clone)]
pub struct Libsass {
    descriptor: RecipeDescriptor,
    sources: SourceTable,
}

impl Libsass {
    /// # Errors
    /// Returns an error if the embedded source table is invalid.
    pub fn new() -> Result<Self, RecipeError> {
        Ok(Self {
            descriptor: RecipeDescriptor::new("libsass", PackageType::Library)
                .description("A C/C++ implementation of a Sass compiler")
                .licenses(&["MIT"])
                .homepage("libsass.org")
                .topics(&["Sass", "compiler"])
                .options(OptionSchema::new(OptionSchema::library_defs())?),
            sources: crate::sources("libsass", include_str!("../data/libsass.toml"))?,
        })
    }
}

fn is_mingw(ctx: &RecipeContext) -> bool {
    ctx.settings().is_windows() && ctx.settings().compiler_kind() == Some(CompilerKind::Gcc)
}

fn mingw_build(ctx: &RecipeContext) -> CompiledBuild {
    let linkage = if ctx.shared() { "shared" } else { "static" };
    let make = MakeBuild::new(".")
        .makefile("Makefile")
        .env("BUILD", linkage)
        .env("STATIC_ALL", "0")
        .env("STATIC_LIBGCC", "0")
        .env("STATIC_LIBSTDCPP", "0");
    // Optimisation flags come from the profile
    ["CFLAGS   += -O2", "CXXFLAGS += -O2", "LDFLAGS  += -O2"]
        .into_iter()
        .fold(CompiledBuild::new(ToolConfig::Make(make)), |build, flag| {
            build.edit(FileEdit::replace("Makefile", flag, ""))
        })
}

fn msvc_build(ctx: &RecipeContext) -> CompiledBuild {
    let static_lib = if ctx.shared() { "" } else { "true" };
    CompiledBuild::new(ToolConfig::MsBuild(
        MsBuildProject::new("win/libsass.sln")
            .platform(Arch::X86, "Win32")
            .platform(Arch::X86_64, "Win64")
            .property("LIBSASS_STATIC_LIB", static_lib)
            .whole_program_optimization_from_cflags(),
    ))
}

fn autotools_build(ctx: &RecipeContext) -> CompiledBuild {
    CompiledBuild::new(ToolConfig::Autotools(
        AutotoolsBuild::new()
            .args(&["--disable-tests"])
            .autoreconf()
            .in_source(),
    ))
    // The release tarball lacks the VERSION file configure.ac reads
    .edit(FileEdit::save("VERSION", ctx.version().to_string()))
}

impl Recipe for Libsass {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn sources(&self) -> &SourceTable {
        &self.sources
    }

    fn config_options(&self, ctx: &RecipeContext) -> ConfigDelta {
        ConfigDelta::none().fpic_unless_windows(ctx)
    }

    fn configure(&self, ctx: &RecipeContext) -> Result<ConfigDelta, RecipeError> {
        Ok(ConfigDelta::none().fpic_unless_static(ctx))
    }

    fn build_requirements(&self, ctx: &RecipeContext) -> Result<Vec<Requirement>, RecipeError> {
        if ctx.settings().is_windows() {
            return Ok(Vec::new());
        }
        Ok(vec![Requirement::tool("libtool", "2.4.7")?])
    }

    fn strategy(&self, ctx: &RecipeContext) -> BuildStrategy {
        if is_mingw(ctx) {
            mingw_build(ctx).into()
        } else if ctx.settings().is_msvc() {
            msvc_build(ctx).into()
        } else {
            autotools_build(ctx).into()
        }
    }

    fn package(&self, ctx: &RecipeContext) -> PackagePlan {
        let plan = PackagePlan::new().license("LICENSE");
        if is_mingw(ctx) {
            plan.copy(CopySpec::new("*.h").from(Origin::Source, "include").to("include"))
                .copy(CopySpec::new("*.dll").from(Origin::Source, "lib").to("bin").flatten())
                .copy(CopySpec::new("*.a").from(Origin::Source, "lib").to("lib").flatten())
        } else if ctx.settings().is_msvc() {
            plan.copy(CopySpec::new("*.h").from(Origin::Source, "include").to("include"))
                .copy(CopySpec::new("*.dll").from(Origin::Source, "win/bin").to("bin").flatten())
                .copy(CopySpec::new("*.lib").from(Origin::Source, "win/bin").to("lib").flatten())
        } else {
            plan.install()
                .rmdir("lib/pkgconfig")
                .rm_recursive("*.la", "lib")
        }
    }

    fn package_info(&self, ctx: &RecipeContext) -> PackageInfo {
        let mut info = PackageInfo::new();
        info.cpp.set_property("pkg_config_name", "libsass");
        let lib = if ctx.settings().is_msvc() { "libsass" } else { "sass" };
        info.cpp.libs.push(lib.to_string());
        if is_linux_or_freebsd(ctx) {
            info.cpp.system_libs.extend(["dl", "m"].map(String::from));
        }
        if !ctx.shared() {
            if let Some(stdcpp) = stdcpp_library(ctx) {
                info.cpp.system_libs.push(stdcpp.to_string());
            }
        }
        info
    }
}
