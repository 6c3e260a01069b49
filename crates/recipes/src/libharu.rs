//! libharu: PDF generation in C, built with CMake

use cpkg_errors::RecipeError;
use cpkg_recipe::{
    cmake_layout, BuildStrategy, CMakeBuild, CompiledBuild, ConfigDelta, Layout, PackageInfo,
    PackagePlan, Recipe, RecipeContext, RecipeDescriptor, Requirement, SourceTable, ToolConfig,
};
use cpkg_types::{BuildType, OptionSchema, Os, PackageType};

#[derive(Debug, Clone)]
pub struct Libharu {
    descriptor: RecipeDescriptor,
    sources: SourceTable,
}

impl Libharu {
    /// # Errors
    /// Returns an error if the embedded source table is invalid.
    pub fn new() -> Result<Self, RecipeError> {
        Ok(Self {
            descriptor: RecipeDescriptor::new("libharu", PackageType::Library)
                .description("Haru is a free, cross platform, open-sourced software library for generating PDF.")
                .licenses(&["Zlib"])
                .homepage("http://libharu.org/")
                .topics(&["pdf", "generate", "generator"])
                .options(OptionSchema::new(OptionSchema::library_defs())?),
            sources: crate::sources("libharu", include_str!("../data/libharu.toml"))?,
        })
    }
}

/// 2.3.0 ships without a LICENSE file and with oddly named archives
fn is_legacy(ctx: &RecipeContext) -> bool {
    crate::is_version(ctx, "2.3.0")
}

/// Library name as installed, which varies with the 2.3.0 CMake project
fn library_name(ctx: &RecipeContext) -> String {
    if !is_legacy(ctx) {
        return "hpdf".to_string();
    }
    let msvc = ctx.settings().is_msvc();
    let prefix = if msvc { "lib" } else { "" };
    let static_suffix = if ctx.shared() { "" } else { "s" };
    let debug_suffix = if msvc && ctx.settings().build_type == Some(BuildType::Debug) {
        "d"
    } else {
        ""
    };
    format!("{prefix}hpdf{static_suffix}{debug_suffix}")
}

impl Recipe for Libharu {
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
        Ok(ConfigDelta::none().fpic_unless_static(ctx).c_only())
    }

    fn layout(&self, ctx: &RecipeContext) -> Layout {
        cmake_layout(ctx, "src")
    }

    fn requirements(&self, _ctx: &RecipeContext) -> Result<Vec<Requirement>, RecipeError> {
        Ok(vec![
            Requirement::host("zlib", "[>=1.2.11 <2]")?,
            Requirement::host("libpng", "1.6.40")?,
        ])
    }

    fn strategy(&self, ctx: &RecipeContext) -> BuildStrategy {
        let shared = ctx.shared();
        CompiledBuild::new(ToolConfig::CMake(
            CMakeBuild::new()
                .variable("LIBHPDF_SHARED", shared)
                .variable("LIBHPDF_STATIC", !shared)
                .cache_variable("CMAKE_POLICY_DEFAULT_CMP0077", "NEW"),
        ))
        .into()
    }

    fn package(&self, ctx: &RecipeContext) -> PackagePlan {
        if is_legacy(ctx) {
            // The license text is a section of the README
            PackagePlan::new()
                .install()
                .rm("CHANGES", "")
                .rm("INSTALL", "")
                .rm("README", "")
                .rmdir("if")
                .extract_section("README", "license", "licenses/LICENSE")
        } else {
            PackagePlan::new()
                .license("LICENSE")
                .install()
                .rmdir("share")
        }
    }

    fn package_info(&self, ctx: &RecipeContext) -> PackageInfo {
        let mut info = PackageInfo::new();
        info.cpp.libs.push(library_name(ctx));
        if ctx.settings().os == Some(Os::Windows) && ctx.shared() {
            info.cpp.defines.push("HPDF_DLL".to_string());
        }
        if crate::is_linux_or_freebsd(ctx) && !ctx.shared() {
            info.cpp.system_libs.push("m".to_string());
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{gcc, msvc, resolve};
    use cpkg_recipe::PackageStep;
    use cpkg_types::{OptionKey, SettingKey};

    #[test]
    fn fpic_follows_platform_and_linkage() {
        let recipe = Libharu::new().unwrap();

        let windows = resolve(&recipe, "libharu/2.4.3", &msvc(), &[]).unwrap();
        assert!(!windows.options().contains(&OptionKey::FPIC));

        let shared = resolve(&recipe, "libharu/2.4.3", &gcc("13"), &[("shared", "True")]).unwrap();
        assert!(!shared.options().contains(&OptionKey::FPIC));

        let static_ = resolve(&recipe, "libharu/2.4.3", &gcc("13"), &[]).unwrap();
        assert!(static_.options().is_enabled(&OptionKey::FPIC));
        assert!(!static_.settings().has(SettingKey::CompilerLibcxx));
    }

    #[test]
    fn legacy_library_names() {
        let recipe = Libharu::new().unwrap();
        let name = |profile, overrides: &[(&str, &str)]| {
            let ctx = resolve(&recipe, "libharu/2.3.0", &profile, overrides).unwrap();
            recipe.package_info(&ctx).cpp.libs
        };
        assert_eq!(name(gcc("13"), &[]), ["hpdfs"]);
        assert_eq!(name(gcc("13"), &[("shared", "True")]), ["hpdf"]);
        assert_eq!(name(msvc(), &[]), ["libhpdfs"]);
        assert_eq!(
            name(msvc().with_build_type(BuildType::Debug), &[("shared", "True")]),
            ["libhpdfd"]
        );

        let ctx = resolve(&recipe, "libharu/2.4.3", &msvc(), &[]).unwrap();
        assert_eq!(recipe.package_info(&ctx).cpp.libs, ["hpdf"]);
    }

    #[test]
    fn dll_define_and_libm() {
        let recipe = Libharu::new().unwrap();
        let ctx = resolve(&recipe, "libharu/2.4.3", &msvc(), &[("shared", "True")]).unwrap();
        let info = recipe.package_info(&ctx);
        assert_eq!(info.cpp.defines, ["HPDF_DLL"]);
        assert!(info.cpp.system_libs.is_empty());

        let ctx = resolve(&recipe, "libharu/2.4.3", &gcc("13"), &[]).unwrap();
        assert_eq!(recipe.package_info(&ctx).cpp.system_libs, ["m"]);
    }

    #[test]
    fn cmake_linkage_variables() {
        let recipe = Libharu::new().unwrap();
        let ctx = resolve(&recipe, "libharu/2.4.3", &gcc("13"), &[("shared", "True")]).unwrap();
        let BuildStrategy::Compiled(build) = recipe.strategy(&ctx) else {
            panic!("libharu is compiled");
        };
        let ToolConfig::CMake(cmake) = build.tool else {
            panic!("libharu uses cmake");
        };
        assert_eq!(cmake.variables["LIBHPDF_SHARED"].to_string(), "ON");
        assert_eq!(cmake.variables["LIBHPDF_STATIC"].to_string(), "OFF");
        assert_eq!(
            cmake.cache_variables["CMAKE_POLICY_DEFAULT_CMP0077"].to_string(),
            "NEW"
        );
    }

    #[test]
    fn legacy_license_comes_from_the_readme() {
        let recipe = Libharu::new().unwrap();
        let ctx = resolve(&recipe, "libharu/2.3.0", &gcc("13"), &[]).unwrap();
        let plan = recipe.package(&ctx);
        assert!(plan.uses_install());
        assert!(plan
            .steps
            .iter()
            .any(|s| matches!(s, PackageStep::ExtractSection { marker, .. } if marker == "license")));
    }
}
