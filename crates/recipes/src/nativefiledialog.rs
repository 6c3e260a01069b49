//! nativefiledialog: native open/save dialogs, built from premake projects

use cpkg_errors::RecipeError;
use cpkg_recipe::validate::invalid;
use cpkg_recipe::{
    Advisories, BuildStrategy, CompiledBuild, ConfigDelta, CopySpec, DepsGenerator, FileEdit,
    MakeBuild, MsBuildProject, Origin, PackageInfo, PackagePlan, Recipe, RecipeContext,
    RecipeDescriptor, Requirement, SourceTable, ToolCommand, ToolConfig,
};
use cpkg_types::{Arch, BuildType, CompilerKind, OptionSchema, PackageType};

/// premake5 only handles projects one level below its script
const PROJECT_DIR: &str = "build/subdir";

#[derive(Debug, Clone)]
pub struct NativeFileDialog {
    descriptor: RecipeDescriptor,
    sources: SourceTable,
}

impl NativeFileDialog {
    /// # Errors
    /// Returns an error if the embedded source table is invalid.
    pub fn new() -> Result<Self, RecipeError> {
        Ok(Self {
            descriptor: RecipeDescriptor::new("nativefiledialog", PackageType::Library)
                .description("A tiny, neat C library that portably invokes native file open and save dialogs.")
                .licenses(&["Zlib"])
                .homepage("https://github.com/mlabbe/nativefiledialog")
                .topics(&["dialog", "gui"])
                .options(OptionSchema::new(OptionSchema::library_defs())?),
            sources: crate::sources(
                "nativefiledialog",
                include_str!("../data/nativefiledialog.toml"),
            )?,
        })
    }
}

/// premake5 action for the configured compiler
fn premake_action(ctx: &RecipeContext) -> Option<&'static str> {
    let compiler = ctx.settings().compiler.as_ref()?;
    let action = match (compiler.kind, compiler.version.major()) {
        (CompilerKind::Msvc, 190) | (CompilerKind::VisualStudio, 14) => "vs2015",
        (CompilerKind::Msvc, 191) | (CompilerKind::VisualStudio, 15) => "vs2017",
        (CompilerKind::Msvc, 192) | (CompilerKind::VisualStudio, 16) => "vs2019",
        (CompilerKind::Msvc, 193) | (CompilerKind::VisualStudio, 17) => "vs2022",
        (CompilerKind::Msvc | CompilerKind::VisualStudio, _) => return None,
        _ => "gmake2",
    };
    Some(action)
}

fn is_debug(ctx: &RecipeContext) -> bool {
    ctx.settings().build_type == Some(BuildType::Debug)
}

fn library_name(ctx: &RecipeContext) -> &'static str {
    if is_debug(ctx) {
        "nfd_d"
    } else {
        "nfd"
    }
}

impl Recipe for NativeFileDialog {
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
        if !matches!(ctx.settings().arch, Some(Arch::X86 | Arch::X86_64)) {
            return Err(invalid(ctx, "architecture not supported"));
        }
        Ok(ConfigDelta::none().c_only())
    }

    fn requirements(&self, ctx: &RecipeContext) -> Result<Vec<Requirement>, RecipeError> {
        if crate::is_linux_or_freebsd(ctx) {
            Ok(vec![Requirement::host("gtk", "4.7.0")?])
        } else {
            Ok(Vec::new())
        }
    }

    fn build_requirements(&self, _ctx: &RecipeContext) -> Result<Vec<Requirement>, RecipeError> {
        Ok(vec![Requirement::tool("premake", "5.0.0-alpha15")?])
    }

    fn validate(&self, ctx: &RecipeContext) -> Result<Advisories, RecipeError> {
        if premake_action(ctx).is_none() && ctx.settings().is_msvc() {
            return Err(invalid(ctx, "unsupported Visual Studio version"));
        }
        Ok(Advisories::new())
    }

    fn strategy(&self, ctx: &RecipeContext) -> BuildStrategy {
        let action = premake_action(ctx).unwrap_or("gmake2");
        let tool = if ctx.settings().is_msvc() {
            ToolConfig::MsBuild(MsBuildProject::new(format!(
                "{PROJECT_DIR}/NativeFileDialog.sln"
            )))
        } else {
            let config = if is_debug(ctx) { "debug" } else { "release" };
            let arch = if ctx.settings().arch == Some(Arch::X86) {
                "x86"
            } else {
                "x64"
            };
            ToolConfig::Make(MakeBuild::new(PROJECT_DIR).arg(format!("config={config}_{arch}")))
        };
        CompiledBuild::new(tool)
            .edit(FileEdit::make_dir(PROJECT_DIR))
            .edit(FileEdit::rename(
                "build/premake5.lua",
                format!("{PROJECT_DIR}/premake5.lua"),
            ))
            .prepare(ToolCommand::new("premake5", &[action]).in_dir(PROJECT_DIR))
            .generators(vec![DepsGenerator::PkgConfigDeps])
            .into()
    }

    fn package(&self, ctx: &RecipeContext) -> PackagePlan {
        let extension = if ctx.settings().is_msvc() { "lib" } else { "a" };
        let library = format!("*{}.{extension}", library_name(ctx));
        PackagePlan::new()
            .license("LICENSE")
            .copy(
                CopySpec::new(&library)
                    .from(Origin::Source, "build")
                    .to("lib")
                    .flatten(),
            )
            .copy(
                CopySpec::new("*nfd.h")
                    .from(Origin::Source, "src")
                    .to("include")
                    .flatten(),
            )
    }

    fn package_info(&self, ctx: &RecipeContext) -> PackageInfo {
        let mut info = PackageInfo::new();
        info.cpp.libs.push(library_name(ctx).to_string());
        info
    }
}
