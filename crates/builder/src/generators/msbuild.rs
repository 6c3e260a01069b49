//! MSBuild property sheets

use super::{GeneratedFile, LinkFlags};
use cpkg_recipe::RecipeContext;
use cpkg_types::{BuildType, MsvcRuntime};
use std::fmt::Write;

pub(crate) const TOOLCHAIN_PROPS: &str = "cpkg_toolchain.props";
pub(crate) const DEPS_PROPS: &str = "cpkg_deps.props";

const HEADER: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<Project xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">\n";

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn runtime_library(runtime: MsvcRuntime, debug: bool) -> &'static str {
    match (runtime, debug) {
        (MsvcRuntime::Static, false) => "MultiThreaded",
        (MsvcRuntime::Static, true) => "MultiThreadedDebug",
        (MsvcRuntime::Dynamic, false) => "MultiThreadedDLL",
        (MsvcRuntime::Dynamic, true) => "MultiThreadedDebugDLL",
    }
}

/// `cpkg_toolchain.props`: runtime and language standard, importing the
/// dependency sheet when one was generated
pub(crate) fn toolchain(ctx: &RecipeContext) -> GeneratedFile {
    let settings = ctx.settings();
    let debug = settings.build_type == Some(BuildType::Debug);

    let mut out = String::from(HEADER);
    let _ = writeln!(
        out,
        "  <Import Project=\"$(MSBuildThisFileDirectory){DEPS_PROPS}\" \
         Condition=\"Exists('$(MSBuildThisFileDirectory){DEPS_PROPS}')\" />"
    );
    out.push_str("  <ItemDefinitionGroup>\n    <ClCompile>\n");
    if let Some(runtime) = settings.compiler.as_ref().and_then(|c| c.runtime) {
        let _ = writeln!(
            out,
            "      <RuntimeLibrary>{}</RuntimeLibrary>",
            runtime_library(runtime, debug)
        );
    }
    if let Some(cppstd) = settings.cppstd() {
        let _ = writeln!(
            out,
            "      <LanguageStandard>stdcpp{}</LanguageStandard>",
            cppstd.short()
        );
    }
    out.push_str("    </ClCompile>\n  </ItemDefinitionGroup>\n</Project>\n");

    GeneratedFile::new(TOOLCHAIN_PROPS, out)
}

/// `cpkg_deps.props`: include and library paths of every host dependency
pub(crate) fn deps_props(ctx: &RecipeContext) -> GeneratedFile {
    let flags = LinkFlags::of_host_dependencies(ctx);
    let list = |items: Vec<String>, inherited: &str| -> String {
        let mut items: Vec<String> = items.iter().map(|i| xml_escape(i)).collect();
        items.push(format!("%({inherited})"));
        items.join(";")
    };
    let libs: Vec<String> = flags
        .libs
        .iter()
        .chain(flags.system_libs.iter())
        .map(|l| format!("{l}.lib"))
        .collect();

    let mut out = String::from(HEADER);
    out.push_str("  <ItemDefinitionGroup>\n    <ClCompile>\n");
    let _ = writeln!(
        out,
        "      <AdditionalIncludeDirectories>{}</AdditionalIncludeDirectories>",
        list(flags.includedirs, "AdditionalIncludeDirectories")
    );
    let _ = writeln!(
        out,
        "      <PreprocessorDefinitions>{}</PreprocessorDefinitions>",
        list(flags.defines, "PreprocessorDefinitions")
    );
    out.push_str("    </ClCompile>\n    <Link>\n");
    let _ = writeln!(
        out,
        "      <AdditionalLibraryDirectories>{}</AdditionalLibraryDirectories>",
        list(flags.libdirs, "AdditionalLibraryDirectories")
    );
    let _ = writeln!(
        out,
        "      <AdditionalDependencies>{}</AdditionalDependencies>",
        list(libs, "AdditionalDependencies")
    );
    out.push_str("    </Link>\n  </ItemDefinitionGroup>\n</Project>\n");

    GeneratedFile::new(DEPS_PROPS, out)
}
