//! Environment for `configure` and plain makefiles

use super::{GeneratedFile, LinkFlags};
use crate::paths::slashed;
use cpkg_recipe::RecipeContext;
use cpkg_types::{BuildType, CompilerKind, LibCxx, OptionKey};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

pub(crate) const ENV_FILE: &str = "cpkg_build.env";

fn build_type_flags(build_type: Option<BuildType>) -> (&'static str, bool) {
    match build_type {
        Some(BuildType::Debug) => ("-g", false),
        Some(BuildType::RelWithDebInfo) => ("-O2 -g", true),
        Some(BuildType::MinSizeRel) => ("-Os", true),
        Some(BuildType::Release) => ("-O3", true),
        None => ("", false),
    }
}

fn join_flags(parts: impl IntoIterator<Item = String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compiler and linker variables, without `PATH`
fn flag_vars(ctx: &RecipeContext, generators_dir: &Path) -> BTreeMap<String, String> {
    let settings = ctx.settings();
    let deps = LinkFlags::of_host_dependencies(ctx);
    let (opt, ndebug) = build_type_flags(settings.build_type);
    let pic = if ctx.options().is_enabled(&OptionKey::FPIC) {
        "-fPIC"
    } else {
        ""
    };

    let mut cppflags: Vec<String> = deps.includedirs.iter().map(|d| format!("-I{d}")).collect();
    cppflags.extend(deps.defines.iter().map(|d| format!("-D{d}")));
    if ndebug {
        cppflags.push("-DNDEBUG".to_string());
    }

    let mut ldflags: Vec<String> = deps.libdirs.iter().map(|d| format!("-L{d}")).collect();
    ldflags.extend(deps.frameworks.iter().map(|f| format!("-framework {f}")));

    let libs: Vec<String> = deps
        .libs
        .iter()
        .chain(deps.system_libs.iter())
        .map(|l| format!("-l{l}"))
        .collect();

    let stdlib = match (settings.compiler_kind(), settings.libcxx()) {
        (Some(CompilerKind::Clang | CompilerKind::AppleClang), Some(LibCxx::Libcxx)) => {
            "-stdlib=libc++"
        }
        _ => "",
    };
    let abi = if settings.libcxx() == Some(LibCxx::Libstdcxx) {
        "-D_GLIBCXX_USE_CXX11_ABI=0"
    } else {
        ""
    };

    let mut vars = BTreeMap::new();
    vars.insert(
        "CFLAGS".to_string(),
        join_flags([opt.to_string(), pic.to_string()]),
    );
    vars.insert(
        "CXXFLAGS".to_string(),
        join_flags([opt.to_string(), pic.to_string(), stdlib.to_string(), abi.to_string()]),
    );
    vars.insert("CPPFLAGS".to_string(), join_flags(cppflags));
    vars.insert("LDFLAGS".to_string(), join_flags(ldflags));
    vars.insert("LIBS".to_string(), join_flags(libs));
    vars.insert("PKG_CONFIG_PATH".to_string(), slashed(generators_dir));
    vars
}

/// Binary folders of tool requirements, prepended to `PATH`
fn tool_paths(ctx: &RecipeContext) -> Vec<PathBuf> {
    ctx.dependencies()
        .build_iter()
        .flat_map(|dep| {
            dep.info
                .cpp
                .bindirs
                .iter()
                .map(|dir| dep.package_folder.join(dir))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// `PATH` with tool requirement binaries in front of the inherited one;
/// empty without tool requirements
#[must_use]
pub fn tool_env(ctx: &RecipeContext) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    let tools = tool_paths(ctx);
    if !tools.is_empty() {
        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let paths = tools
            .into_iter()
            .chain(std::env::split_paths(&inherited));
        if let Ok(joined) = std::env::join_paths(paths) {
            vars.insert("PATH".to_string(), joined.to_string_lossy().into_owned());
        }
    }
    vars
}

/// Environment passed to configure and make: compiler flags plus
/// [`tool_env`]
#[must_use]
pub fn build_env(ctx: &RecipeContext, generators_dir: &Path) -> BTreeMap<String, String> {
    let mut vars = flag_vars(ctx, generators_dir);
    vars.extend(tool_env(ctx));
    vars
}

/// `cpkg_build.env`, a shell fragment mirroring [`build_env`]
pub(crate) fn env_file(ctx: &RecipeContext, generators_dir: &Path) -> GeneratedFile {
    let mut out = String::new();
    let _ = writeln!(out, "# cpkg build environment for {}", ctx.reference());
    for (name, value) in flag_vars(ctx, generators_dir) {
        let _ = writeln!(out, "export {name}=\"{value}\"");
    }
    let tools: Vec<String> = tool_paths(ctx).iter().map(|p| slashed(p)).collect();
    if !tools.is_empty() {
        let _ = writeln!(out, "export PATH=\"{}:$PATH\"", tools.join(":"));
    }
    GeneratedFile::new(ENV_FILE, out)
}
