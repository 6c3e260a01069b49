//! CMake toolchain and `find_package` config files

use super::{GeneratedFile, LinkFlags};
use crate::paths::slashed;
use cpkg_recipe::{CMakeBuild, CMakeValue, CppInfo, DependencyInfo, RecipeContext};
use cpkg_types::{Arch, CompilerKind, LibCxx, MsvcRuntime, OptionKey, Os};
use std::fmt::Write;

pub(crate) const TOOLCHAIN_FILE: &str = "cpkg_toolchain.cmake";

fn cmake_set(out: &mut String, name: &str, value: &CMakeValue) {
    let _ = match value {
        CMakeValue::Bool(_) => writeln!(out, "set({name} {value} CACHE BOOL \"\" FORCE)"),
        CMakeValue::Str(s) => writeln!(out, "set({name} \"{}\" CACHE STRING \"\" FORCE)", escape(s)),
    };
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn msvc_runtime(runtime: MsvcRuntime) -> &'static str {
    match runtime {
        MsvcRuntime::Static => "MultiThreaded$<$<CONFIG:Debug>:Debug>",
        MsvcRuntime::Dynamic => "MultiThreaded$<$<CONFIG:Debug>:Debug>DLL",
    }
}

fn osx_arch(arch: Arch) -> Option<&'static str> {
    match arch {
        Arch::X86_64 => Some("x86_64"),
        Arch::Armv8 => Some("arm64"),
        _ => None,
    }
}

/// `cpkg_toolchain.cmake`
pub(crate) fn toolchain(ctx: &RecipeContext, build: &CMakeBuild) -> GeneratedFile {
    let settings = ctx.settings();
    let options = ctx.options();
    let mut out = String::new();
    let _ = writeln!(out, "# cpkg toolchain for {}", ctx.reference());
    out.push_str("cmake_minimum_required(VERSION 3.15)\n\n");

    if let Some(build_type) = settings.build_type {
        let _ = writeln!(
            out,
            "set(CMAKE_BUILD_TYPE \"{build_type}\" CACHE STRING \"Build type\" FORCE)"
        );
    }
    if let Some(shared) = options.get_bool(&OptionKey::SHARED) {
        cmake_set(&mut out, "BUILD_SHARED_LIBS", &CMakeValue::Bool(shared));
    }
    if let Some(fpic) = options.get_bool(&OptionKey::FPIC) {
        cmake_set(&mut out, "CMAKE_POSITION_INDEPENDENT_CODE", &CMakeValue::Bool(fpic));
    }

    if let Some(cppstd) = settings.cppstd() {
        let _ = writeln!(out, "set(CMAKE_CXX_STANDARD {})", cppstd.short());
        let _ = writeln!(
            out,
            "set(CMAKE_CXX_EXTENSIONS {})",
            if cppstd.is_gnu() { "ON" } else { "OFF" }
        );
        out.push_str("set(CMAKE_CXX_STANDARD_REQUIRED ON)\n");
    }

    if let Some(compiler) = &settings.compiler {
        match (compiler.kind, compiler.libcxx) {
            (CompilerKind::Clang | CompilerKind::AppleClang, Some(LibCxx::Libcxx)) => {
                out.push_str("string(APPEND CMAKE_CXX_FLAGS_INIT \" -stdlib=libc++\")\n");
            }
            (CompilerKind::Clang, Some(LibCxx::Libstdcxx | LibCxx::Libstdcxx11)) => {
                out.push_str("string(APPEND CMAKE_CXX_FLAGS_INIT \" -stdlib=libstdc++\")\n");
            }
            _ => {}
        }
        if compiler.libcxx == Some(LibCxx::Libstdcxx) {
            out.push_str("add_compile_definitions(_GLIBCXX_USE_CXX11_ABI=0)\n");
        }
        if let Some(runtime) = compiler.runtime.filter(|_| compiler.kind.is_msvc()) {
            let _ = writeln!(
                out,
                "set(CMAKE_MSVC_RUNTIME_LIBRARY \"{}\")",
                msvc_runtime(runtime)
            );
        }
    }

    if settings.os == Some(Os::Macos) {
        if let Some(arch) = settings.arch.and_then(osx_arch) {
            let _ = writeln!(out, "set(CMAKE_OSX_ARCHITECTURES \"{arch}\" CACHE STRING \"\" FORCE)");
        }
    }

    out.push_str("\nlist(PREPEND CMAKE_PREFIX_PATH \"${CMAKE_CURRENT_LIST_DIR}\")\n");
    out.push_str("list(PREPEND CMAKE_MODULE_PATH \"${CMAKE_CURRENT_LIST_DIR}\")\n");

    if !build.variables.is_empty() {
        out.push('\n');
        for (name, value) in &build.variables {
            cmake_set(&mut out, name, value);
        }
    }

    GeneratedFile::new(TOOLCHAIN_FILE, out)
}

/// File stem used by `find_package` for a dependency
fn file_name(dep: &DependencyInfo) -> String {
    dep.info
        .cpp
        .property("cmake_file_name")
        .map_or_else(|| dep.reference.name.clone(), ToString::to_string)
}

fn target_name(dep: &DependencyInfo) -> String {
    dep.info.cpp.property("cmake_target_name").map_or_else(
        || format!("{0}::{0}", dep.reference.name),
        ToString::to_string,
    )
}

fn component_target(dep: &DependencyInfo, name: &str, cpp: &CppInfo) -> String {
    cpp.property("cmake_target_name")
        .map_or_else(|| format!("{}::{name}", file_name(dep)), ToString::to_string)
}

fn write_target(out: &mut String, target: &str, flags: &LinkFlags, extra_links: &[String]) {
    let _ = writeln!(out, "if(NOT TARGET {target})");
    let _ = writeln!(out, "  add_library({target} INTERFACE IMPORTED)");
    let _ = writeln!(out, "  set_target_properties({target} PROPERTIES");
    let _ = writeln!(
        out,
        "    INTERFACE_INCLUDE_DIRECTORIES \"{}\"",
        flags.includedirs.join(";")
    );
    let _ = writeln!(
        out,
        "    INTERFACE_COMPILE_DEFINITIONS \"{}\"",
        flags.defines.join(";")
    );
    let _ = writeln!(
        out,
        "    INTERFACE_LINK_DIRECTORIES \"{}\"",
        flags.libdirs.join(";")
    );
    let links: Vec<String> = extra_links
        .iter()
        .cloned()
        .chain(flags.libs.iter().cloned())
        .chain(flags.system_libs.iter().cloned())
        .chain(flags.frameworks.iter().map(|f| format!("-framework {f}")))
        .collect();
    let _ = writeln!(out, "    INTERFACE_LINK_LIBRARIES \"{}\")", links.join(";"));
    out.push_str("endif()\n");
}

/// `<name>-config.cmake` and `<name>-config-version.cmake`
pub(crate) fn dependency_files(dep: &DependencyInfo) -> [GeneratedFile; 2] {
    let stem = file_name(dep);
    let version = dep.reference.version.to_string();
    let root = slashed(&dep.package_folder);

    let mut config = String::new();
    let _ = writeln!(config, "# cpkg dependency config for {}", dep.reference);
    let _ = writeln!(config, "set({stem}_FOUND TRUE)");
    let _ = writeln!(config, "set({stem}_VERSION \"{version}\")");
    let _ = writeln!(config, "set({stem}_PACKAGE_FOLDER \"{root}\")\n");

    let mut component_targets = Vec::new();
    for (name, cpp) in &dep.info.components {
        let target = component_target(dep, name, cpp);
        let mut flags = LinkFlags::default();
        flags.add_cpp(&dep.package_folder, cpp);
        write_target(&mut config, &target, &flags, &[]);
        component_targets.push(target);
    }

    let mut main = LinkFlags::default();
    main.add_cpp(&dep.package_folder, &dep.info.cpp);
    write_target(&mut config, &target_name(dep), &main, &component_targets);

    let flags = LinkFlags::of(dep);
    let _ = writeln!(
        config,
        "\nset({stem}_INCLUDE_DIRS \"{}\")",
        flags.includedirs.join(";")
    );
    let _ = writeln!(config, "set({stem}_LIBRARIES {})", target_name(dep));

    let mut version_file = String::new();
    let _ = writeln!(version_file, "set(PACKAGE_VERSION \"{version}\")");
    version_file.push_str(
        "if(PACKAGE_FIND_VERSION VERSION_GREATER PACKAGE_VERSION)\n\
         \x20 set(PACKAGE_VERSION_COMPATIBLE FALSE)\n\
         else()\n\
         \x20 set(PACKAGE_VERSION_COMPATIBLE TRUE)\n\
         \x20 if(PACKAGE_FIND_VERSION STREQUAL PACKAGE_VERSION)\n\
         \x20   set(PACKAGE_VERSION_EXACT TRUE)\n\
         \x20 endif()\n\
         endif()\n",
    );

    [
        GeneratedFile::new(format!("{stem}-config.cmake"), config),
        GeneratedFile::new(format!("{stem}-config-version.cmake"), version_file),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpkg_recipe::{PackageInfo, RequirementKind};
    use cpkg_types::{
        BuildType, Compiler, CppStd, OptionValue, Options, Reference, Settings, Version,
    };

    fn ctx(settings: Settings, options: Options) -> RecipeContext {
        RecipeContext::new(Reference::parse("libharu/2.4.3").unwrap(), settings, options)
    }

    #[test]
    fn shared_builds_turn_on_build_shared_libs() {
        let options = Options::new().with(OptionKey::SHARED, OptionValue::Bool(true));
        let file = toolchain(
            &ctx(Settings::new().with_build_type(BuildType::Release), options),
            &CMakeBuild::new(),
        );
        assert!(file
            .contents
            .contains("set(BUILD_SHARED_LIBS ON CACHE BOOL \"\" FORCE)"));
        assert!(!file.contents.contains("CMAKE_POSITION_INDEPENDENT_CODE"));
        assert!(file.contents.contains("CMAKE_BUILD_TYPE \"Release\""));
    }

    #[test]
    fn msvc_runtime_and_standard() {
        let compiler = Compiler::new(CompilerKind::Msvc, Version::parse("193").unwrap())
            .with_runtime(MsvcRuntime::Static)
            .with_cppstd(CppStd::new(17));
        let file = toolchain(
            &ctx(Settings::new().with_compiler(compiler), Options::new()),
            &CMakeBuild::new(),
        );
        assert!(file.contents.contains("set(CMAKE_CXX_STANDARD 17)"));
        assert!(file.contents.contains("set(CMAKE_CXX_EXTENSIONS OFF)"));
        assert!(file
            .contents
            .contains("CMAKE_MSVC_RUNTIME_LIBRARY \"MultiThreaded$<$<CONFIG:Debug>:Debug>\""));
    }

    #[test]
    fn recipe_variables_are_sorted() {
        let build = CMakeBuild::new()
            .variable("ZSTD_SUPPORT", false)
            .variable("LIBHPDF_STATIC", true)
            .variable("CMAKE_INSTALL_LIBEXECDIR", "libexec");
        let file = toolchain(&ctx(Settings::new(), Options::new()), &build);
        let a = file.contents.find("CMAKE_INSTALL_LIBEXECDIR").unwrap();
        let b = file.contents.find("LIBHPDF_STATIC").unwrap();
        let c = file.contents.find("ZSTD_SUPPORT").unwrap();
        assert!(a < b && b < c);
        assert!(file
            .contents
            .contains("set(CMAKE_INSTALL_LIBEXECDIR \"libexec\" CACHE STRING \"\" FORCE)"));
    }

    #[test]
    fn dependency_config_defines_the_target() {
        let mut info = PackageInfo::default();
        info.cpp.libs = vec!["png16".into()];
        info.cpp.system_libs = vec!["m".into()];
        let dep = DependencyInfo::new(Reference::parse("libpng/1.6.40").unwrap(), RequirementKind::Host)
            .with_info(info)
            .with_package_folder("/cache/libpng");

        let [config, version] = dependency_files(&dep);
        assert_eq!(config.name, "libpng-config.cmake");
        assert!(config.contents.contains("add_library(libpng::libpng INTERFACE IMPORTED)"));
        assert!(config
            .contents
            .contains("INTERFACE_LINK_LIBRARIES \"png16;m\""));
        assert!(config
            .contents
            .contains("INTERFACE_INCLUDE_DIRECTORIES \"/cache/libpng/include\""));
        assert_eq!(version.name, "libpng-config-version.cmake");
        assert!(version.contents.contains("set(PACKAGE_VERSION \"1.6.40\")"));
    }
}
