//! Tool configuration files written during the generate phase
//!
//! Rendering is pure: the same context and strategy always produce the same
//! bytes. Maps are ordered and nothing time- or host-dependent is written, so
//! re-running generate is a no-op for the build tool.

mod autotools;
mod cmake;
mod msbuild;
mod pkg_config;

pub use autotools::{build_env, tool_env};
pub(crate) use cmake::TOOLCHAIN_FILE as CMAKE_TOOLCHAIN;
pub(crate) use msbuild::TOOLCHAIN_PROPS as MSBUILD_TOOLCHAIN;

use crate::paths::slashed;
use cpkg_errors::{BuildError, Error};
use cpkg_events::{AppEvent, BuildEvent, EventEmitter};
use cpkg_recipe::{
    CompiledBuild, CppInfo, DependencyInfo, DepsGenerator, PackageInfo, RecipeContext, ToolConfig,
};
use std::path::{Path, PathBuf};

/// One rendered file, named relative to the generators folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub name: String,
    pub contents: String,
}

impl GeneratedFile {
    fn new(name: impl Into<String>, contents: String) -> Self {
        Self {
            name: name.into(),
            contents,
        }
    }
}

/// Render every file a compiled build needs
#[must_use]
pub fn render(ctx: &RecipeContext, build: &CompiledBuild, generators_dir: &Path) -> Vec<GeneratedFile> {
    let mut files = Vec::new();

    match &build.tool {
        ToolConfig::CMake(cmake) => files.push(cmake::toolchain(ctx, cmake)),
        ToolConfig::Autotools(_) | ToolConfig::Make(_) => {
            files.push(autotools::env_file(ctx, generators_dir));
        }
        ToolConfig::MsBuild(_) => files.push(msbuild::toolchain(ctx)),
    }

    let mut generators = build.generators.clone();
    generators.sort();
    generators.dedup();
    for generator in generators {
        match generator {
            DepsGenerator::CMakeDeps => {
                for dep in ctx.dependencies().host_iter() {
                    files.extend(cmake::dependency_files(dep));
                }
            }
            DepsGenerator::PkgConfigDeps => {
                for dep in ctx.dependencies().host_iter() {
                    files.push(pkg_config::pc_file(dep));
                }
            }
            DepsGenerator::MsBuildDeps => files.push(msbuild::deps_props(ctx)),
        }
    }

    files
}

/// Write rendered files into the generators folder
///
/// # Errors
/// Returns `GeneratorFailed` if the folder or a file cannot be written.
pub async fn write_files<E: EventEmitter + ?Sized>(
    dir: &Path,
    files: &[GeneratedFile],
    events: &E,
) -> Result<Vec<PathBuf>, Error> {
    let failed = |path: &Path, e: std::io::Error| -> Error {
        BuildError::GeneratorFailed {
            message: format!("{}: {e}", path.display()),
        }
        .into()
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| failed(dir, e))?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.name);
        tokio::fs::write(&path, &file.contents)
            .await
            .map_err(|e| failed(&path, e))?;
        events.emit(AppEvent::Build(BuildEvent::GeneratorWritten { path: path.clone() }));
        written.push(path);
    }
    Ok(written)
}

/// Flattened compile and link inputs of one or more packages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LinkFlags {
    pub includedirs: Vec<String>,
    pub libdirs: Vec<String>,
    pub bindirs: Vec<String>,
    pub libs: Vec<String>,
    pub system_libs: Vec<String>,
    pub frameworks: Vec<String>,
    pub defines: Vec<String>,
}

fn push_unique(target: &mut Vec<String>, values: impl IntoIterator<Item = String>) {
    for value in values {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}

impl LinkFlags {
    fn add_cpp(&mut self, root: &Path, cpp: &CppInfo) {
        let absolute = |dirs: &[PathBuf]| -> Vec<String> {
            dirs.iter().map(|d| slashed(&root.join(d))).collect()
        };
        push_unique(&mut self.includedirs, absolute(&cpp.includedirs));
        push_unique(&mut self.libdirs, absolute(&cpp.libdirs));
        push_unique(&mut self.bindirs, absolute(&cpp.bindirs));
        push_unique(&mut self.libs, cpp.libs.iter().cloned());
        push_unique(&mut self.system_libs, cpp.system_libs.iter().cloned());
        push_unique(&mut self.frameworks, cpp.frameworks.iter().cloned());
        push_unique(&mut self.defines, cpp.defines.iter().cloned());
    }

    /// Flags of a package including all of its components
    pub fn of_info(root: &Path, info: &PackageInfo) -> Self {
        let mut flags = Self::default();
        for component in info.components.values() {
            flags.add_cpp(root, component);
        }
        flags.add_cpp(root, &info.cpp);
        flags
    }

    pub fn of(dep: &DependencyInfo) -> Self {
        Self::of_info(&dep.package_folder, &dep.info)
    }

    /// Flags of every host dependency, in name order
    pub fn of_host_dependencies(ctx: &RecipeContext) -> Self {
        let mut flags = Self::default();
        for dep in ctx.dependencies().host_iter() {
            let other = Self::of(dep);
            push_unique(&mut flags.includedirs, other.includedirs);
            push_unique(&mut flags.libdirs, other.libdirs);
            push_unique(&mut flags.bindirs, other.bindirs);
            push_unique(&mut flags.libs, other.libs);
            push_unique(&mut flags.system_libs, other.system_libs);
            push_unique(&mut flags.frameworks, other.frameworks);
            push_unique(&mut flags.defines, other.defines);
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpkg_recipe::{CMakeBuild, Dependencies, RequirementKind};
    use cpkg_types::{
        BuildType, Compiler, CompilerKind, OptionKey, OptionValue, Options, Os, Reference,
        Settings, Version,
    };

    fn zlib() -> DependencyInfo {
        let mut info = PackageInfo::default();
        info.cpp.libs = vec!["z".into()];
        info.cpp.set_property("cmake_file_name", "ZLIB");
        info.cpp.set_property("cmake_target_name", "ZLIB::ZLIB");
        DependencyInfo::new(Reference::parse("zlib/1.3.1").unwrap(), RequirementKind::Host)
            .with_info(info)
            .with_package_folder("/cache/zlib/1.3.1/abc/package")
    }

    fn ctx(shared: bool) -> RecipeContext {
        let settings = Settings::new()
            .with_os(Os::Linux)
            .with_compiler(Compiler::new(CompilerKind::Gcc, Version::parse("13").unwrap()))
            .with_build_type(BuildType::Release);
        let mut options = Options::new().with(OptionKey::SHARED, OptionValue::Bool(shared));
        if !shared {
            options = options.with(OptionKey::FPIC, OptionValue::Bool(true));
        }
        RecipeContext::new(Reference::parse("libharu/2.4.3").unwrap(), settings, options)
            .with_dependencies(Dependencies::new().with(zlib()))
    }

    fn cmake_build() -> CompiledBuild {
        CompiledBuild::new(ToolConfig::CMake(
            CMakeBuild::new().variable("LIBHPDF_SHARED", true),
        ))
    }

    #[test]
    fn rendering_is_deterministic() {
        let dir = Path::new("/work/build/Release/generators");
        let first = render(&ctx(true), &cmake_build(), dir);
        let second = render(&ctx(true), &cmake_build(), dir);
        assert_eq!(first, second);

        let names: Vec<&str> = first.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "cpkg_toolchain.cmake",
                "ZLIB-config.cmake",
                "ZLIB-config-version.cmake"
            ]
        );
    }

    #[tokio::test]
    async fn writing_twice_gives_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let files = render(&ctx(false), &cmake_build(), dir.path());
        let events: Option<cpkg_events::EventSender> = None;

        let paths = write_files(dir.path(), &files, &events).await.unwrap();
        let before: Vec<Vec<u8>> = paths.iter().map(|p| std::fs::read(p).unwrap()).collect();
        write_files(dir.path(), &files, &events).await.unwrap();
        let after: Vec<Vec<u8>> = paths.iter().map(|p| std::fs::read(p).unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn link_flags_are_absolute_and_unique() {
        let flags = LinkFlags::of(&zlib());
        assert_eq!(flags.includedirs, ["/cache/zlib/1.3.1/abc/package/include"]);
        assert_eq!(flags.libs, ["z"]);
    }
}
