#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Built-in recipes
//!
//! One module per library. Source archives and patches live in TOML tables
//! under `data/`, compiled into the binary. [`RecipeRegistry::builtin`] loads
//! them all.

mod cmake;
mod dlpack;
mod libharu;
mod libsass;
mod mold;
mod ms_gsl;
mod nativefiledialog;
mod registry;
mod tar;
mod upx;

pub use cmake::CMake;
pub use dlpack::Dlpack;
pub use libharu::Libharu;
pub use libsass::Libsass;
pub use mold::Mold;
pub use ms_gsl::MsGsl;
pub use nativefiledialog::NativeFileDialog;
pub use registry::RecipeRegistry;
pub use tar::Tar;
pub use upx::Upx;

use cpkg_errors::RecipeError;
use cpkg_recipe::{RecipeContext, SourceTable};
use cpkg_types::{LibCxx, Os, Version};

/// Parse an embedded source table, naming the recipe on failure
fn sources(recipe: &str, table: &str) -> Result<SourceTable, RecipeError> {
    SourceTable::from_toml(table).map_err(|e| RecipeError::Definition {
        message: format!("{recipe}: {e}"),
    })
}

/// Whether the recipe version is exactly `version`
fn is_version(ctx: &RecipeContext, version: &str) -> bool {
    Version::parse(version).is_ok_and(|v| *ctx.version() == v)
}

fn is_linux_or_freebsd(ctx: &RecipeContext) -> bool {
    matches!(ctx.settings().os, Some(Os::Linux | Os::FreeBsd))
}

fn is_apple_os(ctx: &RecipeContext) -> bool {
    ctx.settings().os.is_some_and(Os::is_apple)
}

/// C++ runtime a static C++ library drags into its consumers
fn stdcpp_library(ctx: &RecipeContext) -> Option<&'static str> {
    match ctx.settings().libcxx()? {
        LibCxx::Libstdcxx | LibCxx::Libstdcxx11 => Some("stdc++"),
        LibCxx::Libcxx => Some("c++"),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use cpkg_recipe::{resolve_configuration, Recipe, RecipeContext};
    use cpkg_types::{
        Arch, BuildType, Compiler, CompilerKind, LibCxx, MsvcRuntime, Os, Reference, Settings,
        Version,
    };

    pub fn gcc(version: &str) -> Settings {
        Settings::new()
            .with_os(Os::Linux)
            .with_arch(Arch::X86_64)
            .with_compiler(
                Compiler::new(CompilerKind::Gcc, Version::parse(version).unwrap())
                    .with_libcxx(LibCxx::Libstdcxx11),
            )
            .with_build_type(BuildType::Release)
    }

    pub fn msvc() -> Settings {
        Settings::new()
            .with_os(Os::Windows)
            .with_arch(Arch::X86_64)
            .with_compiler(
                Compiler::new(CompilerKind::Msvc, Version::parse("193").unwrap())
                    .with_runtime(MsvcRuntime::Dynamic),
            )
            .with_build_type(BuildType::Release)
    }

    pub fn apple_clang() -> Settings {
        Settings::new()
            .with_os(Os::Macos)
            .with_arch(Arch::Armv8)
            .with_compiler(
                Compiler::new(CompilerKind::AppleClang, Version::parse("15").unwrap())
                    .with_libcxx(LibCxx::Libcxx),
            )
            .with_build_type(BuildType::Release)
    }

    /// Context after config-options and configure, without dependencies
    pub fn resolve(
        recipe: &dyn Recipe,
        reference: &str,
        profile: &Settings,
        overrides: &[(&str, &str)],
    ) -> Result<RecipeContext, cpkg_errors::RecipeError> {
        let overrides: Vec<(String, String)> = overrides
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let reference = Reference::parse(reference).unwrap();
        resolve_configuration(recipe, &reference, profile, &overrides).map(|r| r.context)
    }
}
