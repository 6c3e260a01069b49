//! Folder layouts relative to the per-build working directory

use crate::context::RecipeContext;
use cpkg_types::BuildType;
use std::path::PathBuf;

/// Relative folders used during a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub source: PathBuf,
    pub build: PathBuf,
    pub generators: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            source: PathBuf::from("."),
            build: PathBuf::from("."),
            generators: PathBuf::from("generators"),
        }
    }
}

fn build_type_or_release(ctx: &RecipeContext) -> BuildType {
    ctx.settings().build_type.unwrap_or(BuildType::Release)
}

/// Sources under `src`, one build folder per build type
#[must_use]
pub fn basic_layout(ctx: &RecipeContext, src: &str) -> Layout {
    let build = PathBuf::from(format!(
        "build-{}",
        build_type_or_release(ctx).as_str().to_ascii_lowercase()
    ));
    Layout {
        source: PathBuf::from(src),
        generators: build.join("cpkg"),
        build,
    }
}

/// CMake layout; multi-config generators (MSVC) share one build folder
#[must_use]
pub fn cmake_layout(ctx: &RecipeContext, src: &str) -> Layout {
    if ctx.settings().is_msvc() {
        Layout {
            source: PathBuf::from(src),
            build: PathBuf::from("build"),
            generators: PathBuf::from("build").join("generators"),
        }
    } else {
        let build = PathBuf::from("build").join(build_type_or_release(ctx).as_str());
        Layout {
            source: PathBuf::from(src),
            generators: build.join("generators"),
            build,
        }
    }
}

/// Everything at the working directory root, as prebuilt binaries use
#[must_use]
pub fn flat_layout() -> Layout {
    Layout::default()
}
