#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Recipe lifecycle contract
//!
//! A recipe is a typed description of how one third-party C/C++ library is
//! fetched, configured, built and packaged. The engine drives every recipe
//! through the same ten phases in a fixed order:
//!
//! 1. config-options
//! 2. configure
//! 3. layout
//! 4. requirements / build-requirements
//! 5. validate
//! 6. source
//! 7. generate
//! 8. build
//! 9. package
//! 10. package-info
//!
//! Each phase receives an immutable [`RecipeContext`] and returns a value:
//! a [`ConfigDelta`], a [`Layout`], a plan, or metadata. Nothing in this
//! crate performs I/O; the builder crate executes the plans.

pub mod context;
pub mod delta;
pub mod descriptor;
pub mod info;
pub mod layout;
pub mod package;
pub mod phase;
pub mod requirements;
pub mod resolve;
pub mod source;
pub mod strategy;
pub mod validate;

pub use context::{Dependencies, DependencyInfo, RecipeContext};
pub use delta::ConfigDelta;
pub use descriptor::RecipeDescriptor;
pub use info::{ConfValue, CppInfo, EnvAction, PackageIdInfo, PackageInfo};
pub use layout::{basic_layout, cmake_layout, flat_layout, Layout};
pub use package::{CopySpec, Origin, PackagePlan, PackageStep};
pub use phase::{LifecycleState, Phase, PhaseTracker};
pub use requirements::{Requirement, RequirementKind, Traits};
pub use resolve::{resolve_configuration, ResolvedConfiguration};
pub use source::{FileEdit, Patch, SourcePlan, SourceRef, SourceSpec, SourceTable};
pub use strategy::{
    AutotoolsBuild, BuildStrategy, CMakeBuild, CMakeValue, CompiledBuild, DepsGenerator,
    MakeBuild, MsBuildProject, ToolCommand, ToolConfig,
};
pub use validate::{Advisories, CompilerMinimums};

use cpkg_errors::RecipeError;

/// The contract every recipe implements
///
/// Only [`Recipe::descriptor`], [`Recipe::sources`], [`Recipe::strategy`] and
/// [`Recipe::package`] are mandatory. Every other phase has a neutral default:
/// no deltas, a `src` basic layout, no requirements and no validation
/// constraints.
pub trait Recipe: Send + Sync {
    /// Static identity, metadata, declared settings and option schema
    fn descriptor(&self) -> &RecipeDescriptor;

    /// Per-version source archives and patches
    fn sources(&self) -> &SourceTable;

    /// Phase 1: drop options that do not apply to the settings or version
    fn config_options(&self, _ctx: &RecipeContext) -> ConfigDelta {
        ConfigDelta::none()
    }

    /// Phase 2: drop options and settings that other option values make irrelevant
    ///
    /// # Errors
    /// Returns `RecipeError::InvalidConfiguration` for combinations the recipe
    /// rejects before any dependency is known.
    fn configure(&self, _ctx: &RecipeContext) -> Result<ConfigDelta, RecipeError> {
        Ok(ConfigDelta::none())
    }

    /// Phase 3: relative source, build and generators folders
    fn layout(&self, ctx: &RecipeContext) -> Layout {
        basic_layout(ctx, "src")
    }

    /// Phase 4: host dependencies
    ///
    /// # Errors
    /// Returns an error if a declared version range does not parse.
    fn requirements(&self, _ctx: &RecipeContext) -> Result<Vec<Requirement>, RecipeError> {
        Ok(Vec::new())
    }

    /// Phase 4: build-time tools
    ///
    /// # Errors
    /// Returns an error if a declared version range does not parse.
    fn build_requirements(&self, _ctx: &RecipeContext) -> Result<Vec<Requirement>, RecipeError> {
        Ok(Vec::new())
    }

    /// Phase 5: reject unsupported configurations
    ///
    /// Must not perform I/O. Non-fatal findings are returned as advisories.
    ///
    /// # Errors
    /// Returns `RecipeError::InvalidConfiguration` for rejected combinations.
    fn validate(&self, _ctx: &RecipeContext) -> Result<Advisories, RecipeError> {
        Ok(Advisories::new())
    }

    /// Phase 6: which archive to fetch and which patches to apply
    ///
    /// # Errors
    /// Returns an error if there is no source for the version or platform.
    fn source(&self, ctx: &RecipeContext) -> Result<SourcePlan, RecipeError> {
        self.sources().plan(ctx)
    }

    /// Phases 7 and 8: how the sources turn into binaries
    fn strategy(&self, ctx: &RecipeContext) -> BuildStrategy;

    /// Phase 9: what lands in the package root
    fn package(&self, ctx: &RecipeContext) -> PackagePlan;

    /// Phase 10: metadata published for consumers
    fn package_info(&self, _ctx: &RecipeContext) -> PackageInfo {
        PackageInfo::default()
    }

    /// Erase inputs that do not affect binary compatibility
    fn package_id(&self, _ctx: &RecipeContext, id: PackageIdInfo) -> PackageIdInfo {
        id
    }
}
