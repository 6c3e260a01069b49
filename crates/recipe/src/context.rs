//! Immutable per-phase view of a recipe instance

use crate::info::PackageInfo;
use crate::layout::Layout;
use crate::requirements::RequirementKind;
use cpkg_types::{OptionKey, Options, Reference, Settings, Version};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A dependency resolved against the package cache
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyInfo {
    pub reference: Reference,
    pub kind: RequirementKind,
    pub options: Options,
    pub info: PackageInfo,
    /// Absolute package root of the cached artifact
    pub package_folder: PathBuf,
}

impl DependencyInfo {
    #[must_use]
    pub fn new(reference: Reference, kind: RequirementKind) -> Self {
        Self {
            reference,
            kind,
            options: Options::new(),
            info: PackageInfo::default(),
            package_folder: PathBuf::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_info(mut self, info: PackageInfo) -> Self {
        self.info = info;
        self
    }

    #[must_use]
    pub fn with_package_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.package_folder = folder.into();
        self
    }

    /// Whether a boolean option of the dependency is enabled
    #[must_use]
    pub fn option_enabled(&self, name: &str) -> bool {
        self.options.is_enabled(&OptionKey::owned(name))
    }
}

/// Resolved dependencies, split by kind and keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dependencies {
    host: BTreeMap<String, DependencyInfo>,
    build: BTreeMap<String, DependencyInfo>,
}

impl Dependencies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, dependency: DependencyInfo) -> Self {
        let name = dependency.reference.name.clone();
        match dependency.kind {
            RequirementKind::Host => self.host.insert(name, dependency),
            RequirementKind::Tool => self.build.insert(name, dependency),
        };
        self
    }

    #[must_use]
    pub fn host(&self, name: &str) -> Option<&DependencyInfo> {
        self.host.get(name)
    }

    #[must_use]
    pub fn build(&self, name: &str) -> Option<&DependencyInfo> {
        self.build.get(name)
    }

    pub fn host_iter(&self) -> impl Iterator<Item = &DependencyInfo> {
        self.host.values()
    }

    pub fn build_iter(&self) -> impl Iterator<Item = &DependencyInfo> {
        self.build.values()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.host.is_empty() && self.build.is_empty()
    }
}

/// Everything a phase may look at
///
/// Contexts are never mutated in place. The engine derives the next context
/// from the previous one plus the delta a phase returned.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeContext {
    reference: Reference,
    settings: Settings,
    options: Options,
    layout: Layout,
    dependencies: Dependencies,
}

impl RecipeContext {
    #[must_use]
    pub fn new(reference: Reference, settings: Settings, options: Options) -> Self {
        Self {
            reference,
            settings,
            options,
            layout: Layout::default(),
            dependencies: Dependencies::default(),
        }
    }

    #[must_use]
    pub fn with_settings(&self, settings: Settings) -> Self {
        Self {
            settings,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_options(&self, options: Options) -> Self {
        Self {
            options,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_layout(&self, layout: Layout) -> Self {
        Self {
            layout,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_dependencies(&self, dependencies: Dependencies) -> Self {
        Self {
            dependencies,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.reference.name
    }

    #[must_use]
    pub fn version(&self) -> &Version {
        &self.reference.version
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    /// Shorthand for the `shared` option
    #[must_use]
    pub fn shared(&self) -> bool {
        self.options.shared()
    }

    /// Whether the recipe version is at least `version`
    #[must_use]
    pub fn version_at_least(&self, version: &str) -> bool {
        Version::parse(version).is_ok_and(|v| self.reference.version >= v)
    }
}
