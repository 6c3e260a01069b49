//! Static recipe identity and metadata

use cpkg_types::{OptionSchema, PackageType, SettingKey};

/// What a recipe is, independent of any configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub licenses: &'static [&'static str],
    pub homepage: &'static str,
    pub topics: &'static [&'static str],
    pub package_type: PackageType,
    /// Setting dimensions the recipe reads; everything else is dropped
    pub settings: &'static [SettingKey],
    pub options: OptionSchema,
}

impl RecipeDescriptor {
    /// A descriptor with the standard four settings and no options
    #[must_use]
    pub fn new(name: &'static str, package_type: PackageType) -> Self {
        Self {
            name,
            description: "",
            licenses: &[],
            homepage: "",
            topics: &[],
            package_type,
            settings: SettingKey::STANDARD,
            options: OptionSchema::empty(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn licenses(mut self, licenses: &'static [&'static str]) -> Self {
        self.licenses = licenses;
        self
    }

    #[must_use]
    pub fn homepage(mut self, homepage: &'static str) -> Self {
        self.homepage = homepage;
        self
    }

    #[must_use]
    pub fn topics(mut self, topics: &'static [&'static str]) -> Self {
        self.topics = topics;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: &'static [SettingKey]) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn options(mut self, options: OptionSchema) -> Self {
        self.options = options;
        self
    }
}
