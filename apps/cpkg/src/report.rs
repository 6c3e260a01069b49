//! Command results and their serializable shapes

use cpkg_builder::{CacheEntry, CreateOutcome, Evaluation, PackageMetadata};
use cpkg_config::Config;
use cpkg_recipe::Recipe;
use cpkg_types::Reference;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Result of a command, rendered as a table or as JSON
#[derive(Debug)]
pub enum CommandResult {
    Recipes(Vec<RecipeSummary>),
    Recipe(RecipeDetails),
    Validation(ValidationReport),
    Created(CreateReport),
    Packages(Vec<CachedPackage>),
    Config(Box<Config>),
}

impl CommandResult {
    /// Pretty JSON for `--json`
    ///
    /// # Errors
    /// Returns an error if a value cannot be serialized.
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Self::Recipes(recipes) => serde_json::to_string_pretty(recipes),
            Self::Recipe(details) => serde_json::to_string_pretty(details),
            Self::Validation(report) => serde_json::to_string_pretty(report),
            Self::Created(report) => serde_json::to_string_pretty(report),
            Self::Packages(packages) => serde_json::to_string_pretty(packages),
            Self::Config(config) => serde_json::to_string_pretty(config),
        }
    }
}

/// One line of `cpkg list`
#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub name: String,
    pub package_type: String,
    pub description: String,
    pub versions: Vec<String>,
}

impl RecipeSummary {
    pub fn new(recipe: &dyn Recipe) -> Self {
        let descriptor = recipe.descriptor();
        Self {
            name: descriptor.name.to_string(),
            package_type: descriptor.package_type.to_string(),
            description: descriptor.description.to_string(),
            versions: versions(recipe),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionSummary {
    pub name: String,
    pub values: String,
    pub default: String,
}

/// Everything `cpkg inspect` shows about a recipe
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetails {
    pub name: String,
    pub description: String,
    pub package_type: String,
    pub licenses: Vec<String>,
    pub homepage: String,
    pub topics: Vec<String>,
    pub settings: Vec<String>,
    pub options: Vec<OptionSummary>,
    pub versions: Vec<String>,
}

impl RecipeDetails {
    pub fn new(recipe: &dyn Recipe) -> Self {
        let descriptor = recipe.descriptor();
        let owned = |items: &[&str]| items.iter().map(ToString::to_string).collect();
        Self {
            name: descriptor.name.to_string(),
            description: descriptor.description.to_string(),
            package_type: descriptor.package_type.to_string(),
            licenses: owned(descriptor.licenses),
            homepage: descriptor.homepage.to_string(),
            topics: owned(descriptor.topics),
            settings: descriptor
                .settings
                .iter()
                .map(ToString::to_string)
                .collect(),
            options: descriptor
                .options
                .iter()
                .map(|def| OptionSummary {
                    name: def.key.to_string(),
                    values: def.domain.to_string(),
                    default: def.default.to_string(),
                })
                .collect(),
            versions: versions(recipe),
        }
    }
}

/// Outcome of `cpkg validate`
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub reference: Reference,
    pub package_id: String,
    pub settings: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
    pub removed_options: Vec<String>,
    pub requirements: Vec<String>,
    pub advisories: Vec<String>,
}

impl From<&Evaluation> for ValidationReport {
    fn from(evaluation: &Evaluation) -> Self {
        let ctx = &evaluation.context;
        Self {
            reference: ctx.reference().clone(),
            package_id: evaluation.package_id.clone(),
            settings: ctx.settings().to_pairs(),
            options: ctx.options().to_pairs(),
            removed_options: evaluation
                .removed_options
                .iter()
                .map(ToString::to_string)
                .collect(),
            requirements: evaluation
                .requirements
                .iter()
                .map(ToString::to_string)
                .collect(),
            advisories: evaluation.advisories.iter().map(str::to_string).collect(),
        }
    }
}

/// Outcome of `cpkg create`
#[derive(Debug, Clone, Serialize)]
pub struct CreateReport {
    pub reference: Reference,
    pub package_id: String,
    pub path: PathBuf,
    pub reused: bool,
    pub advisories: Vec<String>,
}

impl From<CreateOutcome> for CreateReport {
    fn from(outcome: CreateOutcome) -> Self {
        Self {
            reference: outcome.reference,
            package_id: outcome.package_id,
            path: outcome.path,
            reused: outcome.reused,
            advisories: outcome.advisories.into_iter().collect(),
        }
    }
}

/// A package published in the cache
#[derive(Debug, Clone, Serialize)]
pub struct CachedPackage {
    #[serde(flatten)]
    pub metadata: PackageMetadata,
    pub path: PathBuf,
}

impl From<CacheEntry> for CachedPackage {
    fn from(entry: CacheEntry) -> Self {
        Self {
            path: entry.package_folder(),
            metadata: entry.metadata,
        }
    }
}

fn versions(recipe: &dyn Recipe) -> Vec<String> {
    recipe.sources().versions().map(ToString::to_string).collect()
}
