//! Lookup of recipes by name

use crate::{CMake, Dlpack, Libharu, Libsass, Mold, MsGsl, NativeFileDialog, Tar, Upx};
use cpkg_errors::RecipeError;
use cpkg_recipe::Recipe;
use std::collections::BTreeMap;

/// Registry of available recipes
pub struct RecipeRegistry {
    recipes: BTreeMap<&'static str, Box<dyn Recipe>>,
}

impl std::fmt::Debug for RecipeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.recipes.keys()).finish()
    }
}

impl RecipeRegistry {
    /// An empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            recipes: BTreeMap::new(),
        }
    }

    /// Every recipe shipped with cpkg
    ///
    /// # Errors
    /// Returns `RecipeError::Definition` if an embedded source table is invalid.
    pub fn builtin() -> Result<Self, RecipeError> {
        Ok(Self::new()
            .with(CMake::new()?)
            .with(Dlpack::new()?)
            .with(Libharu::new()?)
            .with(Libsass::new()?)
            .with(Mold::new()?)
            .with(MsGsl::new()?)
            .with(NativeFileDialog::new()?)
            .with(Tar::new()?)
            .with(Upx::new()?))
    }

    /// Add a recipe, replacing any recipe with the same name
    #[must_use]
    pub fn with(mut self, recipe: impl Recipe + 'static) -> Self {
        self.recipes
            .insert(recipe.descriptor().name, Box::new(recipe));
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Recipe> {
        self.recipes.get(name).map(AsRef::as_ref)
    }

    /// Look up a recipe, failing with `UnknownRecipe`
    ///
    /// # Errors
    /// Returns `RecipeError::UnknownRecipe` if no recipe has this name.
    pub fn require(&self, name: &str) -> Result<&dyn Recipe, RecipeError> {
        self.get(name).ok_or_else(|| RecipeError::UnknownRecipe {
            name: name.to_string(),
        })
    }

    /// Recipes in name order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Recipe> {
        self.recipes.values().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

impl Default for RecipeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_recipes_load() {
        let registry = RecipeRegistry::builtin().unwrap();
        let names: Vec<_> = registry.iter().map(|r| r.descriptor().name).collect();
        assert_eq!(
            names,
            [
                "cmake",
                "dlpack",
                "libharu",
                "libsass",
                "mold",
                "ms-gsl",
                "nativefiledialog",
                "tar",
                "upx"
            ]
        );
        for recipe in registry.iter() {
            assert!(
                recipe.sources().versions().next().is_some(),
                "{} has no versions",
                recipe.descriptor().name
            );
        }
    }

    #[test]
    fn unknown_names_are_reported() {
        let registry = RecipeRegistry::builtin().unwrap();
        assert!(registry.get("ms-gsl").is_some());
        assert!(matches!(
            registry.require("boost"),
            Err(RecipeError::UnknownRecipe { .. })
        ));
    }

    #[test]
    fn metadata_is_published_as_upstream_declares_it() {
        let registry = RecipeRegistry::builtin().unwrap();
        let descriptor = |name| registry.require(name).unwrap().descriptor().clone();

        assert_eq!(descriptor("tar").licenses, ["GPL-3-or-later"]);
        let mold = descriptor("mold");
        assert_eq!(mold.licenses, ["AGPL-3.0"]);
        assert!(mold.description.ends_with("several times faster than the LLVM lld linker."));
        assert_eq!(descriptor("libsass").topics, ["Sass", "compiler"]);
        assert_eq!(descriptor("upx").topics.last(), Some(&"footprintt"));
    }
}
