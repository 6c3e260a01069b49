//! dlpack: a single C header, packaged as-is

use cpkg_errors::RecipeError;
use cpkg_recipe::{
    BuildStrategy, CopySpec, Origin, PackageIdInfo, PackageInfo, PackagePlan, Recipe,
    RecipeContext, RecipeDescriptor, SourceTable,
};
use cpkg_types::PackageType;

#[derive(Debug, Clone)]
pub struct Dlpack {
    descriptor: RecipeDescriptor,
    sources: SourceTable,
}

impl Dlpack {
    /// # Errors
    /// Returns an error if the embedded source table is invalid.
    pub fn new() -> Result<Self, RecipeError> {
        Ok(Self {
            descriptor: RecipeDescriptor::new("dlpack", PackageType::HeaderLibrary)
                .description(
                    "RFC for common in-memory tensor structure and operator interface for deep learning system",
                )
                .licenses(&["Apache-2.0"])
                .homepage("https://github.com/dmlc/dlpack")
                .topics(&["deep-learning", "operator", "tensor", "header-only"]),
            sources: crate::sources("dlpack", include_str!("../data/dlpack.toml"))?,
        })
    }
}

impl Recipe for Dlpack {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn sources(&self) -> &SourceTable {
        &self.sources
    }

    fn strategy(&self, _ctx: &RecipeContext) -> BuildStrategy {
        BuildStrategy::HeaderOnly
    }

    fn package(&self, _ctx: &RecipeContext) -> PackagePlan {
        PackagePlan::new().license("LICENSE").copy(
            CopySpec::new("*.h")
                .from(Origin::Source, "include")
                .to("include"),
        )
    }

    fn package_info(&self, _ctx: &RecipeContext) -> PackageInfo {
        PackageInfo::header_only()
    }

    fn package_id(&self, _ctx: &RecipeContext, id: PackageIdInfo) -> PackageIdInfo {
        id.clear()
    }
}
