//! Microsoft's Guidelines Support Library, header-only

use cpkg_errors::RecipeError;
use cpkg_recipe::validate::{check_min_compiler, check_min_cppstd, check_min_vs};
use cpkg_recipe::{
    Advisories, BuildStrategy, CompilerMinimums, ConfigDelta, CopySpec, CppInfo, Origin,
    PackageIdInfo, PackageInfo, PackagePlan, Recipe, RecipeContext, RecipeDescriptor,
    SourceTable,
};
use cpkg_types::{CompilerKind, CppStd, OptionDef, OptionKey, OptionSchema, PackageType};

const ON_CONTRACT_VIOLATION: OptionKey = OptionKey::new("on_contract_violation");

const MINIMUM_CPPSTD: u16 = 14;

const COMPILER_MINIMUMS: CompilerMinimums = CompilerMinimums(&[
    (CompilerKind::Gcc, "5"),
    (CompilerKind::Clang, "3.4"),
    (CompilerKind::AppleClang, "3.4"),
]);

/// Define selecting the contract-violation policy of GSL 2.x
fn contract_define(policy: &str) -> Option<&'static str> {
    match policy {
        "terminate" => Some("GSL_TERMINATE_ON_CONTRACT_VIOLATION"),
        "throw" => Some("GSL_THROW_ON_CONTRACT_VIOLATION"),
        "unenforced" => Some("GSL_UNENFORCED_ON_CONTRACT_VIOLATION"),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct MsGsl {
    descriptor: RecipeDescriptor,
    sources: SourceTable,
}

impl MsGsl {
    /// # Errors
    /// Returns an error if the embedded source table is invalid.
    pub fn new() -> Result<Self, RecipeError> {
        let options = OptionSchema::new(vec![OptionDef::choice(
            ON_CONTRACT_VIOLATION,
            &["terminate", "throw", "unenforced"],
            "terminate",
        )])?;
        Ok(Self {
            descriptor: RecipeDescriptor::new("ms-gsl", PackageType::HeaderLibrary)
                .description("Microsoft's implementation of the Guidelines Support Library")
                .licenses(&["MIT"])
                .homepage("https://github.com/microsoft/GSL")
                .topics(&["gsl", "guidelines", "core", "span", "header-only"])
                .options(options),
            sources: crate::sources("ms-gsl", include_str!("../data/ms-gsl.toml"))?,
        })
    }
}

impl Recipe for MsGsl {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn sources(&self) -> &SourceTable {
        &self.sources
    }

    fn config_options(&self, ctx: &RecipeContext) -> ConfigDelta {
        // 3.0 dropped the configurable policy
        if ctx.version_at_least("3.0.0") {
            ConfigDelta::none().remove_option(ON_CONTRACT_VIOLATION)
        } else {
            ConfigDelta::none()
        }
    }

    fn validate(&self, ctx: &RecipeContext) -> Result<Advisories, RecipeError> {
        check_min_cppstd(ctx, CppStd::new(MINIMUM_CPPSTD))?;
        check_min_vs(ctx, 190)?;
        if ctx.settings().is_msvc() {
            return Ok(Advisories::new());
        }
        check_min_compiler(ctx, COMPILER_MINIMUMS, &format!("C++{MINIMUM_CPPSTD}"))
    }

    fn strategy(&self, _ctx: &RecipeContext) -> BuildStrategy {
        BuildStrategy::HeaderOnly
    }

    fn package(&self, _ctx: &RecipeContext) -> PackagePlan {
        PackagePlan::new().license("LICENSE").copy(
            CopySpec::new("*")
                .from(Origin::Source, "include")
                .to("include"),
        )
    }

    fn package_info(&self, ctx: &RecipeContext) -> PackageInfo {
        let mut info = PackageInfo::header_only();
        info.cpp.set_property("cmake_file_name", "Microsoft.GSL");
        info.cpp
            .set_property("cmake_target_name", "Microsoft.GSL::GSL");

        if let Some(define) = ctx
            .options()
            .choice(&ON_CONTRACT_VIOLATION)
            .and_then(contract_define)
        {
            let mut component = CppInfo {
                defines: vec![define.to_string()],
                ..CppInfo::default()
            };
            component.libdirs.clear();
            component.bindirs.clear();
            info.components.insert("_ms-gsl".to_string(), component);
        }
        info
    }

    fn package_id(&self, _ctx: &RecipeContext, id: PackageIdInfo) -> PackageIdInfo {
        id.clear()
    }
}
