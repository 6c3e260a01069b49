//! Contract-level behaviour shared by every recipe

use cpkg_errors::RecipeError;
use cpkg_hash::Checksum;
use cpkg_recipe::validate::{check_min_compiler, invalid};
use cpkg_recipe::{
    resolve_configuration, Advisories, BuildStrategy, CompilerMinimums, ConfigDelta, CopySpec,
    Origin, PackageIdInfo, PackageInfo, PackagePlan, Recipe, RecipeContext,
    RecipeDescriptor, SourceRef, SourceSpec, SourceTable,
};
use cpkg_types::{
    Compiler, CompilerKind, OptionDef, OptionKey, OptionSchema, Os, PackageType, Reference,
    Settings, Version,
};

const SHA: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
const CHECKS: OptionKey = OptionKey::new("checks");

struct Guarded {
    descriptor: RecipeDescriptor,
    sources: SourceTable,
}

impl Guarded {
    fn new() -> Self {
        let schema = OptionSchema::new(vec![OptionDef::choice(
            CHECKS,
            &["terminate", "throw", "unenforced"],
            "terminate",
        )])
        .unwrap();
        let source = SourceSpec::Archive(SourceRef::new(
            "https://example.invalid/guarded.tar.gz",
            Checksum::sha256(SHA),
        ));
        Self {
            descriptor: RecipeDescriptor::new("guarded", PackageType::HeaderLibrary)
                .options(schema),
            sources: SourceTable::new()
                .with_source(Version::parse("2.1.0").unwrap(), source.clone())
                .with_source(Version::parse("3.1.0").unwrap(), source),
        }
    }
}

impl Recipe for Guarded {
    fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    fn sources(&self) -> &SourceTable {
        &self.sources
    }

    fn config_options(&self, ctx: &RecipeContext) -> ConfigDelta {
        if ctx.version_at_least("3.0.0") {
            ConfigDelta::none().remove_option(CHECKS)
        } else {
            ConfigDelta::none()
        }
    }

    fn validate(&self, ctx: &RecipeContext) -> Result<Advisories, RecipeError> {
        if ctx.settings().os == Some(Os::Android) {
            return Err(invalid(ctx, "android is not supported"));
        }
        check_min_compiler(
            ctx,
            CompilerMinimums(&[(CompilerKind::Gcc, "5"), (CompilerKind::Clang, "3.4")]),
            "C++14",
        )
    }

    fn strategy(&self, _ctx: &RecipeContext) -> BuildStrategy {
        BuildStrategy::HeaderOnly
    }

    fn package(&self, _ctx: &RecipeContext) -> PackagePlan {
        PackagePlan::new()
            .license("LICENSE")
            .copy(CopySpec::new("*").from(Origin::Source, "include").to("include"))
    }

    fn package_info(&self, _ctx: &RecipeContext) -> PackageInfo {
        PackageInfo::header_only()
    }

    fn package_id(&self, _ctx: &RecipeContext, id: PackageIdInfo) -> PackageIdInfo {
        id.clear()
    }
}

fn gcc(version: &str) -> Settings {
    Settings::new()
        .with_os(Os::Linux)
        .with_compiler(Compiler::new(CompilerKind::Gcc, Version::parse(version).unwrap()))
}

#[test]
fn removed_options_never_reach_later_phases() {
    let recipe = Guarded::new();
    let resolved = resolve_configuration(
        &recipe,
        &Reference::parse("guarded/3.1.0").unwrap(),
        &gcc("12"),
        &[("checks".into(), "throw".into())],
    )
    .unwrap();
    assert!(!resolved.context.options().contains(&CHECKS));
    assert_eq!(resolved.removed_options, vec![CHECKS]);
    assert_eq!(resolved.advisories.len(), 1);

    let older = resolve_configuration(
        &recipe,
        &Reference::parse("guarded/2.1.0").unwrap(),
        &gcc("12"),
        &[("checks".into(), "throw".into())],
    )
    .unwrap();
    assert_eq!(older.context.options().choice(&CHECKS), Some("throw"));
}

#[test]
fn validate_is_repeatable() {
    let recipe = Guarded::new();
    let resolved = resolve_configuration(
        &recipe,
        &Reference::parse("guarded/3.1.0").unwrap(),
        &gcc("4.9"),
        &[],
    )
    .unwrap();
    let first = recipe.validate(&resolved.context);
    let second = recipe.validate(&resolved.context);
    assert!(matches!(first, Err(RecipeError::InvalidConfiguration { .. })));
    assert_eq!(first.unwrap_err().to_string(), second.unwrap_err().to_string());
}

#[test]
fn cleared_package_ids_ignore_the_profile() {
    let recipe = Guarded::new();
    let reference = Reference::parse("guarded/2.1.0").unwrap();
    let ids: Vec<String> = ["9", "13"]
        .into_iter()
        .map(|version| {
            let resolved = resolve_configuration(&recipe, &reference, &gcc(version), &[]).unwrap();
            let ctx = &resolved.context;
            let id = PackageIdInfo::new(ctx.settings(), ctx.options(), Vec::new());
            recipe.package_id(ctx, id).package_id()
        })
        .collect();
    assert_eq!(ids[0], ids[1]);
}
