//! Option and settings resolution (phases 1 and 2)

use crate::context::RecipeContext;
use crate::delta::ConfigDelta;
use crate::validate::Advisories;
use crate::Recipe;
use cpkg_errors::RecipeError;
use cpkg_types::{OptionKey, Options, Reference, Settings};

/// Final configuration after config-options, user overrides and configure
#[derive(Debug, Clone)]
pub struct ResolvedConfiguration {
    pub context: RecipeContext,
    /// Options removed by config-options or configure, in removal order
    pub removed_options: Vec<OptionKey>,
    pub advisories: Advisories,
}

fn apply_delta(
    settings: &Settings,
    options: &Options,
    delta: &ConfigDelta,
) -> (Settings, Options) {
    let settings = delta
        .remove_settings
        .iter()
        .fold(settings.clone(), |acc, key| acc.without(*key));
    (settings, options.without(&delta.remove_options))
}

/// Resolve the configuration of `recipe` for `reference`
///
/// 1. Restrict `profile` to the settings the recipe declares.
/// 2. Run config-options on schema defaults and drop the options it removes.
/// 3. Apply `overrides`: unknown names and out-of-domain values are errors,
///    overrides of options removed in step 2 are ignored with an advisory.
/// 4. Run configure and drop what it removes.
///
/// # Errors
/// Returns `UnknownVersion` if the recipe has no sources for the version,
/// option errors from step 3, or the error raised by configure.
pub fn resolve_configuration(
    recipe: &dyn Recipe,
    reference: &Reference,
    profile: &Settings,
    overrides: &[(String, String)],
) -> Result<ResolvedConfiguration, RecipeError> {
    let descriptor = recipe.descriptor();
    if !recipe.sources().contains(&reference.version) {
        return Err(RecipeError::UnknownVersion {
            name: reference.name.clone(),
            version: reference.version.to_string(),
        });
    }

    let schema = &descriptor.options;
    let settings = profile.restricted_to(descriptor.settings);
    let initial = RecipeContext::new(reference.clone(), settings, schema.defaults());

    let mut advisories = Advisories::new();
    let config_options = recipe.config_options(&initial);
    let (settings, mut options) =
        apply_delta(initial.settings(), initial.options(), &config_options);
    let mut removed_options = config_options.remove_options.clone();

    for (name, value) in overrides {
        let def = schema
            .find(name)
            .ok_or_else(|| RecipeError::UnknownOption {
                recipe: descriptor.name.to_string(),
                option: name.clone(),
            })?;
        if removed_options.contains(&def.key) {
            advisories.push(format!(
                "option '{name}' does not apply to {reference} with these settings; ignoring {name}={value}"
            ));
            continue;
        }
        let parsed = def.domain.parse(&def.key, value)?;
        options = options.with(def.key.clone(), parsed);
    }

    let configured = initial.with_settings(settings).with_options(options);
    let configure = recipe.configure(&configured)?;
    let (settings, options) =
        apply_delta(configured.settings(), configured.options(), &configure);
    for key in configure.remove_options {
        if !removed_options.contains(&key) {
            removed_options.push(key);
        }
    }

    Ok(ResolvedConfiguration {
        context: configured.with_settings(settings).with_options(options),
        removed_options,
        advisories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::RecipeDescriptor;
    use crate::info::PackageInfo;
    use crate::package::PackagePlan;
    use crate::source::{SourceRef, SourceSpec, SourceTable};
    use crate::strategy::BuildStrategy;
    use cpkg_hash::Checksum;
    use cpkg_types::{
        Compiler, CompilerKind, CppStd, OptionSchema, Os, PackageType, SettingKey, Version,
    };

    struct Library {
        descriptor: RecipeDescriptor,
        sources: SourceTable,
    }

    impl Library {
        fn new() -> Self {
            let sha = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
            Self {
                descriptor: RecipeDescriptor::new("libharu", PackageType::Library)
                    .options(OptionSchema::new(OptionSchema::library_defs()).unwrap()),
                sources: SourceTable::new().with_source(
                    Version::parse("2.4.3").unwrap(),
                    SourceSpec::Archive(SourceRef::new(
                        "https://example.invalid/libharu.tar.gz",
                        Checksum::sha256(sha),
                    )),
                ),
            }
        }
    }

    impl Recipe for Library {
        fn descriptor(&self) -> &RecipeDescriptor {
            &self.descriptor
        }

        fn sources(&self) -> &SourceTable {
            &self.sources
        }

        fn config_options(&self, ctx: &RecipeContext) -> ConfigDelta {
            ConfigDelta::none().fpic_unless_windows(ctx)
        }

        fn configure(&self, ctx: &RecipeContext) -> Result<ConfigDelta, RecipeError> {
            Ok(ConfigDelta::none().fpic_unless_static(ctx).c_only())
        }

        fn strategy(&self, _ctx: &RecipeContext) -> BuildStrategy {
            BuildStrategy::HeaderOnly
        }

        fn package(&self, _ctx: &RecipeContext) -> PackagePlan {
            PackagePlan::new()
        }

        fn package_info(&self, _ctx: &RecipeContext) -> PackageInfo {
            PackageInfo::default()
        }
    }

    fn profile(os: Os) -> Settings {
        Settings::new().with_os(os).with_compiler(
            Compiler::new(CompilerKind::Gcc, Version::parse("12").unwrap())
                .with_cppstd(CppStd::new(17)),
        )
    }

    fn reference() -> Reference {
        Reference::parse("libharu/2.4.3").unwrap()
    }

    fn overrides(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn shared_removes_fpic() {
        let resolved = resolve_configuration(
            &Library::new(),
            &reference(),
            &profile(Os::Linux),
            &overrides(&[("shared", "True")]),
        )
        .unwrap();
        let options = resolved.context.options();
        assert!(options.shared());
        assert!(!options.contains(&OptionKey::FPIC));
        assert_eq!(resolved.removed_options, vec![OptionKey::FPIC]);
        assert!(!resolved.context.settings().has(SettingKey::CompilerCppstd));
    }

    #[test]
    fn override_of_removed_option_is_ignored_with_advisory() {
        let resolved = resolve_configuration(
            &Library::new(),
            &reference(),
            &profile(Os::Windows),
            &overrides(&[("fPIC", "True")]),
        )
        .unwrap();
        assert!(!resolved.context.options().contains(&OptionKey::FPIC));
        assert_eq!(resolved.advisories.len(), 1);
    }

    #[test]
    fn unknown_options_and_values_are_errors() {
        let recipe = Library::new();
        assert!(matches!(
            resolve_configuration(
                &recipe,
                &reference(),
                &profile(Os::Linux),
                &overrides(&[("with_zlib", "True")])
            ),
            Err(RecipeError::UnknownOption { .. })
        ));
        assert!(matches!(
            resolve_configuration(
                &recipe,
                &reference(),
                &profile(Os::Linux),
                &overrides(&[("shared", "sometimes")])
            ),
            Err(RecipeError::InvalidOptionValue { .. })
        ));
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let err = resolve_configuration(
            &Library::new(),
            &Reference::parse("libharu/0.1").unwrap(),
            &profile(Os::Linux),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, RecipeError::UnknownVersion { .. }));
    }
}
