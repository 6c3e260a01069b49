//! Validation helpers shared by recipes
//!
//! Every helper is a pure function of the context. Rejections are
//! `RecipeError::InvalidConfiguration`; soft findings become advisories.

use crate::context::RecipeContext;
use cpkg_errors::RecipeError;
use cpkg_types::{CompilerKind, CppStd, Version};
use serde::Serialize;

/// Non-fatal findings reported as warnings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Advisories(Vec<String>);

impl Advisories {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// Append every advisory from `other`
    pub fn extend(&mut self, other: Advisories) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl IntoIterator for Advisories {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Build the rejection error for the current reference
#[must_use]
pub fn invalid(ctx: &RecipeContext, reason: impl Into<String>) -> RecipeError {
    RecipeError::InvalidConfiguration {
        reference: ctx.reference().to_string(),
        reason: reason.into(),
    }
}

/// Reject a `compiler.cppstd` below `minimum`; an unset cppstd passes
///
/// # Errors
/// Returns `InvalidConfiguration` if the configured standard is too old.
pub fn check_min_cppstd(ctx: &RecipeContext, minimum: CppStd) -> Result<(), RecipeError> {
    match ctx.settings().cppstd() {
        Some(current) if current.year() < minimum.year() => Err(invalid(
            ctx,
            format!(
                "current cppstd ({current}) is lower than the required C++ standard ({})",
                minimum.short()
            ),
        )),
        _ => Ok(()),
    }
}

/// Minimum compiler versions per compiler family
#[derive(Debug, Clone, Copy)]
pub struct CompilerMinimums(pub &'static [(CompilerKind, &'static str)]);

impl CompilerMinimums {
    /// Minimum version for `kind`, if the table lists it
    #[must_use]
    pub fn minimum(&self, kind: CompilerKind) -> Option<Version> {
        self.0
            .iter()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, v)| Version::parse(v).ok())
    }
}

/// Check the compiler against a minimum-version table
///
/// A compiler missing from the table is assumed capable and produces an
/// advisory. `feature` names what the minimums guarantee, e.g. `C++14`.
///
/// # Errors
/// Returns `InvalidConfiguration` if the compiler is older than its minimum.
pub fn check_min_compiler(
    ctx: &RecipeContext,
    minimums: CompilerMinimums,
    feature: &str,
) -> Result<Advisories, RecipeError> {
    let mut advisories = Advisories::new();
    let Some(compiler) = ctx.settings().compiler.as_ref() else {
        return Ok(advisories);
    };

    match minimums.minimum(compiler.kind) {
        Some(minimum) if compiler.version < minimum => Err(invalid(
            ctx,
            format!(
                "{} requires {feature}, which your compiler ({} {}) does not fully support",
                ctx.reference(),
                compiler.kind,
                compiler.version
            ),
        )),
        Some(_) => Ok(advisories),
        None => {
            advisories.push(format!(
                "{} requires {feature}. Your compiler is unknown. Assuming it supports {feature}.",
                ctx.reference()
            ));
            Ok(advisories)
        }
    }
}

/// MSVC toolset version for a Visual Studio IDE version
fn vs_ide_to_msvc(ide: u64) -> Option<u64> {
    match ide {
        14 => Some(190),
        15 => Some(191),
        16 => Some(192),
        17 => Some(193),
        _ => None,
    }
}

/// Reject MSVC older than `minimum` (toolset spelling, e.g. `190`)
///
/// Non-Microsoft compilers always pass.
///
/// # Errors
/// Returns `InvalidConfiguration` if the MSVC toolset is too old.
pub fn check_min_vs(ctx: &RecipeContext, minimum: u64) -> Result<(), RecipeError> {
    let Some(compiler) = ctx.settings().compiler.as_ref() else {
        return Ok(());
    };
    let toolset = match compiler.kind {
        CompilerKind::Msvc => Some(compiler.version.major()),
        CompilerKind::VisualStudio => vs_ide_to_msvc(compiler.version.major()),
        _ => return Ok(()),
    };
    match toolset {
        Some(toolset) if toolset >= minimum => Ok(()),
        _ => Err(invalid(
            ctx,
            format!(
                "this package does not work with {} {}, it requires at least msvc {minimum}",
                compiler.kind, compiler.version
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpkg_types::{Compiler, Options, Reference, Settings};

    fn ctx(kind: CompilerKind, version: &str, cppstd: Option<u16>) -> RecipeContext {
        let mut compiler = Compiler::new(kind, Version::parse(version).unwrap());
        if let Some(std) = cppstd {
            compiler = compiler.with_cppstd(CppStd::new(std));
        }
        RecipeContext::new(
            Reference::parse("ms-gsl/4.0.0").unwrap(),
            Settings::new().with_compiler(compiler),
            Options::new(),
        )
    }

    const MINIMUMS: CompilerMinimums = CompilerMinimums(&[
        (CompilerKind::Gcc, "5"),
        (CompilerKind::Clang, "3.4"),
        (CompilerKind::AppleClang, "3.4"),
    ]);

    #[test]
    fn cppstd_below_minimum_is_rejected() {
        assert!(check_min_cppstd(&ctx(CompilerKind::Gcc, "12", Some(11)), CppStd::new(14)).is_err());
        assert!(check_min_cppstd(&ctx(CompilerKind::Gcc, "12", Some(17)), CppStd::new(14)).is_ok());
        assert!(check_min_cppstd(&ctx(CompilerKind::Gcc, "12", None), CppStd::new(14)).is_ok());
    }

    #[test]
    fn old_compilers_are_rejected() {
        let err = check_min_compiler(&ctx(CompilerKind::Gcc, "4.9", None), MINIMUMS, "C++14")
            .unwrap_err();
        assert!(err.to_string().contains("C++14"));
        assert!(check_min_compiler(&ctx(CompilerKind::Clang, "3.4", None), MINIMUMS, "C++14")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unknown_compilers_produce_an_advisory() {
        let advisories =
            check_min_compiler(&ctx(CompilerKind::IntelCc, "2021", None), MINIMUMS, "C++14")
                .unwrap();
        assert_eq!(advisories.len(), 1);
        let message = advisories.iter().next().unwrap();
        assert!(message.contains("Assuming it supports C++14"));
    }

    #[test]
    fn msvc_minimum_accepts_both_spellings() {
        assert!(check_min_vs(&ctx(CompilerKind::Msvc, "192", None), 190).is_ok());
        assert!(check_min_vs(&ctx(CompilerKind::Msvc, "180", None), 190).is_err());
        assert!(check_min_vs(&ctx(CompilerKind::VisualStudio, "15", None), 190).is_ok());
        assert!(check_min_vs(&ctx(CompilerKind::VisualStudio, "12", None), 190).is_err());
        assert!(check_min_vs(&ctx(CompilerKind::Gcc, "4", None), 190).is_ok());
    }
}
