//! Package references and package types

use crate::version::Version;
use cpkg_errors::RecipeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A `name/version` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    pub name: String,
    pub version: Version,
}

impl Reference {
    #[must_use]
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Parse `name/version`
    ///
    /// # Errors
    /// Returns an error if the input is not of the form `name/version` or the
    /// name contains characters outside `[a-z0-9_.+-]`.
    pub fn parse(input: &str) -> Result<Self, RecipeError> {
        let invalid = || RecipeError::InvalidReference {
            input: input.to_string(),
        };
        let (name, version) = input.trim().split_once('/').ok_or_else(invalid)?;
        if name.is_empty() || !name.chars().all(is_name_char) {
            return Err(invalid());
        }
        let version = Version::parse(version).map_err(|_| invalid())?;
        Ok(Self::new(name, version))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.' | '+')
}

impl FromStr for Reference {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Reference {
    type Error = RecipeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Reference> for String {
    fn from(value: Reference) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// What kind of artifact a recipe produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageType {
    HeaderLibrary,
    /// Static or shared, decided by the `shared` option
    Library,
    StaticLibrary,
    SharedLibrary,
    Application,
    BuildScripts,
}

impl PackageType {
    /// Resolve `Library` against the `shared` option
    #[must_use]
    pub fn resolve(self, shared: bool) -> Self {
        match self {
            Self::Library if shared => Self::SharedLibrary,
            Self::Library => Self::StaticLibrary,
            other => other,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HeaderLibrary => "header-library",
            Self::Library => "library",
            Self::StaticLibrary => "static-library",
            Self::SharedLibrary => "shared-library",
            Self::Application => "application",
            Self::BuildScripts => "build-scripts",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
