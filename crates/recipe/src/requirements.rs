//! Dependency edges declared by recipes

use cpkg_errors::RecipeError;
use cpkg_types::VersionRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether an edge links into the package or only runs during its build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementKind {
    Host,
    Tool,
}

/// Propagation traits of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Traits {
    /// Consumers of this package can see the dependency
    pub visible: bool,
    pub transitive_headers: bool,
    pub transitive_libs: bool,
    /// The dependency provides executables needed at build time
    pub run: bool,
}

impl Traits {
    fn host() -> Self {
        Self {
            visible: true,
            transitive_headers: false,
            transitive_libs: true,
            run: false,
        }
    }

    fn tool() -> Self {
        Self {
            visible: false,
            transitive_headers: false,
            transitive_libs: false,
            run: true,
        }
    }

    /// Whether consumers must be able to resolve this edge
    #[must_use]
    pub fn is_transitive(&self) -> bool {
        self.visible && (self.transitive_headers || self.transitive_libs)
    }
}

/// A `(name, version range, traits)` dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub range: VersionRange,
    pub kind: RequirementKind,
    pub traits: Traits,
}

impl Requirement {
    /// A host (link-time) requirement
    ///
    /// # Errors
    /// Returns an error if `range` is neither a version nor a bracketed range.
    pub fn host(name: &str, range: &str) -> Result<Self, RecipeError> {
        Self::new(name, range, RequirementKind::Host, Traits::host())
    }

    /// A build-time tool requirement
    ///
    /// # Errors
    /// Returns an error if `range` is neither a version nor a bracketed range.
    pub fn tool(name: &str, range: &str) -> Result<Self, RecipeError> {
        Self::new(name, range, RequirementKind::Tool, Traits::tool())
    }

    fn new(
        name: &str,
        range: &str,
        kind: RequirementKind,
        traits: Traits,
    ) -> Result<Self, RecipeError> {
        let range = range.parse().map_err(|e| RecipeError::Definition {
            message: format!("requirement {name}: {e}"),
        })?;
        Ok(Self {
            name: name.to_string(),
            range,
            kind,
            traits,
        })
    }

    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        self.traits.visible = visible;
        self
    }

    #[must_use]
    pub fn transitive_headers(mut self, value: bool) -> Self {
        self.traits.transitive_headers = value;
        self
    }

    #[must_use]
    pub fn transitive_libs(mut self, value: bool) -> Self {
        self.traits.transitive_libs = value;
        self
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpkg_types::Version;

    #[test]
    fn host_requirements_propagate_libs() {
        let req = Requirement::host("zlib", "[>=1.2.11 <2]").unwrap();
        assert_eq!(req.kind, RequirementKind::Host);
        assert!(req.traits.is_transitive());
        assert!(req.range.matches(&Version::parse("1.3").unwrap()));
        assert_eq!(req.to_string(), "zlib/[>=1.2.11 <2]");
    }

    #[test]
    fn tool_requirements_are_private_unless_visible() {
        let req = Requirement::tool("bzip2", "1.0.8").unwrap();
        assert!(!req.traits.visible);
        assert!(req.traits.run);
        assert!(req.visible(true).traits.visible);
    }

    #[test]
    fn bad_ranges_are_definition_errors() {
        assert!(matches!(
            Requirement::host("zlib", "[>=1.2"),
            Err(RecipeError::Definition { .. })
        ));
    }
}
