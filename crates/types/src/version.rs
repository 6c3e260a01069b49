//! Loose versions and version ranges
//!
//! Recipe and tool versions are dotted numbers of any length (`1.2.11`,
//! `2021.10`, `193`) with an optional pre-release tail (`3.0.0-rc1`).
//! Missing components compare as zero, so `1.2` equals `1.2.0`.
//!
//! Ranges come in two shapes:
//! - `1.6.40` - pinned version
//! - `[>=1.2.11 <2]` - bracketed constraints, all of which must hold.
//!   Supported operators: `>=`, `>`, `<=`, `<`, `=`, `!=`, `~` (same
//!   major.minor) and `^` (same major).

use cpkg_errors::VersionError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A dotted numeric version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    raw: String,
    components: Vec<u64>,
    pre: Option<String>,
}

impl Version {
    /// Parse a version string
    ///
    /// # Errors
    /// Returns an error if the string is empty or a dotted component is not numeric.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = input.trim();
        let invalid = || VersionError::InvalidVersion {
            input: input.to_string(),
        };
        if raw.is_empty() {
            return Err(invalid());
        }

        let (main, pre) = match raw.split_once('-') {
            Some((main, pre)) if !pre.is_empty() => (main, Some(pre.to_string())),
            Some(_) => return Err(invalid()),
            None => (raw, None),
        };

        let components = main
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            components,
            pre,
        })
    }

    /// Numeric components as written
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Component at `index`, zero when absent
    #[must_use]
    pub fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn major(&self) -> u64 {
        self.component(0)
    }

    #[must_use]
    pub fn minor(&self) -> u64 {
        self.component(1)
    }

    #[must_use]
    pub fn pre_release(&self) -> Option<&str> {
        self.pre.as_deref()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Components with trailing zeros removed, used for equality and hashing
    fn significant(&self) -> &[u64] {
        let len = self
            .components
            .iter()
            .rposition(|c| *c != 0)
            .map_or(0, |i| i + 1);
        &self.components[..len]
    }

    /// The version obtained by incrementing component `index` and dropping the rest
    fn bump(&self, index: usize) -> Self {
        let mut components: Vec<u64> = (0..=index).map(|i| self.component(i)).collect();
        components[index] += 1;
        let raw = components
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Self {
            raw,
            components,
            pre: None,
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            match self.component(i).cmp(&other.component(i)) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
        self.pre.hash(state);
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.raw
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A single constraint inside a bracketed range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionConstraint {
    Exact(Version),
    NotEqual(Version),
    GreaterEqual(Version),
    Greater(Version),
    LessEqual(Version),
    Less(Version),
    /// `~1.2` - at least 1.2, below 1.3
    Tilde(Version),
    /// `^1.2` - at least 1.2, below 2
    Caret(Version),
}

impl VersionConstraint {
    /// Check if a version satisfies this constraint
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Exact(v) => version == v,
            Self::NotEqual(v) => version != v,
            Self::GreaterEqual(v) => version >= v,
            Self::Greater(v) => version > v,
            Self::LessEqual(v) => version <= v,
            Self::Less(v) => version < v,
            Self::Tilde(v) => {
                let upper = v.bump(if v.components.len() > 1 { 1 } else { 0 });
                version >= v && *version < upper
            }
            Self::Caret(v) => version >= v && *version < v.bump(0),
        }
    }

    fn parse(s: &str) -> Result<Self, VersionError> {
        let s = s.trim();
        let version = |rest: &str| {
            Version::parse(rest.trim()).map_err(|_| VersionError::InvalidRange {
                input: s.to_string(),
            })
        };

        if let Some(rest) = s.strip_prefix(">=") {
            Ok(Self::GreaterEqual(version(rest)?))
        } else if let Some(rest) = s.strip_prefix("<=") {
            Ok(Self::LessEqual(version(rest)?))
        } else if let Some(rest) = s.strip_prefix("!=") {
            Ok(Self::NotEqual(version(rest)?))
        } else if let Some(rest) = s.strip_prefix('>') {
            Ok(Self::Greater(version(rest)?))
        } else if let Some(rest) = s.strip_prefix('<') {
            Ok(Self::Less(version(rest)?))
        } else if let Some(rest) = s.strip_prefix('~') {
            Ok(Self::Tilde(version(rest)?))
        } else if let Some(rest) = s.strip_prefix('^') {
            Ok(Self::Caret(version(rest)?))
        } else if let Some(rest) = s.strip_prefix('=') {
            Ok(Self::Exact(version(rest)?))
        } else {
            Ok(Self::Exact(version(s)?))
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "={v}"),
            Self::NotEqual(v) => write!(f, "!={v}"),
            Self::GreaterEqual(v) => write!(f, ">={v}"),
            Self::Greater(v) => write!(f, ">{v}"),
            Self::LessEqual(v) => write!(f, "<={v}"),
            Self::Less(v) => write!(f, "<{v}"),
            Self::Tilde(v) => write!(f, "~{v}"),
            Self::Caret(v) => write!(f, "^{v}"),
        }
    }
}

/// The version requirement of a dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionRange {
    Pinned(Version),
    Constraints(Vec<VersionConstraint>),
}

impl VersionRange {
    /// Check if a version satisfies the range
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Pinned(v) => v == version,
            Self::Constraints(constraints) => {
                // Pre-releases only match when a constraint names one explicitly
                if version.pre_release().is_some()
                    && !constraints.iter().any(|c| constraint_version(c).pre.is_some())
                {
                    return false;
                }
                constraints.iter().all(|c| c.matches(version))
            }
        }
    }
}

fn constraint_version(constraint: &VersionConstraint) -> &Version {
    match constraint {
        VersionConstraint::Exact(v)
        | VersionConstraint::NotEqual(v)
        | VersionConstraint::GreaterEqual(v)
        | VersionConstraint::Greater(v)
        | VersionConstraint::LessEqual(v)
        | VersionConstraint::Less(v)
        | VersionConstraint::Tilde(v)
        | VersionConstraint::Caret(v) => v,
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || VersionError::InvalidRange {
            input: s.to_string(),
        };

        let Some(inner) = s.strip_prefix('[') else {
            return Version::parse(s).map(Self::Pinned).map_err(|_| invalid());
        };
        let inner = inner.strip_suffix(']').ok_or_else(invalid)?;

        let constraints = inner
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(VersionConstraint::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if constraints.is_empty() {
            return Err(invalid());
        }
        Ok(Self::Constraints(constraints))
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionRange> for String {
    fn from(value: VersionRange) -> Self {
        value.to_string()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pinned(v) => write!(f, "{v}"),
            Self::Constraints(constraints) => {
                let parts: Vec<_> = constraints.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(" "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn missing_components_compare_as_zero() {
        assert_eq!(v("1.2"), v("1.2.0"));
        assert!(v("1.10") > v("1.9.9"));
        assert!(v("3.0.0-rc1") < v("3.0.0"));
        assert_eq!(v("193").major(), 193);
    }

    #[test]
    fn rejects_non_numeric_components() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.x").is_err());
        assert!(Version::parse("1.2-").is_err());
    }

    #[test]
    fn bracketed_range() {
        let range: VersionRange = "[>=1.2.11 <2]".parse().unwrap();
        assert!(range.matches(&v("1.2.11")));
        assert!(range.matches(&v("1.3.1")));
        assert!(!range.matches(&v("2.0")));
        assert!(!range.matches(&v("1.2.10")));
        assert_eq!(range.to_string(), "[>=1.2.11 <2]");
    }

    #[test]
    fn tilde_and_caret() {
        let tilde: VersionRange = "[~1.2]".parse().unwrap();
        assert!(tilde.matches(&v("1.2.9")));
        assert!(!tilde.matches(&v("1.3")));

        let caret: VersionRange = "[^1.2]".parse().unwrap();
        assert!(caret.matches(&v("1.9")));
        assert!(!caret.matches(&v("2.0")));
    }

    #[test]
    fn pinned_range_and_bounded_range() {
        let pinned: VersionRange = "1.6.40".parse().unwrap();
        assert!(pinned.matches(&v("1.6.40")));
        assert!(!pinned.matches(&v("1.6.41")));

        let range: VersionRange = "[>=1.0 <2]".parse().unwrap();
        let matching: Vec<Version> = [v("0.9"), v("1.1"), v("1.8"), v("2.1")]
            .into_iter()
            .filter(|candidate| range.matches(candidate))
            .collect();
        assert_eq!(matching, [v("1.1"), v("1.8")]);
    }

    #[test]
    fn pre_releases_need_explicit_opt_in() {
        let range: VersionRange = "[>=1.0 <2]".parse().unwrap();
        assert!(!range.matches(&v("1.5-beta")));
        let range: VersionRange = "[>=1.5-alpha <2]".parse().unwrap();
        assert!(range.matches(&v("1.5-beta")));
    }

    #[test]
    fn malformed_ranges() {
        assert!("[>=1.0".parse::<VersionRange>().is_err());
        assert!("[]".parse::<VersionRange>().is_err());
        assert!("[>=abc]".parse::<VersionRange>().is_err());
    }

    #[test]
    fn serde_uses_strings() {
        let range: VersionRange = "[>=1.2.11 <2]".parse().unwrap();
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, "\"[>=1.2.11 <2]\"");
        let back: VersionRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, range);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn pinned_range_matches_itself(a in 0u64..100, b in 0u64..100, c in 0u64..100) {
                let version = v(&format!("{a}.{b}.{c}"));
                let range: VersionRange = version.to_string().parse().unwrap();
                prop_assert!(range.matches(&version));
            }

            #[test]
            fn caret_range_covers_the_major(a in 0u64..50, b in 0u64..50, c in 0u64..50) {
                let range: VersionRange = format!("[^{a}]").parse().unwrap();
                let inside = v(&format!("{a}.{b}.{c}"));
                let next_major = v(&format!("{}.0", a + 1));
                prop_assert!(range.matches(&inside));
                prop_assert!(!range.matches(&next_major));
            }

            #[test]
            fn ordering_ignores_trailing_zeros(a in 0u64..1000, b in 0u64..1000) {
                prop_assert_eq!(v(&format!("{a}.{b}")), v(&format!("{a}.{b}.0.0")));
            }
        }
    }
}
