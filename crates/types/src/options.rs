//! Typed recipe options
//!
//! A recipe declares an [`OptionSchema`]: every option has a key, a closed
//! domain and a default inside that domain. The schema is checked when it is
//! built, so a recipe with a bad default never reaches the engine. Resolved
//! values live in [`Options`], which only ever shrinks as phases remove keys.

use cpkg_errors::RecipeError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Name of a recipe option
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionKey(Cow<'static, str>);

impl OptionKey {
    pub const SHARED: Self = Self::new("shared");
    pub const FPIC: Self = Self::new("fPIC");
    pub const HEADER_ONLY: Self = Self::new("header_only");

    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Key parsed from user input
    #[must_use]
    pub fn owned(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of values an option accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionDomain {
    Bool,
    Choice(&'static [&'static str]),
}

impl OptionDomain {
    /// Whether `value` lies inside this domain
    #[must_use]
    pub fn contains(&self, value: &OptionValue) -> bool {
        match (self, value) {
            (Self::Bool, OptionValue::Bool(_)) => true,
            (Self::Choice(choices), OptionValue::Choice(v)) => choices.contains(&v.as_str()),
            _ => false,
        }
    }

    /// Parse user input into a value of this domain
    ///
    /// # Errors
    /// Returns an error if the input is not one of the domain's values.
    pub fn parse(&self, key: &OptionKey, input: &str) -> Result<OptionValue, RecipeError> {
        let input = input.trim();
        let parsed = match self {
            Self::Bool => match input.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(OptionValue::Bool(true)),
                "false" | "0" | "no" | "off" => Some(OptionValue::Bool(false)),
                _ => None,
            },
            Self::Choice(choices) => choices
                .iter()
                .find(|c| **c == input)
                .map(|c| OptionValue::Choice((*c).to_string())),
        };
        parsed.ok_or_else(|| RecipeError::InvalidOptionValue {
            option: key.to_string(),
            value: input.to_string(),
            expected: self.to_string(),
        })
    }
}

impl fmt::Display for OptionDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("True, False"),
            Self::Choice(choices) => f.write_str(&choices.join(", ")),
        }
    }
}

/// A concrete option value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Choice(String),
}

impl OptionValue {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Choice(_) => None,
        }
    }

    #[must_use]
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            Self::Bool(_) => None,
            Self::Choice(c) => Some(c),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Choice(c) => f.write_str(c),
        }
    }
}

/// Declaration of one option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDef {
    pub key: OptionKey,
    pub domain: OptionDomain,
    pub default: OptionValue,
}

impl OptionDef {
    /// A boolean option
    #[must_use]
    pub fn boolean(key: OptionKey, default: bool) -> Self {
        Self {
            key,
            domain: OptionDomain::Bool,
            default: OptionValue::Bool(default),
        }
    }

    /// An option with a fixed list of choices
    #[must_use]
    pub fn choice(key: OptionKey, choices: &'static [&'static str], default: &'static str) -> Self {
        Self {
            key,
            domain: OptionDomain::Choice(choices),
            default: OptionValue::Choice(default.to_string()),
        }
    }
}

/// The validated set of options a recipe exposes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSchema {
    defs: Vec<OptionDef>,
}

impl OptionSchema {
    /// Build a schema, checking key uniqueness and that defaults lie in their domains
    ///
    /// # Errors
    /// Returns an error if a key is declared twice or a default is outside its domain.
    pub fn new(defs: Vec<OptionDef>) -> Result<Self, RecipeError> {
        for (index, def) in defs.iter().enumerate() {
            if defs[..index].iter().any(|other| other.key == def.key) {
                return Err(RecipeError::DuplicateOption {
                    option: def.key.to_string(),
                });
            }
            if !def.domain.contains(&def.default) {
                return Err(RecipeError::InvalidDefault {
                    option: def.key.to_string(),
                    value: def.default.to_string(),
                });
            }
        }
        Ok(Self { defs })
    }

    /// Schema with no options
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The usual `shared`/`fPIC` pair of a compiled library
    #[must_use]
    pub fn library_defs() -> Vec<OptionDef> {
        vec![
            OptionDef::boolean(OptionKey::SHARED, false),
            OptionDef::boolean(OptionKey::FPIC, true),
        ]
    }

    #[must_use]
    pub fn get(&self, key: &OptionKey) -> Option<&OptionDef> {
        self.defs.iter().find(|d| &d.key == key)
    }

    /// Look up a definition by its textual name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&OptionDef> {
        self.defs.iter().find(|d| d.key.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionDef> {
        self.defs.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Every option set to its default
    #[must_use]
    pub fn defaults(&self) -> Options {
        Options {
            values: self
                .defs
                .iter()
                .map(|d| (d.key.clone(), d.default.clone()))
                .collect(),
        }
    }
}

/// Resolved option values
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    values: BTreeMap<OptionKey, OptionValue>,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &OptionKey) -> Option<&OptionValue> {
        self.values.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &OptionKey) -> bool {
        self.values.contains_key(key)
    }

    /// Boolean value of an option, `None` when absent or not boolean
    #[must_use]
    pub fn get_bool(&self, key: &OptionKey) -> Option<bool> {
        self.get(key).and_then(OptionValue::as_bool)
    }

    /// True only when the option exists and is enabled
    #[must_use]
    pub fn is_enabled(&self, key: &OptionKey) -> bool {
        self.get_bool(key).unwrap_or(false)
    }

    #[must_use]
    pub fn choice(&self, key: &OptionKey) -> Option<&str> {
        self.get(key).and_then(OptionValue::as_choice)
    }

    #[must_use]
    pub fn shared(&self) -> bool {
        self.is_enabled(&OptionKey::SHARED)
    }

    /// A copy with `key` set
    #[must_use]
    pub fn with(mut self, key: OptionKey, value: OptionValue) -> Self {
        self.values.insert(key, value);
        self
    }

    /// A copy without the listed keys
    #[must_use]
    pub fn without(&self, keys: &[OptionKey]) -> Self {
        let mut values = self.values.clone();
        for key in keys {
            values.remove(key);
        }
        Self { values }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OptionKey, &OptionValue)> {
        self.values.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sorted `name -> value` strings
    #[must_use]
    pub fn to_pairs(&self) -> BTreeMap<String, String> {
        self.values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Rebuild options from [`Options::to_pairs`] output, e.g. cache metadata
    ///
    /// `True` and `False` become booleans, anything else a choice.
    #[must_use]
    pub fn from_pairs(pairs: &BTreeMap<String, String>) -> Self {
        let values = pairs
            .iter()
            .map(|(name, value)| {
                let value = match value.as_str() {
                    "True" => OptionValue::Bool(true),
                    "False" => OptionValue::Bool(false),
                    other => OptionValue::Choice(other.to_string()),
                };
                (OptionKey::owned(name.clone()), value)
            })
            .collect();
        Self { values }
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.values.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIOLATION: OptionKey = OptionKey::new("on_contract_violation");
    const VIOLATION_CHOICES: &[&str] = &["terminate", "throw", "unenforced"];

    fn schema() -> OptionSchema {
        let mut defs = OptionSchema::library_defs();
        defs.push(OptionDef::choice(VIOLATION, VIOLATION_CHOICES, "terminate"));
        OptionSchema::new(defs).unwrap()
    }

    #[test]
    fn defaults_follow_the_schema() {
        let options = schema().defaults();
        assert_eq!(options.get_bool(&OptionKey::SHARED), Some(false));
        assert!(options.is_enabled(&OptionKey::FPIC));
        assert_eq!(options.choice(&VIOLATION), Some("terminate"));
    }

    #[test]
    fn pairs_survive_the_cache() {
        let options = schema().defaults();
        assert_eq!(Options::from_pairs(&options.to_pairs()), options);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let defs = vec![
            OptionDef::boolean(OptionKey::SHARED, false),
            OptionDef::boolean(OptionKey::owned("shared"), true),
        ];
        assert!(matches!(
            OptionSchema::new(defs),
            Err(RecipeError::DuplicateOption { .. })
        ));
    }

    #[test]
    fn defaults_outside_the_domain_are_rejected() {
        let defs = vec![OptionDef::choice(VIOLATION, VIOLATION_CHOICES, "abort")];
        assert!(matches!(
            OptionSchema::new(defs),
            Err(RecipeError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn parses_values_against_the_domain() {
        let schema = schema();
        let shared = schema.find("shared").unwrap();
        assert_eq!(
            shared.domain.parse(&shared.key, "True").unwrap(),
            OptionValue::Bool(true)
        );
        assert!(shared.domain.parse(&shared.key, "maybe").is_err());

        let violation = schema.get(&VIOLATION).unwrap();
        assert!(violation.domain.parse(&violation.key, "throw").is_ok());
        let err = violation.domain.parse(&violation.key, "abort").unwrap_err();
        assert!(err.to_string().contains("terminate, throw, unenforced"));
    }

    #[test]
    fn without_drops_keys() {
        let options = schema().defaults().without(&[OptionKey::FPIC]);
        assert!(!options.contains(&OptionKey::FPIC));
        assert!(options.contains(&OptionKey::SHARED));
        assert_eq!(options.to_pairs().len(), 2);
    }

    #[test]
    fn borrowed_and_owned_keys_are_equal() {
        assert_eq!(OptionKey::owned("fPIC"), OptionKey::FPIC);
        let options = Options::new().with(OptionKey::owned("fPIC"), OptionValue::Bool(true));
        assert!(options.is_enabled(&OptionKey::FPIC));
    }

    #[test]
    fn serializes_as_a_flat_map() {
        let options = schema().defaults();
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(
            json,
            r#"{"fPIC":true,"on_contract_violation":"terminate","shared":false}"#
        );
    }
}
