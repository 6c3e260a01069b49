//! Recipe lifecycle error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum RecipeError {
    /// Raised by configure or validate when a settings/options combination
    /// is not supported by the recipe.
    #[error("{reference}: invalid configuration: {reason}")]
    InvalidConfiguration { reference: String, reason: String },

    #[error("unknown option '{option}' for {recipe}")]
    UnknownOption { recipe: String, option: String },

    #[error("invalid value '{value}' for option '{option}', expected one of: {expected}")]
    InvalidOptionValue {
        option: String,
        value: String,
        expected: String,
    },

    #[error("option '{option}' declared more than once")]
    DuplicateOption { option: String },

    #[error("default '{value}' of option '{option}' is outside its domain")]
    InvalidDefault { option: String, value: String },

    #[error("unknown setting '{setting}'")]
    UnknownSetting { setting: String },

    #[error("invalid value '{value}' for setting '{setting}'")]
    InvalidSettingValue { setting: String, value: String },

    #[error("missing required setting '{setting}' for {recipe}")]
    MissingSetting { recipe: String, setting: String },

    #[error("recipe not found: {name}")]
    UnknownRecipe { name: String },

    #[error("{name} has no sources for version {version}")]
    UnknownVersion { name: String, version: String },

    #[error("no source archive for {reference} on {os}/{arch}")]
    MissingSource {
        reference: String,
        os: String,
        arch: String,
    },

    #[error("invalid reference: {input}")]
    InvalidReference { input: String },

    #[error("phase {requested} cannot run after {current}")]
    PhaseOrder { current: String, requested: String },

    #[error("invalid recipe definition: {message}")]
    Definition { message: String },
}

impl UserFacingError for RecipeError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidConfiguration { .. } => {
                Some("Choose a different profile or options; this combination is not supported.")
            }
            Self::UnknownOption { .. } | Self::InvalidOptionValue { .. } => {
                Some("Run `cpkg inspect <name>/<version>` to list the recipe's options.")
            }
            Self::UnknownSetting { .. } | Self::InvalidSettingValue { .. } => {
                Some("Settings use the form key=value, e.g. os=Linux or compiler.version=12.")
            }
            Self::UnknownRecipe { .. } => Some("Run `cpkg list` to see the available recipes."),
            Self::UnknownVersion { .. } => {
                Some("Run `cpkg inspect <name>` to see which versions have sources.")
            }
            Self::InvalidReference { .. } => Some("References use the form name/version."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidConfiguration { .. } => "recipe.invalid_configuration",
            Self::UnknownOption { .. } => "recipe.unknown_option",
            Self::InvalidOptionValue { .. } => "recipe.invalid_option_value",
            Self::DuplicateOption { .. } => "recipe.duplicate_option",
            Self::InvalidDefault { .. } => "recipe.invalid_default",
            Self::UnknownSetting { .. } => "recipe.unknown_setting",
            Self::InvalidSettingValue { .. } => "recipe.invalid_setting_value",
            Self::MissingSetting { .. } => "recipe.missing_setting",
            Self::UnknownRecipe { .. } => "recipe.unknown_recipe",
            Self::UnknownVersion { .. } => "recipe.unknown_version",
            Self::MissingSource { .. } => "recipe.missing_source",
            Self::InvalidReference { .. } => "recipe.invalid_reference",
            Self::PhaseOrder { .. } => "recipe.phase_order",
            Self::Definition { .. } => "recipe.definition",
        };
        Some(code)
    }
}
