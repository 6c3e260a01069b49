//! Configuration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("invalid config: {message}")]
    Invalid { message: String },

    #[error("parse error: {message}")]
    ParseError { message: String },

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("failed to serialize config: {error}")]
    SerializeError { error: String },
}

impl UserFacingError for ConfigError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => Some("Create the file or drop the --config flag."),
            Self::InvalidValue { .. } | Self::Invalid { .. } | Self::ParseError { .. } => {
                Some("Fix the configuration value and retry the command.")
            }
            Self::SerializeError { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotFound { .. } => "config.not_found",
            Self::Invalid { .. } => "config.invalid",
            Self::ParseError { .. } => "config.parse_error",
            Self::InvalidValue { .. } => "config.invalid_value",
            Self::SerializeError { .. } => "config.serialize_error",
        };
        Some(code)
    }
}
