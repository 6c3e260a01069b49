//! Version and range parsing error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum VersionError {
    #[error("invalid version: {input}")]
    InvalidVersion { input: String },

    #[error("invalid version range: {input}")]
    InvalidRange { input: String },

    #[error("no version of {name} satisfies {range}")]
    NoSatisfyingVersion { name: String, range: String },
}

impl UserFacingError for VersionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidVersion { .. } => Some("Versions are dotted numbers such as 1.2.11 or 3.1.0."),
            Self::InvalidRange { .. } => {
                Some("Use a pinned version (1.6.40) or a bracketed range such as [>=1.2.11 <2].")
            }
            Self::NoSatisfyingVersion { .. } => {
                Some("Relax the version range or create a matching package first.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidVersion { .. } => "version.invalid_version",
            Self::InvalidRange { .. } => "version.invalid_range",
            Self::NoSatisfyingVersion { .. } => "version.no_satisfying_version",
        };
        Some(code)
    }
}
