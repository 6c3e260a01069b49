//! Packaging and cache error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PackageError {
    #[error("invalid file pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to copy {path}: {message}")]
    CopyFailed { path: String, message: String },

    #[error("package not found in cache: {reference}")]
    NotFound { reference: String },

    #[error("corrupted cache entry {path}: {message}")]
    Corrupted { path: String, message: String },

    #[error("failed to commit package {reference}: {message}")]
    CommitFailed { reference: String, message: String },

    #[error("path escapes the package root: {path}")]
    PathEscape { path: String },
}

impl UserFacingError for PackageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => Some("Run `cpkg create` for the reference first."),
            Self::Corrupted { .. } => Some("Remove the cache entry and create the package again."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidPattern { .. } => "package.invalid_pattern",
            Self::CopyFailed { .. } => "package.copy_failed",
            Self::NotFound { .. } => "package.not_found",
            Self::Corrupted { .. } => "package.corrupted",
            Self::CommitFailed { .. } => "package.commit_failed",
            Self::PathEscape { .. } => "package.path_escape",
        };
        Some(code)
    }
}
