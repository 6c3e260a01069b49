#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the cpkg recipe engine
//!
//! This crate provides fine-grained error types organized by domain.
//! All error types implement Clone where possible for easier handling.

use std::borrow::Cow;

use thiserror::Error;

pub mod build;
pub mod config;
pub mod package;
pub mod recipe;
pub mod version;

pub use build::BuildError;
pub use config::ConfigError;
pub use package::PackageError;
pub use recipe::RecipeError;
pub use version::VersionError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    #[error("recipe error: {0}")]
    Recipe(#[from] RecipeError),

    #[error("build error: {0}")]
    Build(#[from] BuildError),

    #[error("package error: {0}")]
    Package(#[from] PackageError),

    #[error("version error: {0}")]
    Version(#[from] VersionError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {message}")]
    Io {
        #[cfg_attr(feature = "serde", serde(with = "io_kind_as_str"))]
        kind: std::io::ErrorKind,
        message: String,
        #[cfg_attr(feature = "serde", serde(with = "opt_path_buf"))]
        path: Option<std::path::PathBuf>,
    },
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// Whether this error is a configuration rejection raised by a recipe
    #[must_use]
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(
            self,
            Self::Recipe(RecipeError::InvalidConfiguration { .. })
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(ConfigError::ParseError {
            message: err.to_string(),
        })
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(ConfigError::SerializeError {
            error: err.to_string(),
        })
    }
}

/// Result type alias for cpkg operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Recipe(err) => err.user_message(),
            Error::Build(err) => err.user_message(),
            Error::Io { message, .. } => Cow::Owned(message.clone()),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Recipe(err) => err.user_hint(),
            Error::Build(err) => err.user_hint(),
            Error::Package(err) => err.user_hint(),
            Error::Version(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Build(err) => err.is_retryable(),
            Error::Io { .. } => true,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Recipe(err) => err.user_code(),
            Error::Build(err) => err.user_code(),
            Error::Package(err) => err.user_code(),
            Error::Version(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
            Error::Internal(_) => Some("error.internal"),
            Error::Cancelled => Some("error.cancelled"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}

#[cfg(feature = "serde")]
mod io_kind_as_str {
    use serde::{Deserialize, Deserializer, Serializer};
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(kind: &std::io::ErrorKind, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&format!("{kind:?}"))
    }
    pub fn deserialize<'de, D>(deserializer: D) -> Result<std::io::ErrorKind, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "NotFound" => std::io::ErrorKind::NotFound,
            "PermissionDenied" => std::io::ErrorKind::PermissionDenied,
            "AlreadyExists" => std::io::ErrorKind::AlreadyExists,
            "InvalidInput" => std::io::ErrorKind::InvalidInput,
            "InvalidData" => std::io::ErrorKind::InvalidData,
            "TimedOut" => std::io::ErrorKind::TimedOut,
            "Interrupted" => std::io::ErrorKind::Interrupted,
            "Unsupported" => std::io::ErrorKind::Unsupported,
            "UnexpectedEof" => std::io::ErrorKind::UnexpectedEof,
            _ => std::io::ErrorKind::Other,
        })
    }
}

#[cfg(feature = "serde")]
mod opt_path_buf {
    use serde::{Deserialize, Deserializer, Serializer};
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(path: &Option<std::path::PathBuf>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match path {
            Some(pb) => s.serialize_some(&pb.display().to_string()),
            None => s.serialize_none(),
        }
    }
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<std::path::PathBuf>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<String>::deserialize(deserializer)?;
        Ok(opt.map(std::path::PathBuf::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_configuration_is_not_retryable() {
        let err: Error = RecipeError::InvalidConfiguration {
            reference: "mold/2.4.0".into(),
            reason: "GCC 10 or newer is required".into(),
        }
        .into();
        assert!(err.is_invalid_configuration());
        assert!(!err.is_retryable());
        assert_eq!(err.user_code(), Some("recipe.invalid_configuration"));
        assert!(err.user_message().contains("GCC 10"));
    }

    #[test]
    fn fetch_failures_are_retryable() {
        let err: Error = BuildError::FetchFailed {
            url: "https://example.invalid/a.tar.gz".into(),
            message: "connection reset".into(),
        }
        .into();
        assert!(err.is_retryable());
        assert!(err.user_hint().is_some());
    }

    #[test]
    fn io_errors_keep_their_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::io_with_path(&io, "/tmp/x");
        match err {
            Error::Io { kind, path, .. } => {
                assert_eq!(kind, std::io::ErrorKind::NotFound);
                assert_eq!(path.as_deref(), Some(std::path::Path::new("/tmp/x")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
