//! Build pipeline error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum BuildError {
    #[error("build failed: {message}")]
    Failed { message: String },

    #[error("missing dependency: {name} {range}")]
    MissingDependency { name: String, range: String },

    #[error("fetch failed for {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("patch failed: {patch}: {message}")]
    PatchFailed { patch: String, message: String },

    #[error("configure failed: {message}")]
    ConfigureFailed { message: String },

    #[error("compile failed: {message}")]
    CompileFailed { message: String },

    #[error("install failed: {message}")]
    InstallFailed { message: String },

    #[error("hash mismatch for {file}: expected {expected}, got {actual}")]
    HashMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("extraction failed: {message}")]
    ExtractionFailed { message: String },

    #[error("network access disabled for {url}")]
    NetworkDisabled { url: String },

    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("unsupported archive format: {format}")]
    UnsupportedArchiveFormat { format: String },

    #[error("required tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("generator failed: {message}")]
    GeneratorFailed { message: String },
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingDependency { .. } => {
                Some("Create the missing dependency first with `cpkg create <name>/<version>`.")
            }
            Self::FetchFailed { .. } | Self::InvalidUrl { .. } | Self::NetworkDisabled { .. } => {
                Some("Check network access or place the source archive in the download cache.")
            }
            Self::HashMismatch { .. } => {
                Some("The downloaded archive does not match the recipe checksum; verify the mirror.")
            }
            Self::PatchFailed { .. } => {
                Some("Update the patch so it applies cleanly to the current sources.")
            }
            Self::ToolNotFound { .. } => {
                Some("Install the build tool or make sure it is on PATH.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Failed { .. } => "build.failed",
            Self::MissingDependency { .. } => "build.missing_dependency",
            Self::FetchFailed { .. } => "build.fetch_failed",
            Self::PatchFailed { .. } => "build.patch_failed",
            Self::ConfigureFailed { .. } => "build.configure_failed",
            Self::CompileFailed { .. } => "build.compile_failed",
            Self::InstallFailed { .. } => "build.install_failed",
            Self::HashMismatch { .. } => "build.hash_mismatch",
            Self::ExtractionFailed { .. } => "build.extraction_failed",
            Self::NetworkDisabled { .. } => "build.network_disabled",
            Self::InvalidUrl { .. } => "build.invalid_url",
            Self::UnsupportedArchiveFormat { .. } => "build.unsupported_archive_format",
            Self::ToolNotFound { .. } => "build.tool_not_found",
            Self::GeneratorFailed { .. } => "build.generator_failed",
        };
        Some(code)
    }
}
