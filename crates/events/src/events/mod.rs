use serde::{Deserialize, Serialize};

use crate::EventSource;
use cpkg_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(Into::into),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(Into::into),
            retryable: error.is_retryable(),
        }
    }
}

pub mod build;
pub mod general;
pub mod lifecycle;
pub mod package;
pub mod source;

pub use build::*;
pub use general::*;
pub use lifecycle::*;
pub use package::*;
pub use source::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Free-form warnings, errors and debug messages
    General(GeneralEvent),

    /// Phase transitions of a recipe pass
    Lifecycle(LifecycleEvent),

    /// Fetching and preparing sources
    Source(SourceEvent),

    /// Generators and build tools
    Build(BuildEvent),

    /// Packaging and cache commits
    Package(PackageEvent),
}

impl AppEvent {
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::GENERAL,
            Self::Lifecycle(_) => EventSource::LIFECYCLE,
            Self::Source(_) => EventSource::SOURCE,
            Self::Build(_) => EventSource::BUILD,
            Self::Package(_) => EventSource::PACKAGE,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::Error { .. })
            | Self::Lifecycle(LifecycleEvent::Aborted { .. })
            | Self::Build(BuildEvent::CommandFailed { .. }) => Level::ERROR,

            Self::General(GeneralEvent::Warning { .. })
            | Self::Lifecycle(LifecycleEvent::Advisory { .. })
            | Self::Source(SourceEvent::DownloadRetry { .. }) => Level::WARN,

            Self::Lifecycle(
                LifecycleEvent::PhaseStarted { .. } | LifecycleEvent::PhaseSkipped { .. },
            )
            | Self::Build(BuildEvent::GeneratorWritten { .. } | BuildEvent::CommandStarted { .. })
            | Self::Package(PackageEvent::FilesCopied { .. } | PackageEvent::Removed { .. })
            | Self::Source(SourceEvent::Verified { .. }) => Level::DEBUG,

            Self::Build(BuildEvent::CommandOutput { .. }) => Level::TRACE,

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "cpkg::events::general",
            Self::Lifecycle(_) => "cpkg::events::lifecycle",
            Self::Source(_) => "cpkg::events::source",
            Self::Build(_) => "cpkg::events::build",
            Self::Package(_) => "cpkg::events::package",
        }
    }
}
