use crate::FailureContext;
use cpkg_types::Reference;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Recipe lifecycle events, one pass per reference
///
/// Phases are reported by their hyphenated names (`config-options`,
/// `package-info`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LifecycleEvent {
    /// A pass started with the resolved configuration
    Started {
        reference: Reference,
        settings: String,
        options: String,
    },

    PhaseStarted {
        reference: Reference,
        phase: String,
    },

    PhaseCompleted {
        reference: Reference,
        phase: String,
        duration: Duration,
    },

    /// A phase that has nothing to do for this build strategy
    PhaseSkipped {
        reference: Reference,
        phase: String,
        reason: String,
    },

    /// Non-fatal finding, e.g. an unknown compiler or an ignored option
    Advisory {
        reference: Reference,
        phase: String,
        message: String,
    },

    /// The pass stopped; nothing was committed
    Aborted {
        reference: Reference,
        phase: String,
        failure: FailureContext,
    },

    /// The package is available in the cache
    Completed {
        reference: Reference,
        package_id: String,
        reused: bool,
    },
}

impl LifecycleEvent {
    /// Reference the event belongs to
    #[must_use]
    pub fn reference(&self) -> &Reference {
        match self {
            Self::Started { reference, .. }
            | Self::PhaseStarted { reference, .. }
            | Self::PhaseCompleted { reference, .. }
            | Self::PhaseSkipped { reference, .. }
            | Self::Advisory { reference, .. }
            | Self::Aborted { reference, .. }
            | Self::Completed { reference, .. } => reference,
        }
    }
}
