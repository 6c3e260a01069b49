//! Lifecycle phases and the tracker enforcing their order

use cpkg_errors::RecipeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The ten lifecycle phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    ConfigOptions,
    Configure,
    Layout,
    Requirements,
    Validate,
    Source,
    Generate,
    Build,
    Package,
    PackageInfo,
}

impl Phase {
    pub const ALL: [Phase; 10] = [
        Phase::ConfigOptions,
        Phase::Configure,
        Phase::Layout,
        Phase::Requirements,
        Phase::Validate,
        Phase::Source,
        Phase::Generate,
        Phase::Build,
        Phase::Package,
        Phase::PackageInfo,
    ];

    /// Phases that only compute configuration and never touch the filesystem
    pub const EVALUATION: [Phase; 5] = [
        Phase::ConfigOptions,
        Phase::Configure,
        Phase::Layout,
        Phase::Requirements,
        Phase::Validate,
    ];

    #[must_use]
    pub fn next(self) -> Option<Phase> {
        let index = Self::ALL.iter().position(|p| *p == self)?;
        Self::ALL.get(index + 1).copied()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigOptions => "config-options",
            Self::Configure => "configure",
            Self::Layout => "layout",
            Self::Requirements => "requirements",
            Self::Validate => "validate",
            Self::Source => "source",
            Self::Generate => "generate",
            Self::Build => "build",
            Self::Package => "package",
            Self::PackageInfo => "package-info",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a lifecycle pass currently stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    NotStarted,
    Running { phase: Phase },
    Completed,
    Aborted { phase: Phase, reason: String },
}

/// Enforces the fixed linear phase order of one lifecycle pass
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    state: LifecycleState,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: LifecycleState::NotStarted,
        }
    }

    #[must_use]
    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// The phase currently running, if any
    #[must_use]
    pub fn current(&self) -> Option<Phase> {
        match self.state {
            LifecycleState::Running { phase } => Some(phase),
            _ => None,
        }
    }

    fn order_error(&self, requested: &str) -> RecipeError {
        let current = match &self.state {
            LifecycleState::NotStarted => "start".to_string(),
            LifecycleState::Running { phase } => phase.to_string(),
            LifecycleState::Completed => "completed".to_string(),
            LifecycleState::Aborted { phase, .. } => format!("aborted in {phase}"),
        };
        RecipeError::PhaseOrder {
            current,
            requested: requested.to_string(),
        }
    }

    /// Enter `phase`, which must directly follow the current one
    ///
    /// # Errors
    /// Returns `PhaseOrder` when skipping, repeating or going back a phase, or
    /// when the pass has already terminated.
    pub fn enter(&mut self, phase: Phase) -> Result<(), RecipeError> {
        let expected = match self.state {
            LifecycleState::NotStarted => Some(Phase::ConfigOptions),
            LifecycleState::Running { phase: current } => current.next(),
            LifecycleState::Completed | LifecycleState::Aborted { .. } => None,
        };
        if expected == Some(phase) {
            self.state = LifecycleState::Running { phase };
            Ok(())
        } else {
            Err(self.order_error(phase.as_str()))
        }
    }

    /// Mark the pass completed; only valid after package-info
    ///
    /// # Errors
    /// Returns `PhaseOrder` if package-info has not run yet.
    pub fn complete(&mut self) -> Result<(), RecipeError> {
        if self.current() == Some(Phase::PackageInfo) {
            self.state = LifecycleState::Completed;
            Ok(())
        } else {
            Err(self.order_error("completed"))
        }
    }

    /// Abort in the current phase; a no-op once terminal
    pub fn abort(&mut self, reason: impl Into<String>) {
        if let LifecycleState::Running { phase } = self.state {
            self.state = LifecycleState::Aborted {
                phase,
                reason: reason.into(),
            };
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            LifecycleState::Completed | LifecycleState::Aborted { .. }
        )
    }
}
