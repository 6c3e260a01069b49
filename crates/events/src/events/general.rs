use serde::{Deserialize, Serialize};

/// Warnings and errors that belong to no particular phase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    Warning { message: String },

    Error { message: String },
}

impl GeneralEvent {
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
