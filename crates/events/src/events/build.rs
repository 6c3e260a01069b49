use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Build tool kinds the engine drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    CMake,
    Autotools,
    MsBuild,
    Make,
}

/// Generate and build phase events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuildEvent {
    /// A toolchain or dependency file was written
    GeneratorWritten {
        path: PathBuf,
    },

    CommandStarted {
        program: String,
        args: Vec<String>,
        workdir: PathBuf,
    },

    /// One line of tool output
    CommandOutput {
        line: String,
        stderr: bool,
    },

    CommandCompleted {
        program: String,
        duration: Duration,
    },

    CommandFailed {
        program: String,
        status: Option<i32>,
    },

    StepStarted {
        system: BuildSystem,
        step: String,
    },
}
