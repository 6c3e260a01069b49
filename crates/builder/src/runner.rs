//! External command execution
//!
//! Build drivers never spawn processes themselves. They describe a
//! [`CommandSpec`] and hand it to a [`CommandRunner`], which lets the engine
//! run real tools or record the invocations in tests.

use async_trait::async_trait;
use cpkg_errors::{BuildError, Error};
use cpkg_events::{AppEvent, BuildEvent, EventEmitter, EventSender};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A fully described process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Added on top of the inherited environment
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    #[must_use]
    pub fn envs(mut self, env: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    #[must_use]
    pub fn env(mut self, name: &str, value: impl Into<String>) -> Self {
        self.env.insert(name.to_string(), value.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// The last lines of stderr, for error messages
    #[must_use]
    pub fn stderr_tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.stderr.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }
}

/// Runs external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion
    ///
    /// A non-zero exit is not an error at this level; callers map it to the
    /// failure of the step they were running.
    ///
    /// # Errors
    /// Returns `BuildError::ToolNotFound` if the program cannot be located, or
    /// an I/O error if the process cannot be spawned.
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, Error>;
}

/// Spawns real processes with `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    events: Option<EventSender>,
}

impl SystemRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    fn locate(program: &str) -> Result<PathBuf, Error> {
        let path = Path::new(program);
        if path.components().count() > 1 {
            return Ok(path.to_path_buf());
        }
        which::which(program).map_err(|_| {
            BuildError::ToolNotFound {
                tool: program.to_string(),
            }
            .into()
        })
    }
}

impl EventEmitter for SystemRunner {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, Error> {
        let program = Self::locate(&command.program)?;

        self.emit(AppEvent::Build(BuildEvent::CommandStarted {
            program: command.program.clone(),
            args: command.args.clone(),
            workdir: command.cwd.clone(),
        }));
        let started = Instant::now();

        let output = tokio::process::Command::new(&program)
            .args(&command.args)
            .envs(&command.env)
            .current_dir(&command.cwd)
            .output()
            .await
            .map_err(|e| Error::io_with_path(&e, &program))?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        for line in result.stdout.lines() {
            self.emit(AppEvent::Build(BuildEvent::CommandOutput {
                line: line.to_string(),
                stderr: false,
            }));
        }
        for line in result.stderr.lines() {
            self.emit(AppEvent::Build(BuildEvent::CommandOutput {
                line: line.to_string(),
                stderr: true,
            }));
        }

        if result.success() {
            self.emit(AppEvent::Build(BuildEvent::CommandCompleted {
                program: command.program.clone(),
                duration: started.elapsed(),
            }));
        } else {
            self.emit(AppEvent::Build(BuildEvent::CommandFailed {
                program: command.program.clone(),
                status: result.status,
            }));
        }

        Ok(result)
    }
}

type Hook = Arc<dyn Fn(&CommandSpec) -> CommandOutput + Send + Sync>;

/// Records every command instead of running it
///
/// Each command succeeds unless a hook says otherwise. Hooks can also create
/// files to stand in for what the real tool would have produced.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    commands: Arc<Mutex<Vec<CommandSpec>>>,
    hook: Option<Hook>,
}

impl fmt::Debug for RecordingRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingRunner")
            .field("commands", &self.commands())
            .finish_non_exhaustive()
    }
}

impl RecordingRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CommandSpec) -> CommandOutput + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Commands run so far, in order
    #[must_use]
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands
            .lock()
            .map(|commands| commands.clone())
            .unwrap_or_default()
    }

    /// Rendered command lines, handy for assertions
    #[must_use]
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(ToString::to_string).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, Error> {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.clone());
        }
        Ok(match &self.hook {
            Some(hook) => hook(command),
            None => CommandOutput {
                status: Some(0),
                ..CommandOutput::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_runner_keeps_order() {
        let runner = RecordingRunner::new();
        let first = CommandSpec::new("cmake", "/tmp").args(["--build", "."]);
        let second = CommandSpec::new("cmake", "/tmp").arg("--install");
        assert!(runner.run(&first).await.unwrap().success());
        runner.run(&second).await.unwrap();
        assert_eq!(
            runner.command_lines(),
            ["cmake --build .", "cmake --install"]
        );
    }

    #[tokio::test]
    async fn hooks_decide_the_outcome() {
        let runner = RecordingRunner::new().with_hook(|cmd| CommandOutput {
            status: Some(i32::from(cmd.program == "make") * 2),
            stdout: String::new(),
            stderr: "error: boom\n".into(),
        });
        let output = runner.run(&CommandSpec::new("make", ".")).await.unwrap();
        assert!(!output.success());
        assert_eq!(output.stderr_tail(1), "error: boom");
    }

    #[tokio::test]
    async fn missing_tools_are_reported() {
        let runner = SystemRunner::new();
        let err = runner
            .run(&CommandSpec::new("cpkg-no-such-tool-0f3a", "."))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::ToolNotFound { ref tool }) if tool == "cpkg-no-such-tool-0f3a"
        ));
    }
}
