//! Event handling and progress display

use crate::logging::log_event_with_tracing;
use console::{Style, Term};
use cpkg_events::{AppEvent, BuildEvent, LifecycleEvent, PackageEvent, SourceEvent};

/// Prints progress lines to stderr and forwards every event to tracing
pub struct EventHandler {
    colors_enabled: bool,
    /// No progress lines; stdout carries the JSON result and stderr the logs
    quiet: bool,
    term: Term,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, quiet: bool) -> Self {
        Self {
            colors_enabled,
            quiet,
            term: Term::stderr(),
        }
    }

    pub fn handle_event(&mut self, event: &AppEvent) {
        log_event_with_tracing(event);
        if self.quiet {
            return;
        }
        if let Some(line) = self.progress_line(event) {
            // A closed stderr is not worth failing the command over
            let _ = self.term.write_line(&line);
        }
    }

    fn progress_line(&self, event: &AppEvent) -> Option<String> {
        let line = match event {
            AppEvent::Lifecycle(LifecycleEvent::Started {
                reference,
                settings,
                ..
            }) => format!(
                "{} {} ({settings})",
                self.style(Style::new().bold(), "==>"),
                self.style(Style::new().bold().cyan(), &reference.to_string())
            ),
            AppEvent::Lifecycle(LifecycleEvent::PhaseStarted { phase, .. }) => {
                format!("  {phase}")
            }
            AppEvent::Lifecycle(LifecycleEvent::Advisory { message, .. }) => format!(
                "  {} {message}",
                self.style(Style::new().yellow(), "warning:")
            ),
            AppEvent::Lifecycle(LifecycleEvent::Aborted { phase, failure, .. }) => format!(
                "  {} in {phase}: {}",
                self.style(Style::new().red().bold(), "failed"),
                failure.message
            ),
            AppEvent::Lifecycle(LifecycleEvent::Completed {
                reference,
                package_id,
                reused,
            }) => {
                let verb = if *reused { "reused" } else { "packaged" };
                format!(
                    "  {} {reference}:{package_id}",
                    self.style(Style::new().green(), verb)
                )
            }
            AppEvent::Source(SourceEvent::DownloadStarted { url, attempt }) if *attempt <= 1 => {
                format!("    downloading {url}")
            }
            AppEvent::Source(SourceEvent::PatchApplied { description }) => {
                format!("    patch: {description}")
            }
            AppEvent::Build(BuildEvent::StepStarted { system, step }) => {
                format!("    {system:?}: {step}")
            }
            AppEvent::Package(PackageEvent::AlreadyCommitted { package_id, .. }) => {
                format!("    {package_id} was committed by another build")
            }
            _ => return None,
        };
        Some(line)
    }

    fn style(&self, style: Style, text: &str) -> String {
        if self.colors_enabled {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpkg_types::Reference;

    #[test]
    fn lifecycle_events_render_plain_lines() {
        let handler = EventHandler::new(false, false);
        let reference = Reference::parse("dlpack/0.8").unwrap();

        let line = handler.progress_line(&AppEvent::Lifecycle(LifecycleEvent::Advisory {
            reference: reference.clone(),
            phase: "validate".to_string(),
            message: "option 'shared' ignored".to_string(),
        }));
        assert_eq!(line.as_deref(), Some("  warning: option 'shared' ignored"));

        let line = handler.progress_line(&AppEvent::Lifecycle(LifecycleEvent::Completed {
            reference,
            package_id: "abc123".to_string(),
            reused: true,
        }));
        assert_eq!(line.as_deref(), Some("  reused dlpack/0.8:abc123"));
    }

    #[test]
    fn noisy_events_have_no_progress_line() {
        let handler = EventHandler::new(false, false);
        let event = AppEvent::Build(BuildEvent::CommandOutput {
            line: "[ 50%] Building C object".to_string(),
            stderr: false,
        });
        assert!(handler.progress_line(&event).is_none());
    }
}
