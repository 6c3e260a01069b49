//! Structured logging integration for events
//!
//! Library crates report progress as [`AppEvent`]s; this module turns each
//! one into a tracing record with structured fields.

use cpkg_events::{
    AppEvent, BuildEvent, GeneralEvent, LifecycleEvent, PackageEvent, SourceEvent,
};
use tracing::{debug, error, info, trace, warn};

/// Log an event at the level it carries
pub fn log_event_with_tracing(event: &AppEvent) {
    let source = event.event_source();
    let source = source.as_str();

    match event {
        AppEvent::Lifecycle(lifecycle) => match lifecycle {
            LifecycleEvent::Started {
                reference,
                settings,
                options,
            } => {
                info!(source, reference = %reference, settings = %settings, options = %options, "Recipe pass started");
            }
            LifecycleEvent::PhaseStarted { reference, phase } => {
                debug!(source, reference = %reference, phase = %phase, "Phase started");
            }
            LifecycleEvent::PhaseCompleted {
                reference,
                phase,
                duration,
            } => {
                info!(
                    source,
                    reference = %reference,
                    phase = %phase,
                    duration_ms = duration.as_millis(),
                    "Phase completed"
                );
            }
            LifecycleEvent::PhaseSkipped {
                reference,
                phase,
                reason,
            } => {
                debug!(source, reference = %reference, phase = %phase, reason = %reason, "Phase skipped");
            }
            LifecycleEvent::Advisory {
                reference,
                phase,
                message,
            } => {
                warn!(source, reference = %reference, phase = %phase, "{message}");
            }
            LifecycleEvent::Aborted {
                reference,
                phase,
                failure,
            } => {
                error!(
                    source,
                    reference = %reference,
                    phase = %phase,
                    code = ?failure.code,
                    retryable = failure.retryable,
                    error = %failure.message,
                    "Recipe pass aborted"
                );
            }
            LifecycleEvent::Completed {
                reference,
                package_id,
                reused,
            } => {
                info!(source, reference = %reference, package_id = %package_id, reused, "Package available");
            }
        },

        AppEvent::Source(source_event) => match source_event {
            SourceEvent::DownloadStarted { url, attempt } => {
                info!(source, url = %url, attempt, "Download started");
            }
            SourceEvent::DownloadCompleted { url, bytes } => {
                info!(source, url = %url, bytes, "Download completed");
            }
            SourceEvent::DownloadRetry {
                url,
                attempt,
                error,
            } => {
                warn!(source, url = %url, attempt, error = %error, "Download failed, retrying");
            }
            SourceEvent::CacheHit { path } => {
                info!(source, path = %path.display(), "Reusing downloaded archive");
            }
            SourceEvent::Verified { path, checksum } => {
                debug!(source, path = %path.display(), checksum = %checksum, "Checksum verified");
            }
            SourceEvent::Extracted {
                archive,
                destination,
                entries,
            } => {
                info!(
                    source,
                    archive = %archive.display(),
                    destination = %destination.display(),
                    entries,
                    "Archive extracted"
                );
            }
            SourceEvent::PatchApplied { description } => {
                info!(source, patch = %description, "Patch applied");
            }
        },

        AppEvent::Build(build) => match build {
            BuildEvent::GeneratorWritten { path } => {
                debug!(source, path = %path.display(), "Generated file written");
            }
            BuildEvent::CommandStarted {
                program,
                args,
                workdir,
            } => {
                debug!(
                    source,
                    program = %program,
                    args = ?args,
                    workdir = %workdir.display(),
                    "Running command"
                );
            }
            BuildEvent::CommandOutput { line, stderr } => {
                trace!(source, stderr, "{line}");
            }
            BuildEvent::CommandCompleted { program, duration } => {
                info!(source, program = %program, duration_ms = duration.as_millis(), "Command finished");
            }
            BuildEvent::CommandFailed { program, status } => {
                error!(source, program = %program, status = ?status, "Command failed");
            }
            BuildEvent::StepStarted { system, step } => {
                info!(source, system = ?system, step = %step, "Build step");
            }
        },

        AppEvent::Package(package) => match package {
            PackageEvent::FilesCopied { pattern, count } => {
                debug!(source, pattern = %pattern, count, "Files copied");
            }
            PackageEvent::Removed { path } => {
                debug!(source, path = %path.display(), "Removed from package");
            }
            PackageEvent::Committed {
                reference,
                package_id,
                path,
            } => {
                info!(
                    source,
                    reference = %reference,
                    package_id = %package_id,
                    path = %path.display(),
                    "Package committed"
                );
            }
            PackageEvent::AlreadyCommitted {
                reference,
                package_id,
            } => {
                info!(source, reference = %reference, package_id = %package_id, "Package already committed");
            }
            PackageEvent::MetadataRefreshed {
                reference,
                package_id,
            } => {
                info!(source, reference = %reference, package_id = %package_id, "Package metadata refreshed");
            }
        },

        AppEvent::General(general) => match general {
            GeneralEvent::Warning { message } => {
                warn!(source, "{message}");
            }
            GeneralEvent::Error { message } => {
                error!(source, "{message}");
            }
        },
    }
}
