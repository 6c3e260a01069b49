#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in cpkg
//!
//! Library crates never print or log directly. They emit [`AppEvent`]s into
//! an unbounded channel and the front end decides how to render them. The
//! CLI forwards each event to `tracing`; [`AppEvent::log_level`] is the
//! severity it logs at.

pub mod meta;
pub use meta::EventSource;

pub mod events;
pub use events::{
    AppEvent, BuildEvent, BuildSystem, FailureContext, GeneralEvent, LifecycleEvent,
    PackageEvent, SourceEvent,
};

use cpkg_types::Reference;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender using the `AppEvent` system
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver using the `AppEvent` system
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events
///
/// Implemented by the raw [`EventSender`] and by any struct that carries an
/// optional sender.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // A dropped receiver only means nobody is listening
            let _ = sender.send(event);
        }
    }

    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    fn emit_phase_started(&self, reference: &Reference, phase: impl Into<String>) {
        self.emit(AppEvent::Lifecycle(LifecycleEvent::PhaseStarted {
            reference: reference.clone(),
            phase: phase.into(),
        }));
    }

    fn emit_phase_completed(
        &self,
        reference: &Reference,
        phase: impl Into<String>,
        duration: Duration,
    ) {
        self.emit(AppEvent::Lifecycle(LifecycleEvent::PhaseCompleted {
            reference: reference.clone(),
            phase: phase.into(),
            duration,
        }));
    }

    fn emit_phase_skipped(
        &self,
        reference: &Reference,
        phase: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.emit(AppEvent::Lifecycle(LifecycleEvent::PhaseSkipped {
            reference: reference.clone(),
            phase: phase.into(),
            reason: reason.into(),
        }));
    }

    fn emit_advisory(
        &self,
        reference: &Reference,
        phase: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.emit(AppEvent::Lifecycle(LifecycleEvent::Advisory {
            reference: reference.clone(),
            phase: phase.into(),
            message: message.into(),
        }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
