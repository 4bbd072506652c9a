//! Reporter trait for dependency injection
//!
//! The presentation sink for a session. Core logic reports progress and the
//! terminal outcome through it without being coupled to a specific terminal
//! or notification implementation.
//!
//! Sinks must tolerate seeing the same logical completion twice: once as
//! a "ready to reboot" progress event and once as the authoritative
//! [`Outcome::Success`].

use ota_schema::{Outcome, ProgressEvent};

pub trait Reporter: Send + Sync {
    /// A new normalized progress event.
    fn progress(&self, event: &ProgressEvent);

    /// The session's single terminal outcome.
    fn outcome(&self, outcome: &Outcome);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn progress(&self, event: &ProgressEvent) {
        (**self).progress(event);
    }
    fn outcome(&self, outcome: &Outcome) {
        (**self).outcome(outcome);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g., scripting, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn progress(&self, _: &ProgressEvent) {}
    fn outcome(&self, _: &Outcome) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}
