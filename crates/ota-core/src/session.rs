//! Update session state machine.
//!
//! ```text
//! Idle -> Preparing -> Locating -> Applying -> Finalizing -> NeedReboot
//!              \            \           \            \
//!               +------------+-----------+------------+--> Error
//!
//! Preparing --[legacy handoff]--> NeedReboot
//! ```
//!
//! `NeedReboot` and `Error` are terminal. Once a session records its
//! [`Outcome`] every further call is a no-op: late engine callbacks neither
//! change state nor produce events.

use crate::error::OtaError;
use crate::progress::{ProgressTracker, map_status};
use ota_schema::{
    EngineErrorCode, EngineStatus, FailureCode, Mechanism, Outcome, PayloadLocation, Phase,
    ProgressEvent, UpdatePackage,
};

/// Identifier of a session within this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Preparing,
    Locating,
    Applying,
    Finalizing,
    NeedReboot,
    Error,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::NeedReboot | Self::Error)
    }

    fn can_advance_to(self, next: Self) -> bool {
        use SessionState::{Applying, Error, Finalizing, Idle, Locating, NeedReboot, Preparing};
        matches!(
            (self, next),
            (Idle, Preparing)
                | (Preparing, Locating)
                | (Locating, Applying)
                | (Applying, Finalizing)
                | (Preparing | Applying | Finalizing, NeedReboot)
                | (Preparing | Locating | Applying | Finalizing, Error)
        )
    }
}

/// One attempt at applying one package.
#[derive(Debug)]
pub struct UpdateSession {
    id: SessionId,
    package: UpdatePackage,
    mechanism: Option<Mechanism>,
    state: SessionState,
    location: Option<PayloadLocation>,
    engine_bound: bool,
    error_latched: bool,
    tracker: ProgressTracker,
    outcome: Option<Outcome>,
}

impl UpdateSession {
    pub fn new(id: SessionId, package: UpdatePackage) -> Self {
        Self {
            id,
            package,
            mechanism: None,
            state: SessionState::Idle,
            location: None,
            engine_bound: false,
            error_latched: false,
            tracker: ProgressTracker::new(),
            outcome: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn package(&self) -> &UpdatePackage {
        &self.package
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mechanism(&self) -> Option<Mechanism> {
        self.mechanism
    }

    pub fn location(&self) -> Option<&PayloadLocation> {
        self.location.as_ref()
    }

    pub fn error_latched(&self) -> bool {
        self.error_latched
    }

    pub fn engine_bound(&self) -> bool {
        self.engine_bound
    }

    /// Percent of the last progress event that reached the sink.
    pub fn last_percent(&self) -> Option<u8> {
        self.tracker.last_percent()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to a non-terminal state.
    pub fn advance(&mut self, next: SessionState) -> Result<(), OtaError> {
        if next.is_terminal() || !self.state.can_advance_to(next) {
            return Err(OtaError::InvalidState(format!(
                "session {} cannot move from {:?} to {next:?}",
                self.id, self.state
            )));
        }
        tracing::debug!("Session {}: {:?} -> {next:?}", self.id, self.state);
        self.state = next;
        Ok(())
    }

    /// Fix the installation mechanism. Allowed once, before any engine or
    /// installer call.
    pub fn set_mechanism(&mut self, mechanism: Mechanism) -> Result<(), OtaError> {
        if self.mechanism.is_some() || self.engine_bound || self.is_terminal() {
            return Err(OtaError::InvalidState(format!(
                "session {} mechanism is already fixed",
                self.id
            )));
        }
        self.mechanism = Some(mechanism);
        Ok(())
    }

    /// Record the payload location. Allowed once per session.
    pub fn record_location(&mut self, location: PayloadLocation) -> Result<(), OtaError> {
        if self.location.is_some() {
            return Err(OtaError::InvalidState(format!(
                "session {} payload location already computed",
                self.id
            )));
        }
        self.location = Some(location);
        Ok(())
    }

    /// Mark the engine as bound. A second bind is a logic error.
    pub fn mark_bound(&mut self) -> Result<(), OtaError> {
        if self.engine_bound {
            return Err(OtaError::InvalidState(format!(
                "session {} engine already bound",
                self.id
            )));
        }
        if self.mechanism != Some(Mechanism::SeamlessAb) || self.location.is_none() {
            return Err(OtaError::InvalidState(format!(
                "session {} cannot bind without a located seamless payload",
                self.id
            )));
        }
        self.engine_bound = true;
        Ok(())
    }

    /// Pass a locally generated progress event through the tracker.
    pub fn report(&mut self, event: ProgressEvent) -> Option<ProgressEvent> {
        if self.is_terminal() || self.error_latched {
            return None;
        }
        self.tracker.accept(event)
    }

    /// Feed a status update from the engine.
    ///
    /// Returns the progress event to forward to the sink, if any.
    pub fn on_status_update(&mut self, status: EngineStatus, fraction: f32) -> Option<ProgressEvent> {
        if self.is_terminal() || !self.engine_bound {
            return None;
        }

        if status == EngineStatus::ReportingErrorEvent {
            if !self.error_latched {
                tracing::warn!("Session {}: engine reported an error event", self.id);
            }
            self.error_latched = true;
            return None;
        }

        let event = map_status(status, fraction, self.error_latched)?;
        if event.phase == Phase::Finalizing && self.state == SessionState::Applying {
            self.state = SessionState::Finalizing;
            tracing::debug!("Session {}: Applying -> Finalizing", self.id);
        }
        self.tracker.accept(event)
    }

    /// Feed the engine's one-time completion callback.
    ///
    /// An error latched earlier wins over a late success code.
    pub fn on_complete(&mut self, code: EngineErrorCode) -> Option<Outcome> {
        if self.is_terminal() || !self.engine_bound {
            return None;
        }

        if code.is_success() && !self.error_latched {
            self.finish(SessionState::NeedReboot, Outcome::Success {
                reboot_required: true,
            })
        } else if code.is_success() {
            self.finish(
                SessionState::Error,
                Outcome::failure(
                    FailureCode::Engine(EngineErrorCode::Error),
                    "engine reported an error event before completing",
                ),
            )
        } else {
            self.finish(
                SessionState::Error,
                Outcome::failure(FailureCode::Engine(code), format!("engine reported {code}")),
            )
        }
    }

    /// The recovery entry point accepted the package.
    pub fn on_handoff(&mut self) -> Option<Outcome> {
        if self.mechanism != Some(Mechanism::LegacyRecovery) {
            return None;
        }
        self.finish(SessionState::NeedReboot, Outcome::Success {
            reboot_required: true,
        })
    }

    /// Terminate with a locally detected failure.
    pub fn fail(&mut self, error: &OtaError) -> Option<Outcome> {
        self.finish(
            SessionState::Error,
            Outcome::failure(error.failure_code(), error.to_string()),
        )
    }

    fn finish(&mut self, terminal: SessionState, outcome: Outcome) -> Option<Outcome> {
        if self.is_terminal() || !self.state.can_advance_to(terminal) {
            return None;
        }
        tracing::info!("Session {}: {:?} -> {terminal:?}", self.id, self.state);
        self.state = terminal;
        self.outcome = Some(outcome.clone());
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn located_session() -> UpdateSession {
        let package = UpdatePackage::new("update.zip", PathBuf::from("/tmp/update.zip"), 1024);
        let mut session = UpdateSession::new(SessionId(1), package);
        session.advance(SessionState::Preparing).unwrap();
        session.advance(SessionState::Locating).unwrap();
        session.set_mechanism(Mechanism::SeamlessAb).unwrap();
        session
            .record_location(PayloadLocation {
                byte_offset: 168,
                property_lines: vec!["FILE_SIZE=1000".into()],
            })
            .unwrap();
        session.advance(SessionState::Applying).unwrap();
        session.mark_bound().unwrap();
        session
    }

    #[test]
    fn test_happy_path() {
        let mut session = located_session();

        let first = session.on_status_update(EngineStatus::Downloading, 0.5).unwrap();
        assert_eq!(first.percent, Some(50));
        assert_eq!(session.last_percent(), Some(50));

        let finalizing = session.on_status_update(EngineStatus::Finalizing, 0.0).unwrap();
        assert!(finalizing.is_indeterminate());
        assert_eq!(session.state(), SessionState::Finalizing);

        let outcome = session.on_complete(EngineErrorCode::Success).unwrap();
        assert_eq!(outcome, Outcome::Success {
            reboot_required: true
        });
        assert_eq!(session.state(), SessionState::NeedReboot);
    }

    #[test]
    fn test_first_error_wins() {
        let mut session = located_session();
        assert!(session.on_status_update(EngineStatus::Downloading, 0.2).is_some());

        assert!(session
            .on_status_update(EngineStatus::ReportingErrorEvent, 0.0)
            .is_none());
        assert!(session.error_latched());
        assert_eq!(session.state(), SessionState::Applying);

        assert!(session.on_status_update(EngineStatus::Downloading, 0.9).is_none());
        assert!(session.on_status_update(EngineStatus::Finalizing, 1.0).is_none());

        let outcome = session.on_complete(EngineErrorCode::Success).unwrap();
        assert!(!outcome.is_success());
        assert_eq!(session.state(), SessionState::Error);
    }

    #[test]
    fn test_engine_code_passes_through() {
        let mut session = located_session();
        let outcome = session
            .on_complete(EngineErrorCode::PayloadHashMismatchError)
            .unwrap();
        assert_eq!(
            outcome.engine_code(),
            Some(EngineErrorCode::PayloadHashMismatchError)
        );
    }

    #[test]
    fn test_terminal_state_ignores_late_callbacks() {
        let mut session = located_session();
        session.on_complete(EngineErrorCode::Success).unwrap();
        let before = session.outcome().cloned();

        assert!(session.on_status_update(EngineStatus::Downloading, 0.7).is_none());
        assert!(session.on_complete(EngineErrorCode::Error).is_none());
        assert!(session.fail(&OtaError::AlreadyRunning).is_none());

        assert_eq!(session.state(), SessionState::NeedReboot);
        assert_eq!(session.outcome().cloned(), before);
    }

    #[test]
    fn test_mechanism_is_fixed_once() {
        let mut session = located_session();
        assert!(session.set_mechanism(Mechanism::LegacyRecovery).is_err());
        assert_eq!(session.mechanism(), Some(Mechanism::SeamlessAb));
    }

    #[test]
    fn test_location_is_recorded_once() {
        let mut session = located_session();
        let again = PayloadLocation {
            byte_offset: 0,
            property_lines: Vec::new(),
        };
        assert!(session.record_location(again).is_err());
        assert_eq!(session.location().unwrap().byte_offset, 168);
    }

    #[test]
    fn test_second_bind_is_rejected() {
        let mut session = located_session();
        assert!(matches!(session.mark_bound(), Err(OtaError::InvalidState(_))));
    }

    #[test]
    fn test_illegal_transition() {
        let package = UpdatePackage::new("update.zip", PathBuf::from("/tmp/update.zip"), 1);
        let mut session = UpdateSession::new(SessionId(2), package);
        assert!(session.advance(SessionState::Applying).is_err());
        assert!(session.advance(SessionState::NeedReboot).is_err());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_legacy_handoff() {
        let package = UpdatePackage::new("legacy.zip", PathBuf::from("/tmp/legacy.zip"), 1);
        let mut session = UpdateSession::new(SessionId(3), package);
        session.advance(SessionState::Preparing).unwrap();
        session.set_mechanism(Mechanism::LegacyRecovery).unwrap();

        assert!(session.mark_bound().is_err());
        assert!(session.on_complete(EngineErrorCode::Success).is_none());
        assert_eq!(session.state(), SessionState::Preparing);
        let outcome = session.on_handoff().unwrap();
        assert!(outcome.is_success());
        assert_eq!(session.state(), SessionState::NeedReboot);
    }

    #[test]
    fn test_handoff_requires_legacy_mechanism() {
        let package = UpdatePackage::new("update.zip", PathBuf::from("/tmp/update.zip"), 1);
        let mut session = UpdateSession::new(SessionId(5), package);
        session.advance(SessionState::Preparing).unwrap();
        session.set_mechanism(Mechanism::SeamlessAb).unwrap();
        session.advance(SessionState::Locating).unwrap();

        assert!(session.on_handoff().is_none());
        assert_eq!(session.state(), SessionState::Locating);
    }

    #[test]
    fn test_local_failure_from_preparing() {
        let package = UpdatePackage::new("update.zip", PathBuf::from("/tmp/update.zip"), 1);
        let mut session = UpdateSession::new(SessionId(4), package);
        session.advance(SessionState::Preparing).unwrap();

        let err = OtaError::Io(std::io::Error::other("read-only file system"));
        let outcome = session.fail(&err).unwrap();
        assert_eq!(session.state(), SessionState::Error);
        assert!(matches!(outcome, Outcome::Failure {
            code: FailureCode::Io,
            ..
        }));
    }
}
