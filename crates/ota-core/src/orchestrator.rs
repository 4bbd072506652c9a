//! Update orchestration.
//!
//! [`UpdateOrchestrator`] owns the process's only live [`UpdateSession`] and
//! drives it on a spawned task:
//!
//! 1. **Preparing** - recreate the private working directory, when
//!    configured decompress the whole package into it, then classify the
//!    package. Legacy packages are handed to recovery from here and never
//!    reach the engine.
//! 2. **Locating** - stage the seamless package (or pick the extracted
//!    payload) and compute the payload location.
//! 3. **Applying** - bind the engine once and fold its events into progress
//!    until the completion callback arrives.
//!
//! # Implementation Note:
//! `start` is rejected while the current session is non-terminal or its
//! task is still finishing up (removing the working directory, publishing
//! the outcome). The session lock is never held across an await point.
//! Every failure becomes the session's terminal [`Outcome`]; nothing
//! escapes the spawned task.

use crate::config::Config;
use crate::engine::{self, ApplyRequest, EngineEvent, PayloadEngine};
use crate::error::OtaError;
use crate::events::EventBus;
use crate::io::extract::{self, ExtractedFile};
use crate::io::inspect::{PackageInspector, PayloadSource};
use crate::io::workdir;
use crate::legacy::LegacyInstaller;
use crate::paths;
use crate::reporter::Reporter;
use crate::selector;
use crate::session::{SessionId, SessionState, UpdateSession};
use ota_schema::{
    FailureCode, Mechanism, Outcome, PayloadLocation, Phase, PipelineEvent, ProgressEvent,
    UpdatePackage,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, oneshot};

/// Sub-directory of the working directory used by the extraction variant.
pub const EXTRACT_DIR: &str = "unzipped";

type SharedSession = Arc<Mutex<Option<UpdateSession>>>;

/// Extraction directory and the files written into it.
type Extraction = (PathBuf, Vec<ExtractedFile>);

/// Set while a session task runs; cleared when the task ends, even by panic.
struct Busy(Arc<AtomicBool>);

impl Drop for Busy {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a started session.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    outcome: oneshot::Receiver<Outcome>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Wait for the terminal outcome.
    ///
    /// `None` if the engine went away without ever reporting completion; the
    /// session then stays in `Applying`.
    pub async fn wait(self) -> Option<Outcome> {
        self.outcome.await.ok()
    }
}

/// Single-flight driver of update sessions.
pub struct UpdateOrchestrator {
    config: Config,
    engine: Arc<dyn PayloadEngine>,
    installer: Arc<dyn LegacyInstaller>,
    reporter: Arc<dyn Reporter>,
    events: EventBus,
    session: SharedSession,
    busy: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for UpdateOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateOrchestrator")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl UpdateOrchestrator {
    pub fn new(
        config: Config,
        engine: Arc<dyn PayloadEngine>,
        installer: Arc<dyn LegacyInstaller>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            config,
            engine,
            installer,
            reporter,
            events: EventBus::new(),
            session: Arc::new(Mutex::new(None)),
            busy: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// State of the current (or most recent) session.
    pub fn state(&self) -> Option<SessionState> {
        self.session
            .lock()
            .ok()
            .and_then(|s| s.as_ref().map(UpdateSession::state))
    }

    /// Whether a non-terminal session exists or a session task has not yet
    /// finished its cleanup.
    pub fn is_active(&self) -> bool {
        self.busy.load(Ordering::Acquire) || self.state().is_some_and(|s| !s.is_terminal())
    }

    /// Start a session for `package`. Must be called inside a Tokio runtime.
    ///
    /// Returns `AlreadyRunning` without touching the active session if one
    /// is in progress.
    pub fn start(&self, package: UpdatePackage) -> Result<SessionHandle, OtaError> {
        let mut slot = self
            .session
            .lock()
            .map_err(|_| OtaError::InvalidState("session lock poisoned".into()))?;

        if let Some(active) = slot.as_ref().filter(|s| !s.is_terminal()) {
            tracing::warn!(
                "Rejecting {}: session {} is {:?}",
                package.file_name(),
                active.id(),
                active.state()
            );
            return Err(OtaError::AlreadyRunning);
        }
        if self.busy.load(Ordering::Acquire) {
            tracing::warn!(
                "Rejecting {}: previous session is still finishing",
                package.file_name()
            );
            return Err(OtaError::AlreadyRunning);
        }

        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut session = UpdateSession::new(id, package.clone());
        session.advance(SessionState::Preparing)?;
        *slot = Some(session);
        self.busy.store(true, Ordering::Release);
        let busy = Busy(Arc::clone(&self.busy));
        drop(slot);

        tracing::info!("Session {id}: starting {}", package.file_name());
        let (tx, rx) = oneshot::channel();
        let runner = Runner {
            id,
            package,
            config: self.config.clone(),
            engine: Arc::clone(&self.engine),
            installer: Arc::clone(&self.installer),
            reporter: Arc::clone(&self.reporter),
            events: self.events.clone(),
            session: Arc::clone(&self.session),
        };
        tokio::spawn(async move {
            let outcome = runner.run().await;
            drop(busy);
            if let Some(outcome) = outcome {
                let _ = tx.send(outcome);
            }
        });

        Ok(SessionHandle { id, outcome: rx })
    }
}

/// Everything one session task needs.
struct Runner {
    id: SessionId,
    package: UpdatePackage,
    config: Config,
    engine: Arc<dyn PayloadEngine>,
    installer: Arc<dyn LegacyInstaller>,
    reporter: Arc<dyn Reporter>,
    events: EventBus,
    session: SharedSession,
}

impl Runner {
    async fn run(self) -> Option<Outcome> {
        let outcome = match self.drive().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Session {}: {e}", self.id);
                self.with_session(|s| s.fail(&e)).flatten()
            }
        };

        match &outcome {
            Some(outcome) => self.finish(outcome),
            None => tracing::warn!(
                "Session {}: engine released the session without completing",
                self.id
            ),
        }
        outcome
    }

    async fn drive(&self) -> Result<Option<Outcome>, OtaError> {
        self.report(ProgressEvent::indeterminate(Phase::Preparing));
        let extracted = self.prepare().await?;

        let archive = self.package.absolute_path().to_path_buf();
        let mechanism = blocking(move || selector::classify_archive(&archive)).await?;
        self.with_session(|s| s.set_mechanism(mechanism))
            .unwrap_or_else(|| Err(self.lost()))?;
        tracing::info!("Session {}: mechanism {mechanism}", self.id);

        match mechanism {
            Mechanism::LegacyRecovery => self.hand_off().await,
            Mechanism::SeamlessAb => {
                self.advance(SessionState::Locating)?;
                self.report(ProgressEvent::indeterminate(Phase::Locating));
                self.apply(extracted).await
            }
        }
    }

    /// Preparing. Returns the extraction directory and its files when the
    /// package was decompressed.
    async fn prepare(&self) -> Result<Option<Extraction>, OtaError> {
        let work_dir = self.config.work_dir.clone();
        let extract_to = self
            .config
            .extract_before_apply
            .then(|| work_dir.join(EXTRACT_DIR));
        let archive = self.package.absolute_path().to_path_buf();

        let extracting = extract_to.is_some();
        let result = blocking(move || {
            workdir::prepare(&work_dir)?;
            match extract_to {
                Some(dest) => {
                    let files = extract::extract_zip(&archive, &dest)?;
                    Ok(Some((dest, files)))
                }
                None => Ok(None),
            }
        })
        .await;

        match (&result, extracting) {
            (Err(_), true) => self.events.publish(PipelineEvent::ExtractErrored),
            (Ok(_), true) => self.events.publish(PipelineEvent::ExtractFinished),
            (_, false) => {}
        }
        result
    }

    async fn hand_off(&self) -> Result<Option<Outcome>, OtaError> {
        self.reporter
            .info(&format!("Handing {} to recovery", self.package.file_name()));

        let installer = Arc::clone(&self.installer);
        let package = self.package.absolute_path().to_path_buf();
        blocking(move || installer.install(&package)).await?;

        Ok(self.with_session(UpdateSession::on_handoff).flatten())
    }

    async fn apply(&self, extracted: Option<Extraction>) -> Result<Option<Outcome>, OtaError> {
        let (location, payload) = self.locate(extracted).await?;
        self.with_session(|s| s.record_location(location.clone()))
            .unwrap_or_else(|| Err(self.lost()))?;

        self.advance(SessionState::Applying)?;
        self.with_session(UpdateSession::mark_bound)
            .unwrap_or_else(|| Err(self.lost()))?;

        let request = ApplyRequest::new(paths::file_uri(&payload), &location);
        let mut handle = engine::bind(self.engine.as_ref(), request).await?;

        while let Some(event) = handle.next_event().await {
            match event {
                EngineEvent::Status { status, fraction } => {
                    tracing::debug!("Session {}: status {status:?} {fraction}", self.id);
                    let forwarded = self
                        .with_session(|s| s.on_status_update(status, fraction))
                        .flatten();
                    if let Some(progress) = forwarded {
                        self.reporter.progress(&progress);
                    }
                }
                EngineEvent::Complete(code) => {
                    tracing::info!("Session {}: engine completed with {code}", self.id);
                    return Ok(self.with_session(|s| s.on_complete(code)).flatten());
                }
            }
        }

        Ok(None)
    }

    /// Stage (or use the extracted payload) and compute the location once.
    async fn locate(
        &self,
        extracted: Option<Extraction>,
    ) -> Result<(PayloadLocation, PathBuf), OtaError> {
        let package = self.package.clone();
        let work_dir = self.config.work_dir.clone();

        blocking(move || {
            let source = match extracted {
                Some((dir, files)) => extract::extracted_source(&dir, &files)?,
                None => PayloadSource::Archive(workdir::stage(&package, &work_dir)?),
            };
            let inspector = PackageInspector::new(source);
            let location = inspector.locate()?.clone();
            Ok((location, inspector.source().payload_path()))
        })
        .await
    }

    fn finish(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Success { .. } => {
                if let Err(e) = workdir::remove(&self.config.work_dir) {
                    tracing::warn!("Failed to remove working directory: {e}");
                }
                self.events.publish(PipelineEvent::InstallFinished {
                    package_name: self.package.file_name().to_string(),
                });
            }
            Outcome::Failure { code, .. } => {
                let bound = self.with_session(|s| s.engine_bound()).unwrap_or(false);
                if *code == FailureCode::Io && !bound {
                    if let Err(e) = workdir::remove(&self.config.work_dir) {
                        tracing::warn!("Failed to remove working directory: {e}");
                    }
                }
                self.events.publish(PipelineEvent::InstallErrored {
                    error_code: outcome.engine_code().map(|c| c.code()),
                });
            }
        }
        self.reporter.outcome(outcome);
    }

    fn report(&self, event: ProgressEvent) {
        if let Some(event) = self.with_session(|s| s.report(event)).flatten() {
            self.reporter.progress(&event);
        }
    }

    fn advance(&self, next: SessionState) -> Result<(), OtaError> {
        self.with_session(|s| s.advance(next))
            .unwrap_or_else(|| Err(self.lost()))
    }

    /// Run `f` against this runner's session, if it is still the live one.
    fn with_session<R>(&self, f: impl FnOnce(&mut UpdateSession) -> R) -> Option<R> {
        let mut slot = self.session.lock().ok()?;
        slot.as_mut().filter(|s| s.id() == self.id).map(f)
    }

    fn lost(&self) -> OtaError {
        OtaError::InvalidState(format!("session {} is no longer current", self.id))
    }
}

async fn blocking<T, F>(f: F) -> Result<T, OtaError>
where
    F: FnOnce() -> Result<T, OtaError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| OtaError::Io(std::io::Error::other(e)))?
}
