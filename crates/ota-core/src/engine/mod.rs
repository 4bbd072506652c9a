//! Payload-application engine seam.
//!
//! The engine is an external service. It is asked once to apply a payload
//! and then reports back through a callback: zero or more status updates,
//! then exactly one completion. Here the callback is the sending half of a
//! bounded channel and the orchestrator pulls events from [`EngineHandle`].
//! There is no cancellation; dropping the handle simply stops consumption.

pub mod client;

use crate::error::OtaError;
use async_trait::async_trait;
use ota_schema::{EngineErrorCode, EngineStatus, PayloadLocation};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

pub use client::ClientProcessEngine;

/// Capacity of the engine event channel.
const EVENT_BUFFER: usize = 64;

/// Arguments of the engine's single apply call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRequest {
    /// `file://` URI of the archive (or standalone payload).
    pub source_uri: String,
    /// Start of the payload data within `source_uri`.
    pub offset: u64,
    /// Payload length. 0 reads to the end of the stream.
    pub size: u64,
    /// `KEY=VALUE` header lines, verbatim.
    pub headers: Vec<String>,
}

impl ApplyRequest {
    pub fn new(source_uri: impl Into<String>, location: &PayloadLocation) -> Self {
        Self {
            source_uri: source_uri.into(),
            offset: location.byte_offset,
            size: 0,
            headers: location.property_lines.clone(),
        }
    }
}

/// One callback delivery from the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    Status { status: EngineStatus, fraction: f32 },
    Complete(EngineErrorCode),
}

/// Callback handed to the engine for one bound session.
#[derive(Clone)]
pub struct EngineCallback {
    sender: mpsc::Sender<EngineEvent>,
}

impl fmt::Debug for EngineCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCallback").finish_non_exhaustive()
    }
}

impl EngineCallback {
    pub async fn on_status_update(&self, status: EngineStatus, fraction: f32) {
        if self
            .sender
            .send(EngineEvent::Status { status, fraction })
            .await
            .is_err()
        {
            tracing::debug!("Dropping engine status {status:?}: session no longer listening");
        }
    }

    pub async fn on_payload_application_complete(&self, code: EngineErrorCode) {
        if self.sender.send(EngineEvent::Complete(code)).await.is_err() {
            tracing::debug!("Dropping engine completion {code}: session no longer listening");
        }
    }
}

/// Receiving end of a bound session's events.
#[derive(Debug)]
pub struct EngineHandle {
    receiver: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    /// Next event, or `None` once the engine has released every callback.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.receiver.recv().await
    }
}

/// The external payload-application engine.
#[async_trait]
pub trait PayloadEngine: Send + Sync {
    /// Start applying the payload. Returns once the request is accepted;
    /// progress and the result arrive through `callback`.
    async fn apply_payload(
        &self,
        request: ApplyRequest,
        callback: EngineCallback,
    ) -> Result<(), OtaError>;
}

#[async_trait]
impl<T: PayloadEngine + ?Sized> PayloadEngine for Arc<T> {
    async fn apply_payload(
        &self,
        request: ApplyRequest,
        callback: EngineCallback,
    ) -> Result<(), OtaError> {
        (**self).apply_payload(request, callback).await
    }
}

/// Bind `engine` to a fresh event channel and issue the apply call.
pub async fn bind(
    engine: &dyn PayloadEngine,
    request: ApplyRequest,
) -> Result<EngineHandle, OtaError> {
    let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
    tracing::info!(
        "Binding engine: {} offset={} size={} headers={}",
        request.source_uri,
        request.offset,
        request.size,
        request.headers.len()
    );
    engine
        .apply_payload(request, EngineCallback { sender })
        .await?;
    Ok(EngineHandle { receiver })
}
