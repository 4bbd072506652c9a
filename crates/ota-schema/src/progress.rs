//! Progress events delivered to the presentation sink.

use serde::{Deserialize, Serialize};

/// Phase a progress event belongs to. Percent is monotonic within a phase
/// and may restart at 0 when the phase changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Working directory is being set up.
    Preparing,
    /// Package is being classified and the payload located.
    Locating,
    /// Engine is writing the payload.
    Downloading,
    /// Engine is verifying what it wrote.
    Applying,
    /// Engine is running post-install steps.
    Finalizing,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Preparing => "preparing",
            Self::Locating => "locating",
            Self::Downloading => "installing",
            Self::Applying => "verifying",
            Self::Finalizing => "finalizing",
        };
        f.write_str(label)
    }
}

/// A single user-facing progress report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Phase this event belongs to.
    pub phase: Phase,
    /// 0..=100, or `None` when the phase has no measurable progress.
    pub percent: Option<u8>,
    /// Optional human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Message carried by the consolidated "ready to reboot" event.
pub const READY_TO_REBOOT: &str = "ready to reboot";

impl ProgressEvent {
    /// An event with measurable progress.
    pub fn new(phase: Phase, percent: u8) -> Self {
        Self {
            phase,
            percent: Some(percent.min(100)),
            message: None,
        }
    }

    /// An event signalling "working, no measurable progress".
    pub fn indeterminate(phase: Phase) -> Self {
        Self {
            phase,
            percent: None,
            message: None,
        }
    }

    /// The consolidated event sent once the engine reports the update is in place.
    pub fn ready_to_reboot() -> Self {
        Self::new(Phase::Finalizing, 100).with_message(READY_TO_REBOOT)
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns `true` if the percent field is unset.
    pub fn is_indeterminate(&self) -> bool {
        self.percent.is_none()
    }

    /// Returns `true` for the consolidated "ready to reboot" event.
    pub fn is_ready_to_reboot(&self) -> bool {
        self.phase == Phase::Finalizing && self.percent == Some(100)
    }
}
