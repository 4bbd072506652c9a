//! Status and error codes spoken by the payload-application engine.
//!
//! Both tables are closed enumerations with an explicit `Unknown` variant so
//! codes added by newer engines degrade gracefully instead of mismatching.

use serde::{Deserialize, Serialize};

/// Status reported through the engine's `onStatusUpdate` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineStatus {
    /// Engine is idle.
    Idle,
    /// Engine is checking for an update.
    CheckingForUpdate,
    /// An update is available.
    UpdateAvailable,
    /// Payload is being read and written to the inactive slot.
    Downloading,
    /// Written data is being verified.
    Verifying,
    /// Post-install steps are running.
    Finalizing,
    /// Update applied; a reboot switches slots.
    UpdatedNeedReboot,
    /// Engine hit an error and is reporting it.
    ReportingErrorEvent,
    /// Engine is rolling back.
    AttemptingRollback,
    /// Engine is disabled.
    Disabled,
    /// A status code this build does not know about.
    Unknown(i32),
}

impl EngineStatus {
    /// Map a raw status code to its variant.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Idle,
            1 => Self::CheckingForUpdate,
            2 => Self::UpdateAvailable,
            3 => Self::Downloading,
            4 => Self::Verifying,
            5 => Self::Finalizing,
            6 => Self::UpdatedNeedReboot,
            7 => Self::ReportingErrorEvent,
            8 => Self::AttemptingRollback,
            9 => Self::Disabled,
            other => Self::Unknown(other),
        }
    }

    /// Raw status code.
    pub fn code(self) -> i32 {
        match self {
            Self::Idle => 0,
            Self::CheckingForUpdate => 1,
            Self::UpdateAvailable => 2,
            Self::Downloading => 3,
            Self::Verifying => 4,
            Self::Finalizing => 5,
            Self::UpdatedNeedReboot => 6,
            Self::ReportingErrorEvent => 7,
            Self::AttemptingRollback => 8,
            Self::Disabled => 9,
            Self::Unknown(code) => code,
        }
    }
}

/// Result code delivered once through `onPayloadApplicationComplete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineErrorCode {
    /// Payload applied.
    Success,
    /// Generic failure.
    Error,
    /// Copying a partition failed.
    FilesystemCopierError,
    /// The post-install step failed.
    PostInstallRunnerError,
    /// Payload type does not match the device.
    PayloadMismatchedTypeError,
    /// Target partition could not be opened.
    InstallDeviceOpenError,
    /// Kernel partition could not be opened.
    KernelDeviceOpenError,
    /// Reading the payload failed.
    DownloadTransferError,
    /// Payload hash does not match its header.
    PayloadHashMismatchError,
    /// Payload size does not match its header.
    PayloadSizeMismatchError,
    /// Payload signature verification failed.
    DownloadPayloadVerificationError,
    /// An error code this build does not know about.
    Unknown(i32),
}

impl EngineErrorCode {
    /// Map a raw error code to its variant.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::Error,
            4 => Self::FilesystemCopierError,
            5 => Self::PostInstallRunnerError,
            6 => Self::PayloadMismatchedTypeError,
            7 => Self::InstallDeviceOpenError,
            8 => Self::KernelDeviceOpenError,
            9 => Self::DownloadTransferError,
            10 => Self::PayloadHashMismatchError,
            11 => Self::PayloadSizeMismatchError,
            12 => Self::DownloadPayloadVerificationError,
            other => Self::Unknown(other),
        }
    }

    /// Raw error code.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Error => 1,
            Self::FilesystemCopierError => 4,
            Self::PostInstallRunnerError => 5,
            Self::PayloadMismatchedTypeError => 6,
            Self::InstallDeviceOpenError => 7,
            Self::KernelDeviceOpenError => 8,
            Self::DownloadTransferError => 9,
            Self::PayloadHashMismatchError => 10,
            Self::PayloadSizeMismatchError => 11,
            Self::DownloadPayloadVerificationError => 12,
            Self::Unknown(code) => code,
        }
    }

    /// Returns `true` for [`EngineErrorCode::Success`].
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl std::fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown engine error ({code})"),
            other => write!(f, "{other:?} ({})", other.code()),
        }
    }
}
