//! Domain-specific errors for the update pipeline

use ota_schema::{EngineErrorCode, FailureCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OtaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Payload not found: archive has no {missing}")]
    PayloadNotFound { missing: &'static str },

    #[error("Unknown package format: no installation markers found")]
    UnknownPackageFormat,

    #[error("Engine reported failure: {code}")]
    Engine { code: EngineErrorCode },

    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("An update session is already running")]
    AlreadyRunning,

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{context}: {message}")]
    Context {
        context: &'static str,
        message: String,
    },
}

impl OtaError {
    /// Create an error with context for better debugging.
    pub fn context(ctx: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::Context {
            context: ctx,
            message: msg.to_string(),
        }
    }

    /// Diagnostic code used when this error terminates a session.
    pub fn failure_code(&self) -> FailureCode {
        match self {
            Self::Io(_) | Self::Archive(_) | Self::Context { .. } => FailureCode::Io,
            Self::PayloadNotFound { .. } => FailureCode::PayloadNotFound,
            Self::UnknownPackageFormat => FailureCode::UnknownPackageFormat,
            Self::Engine { code } => FailureCode::Engine(*code),
            Self::Verification(_) => FailureCode::Verification,
            Self::AlreadyRunning | Self::InvalidState(_) | Self::Config(_) => FailureCode::Internal,
        }
    }
}

impl From<zip::result::ZipError> for OtaError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e),
            other => Self::Archive(other.to_string()),
        }
    }
}
