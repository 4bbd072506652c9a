//! Terminal result of an update session.

use crate::engine::EngineErrorCode;
use serde::{Deserialize, Serialize};

/// Diagnostic code attached to a failed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "engine_code", rename_all = "snake_case")]
pub enum FailureCode {
    /// Copy, read or extract failure.
    Io,
    /// The archive lacks the payload or its properties.
    PayloadNotFound,
    /// The archive carries no known installation markers.
    UnknownPackageFormat,
    /// Failure reported by the payload-application engine, passed through verbatim.
    Engine(EngineErrorCode),
    /// Signature or digest check failed upstream.
    Verification,
    /// Internal sequencing failure.
    Internal,
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io => f.write_str("io"),
            Self::PayloadNotFound => f.write_str("payload-not-found"),
            Self::UnknownPackageFormat => f.write_str("unknown-package-format"),
            Self::Engine(code) => write!(f, "engine {code}"),
            Self::Verification => f.write_str("verification"),
            Self::Internal => f.write_str("internal"),
        }
    }
}

/// Terminal result of a session. A session records at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The update was applied or handed off.
    Success {
        /// Whether the device must reboot to finish.
        reboot_required: bool,
    },
    /// The session failed.
    Failure {
        /// What kind of failure.
        code: FailureCode,
        /// Human-readable detail.
        message: String,
    },
}

impl Outcome {
    /// Build a failure outcome.
    pub fn failure(code: FailureCode, message: impl Into<String>) -> Self {
        Self::Failure {
            code,
            message: message.into(),
        }
    }

    /// Returns `true` for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Engine error code carried by an engine failure, if any.
    pub fn engine_code(&self) -> Option<EngineErrorCode> {
        match self {
            Self::Failure {
                code: FailureCode::Engine(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_code_only_for_engine_failures() {
        let engine = Outcome::failure(
            FailureCode::Engine(EngineErrorCode::PayloadHashMismatchError),
            "hash mismatch",
        );
        assert_eq!(
            engine.engine_code(),
            Some(EngineErrorCode::PayloadHashMismatchError)
        );

        let io = Outcome::failure(FailureCode::Io, "disk full");
        assert_eq!(io.engine_code(), None);
        assert!(!io.is_success());
    }

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_value(Outcome::Success {
            reboot_required: true,
        })
        .unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["reboot_required"], true);
    }
}
