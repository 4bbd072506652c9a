//! Events broadcast to listeners outside the reporter sink.

use serde::{Deserialize, Serialize};

/// Session-scoped broadcast events for decoupled listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The package was applied (or handed to recovery).
    InstallFinished {
        /// File name of the installed package.
        package_name: String,
    },
    /// The session failed. Engine failures carry the raw engine code.
    InstallErrored {
        /// Raw engine error code, when the engine reported one.
        error_code: Option<i32>,
    },
    /// The package was fully decompressed into the working directory.
    ExtractFinished,
    /// Decompressing the package failed.
    ExtractErrored,
}
