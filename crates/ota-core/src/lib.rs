//! OTA update-application pipeline.
//!
//! Given a verified update package on local storage, the pipeline decides
//! how the device installs it, locates the embedded payload for seamless
//! devices, drives the external payload-application engine and folds the
//! engine's event stream into ordered progress plus exactly one outcome.
//!
//! # Architecture
//!
//! - **Selector** (`selector`): classifies a package by marker entries.
//! - **Inspector** (`io::inspect`): finds the payload's byte offset without
//!   decompressing it.
//! - **Session** (`session`): the state machine; owns every invariant about
//!   ordering, latching and terminal immutability.
//! - **Orchestrator** (`orchestrator`): single-flight driver tying the
//!   collaborators together.
//! - **Seams** (`engine`, `legacy`, `download`, `reporter`): traits for the
//!   external engine, recovery entry point, download manager and
//!   presentation sink.

pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod events;
pub mod io;
pub mod legacy;
pub mod orchestrator;
pub mod paths;
pub mod progress;
pub mod reporter;
pub mod selector;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::Config;
pub use error::OtaError;
pub use orchestrator::{SessionHandle, UpdateOrchestrator};
pub use reporter::{NullReporter, Reporter};
pub use session::{SessionId, SessionState, UpdateSession};
