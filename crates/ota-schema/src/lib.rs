//! Shared value types for the OTA update-application pipeline.
//!
//! These types cross every boundary of the pipeline: the core library
//! produces them, presentation sinks and broadcast listeners consume them,
//! and the CLI serializes them for scripting.

pub mod engine;
pub mod event;
pub mod outcome;
pub mod package;
pub mod progress;

// Re-exports
pub use engine::{EngineErrorCode, EngineStatus};
pub use event::PipelineEvent;
pub use outcome::{FailureCode, Outcome};
pub use package::{Mechanism, PayloadLocation, UpdatePackage};
pub use progress::{Phase, ProgressEvent};

/// Archive entry holding the binary payload applied by the engine.
pub const PAYLOAD_ENTRY: &str = "payload.bin";

/// Archive entry holding the `KEY=VALUE` header lines the engine requires.
pub const PROPERTIES_ENTRY: &str = "payload_properties.txt";

/// Archive entry listing the blocks to verify after a seamless update.
pub const CARE_MAP_ENTRY: &str = "care_map.txt";

/// Fixed part of a zip local file header (signature through extra length).
pub const LOCAL_HEADER_LEN: u64 = 30;
