//! Terminal presentation.

pub mod reporter;

pub use reporter::TerminalReporter;
