//! Subcommand implementations.

pub mod apply;
pub mod classify;
pub mod import;
pub mod inspect;
