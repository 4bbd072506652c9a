//! ota - apply OTA update packages
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Command-line front end for the update-application pipeline.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.ota/
//! ├── config.toml   # Optional configuration
//! ├── updates/      # Verified packages
//! ├── work/         # Private working directory of the active session
//! └── recovery/     # Recovery command file for legacy packages
//! ```

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ota")]
#[command(
    author,
    version = env!("OTA_VERSION"),
    long_version = concat!(env!("OTA_VERSION"), " (", env!("OTA_TARGET"), ")"),
    about = "ota - apply OTA update packages"
)]
pub struct Cli {
    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show where the payload starts and its header lines
    Inspect {
        /// Update package (zip) or, with --extracted, a directory
        package: PathBuf,
        /// Treat PACKAGE as an already-extracted directory
        #[arg(long)]
        extracted: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print how the package would be installed
    Classify {
        /// Update package (zip)
        package: PathBuf,
    },
    /// Verify a downloaded file and move it into managed storage
    Import {
        /// Downloaded file
        file: PathBuf,
        /// Name in managed storage (defaults to the file's name)
        #[arg(long)]
        name: Option<String>,
        /// Expected SHA-256 (hex). Without it the file only has to be a valid zip.
        #[arg(long)]
        sha256: Option<String>,
    },
    /// Apply a package
    Apply {
        /// Update package (zip)
        package: PathBuf,
        /// Decompress the whole package before applying it
        #[arg(long)]
        extract: bool,
        /// Engine client program
        #[arg(long, env = "OTA_ENGINE_CLIENT")]
        engine: Option<String>,
    },
}
