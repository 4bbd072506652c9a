//! The update package and where its payload lives.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A downloaded, verified update package on local storage.
///
/// Immutable once constructed; the pipeline never rewrites the file it
/// points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePackage {
    file_name: String,
    absolute_path: PathBuf,
    size_bytes: u64,
}

impl UpdatePackage {
    /// Build a package description from its parts.
    pub fn new(file_name: impl Into<String>, absolute_path: PathBuf, size_bytes: u64) -> Self {
        Self {
            file_name: file_name.into(),
            absolute_path,
            size_bytes,
        }
    }

    /// Describe an existing file, resolving it to an absolute path.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be resolved or is not a
    /// regular file.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let absolute_path = std::fs::canonicalize(path)?;
        let metadata = std::fs::metadata(&absolute_path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", absolute_path.display()),
            ));
        }

        let file_name = absolute_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            file_name,
            absolute_path,
            size_bytes: metadata.len(),
        })
    }

    /// Bare file name of the package (e.g. `lineage-15.1-signed.zip`).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Absolute location of the package on disk.
    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// Size of the package in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Where the engine should start reading the payload, and the header lines
/// it needs to validate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadLocation {
    /// Start of the payload data within the archive (or 0 for a standalone file).
    pub byte_offset: u64,
    /// `KEY=VALUE` lines from the properties entry, verbatim and in order.
    pub property_lines: Vec<String>,
}

/// How a package gets installed on this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mechanism {
    /// Payload applied to the inactive slot while the system keeps running.
    SeamlessAb,
    /// Package handed to the recovery environment after a reboot.
    LegacyRecovery,
}

impl std::fmt::Display for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SeamlessAb => write!(f, "seamless A/B"),
            Self::LegacyRecovery => write!(f, "legacy recovery"),
        }
    }
}
