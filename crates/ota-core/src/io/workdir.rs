//! The session's private working directory.
//!
//! Exclusively owned by the active session. The platform engine and
//! installer run as other users, so the directory must be world-readable
//! and world-traversable.

use crate::error::OtaError;
use ota_schema::UpdatePackage;
use std::fs;
use std::path::{Path, PathBuf};

/// Clear and recreate `dir` with mode 0755.
pub fn prepare(dir: &Path) -> Result<(), OtaError> {
    if dir.exists() {
        tracing::debug!("Clearing stale working directory {}", dir.display());
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}

/// Copy the package into `dir`, readable by the engine. Returns the staged path.
pub fn stage(package: &UpdatePackage, dir: &Path) -> Result<PathBuf, OtaError> {
    let dest = dir.join(package.file_name());
    let copied = fs::copy(package.absolute_path(), &dest)?;
    if copied != package.size_bytes() {
        return Err(OtaError::context(
            "Failed to stage package",
            format!(
                "copied {copied} bytes, expected {}",
                package.size_bytes()
            ),
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o644))?;
    }

    Ok(dest)
}

/// Remove the working directory after a successful session.
pub fn remove(dir: &Path) -> Result<(), OtaError> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}
