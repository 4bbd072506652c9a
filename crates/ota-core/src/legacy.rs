//! Recovery-flashed installation.
//!
//! Devices without seamless updates install from recovery. All this process
//! does is leave instructions for recovery and request the reboot; success
//! means "request accepted", the update itself is applied after reboot.

use crate::config::RecoveryConfig;
use crate::error::OtaError;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// File recovery reads its arguments from.
pub const COMMAND_FILE: &str = "command";

/// Platform recovery-install entry point.
pub trait LegacyInstaller: Send + Sync {
    /// Hand `package` to recovery. Never modifies the package.
    fn install(&self, package: &Path) -> Result<(), OtaError>;
}

impl<T: LegacyInstaller + ?Sized> LegacyInstaller for std::sync::Arc<T> {
    fn install(&self, package: &Path) -> Result<(), OtaError> {
        (**self).install(package)
    }
}

/// Writes a recovery `command` file and optionally runs a reboot command.
#[derive(Debug, Clone)]
pub struct RecoveryCommandInstaller {
    command_dir: PathBuf,
    reboot: Vec<String>,
    locale: String,
}

impl RecoveryCommandInstaller {
    pub fn new(command_dir: PathBuf, reboot: Vec<String>, locale: impl Into<String>) -> Self {
        Self {
            command_dir,
            reboot,
            locale: locale.into(),
        }
    }

    pub fn from_config(config: &RecoveryConfig) -> Self {
        Self::new(
            config.command_dir.clone(),
            config.reboot.clone(),
            config.locale.clone(),
        )
    }

    pub fn command_path(&self) -> PathBuf {
        self.command_dir.join(COMMAND_FILE)
    }

    fn command_contents(&self, package: &Path) -> String {
        format!(
            "--update_package={}\n--locale={}\n",
            package.display(),
            self.locale
        )
    }

    fn write_command(&self, package: &Path) -> Result<PathBuf, OtaError> {
        fs::create_dir_all(&self.command_dir)?;
        let target = self.command_path();
        let temp = target.with_extension("new");
        fs::write(&temp, self.command_contents(package))?;
        fs::rename(&temp, &target)?;
        tracing::debug!("Wrote recovery command {}", target.display());
        Ok(target)
    }

    fn request_reboot(&self) -> Result<(), OtaError> {
        let Some((program, args)) = self.reboot.split_first() else {
            tracing::info!("No reboot command configured; reboot into recovery manually");
            return Ok(());
        };

        tracing::info!("Rebooting into recovery: {}", self.reboot.join(" "));
        let status = Command::new(program).args(args).status().map_err(|e| {
            OtaError::context("Failed to run reboot command", format!("{program}: {e}"))
        })?;
        if !status.success() {
            return Err(OtaError::context(
                "Reboot into recovery refused",
                format!("{program} exited with {status}"),
            ));
        }
        Ok(())
    }
}

impl LegacyInstaller for RecoveryCommandInstaller {
    fn install(&self, package: &Path) -> Result<(), OtaError> {
        if !package.is_file() {
            return Err(OtaError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("package not found: {}", package.display()),
            )));
        }

        let command = self.write_command(package)?;
        if let Err(e) = self.request_reboot() {
            if let Err(cleanup) = fs::remove_file(&command) {
                tracing::warn!("Failed to remove {}: {cleanup}", command.display());
            }
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(dir: &Path) -> PathBuf {
        let path = dir.join("legacy.zip");
        fs::write(&path, b"zip").unwrap();
        path
    }

    #[test]
    fn test_writes_command_file() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = package(dir.path());
        let recovery = dir.path().join("recovery");
        let installer = RecoveryCommandInstaller::new(recovery.clone(), vec![], "de_DE");

        installer.install(&pkg).unwrap();

        let contents = fs::read_to_string(recovery.join(COMMAND_FILE)).unwrap();
        assert_eq!(
            contents,
            format!("--update_package={}\n--locale=de_DE\n", pkg.display())
        );
        assert!(!recovery.join("command.new").exists());
        assert_eq!(fs::read(&pkg).unwrap(), b"zip");
    }

    #[test]
    fn test_missing_package_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let installer = RecoveryCommandInstaller::new(dir.path().join("r"), vec![], "en_US");
        let result = installer.install(&dir.path().join("absent.zip"));
        assert!(matches!(result, Err(OtaError::Io(_))));
        assert!(!dir.path().join("r").join(COMMAND_FILE).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_reboot_command_runs() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = package(dir.path());
        let installer =
            RecoveryCommandInstaller::new(dir.path().join("r"), vec!["true".into()], "en_US");
        installer.install(&pkg).unwrap();
        assert!(installer.command_path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_refused_reboot_removes_command() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = package(dir.path());
        let installer =
            RecoveryCommandInstaller::new(dir.path().join("r"), vec!["false".into()], "en_US");

        let err = installer.install(&pkg).unwrap_err();
        assert_eq!(err.failure_code(), ota_schema::FailureCode::Io);
        assert!(!installer.command_path().exists());
        assert!(pkg.exists());
    }
}
