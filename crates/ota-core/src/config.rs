//! Pipeline configuration.
//!
//! Loaded from `$OTA_HOME/config.toml` when present, defaults otherwise,
//! with environment variables taking precedence over both.

use crate::error::OtaError;
use crate::paths;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// How to reach the payload-application engine.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine client program (e.g. `update_engine_client`).
    pub program: String,
    /// Extra arguments passed before the payload arguments.
    pub args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "update_engine_client".to_string(),
            args: vec!["--update".to_string(), "--follow".to_string()],
        }
    }
}

/// How to hand a package to the recovery environment.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Directory receiving the recovery `command` file.
    pub command_dir: PathBuf,
    /// Command that reboots into recovery. Empty means "write the command only".
    pub reboot: Vec<String>,
    /// Locale passed to recovery.
    pub locale: String,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            command_dir: paths::recovery_path(),
            reboot: Vec::new(),
            locale: "en_US".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Managed storage for downloaded packages.
    pub updates_dir: PathBuf,
    /// Private working directory owned by the active session.
    pub work_dir: PathBuf,
    /// Decompress the whole package before applying it.
    pub extract_before_apply: bool,
    /// Engine client settings.
    pub engine: EngineConfig,
    /// Recovery entry point settings.
    pub recovery: RecoveryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            updates_dir: paths::updates_path(),
            work_dir: paths::work_path(),
            extract_before_apply: false,
            engine: EngineConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }
}

impl Config {
    /// Load `$OTA_HOME/config.toml` (if any) and apply environment overrides.
    pub fn load() -> Result<Self, OtaError> {
        let path = paths::config_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self, OtaError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| OtaError::Config(format!("{}: {e}", path.display())))
    }

    /// Parse config TOML.
    pub fn parse(content: &str) -> Result<Self, OtaError> {
        toml::from_str(content).map_err(|e| OtaError::Config(e.to_string()))
    }

    /// Apply `OTA_*` overrides from a variable lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("OTA_UPDATES_DIR") {
            self.updates_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("OTA_WORK_DIR") {
            self.work_dir = PathBuf::from(dir);
        }
        if let Some(program) = lookup("OTA_ENGINE_CLIENT") {
            self.engine.program = program;
        }
        if let Some(dir) = lookup("OTA_RECOVERY_DIR") {
            self.recovery.command_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup("OTA_EXTRACT_BEFORE_APPLY") {
            self.extract_before_apply = flag == "1" || flag.eq_ignore_ascii_case("true");
        }
    }
}
