use dirs::home_dir;
use std::path::PathBuf;

/// Returns the state directory, or None if the user's home cannot be resolved.
pub fn try_ota_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("OTA_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".ota"))
}

/// Returns the state directory (`~/.ota`), falling back to the system temp
/// directory when no home can be resolved.
pub fn ota_home() -> PathBuf {
    try_ota_home().unwrap_or_else(|| std::env::temp_dir().join("ota"))
}

/// Config file: ~/.ota/config.toml
pub fn config_path() -> PathBuf {
    ota_home().join("config.toml")
}

/// Managed package storage: ~/.ota/updates
pub fn updates_path() -> PathBuf {
    ota_home().join("updates")
}

/// Private working area for the active session: ~/.ota/work
pub fn work_path() -> PathBuf {
    ota_home().join("work")
}

/// Recovery command directory: ~/.ota/recovery
pub fn recovery_path() -> PathBuf {
    ota_home().join("recovery")
}

/// Build the `file://` URI the engine reads a payload source from.
pub fn file_uri(path: &std::path::Path) -> String {
    format!("file://{}", path.display())
}
