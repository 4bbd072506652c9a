//! `ota classify`: report the installation mechanism.

use anyhow::{Context, Result};
use ota_core::selector;
use std::path::Path;

pub fn classify(package: &Path) -> Result<()> {
    let mechanism = selector::classify_archive(package)
        .with_context(|| format!("Failed to classify {}", package.display()))?;
    println!("{mechanism}");
    Ok(())
}
