//! `ota inspect`: report where the payload starts.

use anyhow::{Context, Result};
use ota_core::io::inspect::{PackageInspector, PayloadSource};
use std::path::Path;

/// Locate the payload and print its offset and header lines.
pub fn inspect(package: &Path, extracted: bool, json: bool) -> Result<()> {
    let source = if extracted {
        PayloadSource::Extracted(package.to_path_buf())
    } else {
        PayloadSource::Archive(package.to_path_buf())
    };
    let inspector = PackageInspector::new(source);
    let location = inspector
        .locate()
        .with_context(|| format!("Failed to inspect {}", package.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(location)?);
        return Ok(());
    }

    println!("payload:  {}", inspector.source().payload_path().display());
    println!("offset:   {}", location.byte_offset);
    for line in &location.property_lines {
        println!("header:   {line}");
    }
    Ok(())
}
