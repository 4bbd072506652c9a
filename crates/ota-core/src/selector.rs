//! Installation mechanism classification.
//!
//! A package is classified by the marker entries it carries. Legacy markers
//! always win: the scan stops at the first one. Seamless markers are noted
//! but the scan continues, since a legacy marker later in the archive still
//! makes the package a recovery package.

use crate::error::OtaError;
use crate::io::archive;
use ota_schema::{CARE_MAP_ENTRY, Mechanism, PAYLOAD_ENTRY, PROPERTIES_ENTRY};
use std::path::Path;

/// Entries that only block-based recovery packages carry.
pub const LEGACY_MARKERS: &[&str] = &[
    "file_contexts.bin",
    "install/bin/backuptool.functions",
    "install/bin/backuptool.sh",
    "install/bin/otasigcheck.sh",
    "system.patch.dat",
    "system/build.prop",
    "META-INF/org/lineageos/releasekey",
    "META-INF/com/google/android/updater-script",
    "META-INF/com/google/android/update-binary",
    "system.new.dat",
    "boot.img",
    "system.transfer.list",
];

/// Entries that only seamless payload packages carry.
pub const SEAMLESS_MARKERS: &[&str] = &[PROPERTIES_ENTRY, CARE_MAP_ENTRY, PAYLOAD_ENTRY];

/// Classify entry names given in archive order.
pub fn classify<I, S>(entry_names: I) -> Result<Mechanism, OtaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seamless = false;

    for name in entry_names {
        let name = name.as_ref();
        if LEGACY_MARKERS.contains(&name) {
            tracing::debug!("Legacy marker {name} found");
            return Ok(Mechanism::LegacyRecovery);
        }
        if !seamless && SEAMLESS_MARKERS.contains(&name) {
            tracing::debug!("Seamless marker {name} found");
            seamless = true;
        }
    }

    if seamless {
        Ok(Mechanism::SeamlessAb)
    } else {
        Err(OtaError::UnknownPackageFormat)
    }
}

/// Classify a package archive on disk.
pub fn classify_archive(path: &Path) -> Result<Mechanism, OtaError> {
    classify(archive::entry_names(path)?)
}
