//! Full package extraction for the extract-before-apply variant.

use crate::error::OtaError;
use crate::io::inspect::PayloadSource;
use ota_schema::{PAYLOAD_ENTRY, PROPERTIES_ENTRY};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Information about an extracted file
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// Path relative to extraction root
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
}

/// Extract a zip archive into `dest_dir`, replacing anything already there.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<Vec<ExtractedFile>, OtaError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    if dest_dir.exists() {
        fs::remove_dir_all(dest_dir)?;
    }
    fs::create_dir_all(dest_dir)?;

    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;

        // enclosed_name rejects absolute paths and `..` components (Zip Slip)
        let Some(relative_path) = file.enclosed_name() else {
            return Err(OtaError::Archive(format!(
                "Invalid path in archive: {}",
                file.name()
            )));
        };

        let absolute_path = dest_dir.join(&relative_path);
        if file.is_dir() {
            fs::create_dir_all(&absolute_path)?;
            continue;
        }

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
        });
    }

    tracing::debug!(
        "Extracted {} files from {} into {}",
        extracted_files.len(),
        archive_path.display(),
        dest_dir.display()
    );

    Ok(extracted_files)
}

/// Payload source for an extracted package. Both engine inputs must have
/// come out of the archive at its root.
pub fn extracted_source(
    dest_dir: &Path,
    files: &[ExtractedFile],
) -> Result<PayloadSource, OtaError> {
    for name in [PAYLOAD_ENTRY, PROPERTIES_ENTRY] {
        if !files.iter().any(|f| f.relative_path == Path::new(name)) {
            return Err(OtaError::PayloadNotFound { missing: name });
        }
    }
    Ok(PayloadSource::Extracted(dest_dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ArchiveEntry, legacy_package, seamless_package, write_archive};

    #[test]
    fn test_extract_seamless_package() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("update.zip");
        seamless_package(&archive, b"payload-bytes");

        let dest = dir.path().join("unzipped");
        let files = extract_zip(&archive, &dest).unwrap();

        assert_eq!(fs::read(dest.join("payload.bin")).unwrap(), b"payload-bytes");
        assert!(dest.join("META-INF/com/android/metadata").is_file());
        assert!(files.iter().any(|f| f.relative_path == Path::new("care_map.txt")));
    }

    #[test]
    fn test_extract_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("update.zip");
        write_archive(&archive, &[ArchiveEntry::stored("a.txt", b"a")]);

        let dest = dir.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.txt"), b"old").unwrap();

        extract_zip(&archive, &dest).unwrap();
        assert!(!dest.join("stale.txt").exists());
        assert!(dest.join("a.txt").exists());
    }

    #[test]
    fn test_extract_rejects_zip_slip() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        write_archive(&archive, &[ArchiveEntry::stored("../escape.txt", b"x")]);

        let result = extract_zip(&archive, &dir.path().join("out"));
        assert!(matches!(result, Err(OtaError::Archive(_))));
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_extracted_source_needs_payload_and_properties() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("update.zip");
        seamless_package(&archive, b"payload-bytes");
        let dest = dir.path().join("unzipped");
        let files = extract_zip(&archive, &dest).unwrap();

        let source = extracted_source(&dest, &files).unwrap();
        assert_eq!(source.payload_path(), dest.join("payload.bin"));

        let legacy = dir.path().join("legacy.zip");
        legacy_package(&legacy);
        let files = extract_zip(&legacy, &dest).unwrap();
        assert!(matches!(
            extracted_source(&dest, &files),
            Err(OtaError::PayloadNotFound {
                missing: "payload.bin"
            })
        ));

        let nested = dir.path().join("nested.zip");
        write_archive(&nested, &[
            ArchiveEntry::stored("payload.bin", b"data"),
            ArchiveEntry::stored("extra/payload_properties.txt", b"FILE_SIZE=4\n"),
        ]);
        let files = extract_zip(&nested, &dest).unwrap();
        assert!(matches!(
            extracted_source(&dest, &files),
            Err(OtaError::PayloadNotFound {
                missing: "payload_properties.txt"
            })
        ));
    }
}
