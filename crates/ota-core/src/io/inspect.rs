//! Payload location inside an update package.
//!
//! The engine reads `payload.bin` straight out of the package by absolute
//! byte offset, so the offset must be exact and the payload must never be
//! decompressed or copied out.
//!
//! # Implementation Note: Offset Arithmetic
//!
//! A zip entry on disk is a local file header (30 fixed bytes, then the
//! name, then the extra field) followed by the stored data. Walking the
//! entries in physical order with a running cursor:
//!
//! ```text
//! cursor += 30 + name_len + extra_len   // now at the entry's data
//! cursor += compressed_size             // now at the next local header
//! ```
//!
//! The payload's offset is the cursor value right after its header. Name and
//! extra lengths are read from each local header itself, because the extra
//! field in the central directory may differ from the local one (alignment
//! padding lives only in the local header). The cursor is checked against
//! the header offset recorded in the central directory; a gap (data
//! descriptor, prepended data) is logged and the cursor re-synchronized.

use crate::error::OtaError;
use crate::io::archive::{self, LocalHeader};
use ota_schema::{LOCAL_HEADER_LEN, PAYLOAD_ENTRY, PROPERTIES_ENTRY, PayloadLocation};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use zip::ZipArchive;

/// Running byte cursor over the local headers of an archive.
#[derive(Debug, Default, Clone, Copy)]
pub struct OffsetCursor {
    offset: u64,
}

impl OffsetCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Step over a local header; returns the offset of the entry's data.
    pub fn advance_header(&mut self, name_len: u64, extra_len: u64) -> u64 {
        self.offset += LOCAL_HEADER_LEN + name_len + extra_len;
        self.offset
    }

    /// Step over an entry's stored data.
    pub fn advance_data(&mut self, compressed_size: u64) {
        self.offset += compressed_size;
    }

    /// Jump to a known header offset.
    pub fn resync(&mut self, header_start: u64) {
        self.offset = header_start;
    }
}

/// Where the payload lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSource {
    /// Inside a zip archive, read by offset.
    Archive(PathBuf),
    /// Already decompressed into a directory holding `payload.bin` and
    /// `payload_properties.txt` as standalone files.
    Extracted(PathBuf),
}

impl PayloadSource {
    /// The file the engine should open.
    pub fn payload_path(&self) -> PathBuf {
        match self {
            Self::Archive(path) => path.clone(),
            Self::Extracted(dir) => dir.join(PAYLOAD_ENTRY),
        }
    }
}

/// Computes a package's [`PayloadLocation`] once and caches it.
#[derive(Debug)]
pub struct PackageInspector {
    source: PayloadSource,
    location: OnceLock<PayloadLocation>,
}

impl PackageInspector {
    pub fn new(source: PayloadSource) -> Self {
        Self {
            source,
            location: OnceLock::new(),
        }
    }

    pub fn source(&self) -> &PayloadSource {
        &self.source
    }

    /// Locate the payload. The first successful result is cached; later
    /// calls return it without touching the file system again.
    pub fn locate(&self) -> Result<&PayloadLocation, OtaError> {
        if let Some(location) = self.location.get() {
            return Ok(location);
        }

        let location = match &self.source {
            PayloadSource::Archive(path) => locate_in_archive(path)?,
            PayloadSource::Extracted(dir) => locate_extracted(dir)?,
        };
        Ok(self.location.get_or_init(|| location))
    }
}

/// Walk the archive's local headers and find `payload.bin` plus its properties.
pub fn locate_in_archive(path: &Path) -> Result<PayloadLocation, OtaError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut raw = File::open(path)?;

    let mut cursor = OffsetCursor::new();
    let mut payload_offset = None;
    let mut property_lines = None;

    for entry in archive::physical_entries(&mut archive)? {
        if cursor.offset() != entry.header_start {
            tracing::warn!(
                "Cursor at {} but {} starts at {}; re-synchronizing",
                cursor.offset(),
                entry.name,
                entry.header_start
            );
            cursor.resync(entry.header_start);
        }

        let LocalHeader {
            name_len,
            extra_len,
        } = archive::read_local_header(&mut raw, entry.header_start)?;
        let data_start = cursor.advance_header(u64::from(name_len), u64::from(extra_len));

        if entry.name == PAYLOAD_ENTRY {
            tracing::debug!("Found offset for {PAYLOAD_ENTRY} at: {data_start}");
            payload_offset = Some(data_start);
        } else if entry.name == PROPERTIES_ENTRY {
            let reader = archive.by_index(entry.index)?;
            property_lines = Some(read_lines(reader)?);
        }

        if !entry.is_dir {
            cursor.advance_data(entry.compressed_size);
        }
    }

    let byte_offset = payload_offset.ok_or(OtaError::PayloadNotFound {
        missing: PAYLOAD_ENTRY,
    })?;
    let property_lines = property_lines.ok_or(OtaError::PayloadNotFound {
        missing: PROPERTIES_ENTRY,
    })?;

    Ok(PayloadLocation {
        byte_offset,
        property_lines,
    })
}

/// Standalone mode: the payload file starts at offset 0.
pub fn locate_extracted(dir: &Path) -> Result<PayloadLocation, OtaError> {
    if !dir.join(PAYLOAD_ENTRY).is_file() {
        return Err(OtaError::PayloadNotFound {
            missing: PAYLOAD_ENTRY,
        });
    }

    let properties = dir.join(PROPERTIES_ENTRY);
    if !properties.is_file() {
        return Err(OtaError::PayloadNotFound {
            missing: PROPERTIES_ENTRY,
        });
    }

    Ok(PayloadLocation {
        byte_offset: 0,
        property_lines: read_lines(File::open(properties)?)?,
    })
}

fn read_lines(reader: impl Read) -> Result<Vec<String>, OtaError> {
    BufReader::new(reader)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(OtaError::from)
}
