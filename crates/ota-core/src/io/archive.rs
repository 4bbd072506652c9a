//! Raw zip structure access.
//!
//! Entries are always visited in physical order (by local-header offset as
//! recorded in the central directory). Central-directory order is
//! conventionally the same, but nothing guarantees it.

use crate::error::OtaError;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use zip::ZipArchive;

/// Local file header signature (`PK\x03\x04`, little endian).
const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;

/// Central-directory view of one archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Index in the central directory.
    pub index: usize,
    /// Entry name as stored.
    pub name: String,
    /// Offset of the entry's local file header.
    pub header_start: u64,
    /// Size of the entry's data as stored.
    pub compressed_size: u64,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Variable-length fields of a local file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalHeader {
    /// Length of the file name field.
    pub name_len: u16,
    /// Length of the extra field.
    pub extra_len: u16,
}

/// List every entry in physical on-disk order.
pub fn physical_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Vec<EntryHeader>, OtaError> {
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        entries.push(EntryHeader {
            index,
            name: entry.name().to_string(),
            header_start: entry.header_start(),
            compressed_size: entry.compressed_size(),
            is_dir: entry.is_dir(),
        });
    }
    entries.sort_by_key(|e| e.header_start);
    Ok(entries)
}

/// Read the name/extra lengths from the local header at `header_start`.
pub fn read_local_header<R: Read + Seek>(
    reader: &mut R,
    header_start: u64,
) -> Result<LocalHeader, OtaError> {
    let mut buf = [0u8; 30];
    reader.seek(SeekFrom::Start(header_start))?;
    reader.read_exact(&mut buf)?;

    let signature = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if signature != LOCAL_HEADER_SIGNATURE {
        return Err(OtaError::Archive(format!(
            "no local file header at offset {header_start}"
        )));
    }

    Ok(LocalHeader {
        name_len: u16::from_le_bytes([buf[26], buf[27]]),
        extra_len: u16::from_le_bytes([buf[28], buf[29]]),
    })
}

/// Open an archive and list its entry names in physical order.
pub fn entry_names(path: &Path) -> Result<Vec<String>, OtaError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    Ok(physical_entries(&mut archive)?
        .into_iter()
        .map(|e| e.name)
        .collect())
}
