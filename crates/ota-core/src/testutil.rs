//! Helpers for building synthetic update packages in tests.

use std::io::Write;
use std::path::Path;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub(crate) struct ArchiveEntry {
    pub(crate) name: &'static str,
    pub(crate) data: Vec<u8>,
    pub(crate) is_dir: bool,
    pub(crate) method: CompressionMethod,
    pub(crate) alignment: u16,
}

impl ArchiveEntry {
    pub(crate) fn stored(name: &'static str, data: &[u8]) -> Self {
        Self {
            name,
            data: data.to_vec(),
            is_dir: false,
            method: CompressionMethod::Stored,
            alignment: 0,
        }
    }

    pub(crate) fn deflated(name: &'static str, data: &[u8]) -> Self {
        Self {
            method: CompressionMethod::Deflated,
            ..Self::stored(name, data)
        }
    }

    pub(crate) fn dir(name: &'static str) -> Self {
        Self {
            is_dir: true,
            ..Self::stored(name, b"")
        }
    }

    /// Pad the local extra field so the data starts on an `alignment` boundary.
    pub(crate) fn aligned(mut self, alignment: u16) -> Self {
        self.alignment = alignment;
        self
    }
}

pub(crate) fn write_archive(path: &Path, entries: &[ArchiveEntry]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);

    for entry in entries {
        let mut options = SimpleFileOptions::default().compression_method(entry.method);
        if entry.alignment > 0 {
            options = options.with_alignment(entry.alignment);
        }
        if entry.is_dir {
            writer.add_directory(entry.name, options).unwrap();
        } else {
            writer.start_file(entry.name, options).unwrap();
            writer.write_all(&entry.data).unwrap();
        }
    }

    writer.finish().unwrap();
}

pub(crate) const PROPERTIES: &str = "FILE_HASH=lURPCIkIAjtMOyB/EjQcl8zDzqtD6Ta3tJef6G/+z2k=\n\
FILE_SIZE=871903868\n\
METADATA_HASH=tBvj43QOB0Jn++JojcpVdbRLz0qdAuL+uTkSy7hokaw=\n\
METADATA_SIZE=70604\n";

/// A minimal seamless package: properties, payload and care map.
pub(crate) fn seamless_package(path: &Path, payload: &[u8]) {
    write_archive(
        path,
        &[
            ArchiveEntry::dir("META-INF/"),
            ArchiveEntry::deflated("META-INF/com/android/metadata", b"ota-type=AB\n"),
            ArchiveEntry::deflated("payload_properties.txt", PROPERTIES.as_bytes()),
            ArchiveEntry::stored("payload.bin", payload),
            ArchiveEntry::deflated("care_map.txt", b"/system\n0,4096\n"),
        ],
    );
}

/// A minimal block-based recovery package.
pub(crate) fn legacy_package(path: &Path) {
    write_archive(
        path,
        &[
            ArchiveEntry::deflated("META-INF/com/google/android/update-binary", b"#!/sbin/sh\n"),
            ArchiveEntry::stored("boot.img", b"ANDROID!"),
            ArchiveEntry::stored("system.new.dat", &[0u8; 64]),
            ArchiveEntry::deflated("system.transfer.list", b"4\n"),
        ],
    );
}
