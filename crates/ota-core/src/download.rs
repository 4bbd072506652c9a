//! Download completion boundary.
//!
//! The download manager is upstream of the pipeline. When it reports a
//! finished download, [`DownloadCompletionHandler`] checks it is the one we
//! are waiting for, copies it into managed storage and runs the package
//! verifier. Only a verified file becomes an [`UpdatePackage`].
//!
//! # Implementation Note:
//! The download record is removed from the source on every path past the
//! id check, success or not. A failed verification also deletes the copy so
//! an unverified package never sits in `updates_dir`.

use crate::error::OtaError;
use ota_schema::UpdatePackage;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Identifier assigned by the download manager.
pub type DownloadId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Pending,
    Running,
    Paused,
    Successful,
    Failed { reason: String },
    Unknown,
}

/// The download manager.
pub trait DownloadSource: Send + Sync {
    fn status(&self, id: DownloadId) -> DownloadStatus;

    /// Open the downloaded bytes for reading.
    fn open(&self, id: DownloadId) -> Result<Box<dyn Read + Send>, OtaError>;

    /// Forget the download record.
    fn remove(&self, id: DownloadId);
}

/// Signature/integrity check run before a package enters the pipeline.
pub trait PackageVerifier: Send + Sync {
    fn verify(&self, path: &Path) -> Result<(), OtaError>;
}

/// Compares the file's SHA-256 against an expected hex digest.
#[derive(Debug, Clone)]
pub struct Sha256Verifier {
    expected: String,
}

impl Sha256Verifier {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into().to_ascii_lowercase(),
        }
    }
}

/// SHA-256 of a file as lowercase hex.
pub fn sha256_file(path: &Path) -> Result<String, OtaError> {
    let mut hasher = Sha256::new();
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 8192];
    loop {
        let count = file.read(&mut buffer)?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }
    Ok(hex::encode(hasher.finalize()))
}

impl PackageVerifier for Sha256Verifier {
    fn verify(&self, path: &Path) -> Result<(), OtaError> {
        let actual = sha256_file(path)?;
        if actual != self.expected {
            return Err(OtaError::Verification(format!(
                "hash mismatch: expected {}, got {actual}",
                self.expected
            )));
        }
        Ok(())
    }
}

/// Accepts any file that opens as a zip archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveVerifier;

impl PackageVerifier for ArchiveVerifier {
    fn verify(&self, path: &Path) -> Result<(), OtaError> {
        let file = File::open(path)?;
        zip::ZipArchive::new(file)
            .map(|_| ())
            .map_err(|e| OtaError::Verification(format!("not a valid package: {e}")))
    }
}

/// A local file presented as a completed download.
#[derive(Debug)]
pub struct FileDownloadSource {
    id: DownloadId,
    path: Mutex<Option<PathBuf>>,
}

impl FileDownloadSource {
    pub fn new(id: DownloadId, path: PathBuf) -> Self {
        Self {
            id,
            path: Mutex::new(Some(path)),
        }
    }

    fn path(&self, id: DownloadId) -> Option<PathBuf> {
        if id != self.id {
            return None;
        }
        self.path.lock().ok().and_then(|p| p.clone())
    }
}

impl DownloadSource for FileDownloadSource {
    fn status(&self, id: DownloadId) -> DownloadStatus {
        match self.path(id) {
            Some(path) if path.is_file() => DownloadStatus::Successful,
            Some(path) => DownloadStatus::Failed {
                reason: format!("{} is not a file", path.display()),
            },
            None => DownloadStatus::Unknown,
        }
    }

    fn open(&self, id: DownloadId) -> Result<Box<dyn Read + Send>, OtaError> {
        let path = self.path(id).ok_or_else(|| {
            OtaError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no download with id {id}"),
            ))
        })?;
        Ok(Box::new(File::open(path)?))
    }

    fn remove(&self, id: DownloadId) {
        if id != self.id {
            return;
        }
        if let Ok(mut path) = self.path.lock() {
            *path = None;
        }
    }
}

/// The download this process is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDownload {
    pub id: DownloadId,
}

pub struct DownloadCompletionHandler {
    updates_dir: PathBuf,
    source: Arc<dyn DownloadSource>,
    verifier: Arc<dyn PackageVerifier>,
    pending: Mutex<Option<PendingDownload>>,
}

impl std::fmt::Debug for DownloadCompletionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadCompletionHandler")
            .field("updates_dir", &self.updates_dir)
            .finish_non_exhaustive()
    }
}

impl DownloadCompletionHandler {
    pub fn new(
        updates_dir: PathBuf,
        source: Arc<dyn DownloadSource>,
        verifier: Arc<dyn PackageVerifier>,
    ) -> Self {
        Self {
            updates_dir,
            source,
            verifier,
            pending: Mutex::new(None),
        }
    }

    /// Record the download to wait for.
    pub fn set_pending(&self, pending: PendingDownload) {
        if let Ok(mut slot) = self.pending.lock() {
            *slot = Some(pending);
        }
    }

    pub fn pending(&self) -> Option<PendingDownload> {
        self.pending.lock().ok().and_then(|p| *p)
    }

    /// Handle a completion notification.
    ///
    /// Returns `Ok(None)` for notifications about other downloads.
    pub fn handle(
        &self,
        id: DownloadId,
        dest_name: &str,
    ) -> Result<Option<UpdatePackage>, OtaError> {
        {
            let Ok(mut pending) = self.pending.lock() else {
                return Err(OtaError::InvalidState("pending download record poisoned".into()));
            };
            if *pending != Some(PendingDownload { id }) {
                tracing::debug!("Ignoring completion of unrelated download {id}");
                return Ok(None);
            }
            *pending = None;
        }

        let dest = match self.destination(dest_name) {
            Ok(dest) => dest,
            Err(e) => {
                self.source.remove(id);
                return Err(e);
            }
        };

        let status = self.source.status(id);
        if status != DownloadStatus::Successful {
            self.source.remove(id);
            tracing::warn!("Download {id} did not succeed: {status:?}");
            return Err(OtaError::Io(io::Error::other(format!(
                "download {id} finished with status {status:?}"
            ))));
        }

        let copied = self.copy_download(id, &dest);
        self.source.remove(id);
        copied?;

        if let Err(e) = self.verifier.verify(&dest) {
            tracing::warn!("Verification of {} failed: {e}", dest.display());
            if let Err(cleanup) = fs::remove_file(&dest) {
                tracing::warn!("Failed to delete {}: {cleanup}", dest.display());
            }
            return Err(match e {
                OtaError::Verification(_) => e,
                other => OtaError::Verification(other.to_string()),
            });
        }

        tracing::info!("Download {id} committed as {}", dest.display());
        Ok(Some(UpdatePackage::from_path(&dest)?))
    }

    fn destination(&self, dest_name: &str) -> Result<PathBuf, OtaError> {
        let name = Path::new(dest_name);
        if dest_name.is_empty() || name.file_name() != Some(name.as_os_str()) {
            return Err(OtaError::context(
                "Invalid package name",
                format!("{dest_name:?} is not a plain file name"),
            ));
        }
        Ok(self.updates_dir.join(name))
    }

    fn copy_download(&self, id: DownloadId, dest: &Path) -> Result<(), OtaError> {
        fs::create_dir_all(&self.updates_dir)?;
        let mut reader = self.source.open(id)?;
        let mut out = File::create(dest)?;
        let bytes = io::copy(&mut reader, &mut out)?;
        tracing::debug!("Copied {bytes} bytes of download {id} to {}", dest.display());
        Ok(())
    }
}
