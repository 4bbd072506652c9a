//! `ota import`: commit a downloaded file into managed storage.
//!
//! Runs the same completion boundary a download manager notification would,
//! with the local file standing in for the finished download.

use anyhow::{Context, Result, anyhow};
use ota_core::Config;
use ota_core::download::{
    ArchiveVerifier, DownloadCompletionHandler, DownloadSource, FileDownloadSource,
    PackageVerifier, PendingDownload, Sha256Verifier,
};
use std::path::Path;
use std::sync::Arc;

const LOCAL_DOWNLOAD_ID: u64 = 1;

pub fn import(file: &Path, name: Option<&str>, sha256: Option<&str>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let dest_name = match name {
        Some(name) => name.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("{} has no file name", file.display()))?,
    };

    let verifier: Arc<dyn PackageVerifier> = match sha256 {
        Some(digest) => Arc::new(Sha256Verifier::new(digest)),
        None => Arc::new(ArchiveVerifier),
    };
    let source: Arc<dyn DownloadSource> =
        Arc::new(FileDownloadSource::new(LOCAL_DOWNLOAD_ID, file.to_path_buf()));

    let handler = DownloadCompletionHandler::new(config.updates_dir.clone(), source, verifier);
    handler.set_pending(PendingDownload {
        id: LOCAL_DOWNLOAD_ID,
    });

    let package = handler
        .handle(LOCAL_DOWNLOAD_ID, &dest_name)
        .with_context(|| format!("Failed to import {}", file.display()))?
        .ok_or_else(|| anyhow!("download record for {} disappeared", file.display()))?;

    println!(
        "{} ({} bytes)",
        package.absolute_path().display(),
        package.size_bytes()
    );
    Ok(())
}
